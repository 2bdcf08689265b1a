use std::{fmt::Write as _, path::Path};

use thiserror::Error;
use tracing::{info, warn};

use crate::{
    domain::{
        rank_all, rank_drift, Evaluation, ItemDirectory, MarketCatalog, OutcomeVariant,
        PricedLine, PricingEngine, PricingError, RankDrift, RankError, RankOptions, RankingReport,
        RecipeCatalog, RecipeDefinition, RecipeResult,
    },
    infra::{
        cache::{load_snapshot, save_snapshot, PriceSnapshot},
        prices::{directory_from_mapping, join_quotes, PriceFeedClient, PriceFeedError},
        recipe_file::RecipeFileError,
    },
    util::{persistence::Settings, version::default_user_agent},
};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("price feed unavailable and no snapshot to fall back on: {0}")]
    Feed(#[from] PriceFeedError),
    #[error(transparent)]
    Recipes(#[from] RecipeFileError),
    #[error(transparent)]
    Rank(#[from] RankError),
}

/// Where the prices of a session came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PriceSource {
    Feed,
    Snapshot,
    /// Feed failed; an expired snapshot was used instead.
    ExpiredSnapshot,
}

/// Catalogs for one evaluation pass. A refreshed quote set builds a new session.
#[derive(Debug)]
pub struct Session {
    market: MarketCatalog,
    directory: ItemDirectory,
    recipes: RecipeCatalog,
}

impl Session {
    pub fn new<I, S>(market: MarketCatalog, directory: ItemDirectory, definitions: I) -> Self
    where
        I: IntoIterator<Item = (S, RecipeDefinition)>,
        S: Into<String>,
    {
        let recipes = RecipeCatalog::build(definitions, &directory, &market);
        Self {
            market,
            directory,
            recipes,
        }
    }

    /// Builds the catalogs from a pulled snapshot, dropping ignored items before recipes resolve.
    pub fn from_snapshot<I, S, N>(snapshot: &PriceSnapshot, definitions: I, ignore_items: &[N]) -> Self
    where
        I: IntoIterator<Item = (S, RecipeDefinition)>,
        S: Into<String>,
        N: AsRef<str>,
    {
        let mut market = MarketCatalog::from_quotes(join_quotes(&snapshot.mapping, &snapshot.prices));
        market.ignore_items(ignore_items);
        let directory = directory_from_mapping(&snapshot.mapping);
        let session = Self::new(market, directory, definitions);
        info!(
            items = session.market.len(),
            recipes = session.recipes.len(),
            rejected = session.recipes.rejected().len(),
            "session ready"
        );
        session
    }

    pub fn directory(&self) -> &ItemDirectory {
        &self.directory
    }

    pub fn recipes(&self) -> &RecipeCatalog {
        &self.recipes
    }

    pub fn engine(&self) -> PricingEngine<'_> {
        PricingEngine::new(&self.market, &self.recipes)
    }

    pub fn evaluate(&self, recipe: &str, settings: &Settings) -> Result<Evaluation, PricingError> {
        self.engine()
            .evaluate(recipe, settings.coins, settings.safety_margin_percent)
    }

    pub fn evaluate_all(&self, settings: &Settings) -> Vec<RecipeResult> {
        self.engine()
            .evaluate_all(settings.coins, settings.safety_margin_percent)
    }

    pub fn rank(&self, settings: &Settings) -> Result<RankingReport, RankError> {
        rank_all(&self.evaluate_all(settings), &settings.rank_options())
    }

    /// How far each recipe moves when the safety margin is applied to prices.
    pub fn margin_drift(&self, settings: &Settings) -> Result<RankDrift, RankError> {
        let results = self.evaluate_all(settings);
        let options = RankOptions {
            show_hidden: true,
            include_unresolvable: true,
            ..settings.rank_options()
        };
        let basic = rank_all(
            &results,
            &RankOptions {
                variant: OutcomeVariant::Basic,
                ..options.clone()
            },
        )?;
        let adjusted = rank_all(
            &results,
            &RankOptions {
                variant: OutcomeVariant::Adjusted,
                ..options
            },
        )?;
        rank_drift(&basic.rows, &adjusted.rows)
    }
}

/// Uses a fresh snapshot of the configured timespan when there is one; otherwise
/// pulls the feed and saves a new snapshot. Any saved snapshot still serves when
/// the feed cannot be reached.
pub async fn load_prices(
    settings: &Settings,
    snapshot_path: &Path,
    refresh: bool,
) -> Result<(PriceSnapshot, PriceSource), SessionError> {
    let cached = load_snapshot(snapshot_path);
    if let Some(snapshot) = &cached {
        let usable = !snapshot.is_expired() && snapshot.timespan == settings.feed.timespan;
        if !refresh && usable {
            return Ok((snapshot.clone(), PriceSource::Snapshot));
        }
    }

    match pull_feed(settings).await {
        Ok(snapshot) => {
            if let Err(error) = save_snapshot(snapshot_path, &snapshot) {
                warn!(%error, "failed to save price snapshot");
            }
            Ok((snapshot, PriceSource::Feed))
        }
        Err(error) => match cached {
            Some(snapshot) => {
                warn!(%error, age = %snapshot.age_string(), "price feed failed, using saved snapshot");
                let source = if snapshot.is_expired() {
                    PriceSource::ExpiredSnapshot
                } else {
                    PriceSource::Snapshot
                };
                Ok((snapshot, source))
            }
            None => Err(error.into()),
        },
    }
}

async fn pull_feed(settings: &Settings) -> Result<PriceSnapshot, PriceFeedError> {
    let user_agent = settings
        .feed
        .user_agent
        .clone()
        .unwrap_or_else(default_user_agent);
    let client = PriceFeedClient::new(&settings.feed.base_url, &user_agent)?;
    let timespan = settings.feed.timespan;

    let (mapping, prices) = tokio::try_join!(client.get_mapping(), client.get_prices(timespan))?;
    Ok(PriceSnapshot::new(mapping, prices).with_timespan(timespan))
}

/// Ranking table followed by breakdowns for the top rows and any named recipes.
pub fn render_report(session: &Session, settings: &Settings, report: &RankingReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<40} {:>12} {:>14} {:>10} {:>12}",
        "Recipe", "Margin", "Total margin", "Hours", "Per hour"
    );
    for row in report.overview(settings.display.number) {
        let _ = writeln!(
            out,
            "{:<40} {:>12} {:>14} {:>10} {:>12}",
            row.name,
            or_dash(row.margin),
            or_dash(row.total_margin),
            or_dash(row.total_time_hours),
            or_dash(row.throughput_per_hour),
        );
    }

    if !report.hidden.is_empty() {
        let _ = writeln!(out, "\nHidden: {}", report.hidden.join(", "));
    }
    for (name, error) in &report.unresolvable {
        match error {
            PricingError::Unresolvable { item, side, .. } => {
                let item = session.directory().name_of(*item).unwrap_or("unknown item");
                let _ = writeln!(out, "Unresolvable: {name} (no {} price for {item})", side.label());
            }
            other => {
                let _ = writeln!(out, "Unresolvable: {name} ({other})");
            }
        }
    }

    let top = report.top(settings.display.breakdown_count());
    let specific = settings
        .display
        .specific
        .iter()
        .map(String::as_str)
        .filter(|name| !top.iter().any(|row| row.name == *name));
    for name in top.iter().map(|row| row.name.as_str()).chain(specific) {
        match session.evaluate(name, settings) {
            Ok(evaluation) => {
                out.push('\n');
                out.push_str(&render_evaluation(&evaluation, settings.display.variant));
            }
            Err(error) => {
                let _ = writeln!(out, "\n{name}: {error}");
            }
        }
    }
    out
}

pub fn render_evaluation(evaluation: &Evaluation, variant: OutcomeVariant) -> String {
    let outcome = variant.pick(evaluation);
    let mut out = String::new();
    let _ = writeln!(out, "== {} ==", evaluation.recipe);
    if variant == OutcomeVariant::Adjusted {
        let _ = writeln!(out, "safety margin: {}%", evaluation.safety_margin_percent);
    }
    let _ = writeln!(out, "inputs:");
    render_lines(&mut out, &outcome.inputs);
    let _ = writeln!(out, "outputs:");
    render_lines(&mut out, &outcome.outputs);
    let _ = writeln!(
        out,
        "cost {} | revenue {} (gross {}) | margin {}",
        outcome.cost, outcome.revenue, outcome.gross_revenue, outcome.margin
    );
    let _ = writeln!(
        out,
        "amount {} | total margin {} | hours {} | per hour {}",
        outcome.amount,
        outcome.total_margin,
        or_dash(outcome.total_time_hours),
        or_dash(outcome.throughput_per_hour),
    );
    out
}

fn render_lines(out: &mut String, lines: &[PricedLine]) {
    for line in lines {
        let _ = writeln!(
            out,
            "  {:<32} x{:<6} @ {:>10} -> {:>8} for {:>12}",
            line.name, line.quantity, line.unit_price, line.to_acquire, line.batch_total
        );
    }
}

fn or_dash<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}
