use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use recipe_margin_scanner::{
    app::{load_prices, render_evaluation, render_report, PriceSource, Session},
    infra::{cache::snapshot_path, recipe_file::load_recipe_definitions},
    logging,
    util::{
        persistence::load_settings,
        version::{version_label, APP_NAME},
    },
};

#[derive(Parser, Debug)]
#[command(name = "recipe-margin-scanner", about = "Rank recipes by market profitability")]
struct Args {
    /// Settings file; defaults to the per-user config directory
    #[arg(long, env = "RECIPE_SCANNER_SETTINGS")]
    settings: Option<PathBuf>,

    /// Recipe definitions file, overriding the settings
    #[arg(long)]
    recipes: Option<PathBuf>,

    /// Ignore the price snapshot and pull the feed
    #[arg(long)]
    refresh: bool,

    /// Only evaluate this recipe
    #[arg(long)]
    recipe: Option<String>,

    /// Coins available for one batch
    #[arg(long)]
    coins: Option<i64>,

    /// Safety margin percent for the adjusted estimate
    #[arg(long)]
    margin: Option<f64>,

    /// Print how the safety margin reorders the ranking
    #[arg(long)]
    drift: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();
    let args = Args::parse();
    info!(version = %version_label(), "{APP_NAME}");

    let mut settings = load_settings(args.settings.as_deref()).context("failed to load settings")?;
    if let Some(coins) = args.coins {
        settings.coins = coins;
    }
    if let Some(margin) = args.margin {
        settings.safety_margin_percent = margin;
    }
    if let Some(recipes) = args.recipes {
        settings.recipes_path = recipes;
    }

    let definitions = load_recipe_definitions(&settings.recipes_path)?;
    let (snapshot, source) = load_prices(&settings, &snapshot_path(), args.refresh).await?;
    let pulled_at = snapshot.cached_at_label().unwrap_or_default();
    if source == PriceSource::ExpiredSnapshot {
        warn!(age = %snapshot.age_string(), %pulled_at, "prices are out of date");
    } else {
        info!(?source, age = %snapshot.age_string(), %pulled_at, "using prices");
    }

    let session = Session::from_snapshot(&snapshot, definitions, &settings.ignore_items);

    if let Some(name) = args.recipe {
        let evaluation = session.evaluate(&name, &settings)?;
        print!("{}", render_evaluation(&evaluation, settings.display.variant));
        return Ok(());
    }

    let report = session.rank(&settings)?;
    print!("{}", render_report(&session, &settings, &report));

    if args.drift {
        println!("\nRank drift with a {}% safety margin:", settings.safety_margin_percent);
        for (name, moved) in session.margin_drift(&settings)? {
            if moved != 0 {
                println!("  {name:<40} {moved:+}");
            }
        }
    }

    Ok(())
}
