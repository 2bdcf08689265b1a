//! Cost, taxed revenue, margin, batch size and throughput for one recipe.
//!
//! Every figure is computed twice: once at the quoted prices and once with
//! a safety margin applied (buy prices inflated, sell prices deflated).

use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;

use super::entities::{CraftDuration, ItemId, ItemQuantities, PriceSide};
use super::market::MarketCatalog;
use super::recipes::{Recipe, RecipeCatalog};

/// Gross revenue below this is not taxed.
pub const UNTAXED_BELOW: i64 = 100;
pub const TAX_PERCENT: i64 = 1;
/// The levy never exceeds this, whatever the trade size.
pub const TAX_CAP: i64 = 5_000_000;

/// Levy charged when disposing of items worth `gross`.
pub fn sales_tax(gross: i64) -> i64 {
    if gross < UNTAXED_BELOW {
        0
    } else {
        TAX_CAP.min(gross * TAX_PERCENT / 100)
    }
}

pub fn apply_tax(gross: i64) -> i64 {
    gross - sales_tax(gross)
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PricingError {
    #[error("unknown recipe `{0}`")]
    UnknownRecipe(String),
    #[error("recipe `{recipe}` has no {} price for item {item}", .side.label())]
    Unresolvable {
        recipe: String,
        item: ItemId,
        side: PriceSide,
    },
}

/// One priced input or output of a recipe.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PricedLine {
    pub item_id: ItemId,
    pub name: String,
    /// Quantity consumed or produced by a single craft.
    pub quantity: f64,
    pub unit_price: i64,
    /// Units to buy (or sell) for the whole affordable batch.
    pub to_acquire: i64,
    /// `unit_price` times the batch size.
    pub batch_total: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Outcome {
    pub cost: i64,
    pub gross_revenue: i64,
    /// Revenue after tax.
    pub revenue: i64,
    pub margin: i64,
    /// Crafts affordable with the available coins.
    pub amount: i64,
    pub total_margin: i64,
    pub total_time_hours: Option<f64>,
    /// Margin per hour of a single craft, independent of `amount`.
    pub throughput_per_hour: Option<i64>,
    pub inputs: Vec<PricedLine>,
    pub outputs: Vec<PricedLine>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Evaluation {
    pub recipe: String,
    pub members: bool,
    pub safety_margin_percent: f64,
    pub basic: Outcome,
    pub adjusted: Outcome,
}

/// One recipe's evaluation inside a batch, with the membership flag kept even on failure.
#[derive(Clone, Debug, PartialEq)]
pub struct RecipeResult {
    pub name: String,
    pub members: bool,
    pub result: Result<Evaluation, PricingError>,
}

/// Prices recipes against a market snapshot. Holds borrows only.
#[derive(Clone, Copy)]
pub struct PricingEngine<'a> {
    market: &'a MarketCatalog,
    recipes: &'a RecipeCatalog,
}

impl<'a> PricingEngine<'a> {
    pub fn new(market: &'a MarketCatalog, recipes: &'a RecipeCatalog) -> Self {
        Self { market, recipes }
    }

    pub fn evaluate(
        &self,
        recipe_name: &str,
        coins: i64,
        safety_margin_percent: f64,
    ) -> Result<Evaluation, PricingError> {
        let recipe = self
            .recipes
            .get(recipe_name)
            .ok_or_else(|| PricingError::UnknownRecipe(recipe_name.to_string()))?;
        self.evaluate_recipe(recipe, coins, safety_margin_percent)
    }

    pub fn evaluate_recipe(
        &self,
        recipe: &Recipe,
        coins: i64,
        safety_margin_percent: f64,
    ) -> Result<Evaluation, PricingError> {
        let buy_factor = 1.0 + safety_margin_percent / 100.0;
        let sell_factor = 1.0 - safety_margin_percent / 100.0;

        let basic = self.outcome(recipe, coins, 1.0, 1.0)?;
        let adjusted = self.outcome(recipe, coins, buy_factor, sell_factor)?;

        Ok(Evaluation {
            recipe: recipe.name.clone(),
            members: recipe.members,
            safety_margin_percent,
            basic,
            adjusted,
        })
    }

    /// Evaluates every catalog recipe, in catalog name order.
    pub fn evaluate_all(
        &self,
        coins: i64,
        safety_margin_percent: f64,
    ) -> Vec<RecipeResult> {
        let recipes: Vec<&Recipe> = self.recipes.iter().collect();
        recipes
            .par_iter()
            .map(|recipe| RecipeResult {
                name: recipe.name.clone(),
                members: recipe.members,
                result: self.evaluate_recipe(recipe, coins, safety_margin_percent),
            })
            .collect()
    }

    fn outcome(
        &self,
        recipe: &Recipe,
        coins: i64,
        buy_factor: f64,
        sell_factor: f64,
    ) -> Result<Outcome, PricingError> {
        let mut inputs = self.price_lines(recipe, &recipe.inputs, PriceSide::Buy, buy_factor)?;
        let mut outputs =
            self.price_lines(recipe, &recipe.outputs, PriceSide::Sell, sell_factor)?;

        let cost = total_price(&inputs);
        let gross_revenue = total_price(&outputs);
        let revenue = apply_tax(gross_revenue);
        let margin = revenue - cost;
        let amount = affordable_amount(coins, cost);
        let (total_time_hours, throughput_per_hour) = timing(recipe.duration, amount, margin);

        for line in inputs.iter_mut().chain(outputs.iter_mut()) {
            line.to_acquire = (line.quantity * amount as f64).floor() as i64;
            line.batch_total = line.unit_price.saturating_mul(amount);
        }

        Ok(Outcome {
            cost,
            gross_revenue,
            revenue,
            margin,
            amount,
            total_margin: margin.saturating_mul(amount),
            total_time_hours,
            throughput_per_hour,
            inputs,
            outputs,
        })
    }

    fn price_lines(
        &self,
        recipe: &Recipe,
        quantities: &ItemQuantities,
        side: PriceSide,
        factor: f64,
    ) -> Result<Vec<PricedLine>, PricingError> {
        quantities
            .iter()
            .map(|(item, quantity)| {
                let unresolvable = || PricingError::Unresolvable {
                    recipe: recipe.name.clone(),
                    item,
                    side,
                };
                let quote = self.market.quote(item).ok_or_else(unresolvable)?;
                let price = quote.price(side).ok_or_else(unresolvable)?;

                Ok(PricedLine {
                    item_id: item,
                    name: quote.name.clone(),
                    quantity,
                    unit_price: (price as f64 * factor).floor() as i64,
                    to_acquire: 0,
                    batch_total: 0,
                })
            })
            .collect()
    }
}

fn total_price(lines: &[PricedLine]) -> i64 {
    lines
        .iter()
        .map(|line| line.unit_price as f64 * line.quantity)
        .sum::<f64>()
        .floor() as i64
}

/// Zero cost counts as "cannot craft" rather than an infinite batch.
pub fn affordable_amount(coins: i64, cost: i64) -> i64 {
    if cost <= 0 {
        return 0;
    }
    (coins / cost).max(0)
}

fn timing(duration: CraftDuration, amount: i64, margin: i64) -> (Option<f64>, Option<i64>) {
    let Some(hours) = duration.hours() else {
        return (None, None);
    };
    let total_hours = round_to_hundredths(amount as f64 * hours);
    let per_hour = (margin as f64 / hours).floor() as i64;
    (Some(total_hours), Some(per_hour))
}

fn round_to_hundredths(value: f64) -> f64 {
    // ties to even, like formatting with two decimals
    (value * 100.0).round_ties_even() / 100.0
}
