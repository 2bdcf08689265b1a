//! Pricing and ranking logic. No I/O lives here.

pub mod entities;
pub mod market;
pub mod pricing;
pub mod ranking;
pub mod recipes;

pub use entities::{
    CraftDuration, ItemId, ItemQuantities, ItemQuote, Membership, PriceSide, RecipeDefinition,
    COINS_ITEM_ID, COINS_ITEM_NAME,
};
pub use market::{ItemDirectory, MarketCatalog};
pub use pricing::{
    affordable_amount, apply_tax, sales_tax, Evaluation, Outcome, PricedLine, PricingEngine,
    PricingError, RecipeResult,
};
pub use ranking::{
    compare_drift, rank, rank_all, rank_drift, OutcomeVariant, RankDrift, RankError, RankOptions,
    RankedRow, RankingReport, SortDirection, Weights,
};
pub use recipes::{Recipe, RecipeCatalog, RecipeError, TEMPLATE_RECIPE};
