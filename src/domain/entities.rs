use std::collections::{btree_map, BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Stable item identifier as issued by the price feed.
pub type ItemId = u32;

/// Reserved id of the base currency unit.
pub const COINS_ITEM_ID: ItemId = 617;
pub const COINS_ITEM_NAME: &str = "Coins";

/// Which side of the order book a price is taken from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PriceSide {
    /// What a buyer pays to acquire the item (recipe inputs).
    Buy,
    /// What a seller receives on disposal, before tax (recipe outputs).
    Sell,
}

impl PriceSide {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }
}

/// Latest observed quote for one item.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemQuote {
    pub id: ItemId,
    pub name: String,
    /// Highest observed buy offer.
    pub buy_price: Option<i64>,
    /// Lowest observed sell offer.
    pub sell_price: Option<i64>,
    /// Unix seconds of the buy observation.
    #[serde(default)]
    pub buy_observed_at: Option<i64>,
    /// Unix seconds of the sell observation.
    #[serde(default)]
    pub sell_observed_at: Option<i64>,
}

impl ItemQuote {
    pub fn new(
        id: ItemId,
        name: impl Into<String>,
        buy_price: Option<i64>,
        sell_price: Option<i64>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            buy_price,
            sell_price,
            buy_observed_at: None,
            sell_observed_at: None,
        }
    }

    /// The synthetic quote for the currency unit itself.
    pub fn coins() -> Self {
        Self {
            id: COINS_ITEM_ID,
            name: COINS_ITEM_NAME.to_string(),
            buy_price: Some(1),
            sell_price: Some(1),
            buy_observed_at: Some(0),
            sell_observed_at: Some(0),
        }
    }

    /// A quote with neither side observed cannot price anything.
    pub fn is_usable(&self) -> bool {
        self.buy_price.is_some() || self.sell_price.is_some()
    }

    pub fn price(&self, side: PriceSide) -> Option<i64> {
        match side {
            PriceSide::Buy => self.buy_price,
            PriceSide::Sell => self.sell_price,
        }
    }
}

/// Per-item quantities of one side of a recipe, keyed by item id.
///
/// Iterates in id order so that summed prices are reproducible.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ItemQuantities {
    entries: BTreeMap<ItemId, f64>,
}

impl ItemQuantities {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a quantity, returning `false` if the item is already present.
    pub fn insert(&mut self, item: ItemId, quantity: f64) -> bool {
        match self.entries.entry(item) {
            btree_map::Entry::Occupied(_) => false,
            btree_map::Entry::Vacant(slot) => {
                slot.insert(quantity);
                true
            }
        }
    }

    pub fn get(&self, item: ItemId) -> Option<f64> {
        self.entries.get(&item).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ItemId, f64)> + '_ {
        self.entries.iter().map(|(id, qty)| (*id, *qty))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// How long one craft takes.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum CraftDuration {
    Seconds(f64),
    #[default]
    Unknown,
}

impl CraftDuration {
    /// Missing, non-finite and non-positive durations are all `Unknown`.
    pub fn from_seconds(seconds: Option<f64>) -> Self {
        match seconds {
            Some(secs) if secs.is_finite() && secs > 0.0 => Self::Seconds(secs),
            _ => Self::Unknown,
        }
    }

    pub fn hours(&self) -> Option<f64> {
        match self {
            Self::Seconds(secs) => Some(secs / 3600.0),
            Self::Unknown => None,
        }
    }
}

/// Recipe as written in the definitions file, keyed by display name.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RecipeDefinition {
    #[serde(default)]
    pub members: bool,
    #[serde(default)]
    pub inputs: HashMap<String, f64>,
    #[serde(default)]
    pub outputs: HashMap<String, f64>,
    /// Craft duration in seconds.
    #[serde(default)]
    pub time: Option<f64>,
}

/// Which membership tier a ranking should cover.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Membership {
    #[default]
    Both,
    FreeOnly,
    MembersOnly,
}

impl Membership {
    pub fn allows(&self, members_recipe: bool) -> bool {
        match self {
            Self::Both => true,
            Self::FreeOnly => !members_recipe,
            Self::MembersOnly => members_recipe,
        }
    }
}
