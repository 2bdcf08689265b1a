//! Item identity and the latest quote per item.

use std::collections::HashMap;

use tracing::debug;

use super::entities::{ItemId, ItemQuote, COINS_ITEM_ID, COINS_ITEM_NAME};

/// Read-only quote table for one evaluation pass.
#[derive(Clone, Debug, Default)]
pub struct MarketCatalog {
    quotes: HashMap<ItemId, ItemQuote>,
}

impl MarketCatalog {
    /// Builds the catalog; the coins quote is always present and always wins.
    pub fn from_quotes<I>(quotes: I) -> Self
    where
        I: IntoIterator<Item = ItemQuote>,
    {
        let mut quotes: HashMap<ItemId, ItemQuote> =
            quotes.into_iter().map(|quote| (quote.id, quote)).collect();
        quotes.insert(COINS_ITEM_ID, ItemQuote::coins());
        Self { quotes }
    }

    pub fn quote(&self, item: ItemId) -> Option<&ItemQuote> {
        self.quotes.get(&item)
    }

    /// Drops every quote whose display name is listed. Returns how many were removed.
    pub fn ignore_items<S: AsRef<str>>(&mut self, names: &[S]) -> usize {
        let before = self.quotes.len();
        self.quotes.retain(|id, quote| {
            *id == COINS_ITEM_ID || !names.iter().any(|name| name.as_ref() == quote.name)
        });
        let removed = before - self.quotes.len();
        debug!(removed, "dropped ignored items from market");
        removed
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}

/// Bidirectional display-name <-> id lookup used to resolve recipe definitions.
#[derive(Clone, Debug)]
pub struct ItemDirectory {
    name_to_id: HashMap<String, ItemId>,
    id_to_name: HashMap<ItemId, String>,
}

impl Default for ItemDirectory {
    fn default() -> Self {
        Self::from_pairs(std::iter::empty::<(ItemId, String)>())
    }
}

impl ItemDirectory {
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (ItemId, S)>,
        S: Into<String>,
    {
        let mut directory = Self {
            name_to_id: HashMap::new(),
            id_to_name: HashMap::new(),
        };
        for (id, name) in pairs {
            directory.insert(id, name.into());
        }
        directory.insert(COINS_ITEM_ID, COINS_ITEM_NAME.to_string());
        directory
    }

    fn insert(&mut self, id: ItemId, name: String) {
        self.name_to_id.insert(name.clone(), id);
        self.id_to_name.insert(id, name);
    }

    pub fn id_of(&self, name: &str) -> Option<ItemId> {
        self.name_to_id.get(name).copied()
    }

    pub fn name_of(&self, id: ItemId) -> Option<&str> {
        self.id_to_name.get(&id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.id_to_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_name.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coins_quote_always_present() {
        let market = MarketCatalog::from_quotes(vec![ItemQuote::new(
            COINS_ITEM_ID,
            "Coins",
            Some(99),
            None,
        )]);
        let coins = market.quote(COINS_ITEM_ID).unwrap();
        assert_eq!(coins.buy_price, Some(1));
        assert_eq!(coins.sell_price, Some(1));
    }

    #[test]
    fn ignore_items_keeps_coins() {
        let mut market = MarketCatalog::from_quotes(vec![
            ItemQuote::new(1, "Feather", Some(2), Some(2)),
            ItemQuote::new(2, "Bowstring", Some(100), Some(90)),
        ]);
        let removed = market.ignore_items(&["Feather", "Coins"]);
        assert_eq!(removed, 1);
        assert!(market.quote(1).is_none());
        assert!(market.quote(2).is_some());
        assert!(market.quote(COINS_ITEM_ID).is_some());
    }

    #[test]
    fn directory_resolves_both_ways() {
        let directory = ItemDirectory::from_pairs(vec![(2, "Cannonball"), (3, "Steel bar")]);
        assert_eq!(directory.id_of("Steel bar"), Some(3));
        assert_eq!(directory.name_of(2), Some("Cannonball"));
        assert_eq!(directory.id_of(COINS_ITEM_NAME), Some(COINS_ITEM_ID));
        assert_eq!(directory.id_of("Nope"), None);
    }
}
