//! Validated recipe definitions.

use std::collections::{BTreeMap, HashMap};

use thiserror::Error;
use tracing::{debug, warn};

use super::entities::{CraftDuration, ItemQuantities, RecipeDefinition};
use super::market::{ItemDirectory, MarketCatalog};

/// Documentation placeholder in recipe files; never a real recipe.
pub const TEMPLATE_RECIPE: &str = "Template";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecipeError {
    #[error("recipe `{recipe}` references unknown item `{item}`")]
    UnknownItem { recipe: String, item: String },
    #[error("recipe `{recipe}` references `{item}` which has no usable quote")]
    UnusableQuote { recipe: String, item: String },
    #[error("recipe `{recipe}` has invalid quantity {quantity} for `{item}`")]
    InvalidQuantity {
        recipe: String,
        item: String,
        quantity: f64,
    },
    #[error("recipe `{recipe}` lists `{item}` more than once")]
    DuplicateItem { recipe: String, item: String },
    #[error("recipe `{recipe}` has no {side}")]
    EmptySide { recipe: String, side: &'static str },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Recipe {
    pub name: String,
    pub members: bool,
    pub inputs: ItemQuantities,
    pub outputs: ItemQuantities,
    pub duration: CraftDuration,
}

impl Recipe {
    /// Resolves every item of `definition` to a usable quote.
    pub fn resolve(
        name: &str,
        definition: &RecipeDefinition,
        directory: &ItemDirectory,
        market: &MarketCatalog,
    ) -> Result<Self, RecipeError> {
        let inputs = resolve_side(name, "inputs", &definition.inputs, directory, market)?;
        let outputs = resolve_side(name, "outputs", &definition.outputs, directory, market)?;

        Ok(Self {
            name: name.to_string(),
            members: definition.members,
            inputs,
            outputs,
            duration: CraftDuration::from_seconds(definition.time),
        })
    }
}

fn resolve_side(
    recipe: &str,
    side: &'static str,
    items: &HashMap<String, f64>,
    directory: &ItemDirectory,
    market: &MarketCatalog,
) -> Result<ItemQuantities, RecipeError> {
    if items.is_empty() {
        return Err(RecipeError::EmptySide {
            recipe: recipe.to_string(),
            side,
        });
    }

    // Sorted so the reported error does not depend on hash order.
    let mut names: Vec<(&String, &f64)> = items.iter().collect();
    names.sort_by(|a, b| a.0.cmp(b.0));

    let mut quantities = ItemQuantities::new();
    for (item, &quantity) in names {
        if !quantity.is_finite() || quantity <= 0.0 {
            return Err(RecipeError::InvalidQuantity {
                recipe: recipe.to_string(),
                item: item.clone(),
                quantity,
            });
        }

        let id = directory
            .id_of(item)
            .ok_or_else(|| RecipeError::UnknownItem {
                recipe: recipe.to_string(),
                item: item.clone(),
            })?;

        if !market.quote(id).map(|q| q.is_usable()).unwrap_or(false) {
            return Err(RecipeError::UnusableQuote {
                recipe: recipe.to_string(),
                item: item.clone(),
            });
        }

        if !quantities.insert(id, quantity) {
            return Err(RecipeError::DuplicateItem {
                recipe: recipe.to_string(),
                item: item.clone(),
            });
        }
    }

    Ok(quantities)
}

/// Recipes that resolved against the market, keyed by name.
#[derive(Clone, Debug, Default)]
pub struct RecipeCatalog {
    recipes: BTreeMap<String, Recipe>,
    rejected: Vec<(String, RecipeError)>,
}

impl RecipeCatalog {
    pub fn build<I, S>(definitions: I, directory: &ItemDirectory, market: &MarketCatalog) -> Self
    where
        I: IntoIterator<Item = (S, RecipeDefinition)>,
        S: Into<String>,
    {
        let mut catalog = Self::default();

        for (name, definition) in definitions {
            let name: String = name.into();
            if name == TEMPLATE_RECIPE {
                continue;
            }

            match Recipe::resolve(&name, &definition, directory, market) {
                Ok(recipe) => {
                    if catalog.recipes.insert(name.clone(), recipe).is_some() {
                        debug!(recipe = %name, "recipe defined twice, keeping the later one");
                    }
                }
                Err(error) => {
                    warn!(recipe = %name, %error, "skipping recipe");
                    catalog.rejected.push((name, error));
                }
            }
        }

        catalog.rejected.sort_by(|a, b| a.0.cmp(&b.0));
        debug!(
            loaded = catalog.recipes.len(),
            rejected = catalog.rejected.len(),
            "built recipe catalog"
        );
        catalog
    }

    pub fn get(&self, name: &str) -> Option<&Recipe> {
        self.recipes.get(name)
    }

    /// Names of every valid recipe, sorted.
    pub fn all_names(&self) -> impl Iterator<Item = &str> {
        self.recipes.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Recipe> {
        self.recipes.values()
    }

    pub fn rejected(&self) -> &[(String, RecipeError)] {
        &self.rejected
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}
