//! Recipe definitions file: a JSON object keyed by recipe display name.

use std::{collections::BTreeMap, fs, io, path::Path};

use thiserror::Error;
use tracing::debug;

use crate::domain::RecipeDefinition;

#[derive(Debug, Error)]
pub enum RecipeFileError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type RecipeDefinitions = BTreeMap<String, RecipeDefinition>;

pub fn load_recipe_definitions(path: &Path) -> Result<RecipeDefinitions, RecipeFileError> {
    let content = fs::read_to_string(path).map_err(|source| RecipeFileError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let definitions = parse_recipe_definitions(&content).map_err(|source| RecipeFileError::Parse {
        path: path.display().to_string(),
        source,
    })?;
    debug!(count = definitions.len(), path = %path.display(), "read recipe definitions");
    Ok(definitions)
}

pub fn parse_recipe_definitions(content: &str) -> Result<RecipeDefinitions, serde_json::Error> {
    serde_json::from_str(content)
}
