use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use serde_json::Error as SerdeError;

use crate::domain::{Membership, OutcomeVariant, RankOptions, SortDirection, Weights};
use crate::infra::prices::{PriceTimespan, DEFAULT_BASE_URL};

const APP_QUALIFIER: &str = "com";
const APP_ORG: &str = "RecipeMarginScanner";
const APP_NAME: &str = "RecipeMarginScanner";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Coins available to spend on one batch.
    pub coins: i64,
    /// Buffer applied to prices for the pessimistic estimate.
    pub safety_margin_percent: f64,
    pub weights: Weights,
    pub display: DisplaySettings,
    /// Item names dropped from the market before recipes are resolved.
    pub ignore_items: Vec<String>,
    pub recipes_path: PathBuf,
    pub feed: FeedSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            coins: 10_000_000,
            safety_margin_percent: 2.5,
            weights: Weights::default(),
            display: DisplaySettings::default(),
            ignore_items: Vec::new(),
            recipes_path: PathBuf::from("recipes.json"),
            feed: FeedSettings::default(),
        }
    }
}

impl Settings {
    pub fn rank_options(&self) -> RankOptions {
        RankOptions {
            weights: self.weights,
            filter_profitable_only: self.display.filter_profitable_only,
            show_hidden: self.display.show_hidden,
            include_unresolvable: self.display.include_unresolvable,
            direction: SortDirection::from_descending(self.display.descending),
            membership: self.display.membership,
            variant: self.display.variant,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    pub filter_profitable_only: bool,
    pub show_hidden: bool,
    pub include_unresolvable: bool,
    pub descending: bool,
    pub membership: Membership,
    pub variant: OutcomeVariant,
    /// Rows shown in the overview table; 0 shows all.
    pub number: usize,
    /// How many of the best recipes get a full breakdown.
    pub top: usize,
    /// Recipes that always get a full breakdown.
    pub specific: Vec<String>,
}

impl DisplaySettings {
    /// Breakdowns never go past the rows shown in the overview.
    pub fn breakdown_count(&self) -> usize {
        if self.number == 0 {
            self.top
        } else {
            self.top.min(self.number)
        }
    }
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            filter_profitable_only: true,
            show_hidden: false,
            include_unresolvable: false,
            descending: true,
            membership: Membership::Both,
            variant: OutcomeVariant::Basic,
            number: 0,
            top: 3,
            specific: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedSettings {
    pub base_url: String,
    /// Overrides the built-in user agent; the API asks for a contact address in it.
    pub user_agent: Option<String>,
    pub timespan: PriceTimespan,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: None,
            timespan: PriceTimespan::Latest,
        }
    }
}

/// Default settings location in the per-user config directory.
pub fn data_file() -> Option<PathBuf> {
    ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME)
        .map(|dirs| dirs.config_dir().join("settings.json"))
}

/// Reads settings from `path` (or the default location). A missing file yields defaults.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, SettingsError> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => match data_file() {
            Some(path) => path,
            None => return Ok(Settings::default()),
        },
    };

    match fs::read_to_string(&path) {
        Ok(data) => Ok(serde_json::from_str(&data)?),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Settings::default()),
        Err(err) => Err(err.into()),
    }
}

pub fn save_settings(path: Option<&Path>, settings: &Settings) -> Result<(), SettingsError> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => data_file().ok_or(SettingsError::StorageUnavailable)?,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    fs::write(path, json)?;
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("storage directory unavailable")]
    StorageUnavailable,
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serde(#[from] SerdeError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings(Some(&dir.path().join("settings.json"))).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(
            &path,
            r#"{"coins": 250000, "display": {"membership": "free_only", "descending": false}}"#,
        )
        .unwrap();

        let settings = load_settings(Some(&path)).unwrap();
        assert_eq!(settings.coins, 250_000);
        assert_eq!(settings.safety_margin_percent, 2.5);
        assert_eq!(settings.display.membership, Membership::FreeOnly);
        assert!(settings.display.filter_profitable_only);

        let options = settings.rank_options();
        assert_eq!(options.direction, SortDirection::Ascending);
        assert_eq!(options.weights, Weights::default());
    }

    #[test]
    fn saved_settings_load_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf").join("settings.json");
        let mut settings = Settings::default();
        settings.ignore_items = vec!["Feather".to_string()];
        settings.display.variant = OutcomeVariant::Adjusted;

        save_settings(Some(&path), &settings).unwrap();
        assert_eq!(load_settings(Some(&path)).unwrap(), settings);
    }

    #[test]
    fn overview_number_caps_breakdowns() {
        let mut display = DisplaySettings::default();
        assert_eq!(display.breakdown_count(), 3);

        display.number = 2;
        assert_eq!(display.breakdown_count(), 2);

        display.number = 10;
        assert_eq!(display.breakdown_count(), 3);
    }

    #[test]
    fn feed_timespan_reads_endpoint_names() {
        let settings: Settings =
            serde_json::from_str(r#"{"feed": {"timespan": "5m"}, "display": {"number": 20}}"#).unwrap();
        assert_eq!(settings.feed.timespan, PriceTimespan::FiveMinutes);
        assert_eq!(settings.feed.base_url, DEFAULT_BASE_URL);
        assert_eq!(settings.display.number, 20);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "coins = 5").unwrap();
        assert!(matches!(
            load_settings(Some(&path)),
            Err(SettingsError::Serde(_))
        ));
    }
}
