//! On-disk snapshot of the last price feed pull, with TTL tracking.

use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::OnceLock,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::{debug, info, warn};

use super::prices::{ItemMapping, LatestPrices, PriceTimespan};

const SNAPSHOT_FILENAME: &str = "price_snapshot.json";
const DATA_DIR_NAME: &str = "recipe-margin-scanner";

/// Snapshots older than this are reported as expired. They stay loadable as a fallback.
pub const SNAPSHOT_TTL: Duration = Duration::from_secs(6 * 60 * 60);

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

/// Item mapping plus latest prices, as fetched together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    /// Unix timestamp (seconds) when the feed was pulled.
    pub cached_at: u64,
    /// Endpoint the prices were pulled from.
    #[serde(default)]
    pub timespan: PriceTimespan,
    pub mapping: Vec<ItemMapping>,
    pub prices: LatestPrices,
}

impl PriceSnapshot {
    pub fn new(mapping: Vec<ItemMapping>, prices: LatestPrices) -> Self {
        Self {
            cached_at: unix_now(),
            timespan: PriceTimespan::default(),
            mapping,
            prices,
        }
    }

    pub fn with_timespan(mut self, timespan: PriceTimespan) -> Self {
        self.timespan = timespan;
        self
    }

    pub fn is_expired(&self) -> bool {
        self.age() > SNAPSHOT_TTL
    }

    pub fn age(&self) -> Duration {
        Duration::from_secs(unix_now().saturating_sub(self.cached_at))
    }

    /// Human-readable age string.
    pub fn age_string(&self) -> String {
        let secs = self.age().as_secs();
        if secs < 60 {
            format!("{secs}s")
        } else if secs < 3600 {
            format!("{}m", secs / 60)
        } else if secs < 86400 {
            format!("{}h", secs / 3600)
        } else {
            format!("{}d", secs / 86400)
        }
    }

    /// RFC 3339 timestamp of the pull, if representable.
    pub fn cached_at_label(&self) -> Option<String> {
        OffsetDateTime::from_unix_timestamp(i64::try_from(self.cached_at).ok()?)
            .ok()?
            .format(&Rfc3339)
            .ok()
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Default snapshot location in the local data directory.
pub fn snapshot_path() -> PathBuf {
    static PATH: OnceLock<PathBuf> = OnceLock::new();
    PATH.get_or_init(|| {
        let base = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DATA_DIR_NAME);
        base.join(SNAPSHOT_FILENAME)
    })
    .clone()
}

/// Loads a snapshot if one exists and parses. Expired snapshots are still returned.
pub fn load_snapshot(path: &Path) -> Option<PriceSnapshot> {
    if !path.exists() {
        debug!(path = %path.display(), "no price snapshot found");
        return None;
    }

    match fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str::<PriceSnapshot>(&content) {
            Ok(snapshot) => {
                if snapshot.is_expired() {
                    warn!(age = %snapshot.age_string(), "price snapshot is expired");
                } else {
                    info!(
                        items = snapshot.prices.len(),
                        age = %snapshot.age_string(),
                        "loaded price snapshot"
                    );
                }
                Some(snapshot)
            }
            Err(e) => {
                warn!(error = %e, "failed to parse price snapshot");
                None
            }
        },
        Err(e) => {
            warn!(error = %e, "failed to read price snapshot");
            None
        }
    }
}

pub fn save_snapshot(path: &Path, snapshot: &PriceSnapshot) -> Result<(), SnapshotError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    // compact, the price table is large
    let content = serde_json::to_string(snapshot)?;
    fs::write(path, content)?;
    info!(
        items = snapshot.prices.len(),
        path = %path.display(),
        "saved price snapshot"
    );
    Ok(())
}
