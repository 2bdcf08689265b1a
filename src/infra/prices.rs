//! Thin asynchronous client for the real-time prices API.
//!
//! - `latest` returns the most recent instant-buy (`high`) and instant-sell
//!   (`low`) price per item id; `5m` and `1h` return averages over the window
//!   (`avgHighPrice`, `avgLowPrice`) stamped with the window start.
//! - `mapping` returns id, name and membership for every tradeable item.
//!
//! Nothing is cached here; the last pull is kept on disk by `infra::cache`.

use std::{
    collections::{BTreeMap, HashMap},
    time::Duration,
};

use reqwest::{Client, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::{ItemDirectory, ItemId, ItemQuote};

pub const DEFAULT_BASE_URL: &str = "https://prices.runescape.wiki/api/v1/osrs/";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum PriceFeedError {
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("http request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("api error: {0}")]
    Api(String),
}

/// Which price endpoint to pull.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceTimespan {
    #[default]
    #[serde(rename = "latest")]
    Latest,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "1h")]
    OneHour,
}

impl PriceTimespan {
    pub fn endpoint(&self) -> &'static str {
        match self {
            Self::Latest => "latest",
            Self::FiveMinutes => "5m",
            Self::OneHour => "1h",
        }
    }
}

/// Prices for one item. `high` is what buyers pay, `low` what sellers get.
/// Averaged endpoints fill the same fields from `avgHighPrice`/`avgLowPrice`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LatestPrice {
    #[serde(default, alias = "avgHighPrice")]
    pub high: Option<i64>,
    #[serde(default, rename = "highTime")]
    pub high_time: Option<i64>,
    #[serde(default, alias = "avgLowPrice")]
    pub low: Option<i64>,
    #[serde(default, rename = "lowTime")]
    pub low_time: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemMapping {
    pub id: ItemId,
    pub name: String,
    #[serde(default)]
    pub members: bool,
}

pub type LatestPrices = BTreeMap<ItemId, LatestPrice>;

#[derive(Debug, Deserialize)]
struct PriceEnvelope {
    #[serde(default)]
    data: Option<HashMap<String, LatestPrice>>,
    /// Window start for averaged endpoints.
    #[serde(default)]
    timestamp: Option<i64>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Clone)]
pub struct PriceFeedClient {
    http: Client,
    base_url: Url,
}

impl PriceFeedClient {
    /// The API rejects anonymous clients, so a descriptive user agent is required.
    pub fn new(base: &str, user_agent: &str) -> Result<Self, PriceFeedError> {
        let base_url = Url::parse(base)?;
        let http = Client::builder()
            .user_agent(user_agent)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { http, base_url })
    }

    pub async fn get_prices(&self, timespan: PriceTimespan) -> Result<LatestPrices, PriceFeedError> {
        let url = self.base_url.join(timespan.endpoint())?;
        info!(%url, "requesting prices");
        let prices = parse_prices(self.fetch_json::<PriceEnvelope>(url).await?)?;
        info!(items = prices.len(), timespan = timespan.endpoint(), "received prices");
        Ok(prices)
    }

    pub async fn get_mapping(&self) -> Result<Vec<ItemMapping>, PriceFeedError> {
        let url = self.base_url.join("mapping")?;
        info!(%url, "requesting item mapping");
        let mapping: Vec<ItemMapping> = self.fetch_json(url).await?;
        info!(items = mapping.len(), "received item mapping");
        Ok(mapping)
    }

    async fn fetch_json<T>(&self, url: Url) -> Result<T, PriceFeedError>
    where
        T: DeserializeOwned,
    {
        let response = self.http.get(url).send().await?.error_for_status()?;
        Ok(response.json().await?)
    }
}

fn parse_prices(envelope: PriceEnvelope) -> Result<LatestPrices, PriceFeedError> {
    let PriceEnvelope {
        data,
        timestamp,
        error,
    } = envelope;
    let Some(data) = data else {
        return Err(PriceFeedError::Api(
            error.unwrap_or_else(|| "response missing data".to_string()),
        ));
    };

    Ok(data
        .into_iter()
        .filter_map(|(key, mut price)| match key.parse::<ItemId>() {
            Ok(id) => {
                if price.high.is_some() && price.high_time.is_none() {
                    price.high_time = timestamp;
                }
                if price.low.is_some() && price.low_time.is_none() {
                    price.low_time = timestamp;
                }
                Some((id, price))
            }
            Err(_) => {
                debug!(%key, "ignoring non-numeric item key");
                None
            }
        })
        .collect())
}

/// Joins names from the mapping with the prices; items with no price entry are skipped.
pub fn join_quotes(mapping: &[ItemMapping], latest: &LatestPrices) -> Vec<ItemQuote> {
    mapping
        .iter()
        .filter_map(|item| {
            let price = latest.get(&item.id)?;
            Some(ItemQuote {
                id: item.id,
                name: item.name.clone(),
                buy_price: price.high,
                sell_price: price.low,
                buy_observed_at: price.high_time,
                sell_observed_at: price.low_time,
            })
        })
        .collect()
}

pub fn directory_from_mapping(mapping: &[ItemMapping]) -> ItemDirectory {
    ItemDirectory::from_pairs(mapping.iter().map(|item| (item.id, item.name.clone())))
}
