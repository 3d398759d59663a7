use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::PricingConfig;

#[derive(thiserror::Error, Debug)]
pub enum PricingError {
    #[error("Currency not found: {0}")]
    UnknownCurrency(String),
    #[error("Currency {0} has no image")]
    NoImage(String),
    #[error("Pricing API returned {status} for {url}")]
    UnexpectedStatus {
        status: reqwest::StatusCode,
        url: String,
    },
    #[error("Pricing API request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Currency lookups backed by a periodically refreshed market cache
#[async_trait]
pub trait PricingService: Send + Sync {
    /// Plain-text summary of a currency, may contain `:shortcode:` emoji
    async fn format_currency_details(&self, slug: &str) -> Result<String, PricingError>;

    /// Image bytes for a currency
    async fn render_currency_image(&self, slug: &str) -> Result<Vec<u8>, PricingError>;

    /// Reload the market cache, returning the number of currencies cached
    async fn refresh(&self) -> Result<usize, PricingError>;
}

/// One entry of the `/coins/markets` listing
#[derive(Debug, Clone, Deserialize)]
pub struct Currency {
    pub id: String,
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub current_price: Option<f64>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub market_cap_rank: Option<u32>,
    #[serde(default)]
    pub total_volume: Option<f64>,
    #[serde(default)]
    pub price_change_percentage_24h: Option<f64>,
    #[serde(default)]
    pub last_updated: Option<String>,
}

#[derive(Default)]
struct MarketCache {
    /// Keyed by lower-cased id and symbol
    currencies: HashMap<String, Currency>,
    refreshed_at: Option<DateTime<Utc>>,
}

pub struct CoinMarketService {
    client: reqwest::Client,
    config: PricingConfig,
    cache: RwLock<MarketCache>,
}

impl CoinMarketService {
    pub fn new(config: PricingConfig) -> Result<Self, PricingError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            config,
            cache: RwLock::new(MarketCache::default()),
        })
    }

    async fn fetch_markets(&self) -> Result<Vec<Currency>, PricingError> {
        let url = format!("{}/coins/markets", self.config.api_url.trim_end_matches('/'));

        debug!("Fetching market listing from {}", url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("vs_currency", self.config.vs_currency.as_str()),
                ("order", "market_cap_desc"),
                ("per_page", "250"),
                ("page", "1"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PricingError::UnexpectedStatus { status, url });
        }

        Ok(response.json().await?)
    }

    /// Look a slug up in the cache, loading it first if it was never filled
    async fn lookup(&self, slug: &str) -> Result<(Currency, Option<DateTime<Utc>>), PricingError> {
        let needs_refresh = self.cache.read().await.refreshed_at.is_none();
        if needs_refresh {
            self.refresh().await?;
        }

        let cache = self.cache.read().await;
        cache
            .currencies
            .get(&slug.trim().to_lowercase())
            .cloned()
            .map(|currency| (currency, cache.refreshed_at))
            .ok_or_else(|| PricingError::UnknownCurrency(slug.to_string()))
    }

    fn image_url(&self, currency: &Currency) -> Option<String> {
        match &self.config.image_url {
            Some(template) => Some(template.replace("{slug}", &currency.id)),
            None => currency.image.clone(),
        }
    }
}

#[async_trait]
impl PricingService for CoinMarketService {
    async fn format_currency_details(&self, slug: &str) -> Result<String, PricingError> {
        let (currency, refreshed_at) = self.lookup(slug).await?;
        Ok(format_details(&currency, &self.config.vs_currency, refreshed_at))
    }

    async fn render_currency_image(&self, slug: &str) -> Result<Vec<u8>, PricingError> {
        let (currency, _) = self.lookup(slug).await?;
        let url = self
            .image_url(&currency)
            .ok_or_else(|| PricingError::NoImage(currency.id.clone()))?;

        debug!("Downloading image for {} from {}", currency.id, url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PricingError::UnexpectedStatus { status, url });
        }

        Ok(response.bytes().await?.to_vec())
    }

    async fn refresh(&self) -> Result<usize, PricingError> {
        let markets = self.fetch_markets().await?;
        let count = markets.len();

        let mut currencies = HashMap::with_capacity(markets.len() * 2);
        for currency in markets {
            // Listing is ordered by market cap, so the largest coin keeps a shared symbol
            currencies
                .entry(currency.symbol.to_lowercase())
                .or_insert_with(|| currency.clone());
            currencies.insert(currency.id.to_lowercase(), currency);
        }

        let mut cache = self.cache.write().await;
        cache.currencies = currencies;
        cache.refreshed_at = Some(Utc::now());

        info!("Market cache refreshed: {} currencies", count);
        Ok(count)
    }
}

/// Build the text reply for a currency. Markdown escaping is left to the caller.
pub fn format_details(
    currency: &Currency,
    vs_currency: &str,
    refreshed_at: Option<DateTime<Utc>>,
) -> String {
    let vs = vs_currency.to_uppercase();
    let mut lines = Vec::new();

    let mut title = format!("{} ({})", currency.name, currency.symbol.to_uppercase());
    if let Some(rank) = currency.market_cap_rank {
        title.push_str(&format!(" :trophy: #{}", rank));
    }
    lines.push(title);

    if let Some(price) = currency.current_price {
        let decimals = if price.abs() >= 1.0 { 2 } else { 6 };
        lines.push(format!(
            ":moneybag: Price: {} {}",
            format_amount(price, decimals),
            vs
        ));
    }

    if let Some(change) = currency.price_change_percentage_24h {
        let trend = if change >= 0.0 {
            ":chart_with_upwards_trend:"
        } else {
            ":chart_with_downwards_trend:"
        };
        lines.push(format!("{} 24h: {:+.2}%", trend, change));
    }

    if let Some(market_cap) = currency.market_cap {
        lines.push(format!(
            ":bar_chart: Market cap: {} {}",
            format_amount(market_cap, 0),
            vs
        ));
    }

    if let Some(volume) = currency.total_volume {
        lines.push(format!("Volume 24h: {} {}", format_amount(volume, 0), vs));
    }

    let updated = currency
        .last_updated
        .as_deref()
        .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
        .map(|ts| ts.with_timezone(&Utc))
        .or(refreshed_at);
    if let Some(updated) = updated {
        lines.push(format!(
            ":clock3: Updated: {}",
            updated.format("%Y-%m-%d %H:%M UTC")
        ));
    }

    lines.join("\n")
}

/// Format a number with `,` thousands separators
fn format_amount(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (integer, fraction) = match formatted.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (i, digit) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 { "-" } else { "" };
    match fraction {
        Some(fraction) => format!("{}{}.{}", sign, grouped, fraction),
        None => format!("{}{}", sign, grouped),
    }
}
