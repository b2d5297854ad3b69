//! REST market data gateway for USD-M futures ticker endpoints.

use crate::error::{FeedError, FeedResult};
use crate::gateway::{Balance, BoxFuture, MarketDataGateway, Ticker};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Default timeout for API requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const PRICE_PATH: &str = "/fapi/v1/ticker/price";
const TICKER_24H_PATH: &str = "/fapi/v1/ticker/24hr";

#[derive(Debug, Deserialize)]
struct PriceResponse {
    symbol: String,
    price: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Ticker24hResponse {
    symbol: String,
    last_price: String,
    high_price: String,
    low_price: String,
    volume: String,
    price_change_percent: String,
}

fn parse_number(field: &str, raw: &str) -> FeedResult<f64> {
    let value: f64 = raw
        .parse()
        .map_err(|_| FeedError::InvalidData(format!("{field}: not a number: {raw}")))?;
    if !value.is_finite() {
        return Err(FeedError::InvalidData(format!("{field}: not finite")));
    }
    Ok(value)
}

impl PriceResponse {
    fn into_price(self) -> FeedResult<f64> {
        let price = parse_number("price", &self.price)?;
        if price <= 0.0 {
            return Err(FeedError::InvalidData(format!(
                "{}: non-positive price {price}",
                self.symbol
            )));
        }
        Ok(price)
    }
}

impl Ticker24hResponse {
    fn into_ticker(self) -> FeedResult<Ticker> {
        Ok(Ticker {
            last_price: parse_number("lastPrice", &self.last_price)?,
            high: parse_number("highPrice", &self.high_price)?,
            low: parse_number("lowPrice", &self.low_price)?,
            volume: parse_number("volume", &self.volume)?,
            change_pct: parse_number("priceChangePercent", &self.price_change_percent)?,
            symbol: self.symbol,
        })
    }
}

/// Read-only public ticker client. Balance requires a signed endpoint and
/// is reported as unsupported.
pub struct RestMarketDataGateway {
    client: Client,
    base_url: String,
}

impl RestMarketDataGateway {
    /// # Arguments
    /// * `base_url` - API root (e.g., "https://fapi.binance.com")
    pub fn new(base_url: impl Into<String>) -> FeedResult<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> FeedResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FeedError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, symbol: &str) -> FeedResult<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .query(&[("symbol", symbol)])
            .send()
            .await
            .map_err(|e| FeedError::GatewayUnavailable(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FeedError::HttpClient(format!("HTTP {status}: {body}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FeedError::GatewayUnavailable(format!("Failed to read body: {e}")))?;
        debug!(url = %url, symbol, "Ticker response received");
        Ok(serde_json::from_str(&body)?)
    }
}

impl MarketDataGateway for RestMarketDataGateway {
    fn get_price<'a>(&'a self, symbol: &'a str) -> BoxFuture<'a, FeedResult<f64>> {
        Box::pin(async move {
            let response: PriceResponse = self.get_json(PRICE_PATH, symbol).await?;
            response.into_price()
        })
    }

    fn get_ticker<'a>(&'a self, symbol: &'a str) -> BoxFuture<'a, FeedResult<Ticker>> {
        Box::pin(async move {
            let response: Ticker24hResponse = self.get_json(TICKER_24H_PATH, symbol).await?;
            response.into_ticker()
        })
    }

    fn get_balance(&self) -> BoxFuture<'_, FeedResult<Balance>> {
        Box::pin(async {
            Err(FeedError::Unsupported(
                "balance requires a signed account endpoint".to_string(),
            ))
        })
    }
}
