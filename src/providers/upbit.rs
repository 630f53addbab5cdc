use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::core::currency::CurrencyRateProvider;
use crate::core::normalize::Currency;

/// Quotes against KRW from the Upbit public ticker, e.g. `KRW-USDT`.
pub struct UpbitRateProvider {
    base_url: String,
    client: reqwest::Client,
}

impl UpbitRateProvider {
    pub fn new(base_url: &str, client: reqwest::Client) -> Self {
        UpbitRateProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Ticker {
    trade_price: f64,
}

#[async_trait]
impl CurrencyRateProvider for UpbitRateProvider {
    #[instrument(name = "UpbitRateFetch", skip(self))]
    async fn get_rate(&self, from: Currency, to: Currency) -> Result<f64> {
        if to != Currency::Krw {
            bail!("Upbit only quotes KRW markets, requested {}/{}", from, to);
        }
        let market = format!("KRW-{}", from.code());
        let url = format!("{}/v1/ticker?markets={}", self.base_url, market);
        debug!("Requesting ticker from {}", url);

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for market: {}", e, market))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for market: {}",
                response.status(),
                market
            ));
        }

        let tickers: Vec<Ticker> = response
            .json()
            .await
            .map_err(|e| anyhow!("Failed to parse ticker for {}: {}", market, e))?;

        let rate = tickers
            .first()
            .map(|t| t.trade_price)
            .ok_or_else(|| anyhow!("No ticker found for market: {}", market))?;
        if !rate.is_finite() || rate <= 0.0 {
            bail!("Invalid rate {} for market: {}", rate, market);
        }
        Ok(rate)
    }
}
