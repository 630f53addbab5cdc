use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::core::currency::CurrencyRateProvider;
use crate::core::normalize::Currency;

/// Foreign exchange rates from the Yahoo Finance chart endpoint.
pub struct YahooCurrencyProvider {
    base_url: String,
    client: reqwest::Client,
}

impl YahooCurrencyProvider {
    pub fn new(base_url: &str, client: reqwest::Client) -> Self {
        YahooCurrencyProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }
}

#[derive(Debug, Deserialize)]
struct YahooCurrencyResponse {
    chart: CurrencyChartResult,
}

#[derive(Debug, Deserialize)]
struct CurrencyChartResult {
    result: Vec<CurrencyChartItem>,
}

#[derive(Debug, Deserialize)]
struct CurrencyChartItem {
    meta: CurrencyChartMeta,
}

#[derive(Debug, Deserialize)]
struct CurrencyChartMeta {
    #[serde(alias = "regularMarketPrice")]
    regular_market_price: f64,
}

#[async_trait]
impl CurrencyRateProvider for YahooCurrencyProvider {
    #[instrument(name = "YahooRateFetch", skip(self))]
    async fn get_rate(&self, from: Currency, to: Currency) -> Result<f64> {
        let symbol = format!("{}{}=X", from.code(), to.code());
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);
        debug!("Requesting currency rate from {}", url);

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for currency pair: {}", e, symbol))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for currency pair: {}",
                response.status(),
                symbol
            ));
        }

        let text = response.text().await?;

        let data: YahooCurrencyResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", symbol, e))?;

        let item = data
            .chart
            .result
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No rate data found for currency pair: {}", symbol))?;

        let rate = item.meta.regular_market_price;
        if !rate.is_finite() || rate <= 0.0 {
            return Err(anyhow!("Invalid rate {} for currency pair: {}", rate, symbol));
        }
        Ok(rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn provider_with_response(status: u16, body: &str) -> (MockServer, YahooCurrencyProvider) {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/USDKRW=X"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&mock_server)
            .await;
        let provider = YahooCurrencyProvider::new(&mock_server.uri(), reqwest::Client::new());
        (mock_server, provider)
    }

    #[tokio::test]
    async fn test_successful_rate_fetch() {
        let (_server, provider) = provider_with_response(
            200,
            r#"{"chart": {"result": [{"meta": {"regularMarketPrice": 1432.15}}]}}"#,
        )
        .await;

        let rate = provider
            .get_rate(Currency::Usd, Currency::Krw)
            .await
            .expect("Failed to get rate");
        assert_eq!(rate, 1432.15);
    }

    #[tokio::test]
    async fn test_no_currency_rate_found() {
        let (_server, provider) =
            provider_with_response(200, r#"{"chart": {"result": []}}"#).await;

        let result = provider.get_rate(Currency::Usd, Currency::Krw).await;
        assert_eq!(
            result.unwrap_err().to_string(),
            "No rate data found for currency pair: USDKRW=X"
        );
    }

    #[tokio::test]
    async fn test_yahoo_currency_api_error_response() {
        let (_server, provider) = provider_with_response(500, "").await;

        let result = provider.get_rate(Currency::Usd, Currency::Krw).await;
        assert_eq!(
            result.unwrap_err().to_string(),
            "HTTP error: 500 Internal Server Error for currency pair: USDKRW=X"
        );
    }

    #[tokio::test]
    async fn test_yahoo_currency_api_malformed_response() {
        // "results" instead of "result"
        let (_server, provider) =
            provider_with_response(200, r#"{"chart": {"results": []}}"#).await;

        let result = provider.get_rate(Currency::Usd, Currency::Krw).await;
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse JSON response for USDKRW=X")
        );
    }
}
