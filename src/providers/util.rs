use crate::core::error::FetchError;
use reqwest::header::CACHE_CONTROL;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = concat!("tickview/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP client with a fixed per-request timeout.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, FetchError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| FetchError::Network(format!("Failed to build HTTP client: {e}")))
}

fn classify_transport(err: reqwest::Error, url: &str) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout(format!("{url}: {err}"))
    } else {
        FetchError::Network(format!("{url}: {err}"))
    }
}

/// GETs `url` without caching and returns the body of a 2xx response.
pub async fn fetch_text(client: &reqwest::Client, url: &str) -> Result<String, FetchError> {
    debug!("Requesting {}", url);
    let response = client
        .get(url)
        .header(CACHE_CONTROL, "no-cache")
        .send()
        .await
        .map_err(|e| classify_transport(e, url))?;

    let status = response.status();
    if !status.is_success() {
        let message = status
            .canonical_reason()
            .unwrap_or("unexpected status")
            .to_string();
        let status = status.as_u16();
        return Err(if (400..500).contains(&status) {
            FetchError::Upstream4xx { status, message }
        } else {
            FetchError::Upstream5xx { status, message }
        });
    }

    response.text().await.map_err(|e| classify_transport(e, url))
}

/// Decodes a JSON body. A literal `null` is a parse failure, not an empty
/// record.
pub fn parse_json<T: DeserializeOwned>(body: &str) -> Result<T, FetchError> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| FetchError::Parse(e.to_string()))?;
    if value.is_null() {
        return Err(FetchError::Parse("response body was null".to_string()));
    }
    serde_json::from_value(value).map_err(|e| FetchError::Parse(e.to_string()))
}

/// Lenient numeric field: numbers and numeric strings are accepted, anything
/// else (null, objects, garbage text) becomes `None`.
pub mod lenient_f64 {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(value.and_then(|v| match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok(),
            _ => None,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Deserialize, Debug)]
    struct Probe {
        #[serde(default, with = "lenient_f64")]
        price: Option<f64>,
    }

    #[test]
    fn test_lenient_numbers() {
        let parsed: Vec<Probe> =
            parse_json(r#"[{"price": 1.5}, {"price": "1,200"}, {"price": null}, {"price": "n/a"}, {}]"#)
                .unwrap();
        let prices: Vec<Option<f64>> = parsed.iter().map(|p| p.price).collect();
        assert_eq!(prices, vec![Some(1.5), Some(1200.0), None, None, None]);
    }

    #[test]
    fn test_null_body_is_parse_error() {
        let result = parse_json::<Vec<Probe>>("null");
        assert!(matches!(result, Err(FetchError::Parse(_))));
        let result = parse_json::<Vec<Probe>>("<html>");
        assert!(matches!(result, Err(FetchError::Parse(_))));
    }

    #[tokio::test]
    async fn test_status_classification() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/fresh"))
            .and(header("cache-control", "no-cache"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&mock_server)
            .await;

        let client = build_client(Duration::from_secs(5)).unwrap();
        let base = mock_server.uri();

        let err = fetch_text(&client, &format!("{base}/missing")).await.unwrap_err();
        assert_eq!(
            err,
            FetchError::Upstream4xx {
                status: 404,
                message: "Not Found".into()
            }
        );
        let err = fetch_text(&client, &format!("{base}/broken")).await.unwrap_err();
        assert!(matches!(err, FetchError::Upstream5xx { status: 503, .. }));
        assert_eq!(fetch_text(&client, &format!("{base}/fresh")).await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn test_timeout_and_network_errors() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&mock_server)
            .await;

        let client = build_client(Duration::from_millis(100)).unwrap();
        let err = fetch_text(&client, &format!("{}/slow", mock_server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Timeout(_)), "{err:?}");

        // Nothing listens on port 9 locally.
        let err = fetch_text(&client, "http://127.0.0.1:9/").await.unwrap_err();
        assert!(err.is_transient(), "{err:?}");
    }
}
