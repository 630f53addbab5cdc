//! Source adapters for the dashboard API section endpoints
//!
//! Each upstream endpoint has its own payload shape and field names; the
//! private wire structs below absorb those differences and map into the
//! shared `Raw*` records.

use crate::core::config::LimitsConfig;
use crate::core::error::FetchError;
use crate::core::record::{
    RawBalance, RawHolding, RawIndex, RawRecord, RawSector, RawSentiment, RawTradedAsset,
    RawTransfer,
};
use crate::core::section::{SectionKey, ViewMode};
use crate::core::snapshot::RequestId;
use crate::core::source::{SectionOutcome, SourceAdapter};
use crate::providers::util::{fetch_text, lenient_f64, parse_json};
use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

pub struct DashboardApiAdapter {
    section: SectionKey,
    url: String,
    client: reqwest::Client,
}

impl DashboardApiAdapter {
    pub fn new(
        section: SectionKey,
        base_url: &str,
        client: reqwest::Client,
        limits: &LimitsConfig,
    ) -> Self {
        let base = format!("{}{}", base_url.trim_end_matches('/'), section.endpoint());
        let url = match section {
            SectionKey::UpbitTopVolume
            | SectionKey::BinanceTopVolume
            | SectionKey::KospiTop
            | SectionKey::KosdaqTop
            | SectionKey::UsTop
            | SectionKey::EtfRanking => format!("{base}?limit={}", limits.top_volume),
            SectionKey::WhaleAlerts => format!("{base}?limit={}", limits.whale_alerts),
            _ => base,
        };

        DashboardApiAdapter {
            section,
            url,
            client,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Builds one adapter per section of `view`, all sharing `client`.
pub fn adapters_for(
    view: ViewMode,
    base_url: &str,
    client: &reqwest::Client,
    limits: &LimitsConfig,
) -> Vec<Arc<dyn SourceAdapter>> {
    view.sections()
        .iter()
        .map(|section| {
            Arc::new(DashboardApiAdapter::new(
                *section,
                base_url,
                client.clone(),
                limits,
            )) as Arc<dyn SourceAdapter>
        })
        .collect()
}

#[async_trait]
impl SourceAdapter for DashboardApiAdapter {
    fn section(&self) -> SectionKey {
        self.section
    }

    #[instrument(
        name = "SectionFetch",
        skip_all,
        fields(section = %self.section, request_id = %request_id)
    )]
    async fn fetch(&self, request_id: RequestId) -> SectionOutcome {
        let result = match fetch_text(&self.client, &self.url).await {
            Ok(body) => decode(self.section, &body),
            Err(e) => Err(e),
        };

        match &result {
            Ok(_) => debug!("Section fetched"),
            Err(e) => warn!(reason = %e.reason(), "Section fetch failed: {e}"),
        }

        SectionOutcome {
            request_id,
            section: self.section,
            result,
        }
    }
}

fn rows<W, R>(body: &str) -> Result<Vec<R>, FetchError>
where
    W: DeserializeOwned,
    R: From<W>,
{
    let wire: Vec<W> = parse_json(body)?;
    Ok(wire.into_iter().map(R::from).collect())
}

fn decode(section: SectionKey, body: &str) -> Result<RawRecord, FetchError> {
    let record = match section {
        SectionKey::UpbitBalance => {
            RawRecord::Balance(parse_json::<UpbitBalanceWire>(body)?.into())
        }
        SectionKey::BinanceBalance => {
            RawRecord::Balance(parse_json::<BinanceBalanceWire>(body)?.into())
        }
        SectionKey::UpbitHoldings => RawRecord::Holdings(rows::<UpbitHoldingWire, _>(body)?),
        SectionKey::BinanceHoldings => RawRecord::Holdings(rows::<BinanceHoldingWire, _>(body)?),
        SectionKey::UpbitTopVolume => RawRecord::TopTraded(rows::<UpbitTopWire, _>(body)?),
        SectionKey::BinanceTopVolume => RawRecord::TopTraded(rows::<BinanceTopWire, _>(body)?),
        SectionKey::KospiTop | SectionKey::KosdaqTop => {
            RawRecord::TopTraded(rows::<KoreaStockWire, _>(body)?)
        }
        SectionKey::UsTop | SectionKey::EtfRanking => {
            RawRecord::TopTraded(rows::<ListedAssetWire, _>(body)?)
        }
        SectionKey::FearGreed => RawRecord::Sentiment(parse_json::<FearGreedWire>(body)?.into()),
        SectionKey::WhaleAlerts => RawRecord::Transfers(rows::<WhaleWire, _>(body)?),
        SectionKey::Indices => RawRecord::Indices(rows::<IndexWire, _>(body)?),
        SectionKey::Sectors => RawRecord::Sectors(rows::<SectorWire, _>(body)?),
    };
    Ok(record)
}

fn sum(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    Some(a? + b?)
}

#[derive(Deserialize, Debug)]
struct UpbitBalanceWire {
    #[serde(default, with = "lenient_f64")]
    total_krw: Option<f64>,
    #[serde(default, with = "lenient_f64")]
    available_krw: Option<f64>,
    #[serde(default, with = "lenient_f64")]
    locked_krw: Option<f64>,
}

impl From<UpbitBalanceWire> for RawBalance {
    fn from(w: UpbitBalanceWire) -> Self {
        RawBalance {
            total: w.total_krw,
            available: w.available_krw,
            locked: w.locked_krw,
        }
    }
}

#[derive(Deserialize, Debug)]
struct BinanceBalanceWire {
    #[serde(default, with = "lenient_f64")]
    total_usdt: Option<f64>,
    #[serde(default, with = "lenient_f64")]
    available_usdt: Option<f64>,
    #[serde(default, with = "lenient_f64")]
    locked_usdt: Option<f64>,
}

impl From<BinanceBalanceWire> for RawBalance {
    fn from(w: BinanceBalanceWire) -> Self {
        RawBalance {
            total: w.total_usdt,
            available: w.available_usdt,
            locked: w.locked_usdt,
        }
    }
}

#[derive(Deserialize, Debug)]
struct UpbitHoldingWire {
    currency: String,
    #[serde(default, with = "lenient_f64")]
    balance: Option<f64>,
    #[serde(default, with = "lenient_f64")]
    locked: Option<f64>,
    #[serde(default, with = "lenient_f64")]
    total: Option<f64>,
    #[serde(default, with = "lenient_f64")]
    avg_buy_price: Option<f64>,
    #[serde(default, with = "lenient_f64")]
    current_price: Option<f64>,
    #[serde(default, with = "lenient_f64")]
    eval_amount: Option<f64>,
    #[serde(default, with = "lenient_f64")]
    profit_rate: Option<f64>,
}

impl From<UpbitHoldingWire> for RawHolding {
    fn from(w: UpbitHoldingWire) -> Self {
        RawHolding {
            asset: w.currency,
            quantity: w.total.or_else(|| sum(w.balance, w.locked)),
            avg_buy_price: w.avg_buy_price,
            current_price: w.current_price,
            eval_amount: w.eval_amount,
            profit_rate: w.profit_rate,
        }
    }
}

#[derive(Deserialize, Debug)]
struct BinanceHoldingWire {
    asset: String,
    #[serde(default, with = "lenient_f64")]
    free: Option<f64>,
    #[serde(default, with = "lenient_f64")]
    locked: Option<f64>,
    #[serde(default, with = "lenient_f64")]
    total: Option<f64>,
    #[serde(default, with = "lenient_f64")]
    current_price: Option<f64>,
    #[serde(default, with = "lenient_f64")]
    eval_amount: Option<f64>,
}

impl From<BinanceHoldingWire> for RawHolding {
    fn from(w: BinanceHoldingWire) -> Self {
        RawHolding {
            asset: w.asset,
            quantity: w.total.or_else(|| sum(w.free, w.locked)),
            avg_buy_price: None,
            current_price: w.current_price,
            eval_amount: w.eval_amount,
            profit_rate: None,
        }
    }
}

#[derive(Deserialize, Debug)]
struct UpbitTopWire {
    market: String,
    korean_name: Option<String>,
    english_name: Option<String>,
    #[serde(default, with = "lenient_f64")]
    trade_volume: Option<f64>,
    /// 24h accumulated traded value, not the last price
    #[serde(default, with = "lenient_f64")]
    trade_price: Option<f64>,
    #[serde(default, with = "lenient_f64")]
    current_price: Option<f64>,
    #[serde(default, with = "lenient_f64")]
    change_rate: Option<f64>,
}

impl From<UpbitTopWire> for RawTradedAsset {
    fn from(w: UpbitTopWire) -> Self {
        RawTradedAsset {
            symbol: w.market,
            name: w.korean_name.or(w.english_name),
            price: w.current_price,
            change_rate: w.change_rate,
            volume: w.trade_volume,
            traded_value: w.trade_price,
        }
    }
}

#[derive(Deserialize, Debug)]
struct BinanceTopWire {
    symbol: String,
    base_asset: Option<String>,
    #[serde(default, with = "lenient_f64")]
    quote_volume: Option<f64>,
    #[serde(default, with = "lenient_f64")]
    volume: Option<f64>,
    #[serde(default, with = "lenient_f64")]
    current_price: Option<f64>,
    #[serde(default, with = "lenient_f64")]
    price_change_percent: Option<f64>,
}

impl From<BinanceTopWire> for RawTradedAsset {
    fn from(w: BinanceTopWire) -> Self {
        RawTradedAsset {
            symbol: w.symbol,
            name: w.base_asset,
            price: w.current_price,
            change_rate: w.price_change_percent,
            volume: w.volume,
            traded_value: w.quote_volume,
        }
    }
}

#[derive(Deserialize, Debug)]
struct KoreaStockWire {
    code: String,
    name: Option<String>,
    #[serde(default, with = "lenient_f64")]
    current_price: Option<f64>,
    #[serde(default, with = "lenient_f64")]
    change_rate: Option<f64>,
    #[serde(default, with = "lenient_f64")]
    trade_volume: Option<f64>,
    #[serde(default, with = "lenient_f64")]
    trade_value: Option<f64>,
}

impl From<KoreaStockWire> for RawTradedAsset {
    fn from(w: KoreaStockWire) -> Self {
        RawTradedAsset {
            symbol: w.code,
            name: w.name,
            price: w.current_price,
            change_rate: w.change_rate,
            volume: w.trade_volume,
            traded_value: w.trade_value,
        }
    }
}

/// US stocks and ETFs. ETFs may carry a `code` instead of a `symbol`.
#[derive(Deserialize, Debug)]
struct ListedAssetWire {
    symbol: Option<String>,
    code: Option<String>,
    name: String,
    #[serde(default, with = "lenient_f64")]
    current_price: Option<f64>,
    #[serde(default, with = "lenient_f64")]
    change_rate: Option<f64>,
    #[serde(default, with = "lenient_f64")]
    trade_volume: Option<f64>,
    #[serde(default, with = "lenient_f64")]
    trade_value: Option<f64>,
}

impl From<ListedAssetWire> for RawTradedAsset {
    fn from(w: ListedAssetWire) -> Self {
        RawTradedAsset {
            symbol: w.symbol.or(w.code).unwrap_or_else(|| w.name.clone()),
            name: Some(w.name),
            price: w.current_price,
            change_rate: w.change_rate,
            volume: w.trade_volume,
            traded_value: w.trade_value,
        }
    }
}

#[derive(Deserialize, Debug)]
struct FearGreedWire {
    #[serde(default, with = "lenient_f64")]
    value: Option<f64>,
    #[serde(default)]
    value_classification: String,
    #[serde(default, with = "lenient_f64")]
    timestamp: Option<f64>,
}

impl From<FearGreedWire> for RawSentiment {
    fn from(w: FearGreedWire) -> Self {
        RawSentiment {
            value: w.value,
            classification: w.value_classification,
            timestamp: w.timestamp.map(|ts| ts as i64),
        }
    }
}

#[derive(Deserialize, Debug)]
struct WhaleWire {
    coin: String,
    #[serde(default, with = "lenient_f64")]
    amount: Option<f64>,
    #[serde(alias = "from", default)]
    sender: String,
    #[serde(alias = "to", default)]
    receiver: String,
    #[serde(default, with = "lenient_f64")]
    value_usd: Option<f64>,
    #[serde(alias = "time")]
    timestamp: Option<String>,
}

impl From<WhaleWire> for RawTransfer {
    fn from(w: WhaleWire) -> Self {
        RawTransfer {
            coin: w.coin,
            amount: w.amount,
            sender: w.sender,
            receiver: w.receiver,
            value_usd: w.value_usd,
            timestamp: w.timestamp,
        }
    }
}

#[derive(Deserialize, Debug)]
struct IndexWire {
    name: String,
    symbol: Option<String>,
    #[serde(default, with = "lenient_f64")]
    current_price: Option<f64>,
    #[serde(default, with = "lenient_f64")]
    change: Option<f64>,
    #[serde(default, with = "lenient_f64")]
    change_rate: Option<f64>,
}

impl From<IndexWire> for RawIndex {
    fn from(w: IndexWire) -> Self {
        RawIndex {
            name: w.name,
            symbol: w.symbol,
            level: w.current_price,
            change: w.change,
            change_rate: w.change_rate,
        }
    }
}

#[derive(Deserialize, Debug)]
struct SectorWire {
    name: String,
    #[serde(default, with = "lenient_f64")]
    change_rate: Option<f64>,
    /// Upstream labels the trend (strong/weak/flat) under this name
    volume: Option<String>,
}

impl From<SectorWire> for RawSector {
    fn from(w: SectorWire) -> Self {
        RawSector {
            name: w.name,
            change_rate: w.change_rate,
            trend: w.volume,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::util::build_client;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn create_mock_server(endpoint: &str, status: u16, body: &str) -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(endpoint))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&mock_server)
            .await;
        mock_server
    }

    fn adapter(section: SectionKey, server: &MockServer) -> DashboardApiAdapter {
        let client = build_client(Duration::from_secs(5)).unwrap();
        DashboardApiAdapter::new(section, &server.uri(), client, &LimitsConfig::default())
    }

    #[tokio::test]
    async fn test_upbit_top_volume_fetch() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/upbit/top-volume"))
            .and(query_param("limit", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"[
                    {"market": "KRW-BTC", "korean_name": "비트코인", "english_name": "Bitcoin",
                     "trade_volume": 2150.5, "trade_price": 204000000000.0,
                     "current_price": 95000000, "change_rate": 1.25},
                    {"market": "KRW-XRP", "korean_name": null, "english_name": "Ripple",
                     "trade_volume": "1000000", "trade_price": 900000000,
                     "current_price": 900, "change_rate": null}
                ]"#,
            ))
            .mount(&mock_server)
            .await;

        let outcome = adapter(SectionKey::UpbitTopVolume, &mock_server)
            .fetch(RequestId::new(7))
            .await;

        assert_eq!(outcome.request_id, RequestId::new(7));
        assert_eq!(outcome.section, SectionKey::UpbitTopVolume);
        let Ok(RawRecord::TopTraded(rows)) = outcome.result else {
            panic!("Expected top traded rows, got {:?}", outcome.result);
        };
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name.as_deref(), Some("비트코인"));
        assert_eq!(rows[0].traded_value, Some(204_000_000_000.0));
        assert_eq!(rows[1].name.as_deref(), Some("Ripple"));
        assert_eq!(rows[1].volume, Some(1_000_000.0));
        assert_eq!(rows[1].change_rate, None);
    }

    #[tokio::test]
    async fn test_binance_holdings_quantity_from_free_and_locked() {
        let mock_server = create_mock_server(
            "/api/binance/holdings",
            200,
            r#"[{"asset": "ETH", "free": 1.5, "locked": 0.5, "current_price": 3000.0, "eval_amount": 6000.0}]"#,
        )
        .await;

        let outcome = adapter(SectionKey::BinanceHoldings, &mock_server)
            .fetch(RequestId::new(1))
            .await;
        let Ok(RawRecord::Holdings(rows)) = outcome.result else {
            panic!("Expected holdings");
        };
        assert_eq!(rows[0].asset, "ETH");
        assert_eq!(rows[0].quantity, Some(2.0));
        assert_eq!(rows[0].avg_buy_price, None);
    }

    #[tokio::test]
    async fn test_null_payload_is_parse_failure() {
        let mock_server = create_mock_server("/api/upbit/balance", 200, "null").await;
        let outcome = adapter(SectionKey::UpbitBalance, &mock_server)
            .fetch(RequestId::new(2))
            .await;
        assert!(matches!(outcome.result, Err(FetchError::Parse(_))));
    }

    #[tokio::test]
    async fn test_shape_mismatch_is_parse_failure() {
        let mock_server =
            create_mock_server("/api/stock/indices", 200, r#"{"detail": "oops"}"#).await;
        let outcome = adapter(SectionKey::Indices, &mock_server)
            .fetch(RequestId::new(2))
            .await;
        assert!(matches!(outcome.result, Err(FetchError::Parse(_))));
    }

    #[tokio::test]
    async fn test_server_error_is_classified() {
        let mock_server =
            create_mock_server("/api/stock/kospi", 500, r#"{"detail": "boom"}"#).await;
        let outcome = adapter(SectionKey::KospiTop, &mock_server)
            .fetch(RequestId::new(3))
            .await;
        assert!(matches!(
            outcome.result,
            Err(FetchError::Upstream5xx { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn test_whale_alerts_accept_alternate_field_names() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/crypto/whale-alerts"))
            .and(query_param("limit", "5"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"[{"key": "0", "time": "2026-01-01T10:00:00", "coin": "BTC",
                     "amount": 1200, "from": "Binance", "to": "Wallet", "value_usd": 60000000}]"#,
            ))
            .mount(&mock_server)
            .await;

        let outcome = adapter(SectionKey::WhaleAlerts, &mock_server)
            .fetch(RequestId::new(4))
            .await;
        let Ok(RawRecord::Transfers(rows)) = outcome.result else {
            panic!("Expected transfers");
        };
        assert_eq!(rows[0].sender, "Binance");
        assert_eq!(rows[0].receiver, "Wallet");
        assert_eq!(rows[0].timestamp.as_deref(), Some("2026-01-01T10:00:00"));
    }

    #[test]
    fn test_decode_sectors_and_etfs() {
        let RawRecord::Sectors(sectors) = decode(
            SectionKey::Sectors,
            r#"[{"name": "반도체", "change_rate": 2.5, "volume": "강세"}]"#,
        )
        .unwrap() else {
            panic!("Expected sectors");
        };
        assert_eq!(sectors[0].trend.as_deref(), Some("강세"));

        let RawRecord::TopTraded(etfs) = decode(
            SectionKey::EtfRanking,
            r#"[{"code": "069500", "name": "KODEX 200", "current_price": 35000,
                 "change_rate": 0.4, "trade_volume": 1000, "trade_value": 35000000}]"#,
        )
        .unwrap() else {
            panic!("Expected etf rows");
        };
        assert_eq!(etfs[0].symbol, "069500");
    }

    #[test]
    fn test_adapters_for_view() {
        let client = build_client(Duration::from_secs(1)).unwrap();
        let limits = LimitsConfig {
            top_volume: 3,
            whale_alerts: 2,
        };
        let adapters = adapters_for(ViewMode::Stock, "http://api.local/", &client, &limits);
        let sections: Vec<SectionKey> = adapters.iter().map(|a| a.section()).collect();
        assert_eq!(sections, SectionKey::STOCK.to_vec());

        let kospi = DashboardApiAdapter::new(SectionKey::KospiTop, "http://api.local/", client, &limits);
        assert_eq!(kospi.url(), "http://api.local/api/stock/kospi?limit=3");
    }
}
