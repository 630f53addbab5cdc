//! Section records
//!
//! `Raw*` types are the typed partial records adapters map upstream payloads
//! into: numbers stay in the source currency and may be missing. The
//! normalized records are what a [`Snapshot`](crate::core::snapshot::Snapshot)
//! holds: every number converted, scaled and rounded for display.

use crate::core::currency::FxRates;
use crate::core::normalize::{Currency, Normalized, ScalePolicy, ValueKind, convert, normalize};
use crate::core::section::SectionKey;
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq)]
pub struct RawBalance {
    pub total: Option<f64>,
    pub available: Option<f64>,
    pub locked: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawHolding {
    pub asset: String,
    pub quantity: Option<f64>,
    pub avg_buy_price: Option<f64>,
    pub current_price: Option<f64>,
    pub eval_amount: Option<f64>,
    pub profit_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawTradedAsset {
    pub symbol: String,
    pub name: Option<String>,
    pub price: Option<f64>,
    pub change_rate: Option<f64>,
    /// Traded quantity (coins or shares).
    pub volume: Option<f64>,
    /// Traded value in the source currency.
    pub traded_value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawSentiment {
    pub value: Option<f64>,
    pub classification: String,
    /// Unix seconds; `0` means unknown.
    pub timestamp: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawTransfer {
    pub coin: String,
    pub amount: Option<f64>,
    pub sender: String,
    pub receiver: String,
    pub value_usd: Option<f64>,
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawIndex {
    pub name: String,
    pub symbol: Option<String>,
    pub level: Option<f64>,
    pub change: Option<f64>,
    pub change_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawSector {
    pub name: String,
    pub change_rate: Option<f64>,
    pub trend: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RawRecord {
    Balance(RawBalance),
    Holdings(Vec<RawHolding>),
    TopTraded(Vec<RawTradedAsset>),
    Sentiment(RawSentiment),
    Transfers(Vec<RawTransfer>),
    Indices(Vec<RawIndex>),
    Sectors(Vec<RawSector>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalanceRecord {
    pub currency: Currency,
    pub total: Normalized,
    pub available: Normalized,
    pub locked: Normalized,
    pub available_pct: Normalized,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoldingRow {
    pub asset: String,
    pub quantity: Normalized,
    pub avg_buy_price: Option<Normalized>,
    pub current_price: Normalized,
    pub eval_amount: Normalized,
    pub profit_rate: Option<Normalized>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoldingsRecord {
    pub currency: Currency,
    pub rows: Vec<HoldingRow>,
    pub total_eval: Normalized,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradedRow {
    pub symbol: String,
    pub name: String,
    pub price: Normalized,
    pub change_rate: Normalized,
    pub volume: Normalized,
    pub traded_value: Normalized,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopTradedRecord {
    pub currency: Currency,
    pub rows: Vec<TradedRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentRecord {
    pub value: Normalized,
    pub classification: String,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferRow {
    pub coin: String,
    pub amount: Normalized,
    pub sender: String,
    pub receiver: String,
    pub value_usd: Normalized,
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexRow {
    pub name: String,
    pub symbol: Option<String>,
    pub level: Normalized,
    pub change: Normalized,
    pub change_rate: Normalized,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectorRow {
    pub name: String,
    pub change_rate: Normalized,
    pub trend: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum NormalizedRecord {
    Balance(BalanceRecord),
    Holdings(HoldingsRecord),
    TopTraded(TopTradedRecord),
    Sentiment(SentimentRecord),
    Transfers(Vec<TransferRow>),
    Indices(Vec<IndexRow>),
    Sectors(Vec<SectorRow>),
}

fn percent_change(current: Option<f64>, base: Option<f64>) -> Option<f64> {
    match (current, base) {
        (Some(current), Some(base)) if base > 0.0 => Some((current - base) / base * 100.0),
        _ => None,
    }
}

fn product(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    Some(a? * b?)
}

fn descending(a: &Normalized, b: &Normalized) -> Ordering {
    b.in_base_units()
        .partial_cmp(&a.in_base_units())
        .unwrap_or(Ordering::Equal)
}

impl RawRecord {
    /// Normalizes into the display units of `section`.
    pub fn normalize(self, section: SectionKey, rates: &FxRates) -> NormalizedRecord {
        let source = section.source_currency().unwrap_or(Currency::Usd);
        let display = section.display_currency().unwrap_or(source);

        match self {
            RawRecord::Balance(raw) => {
                NormalizedRecord::Balance(normalize_balance(raw, source))
            }
            RawRecord::Holdings(rows) => {
                NormalizedRecord::Holdings(normalize_holdings(rows, source))
            }
            RawRecord::TopTraded(rows) => {
                NormalizedRecord::TopTraded(normalize_top_traded(rows, source, display, rates))
            }
            RawRecord::Sentiment(raw) => NormalizedRecord::Sentiment(SentimentRecord {
                value: normalize(raw.value, ValueKind::Count),
                classification: raw.classification,
                updated_at: raw
                    .timestamp
                    .filter(|ts| *ts > 0)
                    .and_then(|ts| Utc.timestamp_opt(ts, 0).single()),
            }),
            RawRecord::Transfers(rows) => NormalizedRecord::Transfers(
                rows.into_iter()
                    .map(|row| TransferRow {
                        coin: row.coin,
                        amount: normalize(row.amount, ValueKind::Units),
                        sender: row.sender,
                        receiver: row.receiver,
                        value_usd: normalize(
                            row.value_usd,
                            ValueKind::Volume(Currency::Usd.volume_scale()),
                        ),
                        timestamp: row.timestamp,
                    })
                    .collect(),
            ),
            RawRecord::Indices(rows) => NormalizedRecord::Indices(
                rows.into_iter()
                    .map(|row| IndexRow {
                        name: row.name,
                        symbol: row.symbol,
                        level: normalize(row.level, ValueKind::Points),
                        change: normalize(row.change, ValueKind::Points),
                        change_rate: normalize(row.change_rate, ValueKind::Percent),
                    })
                    .collect(),
            ),
            RawRecord::Sectors(rows) => NormalizedRecord::Sectors(
                rows.into_iter()
                    .map(|row| {
                        let trend = row.trend.unwrap_or_else(|| {
                            match row.change_rate {
                                Some(rate) if rate > 0.0 => "up",
                                Some(rate) if rate < 0.0 => "down",
                                _ => "flat",
                            }
                            .to_string()
                        });
                        SectorRow {
                            name: row.name,
                            change_rate: normalize(row.change_rate, ValueKind::Percent),
                            trend,
                        }
                    })
                    .collect(),
            ),
        }
    }
}

fn normalize_balance(raw: RawBalance, currency: Currency) -> BalanceRecord {
    let total = raw.total.or_else(|| Some(raw.available? + raw.locked?));
    let available_pct = match (raw.available, total) {
        (Some(available), Some(total)) if total > 0.0 => Some(available / total * 100.0),
        (_, Some(_)) => Some(100.0),
        _ => None,
    };

    BalanceRecord {
        currency,
        total: normalize(total, ValueKind::Amount(currency)),
        available: normalize(raw.available, ValueKind::Amount(currency)),
        locked: normalize(raw.locked, ValueKind::Amount(currency)),
        available_pct: normalize(available_pct, ValueKind::Percent),
    }
}

fn normalize_holdings(rows: Vec<RawHolding>, currency: Currency) -> HoldingsRecord {
    let mut rows: Vec<HoldingRow> = rows
        .into_iter()
        .map(|row| {
            let eval_amount = row
                .eval_amount
                .or_else(|| product(row.quantity, row.current_price));
            let profit_rate = row
                .profit_rate
                .or_else(|| percent_change(row.current_price, row.avg_buy_price));
            HoldingRow {
                asset: row.asset,
                quantity: normalize(row.quantity, ValueKind::Units),
                avg_buy_price: row
                    .avg_buy_price
                    .map(|p| normalize(Some(p), ValueKind::Price(currency))),
                current_price: normalize(row.current_price, ValueKind::Price(currency)),
                eval_amount: normalize(eval_amount, ValueKind::Amount(currency)),
                profit_rate: profit_rate.map(|r| normalize(Some(r), ValueKind::Percent)),
            }
        })
        .collect();
    rows.sort_by(|a, b| descending(&a.eval_amount, &b.eval_amount));

    let total: f64 = rows.iter().map(|r| r.eval_amount.in_base_units()).sum();
    HoldingsRecord {
        currency,
        rows,
        total_eval: normalize(Some(total), ValueKind::Amount(currency)),
    }
}

fn normalize_top_traded(
    rows: Vec<RawTradedAsset>,
    source: Currency,
    display: Currency,
    rates: &FxRates,
) -> TopTradedRecord {
    let mut rows: Vec<TradedRow> = rows
        .into_iter()
        .map(|row| {
            let traded_value = row.traded_value.or_else(|| product(row.price, row.volume));
            TradedRow {
                name: row.name.unwrap_or_else(|| row.symbol.clone()),
                symbol: row.symbol,
                price: normalize(
                    convert(row.price, source, display, rates),
                    ValueKind::Price(display),
                ),
                change_rate: normalize(row.change_rate, ValueKind::Percent),
                volume: normalize(row.volume, ValueKind::Volume(ScalePolicy::Kmb)),
                traded_value: normalize(
                    convert(traded_value, source, display, rates),
                    ValueKind::Volume(display.volume_scale()),
                ),
            }
        })
        .collect();
    rows.sort_by(|a, b| descending(&a.traded_value, &b.traded_value));

    TopTradedRecord {
        currency: display,
        rows,
    }
}

impl NormalizedRecord {
    /// Number of fields that were missing or not finite upstream.
    pub fn malformed_fields(&self) -> usize {
        fn count<'a>(values: impl IntoIterator<Item = &'a Normalized>) -> usize {
            values.into_iter().filter(|v| v.malformed).count()
        }

        match self {
            NormalizedRecord::Balance(b) => count([&b.total, &b.available, &b.locked]),
            NormalizedRecord::Holdings(h) => h
                .rows
                .iter()
                .map(|r| count([&r.quantity, &r.current_price, &r.eval_amount]))
                .sum(),
            NormalizedRecord::TopTraded(t) => t
                .rows
                .iter()
                .map(|r| count([&r.price, &r.change_rate, &r.volume, &r.traded_value]))
                .sum(),
            NormalizedRecord::Sentiment(s) => count([&s.value]),
            NormalizedRecord::Transfers(rows) => rows
                .iter()
                .map(|r| count([&r.amount, &r.value_usd]))
                .sum(),
            NormalizedRecord::Indices(rows) => rows
                .iter()
                .map(|r| count([&r.level, &r.change, &r.change_rate]))
                .sum(),
            NormalizedRecord::Sectors(rows) => rows.iter().map(|r| count([&r.change_rate])).sum(),
        }
    }
}
