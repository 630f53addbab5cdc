//! Currency conversion abstractions

use crate::core::normalize::Currency;
use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

#[async_trait]
pub trait CurrencyRateProvider: Send + Sync {
    async fn get_rate(&self, from: Currency, to: Currency) -> Result<f64>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RateSource {
    Live,
    /// The rate lookup failed and the configured fallback was used.
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FxQuote {
    pub from: Currency,
    pub to: Currency,
    pub rate: f64,
    pub source: RateSource,
}

/// The conversion rates a snapshot was normalized with.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FxRates {
    quotes: Vec<FxQuote>,
}

impl FxRates {
    pub fn from_quotes(quotes: Vec<FxQuote>) -> Self {
        Self { quotes }
    }

    pub fn quotes(&self) -> &[FxQuote] {
        &self.quotes
    }

    /// Rate to multiply a `from` amount by to get `to`. Inverse quotes are
    /// used when only the opposite direction is known.
    pub fn rate(&self, from: Currency, to: Currency) -> Option<f64> {
        if from == to {
            return Some(1.0);
        }
        self.quotes.iter().find_map(|q| {
            if q.from == from && q.to == to {
                Some(q.rate)
            } else if q.from == to && q.to == from && q.rate != 0.0 {
                Some(1.0 / q.rate)
            } else {
                None
            }
        })
    }

    pub fn uses_fallback(&self) -> bool {
        self.quotes.iter().any(|q| q.source == RateSource::Fallback)
    }
}
