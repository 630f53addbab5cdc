//! View modes and the sections each of them is assembled from

use crate::core::normalize::Currency;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Crypto,
    Stock,
}

impl ViewMode {
    pub fn sections(self) -> &'static [SectionKey] {
        match self {
            ViewMode::Crypto => &SectionKey::CRYPTO,
            ViewMode::Stock => &SectionKey::STOCK,
        }
    }

    /// The other view mode, used by the terminal "switch" command.
    pub fn toggled(self) -> Self {
        match self {
            ViewMode::Crypto => ViewMode::Stock,
            ViewMode::Stock => ViewMode::Crypto,
        }
    }
}

impl Display for ViewMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                ViewMode::Crypto => "crypto",
                ViewMode::Stock => "stock",
            }
        )
    }
}

impl FromStr for ViewMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "crypto" => Ok(ViewMode::Crypto),
            "stock" | "stocks" => Ok(ViewMode::Stock),
            _ => Err(anyhow::anyhow!("Invalid view mode: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKey {
    UpbitBalance,
    UpbitHoldings,
    UpbitTopVolume,
    BinanceBalance,
    BinanceHoldings,
    BinanceTopVolume,
    FearGreed,
    WhaleAlerts,
    KospiTop,
    KosdaqTop,
    UsTop,
    Indices,
    Sectors,
    EtfRanking,
}

impl SectionKey {
    pub const CRYPTO: [SectionKey; 8] = [
        SectionKey::UpbitBalance,
        SectionKey::UpbitHoldings,
        SectionKey::UpbitTopVolume,
        SectionKey::BinanceBalance,
        SectionKey::BinanceHoldings,
        SectionKey::BinanceTopVolume,
        SectionKey::FearGreed,
        SectionKey::WhaleAlerts,
    ];

    pub const STOCK: [SectionKey; 6] = [
        SectionKey::KospiTop,
        SectionKey::KosdaqTop,
        SectionKey::UsTop,
        SectionKey::Indices,
        SectionKey::Sectors,
        SectionKey::EtfRanking,
    ];

    pub fn view_mode(self) -> ViewMode {
        match self {
            SectionKey::UpbitBalance
            | SectionKey::UpbitHoldings
            | SectionKey::UpbitTopVolume
            | SectionKey::BinanceBalance
            | SectionKey::BinanceHoldings
            | SectionKey::BinanceTopVolume
            | SectionKey::FearGreed
            | SectionKey::WhaleAlerts => ViewMode::Crypto,
            SectionKey::KospiTop
            | SectionKey::KosdaqTop
            | SectionKey::UsTop
            | SectionKey::Indices
            | SectionKey::Sectors
            | SectionKey::EtfRanking => ViewMode::Stock,
        }
    }

    /// Path of the upstream endpoint, relative to the API base url.
    pub fn endpoint(self) -> &'static str {
        match self {
            SectionKey::UpbitBalance => "/api/upbit/balance",
            SectionKey::UpbitHoldings => "/api/upbit/holdings",
            SectionKey::UpbitTopVolume => "/api/upbit/top-volume",
            SectionKey::BinanceBalance => "/api/binance/balance",
            SectionKey::BinanceHoldings => "/api/binance/holdings",
            SectionKey::BinanceTopVolume => "/api/binance/top-volume",
            SectionKey::FearGreed => "/api/crypto/fear-greed",
            SectionKey::WhaleAlerts => "/api/crypto/whale-alerts",
            SectionKey::KospiTop => "/api/stock/kospi",
            SectionKey::KosdaqTop => "/api/stock/kosdaq",
            SectionKey::UsTop => "/api/stock/us",
            SectionKey::Indices => "/api/stock/indices",
            SectionKey::Sectors => "/api/stock/sectors",
            SectionKey::EtfRanking => "/api/stock/etf",
        }
    }

    /// Currency the upstream quotes monetary fields in, if any.
    pub fn source_currency(self) -> Option<Currency> {
        match self {
            SectionKey::UpbitBalance
            | SectionKey::UpbitHoldings
            | SectionKey::UpbitTopVolume
            | SectionKey::KospiTop
            | SectionKey::KosdaqTop => Some(Currency::Krw),
            SectionKey::BinanceBalance
            | SectionKey::BinanceHoldings
            | SectionKey::BinanceTopVolume => Some(Currency::Usdt),
            SectionKey::WhaleAlerts | SectionKey::UsTop | SectionKey::EtfRanking => {
                Some(Currency::Usd)
            }
            SectionKey::FearGreed | SectionKey::Indices | SectionKey::Sectors => None,
        }
    }

    /// Currency the section is displayed in. Top-traded tables of both
    /// exchanges and all three stock markets share KRW so they compare
    /// directly; the ETF ranking stays in USD.
    pub fn display_currency(self) -> Option<Currency> {
        match self {
            SectionKey::BinanceTopVolume | SectionKey::UsTop => Some(Currency::Krw),
            other => other.source_currency(),
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            SectionKey::UpbitBalance => "Upbit Balance",
            SectionKey::UpbitHoldings => "Upbit Holdings",
            SectionKey::UpbitTopVolume => "Upbit Top Volume",
            SectionKey::BinanceBalance => "Binance Balance",
            SectionKey::BinanceHoldings => "Binance Holdings",
            SectionKey::BinanceTopVolume => "Binance Top Volume",
            SectionKey::FearGreed => "Fear & Greed Index",
            SectionKey::WhaleAlerts => "Whale Alerts",
            SectionKey::KospiTop => "KOSPI Top Volume",
            SectionKey::KosdaqTop => "KOSDAQ Top Volume",
            SectionKey::UsTop => "US Top Volume",
            SectionKey::Indices => "Major Indices",
            SectionKey::Sectors => "Sector Performance",
            SectionKey::EtfRanking => "ETF Ranking",
        }
    }
}

impl Display for SectionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SectionKey::UpbitBalance => "upbit_balance",
            SectionKey::UpbitHoldings => "upbit_holdings",
            SectionKey::UpbitTopVolume => "upbit_top_volume",
            SectionKey::BinanceBalance => "binance_balance",
            SectionKey::BinanceHoldings => "binance_holdings",
            SectionKey::BinanceTopVolume => "binance_top_volume",
            SectionKey::FearGreed => "fear_greed",
            SectionKey::WhaleAlerts => "whale_alerts",
            SectionKey::KospiTop => "kospi_top",
            SectionKey::KosdaqTop => "kosdaq_top",
            SectionKey::UsTop => "us_top",
            SectionKey::Indices => "indices",
            SectionKey::Sectors => "sectors",
            SectionKey::EtfRanking => "etf_ranking",
        };
        write!(f, "{name}")
    }
}
