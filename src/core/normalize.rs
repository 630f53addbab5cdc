//! Unit normalization
//!
//! Turns raw upstream numbers into canonical display values. Three policies
//! are applied, all table-driven and all total (no error path):
//!
//! - currency conversion into the section's display currency ([`convert`])
//! - magnitude scaling of large volumes ([`ScalePolicy`])
//! - rounding to the precision of the value's unit convention ([`precision`])
//!
//! Missing or non-finite input normalizes to `0` with `malformed` set, so one
//! bad field never aborts a whole section.

use crate::core::currency::FxRates;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Krw,
    Usd,
    Usdt,
}

/// Whether a currency is quoted in whole units or carries a fractional part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitConvention {
    Whole,
    Fractional,
}

impl Currency {
    pub fn code(self) -> &'static str {
        match self {
            Currency::Krw => "KRW",
            Currency::Usd => "USD",
            Currency::Usdt => "USDT",
        }
    }

    pub fn convention(self) -> UnitConvention {
        match self {
            Currency::Krw => UnitConvention::Whole,
            Currency::Usd | Currency::Usdt => UnitConvention::Fractional,
        }
    }

    /// Magnitude steps used for large traded values in this currency.
    pub fn volume_scale(self) -> ScalePolicy {
        match self {
            Currency::Krw => ScalePolicy::HundredMillion,
            Currency::Usd | Currency::Usdt => ScalePolicy::Kmb,
        }
    }
}

impl Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Currency {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "KRW" => Ok(Currency::Krw),
            "USD" => Ok(Currency::Usd),
            "USDT" => Ok(Currency::Usdt),
            _ => Err(anyhow::anyhow!("Unsupported currency: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalePolicy {
    /// 100,000,000 steps ("억"), used for KRW volumes.
    HundredMillion,
    /// Thousand / million / billion steps, used for USD volumes and counts.
    Kmb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Magnitude {
    Unit,
    Thousand,
    Million,
    Billion,
    HundredMillion,
}

impl Magnitude {
    pub fn factor(self) -> f64 {
        match self {
            Magnitude::Unit => 1.0,
            Magnitude::Thousand => 1e3,
            Magnitude::Million => 1e6,
            Magnitude::Billion => 1e9,
            Magnitude::HundredMillion => 1e8,
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            Magnitude::Unit => "",
            Magnitude::Thousand => "K",
            Magnitude::Million => "M",
            Magnitude::Billion => "B",
            Magnitude::HundredMillion => "억",
        }
    }
}

/// What a raw number measures. Selects the precision and scaling policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Unit price of an asset.
    Price(Currency),
    /// Balance or valuation total.
    Amount(Currency),
    /// Quantity of an asset held; sub-unit holdings keep 8 decimals.
    Units,
    Percent,
    /// Index level.
    Points,
    Count,
    /// Traded value or traded quantity, magnitude-scaled.
    Volume(ScalePolicy),
}

/// Decimal precision for a value of `kind`.
///
/// | kind                       | value  | decimals |
/// |----------------------------|--------|----------|
/// | price, whole currency      | any    | 0        |
/// | price, fractional currency | >= 1   | 4        |
/// | price, fractional currency | < 1    | 8        |
/// | amount, whole currency     | any    | 0        |
/// | amount, fractional currency| any    | 2        |
/// | units                      | >= 1   | 4        |
/// | units                      | < 1    | 8        |
/// | percent, points            | any    | 2        |
/// | count                      | any    | 0        |
/// | volume, scaled             | any    | 2        |
/// | volume, below first step   | any    | 0        |
pub fn precision(kind: ValueKind, value: f64) -> u8 {
    let at_least_one = value.abs() >= 1.0;
    match kind {
        ValueKind::Price(currency) => match (currency.convention(), at_least_one) {
            (UnitConvention::Whole, _) => 0,
            (UnitConvention::Fractional, true) => 4,
            (UnitConvention::Fractional, false) => 8,
        },
        ValueKind::Amount(currency) => match currency.convention() {
            UnitConvention::Whole => 0,
            UnitConvention::Fractional => 2,
        },
        ValueKind::Units => {
            if at_least_one {
                4
            } else {
                8
            }
        }
        ValueKind::Percent | ValueKind::Points => 2,
        ValueKind::Count => 0,
        ValueKind::Volume(policy) => match scale(value, policy).1 {
            Magnitude::Unit => 0,
            _ => 2,
        },
    }
}

/// Splits `value` into a scaled mantissa and its magnitude step.
pub fn scale(value: f64, policy: ScalePolicy) -> (f64, Magnitude) {
    let magnitude = match policy {
        ScalePolicy::HundredMillion => Magnitude::HundredMillion,
        ScalePolicy::Kmb => {
            let abs = value.abs();
            let mut magnitude = if abs >= 1e9 {
                Magnitude::Billion
            } else if abs >= 1e6 {
                Magnitude::Million
            } else if abs >= 1e3 {
                Magnitude::Thousand
            } else {
                Magnitude::Unit
            };
            // Rounding may carry the mantissa to 1000, e.g. 999,999 -> 1.00M
            while let Some(next) = next_kmb_step(magnitude) {
                let decimals = if magnitude == Magnitude::Unit { 0 } else { 2 };
                if round_to(abs / magnitude.factor(), decimals) < 1e3 {
                    break;
                }
                magnitude = next;
            }
            magnitude
        }
    };
    (value / magnitude.factor(), magnitude)
}

fn next_kmb_step(magnitude: Magnitude) -> Option<Magnitude> {
    match magnitude {
        Magnitude::Unit => Some(Magnitude::Thousand),
        Magnitude::Thousand => Some(Magnitude::Million),
        Magnitude::Million => Some(Magnitude::Billion),
        Magnitude::Billion | Magnitude::HundredMillion => None,
    }
}

pub fn round_to(value: f64, decimals: u8) -> f64 {
    let factor = 10f64.powi(i32::from(decimals));
    let rounded = (value * factor).round() / factor;
    // -0.0 would render as "-0"
    if rounded == 0.0 { 0.0 } else { rounded }
}

/// A value in canonical display units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Normalized {
    /// Rounded value, expressed in `magnitude` steps.
    pub value: f64,
    pub decimals: u8,
    pub magnitude: Magnitude,
    /// Set when the raw input was missing or not a finite number.
    pub malformed: bool,
}

impl Normalized {
    /// The value with the magnitude step multiplied back in.
    pub fn in_base_units(&self) -> f64 {
        self.value * self.magnitude.factor()
    }
}

impl Display for Normalized {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{}",
            format_grouped(self.value, self.decimals),
            self.magnitude.suffix()
        )
    }
}

pub fn normalize(raw: Option<f64>, kind: ValueKind) -> Normalized {
    let (value, malformed) = match raw {
        Some(v) if v.is_finite() => (v, false),
        _ => (0.0, true),
    };
    let (scaled, magnitude) = match kind {
        ValueKind::Volume(policy) => scale(value, policy),
        _ => (value, Magnitude::Unit),
    };
    let decimals = precision(kind, value);
    Normalized {
        value: round_to(scaled, decimals),
        decimals,
        magnitude,
        malformed,
    }
}

/// Converts `raw` from one currency into another using `rates`.
///
/// Missing input or a missing rate yields `None`, which then normalizes as
/// malformed.
pub fn convert(raw: Option<f64>, from: Currency, to: Currency, rates: &FxRates) -> Option<f64> {
    let value = raw.filter(|v| v.is_finite())?;
    rates.rate(from, to).map(|rate| value * rate)
}

/// Formats with a fixed number of decimals and comma thousands separators.
pub fn format_grouped(value: f64, decimals: u8) -> String {
    let formatted = format!("{:.*}", usize::from(decimals), value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (formatted.as_str(), None),
    };

    let mut out = String::with_capacity(formatted.len() + int_part.len() / 3 + 1);
    if value < 0.0 {
        out.push('-');
    }
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if let Some(frac_part) = frac_part {
        out.push('.');
        out.push_str(frac_part);
    }
    out
}
