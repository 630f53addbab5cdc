use crate::core::error::RefreshError;
use crate::core::section::ViewMode;
use crate::core::snapshot::RequestId;
use anyhow::anyhow;
use chrono::{DateTime, Utc};
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshStatus {
    Idle,
    Loading,
    /// Manual refreshes are rejected until the window expires
    Cooldown,
    /// The last refresh failed for every section
    Error,
}

impl Display for RefreshStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                RefreshStatus::Idle => "idle",
                RefreshStatus::Loading => "loading",
                RefreshStatus::Cooldown => "cooldown",
                RefreshStatus::Error => "error",
            }
        )
    }
}

/// Supported auto-refresh intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoRefresh {
    Every30s,
    Every1m,
    Every5m,
}

impl AutoRefresh {
    pub fn period(self) -> Duration {
        Duration::from_secs(match self {
            AutoRefresh::Every30s => 30,
            AutoRefresh::Every1m => 60,
            AutoRefresh::Every5m => 300,
        })
    }
}

impl TryFrom<u64> for AutoRefresh {
    type Error = anyhow::Error;

    fn try_from(secs: u64) -> Result<Self, Self::Error> {
        match secs {
            30 => Ok(AutoRefresh::Every30s),
            60 => Ok(AutoRefresh::Every1m),
            300 => Ok(AutoRefresh::Every5m),
            _ => Err(anyhow!(
                "Unsupported auto-refresh interval {}s, use 30, 60 or 300",
                secs
            )),
        }
    }
}

impl FromStr for AutoRefresh {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        match s.as_str() {
            "1m" => Ok(AutoRefresh::Every1m),
            "5m" => Ok(AutoRefresh::Every5m),
            other => {
                let secs = other
                    .trim_end_matches('s')
                    .parse::<u64>()
                    .map_err(|_| anyhow!("Invalid auto-refresh interval: {}", s))?;
                AutoRefresh::try_from(secs)
            }
        }
    }
}

impl Display for AutoRefresh {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                AutoRefresh::Every30s => "30s",
                AutoRefresh::Every1m => "1m",
                AutoRefresh::Every5m => "5m",
            }
        )
    }
}

/// Transient refresh state of the active view mode.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshState {
    pub view_mode: ViewMode,
    pub status: RefreshStatus,
    pub auto_refresh: Option<AutoRefresh>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub active_request_id: Option<RequestId>,
    pub cooldown_until: Option<Instant>,
    pub last_error: Option<RefreshError>,
}

impl RefreshState {
    pub fn new(view_mode: ViewMode, auto_refresh: Option<AutoRefresh>) -> Self {
        RefreshState {
            view_mode,
            status: RefreshStatus::Idle,
            auto_refresh,
            last_success_at: None,
            active_request_id: None,
            cooldown_until: None,
            last_error: None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.status == RefreshStatus::Loading
    }

    /// Time left in the cooldown window, `None` once it has expired.
    pub fn cooldown_remaining(&self, now: Instant) -> Option<Duration> {
        self.cooldown_until
            .map(|until| until.saturating_duration_since(now))
            .filter(|remaining| !remaining.is_zero())
    }

    pub fn since_last_success(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        self.last_success_at.map(|at| now - at)
    }
}
