//! Scripted adapters and rate providers for refresh tests

use crate::core::currency::CurrencyRateProvider;
use crate::core::error::FetchError;
use crate::core::normalize::Currency;
use crate::core::record::{NormalizedRecord, RawRecord, RawSentiment};
use crate::core::section::SectionKey;
use crate::core::snapshot::RequestId;
use crate::core::source::{SectionOutcome, SourceAdapter};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Answers after a delay. Successful calls return a sentiment record whose
/// value is the 1-based call number, so tests can tell fetches apart.
pub struct ScriptedAdapter {
    section: SectionKey,
    delays: Mutex<VecDeque<Duration>>,
    default_delay: Duration,
    failure: Option<FetchError>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedAdapter {
    pub fn new(section: SectionKey, delay: Duration) -> Self {
        ScriptedAdapter {
            section,
            delays: Mutex::new(VecDeque::new()),
            default_delay: delay,
            failure: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(mut self, error: FetchError) -> Self {
        self.failure = Some(error);
        self
    }

    /// Per-call delays, used in order before falling back to the default.
    pub fn with_delays(self, delays: impl IntoIterator<Item = Duration>) -> Self {
        if let Ok(mut queue) = self.delays.lock() {
            queue.extend(delays);
        }
        self
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

pub fn call_number(record: Option<&NormalizedRecord>) -> Option<f64> {
    match record {
        Some(NormalizedRecord::Sentiment(s)) => Some(s.value.value),
        _ => None,
    }
}

pub fn count(calls: &Arc<AtomicUsize>) -> usize {
    calls.load(Ordering::SeqCst)
}

#[async_trait]
impl SourceAdapter for ScriptedAdapter {
    fn section(&self) -> SectionKey {
        self.section
    }

    async fn fetch(&self, request_id: RequestId) -> SectionOutcome {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let delay = self
            .delays
            .lock()
            .ok()
            .and_then(|mut queue| queue.pop_front())
            .unwrap_or(self.default_delay);
        tokio::time::sleep(delay).await;

        let result = match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(RawRecord::Sentiment(RawSentiment {
                value: Some(call as f64),
                classification: format!("call {call}"),
                timestamp: None,
            })),
        };
        SectionOutcome {
            request_id,
            section: self.section,
            result,
        }
    }
}

pub struct FixedRate {
    pub rate: Option<f64>,
    pub calls: Arc<AtomicUsize>,
}

impl FixedRate {
    pub fn new(rate: Option<f64>) -> Self {
        FixedRate {
            rate,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl CurrencyRateProvider for FixedRate {
    async fn get_rate(&self, from: Currency, to: Currency) -> anyhow::Result<f64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.rate
            .ok_or_else(|| anyhow::anyhow!("No rate for {}/{}", from, to))
    }
}
