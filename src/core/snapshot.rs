//! Immutable, versioned snapshots of one view mode

use crate::core::currency::FxRates;
use crate::core::error::{FailureKind, FetchError, RefreshError};
use crate::core::record::NormalizedRecord;
use crate::core::section::{SectionKey, ViewMode};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Display;

/// Identifies one refresh. Issued in increasing order by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize)]
pub struct RequestId(u64);

impl RequestId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub type SectionResult = Result<NormalizedRecord, FetchError>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    view_mode: ViewMode,
    request_id: RequestId,
    sections: BTreeMap<SectionKey, Option<NormalizedRecord>>,
    #[serde(skip)]
    failures: BTreeMap<SectionKey, FetchError>,
    fetched_at: DateTime<Utc>,
    partial: bool,
    fx: FxRates,
}

impl Snapshot {
    /// Merges section results. Failed sections are stored as `None` and mark
    /// the snapshot partial.
    pub fn assemble(
        view_mode: ViewMode,
        request_id: RequestId,
        results: impl IntoIterator<Item = (SectionKey, SectionResult)>,
        fx: FxRates,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        let mut sections = BTreeMap::new();
        let mut failures = BTreeMap::new();
        for (key, result) in results {
            match result {
                Ok(record) => {
                    failures.remove(&key);
                    sections.insert(key, Some(record));
                }
                Err(error) => {
                    sections.insert(key, None);
                    failures.insert(key, error);
                }
            }
        }

        Self {
            view_mode,
            request_id,
            partial: !failures.is_empty(),
            sections,
            failures,
            fetched_at,
            fx,
        }
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn is_partial(&self) -> bool {
        self.partial
    }

    pub fn fx(&self) -> &FxRates {
        &self.fx
    }

    /// The normalized record of `key`, or `None` when it failed or is not
    /// part of this snapshot.
    pub fn section(&self, key: SectionKey) -> Option<&NormalizedRecord> {
        self.sections.get(&key).and_then(Option::as_ref)
    }

    pub fn sections(&self) -> impl Iterator<Item = (SectionKey, Option<&NormalizedRecord>)> {
        self.sections.iter().map(|(k, v)| (*k, v.as_ref()))
    }

    pub fn failure(&self, key: SectionKey) -> Option<&FetchError> {
        self.failures.get(&key)
    }

    pub fn failures(&self) -> impl Iterator<Item = (SectionKey, &FetchError)> {
        self.failures.iter().map(|(k, v)| (*k, v))
    }

    pub fn succeeded(&self) -> usize {
        self.sections.len() - self.failures.len()
    }

    /// True when there was at least one section and none of them loaded.
    pub fn is_total_failure(&self) -> bool {
        !self.sections.is_empty() && self.failures.len() == self.sections.len()
    }

    pub fn error(&self) -> Option<RefreshError> {
        self.is_total_failure()
            .then(|| RefreshError::AllSectionsFailed {
                sections: self.sections.len(),
                kind: FailureKind::classify(self.failures.values()),
            })
    }

    pub fn malformed_fields(&self) -> usize {
        self.sections
            .values()
            .flatten()
            .map(NormalizedRecord::malformed_fields)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::normalize::{ValueKind, normalize};
    use crate::core::record::SectorRow;

    fn sectors() -> NormalizedRecord {
        NormalizedRecord::Sectors(vec![SectorRow {
            name: "Banks".into(),
            change_rate: normalize(Some(1.1), ValueKind::Percent),
            trend: "up".into(),
        }])
    }

    #[test]
    fn test_partial_snapshot_keeps_successful_sections() {
        let snapshot = Snapshot::assemble(
            ViewMode::Stock,
            RequestId::new(3),
            vec![
                (SectionKey::Sectors, Ok(sectors())),
                (
                    SectionKey::Indices,
                    Err(FetchError::Upstream5xx {
                        status: 502,
                        message: "Bad Gateway".into(),
                    }),
                ),
            ],
            FxRates::default(),
            Utc::now(),
        );

        assert!(snapshot.is_partial());
        assert!(!snapshot.is_total_failure());
        assert!(snapshot.section(SectionKey::Sectors).is_some());
        assert!(snapshot.section(SectionKey::Indices).is_none());
        assert_eq!(snapshot.succeeded(), 1);
        assert!(snapshot.error().is_none());
        assert_eq!(snapshot.request_id(), RequestId::new(3));
    }

    #[test]
    fn test_total_failure_is_reported() {
        let snapshot = Snapshot::assemble(
            ViewMode::Crypto,
            RequestId::new(1),
            vec![
                (SectionKey::FearGreed, Err(FetchError::Network("refused".into()))),
                (SectionKey::WhaleAlerts, Err(FetchError::Parse("null".into()))),
            ],
            FxRates::default(),
            Utc::now(),
        );

        assert!(snapshot.is_partial());
        assert!(snapshot.is_total_failure());
        assert_eq!(
            snapshot.error(),
            Some(RefreshError::AllSectionsFailed {
                sections: 2,
                kind: FailureKind::Contract
            })
        );
    }

    #[test]
    fn test_empty_snapshot_is_not_a_failure() {
        let snapshot = Snapshot::assemble(
            ViewMode::Stock,
            RequestId::new(1),
            Vec::new(),
            FxRates::default(),
            Utc::now(),
        );
        assert!(!snapshot.is_partial());
        assert!(!snapshot.is_total_failure());
    }
}
