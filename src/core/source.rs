use crate::core::error::FetchError;
use crate::core::record::RawRecord;
use crate::core::section::SectionKey;
use crate::core::snapshot::RequestId;
use async_trait::async_trait;

/// Result of one adapter fetch, tagged with the refresh that asked for it.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionOutcome {
    pub request_id: RequestId,
    pub section: SectionKey,
    pub result: Result<RawRecord, FetchError>,
}

/// Fetches one upstream section endpoint and maps the payload into a typed
/// partial record. Implementations never retry.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn section(&self) -> SectionKey;

    async fn fetch(&self, request_id: RequestId) -> SectionOutcome;
}
