//! Core domain types: sections, normalization, snapshots and the seams
//! providers plug into

pub mod config;
pub mod currency;
pub mod error;
pub mod log;
pub mod normalize;
pub mod record;
pub mod section;
pub mod snapshot;
pub mod source;

// Re-export main types for cleaner imports
pub use currency::{CurrencyRateProvider, FxRates};
pub use error::{FailureKind, FetchError, RefreshError};
pub use section::{SectionKey, ViewMode};
pub use snapshot::{RequestId, Snapshot};
pub use source::{SectionOutcome, SourceAdapter};
