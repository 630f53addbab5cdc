use crate::core::currency::{CurrencyRateProvider, FxQuote, FxRates, RateSource};
use crate::core::normalize::Currency;
use crate::core::section::{SectionKey, ViewMode};
use crate::core::snapshot::{RequestId, Snapshot};
use crate::core::source::SourceAdapter;
use chrono::Utc;
use futures::future::join_all;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// A conversion rate source plus the rate to use when it fails.
pub struct RateFeed {
    pub from: Currency,
    pub to: Currency,
    pub provider: Arc<dyn CurrencyRateProvider>,
    pub fallback: f64,
}

impl RateFeed {
    async fn resolve(&self) -> FxQuote {
        let (rate, source) = match self.provider.get_rate(self.from, self.to).await {
            Ok(rate) => (rate, RateSource::Live),
            Err(e) => {
                warn!(
                    "Rate lookup {}/{} failed, using fallback {}: {}",
                    self.from, self.to, self.fallback, e
                );
                (self.fallback, RateSource::Fallback)
            }
        };
        FxQuote {
            from: self.from,
            to: self.to,
            rate,
            source,
        }
    }
}

/// Fans out the adapters of a view mode and merges their results into one
/// snapshot.
#[derive(Default)]
pub struct Aggregator {
    sources: HashMap<ViewMode, Vec<Arc<dyn SourceAdapter>>>,
    rates: Vec<RateFeed>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, adapter: Arc<dyn SourceAdapter>) {
        self.sources
            .entry(adapter.section().view_mode())
            .or_default()
            .push(adapter);
    }

    pub fn with_sources(mut self, adapters: impl IntoIterator<Item = Arc<dyn SourceAdapter>>) -> Self {
        for adapter in adapters {
            self.register(adapter);
        }
        self
    }

    pub fn with_rate(mut self, feed: RateFeed) -> Self {
        self.rates.push(feed);
        self
    }

    pub fn sections(&self, view_mode: ViewMode) -> Vec<SectionKey> {
        self.adapters(view_mode).iter().map(|a| a.section()).collect()
    }

    fn adapters(&self, view_mode: ViewMode) -> &[Arc<dyn SourceAdapter>] {
        self.sources
            .get(&view_mode)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Currency pairs the registered sections of `view_mode` convert between.
    fn required_pairs(&self, view_mode: ViewMode) -> BTreeSet<(Currency, Currency)> {
        self.adapters(view_mode)
            .iter()
            .filter_map(|a| {
                let section = a.section();
                match (section.source_currency(), section.display_currency()) {
                    (Some(from), Some(to)) if from != to => Some((from, to)),
                    _ => None,
                }
            })
            .collect()
    }

    async fn resolve_rates(&self, pairs: &BTreeSet<(Currency, Currency)>) -> FxRates {
        let feeds = self
            .rates
            .iter()
            .filter(|feed| pairs.contains(&(feed.from, feed.to)));
        FxRates::from_quotes(join_all(feeds.map(RateFeed::resolve)).await)
    }

    /// Never fails: section failures end up as `None` entries of a partial
    /// snapshot.
    #[instrument(name = "Aggregate", skip(self))]
    pub async fn aggregate(&self, view_mode: ViewMode, request_id: RequestId) -> Snapshot {
        let adapters = self.adapters(view_mode);
        let pairs = self.required_pairs(view_mode);
        debug!(sections = adapters.len(), "Fanning out section fetches");

        let (outcomes, fx) = tokio::join!(
            join_all(adapters.iter().map(|adapter| adapter.fetch(request_id))),
            self.resolve_rates(&pairs),
        );

        let results: Vec<_> = outcomes
            .into_iter()
            .map(|outcome| {
                let section = outcome.section;
                (section, outcome.result.map(|raw| raw.normalize(section, &fx)))
            })
            .collect();
        let snapshot = Snapshot::assemble(view_mode, request_id, results, fx, Utc::now());

        info!(
            "Aggregated {} sections for {} ({} failed)",
            snapshot.succeeded(),
            view_mode,
            snapshot.failures().count()
        );
        snapshot
    }
}
