use super::ui;
use crate::core::config::AppConfig;
use crate::core::section::ViewMode;
use crate::core::snapshot::RequestId;
use anyhow::Result;
use tracing::info;

/// Fetches every section of `view` once and prints the result.
pub async fn run(config: &AppConfig, view: ViewMode) -> Result<()> {
    let aggregator = crate::build_aggregator(config)?;

    let spinner = ui::new_spinner(&format!("Fetching {view} sections..."));
    let snapshot = aggregator.aggregate(view, RequestId::new(1)).await;
    spinner.finish_and_clear();

    println!("{}", snapshot.display());
    info!(
        sections = snapshot.succeeded(),
        malformed_fields = snapshot.malformed_fields(),
        "Snapshot rendered"
    );

    match snapshot.error() {
        Some(error) => Err(error.into()),
        None => Ok(()),
    }
}
