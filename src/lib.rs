pub mod cli;
pub mod core;
pub mod providers;
pub mod refresh;

use crate::core::config::AppConfig;
use crate::core::normalize::Currency;
use crate::core::section::ViewMode;
use crate::providers::dashboard_api::adapters_for;
use crate::providers::upbit::UpbitRateProvider;
use crate::providers::util::build_client;
use crate::providers::yahoo_finance::YahooCurrencyProvider;
use crate::refresh::{Aggregator, AutoRefresh, RateFeed};
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info};

pub enum AppCommand {
    Snapshot {
        view: Option<ViewMode>,
    },
    Watch {
        view: Option<ViewMode>,
        auto_refresh: Option<AutoRefresh>,
    },
}

/// Wires the dashboard adapters of both views and the FX feeds over one
/// shared HTTP client.
pub fn build_aggregator(config: &AppConfig) -> Result<Aggregator> {
    let client = build_client(config.api.timeout())?;

    let mut aggregator = Aggregator::new();
    for view in [ViewMode::Crypto, ViewMode::Stock] {
        aggregator = aggregator.with_sources(adapters_for(
            view,
            &config.api.base_url,
            &client,
            &config.limits,
        ));
    }

    let yahoo = YahooCurrencyProvider::new(config.yahoo_base_url(), client.clone());
    let upbit = UpbitRateProvider::new(config.upbit_base_url(), client);
    let fallback = &config.providers.fallback;

    Ok(aggregator
        .with_rate(RateFeed {
            from: Currency::Usd,
            to: Currency::Krw,
            provider: Arc::new(yahoo),
            fallback: fallback.usd_krw,
        })
        .with_rate(RateFeed {
            from: Currency::Usdt,
            to: Currency::Krw,
            provider: Arc::new(upbit),
            fallback: fallback.usdt_krw,
        }))
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("tickview starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    match command {
        AppCommand::Snapshot { view } => {
            let view = view.unwrap_or(config.refresh.initial_view);
            cli::snapshot::run(&config, view).await
        }
        AppCommand::Watch { view, auto_refresh } => {
            cli::watch::run(&config, view, auto_refresh).await
        }
    }
}
