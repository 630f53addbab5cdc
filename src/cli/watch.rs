use super::render::status_line;
use super::ui;
use crate::core::config::AppConfig;
use crate::core::section::ViewMode;
use crate::refresh::{
    AutoRefresh, ControllerConfig, RefreshController, RefreshOutcome, SnapshotStore,
    SwitchOutcome,
};
use anyhow::{Result, anyhow};
use chrono::Utc;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::Instant;
use tracing::debug;

/// A line typed while watching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchInput {
    Refresh,
    SwitchView,
    AutoRefresh(Option<AutoRefresh>),
    Help,
    Quit,
}

pub fn parse_input(line: &str) -> Result<WatchInput> {
    let mut words = line.split_whitespace();
    let command = words.next().unwrap_or("").to_lowercase();
    match command.as_str() {
        "r" | "refresh" => Ok(WatchInput::Refresh),
        "v" | "view" => Ok(WatchInput::SwitchView),
        "a" | "auto" => match words.next() {
            None | Some("off") => Ok(WatchInput::AutoRefresh(None)),
            Some(interval) => Ok(WatchInput::AutoRefresh(Some(interval.parse()?))),
        },
        "q" | "quit" | "exit" => Ok(WatchInput::Quit),
        "" | "h" | "help" | "?" => Ok(WatchInput::Help),
        other => Err(anyhow!("Unknown command: {}", other)),
    }
}

fn print_help() {
    println!(
        "{}",
        ui::style_text(
            "Commands: r = refresh, v = switch view, a <30|60|300|off> = auto-refresh, q = quit",
            ui::StyleType::Subtle
        )
    );
}

fn describe_refresh(outcome: RefreshOutcome) -> Option<String> {
    match outcome {
        RefreshOutcome::Started(id) => {
            debug!(request_id = %id, "Manual refresh started");
            None
        }
        RefreshOutcome::AlreadyLoading => Some("Already refreshing".to_string()),
        RefreshOutcome::CoolingDown { remaining } => Some(format!(
            "Please wait {}s before refreshing again",
            remaining.as_secs() + 1
        )),
        RefreshOutcome::Stopped => Some("Refresh controller has stopped".to_string()),
    }
}

/// Runs the refresh controller and renders every committed snapshot until
/// `q` or end of input.
pub async fn run(
    config: &AppConfig,
    view: Option<ViewMode>,
    auto_refresh: Option<AutoRefresh>,
) -> Result<()> {
    let mut controller_config = ControllerConfig::from_config(&config.refresh)?;
    if let Some(view) = view {
        controller_config.initial_view = view;
    }
    if auto_refresh.is_some() {
        controller_config.auto_refresh = auto_refresh;
    }

    let aggregator = Arc::new(crate::build_aggregator(config)?);
    let store = SnapshotStore::new();
    let mut snapshots = store.subscribe();
    let mut states = store.subscribe_state();
    let handle = RefreshController::spawn(aggregator, store, controller_config);

    print_help();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut last_status = None;

    loop {
        tokio::select! {
            Some(snapshot) = snapshots.next() => {
                ui::print_separator();
                println!("{}", snapshot.display());
            }
            Ok(()) = states.changed() => {
                let state = states.borrow_and_update().clone();
                if let Some(state) = state {
                    if last_status != Some(state.status) {
                        println!(
                            "{}",
                            ui::style_text(
                                &status_line(&state, Utc::now(), Instant::now()),
                                ui::StyleType::Subtle
                            )
                        );
                    }
                    last_status = Some(state.status);
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match parse_input(&line) {
                    Ok(WatchInput::Refresh) => {
                        if let Some(message) = describe_refresh(handle.refresh_now().await) {
                            println!("{}", ui::style_text(&message, ui::StyleType::Warning));
                        }
                    }
                    Ok(WatchInput::SwitchView) => {
                        let current = handle
                            .store()
                            .refresh_state()
                            .map_or(ViewMode::default(), |s| s.view_mode);
                        if handle.switch_view_mode(current.toggled()).await == SwitchOutcome::Stopped {
                            break;
                        }
                    }
                    Ok(WatchInput::AutoRefresh(interval)) => {
                        handle.set_auto_refresh(interval).await?;
                    }
                    Ok(WatchInput::Help) => print_help(),
                    Ok(WatchInput::Quit) => break,
                    Err(e) => println!("{}", ui::style_text(&e.to_string(), ui::StyleType::Error)),
                }
            }
        }
    }

    handle.shutdown().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_parse_input() {
        assert_eq!(parse_input("r").unwrap(), WatchInput::Refresh);
        assert_eq!(parse_input(" V ").unwrap(), WatchInput::SwitchView);
        assert_eq!(
            parse_input("a 30").unwrap(),
            WatchInput::AutoRefresh(Some(AutoRefresh::Every30s))
        );
        assert_eq!(parse_input("auto off").unwrap(), WatchInput::AutoRefresh(None));
        assert_eq!(parse_input("").unwrap(), WatchInput::Help);
        assert_eq!(parse_input("q").unwrap(), WatchInput::Quit);
        assert!(parse_input("a 45").is_err());
        assert!(parse_input("x").is_err());
    }

    #[test]
    fn test_describe_refresh() {
        assert_eq!(
            describe_refresh(RefreshOutcome::CoolingDown {
                remaining: Duration::from_millis(3_200)
            }),
            Some("Please wait 4s before refreshing again".to_string())
        );
        assert!(describe_refresh(RefreshOutcome::Started(crate::core::RequestId::new(1))).is_none());
    }
}
