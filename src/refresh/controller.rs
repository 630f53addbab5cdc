//! Refresh lifecycle of the active view mode
//!
//! A single task owns all mutable state. It reacts to commands from
//! [`ControllerHandle`]s, completed aggregations, auto-refresh ticks and the
//! end of the cooldown window. Results whose request id is no longer active
//! are dropped on arrival; nothing is aborted mid-flight.

use crate::core::config::RefreshConfig;
use crate::core::section::ViewMode;
use crate::core::snapshot::{RequestId, Snapshot};
use crate::refresh::aggregator::Aggregator;
use crate::refresh::state::{AutoRefresh, RefreshState, RefreshStatus};
use crate::refresh::store::SnapshotStore;
use anyhow::Result;
use futures::StreamExt;
use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at, sleep_until};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct ControllerConfig {
    pub initial_view: ViewMode,
    pub cooldown: Duration,
    pub auto_refresh: Option<AutoRefresh>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        ControllerConfig {
            initial_view: ViewMode::Crypto,
            cooldown: Duration::from_secs(5),
            auto_refresh: None,
        }
    }
}

impl ControllerConfig {
    pub fn from_config(config: &RefreshConfig) -> Result<Self> {
        Ok(ControllerConfig {
            initial_view: config.initial_view,
            cooldown: Duration::from_secs(config.cooldown_secs),
            auto_refresh: config
                .auto_refresh_secs
                .map(AutoRefresh::try_from)
                .transpose()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Started(RequestId),
    AlreadyLoading,
    CoolingDown { remaining: Duration },
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchOutcome {
    Switched(RequestId),
    /// The requested mode was already active
    Unchanged,
    Stopped,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("refresh controller has stopped")]
pub struct ControllerStopped;

enum Command {
    RefreshNow(oneshot::Sender<RefreshOutcome>),
    SetAutoRefresh(Option<AutoRefresh>, oneshot::Sender<()>),
    SwitchView(ViewMode, oneshot::Sender<SwitchOutcome>),
    Shutdown(oneshot::Sender<()>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Manual,
    Scheduled,
    Activation,
}

struct Completion {
    trigger: Trigger,
    snapshot: Snapshot,
}

/// Cloneable access to a running controller.
#[derive(Clone)]
pub struct ControllerHandle {
    commands: mpsc::Sender<Command>,
    store: SnapshotStore,
}

impl ControllerHandle {
    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Option<T> {
        let (tx, rx) = oneshot::channel();
        self.commands.send(make(tx)).await.ok()?;
        rx.await.ok()
    }

    /// Starts a refresh unless one is in flight or the cooldown window is
    /// open. Rejections are returned, never queued.
    pub async fn refresh_now(&self) -> RefreshOutcome {
        self.request(Command::RefreshNow)
            .await
            .unwrap_or(RefreshOutcome::Stopped)
    }

    pub async fn set_auto_refresh(
        &self,
        interval: Option<AutoRefresh>,
    ) -> Result<(), ControllerStopped> {
        self.request(|tx| Command::SetAutoRefresh(interval, tx))
            .await
            .ok_or(ControllerStopped)
    }

    pub async fn switch_view_mode(&self, view_mode: ViewMode) -> SwitchOutcome {
        self.request(|tx| Command::SwitchView(view_mode, tx))
            .await
            .unwrap_or(SwitchOutcome::Stopped)
    }

    pub async fn shutdown(&self) {
        let _ = self.request(Command::Shutdown).await;
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }
}

pub struct RefreshController {
    aggregator: Arc<Aggregator>,
    store: SnapshotStore,
    config: ControllerConfig,
    last_request_id: RequestId,
    state: RefreshState,
    timer: Option<Interval>,
    in_flight: FuturesUnordered<BoxFuture<'static, Completion>>,
}

impl RefreshController {
    /// Spawns the controller task and activates `config.initial_view` with an
    /// immediate fetch. Must be called from within a tokio runtime.
    pub fn spawn(
        aggregator: Arc<Aggregator>,
        store: SnapshotStore,
        config: ControllerConfig,
    ) -> ControllerHandle {
        let (tx, rx) = mpsc::channel(16);
        let state = RefreshState::new(config.initial_view, config.auto_refresh);
        let timer = config.auto_refresh.map(new_timer);

        let mut controller = RefreshController {
            aggregator,
            store: store.clone(),
            config,
            last_request_id: RequestId::new(0),
            state,
            timer,
            in_flight: FuturesUnordered::new(),
        };
        controller.start(Trigger::Activation);

        tokio::spawn(controller.run(rx));
        ControllerHandle {
            commands: tx,
            store,
        }
    }

    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        info!(view = %self.state.view_mode, "Refresh controller started");
        loop {
            let cooldown_deadline = self.state.cooldown_until;
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Shutdown(reply)) => {
                        let _ = reply.send(());
                        break;
                    }
                    Some(command) => self.handle(command),
                    None => break,
                },
                Some(completion) = self.in_flight.next(), if !self.in_flight.is_empty() => {
                    self.complete(completion);
                }
                _ = tick(&mut self.timer), if self.timer.is_some() => {
                    self.on_tick();
                }
                _ = sleep_until(cooldown_deadline.unwrap_or_else(Instant::now)), if cooldown_deadline.is_some() => {
                    self.end_cooldown();
                }
            }
        }
        info!("Refresh controller stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::RefreshNow(reply) => {
                let outcome = self.refresh_now();
                let _ = reply.send(outcome);
            }
            Command::SetAutoRefresh(interval, reply) => {
                self.set_auto_refresh(interval);
                let _ = reply.send(());
            }
            Command::SwitchView(view_mode, reply) => {
                let outcome = self.switch_view_mode(view_mode);
                let _ = reply.send(outcome);
            }
            Command::Shutdown(reply) => {
                let _ = reply.send(());
            }
        }
    }

    fn refresh_now(&mut self) -> RefreshOutcome {
        if self.state.is_loading() {
            debug!("Manual refresh rejected, already loading");
            return RefreshOutcome::AlreadyLoading;
        }
        if let Some(remaining) = self.state.cooldown_remaining(Instant::now()) {
            debug!(?remaining, "Manual refresh rejected, cooling down");
            return RefreshOutcome::CoolingDown { remaining };
        }
        RefreshOutcome::Started(self.start(Trigger::Manual))
    }

    fn set_auto_refresh(&mut self, interval: Option<AutoRefresh>) {
        info!(
            view = %self.state.view_mode,
            "Auto-refresh set to {}",
            interval.map_or("off".to_string(), |i| i.to_string())
        );
        self.state.auto_refresh = interval;
        self.timer = interval.map(new_timer);
        self.publish();
    }

    fn switch_view_mode(&mut self, view_mode: ViewMode) -> SwitchOutcome {
        if view_mode == self.state.view_mode {
            return SwitchOutcome::Unchanged;
        }
        info!(from = %self.state.view_mode, to = %view_mode, "Switching view mode");

        // Dropping the old state also drops its timer and active request id,
        // which makes any in-flight result for it stale.
        self.state = RefreshState::new(view_mode, self.config.auto_refresh);
        self.timer = self.config.auto_refresh.map(new_timer);
        SwitchOutcome::Switched(self.start(Trigger::Activation))
    }

    fn on_tick(&mut self) {
        if self.state.is_loading() {
            debug!("Auto-refresh tick suppressed, already loading");
            return;
        }
        self.start(Trigger::Scheduled);
    }

    fn end_cooldown(&mut self) {
        self.state.cooldown_until = None;
        if self.state.status == RefreshStatus::Cooldown {
            self.state.status = RefreshStatus::Idle;
        }
        self.publish();
    }

    fn start(&mut self, trigger: Trigger) -> RequestId {
        self.last_request_id = self.last_request_id.next();
        let request_id = self.last_request_id;
        let view_mode = self.state.view_mode;

        self.state.status = RefreshStatus::Loading;
        self.state.active_request_id = Some(request_id);
        self.publish();
        debug!(%request_id, ?trigger, view = %view_mode, "Refresh started");

        let aggregator = Arc::clone(&self.aggregator);
        self.in_flight.push(Box::pin(async move {
            Completion {
                trigger,
                snapshot: aggregator.aggregate(view_mode, request_id).await,
            }
        }));
        request_id
    }

    fn complete(&mut self, completion: Completion) {
        let Completion { trigger, snapshot } = completion;
        if snapshot.view_mode() != self.state.view_mode
            || Some(snapshot.request_id()) != self.state.active_request_id
        {
            debug!(
                request_id = %snapshot.request_id(),
                view = %snapshot.view_mode(),
                "Discarding stale refresh result"
            );
            return;
        }

        self.state.active_request_id = None;
        let snapshot = self.store.commit(snapshot);

        if let Some(error) = snapshot.error() {
            warn!(request_id = %snapshot.request_id(), "Refresh failed: {error}");
            self.state.status = RefreshStatus::Error;
            self.state.last_error = Some(error);
            self.state.cooldown_until = None;
        } else {
            self.state.last_success_at = Some(snapshot.fetched_at());
            self.state.last_error = None;
            if trigger == Trigger::Manual && !self.config.cooldown.is_zero() {
                self.state.cooldown_until = Some(Instant::now() + self.config.cooldown);
            }
            self.state.status = if self.state.cooldown_until.is_some() {
                RefreshStatus::Cooldown
            } else {
                RefreshStatus::Idle
            };
        }
        self.publish();
    }

    fn publish(&self) {
        self.store.publish_state(self.state.clone());
    }
}

fn new_timer(interval: AutoRefresh) -> Interval {
    let period = interval.period();
    let mut timer = interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    timer
}

async fn tick(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending().await,
    }
}
