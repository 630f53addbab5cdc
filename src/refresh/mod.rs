//! Refresh orchestration: aggregation, lifecycle control and the snapshot
//! store

pub mod aggregator;
pub mod controller;
pub mod state;
pub mod store;

#[cfg(test)]
mod testing;

pub use aggregator::{Aggregator, RateFeed};
pub use controller::{
    ControllerConfig, ControllerHandle, ControllerStopped, RefreshController, RefreshOutcome,
    SwitchOutcome,
};
pub use state::{AutoRefresh, RefreshState, RefreshStatus};
pub use store::{SnapshotStore, SnapshotSubscriber};
