pub mod render;
pub mod setup;
pub mod snapshot;
pub mod ui;
pub mod watch;
