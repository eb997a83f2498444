use lazy_static::lazy_static;
use tracing_subscriber::EnvFilter;

pub mod config;
pub mod dashboard;
pub mod db;
pub mod error;
pub mod funnel;
pub mod leaderboard;
pub mod service;
pub mod task;
pub mod ui;
pub mod verify;

#[cfg(test)]
mod testing;

pub use config::{FunnelConfig, SocialPolicy};
pub use dashboard::{DashboardView, ReferralDashboard};
pub use error::{FunnelError, FunnelResult, ValidationError};
pub use funnel::FunnelController;
pub use task::{Outcome, TaskId, TaskInput};

lazy_static! {
    pub static ref CONFIG: FunnelConfig = FunnelConfig::from_env();
}

/// Installs the fmt subscriber. `RUST_LOG` overrides the `info` default.
/// Safe to call more than once.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
