pub mod config;
pub mod error;
pub mod handlers;
pub mod notifier;
pub mod pipeline;
pub mod runner;
pub mod scheduler;
pub mod scripts;
pub mod signature;
pub mod webhook;

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};

pub use config::{HookConfig, load_config};
pub use error::{HookError, Result};

use crate::scheduler::TaskScheduler;

pub struct AppState {
    pub config: Arc<HookConfig>,
    pub scheduler: TaskScheduler,
    pub start_time: Instant,
    pub started_at: DateTime<Utc>,
}

pub type SharedState = Arc<AppState>;
