pub mod activities;
pub mod ai;
pub mod cli;
pub mod config;
pub mod database;
pub mod goals;
pub mod logs;
pub mod models;
pub mod notifications;
pub mod period;
pub mod stats;
pub mod store;
pub mod suggestions;
pub mod tui;
pub mod utils;
pub mod validation;
pub mod worker;

pub use config::Config;
pub use database::Database;
pub use models::{Activity, GoalWithDetail, LogEntry, StatsModel, Suggestion, User};
pub use utils::Profile;
