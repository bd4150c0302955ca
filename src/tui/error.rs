use thiserror::Error;

use crate::activities::ActivityError;
use crate::database::DatabaseError;
use crate::goals::GoalError;
use crate::logs::LogError;
use crate::notifications::NotificationError;
use crate::stats::StatsError;
use crate::suggestions::SuggestionError;

#[derive(Debug, Error)]
pub enum TuiError {
    #[error("IO/Terminal error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),

    #[error("{0}")]
    ActivityError(#[from] ActivityError),

    #[error("{0}")]
    LogError(#[from] LogError),

    #[error("{0}")]
    GoalError(#[from] GoalError),

    #[error("{0}")]
    StatsError(#[from] StatsError),

    #[error("{0}")]
    SuggestionError(#[from] SuggestionError),

    #[error("Notification error: {0}")]
    NotificationError(#[from] NotificationError),

    #[error("Render error: {0}")]
    RenderError(String),
}
