//! Input checks shared by the services. Each returns the first problem found.

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::models::ActivityDraft;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please enter an activity title")]
    EmptyTitle,
    #[error("End time must be after start time")]
    EndBeforeStart,
    #[error("Pomodoro focus and break minutes must be greater than 0")]
    InvalidPomodoro,
    #[error("Please select at least one repeat day")]
    NoRepeatDays,
    #[error("Type name must not be empty")]
    EmptyTypeName,
    #[error("Actual start must not be after actual end")]
    LogEndsBeforeStart,
    #[error("Logged duration must be greater than zero")]
    EmptyLog,
    #[error("Please enter a target time")]
    EmptyTarget,
    #[error("Target time must not be negative")]
    NegativeTarget,
    #[error("Minutes must be between 0 and 59")]
    MinutesOutOfRange,
}

pub fn validate_activity(draft: &ActivityDraft) -> Result<(), ValidationError> {
    if draft.title.trim().is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    if draft.end_time <= draft.start_time {
        return Err(ValidationError::EndBeforeStart);
    }
    if draft.pomodoro.enabled
        && (draft.pomodoro.focus_minutes == 0 || draft.pomodoro.break_minutes == 0)
    {
        return Err(ValidationError::InvalidPomodoro);
    }
    if draft.repeat_days.is_empty() {
        return Err(ValidationError::NoRepeatDays);
    }
    Ok(())
}

/// Checks a logged window and returns its duration in seconds
pub fn validate_log_window(
    actual_start: NaiveDateTime,
    actual_end: NaiveDateTime,
) -> Result<i64, ValidationError> {
    if actual_start > actual_end {
        return Err(ValidationError::LogEndsBeforeStart);
    }
    let secs = (actual_end - actual_start).num_seconds();
    if secs <= 0 {
        return Err(ValidationError::EmptyLog);
    }
    Ok(secs)
}

/// Checks an hours/minutes target and returns it in seconds
pub fn validate_target(hours: i64, minutes: i64) -> Result<i64, ValidationError> {
    if hours < 0 || minutes < 0 {
        return Err(ValidationError::NegativeTarget);
    }
    if minutes >= 60 {
        return Err(ValidationError::MinutesOutOfRange);
    }
    if hours == 0 && minutes == 0 {
        return Err(ValidationError::EmptyTarget);
    }
    Ok((hours * 60 + minutes) * 60)
}

pub fn validate_type_name(name: &str) -> Result<&str, ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyTypeName);
    }
    Ok(trimmed)
}
