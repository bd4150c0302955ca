use chrono::NaiveDateTime;
use thiserror::Error;

use crate::ai::{build_prompt, parse_response, AiError, SuggestionModel};
use crate::database::{Database, DatabaseError};
use crate::models::{Activity, LogEntry, Suggestion, SuggestionStatus};
use crate::notifications::{AlarmBackend, AlarmScheduler};
use crate::utils::{format_hhmm, parse_time_of_day};
use crate::validation::ValidationError;

/// Unanalyzed logs needed before a suggestion is requested
pub const ANALYSIS_THRESHOLD: usize = 7;

#[derive(Debug, Error)]
pub enum SuggestionError {
    #[error("AI error: {0}")]
    AiError(#[from] AiError),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("Suggestion not found: {0}")]
    NotFound(String),
    #[error("Suggestion was already {0}")]
    AlreadyHandled(&'static str),
    #[error("Activity for this suggestion no longer exists")]
    ActivityMissing,
    #[error("Invalid suggested time '{0}'")]
    InvalidTime(String),
    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Fewer unanalyzed logs than the threshold; nothing happened
    NotEnoughLogs(usize),
    /// The busiest activity was deleted; its logs were retired without a request
    ActivityMissing(String),
    Suggested(Suggestion),
}

/// Activity id with the most logs in the batch; earliest seen wins ties
fn busiest_activity(logs: &[LogEntry]) -> Option<&str> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for log in logs {
        match counts.iter_mut().find(|(id, _)| *id == log.activity_id) {
            Some((_, n)) => *n += 1,
            None => counts.push((log.activity_id.as_str(), 1)),
        }
    }
    counts
        .into_iter()
        .fold(None::<(&str, usize)>, |best, (id, n)| match best {
            Some((_, best_n)) if best_n >= n => best,
            _ => Some((id, n)),
        })
        .map(|(id, _)| id)
}

/// Batches unanalyzed logs into suggestion requests
pub struct AnalysisService<'a> {
    db: &'a Database,
    model: &'a dyn SuggestionModel,
    threshold: usize,
}

impl<'a> AnalysisService<'a> {
    pub fn new(db: &'a Database, model: &'a dyn SuggestionModel) -> Self {
        Self {
            db,
            model,
            threshold: ANALYSIS_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold.max(1);
        self
    }

    /// Run one analysis pass for a user.
    ///
    /// When enough unanalyzed logs exist, the activity with the most of
    /// them is sent to the model. On success the suggestion is stored and
    /// every log of the batch is marked analyzed in one transaction; on any
    /// failure nothing is marked, so the next pass retries.
    pub fn run_cycle(&self, user_id: &str, now: NaiveDateTime) -> Result<CycleOutcome, SuggestionError> {
        let logs = self.db.get_unanalyzed_logs(user_id)?;
        if logs.len() < self.threshold {
            return Ok(CycleOutcome::NotEnoughLogs(logs.len()));
        }
        let Some(activity_id) = busiest_activity(&logs) else {
            return Ok(CycleOutcome::NotEnoughLogs(0));
        };

        let Some(activity) = self.db.get_activity(activity_id)? else {
            let orphaned: Vec<String> = logs
                .iter()
                .filter(|l| l.activity_id == activity_id)
                .map(|l| l.id.clone())
                .collect();
            log::warn!(
                "retiring {} logs of deleted activity {}",
                orphaned.len(),
                activity_id
            );
            self.db.mark_logs_analyzed(&orphaned)?;
            return Ok(CycleOutcome::ActivityMissing(activity_id.to_string()));
        };

        let activity_logs: Vec<LogEntry> = logs
            .iter()
            .filter(|l| l.activity_id == activity.id)
            .cloned()
            .collect();
        let prompt = build_prompt(&activity, &activity_logs);
        let raw = self.model.generate(&prompt)?.ok_or(AiError::EmptyResponse)?;

        let mut suggestion = parse_response(&raw)?;
        if suggestion.activity_id != activity.id {
            log::warn!(
                "model answered for activity '{}', expected '{}'",
                suggestion.activity_id,
                activity.id
            );
            suggestion.activity_id = activity.id.clone();
        }
        suggestion.user_id = user_id.to_string();
        suggestion.requested_at = now.format("%a, %d/%m").to_string();
        suggestion.status = SuggestionStatus::Pending;

        let batch: Vec<String> = logs.iter().map(|l| l.id.clone()).collect();
        suggestion.id = self.db.save_suggestion_and_mark_analyzed(&suggestion, &batch)?;
        log::info!(
            "stored suggestion for '{}' from {} logs",
            activity.title,
            batch.len()
        );
        Ok(CycleOutcome::Suggested(suggestion))
    }
}

/// Acting on stored suggestions
pub struct SuggestionService<'a> {
    db: &'a Database,
    alarms: AlarmScheduler<'a>,
}

impl<'a> SuggestionService<'a> {
    pub fn new(db: &'a Database, backend: &'a dyn AlarmBackend) -> Self {
        Self {
            db,
            alarms: AlarmScheduler::new(backend),
        }
    }

    pub fn pending(&self, user_id: &str) -> Result<Vec<Suggestion>, SuggestionError> {
        Ok(self
            .db
            .get_suggestions_by_status(user_id, SuggestionStatus::Pending)?)
    }

    fn get_pending(&self, suggestion_id: &str) -> Result<Suggestion, SuggestionError> {
        let suggestion = self
            .db
            .get_suggestion(suggestion_id)?
            .ok_or_else(|| SuggestionError::NotFound(suggestion_id.to_string()))?;
        if suggestion.status != SuggestionStatus::Pending {
            return Err(SuggestionError::AlreadyHandled(suggestion.status.as_str()));
        }
        Ok(suggestion)
    }

    /// Move the activity to the suggested window and mark the suggestion applied
    pub fn apply(&self, suggestion_id: &str, now: NaiveDateTime) -> Result<Activity, SuggestionError> {
        let suggestion = self.get_pending(suggestion_id)?;
        let mut activity = self
            .db
            .get_activity(&suggestion.activity_id)?
            .ok_or(SuggestionError::ActivityMissing)?;

        let start = parse_time_of_day(&suggestion.suggested_start)
            .map_err(|_| SuggestionError::InvalidTime(suggestion.suggested_start.clone()))?;
        let end = parse_time_of_day(&suggestion.suggested_end)
            .map_err(|_| SuggestionError::InvalidTime(suggestion.suggested_end.clone()))?;
        if end <= start {
            return Err(ValidationError::EndBeforeStart.into());
        }

        self.db
            .apply_suggestion_window(&suggestion.id, &activity.id, start, end)?;
        activity.start_time = start;
        activity.end_time = end;
        log::info!(
            "moved '{}' to {} - {}",
            activity.title,
            format_hhmm(start),
            format_hhmm(end)
        );

        if let Err(e) = self.alarms.reschedule(&activity, now) {
            log::warn!("failed to reschedule alarms for '{}': {}", activity.title, e);
        }
        Ok(activity)
    }

    /// Hide a suggestion without touching the activity
    pub fn discard(&self, suggestion_id: &str) -> Result<(), SuggestionError> {
        let suggestion = self.get_pending(suggestion_id)?;
        self.db
            .update_suggestion_status(&suggestion.id, SuggestionStatus::Deleted)?;
        Ok(())
    }
}
