use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use thiserror::Error;

use crate::database::{Database, DatabaseError};
use crate::models::{
    format_days, Activity, ActivityDraft, ActivityType, ActivityWithStatus, DayLabel, PeriodKind,
};
use crate::notifications::{AlarmBackend, AlarmScheduler};
use crate::validation::{validate_activity, validate_type_name, ValidationError};

#[derive(Debug, Error)]
pub enum ActivityError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("Title '{0}' already exists in another activity")]
    TitleConflict(String),
    #[error("Time conflicts with:\n{}", .0.join("\n"))]
    TimeConflict(Vec<String>),
    #[error("Activity type '{0}' already exists")]
    DuplicateType(String),
    #[error("Activity not found: {0}")]
    NotFound(String),
    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),
}

/// Another activity of the user whose title matches case-insensitively
pub fn find_title_conflict<'a>(
    title: &str,
    others: &'a [Activity],
    exclude_id: Option<&str>,
) -> Option<&'a Activity> {
    let wanted = title.trim().to_lowercase();
    others
        .iter()
        .filter(|a| Some(a.id.as_str()) != exclude_id)
        .find(|a| a.title.trim().to_lowercase() == wanted)
}

/// Activities sharing a repeat day whose time-of-day window overlaps the draft.
///
/// Overlap is inclusive, so windows that only touch at an endpoint conflict.
pub fn find_time_conflicts<'a>(
    draft: &ActivityDraft,
    others: &'a [Activity],
    exclude_id: Option<&str>,
) -> Vec<&'a Activity> {
    let start = draft.start_time.num_seconds_from_midnight();
    let end = draft.end_time.num_seconds_from_midnight();
    others
        .iter()
        .filter(|a| Some(a.id.as_str()) != exclude_id)
        .filter(|a| a.repeat_days.iter().any(|d| draft.repeat_days.contains(d)))
        .filter(|a| {
            let other_start = a.start_time.num_seconds_from_midnight();
            let other_end = a.end_time.num_seconds_from_midnight();
            start <= other_end && end >= other_start
        })
        .collect()
}

fn describe_conflict(activity: &Activity) -> String {
    format!(
        "- '{}' on {} ({})",
        activity.title,
        format_days(&activity.repeat_days),
        activity.window_label()
    )
}

pub struct ActivityService<'a> {
    db: &'a Database,
    alarms: AlarmScheduler<'a>,
}

impl<'a> ActivityService<'a> {
    pub fn new(db: &'a Database, backend: &'a dyn AlarmBackend) -> Self {
        Self {
            db,
            alarms: AlarmScheduler::new(backend),
        }
    }

    fn check_conflicts(
        &self,
        user_id: &str,
        draft: &ActivityDraft,
        exclude_id: Option<&str>,
    ) -> Result<(), ActivityError> {
        validate_activity(draft)?;
        let existing = self.db.get_activities_by_user(user_id)?;
        if let Some(other) = find_title_conflict(&draft.title, &existing, exclude_id) {
            return Err(ActivityError::TitleConflict(other.title.clone()));
        }
        let conflicts = find_time_conflicts(draft, &existing, exclude_id);
        if !conflicts.is_empty() {
            return Err(ActivityError::TimeConflict(
                conflicts.into_iter().map(describe_conflict).collect(),
            ));
        }
        Ok(())
    }

    // Alarm failures never undo a saved activity
    fn schedule_alarms(&self, activity: &Activity, now: NaiveDateTime) {
        if let Err(e) = self.alarms.reschedule(activity, now) {
            log::warn!("failed to schedule alarms for '{}': {}", activity.title, e);
        }
    }

    pub fn create(
        &self,
        user_id: &str,
        draft: &ActivityDraft,
        now: NaiveDateTime,
    ) -> Result<Activity, ActivityError> {
        self.check_conflicts(user_id, draft, None)?;
        let mut activity = Activity::from_draft(user_id, draft);
        activity.id = self.db.insert_activity(&activity)?;
        log::info!("created activity '{}' ({})", activity.title, activity.id);
        self.schedule_alarms(&activity, now);
        Ok(activity)
    }

    /// Edit an activity. Goal titles follow a rename and alarms are rebuilt.
    pub fn update(
        &self,
        activity_id: &str,
        draft: &ActivityDraft,
        now: NaiveDateTime,
    ) -> Result<Activity, ActivityError> {
        let current = self.get(activity_id)?;
        self.check_conflicts(&current.user_id, draft, Some(activity_id))?;

        let mut updated = Activity::from_draft(&current.user_id, draft);
        updated.id = current.id.clone();
        self.db.update_activity(&updated)?;
        if updated.title != current.title {
            let renamed = self
                .db
                .update_goal_titles_for_activity(&updated.id, &updated.title)?;
            log::debug!("renamed {} goal(s) to '{}'", renamed, updated.title);
        }
        self.schedule_alarms(&updated, now);
        Ok(updated)
    }

    /// Remove an activity, its goals and its alarms. Logs are kept as history.
    pub fn delete(&self, activity_id: &str) -> Result<(), ActivityError> {
        let activity = self.get(activity_id)?;
        if let Err(e) = self.alarms.cancel_all(&activity.id) {
            log::warn!("failed to cancel alarms for '{}': {}", activity.title, e);
        }
        self.db.delete_activity_with_goals(&activity.id)?;
        log::info!("deleted activity '{}'", activity.title);
        Ok(())
    }

    pub fn get(&self, activity_id: &str) -> Result<Activity, ActivityError> {
        self.db
            .get_activity(activity_id)?
            .ok_or_else(|| ActivityError::NotFound(activity_id.to_string()))
    }

    pub fn list(&self, user_id: &str) -> Result<Vec<Activity>, ActivityError> {
        Ok(self.db.get_activities_by_user(user_id)?)
    }

    /// Activities repeating on `date`'s weekday, each marked done if any
    /// completed log exists for that date
    pub fn for_date(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<ActivityWithStatus>, ActivityError> {
        let day = DayLabel::from_weekday(date.weekday());
        let logs = self.db.get_logs_for_user_on(user_id, date)?;
        Ok(self
            .db
            .get_activities_by_repeat_day(user_id, day)?
            .into_iter()
            .map(|activity| {
                let completed = logs
                    .iter()
                    .any(|l| l.activity_id == activity.id && l.completed);
                ActivityWithStatus {
                    activity,
                    completed,
                }
            })
            .collect())
    }

    /// Activities that have no goal of the given kind yet
    pub fn without_goal(
        &self,
        user_id: &str,
        kind: PeriodKind,
    ) -> Result<Vec<Activity>, ActivityError> {
        let headers = self.db.get_goal_headers(user_id, Some(kind))?;
        Ok(self
            .list(user_id)?
            .into_iter()
            .filter(|a| !headers.iter().any(|h| h.activity_id == a.id))
            .collect())
    }

    pub fn reschedule_all(&self, user_id: &str, now: NaiveDateTime) -> Result<usize, ActivityError> {
        let activities = self.list(user_id)?;
        match self.alarms.reschedule_all(&activities, now) {
            Ok(count) => Ok(count),
            Err(e) => {
                log::warn!("failed to reschedule alarms: {}", e);
                Ok(0)
            }
        }
    }

    pub fn add_type(&self, user_id: &str, name: &str) -> Result<ActivityType, ActivityError> {
        let name = validate_type_name(name)?;
        let exists = self
            .db
            .get_activity_types(user_id)?
            .iter()
            .any(|t| t.name.eq_ignore_ascii_case(name));
        if exists {
            return Err(ActivityError::DuplicateType(name.to_string()));
        }
        let mut activity_type = ActivityType::new(user_id.to_string(), name.to_string());
        activity_type.id = self.db.insert_activity_type(&activity_type)?;
        Ok(activity_type)
    }

    pub fn delete_type(&self, type_id: &str) -> Result<(), ActivityError> {
        if self.db.delete_activity_type(type_id)? == 0 {
            return Err(ActivityError::NotFound(type_id.to_string()));
        }
        Ok(())
    }

    pub fn list_types(&self, user_id: &str) -> Result<Vec<ActivityType>, ActivityError> {
        Ok(self.db.get_activity_types(user_id)?)
    }
}
