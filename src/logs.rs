use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use std::collections::{BTreeMap, HashMap, HashSet};
use thiserror::Error;

use crate::database::{Database, DatabaseError};
use crate::models::{Activity, DayLabel, LogEntry, UNCATEGORIZED};
use crate::validation::{validate_log_window, ValidationError};

/// Shown for logs whose activity was deleted
pub const MISSING_TITLE: &str = "No Title";

#[derive(Debug, Error)]
pub enum LogError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),
}

/// Per-day roll-up shown on the statistics screen
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DaySummary {
    pub total_activities: usize,
    pub total_secs: i64,
    /// Hour of day (0-23) with the most logged time, if anything was logged
    pub peak_hour: Option<u32>,
    pub secs_by_category: BTreeMap<String, i64>,
}

pub struct LogService<'a> {
    db: &'a Database,
}

impl<'a> LogService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Record a completed session. The log is dated by its actual start and
    /// snapshots the activity's planned window.
    pub fn record(
        &self,
        activity: &Activity,
        actual_start: NaiveDateTime,
        actual_end: NaiveDateTime,
    ) -> Result<LogEntry, LogError> {
        let duration_secs = validate_log_window(actual_start, actual_end)?;
        let date = actual_start.date();
        let mut log = LogEntry {
            id: String::new(),
            activity_id: activity.id.clone(),
            user_id: activity.user_id.clone(),
            date,
            day_label: DayLabel::from_weekday(date.weekday()),
            start_time: activity.start_time,
            end_time: activity.end_time,
            actual_start,
            actual_end,
            duration_secs,
            completed: true,
            analyzed: false,
        };
        log.id = self.db.insert_log(&log)?;
        log::info!(
            "logged {}s for '{}' on {}",
            duration_secs,
            activity.title,
            date
        );
        Ok(log)
    }

    pub fn history(&self, activity_id: &str) -> Result<Vec<LogEntry>, LogError> {
        Ok(self.db.get_logs_for_activity(activity_id)?)
    }

    /// Logs of one day joined with their activity title
    pub fn for_day_with_titles(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<(LogEntry, String)>, LogError> {
        let titles: HashMap<String, String> = self
            .db
            .get_activities_by_user(user_id)?
            .into_iter()
            .map(|a| (a.id, a.title))
            .collect();
        Ok(self
            .db
            .get_logs_for_user_on(user_id, date)?
            .into_iter()
            .map(|log| {
                let title = titles
                    .get(&log.activity_id)
                    .cloned()
                    .unwrap_or_else(|| MISSING_TITLE.to_string());
                (log, title)
            })
            .collect())
    }

    pub fn daily_summary(&self, user_id: &str, date: NaiveDate) -> Result<DaySummary, LogError> {
        let activities = self.db.get_activities_by_user(user_id)?;
        let logs = self.db.get_logs_for_user_on(user_id, date)?;
        Ok(summarize_day(&logs, &activities))
    }
}

pub fn summarize_day(logs: &[LogEntry], activities: &[Activity]) -> DaySummary {
    let categories: HashMap<&str, &str> = activities
        .iter()
        .map(|a| (a.id.as_str(), a.category.as_str()))
        .collect();

    let mut by_hour: BTreeMap<u32, i64> = BTreeMap::new();
    let mut summary = DaySummary::default();
    let mut distinct = HashSet::new();

    for log in logs {
        distinct.insert(log.activity_id.as_str());
        summary.total_secs += log.duration_secs;
        *by_hour.entry(log.actual_start.hour()).or_default() += log.duration_secs;
        let category = categories
            .get(log.activity_id.as_str())
            .copied()
            .unwrap_or(UNCATEGORIZED);
        *summary
            .secs_by_category
            .entry(category.to_string())
            .or_default() += log.duration_secs;
    }

    summary.total_activities = distinct.len();
    // earliest hour wins ties
    summary.peak_hour = by_hour
        .iter()
        .fold(None::<(u32, i64)>, |best, (hour, secs)| match best {
            Some((_, best_secs)) if best_secs >= *secs => best,
            _ => Some((*hour, *secs)),
        })
        .map(|(hour, _)| hour);
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActivityDraft, PomodoroSettings};
    use chrono::NaiveTime;

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, d)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn insert_activity(db: &Database, title: &str, category: &str) -> Activity {
        let draft = ActivityDraft {
            title: title.to_string(),
            category: category.to_string(),
            start_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            repeat_days: vec![DayLabel::Mon],
            pomodoro: PomodoroSettings::default(),
        };
        let mut activity = Activity::from_draft("u1", &draft);
        activity.id = db.insert_activity(&activity).unwrap();
        activity
    }

    #[test]
    fn record_snapshots_plan_and_computes_duration() {
        let db = Database::open_in_memory().unwrap();
        let activity = insert_activity(&db, "Run", "Sport");
        let service = LogService::new(&db);

        let log = service.record(&activity, at(12, 8, 5), at(12, 8, 50)).unwrap();
        assert_eq!(log.duration_secs, 45 * 60);
        assert_eq!(log.day_label, DayLabel::Mon);
        assert_eq!(log.start_time, activity.start_time);
        assert!(log.completed);
        assert!(!log.analyzed);
        assert_eq!(service.history(&activity.id).unwrap(), vec![log]);
    }

    #[test]
    fn record_rejects_empty_or_reversed_windows() {
        let db = Database::open_in_memory().unwrap();
        let activity = insert_activity(&db, "Run", "Sport");
        let service = LogService::new(&db);
        assert!(matches!(
            service.record(&activity, at(12, 9, 0), at(12, 8, 0)),
            Err(LogError::Invalid(ValidationError::LogEndsBeforeStart))
        ));
        assert!(matches!(
            service.record(&activity, at(12, 9, 0), at(12, 9, 0)),
            Err(LogError::Invalid(ValidationError::EmptyLog))
        ));
    }

    #[test]
    fn day_view_falls_back_for_deleted_activity() {
        let db = Database::open_in_memory().unwrap();
        let run = insert_activity(&db, "Run", "Sport");
        let read = insert_activity(&db, "Read", "Study");
        let service = LogService::new(&db);
        service.record(&run, at(12, 7, 0), at(12, 7, 30)).unwrap();
        service.record(&read, at(12, 21, 0), at(12, 22, 0)).unwrap();
        db.delete_activity_with_goals(&read.id).unwrap();

        let rows = service
            .for_day_with_titles("u1", NaiveDate::from_ymd_opt(2026, 10, 12).unwrap())
            .unwrap();
        let titles: Vec<&str> = rows.iter().map(|(_, t)| t.as_str()).collect();
        assert_eq!(titles, vec!["Run", MISSING_TITLE]);
    }

    #[test]
    fn summary_finds_peak_hour_and_categories() {
        let db = Database::open_in_memory().unwrap();
        let run = insert_activity(&db, "Run", "Sport");
        let swim = insert_activity(&db, "Swim", "Sport");
        let read = insert_activity(&db, "Read", "Study");
        let service = LogService::new(&db);
        service.record(&run, at(12, 7, 0), at(12, 7, 30)).unwrap();
        service.record(&swim, at(12, 18, 0), at(12, 19, 0)).unwrap();
        service.record(&read, at(12, 21, 0), at(12, 21, 20)).unwrap();
        service.record(&run, at(13, 7, 0), at(13, 8, 0)).unwrap();

        let summary = service
            .daily_summary("u1", NaiveDate::from_ymd_opt(2026, 10, 12).unwrap())
            .unwrap();
        assert_eq!(summary.total_activities, 3);
        assert_eq!(summary.total_secs, (30 + 60 + 20) * 60);
        assert_eq!(summary.peak_hour, Some(18));
        assert_eq!(summary.secs_by_category["Sport"], 90 * 60);
        assert_eq!(summary.secs_by_category["Study"], 20 * 60);
    }

    #[test]
    fn summary_files_deleted_activity_under_other() {
        let db = Database::open_in_memory().unwrap();
        let read = insert_activity(&db, "Read", "Study");
        let service = LogService::new(&db);
        service.record(&read, at(12, 21, 0), at(12, 21, 40)).unwrap();
        db.delete_activity_with_goals(&read.id).unwrap();

        let summary = service
            .daily_summary("u1", NaiveDate::from_ymd_opt(2026, 10, 12).unwrap())
            .unwrap();
        assert_eq!(summary.secs_by_category[UNCATEGORIZED], 40 * 60);
        assert!(!summary.secs_by_category.contains_key(MISSING_TITLE));
    }

    #[test]
    fn empty_day_has_no_peak() {
        assert_eq!(summarize_day(&[], &[]), DaySummary::default());
    }
}
