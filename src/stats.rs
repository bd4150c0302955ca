use chrono::NaiveDate;
use std::collections::HashMap;
use thiserror::Error;

use crate::database::{Database, DatabaseError};
use crate::logs::MISSING_TITLE;
use crate::models::{Activity, PeriodKind, StatsModel, StatsStatus};
use crate::period::{aggregate, Period};

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),
}

/// A stats row joined with its activity title
#[derive(Debug, Clone)]
pub struct StatsRow {
    pub title: String,
    pub stats: StatsModel,
}

pub struct StatsService<'a> {
    db: &'a Database,
}

impl<'a> StatsService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    fn compute(
        &self,
        activity: &Activity,
        period: &Period,
        today: NaiveDate,
    ) -> Result<StatsModel, StatsError> {
        let logs = self
            .db
            .get_logs_for_activity_in_range(&activity.id, period.start, period.end)?;
        let counts = aggregate(&activity.repeat_days, &logs, period, today);
        Ok(StatsModel {
            id: String::new(),
            user_id: activity.user_id.clone(),
            activity_id: activity.id.clone(),
            kind: period.kind,
            label: period.label(),
            period_start: period.start,
            period_end: period.end,
            total_secs: counts.total_secs,
            completed_count: counts.completed,
            missed_count: counts.missed,
            pending_count: counts.pending,
            status: if today > period.end {
                StatsStatus::Closed
            } else {
                StatsStatus::Pending
            },
        })
    }

    /// Create or recompute the stats of every activity for `period`.
    /// Closed rows are final and skipped. Returns the number of rows written.
    pub fn update_for_period(
        &self,
        user_id: &str,
        period: &Period,
        today: NaiveDate,
    ) -> Result<usize, StatsError> {
        let mut written = 0;
        for activity in self.db.get_activities_by_user(user_id)? {
            let existing = self
                .db
                .get_stats_for_activity(&activity.id, period.kind, period.start)?;
            if matches!(&existing, Some(s) if s.status == StatsStatus::Closed) {
                continue;
            }
            let mut stats = self.compute(&activity, period, today)?;
            if let Some(previous) = existing {
                stats.id = previous.id;
            }
            self.db.save_stats(&stats)?;
            written += 1;
        }
        log::debug!("updated {} stats rows for {}", written, period.label());
        Ok(written)
    }

    /// Update the current week and month
    pub fn update_current(&self, user_id: &str, today: NaiveDate) -> Result<usize, StatsError> {
        let week = Period::containing(PeriodKind::Weekly, today);
        let month = Period::containing(PeriodKind::Monthly, today);
        Ok(self.update_for_period(user_id, &week, today)?
            + self.update_for_period(user_id, &month, today)?)
    }

    /// Stored rows for the period, most logged time first
    pub fn for_period(&self, user_id: &str, period: &Period) -> Result<Vec<StatsRow>, StatsError> {
        let titles: HashMap<String, String> = self
            .db
            .get_activities_by_user(user_id)?
            .into_iter()
            .map(|a| (a.id, a.title))
            .collect();
        Ok(self
            .db
            .get_stats_for_period(user_id, period.kind, period.start)?
            .into_iter()
            .map(|stats| StatsRow {
                title: titles
                    .get(&stats.activity_id)
                    .cloned()
                    .unwrap_or_else(|| MISSING_TITLE.to_string()),
                stats,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logs::LogService;
    use crate::models::{ActivityDraft, DayLabel, PomodoroSettings};
    use chrono::{Duration, NaiveTime};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    fn setup() -> (Database, Activity) {
        let db = Database::open_in_memory().unwrap();
        let draft = ActivityDraft {
            title: "Spanish".to_string(),
            category: "Study".to_string(),
            start_time: NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(20, 30, 0).unwrap(),
            repeat_days: vec![DayLabel::Mon, DayLabel::Wed],
            pomodoro: PomodoroSettings::default(),
        };
        let mut activity = Activity::from_draft("u1", &draft);
        activity.id = db.insert_activity(&activity).unwrap();
        (db, activity)
    }

    fn log(db: &Database, activity: &Activity, date: NaiveDate, minutes: i64) {
        let start = date.and_hms_opt(20, 0, 0).unwrap();
        LogService::new(db)
            .record(activity, start, start + Duration::minutes(minutes))
            .unwrap();
    }

    #[test]
    fn weekly_stats_follow_the_schedule() {
        let (db, activity) = setup();
        log(&db, &activity, day(12), 30);
        let service = StatsService::new(&db);
        let week = Period::week_containing(day(13));

        assert_eq!(service.update_for_period("u1", &week, day(13)).unwrap(), 1);
        let rows = service.for_period("u1", &week).unwrap();
        assert_eq!(rows.len(), 1);
        let stats = &rows[0].stats;
        assert_eq!(rows[0].title, "Spanish");
        assert_eq!(stats.label, "Week 12/10 - 18/10");
        assert_eq!(stats.completed_count, 1);
        assert_eq!(stats.missed_count, 1);
        assert_eq!(stats.pending_count, 1);
        assert_eq!(stats.total_secs, 1800);
        assert_eq!(stats.status, StatsStatus::Pending);
    }

    #[test]
    fn pending_rows_are_recomputed_in_place() {
        let (db, activity) = setup();
        let service = StatsService::new(&db);
        let week = Period::week_containing(day(13));
        service.update_for_period("u1", &week, day(13)).unwrap();
        log(&db, &activity, day(14), 25);
        service.update_for_period("u1", &week, day(14)).unwrap();

        let rows = service.for_period("u1", &week).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].stats.completed_count, 1);
        assert_eq!(rows[0].stats.pending_count, 0);
    }

    #[test]
    fn closed_rows_are_not_recomputed() {
        let (db, activity) = setup();
        let service = StatsService::new(&db);
        let week = Period::week_containing(day(13));

        service.update_for_period("u1", &week, day(20)).unwrap();
        let closed = service.for_period("u1", &week).unwrap()[0].stats.clone();
        assert_eq!(closed.status, StatsStatus::Closed);
        assert_eq!(closed.pending_count, 0);
        assert_eq!(closed.missed_count, 2);

        // a late log for that week does not reopen the row
        log(&db, &activity, day(14), 30);
        assert_eq!(service.update_for_period("u1", &week, day(21)).unwrap(), 0);
        assert_eq!(service.for_period("u1", &week).unwrap()[0].stats, closed);
    }

    #[test]
    fn update_current_writes_week_and_month() {
        let (db, _) = setup();
        let service = StatsService::new(&db);
        assert_eq!(service.update_current("u1", day(13)).unwrap(), 2);
        let month = Period::month_containing(day(13));
        let rows = service.for_period("u1", &month).unwrap();
        assert_eq!(rows[0].stats.label, "Month 10/2026");
    }
}
