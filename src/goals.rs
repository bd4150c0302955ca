use chrono::NaiveDate;
use thiserror::Error;

use crate::database::{Database, DatabaseError};
use crate::models::{Activity, GoalDetail, GoalHeader, GoalWithDetail, PeriodKind};
use crate::period::Period;
use crate::validation::{validate_target, ValidationError};

#[derive(Debug, Error)]
pub enum GoalError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("'{0}' already has a {1} goal")]
    AlreadyExists(String, PeriodKind),
    #[error("Goal not found: {0}")]
    NotFound(String),
    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),
}

/// Percentage of the target reached, clamped to 0..=100. A zero target reads as 0%.
pub fn progress_percent(target_secs: i64, current_secs: i64) -> f64 {
    if target_secs <= 0 {
        return 0.0;
    }
    (current_secs as f64 / target_secs as f64).clamp(0.0, 1.0) * 100.0
}

pub struct GoalService<'a> {
    db: &'a Database,
}

impl<'a> GoalService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    fn logged_secs(&self, activity_id: &str, period: &Period) -> Result<i64, GoalError> {
        Ok(self
            .db
            .get_logs_for_activity_in_range(activity_id, period.start, period.end)?
            .iter()
            .map(|l| l.duration_secs)
            .sum())
    }

    /// Start tracking `activity` with a target of `hours`:`minutes` per period
    pub fn create(
        &self,
        activity: &Activity,
        kind: PeriodKind,
        hours: i64,
        minutes: i64,
        today: NaiveDate,
    ) -> Result<GoalWithDetail, GoalError> {
        let target_secs = validate_target(hours, minutes)?;
        let existing = self.db.get_goal_headers_for_activity(&activity.id)?;
        if existing.iter().any(|h| h.kind == kind) {
            return Err(GoalError::AlreadyExists(activity.title.clone(), kind));
        }

        let period = Period::containing(kind, today);
        let current_secs = self.logged_secs(&activity.id, &period)?;
        let header = GoalHeader {
            id: String::new(),
            user_id: activity.user_id.clone(),
            title: activity.title.clone(),
            activity_id: activity.id.clone(),
            kind,
        };
        let detail = GoalDetail {
            id: String::new(),
            goal_id: String::new(),
            start_date: period.start,
            end_date: period.end,
            target_secs,
            current_secs,
            completed: GoalDetail::is_met(current_secs, target_secs),
        };
        let goal = self.db.insert_goal(&header, &detail)?;
        log::info!("created {} goal for '{}'", kind, activity.title);
        Ok(goal)
    }

    /// Recompute progress of every `kind` goal for the current period.
    /// Goals without a detail for this period are left out. Only changed
    /// details are written back.
    pub fn refresh(
        &self,
        user_id: &str,
        kind: PeriodKind,
        today: NaiveDate,
    ) -> Result<Vec<GoalWithDetail>, GoalError> {
        let period = Period::containing(kind, today);
        let mut goals = Vec::new();
        for header in self.db.get_goal_headers(user_id, Some(kind))? {
            let Some(mut detail) =
                self.db
                    .get_goal_detail_for_period(&header.id, period.start, period.end)?
            else {
                continue;
            };
            let current_secs = self.logged_secs(&header.activity_id, &period)?;
            let completed = GoalDetail::is_met(current_secs, detail.target_secs);
            if current_secs != detail.current_secs || completed != detail.completed {
                detail.current_secs = current_secs;
                detail.completed = completed;
                self.db.update_goal_detail(&detail)?;
            }
            goals.push(GoalWithDetail { header, detail });
        }
        Ok(goals)
    }

    /// Make sure every goal has a detail for the period containing `today`.
    /// New details inherit the target of the latest earlier detail, or 0.
    pub fn ensure_current_details(&self, user_id: &str, today: NaiveDate) -> Result<usize, GoalError> {
        let mut created = 0;
        for header in self.db.get_goal_headers(user_id, None)? {
            let period = Period::containing(header.kind, today);
            if self
                .db
                .get_goal_detail_for_period(&header.id, period.start, period.end)?
                .is_some()
            {
                continue;
            }
            let target_secs = self
                .db
                .get_latest_goal_detail_before(&header.id, period.start)?
                .map(|d| d.target_secs)
                .unwrap_or(0);
            let current_secs = self.logged_secs(&header.activity_id, &period)?;
            self.db.insert_goal_detail(&GoalDetail {
                id: String::new(),
                goal_id: header.id.clone(),
                start_date: period.start,
                end_date: period.end,
                target_secs,
                current_secs,
                completed: GoalDetail::is_met(current_secs, target_secs),
            })?;
            log::debug!("opened {} for goal '{}'", period.label(), header.title);
            created += 1;
        }
        Ok(created)
    }

    /// Goals of `kind` with their detail for the period containing `today`,
    /// opening missing details first
    pub fn list(
        &self,
        user_id: &str,
        kind: PeriodKind,
        today: NaiveDate,
    ) -> Result<Vec<GoalWithDetail>, GoalError> {
        self.ensure_current_details(user_id, today)?;
        self.refresh(user_id, kind, today)
    }

    /// Change the target of one period's detail
    pub fn set_target(&self, detail_id: &str, hours: i64, minutes: i64) -> Result<GoalDetail, GoalError> {
        let target_secs = validate_target(hours, minutes)?;
        let mut detail = self
            .db
            .get_goal_detail(detail_id)?
            .ok_or_else(|| GoalError::NotFound(detail_id.to_string()))?;
        detail.target_secs = target_secs;
        detail.completed = GoalDetail::is_met(detail.current_secs, target_secs);
        self.db.update_goal_detail(&detail)?;
        Ok(detail)
    }

    pub fn delete(&self, goal_id: &str) -> Result<(), GoalError> {
        if self.db.get_goal_header(goal_id)?.is_none() {
            return Err(GoalError::NotFound(goal_id.to_string()));
        }
        self.db.delete_goal_with_details(goal_id)?;
        Ok(())
    }

    pub fn history(&self, goal_id: &str) -> Result<Vec<GoalDetail>, GoalError> {
        Ok(self.db.get_goal_details(goal_id)?)
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
            title: "Piano".to_string(),
            category: "Music".to_string(),
            start_time: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
            repeat_days: vec![DayLabel::Mon, DayLabel::Thu],
            pomodoro: PomodoroSettings::default(),
        };
        let mut activity = Activity::from_draft("u1", &draft);
        activity.id = db.insert_activity(&activity).unwrap();
        (db, activity)
    }

    fn log_minutes(db: &Database, activity: &Activity, date: NaiveDate, minutes: i64) {
        let start = date.and_hms_opt(18, 0, 0).unwrap();
        LogService::new(db)
            .record(activity, start, start + Duration::minutes(minutes))
            .unwrap();
    }

    #[test]
    fn progress_is_clamped() {
        assert_eq!(progress_percent(0, 500), 0.0);
        assert_eq!(progress_percent(100, 50), 50.0);
        assert_eq!(progress_percent(100, 250), 100.0);
    }

    #[test]
    fn create_counts_existing_logs() {
        let (db, activity) = setup();
        log_minutes(&db, &activity, day(12), 40);
        log_minutes(&db, &activity, day(5), 90); // previous week

        let goal = GoalService::new(&db)
            .create(&activity, PeriodKind::Weekly, 1, 0, day(14))
            .unwrap();
        assert_eq!(goal.detail.start_date, day(12));
        assert_eq!(goal.detail.end_date, day(18));
        assert_eq!(goal.detail.target_secs, 3600);
        assert_eq!(goal.detail.current_secs, 40 * 60);
        assert!(!goal.detail.completed);
        assert_eq!(goal.header.title, "Piano");
    }

    #[test]
    fn create_rejects_second_goal_of_same_kind() {
        let (db, activity) = setup();
        let service = GoalService::new(&db);
        service.create(&activity, PeriodKind::Weekly, 1, 0, day(14)).unwrap();
        assert!(matches!(
            service.create(&activity, PeriodKind::Weekly, 2, 0, day(14)),
            Err(GoalError::AlreadyExists(_, PeriodKind::Weekly))
        ));
        service.create(&activity, PeriodKind::Monthly, 10, 0, day(14)).unwrap();
        assert!(matches!(
            service.create(&activity, PeriodKind::Monthly, 0, 0, day(14)),
            Err(GoalError::Invalid(ValidationError::EmptyTarget))
        ));
    }

    #[test]
    fn refresh_updates_progress_and_is_idempotent() {
        let (db, activity) = setup();
        let service = GoalService::new(&db);
        service.create(&activity, PeriodKind::Weekly, 1, 0, day(12)).unwrap();
        log_minutes(&db, &activity, day(15), 75);

        let first = service.refresh("u1", PeriodKind::Weekly, day(15)).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].detail.current_secs, 75 * 60);
        assert!(first[0].detail.completed);

        let second = service.refresh("u1", PeriodKind::Weekly, day(15)).unwrap();
        assert_eq!(second[0].detail, first[0].detail);
        assert!(service.refresh("u1", PeriodKind::Monthly, day(15)).unwrap().is_empty());
    }

    #[test]
    fn new_week_inherits_previous_target() {
        let (db, activity) = setup();
        let service = GoalService::new(&db);
        let goal = service.create(&activity, PeriodKind::Weekly, 2, 30, day(12)).unwrap();

        assert_eq!(service.ensure_current_details("u1", day(14)).unwrap(), 0);
        log_minutes(&db, &activity, day(19), 30);
        assert_eq!(service.ensure_current_details("u1", day(20)).unwrap(), 1);
        assert_eq!(service.ensure_current_details("u1", day(20)).unwrap(), 0);

        let history = service.history(&goal.header.id).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].start_date, day(19));
        assert_eq!(history[1].target_secs, 9000);
        assert_eq!(history[1].current_secs, 30 * 60);
    }

    #[test]
    fn zero_target_detail_counts_as_complete() {
        let (db, activity) = setup();
        let service = GoalService::new(&db);
        let goal = service.create(&activity, PeriodKind::Weekly, 1, 0, day(12)).unwrap();
        db.delete_goal_with_details(&goal.header.id).unwrap();

        // header without any earlier detail: target falls back to zero
        let header = GoalHeader {
            id: String::new(),
            user_id: "u1".to_string(),
            title: "Piano".to_string(),
            activity_id: activity.id.clone(),
            kind: PeriodKind::Monthly,
        };
        let seeded = db
            .insert_goal(
                &header,
                &GoalDetail {
                    id: String::new(),
                    goal_id: String::new(),
                    start_date: day(1) - Duration::days(365),
                    end_date: day(1) - Duration::days(335),
                    target_secs: 0,
                    current_secs: 0,
                    completed: true,
                },
            )
            .unwrap();
        service.ensure_current_details("u1", day(12)).unwrap();
        let current = db
            .get_goal_detail_for_period(&seeded.header.id, day(1), day(31))
            .unwrap()
            .unwrap();
        assert_eq!(current.target_secs, 0);
        assert!(current.completed);
    }

    #[test]
    fn list_splits_weekly_and_monthly_goals() {
        let (db, activity) = setup();
        let service = GoalService::new(&db);
        service.create(&activity, PeriodKind::Weekly, 1, 0, day(5)).unwrap();
        service.create(&activity, PeriodKind::Monthly, 8, 0, day(5)).unwrap();
        log_minutes(&db, &activity, day(13), 30);

        // a week later the weekly goal has no detail yet; list opens it
        let weekly = service.list("u1", PeriodKind::Weekly, day(14)).unwrap();
        assert_eq!(weekly.len(), 1);
        assert_eq!(weekly[0].header.kind, PeriodKind::Weekly);
        assert_eq!(weekly[0].detail.start_date, day(12));
        assert_eq!(weekly[0].detail.target_secs, 3600);
        assert_eq!(weekly[0].detail.current_secs, 30 * 60);

        let monthly = service.list("u1", PeriodKind::Monthly, day(14)).unwrap();
        assert_eq!(monthly.len(), 1);
        assert_eq!(monthly[0].header.kind, PeriodKind::Monthly);
        assert_eq!(monthly[0].detail.start_date, day(1));
        assert_eq!(monthly[0].detail.target_secs, 8 * 3600);
        assert_eq!(monthly[0].detail.current_secs, 30 * 60);
    }

    #[test]
    fn set_target_recomputes_completion() {
        let (db, activity) = setup();
        log_minutes(&db, &activity, day(12), 45);
        let service = GoalService::new(&db);
        let goal = service.create(&activity, PeriodKind::Weekly, 1, 0, day(12)).unwrap();
        assert!(!goal.detail.completed);

        let detail = service.set_target(&goal.detail.id, 0, 30).unwrap();
        assert_eq!(detail.target_secs, 1800);
        assert!(detail.completed);
        assert!(matches!(
            service.set_target(&goal.detail.id, 0, 75),
            Err(GoalError::Invalid(ValidationError::MinutesOutOfRange))
        ));
        assert!(matches!(
            service.set_target("missing", 1, 0),
            Err(GoalError::NotFound(_))
        ));
    }

    #[test]
    fn delete_removes_header_and_details() {
        let (db, activity) = setup();
        let service = GoalService::new(&db);
        let goal = service.create(&activity, PeriodKind::Weekly, 1, 0, day(12)).unwrap();
        service.delete(&goal.header.id).unwrap();
        assert!(service.history(&goal.header.id).unwrap().is_empty());
        assert!(matches!(service.delete(&goal.header.id), Err(GoalError::NotFound(_))));
    }
}
