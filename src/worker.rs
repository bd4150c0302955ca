//! Deduplicated background refresh of goal details and statistics.

use chrono::NaiveDate;

use crate::database::Database;
use crate::goals::{GoalError, GoalService};
use crate::models::PeriodKind;
use crate::stats::StatsService;

pub fn refresh_key(user_id: &str) -> String {
    format!("goal-refresh:{}", user_id)
}

/// Pending refresh jobs keyed per user. Enqueuing a key that is already
/// pending is a no-op, so repeated triggers collapse into one run.
#[derive(Debug, Default)]
pub struct RefreshQueue {
    pending: Vec<(String, String)>,
}

/// What one refresh run changed for a user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub details_created: usize,
    pub goals_refreshed: usize,
    pub stats_written: usize,
}

impl RefreshQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when a job for this user was already waiting
    pub fn enqueue(&mut self, user_id: &str) -> bool {
        let key = refresh_key(user_id);
        if self.pending.iter().any(|(k, _)| *k == key) {
            log::debug!("{} already queued", key);
            return false;
        }
        self.pending.push((key, user_id.to_string()));
        true
    }

    pub fn pending(&self) -> Vec<&str> {
        self.pending.iter().map(|(k, _)| k.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Run and clear every queued job. A job that fails is dropped and the
    /// error returned; jobs after it stay queued.
    pub fn run_pending(
        &mut self,
        db: &Database,
        today: NaiveDate,
    ) -> Result<Vec<(String, RefreshReport)>, GoalError> {
        let mut done = Vec::new();
        while !self.pending.is_empty() {
            let (key, user_id) = self.pending.remove(0);
            let report = refresh_user(db, &user_id, today)?;
            log::info!(
                "{}: {} new details, {} goals, {} stats rows",
                key,
                report.details_created,
                report.goals_refreshed,
                report.stats_written
            );
            done.push((user_id, report));
        }
        Ok(done)
    }
}

fn refresh_user(db: &Database, user_id: &str, today: NaiveDate) -> Result<RefreshReport, GoalError> {
    let goals = GoalService::new(db);
    let details_created = goals.ensure_current_details(user_id, today)?;
    let goals_refreshed = goals.refresh(user_id, PeriodKind::Weekly, today)?.len()
        + goals.refresh(user_id, PeriodKind::Monthly, today)?.len();
    // stats failures are logged and skipped
    let stats_written = match StatsService::new(db).update_current(user_id, today) {
        Ok(n) => n,
        Err(e) => {
            log::warn!("stats refresh failed for {}: {}", user_id, e);
            0
        }
    };
    Ok(RefreshReport {
        details_created,
        goals_refreshed,
        stats_written,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Activity, ActivityDraft, DayLabel, PomodoroSettings};
    use chrono::NaiveTime;

    #[test]
    fn repeated_triggers_collapse() {
        let mut queue = RefreshQueue::new();
        assert!(queue.enqueue("u1"));
        assert!(!queue.enqueue("u1"));
        assert!(queue.enqueue("u2"));
        assert_eq!(queue.pending(), vec!["goal-refresh:u1", "goal-refresh:u2"]);
    }

    #[test]
    fn run_creates_details_and_drains_queue() {
        let db = Database::open_in_memory().unwrap();
        let draft = ActivityDraft {
            title: "Walk".to_string(),
            category: "Health".to_string(),
            start_time: NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(7, 30, 0).unwrap(),
            repeat_days: vec![DayLabel::Mon],
            pomodoro: PomodoroSettings::default(),
        };
        let mut activity = Activity::from_draft("u1", &draft);
        activity.id = db.insert_activity(&activity).unwrap();
        let first_week = NaiveDate::from_ymd_opt(2026, 10, 5).unwrap();
        GoalService::new(&db)
            .create(&activity, PeriodKind::Weekly, 1, 0, first_week)
            .unwrap();

        let mut queue = RefreshQueue::new();
        queue.enqueue("u1");
        let today = NaiveDate::from_ymd_opt(2026, 10, 14).unwrap();
        let done = queue.run_pending(&db, today).unwrap();

        assert!(queue.is_empty());
        assert_eq!(done.len(), 1);
        assert_eq!(
            done[0].1,
            RefreshReport {
                details_created: 1,
                goals_refreshed: 1,
                stats_written: 2,
            }
        );

        // an immediate second run has nothing new to open
        queue.enqueue("u1");
        let again = queue.run_pending(&db, today).unwrap();
        assert_eq!(again[0].1.details_created, 0);
    }
}
