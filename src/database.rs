use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row};
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

use crate::models::{
    Activity, ActivityType, DayLabel, GoalDetail, GoalHeader, GoalWithDetail, LogEntry,
    PeriodKind, PomodoroSettings, StatsModel, Suggestion, SuggestionStatus, User,
};

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),
    #[error("Failed to create database directory: {0}")]
    DirectoryError(String),
    #[error("Failed to encode column value: {0}")]
    EncodeError(#[from] serde_json::Error),
}

/// A scheduled reminder row, keyed by its alarm key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmRow {
    pub key: i32,
    pub activity_id: String,
    pub day: DayLabel,
    pub trigger_at: NaiveDateTime,
    pub title: String,
    pub body: String,
}

pub struct Database {
    conn: Connection,
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Read a TEXT column and parse it into one of the label enums
fn parse_label<T>(row: &Row, idx: usize) -> Result<T, rusqlite::Error>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let text: String = row.get(idx)?;
    text.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_days(row: &Row, idx: usize) -> Result<Vec<DayLabel>, rusqlite::Error> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

const ACTIVITY_COLUMNS: &str = "id, user_id, title, category, start_time, end_time, repeat_days,
     pomodoro_enabled, focus_minutes, break_minutes";

const LOG_COLUMNS: &str = "id, activity_id, user_id, date, day_label, start_time, end_time,
     actual_start, actual_end, duration_secs, completed, analyzed";

const GOAL_DETAIL_COLUMNS: &str =
    "id, goal_id, start_date, end_date, target_secs, current_secs, completed";

const STATS_COLUMNS: &str = "id, user_id, activity_id, kind, label, period_start, period_end,
     total_secs, completed_count, missed_count, pending_count, status";

const SUGGESTION_COLUMNS: &str = "id, user_id, activity_id, activity_title, current_start,
     current_end, suggested_start, suggested_end, reason, requested_at, status";

impl Database {
    /// Open (or create) the database file and initialize the schema
    pub fn new(path: &str) -> Result<Self, DatabaseError> {
        let db_path = PathBuf::from(path);

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| DatabaseError::DirectoryError(e.to_string()))?;
            }
        }

        let conn = Connection::open(&db_path)?;
        let db = Database { conn };
        db.initialize_schema()?;

        Ok(db)
    }

    /// Open a throwaway in-memory database with the full schema
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        let db = Database {
            conn: Connection::open_in_memory()?,
        };
        db.initialize_schema()?;
        Ok(db)
    }

    fn initialize_schema(&self) -> Result<(), DatabaseError> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS users (
                id              TEXT PRIMARY KEY,
                email           TEXT NOT NULL UNIQUE,
                display_name    TEXT,
                created_at      TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS activities (
                id                  TEXT PRIMARY KEY,
                user_id             TEXT NOT NULL,
                title               TEXT NOT NULL,
                category            TEXT NOT NULL,
                start_time          TEXT NOT NULL,
                end_time            TEXT NOT NULL,
                repeat_days         TEXT NOT NULL,
                pomodoro_enabled    INTEGER NOT NULL DEFAULT 0,
                focus_minutes       INTEGER NOT NULL DEFAULT 0,
                break_minutes       INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS activity_types (
                id              TEXT PRIMARY KEY,
                user_id         TEXT NOT NULL,
                name            TEXT NOT NULL,
                created_at      TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS log_times (
                id              TEXT PRIMARY KEY,
                activity_id     TEXT NOT NULL,
                user_id         TEXT NOT NULL,
                date            TEXT NOT NULL,
                day_label       TEXT NOT NULL,
                start_time      TEXT NOT NULL,
                end_time        TEXT NOT NULL,
                actual_start    TEXT NOT NULL,
                actual_end      TEXT NOT NULL,
                duration_secs   INTEGER NOT NULL,
                completed       INTEGER NOT NULL DEFAULT 0,
                analyzed        INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS goal_headers (
                id              TEXT PRIMARY KEY,
                user_id         TEXT NOT NULL,
                title           TEXT NOT NULL,
                activity_id     TEXT NOT NULL,
                kind            TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS goal_details (
                id              TEXT PRIMARY KEY,
                goal_id         TEXT NOT NULL,
                start_date      TEXT NOT NULL,
                end_date        TEXT NOT NULL,
                target_secs     INTEGER NOT NULL,
                current_secs    INTEGER NOT NULL,
                completed       INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS stats (
                id              TEXT PRIMARY KEY,
                user_id         TEXT NOT NULL,
                activity_id     TEXT NOT NULL,
                kind            TEXT NOT NULL,
                label           TEXT NOT NULL,
                period_start    TEXT NOT NULL,
                period_end      TEXT NOT NULL,
                total_secs      INTEGER NOT NULL,
                completed_count INTEGER NOT NULL,
                missed_count    INTEGER NOT NULL,
                pending_count   INTEGER NOT NULL,
                status          TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS suggestions (
                id              TEXT PRIMARY KEY,
                user_id         TEXT NOT NULL,
                activity_id     TEXT NOT NULL,
                activity_title  TEXT NOT NULL,
                current_start   TEXT NOT NULL,
                current_end     TEXT NOT NULL,
                suggested_start TEXT NOT NULL,
                suggested_end   TEXT NOT NULL,
                reason          TEXT NOT NULL,
                requested_at    TEXT NOT NULL,
                status          TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS alarms (
                key             INTEGER PRIMARY KEY,
                activity_id     TEXT NOT NULL,
                day_label       TEXT NOT NULL,
                trigger_at      TEXT NOT NULL,
                title           TEXT NOT NULL,
                body            TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_activities_user ON activities(user_id);
            CREATE INDEX IF NOT EXISTS idx_log_times_activity_date ON log_times(activity_id, date);
            CREATE INDEX IF NOT EXISTS idx_log_times_user_date ON log_times(user_id, date);
            CREATE INDEX IF NOT EXISTS idx_goal_headers_activity ON goal_headers(activity_id);
            CREATE INDEX IF NOT EXISTS idx_goal_details_goal ON goal_details(goal_id, start_date);
            CREATE INDEX IF NOT EXISTS idx_stats_activity_period ON stats(activity_id, kind, period_start);
            CREATE INDEX IF NOT EXISTS idx_suggestions_user_status ON suggestions(user_id, status);
            CREATE INDEX IF NOT EXISTS idx_alarms_trigger ON alarms(trigger_at);",
        )?;
        Ok(())
    }

    // ---- users ----

    pub fn insert_user(&self, user: &User) -> Result<String, DatabaseError> {
        let id = new_id();
        self.conn.execute(
            "INSERT INTO users (id, email, display_name, created_at) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![id, user.email, user.display_name, user.created_at],
        )?;
        Ok(id)
    }

    fn row_to_user(row: &Row) -> Result<User, rusqlite::Error> {
        Ok(User {
            id: row.get(0)?,
            email: row.get(1)?,
            display_name: row.get(2)?,
            created_at: row.get(3)?,
        })
    }

    pub fn get_user(&self, id: &str) -> Result<Option<User>, DatabaseError> {
        self.conn
            .query_row(
                "SELECT id, email, display_name, created_at FROM users WHERE id = ?1 OR email = ?1",
                rusqlite::params![id],
                Self::row_to_user,
            )
            .optional()
            .map_err(DatabaseError::from)
    }

    pub fn get_users(&self) -> Result<Vec<User>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, email, display_name, created_at FROM users ORDER BY created_at")?;
        let users = stmt
            .query_map([], Self::row_to_user)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    // ---- activities ----

    fn row_to_activity(row: &Row) -> Result<Activity, rusqlite::Error> {
        Ok(Activity {
            id: row.get(0)?,
            user_id: row.get(1)?,
            title: row.get(2)?,
            category: row.get(3)?,
            start_time: row.get(4)?,
            end_time: row.get(5)?,
            repeat_days: parse_days(row, 6)?,
            pomodoro: PomodoroSettings {
                enabled: row.get(7)?,
                focus_minutes: row.get(8)?,
                break_minutes: row.get(9)?,
            },
        })
    }

    pub fn insert_activity(&self, activity: &Activity) -> Result<String, DatabaseError> {
        let id = new_id();
        let days = serde_json::to_string(&activity.repeat_days)?;
        self.conn.execute(
            "INSERT INTO activities (id, user_id, title, category, start_time, end_time, repeat_days,
                                     pomodoro_enabled, focus_minutes, break_minutes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            rusqlite::params![
                id,
                activity.user_id,
                activity.title,
                activity.category,
                activity.start_time,
                activity.end_time,
                days,
                activity.pomodoro.enabled,
                activity.pomodoro.focus_minutes,
                activity.pomodoro.break_minutes
            ],
        )?;
        Ok(id)
    }

    pub fn get_activity(&self, id: &str) -> Result<Option<Activity>, DatabaseError> {
        let sql = format!("SELECT {ACTIVITY_COLUMNS} FROM activities WHERE id = ?1");
        self.conn
            .query_row(&sql, rusqlite::params![id], Self::row_to_activity)
            .optional()
            .map_err(DatabaseError::from)
    }

    /// All activities for a user, ordered by planned start time
    pub fn get_activities_by_user(&self, user_id: &str) -> Result<Vec<Activity>, DatabaseError> {
        let sql = format!(
            "SELECT {ACTIVITY_COLUMNS} FROM activities WHERE user_id = ?1 ORDER BY start_time, title"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let activities = stmt
            .query_map(rusqlite::params![user_id], Self::row_to_activity)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(activities)
    }

    pub fn get_activities_by_repeat_day(
        &self,
        user_id: &str,
        day: DayLabel,
    ) -> Result<Vec<Activity>, DatabaseError> {
        Ok(self
            .get_activities_by_user(user_id)?
            .into_iter()
            .filter(|a| a.repeats_on(day))
            .collect())
    }

    pub fn update_activity(&self, activity: &Activity) -> Result<(), DatabaseError> {
        let days = serde_json::to_string(&activity.repeat_days)?;
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "UPDATE activities SET title = ?1, category = ?2, start_time = ?3, end_time = ?4,
             repeat_days = ?5, pomodoro_enabled = ?6, focus_minutes = ?7, break_minutes = ?8
             WHERE id = ?9",
            rusqlite::params![
                activity.title,
                activity.category,
                activity.start_time,
                activity.end_time,
                days,
                activity.pomodoro.enabled,
                activity.pomodoro.focus_minutes,
                activity.pomodoro.break_minutes,
                activity.id
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Delete an activity together with every goal header (and its details) tracking it
    pub fn delete_activity_with_goals(&self, activity_id: &str) -> Result<(), DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM goal_details WHERE goal_id IN
                (SELECT id FROM goal_headers WHERE activity_id = ?1)",
            rusqlite::params![activity_id],
        )?;
        tx.execute(
            "DELETE FROM goal_headers WHERE activity_id = ?1",
            rusqlite::params![activity_id],
        )?;
        tx.execute(
            "DELETE FROM activities WHERE id = ?1",
            rusqlite::params![activity_id],
        )?;
        tx.commit()?;
        Ok(())
    }

    // ---- activity types ----

    pub fn insert_activity_type(&self, activity_type: &ActivityType) -> Result<String, DatabaseError> {
        let id = new_id();
        self.conn.execute(
            "INSERT INTO activity_types (id, user_id, name, created_at) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
                id,
                activity_type.user_id,
                activity_type.name,
                activity_type.created_at
            ],
        )?;
        Ok(id)
    }

    pub fn get_activity_types(&self, user_id: &str) -> Result<Vec<ActivityType>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, name, created_at FROM activity_types
             WHERE user_id = ?1 ORDER BY name COLLATE NOCASE",
        )?;
        let types = stmt
            .query_map(rusqlite::params![user_id], |row| {
                Ok(ActivityType {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    name: row.get(2)?,
                    created_at: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(types)
    }

    /// Returns the number of deleted rows
    pub fn delete_activity_type(&self, id: &str) -> Result<usize, DatabaseError> {
        Ok(self
            .conn
            .execute("DELETE FROM activity_types WHERE id = ?1", rusqlite::params![id])?)
    }

    // ---- log times ----

    fn row_to_log(row: &Row) -> Result<LogEntry, rusqlite::Error> {
        Ok(LogEntry {
            id: row.get(0)?,
            activity_id: row.get(1)?,
            user_id: row.get(2)?,
            date: row.get(3)?,
            day_label: parse_label(row, 4)?,
            start_time: row.get(5)?,
            end_time: row.get(6)?,
            actual_start: row.get(7)?,
            actual_end: row.get(8)?,
            duration_secs: row.get(9)?,
            completed: row.get(10)?,
            analyzed: row.get(11)?,
        })
    }

    fn query_logs(
        &self,
        filter: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<LogEntry>, DatabaseError> {
        let sql = format!("SELECT {LOG_COLUMNS} FROM log_times WHERE {filter}");
        let mut stmt = self.conn.prepare(&sql)?;
        let logs = stmt
            .query_map(params, Self::row_to_log)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(logs)
    }

    pub fn insert_log(&self, log: &LogEntry) -> Result<String, DatabaseError> {
        let id = new_id();
        self.conn.execute(
            "INSERT INTO log_times (id, activity_id, user_id, date, day_label, start_time, end_time,
                                    actual_start, actual_end, duration_secs, completed, analyzed)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            rusqlite::params![
                id,
                log.activity_id,
                log.user_id,
                log.date,
                log.day_label.as_str(),
                log.start_time,
                log.end_time,
                log.actual_start,
                log.actual_end,
                log.duration_secs,
                log.completed,
                log.analyzed
            ],
        )?;
        Ok(id)
    }

    /// Logs of one activity whose date falls in `[start, end]`
    pub fn get_logs_for_activity_in_range(
        &self,
        activity_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<LogEntry>, DatabaseError> {
        self.query_logs(
            "activity_id = ?1 AND date >= ?2 AND date <= ?3 ORDER BY actual_start",
            rusqlite::params![activity_id, start, end],
        )
    }

    pub fn get_logs_for_user_on(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<LogEntry>, DatabaseError> {
        self.query_logs(
            "user_id = ?1 AND date = ?2 ORDER BY actual_start",
            rusqlite::params![user_id, date],
        )
    }

    pub fn get_logs_for_activity(&self, activity_id: &str) -> Result<Vec<LogEntry>, DatabaseError> {
        self.query_logs(
            "activity_id = ?1 ORDER BY actual_start",
            rusqlite::params![activity_id],
        )
    }

    pub fn get_unanalyzed_logs(&self, user_id: &str) -> Result<Vec<LogEntry>, DatabaseError> {
        self.query_logs(
            "user_id = ?1 AND analyzed = 0 ORDER BY actual_start",
            rusqlite::params![user_id],
        )
    }

    pub fn mark_logs_analyzed(&self, log_ids: &[String]) -> Result<(), DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        for id in log_ids {
            tx.execute(
                "UPDATE log_times SET analyzed = 1 WHERE id = ?1",
                rusqlite::params![id],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    // ---- goals ----

    fn row_to_goal_header(row: &Row) -> Result<GoalHeader, rusqlite::Error> {
        Ok(GoalHeader {
            id: row.get(0)?,
            user_id: row.get(1)?,
            title: row.get(2)?,
            activity_id: row.get(3)?,
            kind: parse_label(row, 4)?,
        })
    }

    fn row_to_goal_detail(row: &Row) -> Result<GoalDetail, rusqlite::Error> {
        Ok(GoalDetail {
            id: row.get(0)?,
            goal_id: row.get(1)?,
            start_date: row.get(2)?,
            end_date: row.get(3)?,
            target_secs: row.get(4)?,
            current_secs: row.get(5)?,
            completed: row.get(6)?,
        })
    }

    /// Insert a goal header and its first period detail atomically
    pub fn insert_goal(
        &self,
        header: &GoalHeader,
        detail: &GoalDetail,
    ) -> Result<GoalWithDetail, DatabaseError> {
        let header_id = new_id();
        let detail_id = new_id();
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO goal_headers (id, user_id, title, activity_id, kind) VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                header_id,
                header.user_id,
                header.title,
                header.activity_id,
                header.kind.as_str()
            ],
        )?;
        tx.execute(
            "INSERT INTO goal_details (id, goal_id, start_date, end_date, target_secs, current_secs, completed)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                detail_id,
                header_id,
                detail.start_date,
                detail.end_date,
                detail.target_secs,
                detail.current_secs,
                detail.completed
            ],
        )?;
        tx.commit()?;

        Ok(GoalWithDetail {
            header: GoalHeader {
                id: header_id.clone(),
                ..header.clone()
            },
            detail: GoalDetail {
                id: detail_id,
                goal_id: header_id,
                ..detail.clone()
            },
        })
    }

    pub fn get_goal_headers(
        &self,
        user_id: &str,
        kind: Option<PeriodKind>,
    ) -> Result<Vec<GoalHeader>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, title, activity_id, kind FROM goal_headers
             WHERE user_id = ?1 AND (?2 IS NULL OR kind = ?2) ORDER BY title COLLATE NOCASE",
        )?;
        let headers = stmt
            .query_map(
                rusqlite::params![user_id, kind.map(|k| k.as_str())],
                Self::row_to_goal_header,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(headers)
    }

    pub fn get_goal_header(&self, id: &str) -> Result<Option<GoalHeader>, DatabaseError> {
        self.conn
            .query_row(
                "SELECT id, user_id, title, activity_id, kind FROM goal_headers WHERE id = ?1",
                rusqlite::params![id],
                Self::row_to_goal_header,
            )
            .optional()
            .map_err(DatabaseError::from)
    }

    pub fn get_goal_headers_for_activity(
        &self,
        activity_id: &str,
    ) -> Result<Vec<GoalHeader>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, title, activity_id, kind FROM goal_headers WHERE activity_id = ?1",
        )?;
        let headers = stmt
            .query_map(rusqlite::params![activity_id], Self::row_to_goal_header)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(headers)
    }

    /// Keep goal titles in step with a renamed activity
    pub fn update_goal_titles_for_activity(
        &self,
        activity_id: &str,
        title: &str,
    ) -> Result<usize, DatabaseError> {
        Ok(self.conn.execute(
            "UPDATE goal_headers SET title = ?1 WHERE activity_id = ?2",
            rusqlite::params![title, activity_id],
        )?)
    }

    pub fn delete_goal_with_details(&self, goal_id: &str) -> Result<(), DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM goal_details WHERE goal_id = ?1",
            rusqlite::params![goal_id],
        )?;
        tx.execute(
            "DELETE FROM goal_headers WHERE id = ?1",
            rusqlite::params![goal_id],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn insert_goal_detail(&self, detail: &GoalDetail) -> Result<String, DatabaseError> {
        let id = new_id();
        self.conn.execute(
            "INSERT INTO goal_details (id, goal_id, start_date, end_date, target_secs, current_secs, completed)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                id,
                detail.goal_id,
                detail.start_date,
                detail.end_date,
                detail.target_secs,
                detail.current_secs,
                detail.completed
            ],
        )?;
        Ok(id)
    }

    pub fn get_goal_detail(&self, id: &str) -> Result<Option<GoalDetail>, DatabaseError> {
        let sql = format!("SELECT {GOAL_DETAIL_COLUMNS} FROM goal_details WHERE id = ?1");
        self.conn
            .query_row(&sql, rusqlite::params![id], Self::row_to_goal_detail)
            .optional()
            .map_err(DatabaseError::from)
    }

    /// The detail covering `[start, end]` for a goal, if one was created
    pub fn get_goal_detail_for_period(
        &self,
        goal_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<GoalDetail>, DatabaseError> {
        let sql = format!(
            "SELECT {GOAL_DETAIL_COLUMNS} FROM goal_details
             WHERE goal_id = ?1 AND start_date >= ?2 AND end_date <= ?3
             ORDER BY start_date LIMIT 1"
        );
        self.conn
            .query_row(&sql, rusqlite::params![goal_id, start, end], Self::row_to_goal_detail)
            .optional()
            .map_err(DatabaseError::from)
    }

    /// Most recent detail that ended before `before`
    pub fn get_latest_goal_detail_before(
        &self,
        goal_id: &str,
        before: NaiveDate,
    ) -> Result<Option<GoalDetail>, DatabaseError> {
        let sql = format!(
            "SELECT {GOAL_DETAIL_COLUMNS} FROM goal_details
             WHERE goal_id = ?1 AND end_date < ?2
             ORDER BY end_date DESC LIMIT 1"
        );
        self.conn
            .query_row(&sql, rusqlite::params![goal_id, before], Self::row_to_goal_detail)
            .optional()
            .map_err(DatabaseError::from)
    }

    pub fn get_goal_details(&self, goal_id: &str) -> Result<Vec<GoalDetail>, DatabaseError> {
        let sql = format!(
            "SELECT {GOAL_DETAIL_COLUMNS} FROM goal_details WHERE goal_id = ?1 ORDER BY start_date"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let details = stmt
            .query_map(rusqlite::params![goal_id], Self::row_to_goal_detail)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(details)
    }

    pub fn update_goal_detail(&self, detail: &GoalDetail) -> Result<(), DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "UPDATE goal_details SET target_secs = ?1, current_secs = ?2, completed = ?3 WHERE id = ?4",
            rusqlite::params![
                detail.target_secs,
                detail.current_secs,
                detail.completed,
                detail.id
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    // ---- stats ----

    fn row_to_stats(row: &Row) -> Result<StatsModel, rusqlite::Error> {
        Ok(StatsModel {
            id: row.get(0)?,
            user_id: row.get(1)?,
            activity_id: row.get(2)?,
            kind: parse_label(row, 3)?,
            label: row.get(4)?,
            period_start: row.get(5)?,
            period_end: row.get(6)?,
            total_secs: row.get(7)?,
            completed_count: row.get(8)?,
            missed_count: row.get(9)?,
            pending_count: row.get(10)?,
            status: parse_label(row, 11)?,
        })
    }

    pub fn get_stats_for_activity(
        &self,
        activity_id: &str,
        kind: PeriodKind,
        start: NaiveDate,
    ) -> Result<Option<StatsModel>, DatabaseError> {
        let sql = format!(
            "SELECT {STATS_COLUMNS} FROM stats
             WHERE activity_id = ?1 AND kind = ?2 AND period_start = ?3 LIMIT 1"
        );
        self.conn
            .query_row(
                &sql,
                rusqlite::params![activity_id, kind.as_str(), start],
                Self::row_to_stats,
            )
            .optional()
            .map_err(DatabaseError::from)
    }

    pub fn get_stats_for_period(
        &self,
        user_id: &str,
        kind: PeriodKind,
        start: NaiveDate,
    ) -> Result<Vec<StatsModel>, DatabaseError> {
        let sql = format!(
            "SELECT {STATS_COLUMNS} FROM stats
             WHERE user_id = ?1 AND kind = ?2 AND period_start = ?3
             ORDER BY total_secs DESC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(rusqlite::params![user_id, kind.as_str(), start], Self::row_to_stats)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Insert when `stats.id` is empty, otherwise overwrite the existing row. Returns the id.
    pub fn save_stats(&self, stats: &StatsModel) -> Result<String, DatabaseError> {
        let id = if stats.id.is_empty() {
            new_id()
        } else {
            stats.id.clone()
        };
        self.conn.execute(
            "INSERT OR REPLACE INTO stats (id, user_id, activity_id, kind, label, period_start, period_end,
                                           total_secs, completed_count, missed_count, pending_count, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            rusqlite::params![
                id,
                stats.user_id,
                stats.activity_id,
                stats.kind.as_str(),
                stats.label,
                stats.period_start,
                stats.period_end,
                stats.total_secs,
                stats.completed_count,
                stats.missed_count,
                stats.pending_count,
                stats.status.as_str()
            ],
        )?;
        Ok(id)
    }

    // ---- suggestions ----

    fn row_to_suggestion(row: &Row) -> Result<Suggestion, rusqlite::Error> {
        Ok(Suggestion {
            id: row.get(0)?,
            user_id: row.get(1)?,
            activity_id: row.get(2)?,
            activity_title: row.get(3)?,
            current_start: row.get(4)?,
            current_end: row.get(5)?,
            suggested_start: row.get(6)?,
            suggested_end: row.get(7)?,
            reason: row.get(8)?,
            requested_at: row.get(9)?,
            status: parse_label(row, 10)?,
        })
    }

    /// Persist a suggestion and flag the logs it was derived from, in one transaction
    pub fn save_suggestion_and_mark_analyzed(
        &self,
        suggestion: &Suggestion,
        log_ids: &[String],
    ) -> Result<String, DatabaseError> {
        let id = new_id();
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO suggestions (id, user_id, activity_id, activity_title, current_start, current_end,
                                      suggested_start, suggested_end, reason, requested_at, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            rusqlite::params![
                id,
                suggestion.user_id,
                suggestion.activity_id,
                suggestion.activity_title,
                suggestion.current_start,
                suggestion.current_end,
                suggestion.suggested_start,
                suggestion.suggested_end,
                suggestion.reason,
                suggestion.requested_at,
                suggestion.status.as_str()
            ],
        )?;
        for log_id in log_ids {
            tx.execute(
                "UPDATE log_times SET analyzed = 1 WHERE id = ?1",
                rusqlite::params![log_id],
            )?;
        }
        tx.commit()?;
        Ok(id)
    }

    pub fn get_suggestion(&self, id: &str) -> Result<Option<Suggestion>, DatabaseError> {
        let sql = format!("SELECT {SUGGESTION_COLUMNS} FROM suggestions WHERE id = ?1");
        self.conn
            .query_row(&sql, rusqlite::params![id], Self::row_to_suggestion)
            .optional()
            .map_err(DatabaseError::from)
    }

    pub fn get_suggestions_by_status(
        &self,
        user_id: &str,
        status: SuggestionStatus,
    ) -> Result<Vec<Suggestion>, DatabaseError> {
        let sql = format!(
            "SELECT {SUGGESTION_COLUMNS} FROM suggestions
             WHERE user_id = ?1 AND status = ?2 ORDER BY rowid DESC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(rusqlite::params![user_id, status.as_str()], Self::row_to_suggestion)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Move the suggested activity to its new window and mark the suggestion
    /// applied, in one transaction
    pub fn apply_suggestion_window(
        &self,
        suggestion_id: &str,
        activity_id: &str,
        start: NaiveTime,
        end: NaiveTime,
    ) -> Result<(), DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "UPDATE activities SET start_time = ?1, end_time = ?2 WHERE id = ?3",
            rusqlite::params![start, end, activity_id],
        )?;
        tx.execute(
            "UPDATE suggestions SET status = ?1 WHERE id = ?2",
            rusqlite::params![SuggestionStatus::Applied.as_str(), suggestion_id],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn update_suggestion_status(
        &self,
        id: &str,
        status: SuggestionStatus,
    ) -> Result<(), DatabaseError> {
        self.conn.execute(
            "UPDATE suggestions SET status = ?1 WHERE id = ?2",
            rusqlite::params![status.as_str(), id],
        )?;
        Ok(())
    }

    // ---- alarms ----

    fn row_to_alarm(row: &Row) -> Result<AlarmRow, rusqlite::Error> {
        Ok(AlarmRow {
            key: row.get(0)?,
            activity_id: row.get(1)?,
            day: parse_label(row, 2)?,
            trigger_at: row.get(3)?,
            title: row.get(4)?,
            body: row.get(5)?,
        })
    }

    /// Insert or replace the alarm stored under `alarm.key`
    pub fn upsert_alarm(&self, alarm: &AlarmRow) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO alarms (key, activity_id, day_label, trigger_at, title, body)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                alarm.key,
                alarm.activity_id,
                alarm.day.as_str(),
                alarm.trigger_at,
                alarm.title,
                alarm.body
            ],
        )?;
        Ok(())
    }

    pub fn delete_alarm(&self, key: i32) -> Result<(), DatabaseError> {
        self.conn
            .execute("DELETE FROM alarms WHERE key = ?1", rusqlite::params![key])?;
        Ok(())
    }

    pub fn get_alarms(&self) -> Result<Vec<AlarmRow>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT key, activity_id, day_label, trigger_at, title, body FROM alarms ORDER BY trigger_at",
        )?;
        let alarms = stmt
            .query_map([], Self::row_to_alarm)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(alarms)
    }

    pub fn get_due_alarms(&self, now: NaiveDateTime) -> Result<Vec<AlarmRow>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT key, activity_id, day_label, trigger_at, title, body FROM alarms
             WHERE trigger_at <= ?1 ORDER BY trigger_at",
        )?;
        let alarms = stmt
            .query_map(rusqlite::params![now], Self::row_to_alarm)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(alarms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActivityDraft, StatsStatus};

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn draft(title: &str) -> ActivityDraft {
        ActivityDraft {
            title: title.to_string(),
            category: "Study".to_string(),
            start_time: time(8, 0),
            end_time: time(9, 0),
            repeat_days: vec![DayLabel::Mon, DayLabel::Wed],
            pomodoro: PomodoroSettings::default(),
        }
    }

    fn insert(db: &Database, title: &str) -> Activity {
        let mut activity = Activity::from_draft("u1", &draft(title));
        activity.id = db.insert_activity(&activity).unwrap();
        activity
    }

    #[test]
    fn activity_round_trips_through_sqlite() {
        let db = Database::open_in_memory().unwrap();
        let activity = insert(&db, "Math");
        let loaded = db.get_activity(&activity.id).unwrap().unwrap();
        assert_eq!(loaded, activity);
        assert_eq!(db.get_activities_by_repeat_day("u1", DayLabel::Wed).unwrap().len(), 1);
        assert!(db.get_activities_by_repeat_day("u1", DayLabel::Tue).unwrap().is_empty());
    }

    #[test]
    fn deleting_activity_removes_its_goals() {
        let db = Database::open_in_memory().unwrap();
        let activity = insert(&db, "Math");
        let date = NaiveDate::from_ymd_opt(2026, 10, 12).unwrap();
        let header = GoalHeader {
            id: String::new(),
            user_id: "u1".to_string(),
            title: "Math".to_string(),
            activity_id: activity.id.clone(),
            kind: PeriodKind::Weekly,
        };
        let detail = GoalDetail {
            id: String::new(),
            goal_id: String::new(),
            start_date: date,
            end_date: date + chrono::Duration::days(6),
            target_secs: 3600,
            current_secs: 0,
            completed: false,
        };
        let goal = db.insert_goal(&header, &detail).unwrap();

        db.delete_activity_with_goals(&activity.id).unwrap();

        assert!(db.get_activity(&activity.id).unwrap().is_none());
        assert!(db.get_goal_header(&goal.header.id).unwrap().is_none());
        assert!(db.get_goal_detail(&goal.detail.id).unwrap().is_none());
    }

    #[test]
    fn save_stats_overwrites_existing_row() {
        let db = Database::open_in_memory().unwrap();
        let start = NaiveDate::from_ymd_opt(2026, 10, 12).unwrap();
        let mut stats = StatsModel {
            id: String::new(),
            user_id: "u1".to_string(),
            activity_id: "a1".to_string(),
            kind: PeriodKind::Weekly,
            label: "Week 12/10 - 18/10".to_string(),
            period_start: start,
            period_end: start + chrono::Duration::days(6),
            total_secs: 60,
            completed_count: 1,
            missed_count: 1,
            pending_count: 0,
            status: StatsStatus::Pending,
        };
        stats.id = db.save_stats(&stats).unwrap();
        stats.total_secs = 120;
        stats.status = StatsStatus::Closed;
        db.save_stats(&stats).unwrap();

        let rows = db.get_stats_for_period("u1", PeriodKind::Weekly, start).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].total_secs, 120);
        assert_eq!(rows[0].status, StatsStatus::Closed);
    }

    #[test]
    fn latest_detail_before_picks_most_recent() {
        let db = Database::open_in_memory().unwrap();
        let mk = |start: NaiveDate, target: i64| GoalDetail {
            id: String::new(),
            goal_id: "g1".to_string(),
            start_date: start,
            end_date: start + chrono::Duration::days(6),
            target_secs: target,
            current_secs: 0,
            completed: false,
        };
        let w1 = NaiveDate::from_ymd_opt(2026, 9, 28).unwrap();
        let w2 = NaiveDate::from_ymd_opt(2026, 10, 5).unwrap();
        db.insert_goal_detail(&mk(w1, 100)).unwrap();
        db.insert_goal_detail(&mk(w2, 200)).unwrap();

        let this_week = NaiveDate::from_ymd_opt(2026, 10, 12).unwrap();
        let latest = db.get_latest_goal_detail_before("g1", this_week).unwrap().unwrap();
        assert_eq!(latest.target_secs, 200);
        assert!(db.get_latest_goal_detail_before("g1", w1).unwrap().is_none());
    }

    #[test]
    fn applying_a_suggestion_writes_window_and_status_together() {
        let db = Database::open_in_memory().unwrap();
        let activity = insert(&db, "Math");
        let suggestion = Suggestion {
            id: String::new(),
            user_id: "u1".to_string(),
            activity_id: activity.id.clone(),
            activity_title: "Math".to_string(),
            current_start: "08:00".to_string(),
            current_end: "09:00".to_string(),
            suggested_start: "10:00".to_string(),
            suggested_end: "11:00".to_string(),
            reason: "Later works better".to_string(),
            requested_at: "Fri, 16/10".to_string(),
            status: SuggestionStatus::Pending,
        };
        let id = db.save_suggestion_and_mark_analyzed(&suggestion, &[]).unwrap();

        db.apply_suggestion_window(&id, &activity.id, time(10, 0), time(11, 0))
            .unwrap();
        let moved = db.get_activity(&activity.id).unwrap().unwrap();
        assert_eq!((moved.start_time, moved.end_time), (time(10, 0), time(11, 0)));
        assert_eq!(
            db.get_suggestion(&id).unwrap().unwrap().status,
            SuggestionStatus::Applied
        );
    }

    #[test]
    fn new_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("tmk.db");
        Database::new(path.to_str().unwrap()).unwrap();
        assert!(path.exists());
    }
}
