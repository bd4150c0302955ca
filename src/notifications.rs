//! Weekly reminders at each activity's start time on each of its repeat days.
//!
//! Scheduling goes through [`AlarmBackend`] so the same logic drives the
//! SQLite-backed alarm table used by the CLI and an in-memory backend.

use chrono::{Datelike, Duration, NaiveDateTime, NaiveTime};
use std::cell::RefCell;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::database::{AlarmRow, Database, DatabaseError};
use crate::models::{Activity, DayLabel};
use crate::period::Period;
use crate::utils::format_hhmm;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),
}

/// What the reminder shows when it fires
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmPayload {
    pub activity_id: String,
    pub day: DayLabel,
    pub title: String,
    pub body: String,
}

impl AlarmPayload {
    fn for_activity(activity: &Activity, day: DayLabel) -> Self {
        Self {
            activity_id: activity.id.clone(),
            day,
            title: activity.title.clone(),
            body: format!(
                "Starts at {} - ends at {}",
                format_hhmm(activity.start_time),
                format_hhmm(activity.end_time)
            ),
        }
    }
}

pub trait AlarmBackend {
    /// Register (or replace) the alarm under `key`
    fn schedule_at(
        &self,
        key: i32,
        at: NaiveDateTime,
        payload: &AlarmPayload,
    ) -> Result<(), NotificationError>;

    /// Remove the alarm under `key`; unknown keys are ignored
    fn cancel(&self, key: i32) -> Result<(), NotificationError>;
}

/// Stable key for the (activity, day) pair.
///
/// 31-multiplier string hash over the UTF-16 units of
/// `"{activity_id}_{day}"`, with wrapping 32-bit arithmetic.
pub fn alarm_key(activity_id: &str, day: DayLabel) -> i32 {
    format!("{}_{}", activity_id, day.as_str())
        .encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(unit as i32))
}

/// Next firing time for `day` at `start_time`: that weekday in the current
/// Monday-based week, pushed one week later if it has already passed.
pub fn next_trigger(start_time: NaiveTime, day: DayLabel, now: NaiveDateTime) -> NaiveDateTime {
    let week = Period::week_containing(now.date());
    let date = week.start + Duration::days(day.to_weekday().num_days_from_monday() as i64);
    let at = date.and_time(start_time);
    if at < now {
        at + Duration::days(7)
    } else {
        at
    }
}

pub struct AlarmScheduler<'a> {
    backend: &'a dyn AlarmBackend,
}

impl<'a> AlarmScheduler<'a> {
    pub fn new(backend: &'a dyn AlarmBackend) -> Self {
        Self { backend }
    }

    /// Schedule one alarm per repeat day. Returns how many were registered.
    pub fn schedule(
        &self,
        activity: &Activity,
        now: NaiveDateTime,
    ) -> Result<usize, NotificationError> {
        for day in &activity.repeat_days {
            let at = next_trigger(activity.start_time, *day, now);
            let key = alarm_key(&activity.id, *day);
            self.backend
                .schedule_at(key, at, &AlarmPayload::for_activity(activity, *day))?;
            log::debug!("scheduled alarm {} for '{}' at {}", key, activity.title, at);
        }
        Ok(activity.repeat_days.len())
    }

    /// Cancel the alarms for all seven days, whether or not they were scheduled
    pub fn cancel_all(&self, activity_id: &str) -> Result<(), NotificationError> {
        for day in DayLabel::ALL {
            self.backend.cancel(alarm_key(activity_id, day))?;
        }
        Ok(())
    }

    pub fn reschedule(
        &self,
        activity: &Activity,
        now: NaiveDateTime,
    ) -> Result<usize, NotificationError> {
        self.cancel_all(&activity.id)?;
        self.schedule(activity, now)
    }

    /// Rebuild every alarm, e.g. after the device restarted
    pub fn reschedule_all(
        &self,
        activities: &[Activity],
        now: NaiveDateTime,
    ) -> Result<usize, NotificationError> {
        let mut total = 0;
        for activity in activities {
            total += self.reschedule(activity, now)?;
        }
        log::info!("rescheduled {} alarms for {} activities", total, activities.len());
        Ok(total)
    }
}

/// A reminder that came due
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub activity_id: String,
    pub title: String,
    pub body: String,
    pub fired_at: NaiveDateTime,
}

/// Alarms persisted in the `alarms` table
pub struct SqliteAlarmBackend<'a> {
    db: &'a Database,
}

impl<'a> SqliteAlarmBackend<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub fn scheduled(&self) -> Result<Vec<AlarmRow>, NotificationError> {
        Ok(self.db.get_alarms()?)
    }

    /// Alarms whose trigger time is at or before `now`
    pub fn due(&self, now: NaiveDateTime) -> Result<Vec<AlarmRow>, NotificationError> {
        Ok(self.db.get_due_alarms(now)?)
    }

    /// Fire every alarm whose time has come and push it one week ahead.
    /// Alarms whose activity no longer exists are dropped instead.
    pub fn fire_due(&self, now: NaiveDateTime) -> Result<Vec<Notification>, NotificationError> {
        let mut fired = Vec::new();
        for mut alarm in self.due(now)? {
            if self.db.get_activity(&alarm.activity_id)?.is_none() {
                log::info!("dropping alarm {} for deleted activity", alarm.key);
                self.db.delete_alarm(alarm.key)?;
                continue;
            }
            fired.push(Notification {
                activity_id: alarm.activity_id.clone(),
                title: alarm.title.clone(),
                body: alarm.body.clone(),
                fired_at: alarm.trigger_at,
            });
            while alarm.trigger_at <= now {
                alarm.trigger_at += Duration::days(7);
            }
            self.db.upsert_alarm(&alarm)?;
        }
        Ok(fired)
    }
}

impl AlarmBackend for SqliteAlarmBackend<'_> {
    fn schedule_at(
        &self,
        key: i32,
        at: NaiveDateTime,
        payload: &AlarmPayload,
    ) -> Result<(), NotificationError> {
        self.db.upsert_alarm(&AlarmRow {
            key,
            activity_id: payload.activity_id.clone(),
            day: payload.day,
            trigger_at: at,
            title: payload.title.clone(),
            body: payload.body.clone(),
        })?;
        Ok(())
    }

    fn cancel(&self, key: i32) -> Result<(), NotificationError> {
        self.db.delete_alarm(key)?;
        Ok(())
    }
}

/// Keeps alarms in memory; used when reminders are disabled and in tests
#[derive(Default)]
pub struct MemoryAlarmBackend {
    alarms: RefCell<BTreeMap<i32, (NaiveDateTime, AlarmPayload)>>,
}

impl MemoryAlarmBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: i32) -> Option<(NaiveDateTime, AlarmPayload)> {
        self.alarms.borrow().get(&key).cloned()
    }

    pub fn len(&self) -> usize {
        self.alarms.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.alarms.borrow().is_empty()
    }
}

impl AlarmBackend for MemoryAlarmBackend {
    fn schedule_at(
        &self,
        key: i32,
        at: NaiveDateTime,
        payload: &AlarmPayload,
    ) -> Result<(), NotificationError> {
        self.alarms.borrow_mut().insert(key, (at, payload.clone()));
        Ok(())
    }

    fn cancel(&self, key: i32) -> Result<(), NotificationError> {
        self.alarms.borrow_mut().remove(&key);
        Ok(())
    }
}
