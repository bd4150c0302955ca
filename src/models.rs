use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Returned when a stored or user-supplied label does not name a known variant
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unknown {kind} label: {value}")]
pub struct ParseLabelError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseLabelError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Day of the week an activity repeats on.
///
/// Serialized as `"Mon"`..`"Sun"`. The short labels used by older data
/// (`T2`..`T7`, `CN`) are accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DayLabel {
    #[serde(alias = "T2")]
    Mon,
    #[serde(alias = "T3")]
    Tue,
    #[serde(alias = "T4")]
    Wed,
    #[serde(alias = "T5")]
    Thu,
    #[serde(alias = "T6")]
    Fri,
    #[serde(alias = "T7")]
    Sat,
    #[serde(alias = "CN")]
    Sun,
}

impl DayLabel {
    pub const ALL: [DayLabel; 7] = [
        DayLabel::Mon,
        DayLabel::Tue,
        DayLabel::Wed,
        DayLabel::Thu,
        DayLabel::Fri,
        DayLabel::Sat,
        DayLabel::Sun,
    ];

    pub fn from_weekday(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Mon => DayLabel::Mon,
            Weekday::Tue => DayLabel::Tue,
            Weekday::Wed => DayLabel::Wed,
            Weekday::Thu => DayLabel::Thu,
            Weekday::Fri => DayLabel::Fri,
            Weekday::Sat => DayLabel::Sat,
            Weekday::Sun => DayLabel::Sun,
        }
    }

    pub fn to_weekday(self) -> Weekday {
        match self {
            DayLabel::Mon => Weekday::Mon,
            DayLabel::Tue => Weekday::Tue,
            DayLabel::Wed => Weekday::Wed,
            DayLabel::Thu => Weekday::Thu,
            DayLabel::Fri => Weekday::Fri,
            DayLabel::Sat => Weekday::Sat,
            DayLabel::Sun => Weekday::Sun,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DayLabel::Mon => "Mon",
            DayLabel::Tue => "Tue",
            DayLabel::Wed => "Wed",
            DayLabel::Thu => "Thu",
            DayLabel::Fri => "Fri",
            DayLabel::Sat => "Sat",
            DayLabel::Sun => "Sun",
        }
    }

    pub fn long_name(self) -> &'static str {
        match self {
            DayLabel::Mon => "Monday",
            DayLabel::Tue => "Tuesday",
            DayLabel::Wed => "Wednesday",
            DayLabel::Thu => "Thursday",
            DayLabel::Fri => "Friday",
            DayLabel::Sat => "Saturday",
            DayLabel::Sun => "Sunday",
        }
    }
}

impl fmt::Display for DayLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DayLabel {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mon" | "monday" | "t2" => Ok(DayLabel::Mon),
            "tue" | "tuesday" | "t3" => Ok(DayLabel::Tue),
            "wed" | "wednesday" | "t4" => Ok(DayLabel::Wed),
            "thu" | "thursday" | "t5" => Ok(DayLabel::Thu),
            "fri" | "friday" | "t6" => Ok(DayLabel::Fri),
            "sat" | "saturday" | "t7" => Ok(DayLabel::Sat),
            "sun" | "sunday" | "cn" => Ok(DayLabel::Sun),
            _ => Err(ParseLabelError::new("day", s)),
        }
    }
}

/// Join day labels for display, e.g. "Mon, Wed"
pub fn format_days(days: &[DayLabel]) -> String {
    days.iter()
        .map(|d| d.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodKind {
    Weekly,
    Monthly,
}

impl PeriodKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PeriodKind::Weekly => "weekly",
            PeriodKind::Monthly => "monthly",
        }
    }
}

impl fmt::Display for PeriodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PeriodKind {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "weekly" | "week" => Ok(PeriodKind::Weekly),
            "monthly" | "month" => Ok(PeriodKind::Monthly),
            _ => Err(ParseLabelError::new("period", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatsStatus {
    Pending,
    Closed,
}

impl StatsStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            StatsStatus::Pending => "pending",
            StatsStatus::Closed => "closed",
        }
    }
}

impl FromStr for StatsStatus {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(StatsStatus::Pending),
            "closed" => Ok(StatsStatus::Closed),
            _ => Err(ParseLabelError::new("stats status", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionStatus {
    Pending,
    Applied,
    Deleted,
}

impl SuggestionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SuggestionStatus::Pending => "pending",
            SuggestionStatus::Applied => "applied",
            SuggestionStatus::Deleted => "deleted",
        }
    }
}

impl FromStr for SuggestionStatus {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SuggestionStatus::Pending),
            "applied" => Ok(SuggestionStatus::Applied),
            "deleted" => Ok(SuggestionStatus::Deleted),
            _ => Err(ParseLabelError::new("suggestion status", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub created_at: String,
}

impl User {
    pub fn new(email: String, display_name: Option<String>) -> Self {
        Self {
            id: String::new(),
            email,
            display_name,
            created_at: now_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PomodoroSettings {
    pub enabled: bool,
    pub focus_minutes: u32,
    pub break_minutes: u32,
}

/// User input for creating or editing an activity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityDraft {
    pub title: String,
    pub category: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub repeat_days: Vec<DayLabel>,
    pub pomodoro: PomodoroSettings,
}

impl ActivityDraft {
    pub fn from_activity(activity: &Activity) -> Self {
        Self {
            title: activity.title.clone(),
            category: activity.category.clone(),
            start_time: activity.start_time,
            end_time: activity.end_time,
            repeat_days: activity.repeat_days.clone(),
            pomodoro: activity.pomodoro,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub category: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub repeat_days: Vec<DayLabel>,
    pub pomodoro: PomodoroSettings,
}

/// Category used when the user has not picked one
pub const UNCATEGORIZED: &str = "Other";

impl Activity {
    pub fn from_draft(user_id: &str, draft: &ActivityDraft) -> Self {
        let category = if draft.category.trim().is_empty() {
            UNCATEGORIZED.to_string()
        } else {
            draft.category.trim().to_string()
        };
        Self {
            id: String::new(),
            user_id: user_id.to_string(),
            title: draft.title.trim().to_string(),
            category,
            start_time: draft.start_time,
            end_time: draft.end_time,
            repeat_days: draft.repeat_days.clone(),
            pomodoro: draft.pomodoro,
        }
    }

    pub fn repeats_on(&self, day: DayLabel) -> bool {
        self.repeat_days.contains(&day)
    }

    /// Planned window as "HH:MM - HH:MM"
    pub fn window_label(&self) -> String {
        format!(
            "{} - {}",
            self.start_time.format("%H:%M"),
            self.end_time.format("%H:%M")
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityType {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub created_at: String,
}

impl ActivityType {
    pub fn new(user_id: String, name: String) -> Self {
        Self {
            id: String::new(),
            user_id,
            name,
            created_at: now_string(),
        }
    }
}

/// An activity scheduled for a given day, and whether it was done
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityWithStatus {
    pub activity: Activity,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: String,
    pub activity_id: String,
    pub user_id: String,
    pub date: NaiveDate,
    pub day_label: DayLabel,
    // Planned window at the time of logging
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub actual_start: NaiveDateTime,
    pub actual_end: NaiveDateTime,
    pub duration_secs: i64,
    pub completed: bool,
    pub analyzed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalHeader {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub activity_id: String,
    pub kind: PeriodKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalDetail {
    pub id: String,
    pub goal_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub target_secs: i64,
    pub current_secs: i64,
    pub completed: bool,
}

impl GoalDetail {
    pub fn is_met(current_secs: i64, target_secs: i64) -> bool {
        current_secs >= target_secs
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalWithDetail {
    pub header: GoalHeader,
    pub detail: GoalDetail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsModel {
    pub id: String,
    pub user_id: String,
    pub activity_id: String,
    pub kind: PeriodKind,
    pub label: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub total_secs: i64,
    pub completed_count: u32,
    pub missed_count: u32,
    pub pending_count: u32,
    pub status: StatsStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: String,
    pub user_id: String,
    pub activity_id: String,
    pub activity_title: String,
    pub current_start: String,
    pub current_end: String,
    pub suggested_start: String,
    pub suggested_end: String,
    pub reason: String,
    pub requested_at: String,
    pub status: SuggestionStatus,
}

fn now_string() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
