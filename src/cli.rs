use chrono::{NaiveDate, NaiveTime};
use clap::{Parser, Subcommand};
use std::path::Path;
use thiserror::Error;

use crate::activities::{ActivityError, ActivityService};
use crate::ai::AiError;
use crate::config::{Config, ConfigError};
use crate::database::{Database, DatabaseError};
use crate::goals::{progress_percent, GoalError, GoalService};
use crate::logs::{LogError, LogService};
use crate::models::{
    format_days, Activity, ActivityDraft, DayLabel, PeriodKind, PomodoroSettings, Suggestion,
    User,
};
use crate::notifications::{
    AlarmBackend, MemoryAlarmBackend, NotificationError, SqliteAlarmBackend,
};
use crate::period::Period;
use crate::stats::{StatsError, StatsService};
use crate::suggestions::{AnalysisService, CycleOutcome, SuggestionError, SuggestionService};
use crate::utils::{format_duration, format_hhmm, now, parse_date, parse_time_of_day, today};
use crate::worker::RefreshQueue;

#[derive(Parser)]
#[command(name = "tmk")]
#[command(about = "Plan recurring activities, log time, track goals and get schedule suggestions")]
#[command(version)]
pub struct Cli {
    /// Custom config file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// Use development mode (uses separate dev config/database)
    #[arg(long)]
    pub dev: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Launch interactive TUI (default if no subcommand)
    Tui,
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserCommand,
    },
    /// Manage recurring activities
    Activity {
        #[command(subcommand)]
        action: ActivityCommand,
    },
    /// Manage activity types (categories)
    Type {
        #[command(subcommand)]
        action: TypeCommand,
    },
    /// Log a completed session of an activity
    Log {
        /// Activity id or title
        activity: String,
        /// Actual start time (HH:MM)
        #[arg(long)]
        start: String,
        /// Actual end time (HH:MM)
        #[arg(long)]
        end: String,
        /// Date of the session (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,
    },
    /// Show the logs and summary of one day
    Logs {
        /// Date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,
    },
    /// Show the activities planned for a day and whether they are done
    Today {
        /// Date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,
    },
    /// Manage weekly and monthly goals
    Goal {
        #[command(subcommand)]
        action: GoalCommand,
    },
    /// Show completed, missed and pending counts per activity
    Stats {
        /// "week" or "month"
        #[arg(default_value = "week")]
        period: String,
        /// Periods back (negative) or forward from the current one
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        offset: i32,
    },
    /// Schedule suggestions from the AI model
    Suggest {
        #[command(subcommand)]
        action: SuggestCommand,
    },
    /// Inspect and fire activity reminders
    Alarms {
        #[command(subcommand)]
        action: AlarmCommand,
    },
    /// Open this period's goal details and recompute progress and statistics
    Refresh,
    /// Show or change the TUI theme
    Theme {
        /// Theme to activate
        name: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum UserCommand {
    /// Register a user (becomes current if none is set)
    Add {
        email: String,
        #[arg(long)]
        name: Option<String>,
    },
    /// List users
    List,
    /// Switch the current user
    Use {
        /// User id or email
        user: String,
    },
}

#[derive(Subcommand)]
pub enum ActivityCommand {
    /// Create an activity
    Add {
        title: String,
        /// Planned start (HH:MM)
        #[arg(long)]
        start: String,
        /// Planned end (HH:MM)
        #[arg(long)]
        end: String,
        /// Comma-separated repeat days, e.g. Mon,Wed,Fri
        #[arg(long)]
        days: String,
        #[arg(long)]
        category: Option<String>,
        /// Pomodoro focus/break minutes, e.g. 25/5
        #[arg(long)]
        pomodoro: Option<String>,
    },
    /// Change fields of an activity
    Edit {
        /// Activity id or title
        activity: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        #[arg(long)]
        days: Option<String>,
        #[arg(long)]
        category: Option<String>,
        /// Pomodoro focus/break minutes, or "off"
        #[arg(long)]
        pomodoro: Option<String>,
    },
    /// Delete an activity and its goals
    Delete {
        /// Activity id or title
        activity: String,
    },
    /// List activities
    List,
}

#[derive(Subcommand)]
pub enum TypeCommand {
    Add { name: String },
    List,
    Delete { id: String },
}

#[derive(Subcommand)]
pub enum GoalCommand {
    /// Track an activity with a time target per period
    Add {
        /// Activity id or title
        activity: String,
        /// "weekly" or "monthly"
        #[arg(long, default_value = "weekly")]
        kind: String,
        #[arg(long, default_value_t = 0)]
        hours: i64,
        #[arg(long, default_value_t = 0)]
        minutes: i64,
    },
    /// Show current progress
    List {
        /// Only "weekly" or "monthly" goals
        #[arg(long)]
        kind: Option<String>,
    },
    /// List activities that have no goal of the given kind yet
    Candidates {
        #[arg(long, default_value = "weekly")]
        kind: String,
    },
    /// Change the target of one period
    Target {
        /// Goal detail id
        detail: String,
        #[arg(long, default_value_t = 0)]
        hours: i64,
        #[arg(long, default_value_t = 0)]
        minutes: i64,
    },
    /// Delete a goal and its history
    Delete { goal: String },
}

#[derive(Subcommand)]
pub enum SuggestCommand {
    /// Analyze recent logs and request a suggestion if enough have accumulated
    Run,
    /// List pending suggestions
    List,
    /// Apply a suggestion to its activity
    Apply { id: String },
    /// Discard a suggestion
    Discard { id: String },
}

#[derive(Subcommand)]
pub enum AlarmCommand {
    /// List scheduled reminders
    List {
        /// Only reminders that are already due
        #[arg(long)]
        due: bool,
    },
    /// Show reminders that are due and schedule their next occurrence
    Fire,
    /// Rebuild all reminders of the current user
    Reschedule,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),
    #[error("Config error: {0}")]
    ConfigError(#[from] ConfigError),
    #[error("{0}")]
    ActivityError(#[from] ActivityError),
    #[error("{0}")]
    LogError(#[from] LogError),
    #[error("{0}")]
    GoalError(#[from] GoalError),
    #[error("{0}")]
    StatsError(#[from] StatsError),
    #[error("{0}")]
    SuggestionError(#[from] SuggestionError),
    #[error("{0}")]
    AiError(#[from] AiError),
    #[error("Notification error: {0}")]
    NotificationError(#[from] NotificationError),
    #[error("Failed to parse date: {0}")]
    DateParseError(String),
    #[error("Failed to parse time: {0}")]
    TimeParseError(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("No current user; run `tmk user add <email>` first")]
    NoCurrentUser,
    #[error("User not found: {0}")]
    UserNotFound(String),
    #[error("AI suggestions are disabled in the config")]
    AiDisabled,
}

/// Resolve the configured current user
pub fn current_user(config: &Config, db: &Database) -> Result<User, CliError> {
    let key = config.current_user.as_deref().ok_or(CliError::NoCurrentUser)?;
    db.get_user(key)?
        .ok_or_else(|| CliError::UserNotFound(key.to_string()))
}

fn parse_day_list(days: &str) -> Result<Vec<DayLabel>, CliError> {
    let mut parsed = Vec::new();
    for part in days.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let day = part
            .parse::<DayLabel>()
            .map_err(|e| CliError::InvalidArgument(e.to_string()))?;
        if !parsed.contains(&day) {
            parsed.push(day);
        }
    }
    Ok(parsed)
}

fn parse_pomodoro(value: &str) -> Result<PomodoroSettings, CliError> {
    if value.eq_ignore_ascii_case("off") {
        return Ok(PomodoroSettings::default());
    }
    let (focus, rest) = value.split_once('/').ok_or_else(|| {
        CliError::InvalidArgument(format!("Pomodoro must look like 25/5, got '{}'", value))
    })?;
    let minutes = |s: &str| {
        s.trim()
            .parse::<u32>()
            .map_err(|e| CliError::InvalidArgument(format!("Invalid minutes '{}': {}", s, e)))
    };
    Ok(PomodoroSettings {
        enabled: true,
        focus_minutes: minutes(focus)?,
        break_minutes: minutes(rest)?,
    })
}

fn parse_time_arg(value: &str) -> Result<NaiveTime, CliError> {
    parse_time_of_day(value)
        .map_err(|e| CliError::TimeParseError(format!("Invalid time '{}': {}", value, e)))
}

fn parse_date_arg(value: Option<&str>) -> Result<NaiveDate, CliError> {
    match value {
        Some(s) => parse_date(s)
            .map_err(|e| CliError::DateParseError(format!("Invalid date format '{}': {}", s, e))),
        None => Ok(today()),
    }
}

fn parse_kind(value: &str) -> Result<PeriodKind, CliError> {
    value
        .parse::<PeriodKind>()
        .map_err(|e| CliError::InvalidArgument(e.to_string()))
}

/// Look an activity up by id, then by case-insensitive title
fn find_activity(
    service: &ActivityService,
    user: &User,
    key: &str,
) -> Result<Activity, CliError> {
    let activities = service.list(&user.id)?;
    activities
        .iter()
        .find(|a| a.id == key)
        .or_else(|| activities.iter().find(|a| a.title.eq_ignore_ascii_case(key.trim())))
        .cloned()
        .ok_or_else(|| ActivityError::NotFound(key.to_string()).into())
}

/// Execute a non-TUI command
pub fn run(
    command: Commands,
    config: &mut Config,
    config_path: &Path,
    db: &Database,
) -> Result<(), CliError> {
    let sqlite_alarms = SqliteAlarmBackend::new(db);
    let memory_alarms = MemoryAlarmBackend::new();
    let backend: &dyn AlarmBackend = if config.notifications.enabled {
        &sqlite_alarms
    } else {
        &memory_alarms
    };

    match command {
        Commands::Tui => Ok(()),
        Commands::User { action } => handle_user(action, config, config_path, db),
        Commands::Theme { name } => handle_theme(name, config, config_path),
        Commands::Activity { action } => {
            let user = current_user(config, db)?;
            handle_activity(action, &user, &ActivityService::new(db, backend))
        }
        Commands::Type { action } => {
            let user = current_user(config, db)?;
            handle_type(action, &user, &ActivityService::new(db, backend))
        }
        Commands::Log {
            activity,
            start,
            end,
            date,
        } => {
            let user = current_user(config, db)?;
            let client = match config.ai.client() {
                Ok(client) => client,
                Err(e) => {
                    log::debug!("automatic analysis off: {}", e);
                    None
                }
            };
            let analysis = client.as_ref().map(|c| {
                AnalysisService::new(db, c).with_threshold(config.ai.analysis_threshold)
            });
            handle_log(&activity, &start, &end, date.as_deref(), &user, db, backend)?;
            if let Some(analysis) = &analysis {
                analyze_after_log(&user, analysis);
            }
            Ok(())
        }
        Commands::Logs { date } => {
            let user = current_user(config, db)?;
            handle_logs(date.as_deref(), &user, db)
        }
        Commands::Today { date } => {
            let user = current_user(config, db)?;
            handle_today(date.as_deref(), &user, &ActivityService::new(db, backend))
        }
        Commands::Goal { action } => {
            let user = current_user(config, db)?;
            handle_goal(action, &user, db, backend)
        }
        Commands::Stats { period, offset } => {
            let user = current_user(config, db)?;
            handle_stats(&period, offset, &user, db)
        }
        Commands::Suggest { action } => {
            let user = current_user(config, db)?;
            handle_suggest(action, &user, config, db, backend)
        }
        Commands::Alarms { action } => {
            let user = current_user(config, db)?;
            handle_alarms(action, &user, &sqlite_alarms, &ActivityService::new(db, backend))
        }
        Commands::Refresh => {
            let user = current_user(config, db)?;
            let mut queue = RefreshQueue::new();
            queue.enqueue(&user.id);
            for (_, report) in queue.run_pending(db, today())? {
                println!(
                    "Refreshed: {} new goal period(s), {} goal(s) updated, {} stats row(s)",
                    report.details_created, report.goals_refreshed, report.stats_written
                );
            }
            Ok(())
        }
    }
}

pub fn handle_user(
    action: UserCommand,
    config: &mut Config,
    config_path: &Path,
    db: &Database,
) -> Result<(), CliError> {
    match action {
        UserCommand::Add { email, name } => {
            let email = email.trim().to_string();
            if email.is_empty() {
                return Err(CliError::InvalidArgument("Email must not be empty".to_string()));
            }
            let id = db.insert_user(&User::new(email.clone(), name))?;
            println!("User created successfully (ID: {})", id);
            if config.current_user.is_none() {
                config.current_user = Some(id);
                config.save_to_path(config_path)?;
                println!("Now acting as {}", email);
            }
        }
        UserCommand::List => {
            let current = config.current_user.clone().unwrap_or_default();
            for user in db.get_users()? {
                let marker = if user.id == current || user.email == current {
                    "*"
                } else {
                    " "
                };
                println!(
                    "{} {}  {}  {}",
                    marker,
                    user.id,
                    user.email,
                    user.display_name.unwrap_or_default()
                );
            }
        }
        UserCommand::Use { user } => {
            let found = db
                .get_user(&user)?
                .ok_or_else(|| CliError::UserNotFound(user.clone()))?;
            config.current_user = Some(found.id.clone());
            config.save_to_path(config_path)?;
            println!("Now acting as {}", found.email);
        }
    }
    Ok(())
}

fn handle_theme(name: Option<String>, config: &mut Config, config_path: &Path) -> Result<(), CliError> {
    match name {
        Some(name) => {
            config.set_theme(&name)?;
            config.save_to_path(config_path)?;
            println!("Theme set to {}", name);
        }
        None => {
            for theme in config.get_available_themes() {
                let marker = if theme == config.current_theme { "*" } else { " " };
                println!("{} {}", marker, theme);
            }
        }
    }
    Ok(())
}

pub fn handle_activity(
    action: ActivityCommand,
    user: &User,
    service: &ActivityService,
) -> Result<(), CliError> {
    match action {
        ActivityCommand::Add {
            title,
            start,
            end,
            days,
            category,
            pomodoro,
        } => {
            let draft = ActivityDraft {
                title,
                category: category.unwrap_or_default(),
                start_time: parse_time_arg(&start)?,
                end_time: parse_time_arg(&end)?,
                repeat_days: parse_day_list(&days)?,
                pomodoro: pomodoro.as_deref().map(parse_pomodoro).transpose()?.unwrap_or_default(),
            };
            let activity = service.create(&user.id, &draft, now())?;
            println!("Activity created successfully (ID: {})", activity.id);
        }
        ActivityCommand::Edit {
            activity,
            title,
            start,
            end,
            days,
            category,
            pomodoro,
        } => {
            let existing = find_activity(service, user, &activity)?;
            let mut draft = ActivityDraft::from_activity(&existing);
            if let Some(title) = title {
                draft.title = title;
            }
            if let Some(start) = start {
                draft.start_time = parse_time_arg(&start)?;
            }
            if let Some(end) = end {
                draft.end_time = parse_time_arg(&end)?;
            }
            if let Some(days) = days {
                draft.repeat_days = parse_day_list(&days)?;
            }
            if let Some(category) = category {
                draft.category = category;
            }
            if let Some(pomodoro) = pomodoro {
                draft.pomodoro = parse_pomodoro(&pomodoro)?;
            }
            service.update(&existing.id, &draft, now())?;
            println!("Activity updated successfully");
        }
        ActivityCommand::Delete { activity } => {
            let existing = find_activity(service, user, &activity)?;
            service.delete(&existing.id)?;
            println!("Deleted '{}' and its goals", existing.title);
        }
        ActivityCommand::List => {
            for a in service.list(&user.id)? {
                let pomodoro = if a.pomodoro.enabled {
                    format!("  pomodoro {}/{}", a.pomodoro.focus_minutes, a.pomodoro.break_minutes)
                } else {
                    String::new()
                };
                println!(
                    "{}  {}  {}  [{}]  {}{}",
                    a.id,
                    a.window_label(),
                    a.title,
                    format_days(&a.repeat_days),
                    a.category,
                    pomodoro
                );
            }
        }
    }
    Ok(())
}

pub fn handle_type(action: TypeCommand, user: &User, service: &ActivityService) -> Result<(), CliError> {
    match action {
        TypeCommand::Add { name } => {
            let created = service.add_type(&user.id, &name)?;
            println!("Type created successfully (ID: {})", created.id);
        }
        TypeCommand::List => {
            for t in service.list_types(&user.id)? {
                println!("{}  {}", t.id, t.name);
            }
        }
        TypeCommand::Delete { id } => {
            service.delete_type(&id)?;
            println!("Type deleted");
        }
    }
    Ok(())
}

pub fn handle_log(
    activity: &str,
    start: &str,
    end: &str,
    date: Option<&str>,
    user: &User,
    db: &Database,
    backend: &dyn AlarmBackend,
) -> Result<(), CliError> {
    let activity = find_activity(&ActivityService::new(db, backend), user, activity)?;
    let date = parse_date_arg(date)?;
    let actual_start = date.and_time(parse_time_arg(start)?);
    let actual_end = date.and_time(parse_time_arg(end)?);
    let log = LogService::new(db).record(&activity, actual_start, actual_end)?;
    println!(
        "Logged {} for '{}' (ID: {})",
        format_duration(log.duration_secs),
        activity.title,
        log.id
    );
    Ok(())
}

/// One analysis pass after a new log. Below the threshold nothing happens,
/// and a failed request never undoes the log.
pub fn analyze_after_log(user: &User, analysis: &AnalysisService) -> Option<Suggestion> {
    match analysis.run_cycle(&user.id, now()) {
        Ok(CycleOutcome::Suggested(s)) => {
            println!("New suggestion (ID: {})", s.id);
            print_suggestion(&s);
            Some(s)
        }
        Ok(_) => None,
        Err(e) => {
            log::warn!("automatic analysis failed: {}", e);
            eprintln!("Analysis failed: {}", e);
            None
        }
    }
}

pub fn handle_logs(date: Option<&str>, user: &User, db: &Database) -> Result<(), CliError> {
    let date = parse_date_arg(date)?;
    let service = LogService::new(db);
    let rows = service.for_day_with_titles(&user.id, date)?;
    if rows.is_empty() {
        println!("No logs on {}", date);
        return Ok(());
    }
    for (log, title) in &rows {
        println!(
            "{} -> {}  {}  ({})",
            log.actual_start.format("%H:%M"),
            log.actual_end.format("%H:%M"),
            title,
            format_duration(log.duration_secs)
        );
    }
    let summary = service.daily_summary(&user.id, date)?;
    println!();
    println!(
        "{} activities, {} total",
        summary.total_activities,
        format_duration(summary.total_secs)
    );
    if let Some(hour) = summary.peak_hour {
        println!("Peak hour: {:02}:00", hour);
    }
    for (category, secs) in &summary.secs_by_category {
        println!("  {}: {}", category, format_duration(*secs));
    }
    Ok(())
}

pub fn handle_today(date: Option<&str>, user: &User, service: &ActivityService) -> Result<(), CliError> {
    let date = parse_date_arg(date)?;
    let planned = service.for_date(&user.id, date)?;
    println!("{} ({})", date, DayLabel::from_weekday(chrono::Datelike::weekday(&date)).long_name());
    if planned.is_empty() {
        println!("Nothing planned");
    }
    for item in planned {
        println!(
            "[{}] {}  {}",
            if item.completed { "x" } else { " " },
            item.activity.window_label(),
            item.activity.title
        );
    }
    Ok(())
}

pub fn handle_goal(
    action: GoalCommand,
    user: &User,
    db: &Database,
    backend: &dyn AlarmBackend,
) -> Result<(), CliError> {
    let goals = GoalService::new(db);
    match action {
        GoalCommand::Add {
            activity,
            kind,
            hours,
            minutes,
        } => {
            let activity = find_activity(&ActivityService::new(db, backend), user, &activity)?;
            let goal = goals.create(&activity, parse_kind(&kind)?, hours, minutes, today())?;
            println!(
                "Goal created successfully (ID: {}, detail: {})",
                goal.header.id, goal.detail.id
            );
        }
        GoalCommand::List { kind } => {
            let kinds = match kind {
                Some(k) => vec![parse_kind(&k)?],
                None => vec![PeriodKind::Weekly, PeriodKind::Monthly],
            };
            for kind in kinds {
                let period = Period::containing(kind, today());
                println!("{}", period.label());
                for goal in goals.list(&user.id, kind, today())? {
                    let d = &goal.detail;
                    println!(
                        "  [{}] {}  {} / {}  ({:.0}%)  goal {}  detail {}",
                        if d.completed { "x" } else { " " },
                        goal.header.title,
                        format_duration(d.current_secs),
                        format_duration(d.target_secs),
                        progress_percent(d.target_secs, d.current_secs),
                        goal.header.id,
                        d.id
                    );
                }
            }
        }
        GoalCommand::Candidates { kind } => {
            let kind = parse_kind(&kind)?;
            let free = ActivityService::new(db, backend).without_goal(&user.id, kind)?;
            if free.is_empty() {
                println!("Every activity already has a {} goal", kind);
            }
            for a in free {
                println!("{}  {}", a.id, a.title);
            }
        }
        GoalCommand::Target {
            detail,
            hours,
            minutes,
        } => {
            let d = goals.set_target(&detail, hours, minutes)?;
            println!("Target set to {}", format_duration(d.target_secs));
        }
        GoalCommand::Delete { goal } => {
            goals.delete(&goal)?;
            println!("Goal deleted");
        }
    }
    Ok(())
}

pub fn handle_stats(period: &str, offset: i32, user: &User, db: &Database) -> Result<(), CliError> {
    let period = Period::relative(parse_kind(period)?, today(), offset);
    let service = StatsService::new(db);
    service.update_for_period(&user.id, &period, today())?;
    println!("{}", period.label());
    println!(
        "{:<24} {:>9} {:>6} {:>6} {:>7}",
        "Activity", "Time", "Done", "Missed", "Pending"
    );
    for row in service.for_period(&user.id, &period)? {
        let s = &row.stats;
        println!(
            "{:<24} {:>9} {:>6} {:>6} {:>7}",
            row.title,
            format_duration(s.total_secs),
            s.completed_count,
            s.missed_count,
            s.pending_count
        );
    }
    Ok(())
}

pub fn handle_suggest(
    action: SuggestCommand,
    user: &User,
    config: &Config,
    db: &Database,
    backend: &dyn AlarmBackend,
) -> Result<(), CliError> {
    let service = SuggestionService::new(db, backend);
    match action {
        SuggestCommand::Run => {
            let client = config.ai.client()?.ok_or(CliError::AiDisabled)?;
            let analysis =
                AnalysisService::new(db, &client).with_threshold(config.ai.analysis_threshold);
            match analysis.run_cycle(&user.id, now())? {
                CycleOutcome::NotEnoughLogs(n) => println!(
                    "{} unanalyzed log(s); {} needed before asking for a suggestion",
                    n, config.ai.analysis_threshold
                ),
                CycleOutcome::ActivityMissing(id) => {
                    println!("Skipped logs of deleted activity {}", id)
                }
                CycleOutcome::Suggested(s) => {
                    println!("New suggestion (ID: {})", s.id);
                    print_suggestion(&s);
                }
            }
        }
        SuggestCommand::List => {
            let pending = service.pending(&user.id)?;
            if pending.is_empty() {
                println!("No pending suggestions");
            }
            for s in &pending {
                println!("{}", s.id);
                print_suggestion(s);
            }
        }
        SuggestCommand::Apply { id } => {
            let activity = service.apply(&id, now())?;
            println!(
                "'{}' now runs {} - {}",
                activity.title,
                format_hhmm(activity.start_time),
                format_hhmm(activity.end_time)
            );
        }
        SuggestCommand::Discard { id } => {
            service.discard(&id)?;
            println!("Suggestion discarded");
        }
    }
    Ok(())
}

fn print_suggestion(s: &Suggestion) {
    println!(
        "  {} ({}): {} - {}  =>  {} - {}",
        s.activity_title, s.requested_at, s.current_start, s.current_end, s.suggested_start, s.suggested_end
    );
    println!("  {}", s.reason);
}

pub fn handle_alarms(
    action: AlarmCommand,
    user: &User,
    alarms: &SqliteAlarmBackend,
    service: &ActivityService,
) -> Result<(), CliError> {
    match action {
        AlarmCommand::List { due } => {
            let rows = if due { alarms.due(now())? } else { alarms.scheduled()? };
            for alarm in rows {
                println!(
                    "{}  {}  {}  {}",
                    alarm.trigger_at.format("%Y-%m-%d %H:%M"),
                    alarm.day,
                    alarm.key,
                    alarm.body
                );
            }
        }
        AlarmCommand::Fire => {
            let fired = alarms.fire_due(now())?;
            if fired.is_empty() {
                println!("No reminders due");
            }
            for n in fired {
                println!("{}: {}", n.title, n.body);
            }
        }
        AlarmCommand::Reschedule => {
            let count = service.reschedule_all(&user.id, now())?;
            println!("Rescheduled {} reminder(s)", count);
        }
    }
    Ok(())
}
