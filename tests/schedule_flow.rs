use std::cell::RefCell;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use tmk::activities::ActivityService;
use tmk::ai::{AiError, SuggestionModel};
use tmk::goals::GoalService;
use tmk::logs::LogService;
use tmk::models::{ActivityDraft, DayLabel, PeriodKind, PomodoroSettings, StatsStatus, User};
use tmk::notifications::SqliteAlarmBackend;
use tmk::period::Period;
use tmk::stats::StatsService;
use tmk::suggestions::{AnalysisService, CycleOutcome, SuggestionService};
use tmk::worker::RefreshQueue;
use tmk::Database;

fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 10, day)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

struct CannedModel {
    reply: String,
    prompts: RefCell<Vec<String>>,
}

impl SuggestionModel for CannedModel {
    fn generate(&self, prompt: &str) -> Result<Option<String>, AiError> {
        self.prompts.borrow_mut().push(prompt.to_string());
        Ok(Some(self.reply.clone()))
    }
}

fn open_db(dir: &tempfile::TempDir) -> Database {
    let path = dir.path().join("data").join("tmk.db");
    Database::new(path.to_str().unwrap()).unwrap()
}

#[test]
fn week_of_running() {
    let dir = tempfile::tempdir().unwrap();
    let db = open_db(&dir);
    let alarms = SqliteAlarmBackend::new(&db);
    let user = User::new("runner@example.com".to_string(), Some("Runner".to_string()));
    let user_id = db.insert_user(&user).unwrap();

    // Monday morning, before the first session
    let activities = ActivityService::new(&db, &alarms);
    let run = activities
        .create(
            &user_id,
            &ActivityDraft {
                title: "Run".to_string(),
                category: "Health".to_string(),
                start_time: hm(6, 0),
                end_time: hm(6, 30),
                repeat_days: vec![DayLabel::Mon, DayLabel::Wed, DayLabel::Fri],
                pomodoro: PomodoroSettings::default(),
            },
            at(12, 5, 0),
        )
        .unwrap();
    assert_eq!(alarms.scheduled().unwrap().len(), 3);

    let goals = GoalService::new(&db);
    let monday = at(12, 0, 0).date();
    goals.create(&run, PeriodKind::Weekly, 1, 0, monday).unwrap();

    let logs = LogService::new(&db);
    logs.record(&run, at(12, 6, 5), at(12, 6, 35)).unwrap();
    logs.record(&run, at(14, 6, 0), at(14, 6, 40)).unwrap();

    // Friday: background refresh brings goals and stats up to date
    let friday = at(16, 0, 0).date();
    let mut queue = RefreshQueue::new();
    queue.enqueue(&user_id);
    queue.run_pending(&db, friday).unwrap();

    let weekly = goals.refresh(&user_id, PeriodKind::Weekly, friday).unwrap();
    assert_eq!(weekly.len(), 1);
    assert_eq!(weekly[0].detail.current_secs, 70 * 60);
    assert!(weekly[0].detail.completed);

    let week = Period::containing(PeriodKind::Weekly, friday);
    let rows = StatsService::new(&db).for_period(&user_id, &week).unwrap();
    assert_eq!(rows.len(), 1);
    let s = &rows[0].stats;
    assert_eq!(rows[0].title, "Run");
    assert_eq!(s.total_secs, 70 * 60);
    assert_eq!(s.completed_count, 2);
    assert_eq!(s.missed_count, 1);
    assert_eq!(s.pending_count, 1);
    assert_eq!(s.status, StatsStatus::Pending);

    let today = activities.for_date(&user_id, friday).unwrap();
    assert_eq!(today.len(), 1);
    assert!(!today[0].completed);
}

#[test]
fn suggestion_is_requested_applied_and_reminders_follow() {
    let dir = tempfile::tempdir().unwrap();
    let db = open_db(&dir);
    let alarms = SqliteAlarmBackend::new(&db);
    let user_id = db
        .insert_user(&User::new("late@example.com".to_string(), None))
        .unwrap();

    let activities = ActivityService::new(&db, &alarms);
    let run = activities
        .create(
            &user_id,
            &ActivityDraft {
                title: "Run".to_string(),
                category: String::new(),
                start_time: hm(6, 0),
                end_time: hm(6, 30),
                repeat_days: vec![DayLabel::Mon, DayLabel::Wed, DayLabel::Fri],
                pomodoro: PomodoroSettings::default(),
            },
            at(12, 5, 0),
        )
        .unwrap();
    assert_eq!(run.category, "Other");

    let logs = LogService::new(&db);
    logs.record(&run, at(12, 6, 35), at(12, 7, 0)).unwrap();
    logs.record(&run, at(14, 6, 30), at(14, 7, 5)).unwrap();

    let model = CannedModel {
        reply: format!(
            "```json\n{{\"activityId\": \"{}\", \"activityTitle\": \"Run\", \"currentStart\": \"06:00\", \
             \"currentEnd\": \"06:30\", \"suggestedStart\": \"06:30\", \"suggestedEnd\": \"07:00\", \
             \"reason\": \"You start about 30 minutes late\"}}\n```",
            run.id
        ),
        prompts: RefCell::new(Vec::new()),
    };
    let analysis = AnalysisService::new(&db, &model).with_threshold(2);
    let outcome = analysis.run_cycle(&user_id, at(16, 7, 0)).unwrap();
    let CycleOutcome::Suggested(suggestion) = outcome else {
        panic!("expected a suggestion, got {:?}", outcome);
    };
    assert_eq!(suggestion.requested_at, "Fri, 16/10");
    assert_eq!(model.prompts.borrow().len(), 1);
    assert!(db.get_unanalyzed_logs(&user_id).unwrap().is_empty());

    // the batch was consumed, so a second cycle waits for new logs
    assert!(matches!(
        analysis.run_cycle(&user_id, at(16, 7, 1)).unwrap(),
        CycleOutcome::NotEnoughLogs(0)
    ));

    let suggestions = SuggestionService::new(&db, &alarms);
    assert_eq!(suggestions.pending(&user_id).unwrap().len(), 1);
    let moved = suggestions.apply(&suggestion.id, at(16, 7, 0)).unwrap();
    assert_eq!((moved.start_time, moved.end_time), (hm(6, 30), hm(7, 0)));
    assert!(suggestions.pending(&user_id).unwrap().is_empty());
    assert!(suggestions.apply(&suggestion.id, at(16, 7, 0)).is_err());

    let scheduled = alarms.scheduled().unwrap();
    assert_eq!(scheduled.len(), 3);
    for alarm in &scheduled {
        assert_eq!(alarm.trigger_at.time(), hm(6, 30));
        assert!(alarm.trigger_at > at(16, 7, 0));
    }

    activities.delete(&run.id).unwrap();
    assert!(alarms.scheduled().unwrap().is_empty());
    assert!(db.get_activity(&run.id).unwrap().is_none());
}

#[test]
fn reminders_of_a_vanished_activity_are_dropped_when_due() {
    let dir = tempfile::tempdir().unwrap();
    let db = open_db(&dir);
    let alarms = SqliteAlarmBackend::new(&db);
    let user_id = db
        .insert_user(&User::new("busy@example.com".to_string(), None))
        .unwrap();

    let activities = ActivityService::new(&db, &alarms);
    let draft = |title: &str, start: NaiveTime, end: NaiveTime| ActivityDraft {
        title: title.to_string(),
        category: "Study".to_string(),
        start_time: start,
        end_time: end,
        repeat_days: vec![DayLabel::Tue],
        pomodoro: PomodoroSettings::default(),
    };
    let read = activities
        .create(&user_id, &draft("Read", hm(7, 0), hm(7, 30)), at(12, 12, 0))
        .unwrap();
    let write = activities
        .create(&user_id, &draft("Write", hm(8, 0), hm(8, 30)), at(12, 12, 0))
        .unwrap();
    assert_eq!(alarms.scheduled().unwrap().len(), 2);

    // removed without going through the service, so its reminder is still queued
    db.delete_activity_with_goals(&read.id).unwrap();
    assert_eq!(alarms.due(at(13, 9, 0)).unwrap().len(), 2);

    let fired = alarms.fire_due(at(13, 9, 0)).unwrap();
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].activity_id, write.id);
    assert_eq!(fired[0].title, "Write");
    assert_eq!(fired[0].body, "Starts at 08:00 - ends at 08:30");

    let left = alarms.scheduled().unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].activity_id, write.id);
    assert_eq!(left[0].trigger_at, at(20, 8, 0));
}
