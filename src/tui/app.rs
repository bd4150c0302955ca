use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

use crate::activities::ActivityService;
use crate::ai::SuggestionModel;
use crate::goals::GoalService;
use crate::logs::LogService;
use crate::models::{PeriodKind, User};
use crate::notifications::{AlarmBackend, MemoryAlarmBackend, SqliteAlarmBackend};
use crate::period::Period;
use crate::stats::StatsService;
use crate::store::{DashboardState, Store};
use crate::suggestions::{AnalysisService, CycleOutcome, SuggestionService};
use crate::tui::error::TuiError;
use crate::utils::{format_duration, now, today};
use crate::worker::RefreshQueue;
use crate::{Config, Database};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Today,
    Goals,
    Stats,
    Suggestions,
}

impl Tab {
    pub const ALL: [Tab; 4] = [Tab::Today, Tab::Goals, Tab::Stats, Tab::Suggestions];

    pub fn title(self) -> &'static str {
        match self {
            Tab::Today => "Today",
            Tab::Goals => "Goals",
            Tab::Stats => "Stats",
            Tab::Suggestions => "Suggestions",
        }
    }

    pub fn index(self) -> usize {
        Self::ALL.iter().position(|t| *t == self).unwrap_or(0)
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn previous(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    View,
    Help,
    Confirm,
}

/// Destructive action waiting for a yes/no
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
    DeleteGoal { goal_id: String, title: String },
    DiscardSuggestion { suggestion_id: String, title: String },
}

impl PendingAction {
    pub fn prompt(&self) -> String {
        match self {
            PendingAction::DeleteGoal { title, .. } => {
                format!("Delete the goal for '{}' and its history?", title)
            }
            PendingAction::DiscardSuggestion { title, .. } => {
                format!("Discard the suggestion for '{}'?", title)
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct StatusState {
    pub message: Option<String>,
    pub message_time: Option<Instant>,
}

pub struct App {
    pub config: Config,
    pub database: Database,
    pub store: Store<DashboardState>,

    pub current_tab: Tab,
    pub mode: Mode,
    pub selected_index: usize,
    pub pending: Option<PendingAction>,
    /// 0 = confirm, 1 = cancel
    pub confirm_selection: usize,
    pub status: StatusState,

    refresh_queue: RefreshQueue,
    model: Option<Box<dyn SuggestionModel>>,
    dirty: Rc<Cell<bool>>,
}

/// Run `f` with the configured reminder backend
fn with_alarms<R>(database: &Database, enabled: bool, f: impl FnOnce(&dyn AlarmBackend) -> R) -> R {
    if enabled {
        f(&SqliteAlarmBackend::new(database))
    } else {
        f(&MemoryAlarmBackend::new())
    }
}

impl App {
    pub fn new(config: Config, database: Database, user: User) -> Result<Self, TuiError> {
        let model: Option<Box<dyn SuggestionModel>> = match config.ai.client() {
            Ok(client) => client.map(|c| Box::new(c) as Box<dyn SuggestionModel>),
            Err(e) => {
                log::info!("automatic analysis off: {}", e);
                None
            }
        };
        Self::with_model(config, database, user, model)
    }

    /// Start the dashboard with an explicit suggestion model
    pub fn with_model(
        config: Config,
        database: Database,
        user: User,
        model: Option<Box<dyn SuggestionModel>>,
    ) -> Result<Self, TuiError> {
        let mut store = Store::new(DashboardState::new(user.id, today()));
        let dirty = Rc::new(Cell::new(true));
        let flag = Rc::clone(&dirty);
        store.subscribe(move |_| flag.set(true));

        let mut app = Self {
            config,
            database,
            store,
            current_tab: Tab::Today,
            mode: Mode::View,
            selected_index: 0,
            pending: None,
            confirm_selection: 0,
            status: StatusState::default(),
            refresh_queue: RefreshQueue::new(),
            model,
            dirty,
        };
        app.run_background_refresh();
        app.fire_due_alarms();
        // logs recorded elsewhere may already have reached the threshold
        if let Some(message) = app.run_analysis(false) {
            app.set_status_message(message);
        }
        app.reload()?;
        Ok(app)
    }

    pub fn user_id(&self) -> String {
        self.store.state().user_id.clone()
    }

    /// True once after anything visible changed
    pub fn take_dirty(&self) -> bool {
        self.dirty.replace(false)
    }

    pub fn mark_dirty(&self) {
        self.dirty.set(true);
    }

    /// Reload every dashboard section from the database
    pub fn reload(&mut self) -> Result<(), TuiError> {
        let user_id = self.user_id();
        let date = today();
        let db = &self.database;

        let planned = with_alarms(db, false, |backend| {
            ActivityService::new(db, backend).for_date(&user_id, date)
        })?;
        let goal_service = GoalService::new(db);
        let mut goals = goal_service.list(&user_id, PeriodKind::Weekly, date)?;
        goals.extend(goal_service.list(&user_id, PeriodKind::Monthly, date)?);
        let summary = LogService::new(db).daily_summary(&user_id, date)?;
        let suggestions = SuggestionService::new(db, &MemoryAlarmBackend::new()).pending(&user_id)?;

        self.store.update(|s| {
            s.date = date;
            s.today = planned;
            s.goals = goals;
            s.day_summary = summary;
            s.suggestions = suggestions;
        });
        self.reload_stats()?;
        self.store.update(|s| {
            s.loading = false;
            s.error = None;
        });
        self.clamp_selection();
        Ok(())
    }

    /// Recompute and reload statistics for the period on screen
    pub fn reload_stats(&mut self) -> Result<(), TuiError> {
        let user_id = self.user_id();
        let period = self.store.state().stats_period;
        let service = StatsService::new(&self.database);
        service.update_for_period(&user_id, &period, today())?;
        let rows = service.for_period(&user_id, &period)?;
        self.store.update(|s| s.stats = rows);
        Ok(())
    }

    pub fn current_len(&self) -> usize {
        let state = self.store.state();
        match self.current_tab {
            Tab::Today => state.today.len(),
            Tab::Goals => state.goals.len(),
            Tab::Stats => state.stats.len(),
            Tab::Suggestions => state.suggestions.len(),
        }
    }

    fn clamp_selection(&mut self) {
        let len = self.current_len();
        self.selected_index = if len == 0 {
            0
        } else {
            self.selected_index.min(len - 1)
        };
    }

    pub fn switch_tab(&mut self, tab: Tab) {
        if self.current_tab != tab {
            self.current_tab = tab;
            self.selected_index = 0;
            self.mark_dirty();
        }
    }

    pub fn move_selection(&mut self, delta: isize) {
        let len = self.current_len();
        if len == 0 {
            return;
        }
        let next = (self.selected_index as isize + delta).clamp(0, len as isize - 1);
        self.selected_index = next as usize;
        self.mark_dirty();
    }

    /// Move the Stats tab one or more periods back or forward
    pub fn shift_stats_period(&mut self, n: i32) {
        self.store.update(|s| s.stats_period = s.stats_period.shift(n));
        self.selected_index = 0;
        if let Err(e) = self.reload_stats() {
            self.set_status_message(format!("Failed to load stats: {}", e));
        }
    }

    /// Switch the Stats tab between the current week and the current month
    pub fn toggle_stats_kind(&mut self) {
        let kind = match self.store.state().stats_period.kind {
            PeriodKind::Weekly => PeriodKind::Monthly,
            PeriodKind::Monthly => PeriodKind::Weekly,
        };
        self.store
            .update(|s| s.stats_period = Period::containing(kind, s.date));
        self.selected_index = 0;
        if let Err(e) = self.reload_stats() {
            self.set_status_message(format!("Failed to load stats: {}", e));
        }
    }

    /// Record the selected planned activity as done over its planned window
    pub fn log_selected(&mut self) {
        let Some(item) = self.store.state().today.get(self.selected_index).cloned() else {
            self.set_status_message("Nothing selected".to_string());
            return;
        };
        if item.completed {
            self.set_status_message(format!("'{}' is already logged today", item.activity.title));
            return;
        }
        let date = self.store.state().date;
        let start = date.and_time(item.activity.start_time);
        let end = date.and_time(item.activity.end_time);
        match LogService::new(&self.database).record(&item.activity, start, end) {
            Ok(log) => {
                self.queue_refresh();
                self.run_background_refresh();
                let analysis = self.run_analysis(false);
                self.reload_or_report();
                let logged = format!(
                    "Logged {} of {}",
                    format_duration(log.duration_secs),
                    item.activity.title
                );
                self.set_status_message(match analysis {
                    Some(message) => format!("{}. {}", logged, message),
                    None => logged,
                });
            }
            Err(e) => self.set_status_message(format!("Failed to log: {}", e)),
        }
    }

    pub fn apply_selected_suggestion(&mut self) {
        let Some(suggestion) = self.store.state().suggestions.get(self.selected_index).cloned()
        else {
            self.set_status_message("No suggestion selected".to_string());
            return;
        };
        let result = with_alarms(&self.database, self.config.notifications.enabled, |backend| {
            SuggestionService::new(&self.database, backend).apply(&suggestion.id, now())
        });
        match result {
            Ok(activity) => {
                self.reload_or_report();
                self.set_status_message(format!("'{}' moved to {}", activity.title, activity.window_label()));
            }
            Err(e) => self.set_status_message(format!("Failed to apply: {}", e)),
        }
    }

    /// Ask before deleting the selected goal or discarding a suggestion
    pub fn request_delete(&mut self) {
        let state = self.store.state();
        let action = match self.current_tab {
            Tab::Goals => state.goals.get(self.selected_index).map(|g| PendingAction::DeleteGoal {
                goal_id: g.header.id.clone(),
                title: g.header.title.clone(),
            }),
            Tab::Suggestions => state.suggestions.get(self.selected_index).map(|s| {
                PendingAction::DiscardSuggestion {
                    suggestion_id: s.id.clone(),
                    title: s.activity_title.clone(),
                }
            }),
            _ => None,
        };
        if let Some(action) = action {
            self.pending = Some(action);
            self.confirm_selection = 0;
            self.mode = Mode::Confirm;
            self.mark_dirty();
        }
    }

    pub fn cancel_pending(&mut self) {
        self.pending = None;
        self.mode = Mode::View;
        self.mark_dirty();
    }

    pub fn confirm_pending(&mut self) {
        let Some(action) = self.pending.take() else {
            self.mode = Mode::View;
            return;
        };
        self.mode = Mode::View;
        let result = match &action {
            PendingAction::DeleteGoal { goal_id, .. } => GoalService::new(&self.database)
                .delete(goal_id)
                .map(|_| "Goal deleted")
                .map_err(|e| e.to_string()),
            PendingAction::DiscardSuggestion { suggestion_id, .. } => {
                SuggestionService::new(&self.database, &MemoryAlarmBackend::new())
                    .discard(suggestion_id)
                    .map(|_| "Suggestion discarded")
                    .map_err(|e| e.to_string())
            }
        };
        match result {
            Ok(msg) => {
                self.reload_or_report();
                self.set_status_message(msg.to_string());
            }
            Err(e) => self.set_status_message(format!("Failed: {}", e)),
        }
    }

    pub fn queue_refresh(&mut self) {
        let user_id = self.user_id();
        self.refresh_queue.enqueue(&user_id);
    }

    /// Drain queued goal/stats refresh jobs
    pub fn run_background_refresh(&mut self) {
        self.queue_refresh();
        if let Err(e) = self.refresh_queue.run_pending(&self.database, today()) {
            log::warn!("goal refresh failed: {}", e);
            self.set_status_message(format!("Refresh failed: {}", e));
        }
    }

    /// Full refresh: goals, stats, then one analysis cycle when AI is configured
    pub fn refresh(&mut self) {
        self.store.update(|s| s.loading = true);
        self.run_background_refresh();
        let message = self.run_analysis(true);
        self.reload_or_report();
        if let Some(message) = message {
            self.set_status_message(message);
        }
    }

    /// One analysis cycle. `verbose` also reports the quiet outcomes, for
    /// an explicit refresh.
    fn run_analysis(&self, verbose: bool) -> Option<String> {
        let Some(model) = self.model.as_deref() else {
            return (verbose && self.config.ai.enabled)
                .then(|| "Refreshed (no AI key configured)".to_string());
        };
        let analysis = AnalysisService::new(&self.database, model)
            .with_threshold(self.config.ai.analysis_threshold);
        match analysis.run_cycle(&self.user_id(), now()) {
            Ok(CycleOutcome::Suggested(s)) => {
                Some(format!("New suggestion for {}", s.activity_title))
            }
            Ok(CycleOutcome::NotEnoughLogs(_)) | Ok(CycleOutcome::ActivityMissing(_)) => {
                verbose.then(|| "Refreshed".to_string())
            }
            Err(e) => {
                log::warn!("analysis failed: {}", e);
                Some(format!("Analysis failed: {}", e))
            }
        }
    }

    /// Surface reminders that came due while the app was closed or running
    pub fn fire_due_alarms(&mut self) {
        if !self.config.notifications.enabled {
            return;
        }
        match SqliteAlarmBackend::new(&self.database).fire_due(now()) {
            Ok(fired) => {
                if let Some(last) = fired.last() {
                    self.set_status_message(format!("{}: {}", last.title, last.body));
                }
            }
            Err(e) => log::warn!("firing reminders failed: {}", e),
        }
    }

    fn reload_or_report(&mut self) {
        if let Err(e) = self.reload() {
            let message = format!("Failed to reload data: {}", e);
            self.store.update(|s| {
                s.loading = false;
                s.error = Some(message.clone());
            });
            self.set_status_message(message);
        }
    }

    pub fn set_status_message(&mut self, message: String) {
        self.status.message = Some(message);
        self.status.message_time = Some(Instant::now());
        self.mark_dirty();
    }

    pub fn clear_status_message(&mut self) {
        self.status.message = None;
        self.status.message_time = None;
        self.mark_dirty();
    }

    pub fn check_status_message_timeout(&mut self) {
        if let Some(time) = self.status.message_time {
            if time.elapsed().as_secs() >= self.config.status_timeout_secs {
                self.clear_status_message();
            }
        }
    }
}
