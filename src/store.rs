//! Observable screen state: a value plus callbacks notified after each update.

use chrono::NaiveDate;

use crate::logs::DaySummary;
use crate::models::{ActivityWithStatus, GoalWithDetail, Suggestion};
use crate::period::Period;
use crate::stats::StatsRow;

pub type SubscriptionId = u64;

type Subscriber<S> = Box<dyn Fn(&S)>;

pub struct Store<S> {
    state: S,
    next_id: SubscriptionId,
    subscribers: Vec<(SubscriptionId, Subscriber<S>)>,
}

impl<S> Store<S> {
    pub fn new(state: S) -> Self {
        Self {
            state,
            next_id: 0,
            subscribers: Vec::new(),
        }
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    /// Mutate the state, then notify every subscriber once
    pub fn update<F: FnOnce(&mut S)>(&mut self, f: F) {
        f(&mut self.state);
        for (_, subscriber) in &self.subscribers {
            subscriber(&self.state);
        }
    }

    pub fn subscribe<F: Fn(&S) + 'static>(&mut self, f: F) -> SubscriptionId {
        let id = self.next_id;
        self.next_id += 1;
        self.subscribers.push((id, Box::new(f)));
        id
    }

    /// Returns false if `id` was not subscribed
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }
}

/// Everything the dashboard screens render
#[derive(Debug, Clone)]
pub struct DashboardState {
    pub user_id: String,
    pub date: NaiveDate,
    pub today: Vec<ActivityWithStatus>,
    pub goals: Vec<GoalWithDetail>,
    pub stats_period: Period,
    pub stats: Vec<StatsRow>,
    pub day_summary: DaySummary,
    pub suggestions: Vec<Suggestion>,
    pub loading: bool,
    /// Last load failure, cleared by the next successful load
    pub error: Option<String>,
}

impl DashboardState {
    pub fn new(user_id: String, today: NaiveDate) -> Self {
        Self {
            user_id,
            date: today,
            today: Vec::new(),
            goals: Vec::new(),
            stats_period: Period::week_containing(today),
            stats: Vec::new(),
            day_summary: DaySummary::default(),
            suggestions: Vec::new(),
            loading: true,
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn subscribers_see_every_update() {
        let mut store = Store::new(0u32);
        let seen = Rc::new(Cell::new(0u32));
        let seen_in_cb = Rc::clone(&seen);
        store.subscribe(move |v| seen_in_cb.set(*v));

        store.update(|v| *v += 5);
        assert_eq!(seen.get(), 5);
        store.update(|v| *v *= 2);
        assert_eq!(seen.get(), 10);
        assert_eq!(*store.state(), 10);
    }

    #[test]
    fn unsubscribed_callbacks_stop_firing() {
        let mut store = Store::new(String::new());
        let calls = Rc::new(Cell::new(0));
        let c = Rc::clone(&calls);
        let id = store.subscribe(move |_| c.set(c.get() + 1));

        store.update(|s| s.push('a'));
        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        store.update(|s| s.push('b'));

        assert_eq!(calls.get(), 1);
        assert_eq!(store.state(), "ab");
    }

    #[test]
    fn dashboard_starts_on_current_week() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let state = DashboardState::new("u1".to_string(), today);
        assert_eq!(state.stats_period.start, NaiveDate::from_ymd_opt(2026, 10, 12).unwrap());
        assert!(state.loading);
        assert!(state.error.is_none());
    }
}
