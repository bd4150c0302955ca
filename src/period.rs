//! Calendar periods (Monday-to-Sunday weeks and calendar months) and the
//! counting rules used by statistics and goal progress.

use chrono::{Datelike, Duration, Months, NaiveDate};
use std::collections::HashSet;

use crate::models::{DayLabel, LogEntry, PeriodKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub kind: PeriodKind,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Period {
    /// The Monday-to-Sunday week containing `date`
    pub fn week_containing(date: NaiveDate) -> Self {
        let start = date - Duration::days(date.weekday().num_days_from_monday() as i64);
        Self {
            kind: PeriodKind::Weekly,
            start,
            end: start + Duration::days(6),
        }
    }

    pub fn month_containing(date: NaiveDate) -> Self {
        let start = date - Duration::days(date.day0() as i64);
        // only the last month chrono can represent has no successor
        let end = start
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .unwrap_or(NaiveDate::MAX);
        Self {
            kind: PeriodKind::Monthly,
            start,
            end,
        }
    }

    pub fn containing(kind: PeriodKind, date: NaiveDate) -> Self {
        match kind {
            PeriodKind::Weekly => Self::week_containing(date),
            PeriodKind::Monthly => Self::month_containing(date),
        }
    }

    /// Shift by `n` whole periods (negative goes back in time).
    /// Saturates at the calendar bounds chrono can represent.
    pub fn shift(&self, n: i32) -> Self {
        match self.kind {
            PeriodKind::Weekly => self
                .start
                .checked_add_signed(Duration::weeks(n as i64))
                .map(Self::week_containing)
                .unwrap_or(*self),
            PeriodKind::Monthly => {
                let months = Months::new(n.unsigned_abs());
                let shifted = if n >= 0 {
                    self.start.checked_add_months(months)
                } else {
                    self.start.checked_sub_months(months)
                };
                shifted.map(Self::month_containing).unwrap_or(*self)
            }
        }
    }

    /// Period of `kind` that is `offset` periods away from the one containing `today`
    pub fn relative(kind: PeriodKind, today: NaiveDate, offset: i32) -> Self {
        Self::containing(kind, today).shift(offset)
    }

    pub fn previous(&self) -> Self {
        self.shift(-1)
    }

    pub fn next(&self) -> Self {
        self.shift(1)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }

    pub fn label(&self) -> String {
        match self.kind {
            PeriodKind::Weekly => format!(
                "Week {} - {}",
                self.start.format("%d/%m"),
                self.end.format("%d/%m")
            ),
            PeriodKind::Monthly => format!("Month {}", self.start.format("%m/%Y")),
        }
    }
}

/// Occurrence counts for one activity over one period
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PeriodCounts {
    pub expected: u32,
    pub completed: u32,
    pub missed: u32,
    pub pending: u32,
    pub total_secs: i64,
}

fn repeats_on(repeat_days: &[DayLabel], date: NaiveDate) -> bool {
    repeat_days.contains(&DayLabel::from_weekday(date.weekday()))
}

/// Number of dates in the period whose weekday is in `repeat_days`
pub fn expected_occurrences(repeat_days: &[DayLabel], period: &Period) -> u32 {
    period.days().filter(|d| repeats_on(repeat_days, *d)).count() as u32
}

/// Occurrences from `max(today, period.start)` through the period end that
/// have no log yet. Zero once the period is over.
pub fn pending_occurrences(
    repeat_days: &[DayLabel],
    logs: &[LogEntry],
    period: &Period,
    today: NaiveDate,
) -> u32 {
    if today > period.end {
        return 0;
    }
    let logged: HashSet<NaiveDate> = logs.iter().map(|l| l.date).collect();
    let from = today.max(period.start);
    period
        .days()
        .filter(|d| *d >= from && repeats_on(repeat_days, *d) && !logged.contains(d))
        .count() as u32
}

/// Aggregate the logs of one activity over a period.
///
/// Logs outside the period are ignored. Every completed log counts, so two
/// logs on the same day count twice.
pub fn aggregate(
    repeat_days: &[DayLabel],
    logs: &[LogEntry],
    period: &Period,
    today: NaiveDate,
) -> PeriodCounts {
    let in_period: Vec<LogEntry> = logs
        .iter()
        .filter(|l| period.contains(l.date))
        .cloned()
        .collect();

    let expected = expected_occurrences(repeat_days, period);
    let completed = in_period.iter().filter(|l| l.completed).count() as u32;
    let total_secs = in_period.iter().map(|l| l.duration_secs).sum();

    PeriodCounts {
        expected,
        completed,
        missed: expected.saturating_sub(completed),
        pending: pending_occurrences(repeat_days, &in_period, period, today),
        total_secs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn log_on(day: NaiveDate, secs: i64) -> LogEntry {
        let start = day.and_hms_opt(8, 0, 0).unwrap();
        LogEntry {
            id: String::new(),
            activity_id: "a1".to_string(),
            user_id: "u1".to_string(),
            date: day,
            day_label: DayLabel::from_weekday(day.weekday()),
            start_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            actual_start: start,
            actual_end: start + Duration::seconds(secs),
            duration_secs: secs,
            completed: true,
            analyzed: false,
        }
    }

    #[test]
    fn week_starts_on_monday_even_from_sunday() {
        // 2026-10-18 is a Sunday
        let week = Period::week_containing(date(2026, 10, 18));
        assert_eq!(week.start, date(2026, 10, 12));
        assert_eq!(week.end, date(2026, 10, 18));
        assert_eq!(week.label(), "Week 12/10 - 18/10");
    }

    #[test]
    fn month_bounds_handle_leap_years() {
        let feb = Period::month_containing(date(2028, 2, 14));
        assert_eq!(feb.start, date(2028, 2, 1));
        assert_eq!(feb.end, date(2028, 2, 29));
        let feb = Period::month_containing(date(2026, 2, 14));
        assert_eq!(feb.end, date(2026, 2, 28));
        assert_eq!(Period::month_containing(date(2026, 12, 31)).end, date(2026, 12, 31));
        assert_eq!(feb.label(), "Month 02/2026");
    }

    #[test]
    fn month_end_follows_century_leap_rules() {
        assert_eq!(Period::month_containing(date(2000, 2, 3)).end, date(2000, 2, 29));
        assert_eq!(Period::month_containing(date(2100, 2, 3)).end, date(2100, 2, 28));
        assert_eq!(Period::month_containing(date(2026, 4, 30)).end, date(2026, 4, 30));
    }

    #[test]
    fn shifting_crosses_year_boundaries() {
        let jan = Period::month_containing(date(2026, 1, 20));
        assert_eq!(jan.previous().start, date(2025, 12, 1));
        assert_eq!(jan.previous().end, date(2025, 12, 31));
        let week = Period::week_containing(date(2026, 1, 1));
        assert_eq!(week.next().start, date(2026, 1, 5));
        assert_eq!(
            Period::relative(PeriodKind::Monthly, date(2026, 3, 31), -1).start,
            date(2026, 2, 1)
        );
    }

    #[test]
    fn expected_counts_weekday_matches() {
        let october = Period::month_containing(date(2026, 10, 1));
        // October 2026 has four Mondays and five Thursdays
        assert_eq!(expected_occurrences(&[DayLabel::Mon], &october), 4);
        assert_eq!(expected_occurrences(&[DayLabel::Thu], &october), 5);
        assert_eq!(expected_occurrences(&[], &october), 0);
    }

    #[test]
    fn monday_wednesday_scenario() {
        let week = Period::week_containing(date(2026, 10, 12));
        let logs = vec![log_on(date(2026, 10, 12), 1800)];
        let days = [DayLabel::Mon, DayLabel::Wed];

        // Tuesday: Wednesday is still ahead
        let counts = aggregate(&days, &logs, &week, date(2026, 10, 13));
        assert_eq!(counts.expected, 2);
        assert_eq!(counts.completed, 1);
        assert_eq!(counts.missed, 1);
        assert_eq!(counts.pending, 1);
        assert_eq!(counts.total_secs, 1800);

        // Thursday: nothing left to do this week
        let counts = aggregate(&days, &logs, &week, date(2026, 10, 15));
        assert_eq!(counts.pending, 0);
        assert_eq!(counts.missed, 1);
    }

    #[test]
    fn pending_is_zero_after_period_end() {
        let week = Period::week_containing(date(2026, 10, 12));
        let counts = aggregate(&DayLabel::ALL, &[], &week, date(2026, 10, 19));
        assert_eq!(counts.pending, 0);
        assert_eq!(counts.missed, 7);
    }

    #[test]
    fn pending_only_counts_days_inside_future_period() {
        let next_week = Period::week_containing(date(2026, 10, 19));
        let counts = aggregate(&[DayLabel::Mon], &[], &next_week, date(2026, 10, 14));
        assert_eq!(counts.pending, 1);
    }

    #[test]
    fn logs_outside_period_are_ignored() {
        let week = Period::week_containing(date(2026, 10, 12));
        let logs = vec![log_on(date(2026, 10, 11), 600), log_on(date(2026, 10, 14), 900)];
        let counts = aggregate(&[DayLabel::Wed], &logs, &week, date(2026, 10, 20));
        assert_eq!(counts.completed, 1);
        assert_eq!(counts.total_secs, 900);
    }

    #[test]
    fn same_day_logs_all_count() {
        let week = Period::week_containing(date(2026, 10, 12));
        let logs = vec![log_on(date(2026, 10, 12), 600), log_on(date(2026, 10, 12), 600)];
        let counts = aggregate(&[DayLabel::Mon], &logs, &week, date(2026, 10, 20));
        assert_eq!(counts.completed, 2);
        assert_eq!(counts.missed, 0);
    }
}
