//! Trading-day calendar (weekdays only, no exchange holidays).

use chrono::{Datelike, Duration, NaiveDate, Weekday};

use crate::config::{TIME_EPSILON, TRADING_DAYS_PER_YEAR};

pub fn is_trading_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Weekdays `d` with `start < d <= end`. Zero when `end <= start`.
pub fn business_days(start: NaiveDate, end: NaiveDate) -> i64 {
    if end <= start {
        return 0;
    }
    let total = (end - start).num_days();
    let full_weeks = total / 7;
    let mut count = full_weeks * 5;
    let mut day = start + Duration::days(full_weeks * 7);
    while day < end {
        day += Duration::days(1);
        if is_trading_day(day) {
            count += 1;
        }
    }
    count
}

/// Weekdays in the closed interval `[start, end]`.
pub fn trading_days_inclusive(start: NaiveDate, end: NaiveDate) -> i64 {
    if end < start {
        return 0;
    }
    business_days(start, end) + i64::from(is_trading_day(start))
}

/// Trading-day year fraction, floored at `TIME_EPSILON`.
pub fn year_fraction(start: NaiveDate, end: NaiveDate) -> f64 {
    (business_days(start, end) as f64 / TRADING_DAYS_PER_YEAR).max(TIME_EPSILON)
}

/// Time left on a leg once the event day has elapsed.
///
/// One trading day (the event day itself) is consumed between entry and
/// repricing, hence the `- 1`.
pub fn remaining_years_after_event(event_date: NaiveDate, expiry: NaiveDate) -> f64 {
    let days = (trading_days_inclusive(event_date, expiry) - 1).max(0);
    (days as f64 / TRADING_DAYS_PER_YEAR).max(TIME_EPSILON)
}

/// First trading day on or after `date`.
pub fn on_or_after(date: NaiveDate) -> NaiveDate {
    let mut day = date;
    while !is_trading_day(day) {
        day += Duration::days(1);
    }
    day
}

/// Last trading day strictly before `date`.
pub fn previous_trading_day(date: NaiveDate) -> NaiveDate {
    let mut day = date - Duration::days(1);
    while !is_trading_day(day) {
        day -= Duration::days(1);
    }
    day
}

/// Move forward `n` trading days.
pub fn add_trading_days(date: NaiveDate, n: u32) -> NaiveDate {
    let mut day = date;
    let mut left = n;
    while left > 0 {
        day += Duration::days(1);
        if is_trading_day(day) {
            left -= 1;
        }
    }
    day
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_business_days_excludes_start() {
        // Fri -> Mon
        assert_eq!(business_days(d(2026, 1, 2), d(2026, 1, 5)), 1);
        // Mon -> Fri
        assert_eq!(business_days(d(2026, 1, 5), d(2026, 1, 9)), 4);
        assert_eq!(business_days(d(2026, 1, 5), d(2026, 1, 5)), 0);
        assert_eq!(business_days(d(2026, 1, 9), d(2026, 1, 5)), 0);
    }

    #[test]
    fn test_business_days_matches_naive_count() {
        let start = d(2025, 12, 17);
        for offset in 0..60 {
            let end = start + Duration::days(offset);
            let naive = start
                .iter_days()
                .skip(1)
                .take_while(|day| *day <= end)
                .filter(|day| is_trading_day(*day))
                .count() as i64;
            assert_eq!(business_days(start, end), naive, "offset {}", offset);
        }
    }

    #[test]
    fn test_remaining_time_subtracts_event_day() {
        // Mon event, Wed expiry: Mon/Tue/Wed inclusive = 3, minus 1
        let t = remaining_years_after_event(d(2026, 1, 5), d(2026, 1, 7));
        assert_relative_eq!(t, 2.0 / 252.0, epsilon = 1e-12);

        // Expiry on event day floors to epsilon
        let t = remaining_years_after_event(d(2026, 1, 5), d(2026, 1, 5));
        assert_relative_eq!(t, TIME_EPSILON);
    }

    #[test]
    fn test_year_fraction_floor() {
        assert_relative_eq!(year_fraction(d(2026, 1, 5), d(2026, 1, 5)), TIME_EPSILON);
        assert_relative_eq!(
            year_fraction(d(2026, 1, 2), d(2026, 1, 9)),
            5.0 / 252.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_trading_day_navigation() {
        assert_eq!(on_or_after(d(2026, 1, 3)), d(2026, 1, 5));
        assert_eq!(previous_trading_day(d(2026, 1, 5)), d(2026, 1, 2));
        assert_eq!(add_trading_days(d(2026, 1, 2), 3), d(2026, 1, 7));
    }
}
