//! Day streak calculations
//!
//! Streaks count consecutive *local* calendar days.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};

use crate::stats::time_bucket::local_day;

/// Consecutive days in `days` ending at `today`. Zero if `today` itself is missing.
pub fn consecutive_days(days: &HashSet<NaiveDate>, today: NaiveDate) -> u32 {
    let mut count = 0;
    let mut day = today;
    while days.contains(&day) {
        count += 1;
        day = match day.pred_opt() {
            Some(prev) => prev,
            None => break,
        };
    }
    count
}

/// New value of a per-bucket streak after practicing at `now`.
///
/// Same day keeps the streak, the following day extends it and any gap
/// starts over at one. Practice dated before the last one leaves it alone.
pub fn extend_day_streak(current: u32, last_practiced: Option<DateTime<Utc>>, now: DateTime<Utc>) -> u32 {
    let Some(last) = last_practiced else {
        return 1;
    };

    let days_since = (local_day(now) - local_day(last)).num_days();
    match days_since {
        d if d < 0 => current.max(1),
        0 => current.max(1),
        1 => current + 1,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Local, TimeZone};

    fn local_noon(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Local
            .with_ymd_and_hms(y, m, d, 12, 0, 0)
            .single()
            .unwrap()
            .with_timezone(&Utc)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_consecutive_days() {
        let days: HashSet<_> = [date(2024, 3, 13), date(2024, 3, 14), date(2024, 3, 15), date(2024, 3, 10)]
            .into_iter()
            .collect();
        assert_eq!(consecutive_days(&days, date(2024, 3, 15)), 3);
        assert_eq!(consecutive_days(&days, date(2024, 3, 16)), 0);
        assert_eq!(consecutive_days(&HashSet::new(), date(2024, 3, 15)), 0);
    }

    #[test]
    fn test_streak_across_month_boundary() {
        let days: HashSet<_> = [date(2024, 2, 28), date(2024, 2, 29), date(2024, 3, 1)]
            .into_iter()
            .collect();
        assert_eq!(consecutive_days(&days, date(2024, 3, 1)), 3);
    }

    #[test]
    fn test_extend_day_streak() {
        let day1 = local_noon(2024, 3, 14);
        let day2 = local_noon(2024, 3, 15);
        assert_eq!(extend_day_streak(0, None, day1), 1);
        assert_eq!(extend_day_streak(1, Some(day1), day1 + Duration::hours(2)), 1);
        assert_eq!(extend_day_streak(1, Some(day1), day2), 2);
        assert_eq!(extend_day_streak(5, Some(day1), day2 + Duration::days(2)), 1);
        assert_eq!(extend_day_streak(4, Some(day2), day1), 4);
    }
}
