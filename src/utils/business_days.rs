use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// Monday to Friday days in `[start, end]`. Zero when the range is inverted.
pub fn count_business_days(start: NaiveDate, end: NaiveDate) -> i32 {
    if end < start {
        return 0;
    }
    let total = (end - start).num_days() + 1;
    let full_weeks = total / 7;
    let mut days = full_weeks * 5;

    let mut day = start + Duration::days(full_weeks * 7);
    while day <= end {
        if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
            days += 1;
        }
        day += Duration::days(1);
    }
    days as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn single_weekday_counts_once() {
        // 2026-03-02 is a Monday
        assert_eq!(count_business_days(d(2026, 3, 2), d(2026, 3, 2)), 1);
    }

    #[test]
    fn weekend_only_is_zero() {
        assert_eq!(count_business_days(d(2026, 3, 7), d(2026, 3, 8)), 0);
    }

    #[test]
    fn full_week_and_spans() {
        assert_eq!(count_business_days(d(2026, 3, 2), d(2026, 3, 8)), 5);
        // Friday to the following Monday
        assert_eq!(count_business_days(d(2026, 3, 6), d(2026, 3, 9)), 2);
        assert_eq!(count_business_days(d(2026, 3, 1), d(2026, 3, 31)), 22);
    }

    #[test]
    fn inverted_range_is_zero() {
        assert_eq!(count_business_days(d(2026, 3, 9), d(2026, 3, 2)), 0);
    }
}
