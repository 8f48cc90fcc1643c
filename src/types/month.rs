use chrono::{Datelike, Months, NaiveDate};

/// Truncate a date to the first day of its month
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Build a first-of-month date, `None` for an invalid year/month pair
pub fn month_of(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// Move a month forward (or backward for negative `months`), day-of-month is dropped
pub fn shift_months(date: NaiveDate, months: i32) -> Option<NaiveDate> {
    let start = month_start(date);
    if months >= 0 {
        start.checked_add_months(Months::new(months as u32))
    } else {
        start.checked_sub_months(Months::new(months.unsigned_abs()))
    }
}

/// Whole calendar months from `start` to `end` (negative when `end` is earlier)
pub fn months_between(start: NaiveDate, end: NaiveDate) -> i32 {
    (end.year() - start.year()) * 12 + (end.month() as i32 - start.month() as i32)
}

/// Calendar quarter 1..=4
pub fn quarter(date: NaiveDate) -> u32 {
    (date.month() - 1) / 3 + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_month_start() {
        assert_eq!(month_start(ymd(2024, 5, 31)), ymd(2024, 5, 1));
        assert_eq!(month_start(ymd(2024, 5, 1)), ymd(2024, 5, 1));
    }

    #[test]
    fn test_shift_months_ignores_day_of_month() {
        assert_eq!(shift_months(ymd(2024, 5, 1), 3), Some(ymd(2024, 8, 1)));
        assert_eq!(shift_months(ymd(2024, 1, 31), 1), Some(ymd(2024, 2, 1)));
        assert_eq!(shift_months(ymd(2024, 11, 1), 2), Some(ymd(2025, 1, 1)));
        assert_eq!(shift_months(ymd(2024, 2, 1), -3), Some(ymd(2023, 11, 1)));
    }

    #[test]
    fn test_months_between() {
        assert_eq!(months_between(ymd(2024, 5, 1), ymd(2024, 8, 1)), 3);
        assert_eq!(months_between(ymd(2023, 12, 1), ymd(2024, 1, 1)), 1);
        assert_eq!(months_between(ymd(2024, 3, 1), ymd(2024, 1, 1)), -2);
    }

    #[test]
    fn test_quarter() {
        assert_eq!(quarter(ymd(2024, 1, 1)), 1);
        assert_eq!(quarter(ymd(2024, 6, 1)), 2);
        assert_eq!(quarter(ymd(2024, 12, 1)), 4);
    }
}
