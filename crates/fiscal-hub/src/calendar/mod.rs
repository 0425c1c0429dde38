//! Brazilian business-day calendar: Easter-derived movable holidays, the
//! fixed national holiday set, and backward business-day shifting.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use std::collections::BTreeSet;

/// Gregorian Easter Sunday via the Meeus/Jones/Butcher algorithm.
///
/// Integer arithmetic only; exact for every year from 1583 onward.
pub fn easter_sunday(year: i32) -> NaiveDate {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;

    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
        .expect("Meeus/Jones/Butcher stays within March or April")
}

/// National holidays for a year: the 8 fixed dates plus the 4 movable dates
/// anchored on Easter (Carnival Monday/Tuesday, Good Friday, Corpus Christi).
pub fn national_holidays(year: i32) -> BTreeSet<NaiveDate> {
    let easter = easter_sunday(year);
    let fixed = [
        (1, 1),
        (4, 21),
        (5, 1),
        (9, 7),
        (10, 12),
        (11, 2),
        (11, 15),
        (12, 25),
    ];

    let mut holidays: BTreeSet<NaiveDate> = fixed
        .iter()
        .map(|&(month, day)| {
            NaiveDate::from_ymd_opt(year, month, day).expect("fixed holidays are valid dates")
        })
        .collect();

    holidays.insert(easter - Duration::days(48));
    holidays.insert(easter - Duration::days(47));
    holidays.insert(easter - Duration::days(2));
    holidays.insert(easter + Duration::days(60));
    holidays
}

/// Walks backward until the date is neither a weekend day nor a holiday.
/// A date that is already a business day is returned unchanged.
pub fn previous_business_day(date: NaiveDate, holidays: &BTreeSet<NaiveDate>) -> NaiveDate {
    let mut current = date;
    while matches!(current.weekday(), Weekday::Sat | Weekday::Sun) || holidays.contains(&current) {
        current = current
            .pred_opt()
            .expect("calendar does not reach the minimum representable date");
    }
    current
}

/// Adds `offset` months to a year/month pair, normalizing across year
/// boundaries so the month stays within 1–12.
pub fn shift_year_month(year: i32, month: u32, offset: i32) -> (i32, u32) {
    let mut y = year;
    let mut m = month as i32 + offset;
    while m > 12 {
        m -= 12;
        y += 1;
    }
    while m < 1 {
        m += 12;
        y -= 1;
    }
    (y, m as u32)
}

/// Number of days in the given month.
pub fn last_day_of_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = shift_year_month(year, month, 1);
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .expect("normalized year/month forms a valid first-of-month")
        .pred_opt()
        .expect("calendar does not reach the minimum representable date")
        .day()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    #[test]
    fn easter_matches_reference_dates() {
        assert_eq!(easter_sunday(2024), date(2024, 3, 31));
        assert_eq!(easter_sunday(2025), date(2025, 4, 20));
        assert_eq!(easter_sunday(2026), date(2026, 4, 5));
    }

    #[test]
    fn movable_holidays_derive_from_easter() {
        let holidays = national_holidays(2025);
        assert!(holidays.contains(&date(2025, 3, 3)), "carnival monday");
        assert!(holidays.contains(&date(2025, 3, 4)), "carnival tuesday");
        assert!(holidays.contains(&date(2025, 4, 18)), "good friday");
        assert!(holidays.contains(&date(2025, 6, 19)), "corpus christi");
        assert_eq!(holidays.len(), 12);
    }

    #[test]
    fn business_day_is_identity_on_weekdays() {
        let holidays = national_holidays(2025);
        assert_eq!(
            previous_business_day(date(2025, 4, 23), &holidays),
            date(2025, 4, 23)
        );
    }

    #[test]
    fn weekend_shifts_back_to_friday() {
        let holidays = national_holidays(2025);
        assert_eq!(
            previous_business_day(date(2025, 4, 26), &holidays),
            date(2025, 4, 25)
        );
        assert_eq!(
            previous_business_day(date(2025, 4, 27), &holidays),
            date(2025, 4, 25)
        );
    }

    #[test]
    fn holiday_chain_walks_past_carnival_and_weekend() {
        let holidays = national_holidays(2025);
        // Carnival Tuesday -> Monday -> weekend -> previous Friday.
        assert_eq!(
            previous_business_day(date(2025, 3, 4), &holidays),
            date(2025, 2, 28)
        );
    }

    #[test]
    fn labor_day_shifts_to_previous_weekday() {
        let holidays = national_holidays(2025);
        assert_eq!(
            previous_business_day(date(2025, 5, 1), &holidays),
            date(2025, 4, 30)
        );
    }

    #[test]
    fn month_shift_normalizes_across_year_boundaries() {
        assert_eq!(shift_year_month(2025, 12, 1), (2026, 1));
        assert_eq!(shift_year_month(2025, 1, -1), (2024, 12));
        assert_eq!(shift_year_month(2025, 6, 0), (2025, 6));
        assert_eq!(shift_year_month(2025, 11, 14), (2027, 1));
    }

    #[test]
    fn month_lengths_account_for_leap_years() {
        assert_eq!(last_day_of_month(2024, 2), 29);
        assert_eq!(last_day_of_month(2025, 2), 28);
        assert_eq!(last_day_of_month(2025, 12), 31);
        assert_eq!(last_day_of_month(2026, 4), 30);
    }
}
