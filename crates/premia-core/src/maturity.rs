//! Expiration calendar rules.
//!
//! Options expire at 08:00 UTC. Labels use the `DDMMMYY` format
//! (e.g. `03NOV23`). Accepted maturities:
//! - dailies: 1 or 2 days out
//! - weeklies: any Friday up to 30 days out
//! - monthlies: the last Friday of a month, up to one year out

use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, TimeZone, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::ExpirationError;

/// Hour of day (UTC) at which every option expires.
pub const EXPIRY_HOUR_UTC: u32 = 8;

/// Dailies are accepted this many days out.
const DAILY_DAYS: [i64; 2] = [1, 2];

/// Beyond this many days only monthly maturities are listed.
const WEEKLY_HORIZON_DAYS: i64 = 30;

const MONTHS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

/// A listed maturity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MaturityEntry {
    pub label: String,
    pub maturity: u64,
}

/// Parse a `DDMMMYY` label into a calendar date.
///
/// The month is case-insensitive and the day may be one or two digits.
pub fn parse_label(label: &str) -> Result<NaiveDate, ExpirationError> {
    let unparseable = || ExpirationError::Unparseable(label.to_string());
    let trimmed = label.trim();
    if !trimmed.is_ascii() {
        return Err(unparseable());
    }

    let day_len = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(unparseable)?;
    if !(1..=2).contains(&day_len) || trimmed.len() != day_len + 5 {
        return Err(unparseable());
    }

    let day: u32 = trimmed[..day_len].parse().map_err(|_| unparseable())?;
    let month_str = trimmed[day_len..day_len + 3].to_ascii_uppercase();
    let month = MONTHS
        .iter()
        .position(|m| *m == month_str)
        .ok_or_else(unparseable)? as u32
        + 1;
    let year_str = &trimmed[day_len + 3..];
    if !year_str.bytes().all(|b| b.is_ascii_digit()) {
        return Err(unparseable());
    }
    let year: i32 = year_str.parse().map_err(|_| unparseable())?;

    NaiveDate::from_ymd_opt(2000 + year, month, day).ok_or_else(unparseable)
}

/// Canonical upper-case `DDMMMYY` label for a date.
pub fn format_label(date: NaiveDate) -> String {
    date.format("%d%b%y").to_string().to_uppercase()
}

/// Label of an on-chain maturity timestamp.
pub fn label_from_timestamp(maturity: u64) -> Option<String> {
    let dt = DateTime::<Utc>::from_timestamp(i64::try_from(maturity).ok()?, 0)?;
    Some(format_label(dt.date_naive()))
}

/// Expiry instant (08:00 UTC) of a date as a Unix timestamp.
pub fn expiry_timestamp(date: NaiveDate) -> u64 {
    let dt = Utc.from_utc_datetime(&date.and_time(expiry_time()));
    dt.timestamp().max(0) as u64
}

fn expiry_time() -> chrono::NaiveTime {
    chrono::NaiveTime::from_hms_opt(EXPIRY_HOUR_UTC, 0, 0).unwrap_or_default()
}

/// Maturity timestamp of a label without applying calendar rules.
///
/// Used for already expired series (settle, exercise, annihilate).
pub fn parse_maturity(label: &str) -> Result<u64, ExpirationError> {
    parse_label(label).map(expiry_timestamp)
}

/// Last Friday of a calendar month.
///
/// Steps back from month-end to the nearest Friday (month-end itself when it
/// is a Friday).
pub fn last_friday_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let last_day = first.checked_add_months(Months::new(1))?.pred_opt()?;
    let from_monday = i64::from(last_day.weekday().num_days_from_monday());
    let back = (from_monday + 7 - i64::from(Weekday::Fri.num_days_from_monday())) % 7;
    Some(last_day - Duration::days(back))
}

fn is_last_friday_of_month(date: NaiveDate) -> bool {
    last_friday_of_month(date.year(), date.month()) == Some(date)
}

/// Validate a maturity label against the calendar rules at the current time.
pub fn compute_maturity(label: &str) -> Result<u64, ExpirationError> {
    compute_maturity_at(label, Utc::now())
}

/// Validate a maturity label against the calendar rules at `now`.
pub fn compute_maturity_at(label: &str, now: DateTime<Utc>) -> Result<u64, ExpirationError> {
    let date = parse_label(label)?;
    let today = now.date_naive();
    let days_to_expiration = (date - today).num_days();
    let maturity = expiry_timestamp(date);

    if i64::try_from(maturity).unwrap_or(i64::MAX) <= now.timestamp() {
        return Err(ExpirationError::InPast(label.to_string()));
    }

    let horizon = today
        .checked_add_months(Months::new(12))
        .unwrap_or(NaiveDate::MAX);
    if date > horizon {
        return Err(ExpirationError::TooFar(label.to_string()));
    }

    if DAILY_DAYS.contains(&days_to_expiration) {
        return Ok(maturity);
    }

    if date.weekday() != Weekday::Fri {
        return Err(ExpirationError::NotFriday(label.to_string()));
    }

    if days_to_expiration > WEEKLY_HORIZON_DAYS && !is_last_friday_of_month(date) {
        return Err(ExpirationError::NotLastFridayOfMonth(label.to_string()));
    }

    Ok(maturity)
}

/// Forward calendar of accepted maturities at the current time.
pub fn list_maturities() -> Vec<MaturityEntry> {
    list_maturities_at(Utc::now())
}

/// Forward calendar of accepted maturities at `now`, sorted and deduplicated.
pub fn list_maturities_at(now: DateTime<Utc>) -> Vec<MaturityEntry> {
    let today = now.date_naive();
    let horizon = today
        .checked_add_months(Months::new(12))
        .unwrap_or(NaiveDate::MAX);
    let mut dates = BTreeSet::new();

    for days in DAILY_DAYS {
        dates.insert(today + Duration::days(days));
    }

    for days in 0..=WEEKLY_HORIZON_DAYS {
        let date = today + Duration::days(days);
        if date.weekday() == Weekday::Fri {
            dates.insert(date);
        }
    }

    let mut month_start = today.with_day(1).unwrap_or(today);
    while month_start <= horizon {
        if let Some(friday) = last_friday_of_month(month_start.year(), month_start.month()) {
            if friday <= horizon {
                dates.insert(friday);
            }
        }
        match month_start.checked_add_months(Months::new(1)) {
            Some(next) => month_start = next,
            None => break,
        }
    }

    let now_ts = now.timestamp();
    dates
        .into_iter()
        .map(|date| MaturityEntry {
            label: format_label(date),
            maturity: expiry_timestamp(date),
        })
        .filter(|entry| i64::try_from(entry.maturity).unwrap_or(i64::MAX) > now_ts)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, hour, 0, 0).unwrap()
    }

    // 2026-02-09 is a Monday
    fn monday_noon() -> DateTime<Utc> {
        utc(2026, 2, 9, 12)
    }

    #[test]
    fn test_parse_label() {
        assert_eq!(
            parse_label("03NOV23").unwrap(),
            NaiveDate::from_ymd_opt(2023, 11, 3).unwrap()
        );
        assert_eq!(
            parse_label("27mar26").unwrap(),
            NaiveDate::from_ymd_opt(2026, 3, 27).unwrap()
        );
        assert_eq!(
            parse_label("6MAR26").unwrap(),
            NaiveDate::from_ymd_opt(2026, 3, 6).unwrap()
        );
    }

    #[test]
    fn test_parse_label_rejects_garbage() {
        for label in ["", "XX", "03ABC23", "31FEB26", "003NOV23", "03NOV2023", "03NOVab"] {
            assert!(
                matches!(parse_label(label), Err(ExpirationError::Unparseable(_))),
                "{label} should not parse"
            );
        }
    }

    #[test]
    fn test_format_label() {
        let date = NaiveDate::from_ymd_opt(2023, 11, 3).unwrap();
        assert_eq!(format_label(date), "03NOV23");
    }

    #[test]
    fn test_expiry_timestamp_is_0800_utc() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 27).unwrap();
        assert_eq!(
            expiry_timestamp(date),
            utc(2026, 3, 27, 8).timestamp() as u64
        );
        assert_eq!(
            label_from_timestamp(expiry_timestamp(date)).as_deref(),
            Some("27MAR26")
        );
    }

    #[test]
    fn test_daily_one_and_two_days_out() {
        let now = monday_noon();
        assert_eq!(
            compute_maturity_at("10FEB26", now).unwrap(),
            utc(2026, 2, 10, 8).timestamp() as u64
        );
        assert!(compute_maturity_at("11FEB26", now).is_ok());
    }

    #[test]
    fn test_three_days_out_not_friday() {
        let err = compute_maturity_at("12FEB26", monday_noon()).unwrap_err();
        assert_eq!(err, ExpirationError::NotFriday("12FEB26".to_string()));
        assert_eq!(
            err.to_string(),
            "Invalid expiration date: 12FEB26 is not a Friday"
        );
    }

    #[test]
    fn test_weekly_friday_accepted() {
        let now = monday_noon();
        assert!(compute_maturity_at("13FEB26", now).is_ok());
        // 2026-03-06 is 25 days out
        assert!(compute_maturity_at("06MAR26", now).is_ok());
    }

    #[test]
    fn test_beyond_thirty_days_requires_last_friday() {
        let now = monday_noon();
        // 2026-03-20 is a Friday 39 days out, but not the last one of March
        let err = compute_maturity_at("20MAR26", now).unwrap_err();
        assert_eq!(
            err,
            ExpirationError::NotLastFridayOfMonth("20MAR26".to_string())
        );
        assert!(compute_maturity_at("27MAR26", now).is_ok());
    }

    #[test]
    fn test_past_label() {
        let err = compute_maturity_at("03NOV23", monday_noon()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid expiration date: 03NOV23 is in the past"
        );
    }

    #[test]
    fn test_same_day_friday_before_and_after_expiry() {
        // 2026-02-13 is a Friday
        assert!(compute_maturity_at("13FEB26", utc(2026, 2, 13, 7)).is_ok());
        assert!(matches!(
            compute_maturity_at("13FEB26", utc(2026, 2, 13, 8)),
            Err(ExpirationError::InPast(_))
        ));
    }

    #[test]
    fn test_more_than_one_year_out() {
        let err = compute_maturity_at("26MAR27", monday_noon()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid expiration date: 26MAR27 is more than 1 year in the future"
        );
    }

    #[test]
    fn test_last_friday_month_ending_on_friday() {
        // July 2026 ends on Friday the 31st
        assert_eq!(
            last_friday_of_month(2026, 7),
            NaiveDate::from_ymd_opt(2026, 7, 31)
        );
    }

    #[test]
    fn test_last_friday_month_ending_on_saturday() {
        // October 2026 ends on Saturday the 31st
        assert_eq!(
            last_friday_of_month(2026, 10),
            NaiveDate::from_ymd_opt(2026, 10, 30)
        );
    }

    #[test]
    fn test_last_friday_month_ending_on_thursday() {
        // April 2026 ends on Thursday the 30th
        assert_eq!(
            last_friday_of_month(2026, 4),
            NaiveDate::from_ymd_opt(2026, 4, 24)
        );
    }

    #[test]
    fn test_last_friday_every_month_is_friday_in_last_week() {
        for year in [2025, 2026, 2027, 2028] {
            for month in 1..=12 {
                let friday = last_friday_of_month(year, month).unwrap();
                assert_eq!(friday.weekday(), Weekday::Fri);
                assert_eq!(friday.month(), month);
                let next_week = friday + Duration::days(7);
                assert_ne!(next_week.month(), month);
            }
        }
    }

    #[test]
    fn test_parse_maturity_skips_rules() {
        // In the past and a Thursday, still resolves
        let ts = parse_maturity("02NOV23").unwrap();
        assert_eq!(ts, utc(2023, 11, 2, 8).timestamp() as u64);
    }

    #[test]
    fn test_list_maturities() {
        let now = monday_noon();
        let listed = list_maturities_at(now);

        // 2 dailies, 4 weeklies, 11 monthlies (Feb 2026 monthly is a weekly)
        assert_eq!(listed.len(), 17);
        assert_eq!(listed[0].label, "10FEB26");
        assert_eq!(listed.last().unwrap().label, "29JAN27");

        for pair in listed.windows(2) {
            assert!(pair[0].maturity < pair[1].maturity);
        }
        for entry in &listed {
            assert_eq!(
                compute_maturity_at(&entry.label, now).unwrap(),
                entry.maturity,
                "{} should be accepted",
                entry.label
            );
        }
    }
}
