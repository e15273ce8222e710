use crate::error::{EngineError, Result};
use chrono::{Datelike, NaiveDate};

pub const FIRST_QUARTER: u32 = 1;
pub const LAST_QUARTER: u32 = 4;
pub const QUARTERS_IN_YEAR: usize = 4;

pub fn is_valid_quarter(quarter: u32) -> bool {
    (FIRST_QUARTER..=LAST_QUARTER).contains(&quarter)
}

/// Number of quarters of `date`'s year that have already ended on `date`.
///
/// # Examples
/// - 2024-03-31 → 0 (Q1 still running)
/// - 2024-04-01 → 1
/// - 2024-12-31 → 3
pub fn quarters_completed(date: NaiveDate) -> u32 {
    date.month0() / 3
}

pub fn previous_calendar_year(today: NaiveDate) -> i32 {
    today.year() - 1
}

/// Parses a single quarter point in the format "YYYY-Qn" (the `Q` is case-insensitive).
pub fn parse_quarter_point(point: &str) -> Result<(i32, u32)> {
    let point = point.trim();
    let (year_str, quarter_str) = point.split_once('-').ok_or_else(|| {
        EngineError::PeriodParse(format!(
            "Invalid quarter format: {}. Expected YYYY-Qn",
            point
        ))
    })?;

    let year = year_str.trim().parse::<i32>().map_err(|_| {
        EngineError::PeriodParse(format!("Invalid year in quarter point: {}", point))
    })?;

    let quarter = quarter_str
        .trim()
        .strip_prefix(|c: char| c.eq_ignore_ascii_case(&'q'))
        .and_then(|q| q.parse::<u32>().ok())
        .filter(|q| is_valid_quarter(*q))
        .ok_or_else(|| {
            EngineError::PeriodParse(format!(
                "Invalid quarter in quarter point: {}. Expected Q1..Q4",
                point
            ))
        })?;

    Ok((year, quarter))
}

/// Parses a period string in the format "YYYY-Qn" or "YYYY-Qn:YYYY-Qn".
/// Returns ((start_year, start_quarter), (end_year, end_quarter)).
pub fn parse_period_string(period: &str) -> Result<((i32, u32), (i32, u32))> {
    let parts: Vec<&str> = period.split(':').collect();

    match parts.len() {
        1 => {
            let point = parse_quarter_point(parts[0])?;
            Ok((point, point))
        }
        2 => {
            let start = parse_quarter_point(parts[0])?;
            let end = parse_quarter_point(parts[1])?;
            Ok((start, end))
        }
        _ => Err(EngineError::PeriodParse(format!(
            "Invalid period format: {}. Expected 'YYYY-Qn' or 'YYYY-Qn:YYYY-Qn'",
            period
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quarters_completed() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        assert_eq!(quarters_completed(date), 0);

        let date = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
        assert_eq!(quarters_completed(date), 1);

        let date = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        assert_eq!(quarters_completed(date), 3);
    }

    #[test]
    fn test_previous_calendar_year() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(previous_calendar_year(date), 2023);
    }

    #[test]
    fn test_parse_period_string_single_and_range() {
        let (start, end) = parse_period_string("2023-Q2").unwrap();
        assert_eq!(start, (2023, 2));
        assert_eq!(end, (2023, 2));

        let (start, end) = parse_period_string("2022-q3:2023-Q1").unwrap();
        assert_eq!(start, (2022, 3));
        assert_eq!(end, (2023, 1));
    }

    #[test]
    fn test_parse_period_string_rejects_garbage() {
        assert!(parse_period_string("2023").is_err());
        assert!(parse_period_string("2023-Q5").is_err());
        assert!(parse_period_string("2023-Q0").is_err());
        assert!(parse_period_string("abcd-Q1").is_err());
        assert!(parse_period_string("2023-Q1:2023-Q2:2023-Q3").is_err());
    }
}
