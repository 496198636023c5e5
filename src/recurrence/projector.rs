//! # Recurring Occurrence Projector
//!
//! Computes the future occurrence dates of a recurring template from its
//! repeat rule. Projection is deterministic and pure: identical inputs always
//! yield the identical ordered date set, every date lies in
//! `(reference, until]`, and the terminal date is validated against the
//! configured horizon before any date is generated — an out-of-horizon rule is
//! rejected, never truncated.
//!
//! The generation is iterative over immutable inputs; the horizon bounds the
//! iteration count.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::error::EngineError;

/// Repeat cadence unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceUnit {
    Weekly,
    Monthly,
}

impl fmt::Display for RecurrenceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Weekly => write!(f, "weekly"),
            Self::Monthly => write!(f, "monthly"),
        }
    }
}

impl std::str::FromStr for RecurrenceUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            _ => Err(format!("Invalid recurrence unit: {s}")),
        }
    }
}

/// A validated-on-use repeat rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    /// Every N weeks or months
    pub interval: u32,
    pub unit: RecurrenceUnit,
    /// Terminal date (inclusive)
    pub until: NaiveDate,
    /// Weekdays the rule applies to
    pub weekdays: Vec<Weekday>,
}

/// Errors raised by rule validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProjectionError {
    #[error("recurrence interval must be at least 1")]
    ZeroInterval,

    #[error("recurrence must name at least one weekday")]
    NoWeekdays,

    #[error("terminal date {until} is not after reference date {reference}")]
    TerminalNotAfterReference {
        reference: NaiveDate,
        until: NaiveDate,
    },

    #[error("terminal date {until} exceeds the {horizon_days}-day horizon past {reference}")]
    HorizonExceeded {
        reference: NaiveDate,
        until: NaiveDate,
        horizon_days: u32,
    },
}

impl From<ProjectionError> for EngineError {
    fn from(err: ProjectionError) -> Self {
        EngineError::Validation(err.to_string())
    }
}

/// Validate a rule against the reference date and horizon.
pub fn validate_rule(
    reference: NaiveDate,
    rule: &RecurrenceRule,
    horizon_days: u32,
) -> Result<(), ProjectionError> {
    if rule.interval == 0 {
        return Err(ProjectionError::ZeroInterval);
    }
    if rule.weekdays.is_empty() {
        return Err(ProjectionError::NoWeekdays);
    }
    if rule.until <= reference {
        return Err(ProjectionError::TerminalNotAfterReference {
            reference,
            until: rule.until,
        });
    }
    if rule.until - reference > Duration::days(i64::from(horizon_days)) {
        return Err(ProjectionError::HorizonExceeded {
            reference,
            until: rule.until,
            horizon_days,
        });
    }
    Ok(())
}

/// Project all occurrence dates for a rule.
///
/// Returns a sorted, deduplicated set of dates, all strictly after the
/// reference and at or before the terminal date.
pub fn project(
    reference: NaiveDate,
    rule: &RecurrenceRule,
    horizon_days: u32,
) -> Result<Vec<NaiveDate>, ProjectionError> {
    validate_rule(reference, rule, horizon_days)?;

    let mut dates = BTreeSet::new();
    for &weekday in &rule.weekdays {
        match rule.unit {
            RecurrenceUnit::Weekly => {
                project_weekly(reference, weekday, rule.interval, rule.until, &mut dates);
            }
            RecurrenceUnit::Monthly => {
                project_monthly(reference, weekday, rule.interval, rule.until, &mut dates);
            }
        }
    }

    Ok(dates.into_iter().collect())
}

/// Weekly cadence: align the reference onto the weekday, then step N weeks at
/// a time until past the terminal date.
fn project_weekly(
    reference: NaiveDate,
    weekday: Weekday,
    interval: u32,
    until: NaiveDate,
    dates: &mut BTreeSet<NaiveDate>,
) {
    let mut cursor = align_forward(reference, weekday);
    loop {
        cursor += Duration::weeks(i64::from(interval));
        if cursor > until {
            break;
        }
        dates.insert(cursor);
    }
}

/// Monthly cadence: the weekday's ordinal in the aligned month ("2nd Tuesday")
/// is carried to each target month; a month lacking that ordinal is skipped
/// without resetting the cadence.
fn project_monthly(
    reference: NaiveDate,
    weekday: Weekday,
    interval: u32,
    until: NaiveDate,
    dates: &mut BTreeSet<NaiveDate>,
) {
    let base = align_forward(reference, weekday);
    let ordinal = (base.day() - 1) / 7 + 1;

    let mut year = base.year();
    let mut month = base.month();
    loop {
        (year, month) = add_months(year, month, interval);
        let Some(month_start) = NaiveDate::from_ymd_opt(year, month, 1) else {
            break;
        };
        if month_start > until {
            break;
        }
        if let Some(candidate) = nth_weekday_in_month(year, month, weekday, ordinal) {
            if candidate > until {
                break;
            }
            if candidate > reference {
                dates.insert(candidate);
            }
        }
    }
}

/// First date at or after `from` falling on `weekday`
fn align_forward(from: NaiveDate, weekday: Weekday) -> NaiveDate {
    let days_ahead = (weekday.num_days_from_monday() + 7
        - from.weekday().num_days_from_monday())
        % 7;
    from + Duration::days(i64::from(days_ahead))
}

/// The `ordinal`-th (1-based) `weekday` of a month, if the month has one
fn nth_weekday_in_month(
    year: i32,
    month: u32,
    weekday: Weekday,
    ordinal: u32,
) -> Option<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let offset = (weekday.num_days_from_monday() + 7 - first.weekday().num_days_from_monday()) % 7;
    let day = 1 + offset + 7 * (ordinal - 1);
    NaiveDate::from_ymd_opt(year, month, day)
}

fn add_months(year: i32, month: u32, months: u32) -> (i32, u32) {
    let zero_based = year * 12 + month as i32 - 1 + months as i32;
    (zero_based.div_euclid(12), (zero_based.rem_euclid(12) + 1) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn weekly(interval: u32, weekdays: Vec<Weekday>, until: NaiveDate) -> RecurrenceRule {
        RecurrenceRule {
            interval,
            unit: RecurrenceUnit::Weekly,
            until,
            weekdays,
        }
    }

    #[test]
    fn test_weekly_mondays_from_a_monday() {
        // Reference 2024-01-01 is itself a Monday
        let dates = project(
            date(2024, 1, 1),
            &weekly(1, vec![Weekday::Mon], date(2024, 1, 22)),
            365,
        )
        .unwrap();
        assert_eq!(
            dates,
            vec![date(2024, 1, 8), date(2024, 1, 15), date(2024, 1, 22)]
        );
    }

    #[test]
    fn test_weekly_biweekly_interval() {
        let dates = project(
            date(2024, 1, 1),
            &weekly(2, vec![Weekday::Mon], date(2024, 2, 12)),
            365,
        )
        .unwrap();
        assert_eq!(
            dates,
            vec![date(2024, 1, 15), date(2024, 1, 29), date(2024, 2, 12)]
        );
    }

    #[test]
    fn test_weekly_multiple_weekdays_merge_sorted() {
        let dates = project(
            date(2024, 1, 1),
            &weekly(1, vec![Weekday::Fri, Weekday::Mon], date(2024, 1, 15)),
            365,
        )
        .unwrap();
        // Mondays step from 01-01, Fridays align to 01-05 first
        assert_eq!(
            dates,
            vec![date(2024, 1, 8), date(2024, 1, 12), date(2024, 1, 15)]
        );
    }

    #[test]
    fn test_monthly_second_tuesday() {
        // 2024-01-09 is the 2nd Tuesday of January
        let rule = RecurrenceRule {
            interval: 1,
            unit: RecurrenceUnit::Monthly,
            until: date(2024, 4, 30),
            weekdays: vec![Weekday::Tue],
        };
        let dates = project(date(2024, 1, 9), &rule, 365).unwrap();
        assert_eq!(
            dates,
            vec![date(2024, 2, 13), date(2024, 3, 12), date(2024, 4, 9)]
        );
    }

    #[test]
    fn test_monthly_fifth_weekday_skips_short_months() {
        // 2024-01-29 is the 5th Monday of January; February and April 2024
        // have no 5th Monday
        let rule = RecurrenceRule {
            interval: 1,
            unit: RecurrenceUnit::Monthly,
            until: date(2024, 7, 31),
            weekdays: vec![Weekday::Mon],
        };
        let dates = project(date(2024, 1, 29), &rule, 365).unwrap();
        assert_eq!(dates, vec![date(2024, 4, 29), date(2024, 7, 29)]);
    }

    #[test]
    fn test_horizon_rejected_not_truncated() {
        let err = project(
            date(2024, 1, 1),
            &weekly(1, vec![Weekday::Mon], date(2025, 1, 2)),
            365,
        )
        .unwrap_err();
        assert!(matches!(err, ProjectionError::HorizonExceeded { .. }));
    }

    #[test]
    fn test_terminal_must_follow_reference() {
        let err = project(
            date(2024, 1, 10),
            &weekly(1, vec![Weekday::Mon], date(2024, 1, 10)),
            365,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ProjectionError::TerminalNotAfterReference { .. }
        ));
    }

    #[test]
    fn test_invalid_rules_rejected() {
        assert!(matches!(
            project(
                date(2024, 1, 1),
                &weekly(0, vec![Weekday::Mon], date(2024, 2, 1)),
                365
            ),
            Err(ProjectionError::ZeroInterval)
        ));
        assert!(matches!(
            project(date(2024, 1, 1), &weekly(1, vec![], date(2024, 2, 1)), 365),
            Err(ProjectionError::NoWeekdays)
        ));
    }

    #[test]
    fn test_nth_weekday_helper() {
        assert_eq!(
            nth_weekday_in_month(2024, 1, Weekday::Tue, 2),
            Some(date(2024, 1, 9))
        );
        assert_eq!(nth_weekday_in_month(2024, 2, Weekday::Mon, 5), None);
    }

    #[test]
    fn test_add_months_year_rollover() {
        assert_eq!(add_months(2024, 11, 3), (2025, 2));
        assert_eq!(add_months(2024, 1, 12), (2025, 1));
        assert_eq!(add_months(2024, 12, 1), (2025, 1));
    }

    proptest! {
        #[test]
        fn prop_projection_is_deterministic_and_bounded(
            day_offset in 0u32..3650,
            interval in 1u32..5,
            unit_monthly in any::<bool>(),
            weekday_bits in 1u8..128,
            span_days in 1u32..365,
        ) {
            let reference = date(2020, 1, 1) + Duration::days(i64::from(day_offset));
            let until = reference + Duration::days(i64::from(span_days));
            let weekdays: Vec<Weekday> = [
                Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu,
                Weekday::Fri, Weekday::Sat, Weekday::Sun,
            ]
            .into_iter()
            .enumerate()
            .filter(|(i, _)| weekday_bits & (1 << i) != 0)
            .map(|(_, w)| w)
            .collect();

            let rule = RecurrenceRule {
                interval,
                unit: if unit_monthly { RecurrenceUnit::Monthly } else { RecurrenceUnit::Weekly },
                until,
                weekdays,
            };

            let first = project(reference, &rule, 365).unwrap();
            let second = project(reference, &rule, 365).unwrap();
            prop_assert_eq!(&first, &second);

            let mut sorted = first.clone();
            sorted.sort_unstable();
            sorted.dedup();
            prop_assert_eq!(&first, &sorted);

            for occurrence in &first {
                prop_assert!(*occurrence > reference);
                prop_assert!(*occurrence <= until);
                prop_assert!(rule.weekdays.contains(&occurrence.weekday()));
            }
        }
    }
}
