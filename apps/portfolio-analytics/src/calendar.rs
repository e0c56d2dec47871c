//! Calendar bucket arithmetic.
//!
//! Weeks start on Monday and are labelled with their ISO week-year, which is
//! the year of the week's Thursday (so 2024-12-30 falls in `2025-W01`).

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::AnalyticsError;

/// Calendar granularity used for period grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodType {
    /// Calendar day.
    Day,
    /// ISO week, Monday to Sunday.
    Week,
    /// Calendar month.
    Month,
    /// Calendar quarter.
    Quarter,
    /// Calendar year.
    Year,
}

impl PeriodType {
    /// Every granularity, finest first.
    pub const ALL: [Self; 5] = [Self::Day, Self::Week, Self::Month, Self::Quarter, Self::Year];

    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Quarter => "quarter",
            Self::Year => "year",
        }
    }
}

impl fmt::Display for PeriodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PeriodType {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" | "daily" => Ok(Self::Day),
            "week" | "weekly" => Ok(Self::Week),
            "month" | "monthly" => Ok(Self::Month),
            "quarter" | "quarterly" => Ok(Self::Quarter),
            "year" | "yearly" | "annual" => Ok(Self::Year),
            other => Err(AnalyticsError::invalid(
                "period_type",
                format!("unknown period type: {other}"),
            )),
        }
    }
}

/// First day of the bucket containing `date`.
#[must_use]
pub fn bucket_start(date: NaiveDate, period: PeriodType) -> NaiveDate {
    match period {
        PeriodType::Day => date,
        PeriodType::Week => {
            let back = u64::from(date.weekday().num_days_from_monday());
            date.checked_sub_days(Days::new(back)).unwrap_or(date)
        }
        PeriodType::Month => first_of_month(date.year(), date.month()).unwrap_or(date),
        PeriodType::Quarter => {
            let month = (date.month0() / 3) * 3 + 1;
            first_of_month(date.year(), month).unwrap_or(date)
        }
        PeriodType::Year => first_of_month(date.year(), 1).unwrap_or(date),
    }
}

/// First day of the bucket after the one containing `date`.
///
/// `None` past the end of the representable calendar.
#[must_use]
pub fn next_bucket_start(date: NaiveDate, period: PeriodType) -> Option<NaiveDate> {
    let start = bucket_start(date, period);
    match period {
        PeriodType::Day => start.checked_add_days(Days::new(1)),
        PeriodType::Week => start.checked_add_days(Days::new(7)),
        PeriodType::Month => start.checked_add_months(Months::new(1)),
        PeriodType::Quarter => start.checked_add_months(Months::new(3)),
        PeriodType::Year => start.checked_add_months(Months::new(12)),
    }
}

/// Last day of the bucket containing `date`.
#[must_use]
pub fn bucket_end(date: NaiveDate, period: PeriodType) -> NaiveDate {
    next_bucket_start(date, period)
        .and_then(|next| next.pred_opt())
        .unwrap_or(NaiveDate::MAX)
}

/// Display label of the bucket containing `date`.
#[must_use]
pub fn bucket_label(date: NaiveDate, period: PeriodType) -> String {
    match period {
        PeriodType::Day => date.format("%Y-%m-%d").to_string(),
        PeriodType::Week => {
            let (year, week) = iso_week_key(date);
            format!("{year}-W{week:02}")
        }
        PeriodType::Month => format!("{}-{:02}", date.year(), date.month()),
        PeriodType::Quarter => format!("{}-Q{}", date.year(), date.month0() / 3 + 1),
        PeriodType::Year => date.year().to_string(),
    }
}

/// ISO week-year and week number.
#[must_use]
pub fn iso_week_key(date: NaiveDate) -> (i32, u32) {
    let week = date.iso_week();
    (week.year(), week.week())
}

fn first_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
}

#[cfg(test)]
mod tests {
    use chrono::Weekday;
    use proptest::prelude::*;
    use test_case::test_case;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test_case(date(2024, 1, 15), PeriodType::Day, "2024-01-15")]
    #[test_case(date(2024, 1, 15), PeriodType::Week, "2024-W03")]
    #[test_case(date(2024, 12, 30), PeriodType::Week, "2025-W01")]
    #[test_case(date(2021, 1, 3), PeriodType::Week, "2020-W53")]
    #[test_case(date(2024, 3, 9), PeriodType::Month, "2024-03")]
    #[test_case(date(2024, 3, 31), PeriodType::Quarter, "2024-Q1")]
    #[test_case(date(2024, 11, 1), PeriodType::Quarter, "2024-Q4")]
    #[test_case(date(2024, 7, 4), PeriodType::Year, "2024")]
    fn test_bucket_label(day: NaiveDate, period: PeriodType, expected: &str) {
        assert_eq!(bucket_label(day, period), expected);
    }

    #[test]
    fn test_bucket_bounds() {
        let d = date(2024, 2, 14);
        assert_eq!(bucket_start(d, PeriodType::Week), date(2024, 2, 12));
        assert_eq!(bucket_end(d, PeriodType::Week), date(2024, 2, 18));
        assert_eq!(bucket_end(d, PeriodType::Month), date(2024, 2, 29));
        assert_eq!(bucket_start(d, PeriodType::Quarter), date(2024, 1, 1));
        assert_eq!(bucket_end(d, PeriodType::Quarter), date(2024, 3, 31));
        assert_eq!(bucket_end(d, PeriodType::Year), date(2024, 12, 31));
        assert_eq!(
            next_bucket_start(date(2024, 12, 5), PeriodType::Month),
            Some(date(2025, 1, 1))
        );
    }

    #[test]
    fn test_period_type_parsing() {
        assert_eq!("Monthly".parse::<PeriodType>().unwrap(), PeriodType::Month);
        assert_eq!("quarter".parse::<PeriodType>().unwrap(), PeriodType::Quarter);
        assert!("fortnight".parse::<PeriodType>().is_err());
        assert_eq!(PeriodType::Week.to_string(), "week");
    }

    fn any_date() -> impl Strategy<Value = NaiveDate> {
        (0u64..20_000).prop_map(|offset| date(1990, 1, 1) + Days::new(offset))
    }

    fn any_period() -> impl Strategy<Value = PeriodType> {
        prop::sample::select(PeriodType::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn prop_date_lies_inside_its_bucket(day in any_date(), period in any_period()) {
            let start = bucket_start(day, period);
            let end = bucket_end(day, period);
            prop_assert!(start <= day && day <= end);
            prop_assert_eq!(bucket_start(start, period), start);
            prop_assert_eq!(bucket_start(end, period), start);
            prop_assert_eq!(next_bucket_start(day, period), end.succ_opt());
            prop_assert_eq!(bucket_label(day, period), bucket_label(start, period));
        }

        #[test]
        fn prop_weeks_start_monday_and_share_iso_key(day in any_date()) {
            let start = bucket_start(day, PeriodType::Week);
            prop_assert_eq!(start.weekday(), Weekday::Mon);
            prop_assert_eq!(iso_week_key(day), iso_week_key(start));
            let thursday = start + Days::new(3);
            prop_assert_eq!(iso_week_key(day).0, thursday.year());
        }
    }
}
