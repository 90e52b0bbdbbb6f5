//! Shared value types for the Telecare admin client

use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Month/year filter for a single trend chart
///
/// Both fields are kept as strings because the gateway treats an empty value
/// as "server default", which for trends means the current period.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterSet {
    /// Month number (`"1"`..`"12"`) or empty
    #[serde(default)]
    pub month: String,

    /// Four digit year or empty
    #[serde(default)]
    pub year: String,
}

impl FilterSet {
    /// Build a filter from any string-like month and year
    pub fn new(month: impl Into<String>, year: impl Into<String>) -> Self {
        Self {
            month: month.into(),
            year: year.into(),
        }
    }

    /// Filter pinned to the month containing `date`
    pub fn for_date(date: NaiveDate) -> Self {
        Self::new(date.month().to_string(), date.year().to_string())
    }

    /// Filter pinned to the current UTC month
    pub fn current() -> Self {
        Self::for_date(Utc::now().date_naive())
    }

    /// True when both fields defer to the server
    pub fn is_server_default(&self) -> bool {
        self.month.is_empty() && self.year.is_empty()
    }

    /// Query pairs in the order the gateway expects them
    pub fn query_pairs(&self) -> [(&'static str, &str); 2] {
        [("month", self.month.as_str()), ("year", self.year.as_str())]
    }

    /// Check that non-empty values are a real month and year
    pub fn validate(&self) -> crate::Result<()> {
        if !self.month.is_empty() {
            match self.month.trim().parse::<u32>() {
                Ok(1..=12) => {}
                _ => {
                    return Err(crate::Error::validation(
                        "month",
                        format!("'{}' is not a month between 1 and 12", self.month),
                    ));
                }
            }
        }

        if !self.year.is_empty() {
            let year = self.year.trim();
            if year.len() != 4 || year.parse::<i32>().is_err() {
                return Err(crate::Error::validation(
                    "year",
                    format!("'{}' is not a four digit year", self.year),
                ));
            }
        }

        Ok(())
    }
}

impl fmt::Display for FilterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let month = if self.month.is_empty() { "-" } else { &self.month };
        let year = if self.year.is_empty() { "-" } else { &self.year };
        write!(f, "{month}/{year}")
    }
}

/// Bucket size of a trend series
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// One point per day
    #[default]
    Daily,
    /// One point per week
    Weekly,
    /// One point per month
    Monthly,
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Daily => write!(f, "daily"),
            Self::Weekly => write!(f, "weekly"),
            Self::Monthly => write!(f, "monthly"),
        }
    }
}

impl FromStr for Granularity {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" | "day" => Ok(Self::Daily),
            "weekly" | "week" => Ok(Self::Weekly),
            "monthly" | "month" => Ok(Self::Monthly),
            other => Err(crate::Error::validation(
                "granularity",
                format!("unknown granularity '{other}'"),
            )),
        }
    }
}

/// Normalized pagination state of a list view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    /// Current page, 1-based
    pub page: u32,
    /// Page size
    pub limit: u32,
    /// Total records reported by the server
    pub total: u64,
    /// Number of pages, never below 1
    pub total_pages: u32,
}

/// `max(1, ceil(total / limit))`, treating a zero limit as 1
pub fn total_pages(total: u64, limit: u32) -> u32 {
    let limit = u64::from(limit.max(1));
    let pages = total.div_ceil(limit).max(1);
    u32::try_from(pages).unwrap_or(u32::MAX)
}

impl PaginationMeta {
    /// Build pagination, clamping `page` and `limit` to at least 1
    pub fn new(page: u32, limit: u32, total: u64) -> Self {
        let limit = limit.max(1);
        Self {
            page: page.max(1),
            limit,
            total,
            total_pages: total_pages(total, limit),
        }
    }

    /// Whether a page follows the current one
    pub const fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    /// Whether a page precedes the current one
    pub const fn has_previous(&self) -> bool {
        self.page > 1
    }
}

impl Default for PaginationMeta {
    fn default() -> Self {
        Self::new(1, 10, 0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use rstest::rstest;

    #[test]
    fn test_filter_set_defaults() {
        let filter = FilterSet::default();
        assert!(filter.is_server_default());
        assert_eq!(filter.query_pairs(), [("month", ""), ("year", "")]);
        assert_eq!(filter.to_string(), "-/-");
        assert!(filter.validate().is_ok());
    }

    #[test]
    fn test_filter_set_for_date() {
        let filter = FilterSet::for_date(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        assert_eq!(filter, FilterSet::new("3", "2024"));
        assert!(!filter.is_server_default());
        assert_eq!(filter.to_string(), "3/2024");
    }

    #[rstest]
    #[case("1", "2024", true)]
    #[case("12", "", true)]
    #[case("", "1999", true)]
    #[case("0", "2024", false)]
    #[case("13", "2024", false)]
    #[case("march", "2024", false)]
    #[case("3", "24", false)]
    #[case("3", "20x4", false)]
    fn test_filter_set_validation(#[case] month: &str, #[case] year: &str, #[case] valid: bool) {
        assert_eq!(FilterSet::new(month, year).validate().is_ok(), valid);
    }

    #[test]
    fn test_filter_set_deserializes_missing_fields() {
        let filter: FilterSet = serde_json::from_str(r#"{"month":"7"}"#).unwrap();
        assert_eq!(filter, FilterSet::new("7", ""));
    }

    #[rstest]
    #[case("daily", Granularity::Daily)]
    #[case("Weekly", Granularity::Weekly)]
    #[case(" month ", Granularity::Monthly)]
    fn test_granularity_from_str(#[case] input: &str, #[case] expected: Granularity) {
        assert_eq!(input.parse::<Granularity>().unwrap(), expected);
    }

    #[test]
    fn test_granularity_serde() {
        assert_eq!(
            serde_json::to_string(&Granularity::Weekly).unwrap(),
            "\"weekly\""
        );
        assert!("hourly".parse::<Granularity>().is_err());
        assert_eq!(Granularity::default(), Granularity::Daily);
    }

    #[test]
    fn test_pagination_floor() {
        let meta = PaginationMeta::new(1, 20, 0);
        assert_eq!(meta.total_pages, 1);
        assert!(!meta.has_next());
        assert!(!meta.has_previous());
    }

    #[rstest]
    #[case(0, 10, 1)]
    #[case(10, 10, 1)]
    #[case(11, 10, 2)]
    #[case(41, 20, 3)]
    #[case(5, 0, 5)]
    fn test_total_pages(#[case] total: u64, #[case] limit: u32, #[case] expected: u32) {
        assert_eq!(total_pages(total, limit), expected);
    }

    #[test]
    fn test_pagination_clamps_page_and_limit() {
        let meta = PaginationMeta::new(0, 0, 3);
        assert_eq!(meta.page, 1);
        assert_eq!(meta.limit, 1);
        assert_eq!(meta.total_pages, 3);
        assert!(meta.has_next());
    }

    #[test]
    fn test_pagination_serializes_camel_case() {
        let json = serde_json::to_value(PaginationMeta::new(2, 10, 25)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"page": 2, "limit": 10, "total": 25, "totalPages": 3})
        );
    }

    proptest! {
        #[test]
        fn test_total_pages_never_below_one(total in 0u64..1_000_000, limit in 0u32..500) {
            let pages = total_pages(total, limit);
            prop_assert!(pages >= 1);
            let limit = u64::from(limit.max(1));
            prop_assert!(u64::from(pages) * limit >= total);
            if total > 0 {
                prop_assert!(u64::from(pages - 1) * limit < total);
            }
        }
    }
}
