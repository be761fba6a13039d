//! Request validation utilities for the PropChain API

use crate::api::errors::{ApiError, ApiResult};
use crate::auth::is_valid_address;
use crate::models::parse_enum;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::de::DeserializeOwned;

static MONTH: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"^\d{4}-(0[1-9]|1[0-2])$")
        .map_err(|e| log::error!("Month pattern failed to compile: {}", e))
        .ok()
});

/// Trimmed value of an optional body field, treating blank strings as absent
pub fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Parse an enum-valued field, reporting unknown values as 400
pub fn parse_field<T: DeserializeOwned>(path: &str, value: &str) -> ApiResult<T> {
    parse_enum(path, value).map_err(ApiError::bad_request)
}

/// Billing months are written `YYYY-MM`
pub fn validate_month(month: &str) -> ApiResult<()> {
    let Some(re) = MONTH.as_ref() else {
        return Err(ApiError::internal_server_error(
            "Month validation is unavailable.",
        ));
    };
    if re.is_match(month) {
        Ok(())
    } else {
        Err(ApiError::bad_request(format!(
            "`{}` is not a valid month, expected YYYY-MM.",
            month
        )))
    }
}

pub fn validate_address(address: &str) -> ApiResult<()> {
    if is_valid_address(address) {
        Ok(())
    } else {
        Err(ApiError::bad_request("A valid wallet address is required."))
    }
}

/// Case-insensitive substring matcher for free-text filters. The input is
/// escaped, so `.` or `(` in a city name match literally.
pub fn contains_ignore_case(needle: &str) -> ApiResult<Regex> {
    RegexBuilder::new(&regex::escape(needle))
        .case_insensitive(true)
        .build()
        .map_err(|e| ApiError::bad_request(format!("Invalid filter: {}", e)))
}

/// Page window over a sorted result set. Query values that are missing, not
/// numeric or below 1 fall back to the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: usize,
    pub limit: usize,
}

impl Pagination {
    pub fn from_query(page: Option<&str>, limit: Option<&str>, default_limit: usize) -> Self {
        fn positive(raw: Option<&str>) -> Option<usize> {
            raw.and_then(|v| v.trim().parse::<usize>().ok()).filter(|v| *v >= 1)
        }
        Self {
            page: positive(page).unwrap_or(1),
            limit: positive(limit).unwrap_or(default_limit),
        }
    }

    pub fn pages(&self, total: usize) -> usize {
        total.div_ceil(self.limit)
    }

    /// Items of the current page, assuming `items` is already sorted
    pub fn slice<T>(&self, items: Vec<T>) -> Vec<T> {
        let start = (self.page - 1).saturating_mul(self.limit);
        items.into_iter().skip(start).take(self.limit).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DepositStatus;
    use proptest::prelude::*;

    #[test]
    fn test_present_ignores_blank() {
        assert_eq!(present(&Some("  city ".into())), Some("city"));
        assert_eq!(present(&Some("   ".into())), None);
        assert_eq!(present(&None), None);
    }

    #[test]
    fn test_parse_field() {
        let status: DepositStatus = parse_field("status", "accepted").unwrap();
        assert_eq!(status, DepositStatus::Accepted);
        let err = parse_field::<DepositStatus>("status", "lost").unwrap_err();
        assert_eq!(err.code, 400);
    }

    #[test]
    fn test_validate_month() {
        assert!(validate_month("2024-01").is_ok());
        assert!(validate_month("2024-12").is_ok());
        assert!(validate_month("2024-13").is_err());
        assert!(validate_month("2024-1").is_err());
        assert!(validate_month("January").is_err());
    }

    #[test]
    fn test_month_pattern_compiles() {
        assert!(MONTH.is_some());
        let err = validate_month("2024-00").unwrap_err();
        assert_eq!(err.code, 400);
    }

    #[test]
    fn test_filter_is_escaped() {
        let re = contains_ignore_case("st.").unwrap();
        assert!(re.is_match("Main ST. 4"));
        assert!(!re.is_match("Main Str 4"));
        assert!(contains_ignore_case("(").is_ok());
    }

    #[test]
    fn test_pagination_defaults() {
        assert_eq!(
            Pagination::from_query(None, None, 9),
            Pagination { page: 1, limit: 9 }
        );
        assert_eq!(
            Pagination::from_query(Some("0"), Some("abc"), 10),
            Pagination { page: 1, limit: 10 }
        );
        assert_eq!(
            Pagination::from_query(Some("3"), Some("2"), 10),
            Pagination { page: 3, limit: 2 }
        );
    }

    #[test]
    fn test_pages_is_zero_when_empty() {
        let pagination = Pagination { page: 1, limit: 9 };
        assert_eq!(pagination.pages(0), 0);
        assert_eq!(pagination.pages(9), 1);
        assert_eq!(pagination.pages(10), 2);
    }

    proptest! {
        #[test]
        fn prop_pages_cover_every_item(total in 0usize..500, limit in 1usize..50) {
            let items: Vec<usize> = (0..total).collect();
            let pages = Pagination { page: 1, limit }.pages(total);
            let mut seen = Vec::new();
            for page in 1..=pages {
                let chunk = Pagination { page, limit }.slice(items.clone());
                prop_assert!(!chunk.is_empty() && chunk.len() <= limit);
                seen.extend(chunk);
            }
            prop_assert_eq!(seen, items);
            let past_end = Pagination { page: pages + 1, limit }.slice((0..total).collect::<Vec<_>>());
            prop_assert!(past_end.is_empty());
        }
    }
}
