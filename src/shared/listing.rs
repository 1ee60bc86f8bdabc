use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;
use strum_macros::{Display, EnumString};

use super::AppError;

const DEFAULT_PAGE: i64 = 1;
const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

/// Raw list query string. Every field is kept as text so a bad `page` or
/// `limit` falls back to its default instead of rejecting the request.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub search: Option<String>,
    pub status: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    /// Orients an ascending comparison according to this order
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Pagination block of the response envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total_results: i64,
    pub total_pages: i64,
    pub current_page: i64,
    pub limit: i64,
}

/// Normalised list parameters
#[derive(Debug, Clone)]
pub struct ListParams {
    pub page: i64,
    pub limit: i64,
    search: Option<String>,
    status: Option<String>,
    sort_by: Option<String>,
    pub sort_order: SortOrder,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
            search: None,
            status: None,
            sort_by: None,
            sort_order: SortOrder::default(),
        }
    }
}

fn positive_or(raw: Option<&str>, default: i64) -> i64 {
    raw.and_then(|value| value.trim().parse::<i64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

/// `%term%` for ILIKE with `\`, `%` and `_` escaped, so the term matches literally
pub fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.trim().chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn non_blank(raw: Option<String>) -> Option<String> {
    raw.map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl From<ListQuery> for ListParams {
    fn from(query: ListQuery) -> Self {
        Self {
            page: positive_or(query.page.as_deref(), DEFAULT_PAGE),
            limit: positive_or(query.limit.as_deref(), DEFAULT_LIMIT).min(MAX_LIMIT),
            search: non_blank(query.search),
            status: non_blank(query.status),
            sort_by: non_blank(query.sort_by),
            sort_order: query
                .sort_order
                .as_deref()
                .and_then(|raw| SortOrder::from_str(raw.trim()).ok())
                .unwrap_or_default(),
        }
    }
}

impl ListParams {
    pub fn new(page: i64, limit: i64) -> Self {
        Self {
            page: page.max(1),
            limit: if limit > 0 {
                limit.min(MAX_LIMIT)
            } else {
                DEFAULT_LIMIT
            },
            ..Self::default()
        }
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = non_blank(Some(search.into()));
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = non_blank(Some(status.into()));
        self
    }

    pub fn with_sort(mut self, sort_by: impl Into<String>, sort_order: SortOrder) -> Self {
        self.sort_by = non_blank(Some(sort_by.into()));
        self.sort_order = sort_order;
        self
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    /// Trimmed search text, if any
    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }

    /// Escaped `%term%` pattern for ILIKE queries
    pub fn search_pattern(&self) -> Option<String> {
        self.search.as_deref().map(like_pattern)
    }

    /// Case-insensitive substring match of the search term against any field.
    /// No search term matches everything.
    pub fn matches(&self, fields: &[&str]) -> bool {
        match &self.search {
            None => true,
            Some(term) => {
                let needle = term.to_lowercase();
                fields
                    .iter()
                    .any(|field| field.to_lowercase().contains(&needle))
            }
        }
    }

    /// Parses the `status` filter; an unknown value is a validation error
    pub fn status_filter<S: FromStr>(&self) -> Result<Option<S>, AppError> {
        match &self.status {
            None => Ok(None),
            Some(raw) => S::from_str(raw)
                .map(Some)
                .map_err(|_| AppError::Validation(format!("Invalid status filter: {raw}"))),
        }
    }

    /// Parses `sortBy`; unknown keys fall back to the default key
    pub fn sort_key<K: FromStr + Default>(&self) -> K {
        self.sort_by
            .as_deref()
            .and_then(|raw| K::from_str(raw).ok())
            .unwrap_or_default()
    }

    pub fn pagination(&self, total: i64) -> Pagination {
        Pagination {
            total_results: total,
            total_pages: {
                let total = total.max(0);
                total / self.limit + i64::from(total % self.limit != 0)
            },
            current_page: self.page,
            limit: self.limit,
        }
    }

    /// Cuts one page out of an already filtered and sorted collection
    pub fn paginate<T>(&self, items: Vec<T>) -> Page<T> {
        let total = items.len() as i64;
        let items = items
            .into_iter()
            .skip(usize::try_from(self.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(self.limit).unwrap_or(usize::MAX))
            .collect();
        Page { items, total }
    }
}

/// One page of results plus the total number of matches
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn query(page: Option<&str>, limit: Option<&str>) -> ListQuery {
        ListQuery {
            page: page.map(String::from),
            limit: limit.map(String::from),
            ..ListQuery::default()
        }
    }

    #[rstest]
    #[case(None, None, 1, 10)]
    #[case(Some("3"), Some("5"), 3, 5)]
    #[case(Some("abc"), Some("x"), 1, 10)]
    #[case(Some("0"), Some("-4"), 1, 10)]
    #[case(Some(" 2 "), Some("20"), 2, 20)]
    fn test_page_and_limit_fall_back_to_defaults(
        #[case] page: Option<&str>,
        #[case] limit: Option<&str>,
        #[case] expected_page: i64,
        #[case] expected_limit: i64,
    ) {
        let params = ListParams::from(query(page, limit));
        assert_eq!(params.page, expected_page);
        assert_eq!(params.limit, expected_limit);
    }

    #[rstest]
    #[case(Some("9223372036854775807"), None, i64::MAX, 10)]
    #[case(None, Some("9223372036854775807"), 1, MAX_LIMIT)]
    #[case(Some("9223372036854775807"), Some("9223372036854775807"), i64::MAX, MAX_LIMIT)]
    fn test_huge_page_and_limit_do_not_overflow(
        #[case] page: Option<&str>,
        #[case] limit: Option<&str>,
        #[case] expected_page: i64,
        #[case] expected_limit: i64,
    ) {
        let params = ListParams::from(query(page, limit));
        assert_eq!(params.page, expected_page);
        assert_eq!(params.limit, expected_limit);

        assert!(params.offset() >= 0);
        let pagination = params.pagination(2);
        assert_eq!(pagination.total_pages, 1);
        assert_eq!(params.pagination(i64::MAX).total_results, i64::MAX);

        let page = params.paginate(vec![1, 2]);
        assert_eq!(page.total, 2);
        assert_eq!(page.items.len(), if expected_page == 1 { 2 } else { 0 });
    }

    #[test]
    fn test_new_clamps_limit() {
        assert_eq!(ListParams::new(i64::MAX, i64::MAX).limit, MAX_LIMIT);
        assert_eq!(ListParams::new(1, 0).limit, DEFAULT_LIMIT);
        assert_eq!(ListParams::new(i64::MAX, 50).offset(), i64::MAX);
    }

    #[rstest]
    #[case("yoga", "%yoga%")]
    #[case(" 50% ", "%50\\%%")]
    #[case("a_b", "%a\\_b%")]
    #[case("c:\\x", "%c:\\\\x%")]
    fn test_like_pattern_escapes_wildcards(#[case] term: &str, #[case] expected: &str) {
        assert_eq!(like_pattern(term), expected);
    }

    #[test]
    fn test_search_pattern_is_escaped() {
        let params = ListParams::default().with_search("_");
        assert_eq!(params.search_pattern().as_deref(), Some("%\\_%"));
        assert_eq!(ListParams::default().search_pattern(), None);
    }

    #[test]
    fn test_sort_order_defaults_to_desc() {
        let params = ListParams::from(ListQuery {
            sort_order: Some("sideways".into()),
            ..ListQuery::default()
        });
        assert_eq!(params.sort_order, SortOrder::Desc);

        let params = ListParams::from(ListQuery {
            sort_order: Some("ASC".into()),
            ..ListQuery::default()
        });
        assert_eq!(params.sort_order, SortOrder::Asc);
    }

    #[test]
    fn test_pagination_rounds_pages_up() {
        let params = ListParams::new(2, 10);
        assert_eq!(params.offset(), 10);

        let pagination = params.pagination(21);
        assert_eq!(pagination.total_pages, 3);
        assert_eq!(pagination.current_page, 2);
        assert_eq!(params.pagination(0).total_pages, 0);
    }

    #[test]
    fn test_paginate_slices_items() {
        let page = ListParams::new(2, 2).paginate(vec![1, 2, 3, 4, 5]);
        assert_eq!(page.items, vec![3, 4]);
        assert_eq!(page.total, 5);
    }

    #[test]
    fn test_matches_is_case_insensitive() {
        let params = ListParams::default().with_search("  yoGA ");
        assert!(params.matches(&["Morning Yoga room", "other"]));
        assert!(!params.matches(&["Boxing"]));
        assert!(ListParams::default().matches(&[]));
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let params = ListParams::default().with_status("sleepy");
        let result = params.status_filter::<SortOrder>();
        assert!(matches!(result, Err(AppError::Validation(_))));

        let params = ListParams::default().with_status("asc");
        assert_eq!(params.status_filter::<SortOrder>().unwrap(), Some(SortOrder::Asc));
    }
}
