use serde::Deserialize;
use uuid::Uuid;

use super::error::FilterError;
use super::types::Page;

/// Superset of list-page query parameters. Each list endpoint reads the
/// subset that applies to its entity and ignores the rest.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    /// Kept as a raw string: `page=abc` and `page=0` both mean page 1.
    pub page: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,

    pub class_id: Option<i32>,
    pub grade_id: Option<i32>,
    pub subject_id: Option<i32>,
    pub lesson_id: Option<i32>,
    pub teacher_id: Option<Uuid>,
    pub student_id: Option<Uuid>,
    pub status: Option<String>,
    pub payment_type: Option<String>,
    pub blood_type: Option<String>,
    pub sex: Option<String>,
    pub day: Option<String>,
    /// Bucketed range like `20-30` (inclusive).
    pub capacity_range: Option<String>,
}

impl ListQuery {
    /// Requested page, normalized: absent, non-numeric or < 1 all mean 1.
    pub fn page_number(&self) -> i64 {
        self.page
            .as_deref()
            .and_then(|p| p.trim().parse::<i64>().ok())
            .filter(|p| *p >= 1)
            .unwrap_or(1)
    }

    pub fn page(&self, size: i64) -> Page {
        Page::new(self.page_number(), size)
    }

    /// Trimmed search term, dropping blank input.
    pub fn search_term(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    /// Parse a `lo-hi` range bucket.
    pub fn range(raw: &str) -> Result<(i64, i64), FilterError> {
        let (lo, hi) = raw
            .split_once('-')
            .ok_or_else(|| FilterError::InvalidRange(raw.to_string()))?;
        let lo: i64 = lo
            .trim()
            .parse()
            .map_err(|_| FilterError::InvalidRange(raw.to_string()))?;
        let hi: i64 = hi
            .trim()
            .parse()
            .map_err(|_| FilterError::InvalidRange(raw.to_string()))?;
        if lo > hi {
            return Err(FilterError::InvalidRange(raw.to_string()));
        }
        Ok((lo, hi))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_page(page: Option<&str>) -> ListQuery {
        ListQuery {
            page: page.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn absent_page_defaults_to_one() {
        assert_eq!(with_page(None).page_number(), 1);
    }

    #[test]
    fn page_zero_and_garbage_behave_like_page_one() {
        assert_eq!(with_page(Some("0")).page_number(), 1);
        assert_eq!(with_page(Some("-3")).page_number(), 1);
        assert_eq!(with_page(Some("two")).page_number(), 1);
        assert_eq!(with_page(Some("")).page_number(), 1);
    }

    #[test]
    fn numeric_page_is_used() {
        assert_eq!(with_page(Some("4")).page_number(), 4);
        assert_eq!(with_page(Some(" 2 ")).page_number(), 2);
    }

    #[test]
    fn page_offset_matches_page_size() {
        let page = with_page(Some("3")).page(10);
        assert_eq!(page.offset(), 20);
        assert_eq!(page.size, 10);
    }

    #[test]
    fn blank_search_is_dropped() {
        let q = ListQuery {
            search: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(q.search_term(), None);
    }

    #[test]
    fn range_parses_and_rejects() {
        assert_eq!(ListQuery::range("20-30").unwrap(), (20, 30));
        assert!(ListQuery::range("30-20").is_err());
        assert!(ListQuery::range("lots").is_err());
    }
}
