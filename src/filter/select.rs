use super::error::FilterError;
use super::order::OrderBy;
use super::predicate::Predicate;
use super::types::{Page, SqlResult};

/// Builder for a paged, role-scoped list read: one SELECT and one COUNT
/// over the same predicate, so the repository can run both in a single
/// transaction and the row set always matches the reported total.
#[derive(Debug, Clone)]
pub struct ListSelect {
    table: &'static str,
    predicate: Predicate,
    order: OrderBy,
    page: Option<Page>,
}

impl ListSelect {
    pub fn new(table: &'static str) -> Result<Self, FilterError> {
        validate_identifier(table)
            .then_some(())
            .ok_or_else(|| FilterError::InvalidTableName(table.to_string()))?;
        Ok(Self {
            table,
            predicate: Predicate::All,
            order: OrderBy::id_asc(),
            page: None,
        })
    }

    pub fn predicate(mut self, predicate: Predicate) -> Self {
        self.predicate = predicate;
        self
    }

    pub fn order(mut self, order: OrderBy) -> Self {
        self.order = order;
        self
    }

    pub fn page(mut self, page: Page) -> Self {
        self.page = Some(page);
        self
    }

    pub fn to_sql(&self) -> SqlResult {
        let mut params = vec![];
        let where_clause = self.predicate.to_sql(&mut params);
        let mut query = format!(
            "SELECT * FROM \"{}\" WHERE {} {}",
            self.table,
            where_clause,
            self.order.to_sql()
        );
        if let Some(page) = self.page {
            query.push_str(&format!(" LIMIT {} OFFSET {}", page.size, page.offset()));
        }
        SqlResult { query, params }
    }

    pub fn to_count_sql(&self) -> SqlResult {
        let mut params = vec![];
        let where_clause = self.predicate.to_sql(&mut params);
        SqlResult {
            query: format!(
                "SELECT COUNT(*) FROM \"{}\" WHERE {}",
                self.table, where_clause
            ),
            params,
        }
    }
}

fn validate_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::types::{Param, SortDirection};

    #[test]
    fn rejects_bad_table_names() {
        assert!(ListSelect::new("students").is_ok());
        // Static table names never hit this, but the guard stays anyway.
        let err = validate_identifier("students; DROP TABLE users");
        assert!(!err);
    }

    #[test]
    fn full_select_shape() {
        let select = ListSelect::new("students")
            .unwrap()
            .predicate(Predicate::eq("class_id", 7))
            .order(OrderBy {
                column: "surname",
                direction: SortDirection::Asc,
            })
            .page(Page::new(2, 10));
        let sql = select.to_sql();
        assert_eq!(
            sql.query,
            "SELECT * FROM \"students\" WHERE \"class_id\" = $1 ORDER BY \"surname\" ASC LIMIT 10 OFFSET 10"
        );
        assert_eq!(sql.params, vec![Param::Int(7)]);
    }

    #[test]
    fn count_shares_predicate_without_pagination() {
        let select = ListSelect::new("students")
            .unwrap()
            .predicate(Predicate::eq("class_id", 7))
            .page(Page::new(5, 10));
        let count = select.to_count_sql();
        assert_eq!(
            count.query,
            "SELECT COUNT(*) FROM \"students\" WHERE \"class_id\" = $1"
        );
        assert!(!count.query.contains("LIMIT"));
    }
}
