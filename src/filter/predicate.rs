use super::types::Param;

/// A composable WHERE-clause tree. Role scopes, URL column filters and
/// free-text search all compile down to this before a single statement is
/// rendered, so access scoping and user filters combine with AND and can
/// never override one another.
///
/// Column names are authored in code (never taken from the request), and
/// `Exists` subqueries are static SQL with `?` placeholders that get
/// renumbered into `$n` during rendering.
#[derive(Debug, Clone)]
pub enum Predicate {
    /// Matches every row (admin scope).
    All,
    /// Matches no row.
    Nothing,
    Eq(&'static str, Param),
    /// Equality against the text form of an enum-typed column.
    EqText(&'static str, String),
    Ne(&'static str, Param),
    In(&'static str, Vec<Param>),
    Between(&'static str, Param, Param),
    IsNull(&'static str),
    /// Case-insensitive substring search OR-ed over a column set.
    Search(Vec<&'static str>, String),
    /// Correlated subquery, e.g. reachability of a row through a class or
    /// lesson the caller owns.
    Exists {
        subquery: &'static str,
        params: Vec<Param>,
    },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

impl Predicate {
    pub fn eq(column: &'static str, value: impl Into<Param>) -> Self {
        Predicate::Eq(column, value.into())
    }

    pub fn eq_text(column: &'static str, value: impl Into<String>) -> Self {
        Predicate::EqText(column, value.into())
    }

    pub fn ne(column: &'static str, value: impl Into<Param>) -> Self {
        Predicate::Ne(column, value.into())
    }

    pub fn between(
        column: &'static str,
        low: impl Into<Param>,
        high: impl Into<Param>,
    ) -> Self {
        Predicate::Between(column, low.into(), high.into())
    }

    pub fn exists(subquery: &'static str, params: Vec<Param>) -> Self {
        Predicate::Exists { subquery, params }
    }

    /// AND-combine, flattening trivial cases.
    pub fn and(parts: Vec<Predicate>) -> Self {
        let mut kept: Vec<Predicate> = parts
            .into_iter()
            .filter(|p| !matches!(p, Predicate::All))
            .collect();
        match kept.len() {
            0 => Predicate::All,
            1 => kept.remove(0),
            _ => Predicate::And(kept),
        }
    }

    pub fn or(parts: Vec<Predicate>) -> Self {
        let mut kept: Vec<Predicate> = parts
            .into_iter()
            .filter(|p| !matches!(p, Predicate::Nothing))
            .collect();
        match kept.len() {
            0 => Predicate::Nothing,
            1 => kept.remove(0),
            _ => Predicate::Or(kept),
        }
    }

    /// Render to a SQL fragment, appending bind values to `params`.
    /// Numbering continues from whatever is already in `params`.
    pub fn to_sql(&self, params: &mut Vec<Param>) -> String {
        match self {
            Predicate::All => "1=1".to_string(),
            Predicate::Nothing => "1=0".to_string(),
            Predicate::Eq(column, value) => {
                format!("\"{}\" = {}", column, push_param(params, value.clone()))
            }
            Predicate::EqText(column, value) => format!(
                "\"{}\"::text = {}",
                column,
                push_param(params, Param::Text(value.clone()))
            ),
            Predicate::Ne(column, value) => {
                format!("\"{}\" <> {}", column, push_param(params, value.clone()))
            }
            Predicate::In(column, values) => {
                // Empty IN lists match nothing rather than erroring.
                if values.is_empty() {
                    return "1=0".to_string();
                }
                let placeholders: Vec<String> = values
                    .iter()
                    .map(|v| push_param(params, v.clone()))
                    .collect();
                format!("\"{}\" IN ({})", column, placeholders.join(", "))
            }
            Predicate::Between(column, low, high) => format!(
                "\"{}\" BETWEEN {} AND {}",
                column,
                push_param(params, low.clone()),
                push_param(params, high.clone())
            ),
            Predicate::IsNull(column) => format!("\"{}\" IS NULL", column),
            Predicate::Search(columns, term) => {
                if columns.is_empty() || term.is_empty() {
                    return "1=1".to_string();
                }
                let pattern = format!("%{}%", escape_like(term));
                let parts: Vec<String> = columns
                    .iter()
                    .map(|c| {
                        format!("\"{}\" ILIKE {}", c, push_param(params, Param::Text(pattern.clone())))
                    })
                    .collect();
                format!("({})", parts.join(" OR "))
            }
            Predicate::Exists { subquery, params: sub_params } => {
                let mut rendered = String::with_capacity(subquery.len() + 16);
                let mut remaining = sub_params.iter();
                for ch in subquery.chars() {
                    if ch == '?' {
                        let value = remaining
                            .next()
                            .cloned()
                            .unwrap_or(Param::Text(String::new()));
                        rendered.push_str(&push_param(params, value));
                    } else {
                        rendered.push(ch);
                    }
                }
                format!("EXISTS ({})", rendered)
            }
            Predicate::And(parts) => {
                let rendered: Vec<String> =
                    parts.iter().map(|p| p.to_sql(params)).collect();
                format!("({})", rendered.join(" AND "))
            }
            Predicate::Or(parts) => {
                let rendered: Vec<String> =
                    parts.iter().map(|p| p.to_sql(params)).collect();
                format!("({})", rendered.join(" OR "))
            }
        }
    }
}

fn push_param(params: &mut Vec<Param>, value: Param) -> String {
    params.push(value);
    format!("${}", params.len())
}

/// Escape LIKE wildcards so a search term matches literally.
fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eq_renders_with_placeholder() {
        let mut params = vec![];
        let sql = Predicate::eq("class_id", 5).to_sql(&mut params);
        assert_eq!(sql, "\"class_id\" = $1");
        assert_eq!(params, vec![Param::Int(5)]);
    }

    #[test]
    fn eq_text_casts_enum_column() {
        let mut params = vec![];
        let sql = Predicate::eq_text("status", "PENDING").to_sql(&mut params);
        assert_eq!(sql, "\"status\"::text = $1");
        assert_eq!(params, vec![Param::Text("PENDING".to_string())]);
    }

    #[test]
    fn empty_in_matches_nothing() {
        let mut params = vec![];
        let sql = Predicate::In("id", vec![]).to_sql(&mut params);
        assert_eq!(sql, "1=0");
        assert!(params.is_empty());
    }

    #[test]
    fn search_ors_over_columns() {
        let mut params = vec![];
        let sql = Predicate::Search(vec!["name", "surname"], "ann".to_string())
            .to_sql(&mut params);
        assert_eq!(sql, "(\"name\" ILIKE $1 OR \"surname\" ILIKE $2)");
        assert_eq!(params[0], Param::Text("%ann%".to_string()));
    }

    #[test]
    fn search_escapes_like_wildcards() {
        let mut params = vec![];
        Predicate::Search(vec!["name"], "50%_off".to_string()).to_sql(&mut params);
        assert_eq!(params[0], Param::Text("%50\\%\\_off%".to_string()));
    }

    #[test]
    fn exists_renumbers_placeholders_after_existing_params() {
        let mut params = vec![Param::Int(1)];
        let sql = Predicate::exists(
            "SELECT 1 FROM classes c WHERE c.id = students.class_id AND c.supervisor_id = ?",
            vec![Param::Text("t1".to_string())],
        )
        .to_sql(&mut params);
        assert!(sql.contains("c.supervisor_id = $2"), "got: {}", sql);
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn scope_and_column_filter_combine_with_and() {
        let mut params = vec![];
        let combined = Predicate::and(vec![
            Predicate::eq("parent_id", "p1"),
            Predicate::eq("class_id", 3),
        ]);
        let sql = combined.to_sql(&mut params);
        assert_eq!(sql, "(\"parent_id\" = $1 AND \"class_id\" = $2)");
    }

    #[test]
    fn and_flattens_all() {
        let mut params = vec![];
        let combined = Predicate::and(vec![Predicate::All, Predicate::eq("id", 1)]);
        assert_eq!(combined.to_sql(&mut params), "\"id\" = $1");

        let only_all = Predicate::and(vec![Predicate::All, Predicate::All]);
        assert_eq!(only_all.to_sql(&mut vec![]), "1=1");
    }
}
