use super::types::SortDirection;

/// Ordering clause resolved against a per-entity allow-list. An
/// unrecognized sort key falls back to id-ascending instead of erroring,
/// so a stale or hand-edited URL still returns a stable listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: &'static str,
    pub direction: SortDirection,
}

impl OrderBy {
    pub fn id_asc() -> Self {
        Self {
            column: "id",
            direction: SortDirection::Asc,
        }
    }

    /// Resolve `sort` and `order` query parameters. Direction defaults to
    /// ascending; only an exact allow-list match is honored.
    pub fn resolve(allowed: &[&'static str], sort: Option<&str>, order: Option<&str>) -> Self {
        let column = match sort.and_then(|s| allowed.iter().find(|a| **a == s)) {
            Some(col) => *col,
            None => return Self::id_asc(),
        };
        let direction = match order {
            Some(o) if o.eq_ignore_ascii_case("desc") => SortDirection::Desc,
            _ => SortDirection::Asc,
        };
        Self { column, direction }
    }

    pub fn to_sql(&self) -> String {
        format!("ORDER BY \"{}\" {}", self.column, self.direction.to_sql())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALLOWED: &[&'static str] = &["name", "surname", "created_at"];

    #[test]
    fn known_sort_key_is_honored() {
        let order = OrderBy::resolve(ALLOWED, Some("surname"), Some("desc"));
        assert_eq!(order.column, "surname");
        assert_eq!(order.direction, SortDirection::Desc);
        assert_eq!(order.to_sql(), "ORDER BY \"surname\" DESC");
    }

    #[test]
    fn unknown_sort_key_falls_back_to_id_asc() {
        let order = OrderBy::resolve(ALLOWED, Some("password_hash; DROP TABLE"), Some("desc"));
        assert_eq!(order, OrderBy::id_asc());
    }

    #[test]
    fn missing_sort_falls_back_to_id_asc() {
        assert_eq!(OrderBy::resolve(ALLOWED, None, None), OrderBy::id_asc());
    }

    #[test]
    fn direction_defaults_to_asc() {
        let order = OrderBy::resolve(ALLOWED, Some("name"), Some("sideways"));
        assert_eq!(order.direction, SortDirection::Asc);
    }
}
