use actix_web::error::ErrorInternalServerError;
use chrono::NaiveDate;
use sqlx::mysql::{MySql, MySqlArguments};
use sqlx::query::{Query, QueryAs, QueryScalar};

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    String(String),
    U64(u64),
    Bool(bool),
    Date(NaiveDate),
    Null,
}

/// ===============================
/// Dynamic WHERE clause
/// ===============================
#[derive(Debug, Default)]
pub struct Filters {
    clauses: Vec<String>,
    values: Vec<SqlValue>,
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a condition; `clause` carries one `?` per value.
    pub fn push(&mut self, clause: &str, values: impl IntoIterator<Item = SqlValue>) -> &mut Self {
        self.clauses.push(clause.to_string());
        self.values.extend(values);
        self
    }

    /// `" WHERE a AND b"`, or empty when there are no conditions.
    pub fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }

    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }
}

/// ===============================
/// Dynamic UPDATE
/// ===============================
#[derive(Debug)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// Collects `column = ?` pairs for fields that were actually supplied.
/// Column names must come from code, never from the request.
#[derive(Debug)]
pub struct UpdateBuilder {
    table: &'static str,
    sets: Vec<&'static str>,
    values: Vec<SqlValue>,
}

impl UpdateBuilder {
    pub fn new(table: &'static str) -> Self {
        Self { table, sets: Vec::new(), values: Vec::new() }
    }

    pub fn set(&mut self, column: &'static str, value: SqlValue) -> &mut Self {
        self.sets.push(column);
        self.values.push(value);
        self
    }

    pub fn build(self, id_column: &str, id: u64) -> Option<SqlUpdate> {
        if self.sets.is_empty() {
            return None;
        }
        let set_clause = self
            .sets
            .iter()
            .map(|c| format!("{c} = ?"))
            .collect::<Vec<_>>()
            .join(", ");
        let mut values = self.values;
        values.push(SqlValue::U64(id));
        Some(SqlUpdate {
            sql: format!("UPDATE {} SET {} WHERE {} = ?", self.table, set_clause, id_column),
            values,
        })
    }
}

pub fn bind_query<'q>(
    mut query: Query<'q, MySql, MySqlArguments>,
    values: &'q [SqlValue],
) -> Query<'q, MySql, MySqlArguments> {
    for value in values {
        query = match value {
            SqlValue::String(v) => query.bind(v.as_str()),
            SqlValue::U64(v) => query.bind(*v),
            SqlValue::Bool(v) => query.bind(*v),
            SqlValue::Date(v) => query.bind(*v),
            SqlValue::Null => query.bind(None::<String>),
        };
    }
    query
}

pub fn bind_as<'q, O>(
    mut query: QueryAs<'q, MySql, O, MySqlArguments>,
    values: &'q [SqlValue],
) -> QueryAs<'q, MySql, O, MySqlArguments> {
    for value in values {
        query = match value {
            SqlValue::String(v) => query.bind(v.as_str()),
            SqlValue::U64(v) => query.bind(*v),
            SqlValue::Bool(v) => query.bind(*v),
            SqlValue::Date(v) => query.bind(*v),
            SqlValue::Null => query.bind(None::<String>),
        };
    }
    query
}

pub fn bind_scalar<'q, O>(
    mut query: QueryScalar<'q, MySql, O, MySqlArguments>,
    values: &'q [SqlValue],
) -> QueryScalar<'q, MySql, O, MySqlArguments> {
    for value in values {
        query = match value {
            SqlValue::String(v) => query.bind(v.as_str()),
            SqlValue::U64(v) => query.bind(*v),
            SqlValue::Bool(v) => query.bind(*v),
            SqlValue::Date(v) => query.bind(*v),
            SqlValue::Null => query.bind(None::<String>),
        };
    }
    query
}

/// `%term%` with LIKE wildcards in `term` escaped.
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.trim().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// `?, ?, ?` for an `IN (...)` list.
pub fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u64,
    pub per_page: u64,
    pub offset: u64,
}

impl Page {
    pub fn new(page: Option<u64>, per_page: Option<u64>) -> Self {
        let per_page = per_page.unwrap_or(10).clamp(1, 100);
        let page = page.unwrap_or(1).max(1);
        Self { page, per_page, offset: (page - 1) * per_page }
    }
}

/// Logs a database failure and hides it behind a 500.
pub fn db_error(context: &'static str) -> impl Fn(sqlx::Error) -> actix_web::Error {
    move |e| {
        tracing::error!(error = %e, "{context}");
        ErrorInternalServerError("Internal Server Error")
    }
}

pub fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

pub fn is_foreign_key_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filters_have_no_where() {
        assert_eq!(Filters::new().where_sql(), "");
    }

    #[test]
    fn filters_join_with_and() {
        let mut f = Filters::new();
        f.push("t.work_date = ?", [SqlValue::Date(NaiveDate::from_ymd_opt(2026, 3, 2).unwrap())])
            .push(
                "(u.username LIKE ? OR u.full_name LIKE ?)",
                [SqlValue::String("%ana%".into()), SqlValue::String("%ana%".into())],
            );
        assert_eq!(
            f.where_sql(),
            " WHERE t.work_date = ? AND (u.username LIKE ? OR u.full_name LIKE ?)"
        );
        assert_eq!(f.values().len(), 3);
    }

    #[test]
    fn update_only_touches_supplied_columns() {
        let mut b = UpdateBuilder::new("users");
        b.set("email", SqlValue::String("a@b.c".into()))
            .set("is_active_employee", SqlValue::Bool(false));
        let update = b.build("id", 9).unwrap();
        assert_eq!(update.sql, "UPDATE users SET email = ?, is_active_employee = ? WHERE id = ?");
        assert_eq!(update.values.last(), Some(&SqlValue::U64(9)));
    }

    #[test]
    fn empty_update_builds_nothing() {
        assert!(UpdateBuilder::new("users").build("id", 1).is_none());
    }

    #[test]
    fn like_escapes_wildcards() {
        assert_eq!(like_pattern(" 50%_off "), "%50\\%\\_off%");
        assert_eq!(like_pattern("ana"), "%ana%");
    }

    #[test]
    fn placeholder_lists() {
        assert_eq!(placeholders(3), "?, ?, ?");
        assert_eq!(placeholders(1), "?");
    }

    #[test]
    fn pagination_is_clamped() {
        assert_eq!(Page::new(None, None), Page { page: 1, per_page: 10, offset: 0 });
        assert_eq!(Page::new(Some(3), Some(20)), Page { page: 3, per_page: 20, offset: 40 });
        assert_eq!(Page::new(Some(0), Some(1000)), Page { page: 1, per_page: 100, offset: 0 });
        assert_eq!(Page::new(Some(2), Some(0)).per_page, 1);
    }
}
