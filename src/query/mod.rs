//! Composition of parameterized queries from a variable set of optional filters.
//!
//! A template carries exactly one [`PREDICATES`] marker standing where a
//! `WHERE` clause would go. Fixed conditions and present filters are joined
//! with `AND` and injected there; absent filters leave no trace. Trailing bind
//! markers are written as `?`. The text is emitted through sqlx's
//! [`QueryBuilder`], which numbers PostgreSQL `$n` placeholders, filter
//! parameters first, then trailing parameters such as `LIMIT`/`OFFSET`.

pub mod pagination;

use sqlx::{
    postgres::PgArguments,
    query_builder::Separated,
    Arguments, Execute, Postgres, QueryBuilder,
};
use thiserror::Error;

/// Marker replaced by the composed `WHERE ...` clause (or by nothing).
pub const PREDICATES: &str = "{predicates}";

const BIND: char = '?';

/// A value bound to a positional parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlParam {
    Int(i32),
    BigInt(i64),
    Text(String),
}

impl From<i32> for SqlParam {
    fn from(v: i32) -> Self {
        SqlParam::Int(v)
    }
}

impl From<i64> for SqlParam {
    fn from(v: i64) -> Self {
        SqlParam::BigInt(v)
    }
}

impl From<String> for SqlParam {
    fn from(v: String) -> Self {
        SqlParam::Text(v)
    }
}

impl From<&str> for SqlParam {
    fn from(v: &str) -> Self {
        SqlParam::Text(v.to_owned())
    }
}

/// One candidate predicate: `column = value` when the value is present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: &'static str,
    pub value: Option<SqlParam>,
}

impl Filter {
    pub fn new<V: Into<SqlParam>>(column: &'static str, value: Option<V>) -> Self {
        Self {
            column,
            value: value.map(Into::into),
        }
    }
}

/// Ordered list of candidate predicates.
pub type FilterSpec = Vec<Filter>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("column `{0}` is not on the filter allow-list")]
    InvalidFilterSpec(String),
    #[error("query template does not match its parameters: {0}")]
    PlaceholderMismatch(&'static str),
}

/// Final SQL text plus parameters in placeholder order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedQuery {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

impl ComposedQuery {
    /// A parameterless statement.
    pub fn plain(sql: &str) -> Self {
        Self {
            sql: sql.to_owned(),
            params: Vec::new(),
        }
    }

    pub fn arguments(&self) -> PgArguments {
        let mut args = PgArguments::default();
        for param in &self.params {
            match param {
                SqlParam::Int(v) => args.add(*v),
                SqlParam::BigInt(v) => args.add(*v),
                SqlParam::Text(v) => args.add(v.clone()),
            }
        }
        args
    }
}

/// Builder turning a template and a [`FilterSpec`] into a [`ComposedQuery`].
#[derive(Debug)]
pub struct QueryComposer<'a> {
    template: &'a str,
    allowed: &'a [&'static str],
    fixed: Vec<&'static str>,
    filters: FilterSpec,
    trailing: Vec<SqlParam>,
}

impl<'a> QueryComposer<'a> {
    pub fn new(template: &'a str, allowed: &'a [&'static str]) -> Self {
        Self {
            template,
            allowed,
            fixed: Vec::new(),
            filters: Vec::new(),
            trailing: Vec::new(),
        }
    }

    /// Parameterless condition that always applies (e.g. `x IS NOT NULL`).
    pub fn require(mut self, condition: &'static str) -> Self {
        self.fixed.push(condition);
        self
    }

    pub fn filter<V: Into<SqlParam>>(mut self, column: &'static str, value: Option<V>) -> Self {
        self.filters.push(Filter::new(column, value));
        self
    }

    pub fn filters(mut self, spec: impl IntoIterator<Item = Filter>) -> Self {
        self.filters.extend(spec);
        self
    }

    /// Parameter bound to the next `?` after the predicate marker.
    pub fn trailing<V: Into<SqlParam>>(mut self, value: V) -> Self {
        self.trailing.push(value.into());
        self
    }

    pub fn compose(self) -> Result<ComposedQuery, QueryError> {
        let (head, tail) = self
            .template
            .split_once(PREDICATES)
            .ok_or(QueryError::PlaceholderMismatch("missing predicate marker"))?;
        if tail.contains(PREDICATES) {
            return Err(QueryError::PlaceholderMismatch(
                "more than one predicate marker",
            ));
        }
        if head.contains(BIND) {
            return Err(QueryError::PlaceholderMismatch(
                "bind marker before the predicate marker",
            ));
        }
        if self.fixed.iter().any(|c| c.contains(BIND)) {
            return Err(QueryError::PlaceholderMismatch(
                "bind marker inside a fixed condition",
            ));
        }
        if tail.matches(BIND).count() != self.trailing.len() {
            return Err(QueryError::PlaceholderMismatch(
                "trailing bind markers do not match trailing parameters",
            ));
        }

        // Every column is checked, present or not.
        if let Some(bad) = self
            .filters
            .iter()
            .find(|f| !self.allowed.contains(&f.column))
        {
            return Err(QueryError::InvalidFilterSpec(bad.column.to_owned()));
        }

        let present: Vec<(&'static str, SqlParam)> = self
            .filters
            .into_iter()
            .filter_map(|f| f.value.map(|v| (f.column, v)))
            .collect();

        let mut params = Vec::with_capacity(present.len() + self.trailing.len());
        let mut builder = QueryBuilder::<Postgres>::new(head);

        if !self.fixed.is_empty() || !present.is_empty() {
            builder.push("WHERE ");
            let mut conditions = builder.separated(" AND ");
            for condition in &self.fixed {
                conditions.push(*condition);
            }
            for (column, value) in present {
                conditions.push(format_args!("{column} = "));
                bind_unseparated(&mut conditions, &value);
                params.push(value);
            }
        }

        // Bind count checked above.
        let mut segments = tail.split(BIND);
        if let Some(first) = segments.next() {
            builder.push(first);
        }
        for (value, segment) in self.trailing.into_iter().zip(segments) {
            bind(&mut builder, &value);
            builder.push(segment);
            params.push(value);
        }

        let sql = builder.build().sql().to_owned();
        Ok(ComposedQuery { sql, params })
    }
}

fn bind(builder: &mut QueryBuilder<'_, Postgres>, value: &SqlParam) {
    match value {
        SqlParam::Int(v) => builder.push_bind(*v),
        SqlParam::BigInt(v) => builder.push_bind(*v),
        SqlParam::Text(v) => builder.push_bind(v.clone()),
    };
}

fn bind_unseparated(conditions: &mut Separated<'_, '_, Postgres, &str>, value: &SqlParam) {
    match value {
        SqlParam::Int(v) => conditions.push_bind_unseparated(*v),
        SqlParam::BigInt(v) => conditions.push_bind_unseparated(*v),
        SqlParam::Text(v) => conditions.push_bind_unseparated(v.clone()),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLUMNS: &[&str] = &["m.season_year", "m.season::text"];
    const LISTING: &str =
        "SELECT to_jsonb(m) FROM media m {predicates} ORDER BY m.popularity DESC LIMIT ? OFFSET ?";

    #[test]
    fn absent_filters_yield_unconditional_query() {
        let q = QueryComposer::new(LISTING, COLUMNS)
            .filter::<i32>("m.season_year", None)
            .filter::<String>("m.season::text", None)
            .trailing(50_i64)
            .trailing(0_i64)
            .compose()
            .unwrap();

        assert!(!q.sql.contains("WHERE"));
        assert_eq!(
            q.sql,
            "SELECT to_jsonb(m) FROM media m  ORDER BY m.popularity DESC LIMIT $1 OFFSET $2"
        );
        assert_eq!(q.params, vec![SqlParam::BigInt(50), SqlParam::BigInt(0)]);
    }

    #[test]
    fn year_only_with_second_page() {
        let q = QueryComposer::new(LISTING, COLUMNS)
            .filter("m.season_year", Some(2023))
            .filter::<String>("m.season::text", None)
            .trailing(50_i64)
            .trailing(50_i64)
            .compose()
            .unwrap();

        assert_eq!(
            q.sql,
            "SELECT to_jsonb(m) FROM media m WHERE m.season_year = $1 ORDER BY m.popularity DESC LIMIT $2 OFFSET $3"
        );
        assert_eq!(
            q.params,
            vec![SqlParam::Int(2023), SqlParam::BigInt(50), SqlParam::BigInt(50)]
        );
    }

    #[test]
    fn present_filters_keep_their_order_before_trailing_params() {
        let q = QueryComposer::new(LISTING, COLUMNS)
            .filter("m.season::text", Some("FALL"))
            .filter("m.season_year", Some(2021))
            .trailing(50_i64)
            .trailing(100_i64)
            .compose()
            .unwrap();

        assert!(q
            .sql
            .contains("WHERE m.season::text = $1 AND m.season_year = $2 ORDER BY"));
        assert!(q.sql.ends_with("LIMIT $3 OFFSET $4"));
        assert_eq!(
            q.params,
            vec![
                SqlParam::Text("FALL".into()),
                SqlParam::Int(2021),
                SqlParam::BigInt(50),
                SqlParam::BigInt(100),
            ]
        );
    }

    #[test]
    fn placeholder_count_matches_params() {
        let q = QueryComposer::new(LISTING, COLUMNS)
            .filter("m.season_year", Some(1999))
            .filter("m.season::text", Some("SPRING"))
            .trailing(50_i64)
            .trailing(0_i64)
            .compose()
            .unwrap();

        assert_eq!(q.sql.matches('$').count(), q.params.len());
        for n in 1..=q.params.len() {
            assert!(q.sql.contains(&format!("${n}")));
        }
    }

    #[test]
    fn fixed_conditions_come_first_and_take_no_params() {
        let q = QueryComposer::new(LISTING, COLUMNS)
            .require("m.average_score IS NOT NULL")
            .filter("m.season_year", Some(2020))
            .trailing(50_i64)
            .trailing(0_i64)
            .compose()
            .unwrap();

        assert!(q
            .sql
            .contains("WHERE m.average_score IS NOT NULL AND m.season_year = $1 ORDER BY"));
        assert_eq!(q.params.len(), 3);
    }

    #[test]
    fn fixed_condition_alone_still_produces_where() {
        let q = QueryComposer::new("SELECT 1 FROM media m {predicates}", COLUMNS)
            .require("m.average_score IS NOT NULL")
            .compose()
            .unwrap();
        assert_eq!(q.sql, "SELECT 1 FROM media m WHERE m.average_score IS NOT NULL");
        assert!(q.params.is_empty());
    }

    #[test]
    fn rejects_column_outside_allow_list() {
        let err = QueryComposer::new(LISTING, COLUMNS)
            .filter("m.season_year; DROP TABLE users", Some(1))
            .trailing(50_i64)
            .trailing(0_i64)
            .compose()
            .unwrap_err();
        assert_eq!(
            err,
            QueryError::InvalidFilterSpec("m.season_year; DROP TABLE users".into())
        );
    }

    #[test]
    fn rejects_unknown_column_even_when_value_absent() {
        let err = QueryComposer::new(LISTING, COLUMNS)
            .filter::<i32>("m.id", None)
            .trailing(50_i64)
            .trailing(0_i64)
            .compose()
            .unwrap_err();
        assert!(matches!(err, QueryError::InvalidFilterSpec(c) if c == "m.id"));
    }

    #[test]
    fn values_never_reach_sql_text() {
        let hostile = "WINTER' OR '1'='1";
        let q = QueryComposer::new(LISTING, COLUMNS)
            .filter("m.season::text", Some(hostile))
            .trailing(50_i64)
            .trailing(0_i64)
            .compose()
            .unwrap();
        assert!(!q.sql.contains(hostile));
        assert_eq!(q.params[0], SqlParam::Text(hostile.into()));
    }

    #[test]
    fn template_shape_errors() {
        let missing = QueryComposer::new("SELECT 1", COLUMNS).compose();
        assert!(matches!(missing, Err(QueryError::PlaceholderMismatch(_))));

        let twice = QueryComposer::new("{predicates} {predicates}", COLUMNS).compose();
        assert!(matches!(twice, Err(QueryError::PlaceholderMismatch(_))));

        let early = QueryComposer::new("SELECT ? {predicates}", COLUMNS)
            .trailing(1_i64)
            .compose();
        assert!(matches!(early, Err(QueryError::PlaceholderMismatch(_))));

        let short = QueryComposer::new(LISTING, COLUMNS).trailing(50_i64).compose();
        assert!(matches!(short, Err(QueryError::PlaceholderMismatch(_))));

        let bad_fixed = QueryComposer::new("SELECT 1 {predicates}", COLUMNS)
            .require("x = ?")
            .compose();
        assert!(matches!(bad_fixed, Err(QueryError::PlaceholderMismatch(_))));
    }

    #[test]
    fn plain_query_has_no_params() {
        let q = ComposedQuery::plain("SELECT 1");
        assert_eq!(q.sql, "SELECT 1");
        assert!(q.params.is_empty());
    }
}
