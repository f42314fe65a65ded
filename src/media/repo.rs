//! Media queries. Rows go out as `to_jsonb(...)` so their columns are
//! forwarded as-is; only the filter and ordering columns are named here.

use serde_json::Value;
use sqlx::PgConnection;

use crate::{
    db,
    error::ApiError,
    media::dto::ListingFilters,
    query::{pagination::Page, ComposedQuery, QueryComposer, QueryError},
};

pub const MEDIA_ID: &str = "m.id";
pub const SEASON_YEAR: &str = "m.season_year";
// `season` is a Postgres enum; compare on its text form so a bound TEXT works.
pub const SEASON: &str = "m.season::text";

const LISTING_COLUMNS: &[&str] = &[SEASON_YEAR, SEASON];
const ID_COLUMNS: &[&str] = &[MEDIA_ID];

const MEDIA_BY_ID: &str = "SELECT to_jsonb(m) FROM media m {predicates}";

const MEDIA_DETAIL_BY_ID: &str = r#"
    SELECT COALESCE(to_jsonb(md), '{}'::jsonb) || to_jsonb(m)
    FROM media m
    LEFT JOIN media_details md ON m.id = md.id
    {predicates}
"#;

const MEDIA_PAGE: &str = r#"
    SELECT to_jsonb(m)
    FROM media m
    {predicates}
    ORDER BY m.id
    LIMIT ? OFFSET ?
"#;

const POPULAR_PAGE: &str = r#"
    SELECT to_jsonb(m)
    FROM media m
    LEFT JOIN media_details md ON m.id = md.id
    {predicates}
    ORDER BY md.popularity DESC NULLS LAST, m.id
    LIMIT ? OFFSET ?
"#;

const TOP_PAGE: &str = r#"
    SELECT to_jsonb(m)
    FROM media m
    {predicates}
    ORDER BY m.average_score DESC, m.id
    LIMIT ? OFFSET ?
"#;

pub fn by_id_query(id: i32) -> Result<ComposedQuery, QueryError> {
    QueryComposer::new(MEDIA_BY_ID, ID_COLUMNS)
        .filter(MEDIA_ID, Some(id))
        .compose()
}

pub fn detail_query(id: i32) -> Result<ComposedQuery, QueryError> {
    QueryComposer::new(MEDIA_DETAIL_BY_ID, ID_COLUMNS)
        .filter(MEDIA_ID, Some(id))
        .compose()
}

pub fn page_query(page: Page) -> Result<ComposedQuery, QueryError> {
    QueryComposer::new(MEDIA_PAGE, LISTING_COLUMNS)
        .trailing(page.limit)
        .trailing(page.offset)
        .compose()
}

pub fn popular_query(filters: ListingFilters, page: Page) -> Result<ComposedQuery, QueryError> {
    QueryComposer::new(POPULAR_PAGE, LISTING_COLUMNS)
        .filters(filters.to_filter_spec())
        .trailing(page.limit)
        .trailing(page.offset)
        .compose()
}

pub fn top_query(filters: ListingFilters, page: Page) -> Result<ComposedQuery, QueryError> {
    QueryComposer::new(TOP_PAGE, LISTING_COLUMNS)
        .require("m.average_score IS NOT NULL")
        .filters(filters.to_filter_spec())
        .trailing(page.limit)
        .trailing(page.offset)
        .compose()
}

pub async fn find_one(conn: &mut PgConnection, query: ComposedQuery) -> Result<Value, ApiError> {
    db::fetch_one(conn, &query)
        .await?
        .ok_or(ApiError::NotFound("media"))
}

pub async fn list(conn: &mut PgConnection, query: ComposedQuery) -> Result<Vec<Value>, ApiError> {
    Ok(db::fetch_all(conn, &query).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{media::dto::Season, query::SqlParam};

    fn squash(sql: &str) -> String {
        sql.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn popular_with_year_on_second_page() {
        let q = popular_query(
            ListingFilters {
                year: Some(2023),
                season: None,
            },
            Page::number(2),
        )
        .unwrap();

        assert!(squash(&q.sql).contains("WHERE m.season_year = $1 ORDER BY md.popularity DESC"));
        assert!(squash(&q.sql).ends_with("LIMIT $2 OFFSET $3"));
        assert_eq!(
            q.params,
            vec![SqlParam::Int(2023), SqlParam::BigInt(50), SqlParam::BigInt(50)]
        );
    }

    #[test]
    fn popular_without_filters_has_no_where() {
        let q = popular_query(ListingFilters::default(), Page::number(1)).unwrap();
        assert!(!q.sql.contains("WHERE"));
        assert_eq!(q.params, vec![SqlParam::BigInt(50), SqlParam::BigInt(0)]);
    }

    #[test]
    fn top_always_excludes_unscored_media() {
        let q = top_query(
            ListingFilters {
                year: Some(2020),
                season: Some(Season::Fall),
            },
            Page::number(3),
        )
        .unwrap();

        assert!(squash(&q.sql).contains(
            "WHERE m.average_score IS NOT NULL AND m.season_year = $1 AND m.season::text = $2"
        ));
        assert_eq!(
            q.params,
            vec![
                SqlParam::Int(2020),
                SqlParam::Text("FALL".into()),
                SqlParam::BigInt(50),
                SqlParam::BigInt(100),
            ]
        );

        let unfiltered = top_query(ListingFilters::default(), Page::number(1)).unwrap();
        assert!(squash(&unfiltered.sql).contains("WHERE m.average_score IS NOT NULL ORDER BY"));
    }

    #[test]
    fn plain_page_is_ordered_by_id() {
        let q = page_query(Page::number(0)).unwrap();
        assert!(squash(&q.sql).contains("ORDER BY m.id LIMIT $1 OFFSET $2"));
        assert_eq!(q.params, vec![SqlParam::BigInt(50), SqlParam::BigInt(0)]);
    }

    #[test]
    fn lookups_bind_the_id() {
        let q = by_id_query(42).unwrap();
        assert_eq!(q.sql, "SELECT to_jsonb(m) FROM media m WHERE m.id = $1");
        assert_eq!(q.params, vec![SqlParam::Int(42)]);

        let d = detail_query(42).unwrap();
        assert!(squash(&d.sql).contains("LEFT JOIN media_details md ON m.id = md.id WHERE m.id = $1"));
        assert_eq!(d.params, vec![SqlParam::Int(42)]);
    }
}
