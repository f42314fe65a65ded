use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use serde_json::Value;
use time::OffsetDateTime;
use tracing::{debug, instrument};

use crate::{
    db,
    error::ApiError,
    extract::{PathParam, QueryParams},
    media::{dto::ListingQuery, repo},
    query::pagination::Page,
    response::Envelope,
    state::AppState,
};

type ApiResult<T> = Result<Json<Envelope<T>>, ApiError>;

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/api/media/:id", get(get_media))
        .route("/api/media_detail/:id", get(get_media_detail))
}

pub fn listing_routes() -> Router<AppState> {
    Router::new()
        .route("/api/medias/:page", get(list_medias))
        .route("/api/popular_medias/:page", get(list_popular))
        .route("/api/top_medias/:page", get(list_top))
        .route("/api/seasonal_medias/:page", get(list_seasonal))
}

#[instrument(skip(state))]
pub async fn get_media(
    State(state): State<AppState>,
    PathParam(id): PathParam<i32>,
) -> ApiResult<Value> {
    let query = repo::by_id_query(id)?;
    let mut conn = db::acquire(&state.db).await?;
    Ok(Envelope::success(repo::find_one(&mut *conn, query).await?))
}

#[instrument(skip(state))]
pub async fn get_media_detail(
    State(state): State<AppState>,
    PathParam(id): PathParam<i32>,
) -> ApiResult<Value> {
    let query = repo::detail_query(id)?;
    let mut conn = db::acquire(&state.db).await?;
    Ok(Envelope::success(repo::find_one(&mut *conn, query).await?))
}

#[instrument(skip(state))]
pub async fn list_medias(
    State(state): State<AppState>,
    PathParam(page): PathParam<i64>,
) -> ApiResult<Vec<Value>> {
    let query = repo::page_query(Page::number(page))?;
    let mut conn = db::acquire(&state.db).await?;
    let rows = repo::list(&mut *conn, query).await?;
    debug!(count = rows.len(), "medias listed");
    Ok(Envelope::success(rows))
}

#[instrument(skip(state))]
pub async fn list_popular(
    State(state): State<AppState>,
    PathParam(page): PathParam<i64>,
    QueryParams(q): QueryParams<ListingQuery>,
) -> ApiResult<Vec<Value>> {
    let query = repo::popular_query(q.parse()?, Page::number(page))?;
    let mut conn = db::acquire(&state.db).await?;
    let rows = repo::list(&mut *conn, query).await?;
    debug!(count = rows.len(), "popular medias listed");
    Ok(Envelope::success(rows))
}

#[instrument(skip(state))]
pub async fn list_top(
    State(state): State<AppState>,
    PathParam(page): PathParam<i64>,
    QueryParams(q): QueryParams<ListingQuery>,
) -> ApiResult<Vec<Value>> {
    let query = repo::top_query(q.parse()?, Page::number(page))?;
    let mut conn = db::acquire(&state.db).await?;
    let rows = repo::list(&mut *conn, query).await?;
    debug!(count = rows.len(), "top medias listed");
    Ok(Envelope::success(rows))
}

/// Popular media of one season, defaulting to the season we are in.
#[instrument(skip(state))]
pub async fn list_seasonal(
    State(state): State<AppState>,
    PathParam(page): PathParam<i64>,
    QueryParams(q): QueryParams<ListingQuery>,
) -> ApiResult<Vec<Value>> {
    let filters = q.parse()?.or_current(OffsetDateTime::now_utc().date());
    let query = repo::popular_query(filters, Page::number(page))?;
    let mut conn = db::acquire(&state.db).await?;
    let rows = repo::list(&mut *conn, query).await?;
    debug!(count = rows.len(), ?filters, "seasonal medias listed");
    Ok(Envelope::success(rows))
}
