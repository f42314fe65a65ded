use std::{net::SocketAddr, time::Duration};

use axum::{
    extract::{MatchedPath, State},
    http::{Request, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{debug, error, instrument, warn, Span};

use crate::{
    auth, db,
    error::ApiError,
    media,
    query::ComposedQuery,
    response::{Envelope, Status},
    state::AppState,
};

pub fn build_app(state: AppState) -> Router {
    let request_timeout = Duration::from_secs(state.config.request_timeout_secs);

    let routes = Router::new()
        .route("/", get(|| async { "catalog-api" }))
        .route("/api/ping", get(ping))
        .merge(media::router())
        .merge(auth::router())
        .fallback(|| async { ApiError::NotFound("route") })
        .with_state(state);

    with_http_layers(routes, request_timeout)
}

fn with_http_layers(routes: Router, request_timeout: Duration) -> Router {
    routes
        .layer(TimeoutLayer::new(request_timeout))
        .layer(middleware::map_response(timeout_envelope))
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &Request<_>| {
                    let route = req
                        .extensions()
                        .get::<MatchedPath>()
                        .map(MatchedPath::as_str)
                        .unwrap_or("unmatched");
                    tracing::info_span!(
                        "request",
                        method = %req.method(),
                        route,
                        status = tracing::field::Empty
                    )
                })
                .on_response(|res: &Response<_>, latency: Duration, span: &Span| {
                    let status = res.status();
                    span.record("status", status.as_u16());
                    let elapsed_ms = latency.as_millis() as u64;
                    if status.is_server_error() {
                        error!(elapsed_ms, "request failed");
                    } else if status.is_client_error() {
                        warn!(elapsed_ms, "request rejected");
                    } else {
                        debug!(elapsed_ms, "request served");
                    }
                }),
        )
}

/// `TimeoutLayer` answers with a bare 408; give it the usual envelope.
async fn timeout_envelope(res: Response) -> Response {
    if res.status() == StatusCode::REQUEST_TIMEOUT {
        return ApiError::Timeout.into_response();
    }
    res
}

#[instrument(skip(state))]
async fn ping(State(state): State<AppState>) -> Response {
    let result = async {
        let mut conn = db::acquire(&state.db).await?;
        db::execute(&mut *conn, &ComposedQuery::plain("SELECT 1")).await
    }
    .await;

    match result {
        Ok(_) => (
            StatusCode::OK,
            Envelope::message(Status::Ok, "Database connection successful"),
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "database ping failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Envelope::message(Status::Fail, e.to_string()),
            )
                .into_response()
        }
    }
}

pub async fn serve(app: Router, host: &str, port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
