use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::OffsetDateTime;
use tracing::{info, instrument};

use crate::{
    auth::{
        dto::{LoginRequest, LoginResponse, PublicUser, RegisterRequest},
        extractors::CurrentUser,
        services,
    },
    config::SessionConfig,
    db,
    error::ApiError,
    extract::JsonBody,
    response::Envelope,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/api/me", get(get_me))
}

pub(crate) fn session_cookie(
    cfg: &SessionConfig,
    token: String,
    expires_at: OffsetDateTime,
) -> Cookie<'static> {
    let mut cookie = Cookie::new(cfg.cookie_name.clone(), token);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_secure(cfg.secure);
    cookie.set_expires(expires_at);
    cookie
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RegisterRequest>,
) -> Result<(StatusCode, Json<Envelope<PublicUser>>), ApiError> {
    let input = payload.validate()?;

    let mut conn = db::acquire(&state.db).await?;
    let user = services::register(&mut *conn, &state.hasher, input).await?;

    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok((StatusCode::CREATED, Envelope::success(PublicUser::from(user))))
}

#[instrument(skip(state, jar, payload))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> Result<(CookieJar, Json<Envelope<LoginResponse>>), ApiError> {
    let input = payload.validate()?;

    let mut conn = db::acquire(&state.db).await?;
    let issued =
        services::authenticate(&mut *conn, &state.hasher, input, OffsetDateTime::now_utc()).await?;

    info!(user_id = %issued.user.id, "user logged in");
    let jar = jar.add(session_cookie(
        &state.config.session,
        issued.token,
        issued.expires_at,
    ));
    Ok((
        jar,
        Envelope::success(LoginResponse {
            user: PublicUser::from(issued.user),
            expires_at: issued.expires_at,
        }),
    ))
}

#[instrument(skip_all)]
pub async fn get_me(CurrentUser(user): CurrentUser) -> Json<Envelope<PublicUser>> {
    Envelope::success(PublicUser::from(user))
}
