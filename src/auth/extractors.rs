use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::CookieJar;
use time::OffsetDateTime;

use crate::{
    auth::{repo_types::User, services::resolve_session},
    db,
    error::ApiError,
    state::AppState,
};

/// Resolves the session cookie to its user, rejecting with 401.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(&state.config.session.cookie_name)
            .map(|c| c.value().to_owned())
            .filter(|t| !t.is_empty())
            .ok_or(ApiError::AuthenticationFailed)?;

        let mut conn = db::acquire(&state.db).await?;
        let user = resolve_session(&mut *conn, &token, OffsetDateTime::now_utc()).await?;
        Ok(CurrentUser(user))
    }
}
