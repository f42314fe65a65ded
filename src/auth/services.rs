//! Registration, authentication and session resolution.
//!
//! Both flows validate first (`Received -> Validated`) into a typed value, so
//! nothing touches the store until the input is complete.

use base64ct::{Base64UrlUnpadded, Encoding};
use lazy_static::lazy_static;
use rand::{rngs::OsRng, RngCore};
use regex::Regex;
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::auth::{
    dto::{LoginRequest, RegisterRequest},
    password::CredentialHasher,
    repo::{AccountStore, StoreError},
    repo_types::{Session, User},
};

/// Lifetime of a session from the moment it is issued.
pub const SESSION_TTL: Duration = Duration::weeks(3);

const TOKEN_BYTES: usize = 32;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),
    #[error("email or username already exists")]
    DuplicateCredential,
    #[error("invalid credentials")]
    AuthenticationFailed,
    #[error("password hashing failed: {0}")]
    Hashing(anyhow::Error),
    #[error(transparent)]
    Storage(#[from] StoreError),
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn required(value: Option<String>, field: &str) -> Result<String, AuthError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(AuthError::Validation(format!("{field} is required"))),
    }
}

/// Registration input that passed validation.
#[derive(Debug)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    pub fn validate(self) -> Result<Registration, AuthError> {
        let username = required(self.username, "username")?.trim().to_owned();
        let email = required(self.email, "email")?.trim().to_lowercase();
        let password = required(self.password, "password")?;
        if !is_valid_email(&email) {
            return Err(AuthError::Validation("invalid email".into()));
        }
        Ok(Registration {
            username,
            email,
            password,
        })
    }
}

/// Login input that passed validation.
#[derive(Debug)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(self) -> Result<Credentials, AuthError> {
        let email = required(self.email, "email")?.trim().to_lowercase();
        let password = required(self.password, "password")?;
        Ok(Credentials { email, password })
    }
}

/// Result of a successful login, ready to be written into a cookie.
#[derive(Debug)]
pub struct IssuedSession {
    pub user: User,
    pub token: String,
    pub expires_at: OffsetDateTime,
}

/// 32 bytes from the OS RNG, URL-safe base64 without padding.
pub fn generate_session_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    Base64UrlUnpadded::encode_string(&bytes)
}

pub async fn register<S>(
    store: &mut S,
    hasher: &CredentialHasher,
    input: Registration,
) -> Result<User, AuthError>
where
    S: AccountStore + ?Sized,
{
    let hash = hasher.hash(&input.password).map_err(AuthError::Hashing)?;

    match store
        .insert_user(Uuid::new_v4(), &input.username, &input.email, &hash)
        .await
    {
        Ok(user) => Ok(user),
        Err(StoreError::UniqueViolation { constraint }) => {
            warn!(%constraint, "registration rejected: duplicate credential");
            Err(AuthError::DuplicateCredential)
        }
        Err(e) => Err(AuthError::Storage(e)),
    }
}

/// Verify credentials and persist a fresh session. An unknown email and a
/// wrong password are the same error.
pub async fn authenticate<S>(
    store: &mut S,
    hasher: &CredentialHasher,
    input: Credentials,
    now: OffsetDateTime,
) -> Result<IssuedSession, AuthError>
where
    S: AccountStore + ?Sized,
{
    let Some(user) = store.find_user_by_email(&input.email).await? else {
        hasher.verify_decoy(&input.password);
        debug!("login rejected: unknown email");
        return Err(AuthError::AuthenticationFailed);
    };

    let verified = hasher
        .verify(&input.password, &user.password_hash)
        .map_err(AuthError::Hashing)?;
    if !verified {
        debug!(user_id = %user.id, "login rejected: password mismatch");
        return Err(AuthError::AuthenticationFailed);
    }

    let session = Session {
        id: Uuid::new_v4(),
        user_id: user.id,
        token: generate_session_token(),
        expires_at: now + SESSION_TTL,
        created_at: now,
    };
    store.insert_session(&session).await?;

    Ok(IssuedSession {
        user,
        token: session.token,
        expires_at: session.expires_at,
    })
}

/// Look up the user behind a session token. Expiry is checked here, not by
/// deleting rows.
pub async fn resolve_session<S>(
    store: &mut S,
    token: &str,
    now: OffsetDateTime,
) -> Result<User, AuthError>
where
    S: AccountStore + ?Sized,
{
    let session = store
        .find_session(token)
        .await?
        .ok_or(AuthError::AuthenticationFailed)?;
    if session.is_expired(now) {
        debug!(session_id = %session.id, "session expired");
        return Err(AuthError::AuthenticationFailed);
    }
    store
        .find_user_by_id(session.user_id)
        .await?
        .ok_or(AuthError::AuthenticationFailed)
}
