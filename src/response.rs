use axum::Json;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Success,
    Fail,
    Error,
}

/// JSON envelope: `{status, data}` on success, `{status, message}` otherwise.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T: Serialize> Envelope<T> {
    pub fn success(data: T) -> Json<Self> {
        Json(Self {
            status: Status::Success,
            data: Some(data),
            message: None,
        })
    }
}

impl Envelope<()> {
    pub fn message(status: Status, message: impl Into<String>) -> Json<Self> {
        Json(Self {
            status,
            data: None,
            message: Some(message.into()),
        })
    }
}
