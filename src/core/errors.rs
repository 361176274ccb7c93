use std::fmt;

use serde::Serialize;
use spin_sdk::http::Response;

/// One field-level validation failure, e.g. `username: "is already taken"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized,
    NotFound(String),
    Validation(Vec<FieldError>),
    InternalError(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            ApiError::Unauthorized => write!(f, "Unauthorized"),
            ApiError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            ApiError::Validation(errors) => {
                write!(f, "Validation failed: {} field error(s)", errors.len())
            }
            ApiError::InternalError(msg) => write!(f, "Internal Error: {}", msg),
        }
    }
}

impl From<ApiError> for Response {
    fn from(err: ApiError) -> Self {
        let (status, body) = match err {
            ApiError::BadRequest(msg) => (400, serde_json::json!({ "error": msg })),
            ApiError::Unauthorized => (401, serde_json::json!({ "error": "Unauthorized" })),
            ApiError::NotFound(msg) => (404, serde_json::json!({ "error": msg })),
            ApiError::Validation(errors) => (422, serde_json::json!({ "errors": errors })),
            ApiError::InternalError(msg) => (500, serde_json::json!({ "error": msg })),
        };
        Response::builder()
            .status(status)
            .header("Content-Type", "application/json")
            .body(serde_json::to_vec(&body).unwrap())
            .build()
    }
}

impl std::error::Error for ApiError {}
