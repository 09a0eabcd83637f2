use std::collections::BTreeMap;
use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use miette::Diagnostic;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum BlogError {
    #[error("I/O error: {0}")]
    #[diagnostic(code(blogger::io))]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    #[diagnostic(code(blogger::config))]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(blogger::serde))]
    Serde(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    #[diagnostic(code(blogger::db))]
    Db(#[from] sea_orm::DbErr),

    #[error("Invalid input: {0}")]
    #[diagnostic(
        code(blogger::validation),
        help("Each listed field must be present and well formed")
    )]
    Validation(FieldErrors),

    #[error("You do not have permission to perform this action.")]
    #[diagnostic(code(blogger::permission_denied))]
    PermissionDenied,

    #[error("Authentication credentials were not provided.")]
    #[diagnostic(code(blogger::authentication_required))]
    AuthenticationRequired,

    #[error("Not found.")]
    #[diagnostic(code(blogger::not_found))]
    NotFound,

    #[error("{0}")]
    #[diagnostic(code(blogger::other))]
    Other(String),
}

impl BlogError {
    pub fn status(&self) -> StatusCode {
        match self {
            BlogError::Validation(_) => StatusCode::BAD_REQUEST,
            BlogError::AuthenticationRequired => StatusCode::UNAUTHORIZED,
            BlogError::PermissionDenied => StatusCode::FORBIDDEN,
            BlogError::NotFound => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for BlogError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            BlogError::Validation(errors) => json!(errors),
            BlogError::PermissionDenied
            | BlogError::AuthenticationRequired
            | BlogError::NotFound => {
                json!({ "detail": self.to_string() })
            }
            other => {
                tracing::error!(error = %other, "request failed");
                json!({ "detail": "A server error occurred." })
            }
        };
        (status, Json(body)).into_response()
    }
}

/// Per-field validation messages, serialized as `{"field": ["message", ...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// `Ok(())` when nothing was recorded, otherwise a `BlogError::Validation`.
    pub fn into_result(self) -> Result<(), BlogError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(BlogError::Validation(self))
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            first = false;
            write!(f, "{}: {}", field, messages.join(" "))?;
        }
        Ok(())
    }
}
