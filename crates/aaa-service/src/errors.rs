use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::error::IdentityError;
use serde::Serialize;
use thiserror::Error;

/// Fixed client-facing message for an unparseable Basic credential.
pub const BAD_FORMAT_MESSAGE: &str =
    "Login Attempt in Bad Format. Please provide user:password in Base64 format.";

#[derive(Debug, Error)]
pub enum AaaError {
    #[error("Authentication required")]
    MissingCredentials,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("{}", BAD_FORMAT_MESSAGE)]
    BadCredentialFormat,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("Decoding error: {0}")]
    Decoding(String),

    #[error("Filter '{filter}' failed to initialize: {reason}")]
    FilterInit { filter: String, reason: String },

    #[error("Filter error: {0}")]
    Filter(String),

    #[error("Cryptographic error: {0}")]
    Crypto(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal server error")]
    Internal,
}

impl AaaError {
    /// HTTP status the error maps to when it escapes to a client.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            AaaError::MissingCredentials
            | AaaError::InvalidCredentials
            | AaaError::BadCredentialFormat
            | AaaError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            AaaError::Decoding(_) => StatusCode::BAD_REQUEST,
            AaaError::Identity(_)
            | AaaError::FilterInit { .. }
            | AaaError::Filter(_)
            | AaaError::Crypto(_)
            | AaaError::Configuration(_)
            | AaaError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl AaaError {
    /// Client-facing error code and message.
    fn code_and_message(&self) -> (&'static str, String) {
        match self {
            AaaError::MissingCredentials => (
                "MISSING_CREDENTIALS",
                "Authentication required".to_string(),
            ),
            AaaError::InvalidCredentials => {
                ("INVALID_CREDENTIALS", "Invalid credentials".to_string())
            }
            AaaError::BadCredentialFormat => {
                ("BAD_CREDENTIAL_FORMAT", BAD_FORMAT_MESSAGE.to_string())
            }
            AaaError::InvalidToken(reason) => ("INVALID_TOKEN", reason.clone()),
            AaaError::Decoding(reason) => ("DECODING_ERROR", reason.clone()),
            AaaError::Identity(_) => (
                "IDENTITY_ERROR",
                "An internal identity error occurred".to_string(),
            ),
            AaaError::FilterInit { .. } | AaaError::Filter(_) => (
                "FILTER_ERROR",
                "An internal filter error occurred".to_string(),
            ),
            AaaError::Crypto(_) => (
                "CRYPTO_ERROR",
                "An internal cryptographic error occurred".to_string(),
            ),
            AaaError::Configuration(_) => (
                "CONFIGURATION_ERROR",
                "The service is misconfigured".to_string(),
            ),
            AaaError::Internal => ("INTERNAL_ERROR", "An internal error occurred".to_string()),
        }
    }

    /// JSON body sent to clients: `{"error": {"code": ..., "message": ...}}`.
    #[must_use]
    pub fn response_body(&self) -> serde_json::Value {
        let (code, message) = self.code_and_message();
        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };
        serde_json::to_value(error_response).unwrap_or(serde_json::Value::Null)
    }
}

impl IntoResponse for AaaError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.response_body())).into_response()
    }
}
