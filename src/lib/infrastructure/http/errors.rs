//! API error-handling module

use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::domain::relay::RelayError;

/// An error raised in the API, answered with a plain-text body
#[derive(Debug, PartialEq, Eq)]
pub struct ApiError {
    /// The status code
    pub status: StatusCode,

    /// The error message
    pub message: String,
}

impl ApiError {
    /// Create a new API error
    pub fn new(status: StatusCode, message: &str) -> Self {
        Self {
            status,
            message: message.to_string(),
        }
    }

    /// Create a new bad request error
    pub fn new_400(message: &str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// Create a new method not allowed error
    pub fn new_405(message: &str) -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED, message)
    }

    /// Create new internal server error
    pub fn new_500(message: &str) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::MissingSmtpUserName => ApiError::new_400(&err.to_string()),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(_err: serde_json::Error) -> Self {
        ApiError::new_400("Invalid JSON payload")
    }
}

#[cfg(test)]
mod tests {
    use axum::{body::to_bytes, http::header, http::StatusCode, response::IntoResponse};
    use testresult::TestResult;

    use super::*;

    #[tokio::test]
    async fn test_error_response_is_plain_text() -> TestResult {
        let response = ApiError::new_500("Internal server error").into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE),
            Some(&header::HeaderValue::from_static("text/plain; charset=utf-8"))
        );

        let body = to_bytes(response.into_body(), usize::MAX).await?;

        assert_eq!(body, "Internal server error");

        Ok(())
    }

    #[test]
    fn test_api_error_from_relay_error() {
        let api_error = ApiError::from(RelayError::MissingSmtpUserName);

        assert_eq!(api_error, ApiError::new_400("SmtpUserName is required"));
    }

    #[test]
    fn test_api_error_from_json_error() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();

        assert_eq!(
            ApiError::from(err),
            ApiError::new_400("Invalid JSON payload")
        );
    }
}
