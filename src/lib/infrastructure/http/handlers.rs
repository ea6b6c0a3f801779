//! API handler modules

use std::any::Any;

use axum::{
    body::Body,
    http::{Response, StatusCode},
    response::IntoResponse,
};

use super::errors::ApiError;

pub mod send_email;

/// Answer a cross-origin preflight request
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

/// Reject any method without a route
pub async fn method_not_allowed() -> ApiError {
    ApiError::new_405("Invalid request method")
}

/// Catch panics and return a 500 error
pub fn panic_handler(err: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let details = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "Internal server error".to_string()
    };

    ApiError::new_500(&details).into_response()
}
