//! Mapping of failures onto HTTP responses.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;

use commutewise_core::provider::proxy::ErrorBody;
use commutewise_core::{ConfigError, CoreError, ProviderError};

/// Error returned by proxy handlers.
#[derive(Debug)]
pub enum ApiError {
    /// The request body is missing or malformed.
    BadRequest(String),
    /// The HTTP method is not supported on this route.
    MethodNotAllowed,
    Core(CoreError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Core(CoreError::GovernorDenied(_) | CoreError::RateLimited { .. }) => {
                StatusCode::TOO_MANY_REQUESTS
            }
            ApiError::Core(CoreError::Provider(err)) if !err.is_unexpected() => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Core(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::BadRequest(message) => message.clone(),
            ApiError::MethodNotAllowed => "Method not allowed".to_string(),
            ApiError::Core(CoreError::Config(ConfigError::MissingKey(_))) => {
                "Server configuration error: travel time API key is not set".to_string()
            }
            ApiError::Core(err) => err.to_string(),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError::Core(err)
    }
}

impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        ApiError::Core(CoreError::Provider(err))
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::Core(CoreError::Config(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = ?self, "request failed");
        }

        let retry_after = match &self {
            ApiError::Core(CoreError::GovernorDenied(denial)) => denial.retry_after_secs,
            ApiError::Core(CoreError::RateLimited {
                retry_after_secs, ..
            }) => *retry_after_secs,
            _ => None,
        };

        let mut response = (status, Json(ErrorBody { error: self.message() })).into_response();
        if let Some(secs) = retry_after {
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        if status == StatusCode::METHOD_NOT_ALLOWED {
            response
                .headers_mut()
                .insert(header::ALLOW, HeaderValue::from_static("POST"));
        }
        response
    }
}
