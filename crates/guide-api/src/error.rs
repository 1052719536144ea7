//! HTTP error mapping
//!
//! Every failure leaves the API as `{ "error": { "code", "message", ...details } }`.
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use guide_core::GuideError;
use guide_render::RenderError;
use serde_json::{json, Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Guide(#[from] GuideError),
    #[error("REQUEST/BODY: {0}")]
    BadBody(String),
    #[error("NOT_FOUND: {0}")]
    NotFound(String),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("INTERNAL: {0}")]
    Internal(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadBody(rejection.body_text())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Guide(err) => match err {
                GuideError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
                GuideError::ValidationFailure { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                GuideError::CriticalProviderFailure { .. } => StatusCode::BAD_GATEWAY,
                GuideError::Configuration { .. } | GuideError::Storage(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            ApiError::BadBody(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Render(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Guide(err) => err.code(),
            ApiError::BadBody(_) => "REQUEST/BODY",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Render(_) => "RENDER/FAILED",
            ApiError::Internal(_) => "INTERNAL",
        }
    }

    /// The `error` object of the response body
    pub fn body(&self) -> Value {
        let mut error = Map::new();
        error.insert("code".into(), json!(self.code()));
        error.insert("message".into(), json!(self.to_string()));
        if let ApiError::Guide(err) = self {
            if let Value::Object(details) = err.details() {
                for (key, value) in details {
                    error.entry(key).or_insert(value);
                }
            }
        }
        json!({ "error": error })
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "request failed");
        }
        (status, Json(self.body())).into_response()
    }
}
