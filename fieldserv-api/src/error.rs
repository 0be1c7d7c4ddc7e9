use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use fieldserv_core::EngineError;
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    AuthenticationError(String),
    AuthorizationError(String),
    Engine(EngineError),
    InternalServerError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::AuthorizationError(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::Engine(err) => match &err {
                EngineError::Validation(_) => (StatusCode::BAD_REQUEST, err.to_string()),
                EngineError::CapacityConflict { .. } => (StatusCode::CONFLICT, err.to_string()),
                EngineError::IllegalTransition { .. } => (StatusCode::CONFLICT, err.to_string()),
                EngineError::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
                EngineError::Dependency(_) => {
                    tracing::error!("Upstream dependency failed: {}", err);
                    (StatusCode::BAD_GATEWAY, err.to_string())
                }
            },
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        Self::Engine(err)
    }
}
