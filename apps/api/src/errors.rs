use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// Transport failures are opaque on the wire: the SPA shows one fixed
/// localized message whether the cause was a network failure, a timeout, or
/// a service-side error. Details go to the log only.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Analysis already in progress")]
    Busy,

    #[error("LLM error: {0}")]
    Llm(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Busy => (
                StatusCode::CONFLICT,
                "ANALYSIS_IN_PROGRESS",
                "前一筆分析尚未完成，請稍候。".to_string(),
            ),
            AppError::Llm(msg) => {
                tracing::error!("LLM error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "LLM_ERROR",
                    "連線發生問題，請稍後再試。".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
