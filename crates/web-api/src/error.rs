use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use gamma_core::SnapshotError;
use serde_json::json;

/// Error body returned by every endpoint.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: serde_json::Value,
}

impl ApiError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            body: json!({ "error": message.into() }),
        }
    }
}

impl From<SnapshotError> for ApiError {
    fn from(err: SnapshotError) -> Self {
        match err {
            SnapshotError::NoDataYet { index, last_error } => Self {
                status: StatusCode::SERVICE_UNAVAILABLE,
                body: json!({
                    "error": "no data yet",
                    "index": index,
                    "last_error": last_error,
                }),
            },
            SnapshotError::UnknownIndex { index } => Self {
                status: StatusCode::NOT_FOUND,
                body: json!({
                    "error": format!("unknown index: {index}"),
                    "index": index,
                }),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
