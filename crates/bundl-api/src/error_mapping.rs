//! Maps [`BundlError`] onto the status codes enumerated in spec.md §6's
//! exit-code table.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bundl_types::BundlError;
use serde::Serialize;

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

fn status_for(err: &BundlError) -> StatusCode {
    match err {
        BundlError::Validation { .. }
        | BundlError::OrderNotActive
        | BundlError::OrderFullyPledged
        | BundlError::InsufficientCredits => StatusCode::BAD_REQUEST,
        BundlError::Unauthenticated => StatusCode::UNAUTHORIZED,
        BundlError::OrderNotFound => StatusCode::NOT_FOUND,
        BundlError::DuplicateOrder(_) | BundlError::UnknownUser(_) => StatusCode::CONFLICT,
        BundlError::Internal(_) | BundlError::Serialization(_) | BundlError::Configuration(_) | BundlError::Io(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for BundlError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "unhandled internal error");
        }
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}
