//! Mapping of engine errors onto HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use padel_zones::{ErrorKind, TournamentError};
use serde::{Deserialize, Serialize};

use crate::{logging, metrics};

/// Error body returned by every endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Error class, one of `configuration`, `not_found`, `invariant`,
    /// `structural`, `conflict` or `storage`
    pub kind: String,
}

/// Handler error wrapping an engine rejection
#[derive(Debug)]
pub struct ApiError(pub TournamentError);

impl From<TournamentError> for ApiError {
    fn from(err: TournamentError) -> Self {
        ApiError(err)
    }
}

/// HTTP status for an error class
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Configuration => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Invariant | ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Structural => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let kind_label = kind.to_string();

        if kind == ErrorKind::Storage {
            tracing::error!(error = %self.0, "Storage failure");
        } else {
            logging::log_rejection(&kind_label, &self.0.to_string());
        }
        metrics::rejections_total(&kind_label);

        let body = ErrorResponse {
            error: self.0.client_message(),
            kind: kind_label,
        };
        (status_for(kind), Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<Json<T>, ApiError>;
