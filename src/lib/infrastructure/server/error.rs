use super::dto::ErrorResponse;
use crate::domain::{ErrorKind, ServiceError};
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use std::net::SocketAddr;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind REST server on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("REST server terminated unexpectedly: {0}")]
    Serve(#[source] std::io::Error),
}

/// Error half of every handler result.
pub type ApiFailure = (StatusCode, Json<ErrorResponse>);

/// nginx's "client closed request"
const CLIENT_CLOSED_REQUEST: u16 = 499;

pub fn status_for(error: &ServiceError) -> StatusCode {
    match error {
        ServiceError::UnknownTool(_) => StatusCode::NOT_FOUND,
        ServiceError::DuplicateRequest(_) => StatusCode::CONFLICT,
        _ => match error.kind() {
            ErrorKind::ValidationError | ErrorKind::ProtocolError => StatusCode::BAD_REQUEST,
            ErrorKind::AuthError => StatusCode::UNAUTHORIZED,
            ErrorKind::ExternalServiceError => StatusCode::BAD_GATEWAY,
            ErrorKind::TimeoutError => StatusCode::GATEWAY_TIMEOUT,
            ErrorKind::StorageError => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::CancelledError => StatusCode::from_u16(CLIENT_CLOSED_REQUEST)
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        },
    }
}

pub fn failure(error: ServiceError) -> ApiFailure {
    let status = status_for(&error);
    warn!(status = status.as_u16(), kind = %error.kind(), %error, "Request failed");
    (status, Json(ErrorResponse::from_error(&error)))
}

pub fn rejected(rejection: JsonRejection) -> ApiFailure {
    failure(ServiceError::validation(rejection.body_text()))
}
