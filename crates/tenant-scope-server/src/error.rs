use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tenant_scope::ContextBuildError;
use thiserror::Error;

use crate::auth::AuthError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Context build failed: {0}")]
    ContextBuild(#[from] ContextBuildError),

    #[error(transparent)]
    Data(#[from] tenant_scope::Error),
}

impl Error {
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    #[must_use]
    pub const fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }

    /// HTTP status reported for this error
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::Data(tenant_scope::Error::NotFound { .. }) => StatusCode::NOT_FOUND,
            Self::Data(tenant_scope::Error::InvalidRecord { .. }) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::Config(_)
            | Self::Transport(_)
            | Self::ContextBuild(_)
            | Self::Data(
                tenant_scope::Error::ContextBuild(_)
                | tenant_scope::Error::UnboundContext { .. }
                | tenant_scope::Error::UnknownEntity(_)
                | tenant_scope::Error::DuplicateEntity(_)
                | tenant_scope::Error::Storage(_),
            ) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to return to the caller
    fn public_message(&self) -> String {
        match self {
            Self::Auth(e) => e.to_string(),
            Self::Data(
                e @ (tenant_scope::Error::NotFound { .. }
                | tenant_scope::Error::InvalidRecord { .. }),
            ) => e.to_string(),
            _ => "internal server error".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorBody {
            error: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, Error>;
