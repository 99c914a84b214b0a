//! Authentication error types

use thiserror::Error;

/// Credential failures. All of them surface as `401 Unauthorized`, and none
/// carries token material.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("authentication required")]
    NotAuthenticated,

    #[error("invalid token")]
    InvalidToken,

    #[error("token expired")]
    TokenExpired,

    #[error("invalid issuer")]
    InvalidIssuer,

    #[error("invalid audience")]
    InvalidAudience,

    #[error("invalid signature")]
    InvalidSignature,

    #[error("unsupported algorithm")]
    UnsupportedAlgorithm,

    #[error("token validation failed: {0}")]
    ValidationFailed(String),
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match err.kind() {
            ErrorKind::ExpiredSignature => Self::TokenExpired,
            ErrorKind::InvalidIssuer => Self::InvalidIssuer,
            ErrorKind::InvalidAudience => Self::InvalidAudience,
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            ErrorKind::InvalidAlgorithm => Self::UnsupportedAlgorithm,
            ErrorKind::MissingRequiredClaim(claim) => {
                Self::ValidationFailed(format!("missing claim {claim}"))
            }
            _ => Self::InvalidToken,
        }
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
