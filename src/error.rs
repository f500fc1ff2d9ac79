//! The authentication failure taxonomy
//!
//! Every stage of the verification pipeline reports failures as an
//! [`AuthError`] carrying a [`ErrorKind`] classification; no stage
//! swallows a failure and nothing is retried. Error messages never
//! include token or key material.

use std::{error::Error as StdError, fmt};

use thiserror::Error;

/// Classifies an authentication failure
///
/// Each kind maps onto the HTTP status the transport should surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// No `Authorization` header was present on the request
    MissingAuthorization,

    /// An `Authorization` header was present but did not use the
    /// `Bearer` scheme
    InvalidAuthorizationScheme,

    /// The token was malformed, declared an unsupported algorithm, could
    /// not be matched to a usable key, failed signature verification, or
    /// carried an unacceptable issuer or audience
    InvalidToken,

    /// The `exp` claim lies in the past beyond the configured tolerance
    TokenExpired,

    /// The `nbf` claim lies in the future beyond the configured tolerance
    TokenInactive,

    /// An unexpected failure in an underlying primitive with no more
    /// precise classification
    Unauthorized,

    /// The key set was unreachable, misconfigured, or contained no keys
    ServerError,
}

impl ErrorKind {
    /// The wire code for this kind
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingAuthorization => "missing_authorization",
            Self::InvalidAuthorizationScheme => "invalid_authorization_scheme",
            Self::InvalidToken => "invalid_token",
            Self::TokenExpired => "token_expired",
            Self::TokenInactive => "token_inactive",
            Self::Unauthorized => "unauthorized",
            Self::ServerError => "server_error",
        }
    }

    /// The HTTP status a transport should respond with
    #[must_use]
    pub const fn http_status(self) -> u16 {
        match self {
            Self::ServerError => 500,
            _ => 401,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An authentication failure
#[derive(Debug, Error)]
#[error("{message}")]
pub struct AuthError {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl AuthError {
    /// The failure classification
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The HTTP status a transport should respond with
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        self.kind.http_status()
    }

    /// The human-readable failure description
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

#[inline]
pub(crate) fn missing_authorization() -> AuthError {
    AuthError {
        kind: ErrorKind::MissingAuthorization,
        message: String::from("missing Authorization header"),
        source: None,
    }
}

#[inline]
pub(crate) fn invalid_authorization_scheme() -> AuthError {
    AuthError {
        kind: ErrorKind::InvalidAuthorizationScheme,
        message: String::from("Authorization header must use the Bearer scheme"),
        source: None,
    }
}

#[inline]
pub(crate) fn invalid_token(message: impl Into<String>) -> AuthError {
    AuthError {
        kind: ErrorKind::InvalidToken,
        message: message.into(),
        source: None,
    }
}

#[inline]
pub(crate) fn token_expired() -> AuthError {
    AuthError {
        kind: ErrorKind::TokenExpired,
        message: String::from("access token expired"),
        source: None,
    }
}

#[inline]
pub(crate) fn token_inactive() -> AuthError {
    AuthError {
        kind: ErrorKind::TokenInactive,
        message: String::from("access token not yet valid"),
        source: None,
    }
}

pub(crate) fn unexpected(
    source: impl Into<Box<dyn StdError + Send + Sync + 'static>>,
) -> AuthError {
    AuthError {
        kind: ErrorKind::Unauthorized,
        message: String::from("authorization failed"),
        source: Some(source.into()),
    }
}

#[inline]
pub(crate) fn server_error(message: impl Into<String>) -> AuthError {
    AuthError {
        kind: ErrorKind::ServerError,
        message: message.into(),
        source: None,
    }
}

pub(crate) fn server_error_with(
    message: impl Into<String>,
    source: impl Into<Box<dyn StdError + Send + Sync + 'static>>,
) -> AuthError {
    AuthError {
        kind: ErrorKind::ServerError,
        message: message.into(),
        source: Some(source.into()),
    }
}
