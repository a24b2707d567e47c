//! Gateway error taxonomy.
//!
//! Every authorization and protocol failure maps to exactly one of the
//! client-facing statuses below, and does so before any subprocess is
//! spawned or storage is touched. Failures that occur after response
//! streaming has begun can no longer change the status and are only logged.

use std::io;

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed request: unknown service, bad content type, invalid path.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Authentication required or rejected. Carries a basic-auth realm when
    /// a challenge should be issued.
    #[error("authentication required")]
    Unauthorized {
        realm: Option<String>,
        message: Option<String>,
    },

    /// Policy rejection that does not leak anything secret: archived or
    /// mirror writes, disabled push-to-create, two-factor policy.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Not found — also used for permission failures on existing
    /// repositories, so that private repositories are indistinguishable
    /// from absent ones.
    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Forge(#[from] hearth::forge::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    /// The uniform not-found response for missing and hidden repositories.
    pub(crate) fn repository_not_found() -> Self {
        Error::NotFound("Repository not found".to_owned())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::BadRequest(message) => (StatusCode::BAD_REQUEST, message).into_response(),
            Error::Unauthorized { realm, message } => {
                let mut response =
                    (StatusCode::UNAUTHORIZED, message.unwrap_or_default()).into_response();
                if let Some(realm) = realm {
                    if let Ok(value) = format!("Basic realm=\"{realm}\"").parse() {
                        response
                            .headers_mut()
                            .insert(header::WWW_AUTHENTICATE, value);
                    }
                }
                response
            }
            Error::Forbidden(message) => (StatusCode::FORBIDDEN, message).into_response(),
            Error::NotFound(message) => (StatusCode::NOT_FOUND, message).into_response(),
            Error::Forge(err) => {
                log::error!(target: "githttp", "Forge lookup failed: {err}");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
            Error::Io(err) => {
                log::error!(target: "githttp", "I/O failure serving request: {err}");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}
