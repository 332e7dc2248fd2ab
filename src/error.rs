use axum::{
    response::{IntoResponse, Response},
    Json,
};
use http::StatusCode;
use serde_json::json;
use thiserror::Error as ThisError;

/// Boxed error returned by pluggable collaborators (claims extraction, configuration lookup).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while handling a single request.
///
/// None of these ever reach the client: the middleware logs them and always hands the request on to the next
/// service.
#[non_exhaustive]
#[derive(ThisError, Debug)]
pub enum Error {
    #[error("request is missing")]
    NullRequest,
    #[error("no access token in session, container session may be expired")]
    SessionExpired,
    #[error("could not decode claims from access token")]
    ClaimsDecode(#[source] BoxError),
    #[error("failed to validate OIDC session")]
    ValidateTransport(#[source] reqwest::Error),
    #[error("failed to refresh OIDC session")]
    RefreshTransport(#[source] reqwest::Error),
}

/// Errors raised while initializing the middleware. These are fatal: no layer is built.
#[non_exhaustive]
#[derive(ThisError, Debug)]
pub enum ConfigError {
    #[error("no configuration provider was supplied")]
    Missing,
    #[error("error occurred when looking up the named object: {name}")]
    LookupFailed {
        name: String,
        #[source]
        source: BoxError,
    },
    #[error("could not find the named object: {name}")]
    NotFound { name: String },
    #[error("{field} is null or empty")]
    FieldBlank { field: &'static str },
    #[error("failed to build HTTP client")]
    HttpClient(#[source] reqwest::Error),
    #[error("{field} does not form a valid URL")]
    InvalidUrl {
        field: &'static str,
        #[source]
        source: url::ParseError,
    },
}

/// Rejection of the [`Session`](crate::Session) extractor when no client session is attached to the request.
#[derive(ThisError, Debug)]
#[error("no client session attached to request")]
pub struct MissingSession;

impl IntoResponse for MissingSession {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.to_string(),
        }));
        (StatusCode::UNAUTHORIZED, body).into_response()
    }
}
