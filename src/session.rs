use std::{collections::HashMap, fmt, sync::Arc};

use axum::{extract::FromRequestParts, http::request::Parts};
use parking_lot::RwLock;
use time::OffsetDateTime;

use crate::error::MissingSession;

/// Session attribute holding the OIDC access token.
pub const ACCESS_TOKEN_KEY: &str = "oidc-access-token";

/// Session attribute holding the time of the last OIDC session refresh attempt.
pub const LAST_REFRESHED_KEY: &str = "oidc-last-refreshed-datetime";

/// Value stored under a session attribute key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Attribute {
    Text(String),
    Timestamp(OffsetDateTime),
}

/// Key/value attribute store scoped to one client session.
///
/// Implementations are owned by the surrounding session machinery and must already be safe to share across
/// requests. The middleware reads at most once and writes at most once per request.
pub trait SessionStore: Send + Sync {
    fn attribute(&self, key: &str) -> Option<Attribute>;

    fn set_attribute(&self, key: &str, value: Attribute);
}

/// Cheaply cloneable handle to a client session.
///
/// Insert it into the request extensions (e.g. with `axum::Extension`) ahead of the
/// [`SessionRefreshLayer`](crate::SessionRefreshLayer) so the middleware can find it.
#[derive(Clone)]
pub struct Session(Arc<dyn SessionStore>);

impl Session {
    pub fn new(store: impl SessionStore + 'static) -> Self {
        Self(Arc::new(store))
    }

    /// The stored access token, if any. A non-text value counts as absent.
    pub fn access_token(&self) -> Option<String> {
        match self.0.attribute(ACCESS_TOKEN_KEY)? {
            Attribute::Text(token) => Some(token),
            Attribute::Timestamp(_) => None,
        }
    }

    pub fn last_refreshed_at(&self) -> Option<OffsetDateTime> {
        match self.0.attribute(LAST_REFRESHED_KEY)? {
            Attribute::Timestamp(at) => Some(at),
            Attribute::Text(_) => None,
        }
    }

    pub fn set_last_refreshed_at(&self, at: OffsetDateTime) {
        self.0.set_attribute(LAST_REFRESHED_KEY, Attribute::Timestamp(at));
    }
}

impl From<Arc<dyn SessionStore>> for Session {
    fn from(store: Arc<dyn SessionStore>) -> Self {
        Self(store)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("last_refreshed_at", &self.last_refreshed_at())
            .finish_non_exhaustive()
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Session {
    type Rejection = MissingSession;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Session>().cloned().ok_or(MissingSession)
    }
}

/// Anything a [`Session`] can be obtained from.
pub trait SessionSource {
    fn session(&self) -> Option<Session>;
}

impl<B> SessionSource for http::Request<B> {
    fn session(&self) -> Option<Session> {
        self.extensions().get::<Session>().cloned()
    }
}

impl SessionSource for Session {
    fn session(&self) -> Option<Session> {
        Some(self.clone())
    }
}

impl SessionSource for Option<Session> {
    fn session(&self) -> Option<Session> {
        self.clone()
    }
}

/// In-memory [`SessionStore`], useful for tests and single-process deployments.
#[derive(Default)]
pub struct MemorySession {
    attributes: RwLock<HashMap<String, Attribute>>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a session that already carries the given access token.
    pub fn with_access_token(token: impl Into<String>) -> Self {
        let session = Self::new();
        session.set_attribute(ACCESS_TOKEN_KEY, Attribute::Text(token.into()));
        session
    }
}

impl SessionStore for MemorySession {
    fn attribute(&self, key: &str) -> Option<Attribute> {
        self.attributes.read().get(key).cloned()
    }

    fn set_attribute(&self, key: &str, value: Attribute) {
        self.attributes.write().insert(key.to_string(), value);
    }
}
