use time::OffsetDateTime;
use tower::ServiceExt;

use crate::{backend::BackendEndpoint, session::Session, Error};

/// Marker in a refresh response body signalling that the backend declined the refresh.
pub const DECLINED_MARKER: &str = "\"valid\": false";

/// Asks the backend to extend an OIDC session and records when it did so.
#[derive(Clone, Debug)]
pub struct SessionRefresher {
    endpoint: BackendEndpoint,
}

impl SessionRefresher {
    pub fn new(endpoint: BackendEndpoint) -> Self {
        Self { endpoint }
    }

    /// Whether the session was refreshed. Transport errors are logged and yield `false`.
    pub async fn refresh(&self, session_ref: &str, session: &Session) -> bool {
        match self.try_refresh(session_ref, session).await {
            Ok(refreshed) => refreshed,
            Err(err) => {
                tracing::error!(
                    session_ref,
                    error = ?err,
                    "error occurred when refreshing OIDC session"
                );
                false
            }
        }
    }

    /// Calls the refresh endpoint.
    ///
    /// Once the backend has answered, the session's last-refreshed time is set to now whatever the answer was, so a
    /// declined refresh still waits out the full interval before the next attempt. A transport error leaves the
    /// timestamp alone and the attempt is repeated on the next request.
    pub async fn try_refresh(&self, session_ref: &str, session: &Session) -> Result<bool, Error> {
        let body = self
            .endpoint
            .clone()
            .oneshot(session_ref.to_string())
            .await
            .map_err(Error::RefreshTransport)?;
        session.set_last_refreshed_at(OffsetDateTime::now_utc());
        tracing::debug!(response = %body, session_ref, "session refreshing response");
        Ok(!body.is_empty() && !body.contains(DECLINED_MARKER))
    }
}
