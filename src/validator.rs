use tower::ServiceExt;

use crate::{backend::BackendEndpoint, Error};

/// Asks the backend whether an OIDC session is still valid.
#[derive(Clone, Debug)]
pub struct SessionValidator {
    endpoint: BackendEndpoint,
}

impl SessionValidator {
    pub fn new(endpoint: BackendEndpoint) -> Self {
        Self { endpoint }
    }

    /// `true` iff the backend answered and its body contains `true`.
    ///
    /// Fails closed: a transport error counts as an invalid session. The error is logged, never returned.
    pub async fn validate(&self, session_ref: &str) -> bool {
        match self.try_validate(session_ref).await {
            Ok(valid) => valid,
            Err(err) => {
                tracing::error!(
                    session_ref,
                    error = ?err,
                    "error occurred when validating OIDC session"
                );
                false
            }
        }
    }

    pub async fn try_validate(&self, session_ref: &str) -> Result<bool, Error> {
        let body = self
            .endpoint
            .clone()
            .oneshot(session_ref.to_string())
            .await
            .map_err(Error::ValidateTransport)?;
        tracing::debug!(response = %body, session_ref, "session validation response");
        Ok(body.contains("true"))
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use url::Url;
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;
    use crate::backend::{http_client, DEFAULT_REQUEST_TIMEOUT};

    fn validator(base: &str) -> SessionValidator {
        let url = Url::parse(&format!("{base}/validate")).unwrap();
        SessionValidator::new(BackendEndpoint::new(
            http_client(DEFAULT_REQUEST_TIMEOUT).unwrap(),
            url,
            "client",
            DEFAULT_REQUEST_TIMEOUT,
        ))
    }

    async fn answering(body: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/validate"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_body_containing_true_is_valid() {
        for body in ["true", "{\"valid\": true}", "\"true\""] {
            let server = answering(body).await;
            assert!(validator(&server.uri()).validate("ref").await, "body {body}");
        }
    }

    #[tokio::test]
    async fn test_other_bodies_are_invalid() {
        for body in ["false", "", "{\"valid\": false}", "<html>oops"] {
            let server = answering(body).await;
            assert!(!validator(&server.uri()).validate("ref").await, "body {body:?}");
        }
    }

    #[tokio::test]
    async fn test_connection_refused_fails_closed() {
        // Bind and drop a listener so nothing is listening on the port.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let validator = validator(&format!("http://{addr}"));
        assert!(!validator.validate("ref").await);
        assert!(matches!(
            validator.try_validate("ref").await,
            Err(Error::ValidateTransport(_))
        ));
    }

    #[tokio::test]
    async fn test_timeout_fails_closed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("true")
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/validate", server.uri())).unwrap();
        let timeout = Duration::from_millis(50);
        let validator = SessionValidator::new(BackendEndpoint::new(
            http_client(timeout).unwrap(),
            url,
            "client",
            timeout,
        ));
        assert!(!validator.validate("ref").await);
    }
}
