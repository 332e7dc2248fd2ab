use std::{
    task::{Context, Poll},
    time::Duration,
};

use futures::future::BoxFuture;
use reqwest::Client;
use tower_service::Service;
use url::Url;

/// Header carrying the OIDC session reference on backend calls.
pub const SESSION_REF_HEADER: &str = "session-ref";

/// Header carrying the OIDC client ID on backend calls.
pub const CLIENT_ID_HEADER: &str = "client-id";

/// Bound on every call to the session management backend, unless configured otherwise.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(3000);

/// Builds the HTTP client used for backend calls, with the connect timeout applied.
pub(crate) fn http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder().connect_timeout(timeout).build()
}

/// Service POSTing a session reference to one backend endpoint and yielding the response body.
///
/// Non-success statuses are errors, so a response body is only ever produced for a 2xx answer.
#[derive(Clone, Debug)]
pub struct BackendEndpoint {
    http_client: Client,
    url: Url,
    client_id: String,
    timeout: Duration,
}

impl BackendEndpoint {
    pub fn new(
        http_client: Client,
        url: Url,
        client_id: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            http_client,
            url,
            client_id: client_id.into(),
            timeout,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl Service<String> for BackendEndpoint {
    type Response = String;
    type Error = reqwest::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, session_ref: String) -> Self::Future {
        let request = self
            .http_client
            .post(self.url.clone())
            .header(SESSION_REF_HEADER, session_ref)
            .header(CLIENT_ID_HEADER, self.client_id.as_str())
            .timeout(self.timeout);
        Box::pin(async move {
            let response = request.send().await?.error_for_status()?;
            response.text().await
        })
    }
}

#[cfg(test)]
mod test {
    use tower::ServiceExt;
    use wiremock::{
        matchers::{header, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;

    async fn endpoint(server: &MockServer, timeout: Duration) -> BackendEndpoint {
        let url = Url::parse(&format!("{}/session/validate", server.uri())).unwrap();
        BackendEndpoint::new(http_client(timeout).unwrap(), url, "my-client", timeout)
    }

    #[tokio::test]
    async fn test_posts_session_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/session/validate"))
            .and(header(SESSION_REF_HEADER, "ref-1"))
            .and(header(CLIENT_ID_HEADER, "my-client"))
            .respond_with(ResponseTemplate::new(200).set_body_string("true"))
            .expect(1)
            .mount(&server)
            .await;

        let body = endpoint(&server, DEFAULT_REQUEST_TIMEOUT)
            .await
            .oneshot("ref-1".to_string())
            .await
            .unwrap();
        assert_eq!(body, "true");
    }

    #[tokio::test]
    async fn test_error_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("true"))
            .mount(&server)
            .await;

        let err = endpoint(&server, DEFAULT_REQUEST_TIMEOUT)
            .await
            .oneshot("ref-1".to_string())
            .await
            .unwrap_err();
        assert!(err.is_status());
    }

    #[tokio::test]
    async fn test_slow_backend_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let err = endpoint(&server, Duration::from_millis(50))
            .await
            .oneshot("ref-1".to_string())
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }
}
