use std::{
    sync::Arc,
    task::{Context, Poll},
    time::Duration,
};

use futures::future::BoxFuture;
use reqwest::Client;
use tower_layer::Layer;
use tower_service::Service;

use crate::{
    backend::{self, BackendEndpoint, DEFAULT_REQUEST_TIMEOUT},
    claims::{ClaimsExtractor, JwtClaimsExtractor},
    config::{load_config, ConfigProvider, DEFAULT_CONFIG_NAME},
    error::ConfigError,
    gate::{RefreshGate, DEFAULT_REFRESH_INTERVAL},
    orchestrator::RefreshOrchestrator,
    refresher::SessionRefresher,
    session::SessionSource,
    validator::SessionValidator,
};

/// Builder for a [`SessionRefreshLayer`]. Building it loads and validates the configuration.
pub struct SessionRefreshLayerBuilder {
    config_provider: Option<Arc<dyn ConfigProvider>>,
    config_name: String,
    claims_extractor: Arc<dyn ClaimsExtractor>,
    refresh_interval: Duration,
    request_timeout: Duration,
    http_client: Option<Client>,
}

impl SessionRefreshLayerBuilder {
    pub fn new() -> Self {
        Self {
            config_provider: None,
            config_name: DEFAULT_CONFIG_NAME.to_string(),
            claims_extractor: Arc::new(JwtClaimsExtractor),
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            http_client: None,
        }
    }

    /// Where the session management configuration is looked up. Required.
    pub fn config_provider(mut self, provider: impl ConfigProvider + 'static) -> Self {
        let provider: Arc<dyn ConfigProvider> = Arc::new(provider);
        self.config_provider = Some(provider);
        self
    }

    /// Name of the configuration object to look up (default: [`DEFAULT_CONFIG_NAME`]).
    pub fn config_name(mut self, name: impl Into<String>) -> Self {
        self.config_name = name.into();
        self
    }

    /// How access tokens are turned into claims (default: [`JwtClaimsExtractor`]).
    pub fn claims_extractor(mut self, extractor: impl ClaimsExtractor + 'static) -> Self {
        self.claims_extractor = Arc::new(extractor);
        self
    }

    /// Minimum time between two refresh attempts for the same session (default: 30 seconds).
    pub fn refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    /// Bound on each backend call (default: 3 seconds).
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Use a custom HTTP client. Its own connect timeout applies; the request timeout is still enforced per call.
    pub fn http_client(mut self, client: Client) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn build(self) -> Result<SessionRefreshLayer, ConfigError> {
        let config = load_config(self.config_provider.as_deref(), &self.config_name)?;
        let validate_url = config.validate_url()?;
        let refresh_url = config.refresh_url()?;

        let request_timeout = self.request_timeout;
        let http_client = match self.http_client {
            Some(client) => client,
            None => backend::http_client(request_timeout).map_err(ConfigError::HttpClient)?,
        };
        let endpoint = |url| {
            BackendEndpoint::new(
                http_client.clone(),
                url,
                config.client_id.as_str(),
                request_timeout,
            )
        };
        let orchestrator = RefreshOrchestrator::new(
            self.claims_extractor,
            RefreshGate::new(self.refresh_interval),
            SessionValidator::new(endpoint(validate_url)),
            SessionRefresher::new(endpoint(refresh_url)),
        );

        tracing::info!(
            base_url = %config.base_url,
            validate_session_context_path = %config.validate_path,
            refresh_session_context_path = %config.refresh_path,
            "OIDC session management configuration parameters"
        );
        tracing::info!("successfully initialized OIDC session refresh layer");

        Ok(SessionRefreshLayer {
            orchestrator: Arc::new(orchestrator),
        })
    }
}

impl Default for SessionRefreshLayerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps the OIDC session behind each request's client [`Session`](crate::Session) alive.
///
/// Every request passes through to the inner service unchanged; validation and refresh failures are only logged.
#[derive(Clone)]
pub struct SessionRefreshLayer {
    orchestrator: Arc<RefreshOrchestrator>,
}

impl SessionRefreshLayer {
    pub fn builder() -> SessionRefreshLayerBuilder {
        SessionRefreshLayerBuilder::new()
    }

    pub fn orchestrator(&self) -> &RefreshOrchestrator {
        &self.orchestrator
    }
}

impl<S> Layer<S> for SessionRefreshLayer {
    type Service = SessionRefreshService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SessionRefreshService {
            inner,
            orchestrator: self.orchestrator.clone(),
        }
    }
}

#[derive(Clone)]
pub struct SessionRefreshService<S> {
    inner: S,
    orchestrator: Arc<RefreshOrchestrator>,
}

impl<S, B> Service<http::Request<B>> for SessionRefreshService<S>
where
    S: Service<http::Request<B>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: http::Request<B>) -> Self::Future {
        // Call the service that was polled ready, leave the clone behind for the next request.
        let inner_clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, inner_clone);

        // Take the session out up front so the future does not hold on to the request body.
        let session = req.session();
        let orchestrator = self.orchestrator.clone();
        Box::pin(async move {
            orchestrator.run(Some(&session)).await;
            inner.call(req).await
        })
    }
}
