//! Keep-alive [middleware for `axum`](https://docs.rs/axum/latest/axum/middleware/index.html) for
//! [OpenID Connect](https://openid.net/specs/openid-connect-core-1_0.html) sessions held by an external session
//! management backend.
//!
//! ## Overview
//!
//! Applications that sign users in through an OIDC provider often keep the access token in a server-side client
//! session, while the identity session it belongs to lives on in the provider's backend and expires unless it is
//! refreshed. This crate provides a `tower`-based `SessionRefreshLayer` that watches every request going through it and,
//! at most once per configured interval per client session, asks the backend whether the identity session is still
//! valid and, if so, refreshes it.
//!
//! ## Features
//!
//! - **Refresh gating**: The first request of a client session only records a baseline time. Later requests contact
//!   the backend once strictly more than the refresh interval (30 seconds by default) has passed since the last attempt.
//! - **Fail-closed validation**: A session is only refreshed if the backend confirms it is valid. Any failure to get
//!   that confirmation counts as "not valid".
//! - **Fail-open pipeline**: Missing sessions, malformed tokens, unreachable backends and timeouts are logged through
//!   [`tracing`](https://docs.rs/tracing) and never turn into a failed request. Every request reaches the inner
//!   service exactly once.
//! - **Bounded calls**: Every backend call is bounded by a timeout (3 seconds by default) and only holds up the request
//!   that triggered it.
//!
//! ## Quickstart
//!
//! ```rust,no_run
//! use axum::{routing::get, Extension, Router};
//! use axum_oidc_keepalive::{JsonConfigProvider, MemorySession, Session, SessionRefreshLayer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     // Look up the `config/OidcSessionManagementConfig` object, which names the backend endpoints.
//!     let layer = SessionRefreshLayer::builder()
//!         .config_provider(JsonConfigProvider::from_file("oidc-session.json")?)
//!         .build()?;
//!
//!     // The client session is normally attached by your session middleware.
//!     let session = Session::new(MemorySession::with_access_token("<access token>"));
//!
//!     let router = Router::new()
//!         .route("/resource", get(|| async { "Hello World!" }))
//!         .layer(layer)
//!         .layer(Extension(session));
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//!     axum::serve(listener, router).await?;
//!     Ok(())
//! }
//! ```

pub use claims::{Claims, ClaimsExtractor, JwtClaimsExtractor};
pub use config::{ConfigProvider, EnvConfigProvider, JsonConfigProvider, SessionConfig};
pub use error::{BoxError, ConfigError, Error, MissingSession};
pub use gate::RefreshGate;
pub use layer::{SessionRefreshLayer, SessionRefreshLayerBuilder, SessionRefreshService};
pub use orchestrator::{RefreshOrchestrator, RefreshOutcome};
pub use refresher::SessionRefresher;
pub use session::{Attribute, MemorySession, Session, SessionSource, SessionStore};
pub use validator::SessionValidator;

pub mod backend;
pub mod claims;
pub mod config;
pub mod gate;
pub mod layer;
pub mod orchestrator;
pub mod session;

mod error;
mod refresher;
mod validator;
