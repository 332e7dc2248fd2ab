use std::{future::Future, sync::Arc};

use time::OffsetDateTime;

use crate::{
    claims::{Claims, ClaimsExtractor},
    gate::RefreshGate,
    refresher::SessionRefresher,
    session::SessionSource,
    validator::SessionValidator,
    Error,
};

/// What happened to the OIDC session while handling one request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The session was refreshed recently (or just observed for the first time).
    NotDue,
    /// The backend no longer considers the session valid; no refresh was attempted.
    Invalid,
    Refreshed,
    /// A refresh was attempted but did not go through.
    NotRefreshed,
}

/// Per-request decision and action sequence: read token, decode claims, consult the gate, validate, refresh.
pub struct RefreshOrchestrator {
    claims_extractor: Arc<dyn ClaimsExtractor>,
    gate: RefreshGate,
    validator: SessionValidator,
    refresher: SessionRefresher,
}

impl RefreshOrchestrator {
    pub fn new(
        claims_extractor: Arc<dyn ClaimsExtractor>,
        gate: RefreshGate,
        validator: SessionValidator,
        refresher: SessionRefresher,
    ) -> Self {
        Self {
            claims_extractor,
            gate,
            validator,
            refresher,
        }
    }

    /// Runs the refresh sequence for `request`, surfacing the first per-request error.
    pub async fn try_refresh<R: SessionSource>(
        &self,
        request: Option<&R>,
    ) -> Result<RefreshOutcome, Error> {
        let request = request.ok_or(Error::NullRequest)?;
        let session = request.session().ok_or(Error::SessionExpired)?;
        let access_token = session.access_token().ok_or(Error::SessionExpired)?;
        let Claims { subject, session_ref } = self
            .claims_extractor
            .extract(&access_token)
            .map_err(Error::ClaimsDecode)?;

        let decision = self.gate.evaluate(&session, OffsetDateTime::now_utc());
        let last_refreshed = decision.last_refreshed_at;
        if !decision.due {
            tracing::info!(
                ?last_refreshed,
                sub = %subject,
                %session_ref,
                "OIDC session has been refreshed recently, no need to refresh at this time"
            );
            return Ok(RefreshOutcome::NotDue);
        }

        tracing::info!(
            ?last_refreshed,
            sub = %subject,
            %session_ref,
            "it's time to try refreshing OIDC session"
        );
        let valid = self.validator.validate(&session_ref).await;
        tracing::info!(valid, sub = %subject, %session_ref, "OIDC session validated");
        if !valid {
            tracing::warn!(
                sub = %subject,
                %session_ref,
                "OIDC session is not valid anymore, no OIDC session refreshing"
            );
            return Ok(RefreshOutcome::Invalid);
        }

        if self.refresher.refresh(&session_ref, &session).await {
            tracing::info!(
                sub = %subject,
                %session_ref,
                "OIDC session has been successfully refreshed"
            );
            Ok(RefreshOutcome::Refreshed)
        } else {
            tracing::info!(sub = %subject, %session_ref, "OIDC session was NOT refreshed");
            Ok(RefreshOutcome::NotRefreshed)
        }
    }

    /// Like [`try_refresh`](Self::try_refresh), but logs errors instead of returning them.
    #[tracing::instrument(skip_all)]
    pub async fn run<R: SessionSource>(&self, request: Option<&R>) -> Option<RefreshOutcome> {
        match self.try_refresh(request).await {
            Ok(outcome) => Some(outcome),
            Err(err @ Error::SessionExpired) => {
                tracing::warn!("{err}, no OIDC session refreshing");
                None
            }
            Err(err) => {
                tracing::error!(
                    error = ?err,
                    "error occurred when validating and refreshing OIDC session"
                );
                None
            }
        }
    }

    /// Runs the refresh sequence for `request` and then hands it to `next`, exactly once, whatever happened.
    pub async fn intercept<R, F, Fut>(&self, request: Option<R>, next: F) -> Fut::Output
    where
        R: SessionSource,
        F: FnOnce(Option<R>) -> Fut,
        Fut: Future,
    {
        self.run(request.as_ref()).await;
        next(request).await
    }
}
