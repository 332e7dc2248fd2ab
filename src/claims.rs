use std::collections::HashMap;

use jsonwebtoken::{decode, DecodingKey, Validation};
use serde_json::Value;

use crate::error::BoxError;

/// Placeholder for claims that are absent from the token.
pub const NOT_AVAILABLE: &str = "N/A";

pub const SUBJECT_CLAIM: &str = "sub";
pub const SESSION_REF_CLAIM: &str = "oidc-session-ref";

/// Identity claims needed to correlate a request with its OIDC session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Claims {
    pub subject: String,
    pub session_ref: String,
}

impl Claims {
    /// Picks the subject and session reference out of a decoded claims map, falling back to [`NOT_AVAILABLE`].
    pub fn from_map(claims: &HashMap<String, Value>) -> Self {
        let get = |key: &str| {
            claims
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or(NOT_AVAILABLE)
                .to_string()
        };
        Self {
            subject: get(SUBJECT_CLAIM),
            session_ref: get(SESSION_REF_CLAIM),
        }
    }
}

/// Turns an access token into [`Claims`]. Must be free of side effects.
pub trait ClaimsExtractor: Send + Sync {
    fn extract(&self, access_token: &str) -> Result<Claims, BoxError>;
}

impl<F> ClaimsExtractor for F
where
    F: Fn(&str) -> Result<Claims, BoxError> + Send + Sync,
{
    fn extract(&self, access_token: &str) -> Result<Claims, BoxError> {
        self(access_token)
    }
}

/// Reads the claims out of a JWT access token without checking its signature.
///
/// The token has already been issued and verified by the identity provider when it was placed in the session; we only
/// need the identifiers it carries.
#[derive(Clone, Copy, Debug, Default)]
pub struct JwtClaimsExtractor;

impl ClaimsExtractor for JwtClaimsExtractor {
    fn extract(&self, access_token: &str) -> Result<Claims, BoxError> {
        if access_token.trim().is_empty() {
            return Err("access token is null or empty".into());
        }

        let mut validation = Validation::default();
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let token = decode::<HashMap<String, Value>>(
            access_token,
            &DecodingKey::from_secret(&[]),
            &validation,
        )?;
        Ok(Claims::from_map(&token.claims))
    }
}
