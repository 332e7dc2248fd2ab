use std::{collections::HashMap, path::Path};

use serde::Deserialize;
use url::Url;

use crate::error::{BoxError, ConfigError};

/// Name under which the session management configuration object is looked up by default.
pub const DEFAULT_CONFIG_NAME: &str = "config/OidcSessionManagementConfig";

/// Endpoints and client identity used to talk to the OIDC session management backend.
///
/// Deserializes from the backend's configuration object. Absent fields come through as empty strings and are rejected
/// by [`SessionConfig::validate`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    #[serde(default)]
    pub base_url: String,
    #[serde(default, rename = "validateSessionContextPath")]
    pub validate_path: String,
    #[serde(default, rename = "refreshSessionContextPath")]
    pub refresh_path: String,
    #[serde(default, rename = "oidcClientId")]
    pub client_id: String,
}

impl SessionConfig {
    pub fn new(
        base_url: impl Into<String>,
        validate_path: impl Into<String>,
        refresh_path: impl Into<String>,
        client_id: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            validate_path: validate_path.into(),
            refresh_path: refresh_path.into(),
            client_id: client_id.into(),
        }
    }

    /// Checks that every field is non-blank, reporting the first blank one.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("baseUrl", &self.base_url),
            ("validateSessionContextPath", &self.validate_path),
            ("refreshSessionContextPath", &self.refresh_path),
            ("oidcClientId", &self.client_id),
        ];
        match fields.iter().find(|(_, value)| value.trim().is_empty()) {
            Some((field, _)) => Err(ConfigError::FieldBlank { field: *field }),
            None => Ok(()),
        }
    }

    /// `baseUrl` followed by `validateSessionContextPath`.
    pub fn validate_url(&self) -> Result<Url, ConfigError> {
        join(&self.base_url, &self.validate_path, "validateSessionContextPath")
    }

    /// `baseUrl` followed by `refreshSessionContextPath`.
    pub fn refresh_url(&self) -> Result<Url, ConfigError> {
        join(&self.base_url, &self.refresh_path, "refreshSessionContextPath")
    }
}

// Plain concatenation: context paths are appended to the base URL verbatim rather than resolved against it.
fn join(base_url: &str, path: &str, field: &'static str) -> Result<Url, ConfigError> {
    Url::parse(&format!("{base_url}{path}"))
        .map_err(|source| ConfigError::InvalidUrl { field, source })
}

/// Source of named [`SessionConfig`] objects.
///
/// `Ok(None)` means the lookup worked but nothing is registered under `name`.
pub trait ConfigProvider: Send + Sync {
    fn lookup(&self, name: &str) -> Result<Option<SessionConfig>, BoxError>;
}

impl<F> ConfigProvider for F
where
    F: Fn(&str) -> Result<Option<SessionConfig>, BoxError> + Send + Sync,
{
    fn lookup(&self, name: &str) -> Result<Option<SessionConfig>, BoxError> {
        self(name)
    }
}

/// A fixed configuration answers every lookup.
impl ConfigProvider for SessionConfig {
    fn lookup(&self, _name: &str) -> Result<Option<SessionConfig>, BoxError> {
        Ok(Some(self.clone()))
    }
}

/// Looks up `name` in `provider` and validates the result.
///
/// This is the whole of the middleware's initialization; nothing touches the provider afterwards.
pub fn load_config(
    provider: Option<&dyn ConfigProvider>,
    name: &str,
) -> Result<SessionConfig, ConfigError> {
    let provider = provider.ok_or(ConfigError::Missing)?;

    let config = provider
        .lookup(name)
        .map_err(|source| {
            tracing::error!(
                name,
                error = %source,
                "error occurred when looking up the named object"
            );
            ConfigError::LookupFailed {
                name: name.to_string(),
                source,
            }
        })?
        .ok_or_else(|| {
            tracing::error!(name, "could not find the named object");
            ConfigError::NotFound {
                name: name.to_string(),
            }
        })?;

    config.validate()?;
    config.validate_url()?;
    config.refresh_url()?;
    Ok(config)
}

/// Configuration objects held in a JSON document keyed by name.
///
/// ```json
/// {
///   "config/OidcSessionManagementConfig": {
///     "baseUrl": "https://sessions.example.com",
///     "validateSessionContextPath": "/session/validate",
///     "refreshSessionContextPath": "/session/refresh",
///     "oidcClientId": "my-client"
///   }
/// }
/// ```
#[derive(Clone, Debug, Default)]
pub struct JsonConfigProvider {
    objects: HashMap<String, SessionConfig>,
}

impl JsonConfigProvider {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self {
            objects: serde_json::from_str(json)?,
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, BoxError> {
        let json = std::fs::read_to_string(path)?;
        Ok(Self::from_json(&json)?)
    }
}

impl ConfigProvider for JsonConfigProvider {
    fn lookup(&self, name: &str) -> Result<Option<SessionConfig>, BoxError> {
        Ok(self.objects.get(name).cloned())
    }
}

/// Reads a single configuration object from environment variables, ignoring the lookup name.
///
/// With the default prefix the variables are `OIDC_SESSION_BASE_URL`, `OIDC_SESSION_VALIDATE_PATH`,
/// `OIDC_SESSION_REFRESH_PATH` and `OIDC_SESSION_CLIENT_ID`. If none of them is set the object counts as not found;
/// if only some are, the missing ones are blank and fail validation.
#[derive(Clone, Debug)]
pub struct EnvConfigProvider {
    prefix: String,
}

impl EnvConfigProvider {
    pub fn new() -> Self {
        Self::with_prefix("OIDC_SESSION")
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn var(&self, suffix: &str) -> Option<String> {
        std::env::var(format!("{}_{suffix}", self.prefix)).ok()
    }
}

impl Default for EnvConfigProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigProvider for EnvConfigProvider {
    fn lookup(&self, _name: &str) -> Result<Option<SessionConfig>, BoxError> {
        let base_url = self.var("BASE_URL");
        let validate_path = self.var("VALIDATE_PATH");
        let refresh_path = self.var("REFRESH_PATH");
        let client_id = self.var("CLIENT_ID");

        if base_url.is_none()
            && validate_path.is_none()
            && refresh_path.is_none()
            && client_id.is_none()
        {
            return Ok(None);
        }
        Ok(Some(SessionConfig::new(
            base_url.unwrap_or_default(),
            validate_path.unwrap_or_default(),
            refresh_path.unwrap_or_default(),
            client_id.unwrap_or_default(),
        )))
    }
}
