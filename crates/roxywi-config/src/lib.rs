//! Provider settings for the Roxy-WI Terraform provider.
//!
//! Layers built-in defaults, `ROXYWI_*` environment variables and the
//! attributes of the `provider "roxywi"` block, then validates the result
//! and translates it into the client's `TransportConfig`.

use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Serialized},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

use roxywi_api::wire::flex_string;
use roxywi_api::{TlsMode, TransportConfig, user_agent_for};

/// Public demo instance, used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "https://demo.roxy-wi.org";

/// Request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const ENV_PREFIX: &str = "ROXYWI_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl ConfigError {
    /// The provider attribute the error is about, if any.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::Validation { field, .. } => Some(field),
            Self::Figment(_) => None,
        }
    }
}

// ── Layers ──────────────────────────────────────────────────────────

/// Attributes set explicitly in the provider block. Unset fields are
/// skipped so lower layers show through.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProviderBlock {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insecure: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

#[derive(Debug, Deserialize, Serialize)]
struct RawSettings {
    #[serde(default, deserialize_with = "flex_string::deserialize")]
    login: String,
    #[serde(default, deserialize_with = "flex_string::deserialize")]
    password: String,
    #[serde(default = "default_base_url", deserialize_with = "flex_string::deserialize")]
    base_url: String,
    #[serde(default)]
    insecure: bool,
    #[serde(default = "default_timeout")]
    timeout: u64,
}

impl Default for RawSettings {
    fn default() -> Self {
        Self {
            login: String::new(),
            password: String::new(),
            base_url: default_base_url(),
            insecure: false,
            timeout: default_timeout(),
        }
    }
}

/// String settings as written in the environment. `Env` parses values by
/// type, so `ROXYWI_PASSWORD=007` would otherwise extract as `7`.
#[derive(Debug, Default, Serialize)]
struct EnvStrings {
    #[serde(skip_serializing_if = "Option::is_none")]
    login: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    base_url: Option<String>,
}

impl EnvStrings {
    fn read() -> Self {
        let var = |name: &str| Env::var(&format!("{ENV_PREFIX}{name}"));
        Self {
            login: var("USERNAME").or_else(|| var("LOGIN")),
            password: var("PASSWORD"),
            base_url: var("BASE_URL"),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.into()
}
fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

// ── Resolved settings ───────────────────────────────────────────────

/// Validated provider settings.
#[derive(Debug)]
pub struct Settings {
    pub login: String,
    pub password: SecretString,
    pub base_url: Url,
    pub insecure: bool,
    pub timeout: Duration,
}

impl Settings {
    /// Transport for the API client, tagged with the calling Terraform version.
    pub fn transport(&self, terraform_version: Option<&str>) -> TransportConfig {
        TransportConfig {
            tls: if self.insecure {
                TlsMode::DangerAcceptInvalid
            } else {
                TlsMode::System
            },
            timeout: self.timeout,
            user_agent: user_agent_for(terraform_version),
        }
    }
}

/// Build the layered figment: defaults, then `ROXYWI_*`, then the block.
///
/// `ROXYWI_USERNAME` feeds `login`; every other variable maps by name.
pub fn figment(block: &ProviderBlock) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(RawSettings::default()))
        .merge(Env::prefixed(ENV_PREFIX).map(|key| {
            if key.as_str().eq_ignore_ascii_case("username") {
                "login".into()
            } else {
                key.as_str().to_owned().into()
            }
        }))
        .merge(Serialized::defaults(EnvStrings::read()))
        .merge(Serialized::defaults(block.clone()))
}

/// Resolve and validate settings for a provider block.
pub fn resolve(block: &ProviderBlock) -> Result<Settings, ConfigError> {
    resolve_figment(&figment(block))
}

/// Extract and validate settings from any figment.
pub fn resolve_figment(figment: &Figment) -> Result<Settings, ConfigError> {
    let raw: RawSettings = figment.extract()?;

    let login = raw.login.trim().to_owned();
    if login.is_empty() {
        return Err(ConfigError::Validation {
            field: "login",
            reason: "must be set in the provider block or via ROXYWI_USERNAME".into(),
        });
    }

    let password = SecretString::from(raw.password);
    if password.expose_secret().is_empty() {
        return Err(ConfigError::Validation {
            field: "password",
            reason: "must be set in the provider block or via ROXYWI_PASSWORD".into(),
        });
    }

    let base_url = parse_base_url(&raw.base_url)?;

    if raw.timeout == 0 {
        return Err(ConfigError::Validation {
            field: "timeout",
            reason: "must be at least one second".into(),
        });
    }

    debug!(%base_url, login, insecure = raw.insecure, "resolved provider settings");

    Ok(Settings {
        login,
        password,
        base_url,
        insecure: raw.insecure,
        timeout: Duration::from_secs(raw.timeout),
    })
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim()).map_err(|e| ConfigError::Validation {
        field: "base_url",
        reason: format!("'{raw}' is not a valid URL: {e}"),
    })?;
    match url.scheme() {
        "http" | "https" if url.has_host() => Ok(url),
        _ => Err(ConfigError::Validation {
            field: "base_url",
            reason: format!("'{raw}' must be an absolute http or https URL"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use figment::Jail;
    use pretty_assertions::assert_eq;

    use super::*;

    fn block(login: &str, password: &str) -> ProviderBlock {
        ProviderBlock {
            login: Some(login.into()),
            password: Some(password.into()),
            ..ProviderBlock::default()
        }
    }

    #[test]
    fn defaults_apply_when_block_is_minimal() {
        Jail::expect_with(|_jail| {
            let settings = resolve(&block("admin", "pw")).map_err(|e| e.to_string())?;
            assert_eq!(settings.base_url.as_str(), "https://demo.roxy-wi.org/");
            assert_eq!(settings.timeout, Duration::from_secs(30));
            assert!(!settings.insecure);
            Ok(())
        });
    }

    #[test]
    fn environment_fills_missing_attributes() {
        Jail::expect_with(|jail| {
            jail.set_env("ROXYWI_USERNAME", "ops");
            jail.set_env("ROXYWI_PASSWORD", "from-env");
            jail.set_env("ROXYWI_BASE_URL", "http://roxy.internal:8080");
            jail.set_env("ROXYWI_INSECURE", "true");

            let settings = resolve(&ProviderBlock::default()).map_err(|e| e.to_string())?;
            assert_eq!(settings.login, "ops");
            assert_eq!(settings.password.expose_secret(), "from-env");
            assert_eq!(settings.base_url.host_str(), Some("roxy.internal"));
            assert!(settings.insecure);
            Ok(())
        });
    }

    #[test]
    fn numeric_credentials_from_environment_stay_text() {
        Jail::expect_with(|jail| {
            jail.set_env("ROXYWI_USERNAME", "1001");
            jail.set_env("ROXYWI_PASSWORD", "007");

            let settings = resolve(&ProviderBlock::default()).map_err(|e| e.to_string())?;
            assert_eq!(settings.login, "1001");
            assert_eq!(settings.password.expose_secret(), "007");

            jail.set_env("ROXYWI_PASSWORD", "123456");
            let settings = resolve(&ProviderBlock::default()).map_err(|e| e.to_string())?;
            assert_eq!(settings.password.expose_secret(), "123456");
            Ok(())
        });
    }

    #[test]
    fn typed_values_extract_as_strings() {
        Jail::expect_with(|_jail| {
            let figment = Figment::new()
                .merge(Serialized::defaults(RawSettings::default()))
                .merge(Serialized::default("login", 1001))
                .merge(Serialized::default("password", true));
            let settings = resolve_figment(&figment).map_err(|e| e.to_string())?;
            assert_eq!(settings.login, "1001");
            assert_eq!(settings.password.expose_secret(), "true");
            Ok(())
        });
    }

    #[test]
    fn provider_block_wins_over_environment() {
        Jail::expect_with(|jail| {
            jail.set_env("ROXYWI_USERNAME", "ops");
            jail.set_env("ROXYWI_PASSWORD", "from-env");

            let settings = resolve(&block("admin", "from-block")).map_err(|e| e.to_string())?;
            assert_eq!(settings.login, "admin");
            assert_eq!(settings.password.expose_secret(), "from-block");
            Ok(())
        });
    }

    #[test]
    fn missing_login_is_reported_by_field() {
        Jail::expect_with(|_jail| {
            let err = resolve(&ProviderBlock {
                password: Some("pw".into()),
                ..ProviderBlock::default()
            })
            .unwrap_err();
            assert_eq!(err.field(), Some("login"));
            Ok(())
        });
    }

    #[test]
    fn base_url_must_be_http() {
        Jail::expect_with(|_jail| {
            let err = resolve(&ProviderBlock {
                base_url: Some("ftp://roxy".into()),
                ..block("admin", "pw")
            })
            .unwrap_err();
            assert_eq!(err.field(), Some("base_url"));

            let err = resolve(&ProviderBlock {
                base_url: Some("not a url".into()),
                ..block("admin", "pw")
            })
            .unwrap_err();
            assert_eq!(err.field(), Some("base_url"));
            Ok(())
        });
    }

    #[test]
    fn transport_follows_settings() {
        Jail::expect_with(|_jail| {
            let settings = resolve(&ProviderBlock {
                insecure: Some(true),
                timeout: Some(5),
                ..block("admin", "pw")
            })
            .map_err(|e| e.to_string())?;
            let transport = settings.transport(Some("1.9.0"));
            assert_eq!(transport.tls, TlsMode::DangerAcceptInvalid);
            assert_eq!(transport.timeout, Duration::from_secs(5));
            assert_eq!(transport.user_agent, "terraform/1.9.0");
            Ok(())
        });
    }
}
