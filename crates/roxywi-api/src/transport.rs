// Shared transport configuration for building reqwest::Client instances.
//
// The provider builds exactly one client per configure call; the TLS,
// timeout and user agent settings live here so tests can construct the
// same client shape against a mock server.

use std::time::Duration;

/// TLS verification mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TlsMode {
    /// Use the bundled webpki roots.
    #[default]
    System,
    /// Accept any certificate (self-signed Roxy-WI installs).
    DangerAcceptInvalid,
}

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::System,
            timeout: Duration::from_secs(30),
            user_agent: user_agent_for(None),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, crate::error::Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent.as_str());

        if self.tls == TlsMode::DangerAcceptInvalid {
            builder = builder.danger_accept_invalid_certs(true);
        }

        builder
            .build()
            .map_err(|e| crate::error::Error::Tls(format!("failed to build HTTP client: {e}")))
    }
}

/// `terraform/<version>`, falling back to `1.0+compatible` when Terraform
/// does not report one.
pub fn user_agent_for(terraform_version: Option<&str>) -> String {
    let version = terraform_version
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("1.0+compatible");
    format!("terraform/{version}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_agent_fallback() {
        assert_eq!(user_agent_for(Some("1.7.4")), "terraform/1.7.4");
        assert_eq!(user_agent_for(Some("  ")), "terraform/1.0+compatible");
        assert_eq!(user_agent_for(None), "terraform/1.0+compatible");
    }
}
