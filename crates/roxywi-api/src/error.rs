use thiserror::Error;

/// Top-level error type for the `roxywi-api` crate.
///
/// Covers every failure mode of the REST surface: login, transport,
/// non-success replies, and payloads that do not have the expected shape.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login was rejected or the reply did not carry a token.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// A request was attempted before `login` stored a bearer token.
    #[error("Not authenticated -- call login first")]
    NotAuthenticated,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or client construction failed.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── API ─────────────────────────────────────────────────────────
    /// Non-2xx reply from the API.
    #[error("unexpected status code: {status}, response: {message}")]
    Api { status: u16, message: String },

    /// 2xx reply whose `status` field reports a failure.
    #[error("API reported failure: {status}")]
    Rejected { status: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// The reply did not contain a usable `id`.
    #[error("unable to find ID in response: {body}")]
    MissingId { body: String },

    /// An embedded config value was neither a list nor a JSON string.
    #[error("invalid embedded config: {0}")]
    EmbeddedConfig(String),

    /// The request cannot be sent as given.
    #[error("{0}")]
    InvalidRequest(String),

    /// A lookup that must yield one item came back empty.
    #[error("{what} not found")]
    Empty { what: String },
}

impl Error {
    /// Returns `true` for HTTP 404 replies.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Api { status: 404, .. } => true,
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            _ => false,
        }
    }

    /// Returns `true` when the token was refused by the API.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Self::Authentication { .. } | Self::NotAuthenticated | Self::Api { status: 401 | 403, .. }
        )
    }

    /// HTTP status for API replies, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_only_for_404() {
        let missing = Error::Api {
            status: 404,
            message: "gone".into(),
        };
        let broken = Error::Api {
            status: 500,
            message: "boom".into(),
        };
        assert!(missing.is_not_found());
        assert!(!broken.is_not_found());
        assert_eq!(broken.status(), Some(500));
    }

    #[test]
    fn auth_failure_covers_forbidden() {
        let forbidden = Error::Api {
            status: 403,
            message: String::new(),
        };
        assert!(forbidden.is_auth_failure());
        assert!(Error::NotAuthenticated.is_auth_failure());
        assert!(
            !Error::Empty {
                what: "role".into()
            }
            .is_auth_failure()
        );
    }
}
