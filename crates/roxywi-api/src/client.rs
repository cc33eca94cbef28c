// Roxy-WI HTTP client
//
// Wraps `reqwest::Client` with base-URL joining, bearer-token injection and
// status/body handling. Endpoint groups (servers, haproxy sections, etc.)
// are inherent methods in separate files; this module only owns transport
// mechanics.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderValue};
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;
use crate::wire;

/// Longest body excerpt carried inside error messages.
const BODY_PREVIEW: usize = 500;

/// Async client for the Roxy-WI REST API.
///
/// One instance is shared by every resource of a configured provider. The
/// bearer token obtained by [`login`](Self::login) is stored behind an
/// `ArcSwapOption` so the client can be used through `&self` everywhere.
pub struct RoxyClient {
    http: reqwest::Client,
    base_url: Url,
    token: ArcSwapOption<SecretString>,
}

impl std::fmt::Debug for RoxyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoxyClient")
            .field("base_url", &self.base_url.as_str())
            .field("authenticated", &self.is_authenticated())
            .finish_non_exhaustive()
    }
}

impl RoxyClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build a client from a base URL and transport settings.
    pub fn new(base_url: &str, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Self::from_reqwest(base_url, http)
    }

    /// Build a client around an existing `reqwest::Client`.
    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        let base_url = Url::parse(base_url.trim())?;
        Ok(Self {
            http,
            base_url,
            token: ArcSwapOption::empty(),
        })
    }

    /// Build, then log in. Fails fast on bad credentials.
    pub async fn connect(
        base_url: &str,
        transport: &TransportConfig,
        login: &str,
        password: &SecretString,
    ) -> Result<Self, Error> {
        let client = Self::new(base_url, transport)?;
        client.login(login, password).await?;
        Ok(client)
    }

    /// Attach a token obtained elsewhere.
    pub fn with_token(self, token: SecretString) -> Self {
        self.set_token(token);
        self
    }

    /// The configured base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Whether a bearer token is currently held.
    pub fn is_authenticated(&self) -> bool {
        self.token.load().is_some()
    }

    pub(crate) fn set_token(&self, token: SecretString) {
        self.token.store(Some(Arc::new(token)));
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// `{base}/{path}` with exactly one slash between them.
    pub(crate) fn url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::RequestBuilder, Error> {
        let guard = self.token.load();
        let token = guard.as_ref().ok_or(Error::NotAuthenticated)?;
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
            .map_err(|e| Error::Authentication {
                message: format!("invalid token header value: {e}"),
            })?;
        value.set_sensitive(true);
        Ok(builder
            .header(AUTHORIZATION, value)
            .header(CONTENT_TYPE, "application/json"))
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    async fn request<T, B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T, Error>
    where
        T: DeserializeOwned,
        B: Serialize + Sync + ?Sized,
    {
        let url = self.url(path)?;
        debug!("{method} {url}");

        let mut builder = self.authorize(self.http.request(method, url))?;
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let resp = builder.send().await?;
        handle_response(resp).await
    }

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        self.request::<T, ()>(Method::GET, path, None).await
    }

    pub(crate) async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, Error>
    where
        T: DeserializeOwned,
        B: Serialize + Sync + ?Sized,
    {
        self.request(Method::POST, path, Some(body)).await
    }

    pub(crate) async fn put<T, B>(&self, path: &str, body: &B) -> Result<T, Error>
    where
        T: DeserializeOwned,
        B: Serialize + Sync + ?Sized,
    {
        self.request(Method::PUT, path, Some(body)).await
    }

    pub(crate) async fn patch<T, B>(&self, path: &str, body: &B) -> Result<T, Error>
    where
        T: DeserializeOwned,
        B: Serialize + Sync + ?Sized,
    {
        self.request(Method::PATCH, path, Some(body)).await
    }

    pub(crate) async fn delete(&self, path: &str) -> Result<(), Error> {
        let _: Value = self.request::<Value, ()>(Method::DELETE, path, None).await?;
        Ok(())
    }

    pub(crate) async fn delete_with_body<B>(&self, path: &str, body: &B) -> Result<(), Error>
    where
        B: Serialize + Sync + ?Sized,
    {
        let _: Value = self.request(Method::DELETE, path, Some(body)).await?;
        Ok(())
    }

    /// POST a body and pull the remote-assigned `id` out of the reply.
    pub(crate) async fn create<B>(&self, path: &str, body: &B) -> Result<String, Error>
    where
        B: Serialize + Sync + ?Sized,
    {
        let reply: Value = self.post(path, body).await?;
        created_id(&reply)
    }
}

// ── Response handling ────────────────────────────────────────────────

async fn handle_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    let status = resp.status();
    let body = resp.text().await?;
    trace!(status = status.as_u16(), body = %preview(&body), "response");

    if !status.is_success() {
        return Err(parse_error(status, &body));
    }

    // Some mutations answer with an empty body; treat it as JSON null.
    let text = if body.trim().is_empty() { "null" } else { body.as_str() };
    serde_json::from_str(text).map_err(|e| Error::Deserialization {
        message: format!("{e} (body preview: {:?})", preview(&body)),
        body,
    })
}

fn parse_error(status: StatusCode, body: &str) -> Error {
    Error::Api {
        status: status.as_u16(),
        message: if body.is_empty() {
            status.to_string()
        } else {
            preview(body)
        },
    }
}

pub(crate) fn preview(body: &str) -> String {
    body.chars().take(BODY_PREVIEW).collect()
}

/// Extract `id` from a create reply; numbers and strings are both accepted.
pub(crate) fn created_id(reply: &Value) -> Result<String, Error> {
    reply
        .get("id")
        .and_then(wire::id_from_value)
        .ok_or_else(|| Error::MissingId {
            body: preview(&reply.to_string()),
        })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn client(base: &str) -> RoxyClient {
        RoxyClient::from_reqwest(base, reqwest::Client::new()).unwrap()
    }

    #[test]
    fn url_joins_with_single_slash() {
        let c = client("https://roxy.example.com/");
        assert_eq!(
            c.url("api/group/3").unwrap().as_str(),
            "https://roxy.example.com/api/group/3"
        );
        assert_eq!(
            c.url("/api/group/3").unwrap().as_str(),
            "https://roxy.example.com/api/group/3"
        );
    }

    #[test]
    fn url_keeps_base_path_prefix() {
        let c = client("https://example.com/roxy");
        assert_eq!(
            c.url("/api/login").unwrap().as_str(),
            "https://example.com/roxy/api/login"
        );
    }

    #[test]
    fn created_id_accepts_numbers_and_strings() {
        assert_eq!(created_id(&json!({"id": 12})).unwrap(), "12");
        assert_eq!(created_id(&json!({"id": "1-backend"})).unwrap(), "1-backend");
        assert!(matches!(
            created_id(&json!({"status": "Ok"})),
            Err(Error::MissingId { .. })
        ));
    }

    #[test]
    fn requests_require_a_token() {
        let c = client("https://roxy.example.com");
        assert!(!c.is_authenticated());
        let err = c.authorize(c.http.get("https://roxy.example.com")).unwrap_err();
        assert!(matches!(err, Error::NotAuthenticated));
    }

    #[test]
    fn preview_is_char_safe() {
        let long = "é".repeat(BODY_PREVIEW + 10);
        assert_eq!(preview(&long).chars().count(), BODY_PREVIEW);
    }
}
