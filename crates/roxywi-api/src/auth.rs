// Roxy-WI login
//
// `POST /api/login` trades a login/password pair for a JWT that every
// other call carries as `Authorization: Bearer <token>`. There is no
// refresh; a provider run holds one token for its lifetime.

use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::client::{RoxyClient, preview};
use crate::error::Error;

#[derive(Deserialize)]
struct LoginReply {
    #[serde(default)]
    access_token: Option<serde_json::Value>,
}

impl RoxyClient {
    /// Authenticate and store the bearer token.
    ///
    /// `POST /api/login` with `{"login": "...", "password": "..."}`
    pub async fn login(&self, login: &str, password: &SecretString) -> Result<(), Error> {
        let url = self.url("/api/login")?;
        debug!(login, "authenticating with Roxy-WI");

        let resp = self
            .http()
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .json(&json!({
                "login": login,
                "password": password.expose_secret(),
            }))
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        let body = resp.text().await.map_err(Error::Transport)?;

        if status != StatusCode::OK {
            return Err(Error::Authentication {
                message: format!(
                    "unexpected status code: {}, response: {}",
                    status.as_u16(),
                    preview(&body)
                ),
            });
        }

        let reply: LoginReply = serde_json::from_str(&body).map_err(|e| Error::Authentication {
            message: format!("invalid login response: {e}"),
        })?;

        let token = match reply.access_token {
            Some(serde_json::Value::String(token)) if !token.is_empty() => token,
            _ => {
                return Err(Error::Authentication {
                    message: format!("unable to find token in response: {}", preview(&body)),
                });
            }
        };

        self.set_token(SecretString::from(token));
        debug!("login successful");
        Ok(())
    }
}
