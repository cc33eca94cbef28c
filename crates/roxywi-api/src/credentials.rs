// SSH credential endpoints
//
// Credentials are created in two steps: the POST carries the login part,
// a follow-up PATCH uploads the private key and passphrase.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::client::{RoxyClient, created_id, preview};
use crate::error::Error;
use crate::wire;

/// Body for `POST`/`PUT /api/server/cred`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CredentialRequest {
    pub group_id: i64,
    #[serde(with = "wire::int_bool")]
    pub key_enabled: bool,
    #[serde(with = "wire::quoted_text")]
    pub name: String,
    pub password: String,
    #[serde(with = "wire::quoted_text")]
    pub username: String,
    #[serde(with = "wire::int_bool")]
    pub shared: bool,
    /// Sent on update when `key_enabled` is set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
}

/// Body for `PATCH /api/server/cred/{id}`. Only set fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CredentialKey {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passphrase: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
}

impl CredentialKey {
    pub fn is_empty(&self) -> bool {
        self.passphrase.is_none() && self.private_key.is_none()
    }
}

/// A credential as returned (wrapped in a one-element array) by the API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Credential {
    #[serde(default, with = "wire::flex_int")]
    pub group_id: i64,
    #[serde(default, with = "wire::int_bool")]
    pub key_enabled: bool,
    #[serde(default, with = "wire::quoted_text")]
    pub name: String,
    #[serde(default, with = "wire::quoted_text")]
    pub username: String,
    #[serde(default, with = "wire::int_bool")]
    pub shared: bool,
}

fn require_ok(reply: &Value) -> Result<(), Error> {
    match reply.get("status").and_then(Value::as_str) {
        Some("Ok") => Ok(()),
        _ => Err(Error::Rejected {
            status: preview(&reply.to_string()),
        }),
    }
}

impl RoxyClient {
    /// `POST /api/server/cred`; the reply must carry `status: "Ok"`.
    pub async fn create_credential(&self, cred: &CredentialRequest) -> Result<String, Error> {
        debug!(name = %cred.name, "creating SSH credential");
        let reply: Value = self.post("/api/server/cred", cred).await?;
        let id = created_id(&reply)?;
        require_ok(&reply)?;
        Ok(id)
    }

    /// `GET /api/server/cred/{id}` -- the API answers with an array.
    pub async fn get_credential(&self, id: &str) -> Result<Credential, Error> {
        let list: Vec<Credential> = self.get(&format!("/api/server/cred/{id}")).await?;
        list.into_iter().next().ok_or_else(|| Error::Empty {
            what: format!("SSH credential {id}"),
        })
    }

    /// `PUT /api/server/cred/{id}`
    pub async fn update_credential(&self, id: &str, cred: &CredentialRequest) -> Result<(), Error> {
        debug!(id, "updating SSH credential");
        let _: Value = self.put(&format!("/api/server/cred/{id}"), cred).await?;
        Ok(())
    }

    /// `PATCH /api/server/cred/{id}` with the key material.
    pub async fn upload_credential_key(&self, id: &str, key: &CredentialKey) -> Result<(), Error> {
        debug!(id, "uploading SSH key");
        let _: Value = self.patch(&format!("/api/server/cred/{id}"), key).await?;
        Ok(())
    }

    /// `DELETE /api/server/cred/{id}`
    pub async fn delete_credential(&self, id: &str) -> Result<(), Error> {
        debug!(id, "deleting SSH credential");
        self.delete(&format!("/api/server/cred/{id}")).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn request_encodes_flags_as_ints() {
        let body = CredentialRequest {
            group_id: 1,
            key_enabled: true,
            name: "o'ps".into(),
            password: String::new(),
            username: "root".into(),
            shared: false,
            private_key: None,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "group_id": 1,
                "key_enabled": 1,
                "name": "ops",
                "password": "",
                "username": "root",
                "shared": 0,
            })
        );
    }

    #[test]
    fn status_must_be_ok() {
        assert!(require_ok(&json!({"status": "Ok", "id": 1})).is_ok());
        assert!(matches!(
            require_ok(&json!({"status": "failed"})),
            Err(Error::Rejected { .. })
        ));
    }
}
