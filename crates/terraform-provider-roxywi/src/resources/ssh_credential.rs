// SSH credentials
//
// The login part and the key material travel in separate calls: POST/PUT
// carry name, username and password, a PATCH uploads the private key and
// its passphrase. Secrets are write-only and always kept from state.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_provider::map;
use tf_provider::schema::Block;
use tracing::debug;

use roxywi_api::RoxyClient;
use roxywi_api::credentials::{CredentialKey, CredentialRequest};

use crate::error::ProviderError;
use crate::resource::ResourceKind;
use crate::schema::{block, bool, number, optional, required, sensitive, string};
use crate::validate::Validator;
use crate::value::{Flag, Int, Str, as_str, flag, int, is_unknown, known, refreshed, text};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SshCredentialState {
    pub id: Str,
    pub name: Str,
    pub username: Str,
    pub group_id: Int,
    pub password: Str,
    pub key_enabled: Flag,
    pub shared: Flag,
    pub passphrase: Str,
    pub private_key: Str,
}

impl SshCredentialState {
    fn request(&self) -> CredentialRequest {
        CredentialRequest {
            group_id: int(&self.group_id),
            key_enabled: flag(&self.key_enabled),
            name: text(&self.name),
            password: text(&self.password),
            username: text(&self.username),
            shared: flag(&self.shared),
            private_key: None,
        }
    }

    /// Non-empty key material only.
    fn key(&self) -> CredentialKey {
        let set = |v: &Str| Some(text(v)).filter(|s| !s.is_empty());
        CredentialKey {
            passphrase: set(&self.passphrase),
            private_key: set(&self.private_key),
        }
    }

    /// Key fields that differ from `prior`, cleared ones included.
    fn key_changes(&self, prior: &Self) -> CredentialKey {
        let diff = |old: &Str, new: &Str| (as_str(old) != as_str(new)).then(|| text(new));
        CredentialKey {
            passphrase: diff(&prior.passphrase, &self.passphrase),
            private_key: diff(&prior.private_key, &self.private_key),
        }
    }
}

pub struct SshCredential;

#[async_trait]
impl ResourceKind for SshCredential {
    type State = SshCredentialState;
    const NAME: &'static str = "roxywi_ssh_credential";

    fn schema(&self) -> Block {
        block(
            "SSH credentials Roxy-WI uses to reach managed servers",
            map! {
                "name" => required(string(), "Credential name"),
                "username" => required(string(), "SSH login"),
                "group_id" => required(number(), "Owning group ID"),
                "password" => sensitive(optional(string(), "SSH password")),
                "key_enabled" => optional(bool(), "Authenticate with a private key"),
                "shared" => optional(bool(), "Share the credential with other groups"),
                "passphrase" => sensitive(optional(string(), "Passphrase of the private key")),
                "private_key" => sensitive(optional(string(), "Base64-encoded private key")),
            },
        )
    }

    fn validate(&self, state: &SshCredentialState, checks: &mut Validator) {
        let filled = |v: &Str| known(v).is_some_and(|s| !s.is_empty());
        let has_key = filled(&state.passphrase) || filled(&state.private_key);

        if filled(&state.username) && filled(&state.password) && has_key {
            checks.reject(
                "private_key",
                "passphrase and private_key must be empty when username and password are set",
            );
        }
        if has_key && !is_unknown(&state.key_enabled) && !flag(&state.key_enabled) {
            checks.reject(
                "key_enabled",
                "key_enabled must be true when passphrase or private_key is set",
            );
        }
    }

    fn id<'s>(&self, state: &'s SshCredentialState) -> &'s Str {
        &state.id
    }

    fn set_id(&self, state: &mut SshCredentialState, id: Str) {
        state.id = id;
    }

    async fn create(&self, client: &RoxyClient, plan: &SshCredentialState) -> Result<String, ProviderError> {
        let id = client.create_credential(&plan.request()).await?;
        let key = plan.key();
        if !key.is_empty() {
            client.upload_credential_key(&id, &key).await?;
        }
        Ok(id)
    }

    async fn read(
        &self,
        client: &RoxyClient,
        id: &str,
        prior: &SshCredentialState,
    ) -> Result<Option<SshCredentialState>, ProviderError> {
        let cred = client.get_credential(id).await?;
        Ok(Some(SshCredentialState {
            name: refreshed(&prior.name, cred.name),
            username: refreshed(&prior.username, cred.username),
            group_id: refreshed(&prior.group_id, cred.group_id),
            key_enabled: refreshed(&prior.key_enabled, cred.key_enabled),
            shared: refreshed(&prior.shared, cred.shared),
            ..prior.clone()
        }))
    }

    async fn update(
        &self,
        client: &RoxyClient,
        id: &str,
        prior: &SshCredentialState,
        plan: &SshCredentialState,
    ) -> Result<(), ProviderError> {
        let mut body = plan.request();
        if body.key_enabled {
            let key = text(&plan.private_key);
            if key.is_empty() {
                return Err(ProviderError::Invalid(
                    "private_key is required when key_enabled is true".into(),
                ));
            }
            body.private_key = Some(key);
        }
        client.update_credential(id, &body).await?;

        let key = plan.key_changes(prior);
        if !key.is_empty() {
            debug!(id, "key material changed");
            client.upload_credential_key(id, &key).await?;
        }
        Ok(())
    }

    async fn delete(&self, client: &RoxyClient, id: &str, _state: &SshCredentialState) -> Result<(), ProviderError> {
        Ok(client.delete_credential(id).await?)
    }
}

#[cfg(test)]
mod tests {
    use tf_provider::value::Value;

    use super::*;

    fn s(v: &str) -> Str {
        Value::Value(v.to_owned())
    }

    fn violations(state: &SshCredentialState) -> Vec<String> {
        let mut checks = Validator::new();
        SshCredential.validate(state, &mut checks);
        checks.violations().iter().map(|v| v.attribute.clone()).collect()
    }

    #[test]
    fn password_login_forbids_key_material() {
        let state = SshCredentialState {
            username: s("root"),
            password: s("secret"),
            private_key: s("LS0tLS1CRUdJTg=="),
            key_enabled: Value::Value(true),
            ..SshCredentialState::default()
        };
        assert_eq!(violations(&state), ["private_key"]);
    }

    #[test]
    fn key_material_requires_key_enabled() {
        let state = SshCredentialState {
            username: s("root"),
            passphrase: s("hunter2"),
            key_enabled: Value::Value(false),
            ..SshCredentialState::default()
        };
        assert_eq!(violations(&state), ["key_enabled"]);

        let ok = SshCredentialState {
            key_enabled: Value::Value(true),
            ..state
        };
        assert!(violations(&ok).is_empty());
    }

    #[test]
    fn unknown_secrets_are_not_judged() {
        let state = SshCredentialState {
            username: s("root"),
            password: Value::Unknown,
            private_key: Value::Unknown,
            ..SshCredentialState::default()
        };
        assert!(violations(&state).is_empty());
    }

    #[test]
    fn key_body_omits_empty_fields() {
        let state = SshCredentialState {
            private_key: s("a2V5"),
            passphrase: s(""),
            ..SshCredentialState::default()
        };
        let key = state.key();
        assert_eq!(key.private_key.as_deref(), Some("a2V5"));
        assert_eq!(key.passphrase, None);
    }

    #[test]
    fn cleared_passphrase_is_sent_on_update() {
        let prior = SshCredentialState {
            private_key: s("a2V5"),
            passphrase: s("hunter2"),
            ..SshCredentialState::default()
        };
        let plan = SshCredentialState {
            passphrase: Value::Null,
            ..prior.clone()
        };
        let key = plan.key_changes(&prior);
        assert_eq!(key.passphrase.as_deref(), Some(""));
        assert_eq!(key.private_key, None);

        assert!(prior.key_changes(&prior).is_empty());
    }
}
