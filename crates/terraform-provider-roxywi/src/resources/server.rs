use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_provider::map;
use tf_provider::schema::Block;

use roxywi_api::RoxyClient;
use roxywi_api::servers::Server as ApiServer;

use crate::error::ProviderError;
use crate::resource::{ResourceKind, changed};
use crate::schema::{block, bool, defaulted, number, optional, required, string};
use crate::validate::Validator;
use crate::value::{Flag, Int, Str, default_to, flag, int, refreshed, text};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerState {
    pub id: Str,
    pub hostname: Str,
    pub ip: Str,
    pub port: Int,
    pub group_id: Int,
    pub cred_id: Int,
    pub enabled: Flag,
    pub description: Str,
}

impl ServerState {
    fn request(&self) -> ApiServer {
        ApiServer {
            hostname: text(&self.hostname),
            ip: text(&self.ip),
            port: int(&self.port),
            group_id: int(&self.group_id),
            cred_id: int(&self.cred_id),
            enabled: flag(&self.enabled),
            description: text(&self.description),
        }
    }
}

pub struct Server;

#[async_trait]
impl ResourceKind for Server {
    type State = ServerState;
    const NAME: &'static str = "roxywi_server";

    fn schema(&self) -> Block {
        block(
            "A managed server reachable over SSH",
            map! {
                "hostname" => required(string(), "Display name; single quotes are stripped"),
                "ip" => required(string(), "IP address or DNS name. Changing it recreates the server"),
                "port" => required(number(), "SSH port"),
                "group_id" => required(number(), "Owning group ID"),
                "cred_id" => required(number(), "SSH credential ID"),
                "enabled" => defaulted(bool(), "Whether the server is enabled (default true)"),
                "description" => optional(string(), "Free text; single quotes are stripped"),
            },
        )
    }

    fn validate(&self, state: &ServerState, checks: &mut Validator) {
        checks.port("port", &state.port);
        checks.not_blank("ip", &state.ip);
    }

    fn apply_defaults(&self, state: &mut ServerState) {
        default_to(&mut state.enabled, true);
    }

    fn id<'s>(&self, state: &'s ServerState) -> &'s Str {
        &state.id
    }

    fn set_id(&self, state: &mut ServerState, id: Str) {
        state.id = id;
    }

    fn replaced_fields(&self, prior: &ServerState, proposed: &ServerState) -> Vec<&'static str> {
        let mut out = Vec::new();
        changed("ip", &prior.ip, &proposed.ip, &mut out);
        out
    }

    async fn create(&self, client: &RoxyClient, plan: &ServerState) -> Result<String, ProviderError> {
        Ok(client.create_server(&plan.request()).await?)
    }

    async fn read(
        &self,
        client: &RoxyClient,
        id: &str,
        prior: &ServerState,
    ) -> Result<Option<ServerState>, ProviderError> {
        let server = client.get_server(id).await?;
        Ok(Some(ServerState {
            id: prior.id.clone(),
            hostname: refreshed(&prior.hostname, server.hostname),
            ip: refreshed(&prior.ip, server.ip),
            port: refreshed(&prior.port, server.port),
            group_id: refreshed(&prior.group_id, server.group_id),
            cred_id: refreshed(&prior.cred_id, server.cred_id),
            enabled: refreshed(&prior.enabled, server.enabled),
            description: refreshed(&prior.description, server.description),
        }))
    }

    async fn update(
        &self,
        client: &RoxyClient,
        id: &str,
        _prior: &ServerState,
        plan: &ServerState,
    ) -> Result<(), ProviderError> {
        Ok(client.update_server(id, &plan.request()).await?)
    }

    async fn delete(&self, client: &RoxyClient, id: &str, _state: &ServerState) -> Result<(), ProviderError> {
        Ok(client.delete_server(id).await?)
    }
}

#[cfg(test)]
mod tests {
    use tf_provider::value::Value;

    use super::*;

    #[test]
    fn enabled_defaults_on() {
        let mut state = ServerState::default();
        Server.apply_defaults(&mut state);
        assert_eq!(state.enabled, Value::Value(true));
        assert!(state.request().enabled);
    }

    #[test]
    fn changing_ip_forces_replacement() {
        let prior = ServerState {
            ip: Value::Value("10.0.0.1".into()),
            hostname: Value::Value("a".into()),
            ..ServerState::default()
        };
        let proposed = ServerState {
            ip: Value::Value("10.0.0.2".into()),
            hostname: Value::Value("b".into()),
            ..ServerState::default()
        };
        assert_eq!(Server.replaced_fields(&prior, &proposed), ["ip"]);
    }
}
