// NGINX upstream sections.
//
// State ID: "{server_id}-{name}".

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::VariantNames;
use tf_provider::map;
use tf_provider::schema::Block;
use tf_provider::value::Value;

use roxywi_api::RoxyClient;
use roxywi_api::haproxy::ConfigAction;
use roxywi_api::nginx::{UpstreamBalance, UpstreamSection, UpstreamServer};

use crate::error::ProviderError;
use crate::resource::{ResourceKind, changed};
use crate::schema::{self, block, defaulted, list_of, number, optional, required, string, with_blocks};
use crate::validate::Validator;
use crate::value::{Blocks, Int, Str, default_to, id_number, int, items, items_mut, refreshed, split_id, text};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamServerBlock {
    pub server: Str,
    pub port: Int,
    pub max_fails: Int,
    pub fail_timeout: Int,
}

impl From<&UpstreamServerBlock> for UpstreamServer {
    fn from(s: &UpstreamServerBlock) -> Self {
        Self {
            server: text(&s.server),
            port: int(&s.port),
            max_fails: int(&s.max_fails),
            fail_timeout: int(&s.fail_timeout),
        }
    }
}

impl From<UpstreamServer> for UpstreamServerBlock {
    fn from(s: UpstreamServer) -> Self {
        Self {
            server: Value::Value(s.server),
            port: Value::Value(s.port),
            max_fails: Value::Value(s.max_fails),
            fail_timeout: Value::Value(s.fail_timeout),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamState {
    pub id: Str,
    pub name: Str,
    pub server_id: Int,
    pub balance: Str,
    pub keepalive: Int,
    pub action: Str,
    pub backend_servers: Blocks<UpstreamServerBlock>,
}

impl UpstreamState {
    fn section(&self) -> UpstreamSection {
        UpstreamSection {
            name: text(&self.name),
            balance: text(&self.balance),
            keepalive: int(&self.keepalive),
            action: text(&self.action),
            backend_servers: items(&self.backend_servers).iter().map(UpstreamServer::from).collect(),
        }
    }
}

fn parse_id(id: &str) -> Result<(i64, &str), ProviderError> {
    let parts = split_id(id, 2)?;
    Ok((id_number(id, parts[0])?, parts[1]))
}

pub struct NginxUpstream;

#[async_trait]
impl ResourceKind for NginxUpstream {
    type State = UpstreamState;
    const NAME: &'static str = "roxywi_nginx_section_upstream";

    fn schema(&self) -> Block {
        with_blocks(
            block(
                "An NGINX upstream",
                map! {
                    "name" => required(string(), "Upstream name. Changing it recreates the section"),
                    "server_id" => required(number(), "Server running NGINX. Changing it recreates the section"),
                    "balance" => optional(string(), "round_robin, ip_hash, least_conn or random"),
                    "keepalive" => defaulted(number(), "Idle keepalive connections per worker, default 32"),
                    "action" => defaulted(string(), schema::ACTION),
                },
            ),
            map! {
                "backend_servers" => list_of(block(
                    "An upstream server",
                    map! {
                        "server" => required(string(), "Server address"),
                        "port" => required(number(), "Server port"),
                        "max_fails" => required(number(), "Failures before the server is marked down, 0 to 10000"),
                        "fail_timeout" => defaulted(number(), "Seconds a failed server stays down, default 2000"),
                    },
                )),
            },
        )
    }

    fn validate(&self, state: &UpstreamState, checks: &mut Validator) {
        checks.one_of("balance", &state.balance, UpstreamBalance::VARIANTS);
        checks.one_of("action", &state.action, ConfigAction::VARIANTS);
        for server in items(&state.backend_servers) {
            checks.port("backend_servers.port", &server.port);
            checks.int_between("backend_servers.max_fails", &server.max_fails, 0..=10000);
            checks.int_between("backend_servers.fail_timeout", &server.fail_timeout, 0..=10000);
        }
    }

    fn apply_defaults(&self, state: &mut UpstreamState) {
        default_to(&mut state.keepalive, 32);
        default_to(&mut state.action, ConfigAction::default().to_string());
        for server in items_mut(&mut state.backend_servers) {
            default_to(&mut server.fail_timeout, 2000);
        }
    }

    fn id<'s>(&self, state: &'s UpstreamState) -> &'s Str {
        &state.id
    }

    fn set_id(&self, state: &mut UpstreamState, id: Str) {
        state.id = id;
    }

    fn replaced_fields(&self, prior: &UpstreamState, proposed: &UpstreamState) -> Vec<&'static str> {
        let mut out = Vec::new();
        changed("name", &prior.name, &proposed.name, &mut out);
        changed("server_id", &prior.server_id, &proposed.server_id, &mut out);
        out
    }

    async fn create(&self, client: &RoxyClient, plan: &UpstreamState) -> Result<String, ProviderError> {
        Ok(client
            .create_nginx_upstream(int(&plan.server_id), &plan.section())
            .await?)
    }

    async fn read(
        &self,
        client: &RoxyClient,
        id: &str,
        prior: &UpstreamState,
    ) -> Result<Option<UpstreamState>, ProviderError> {
        let (server_id, name) = parse_id(id)?;
        let upstream = client.get_nginx_upstream(server_id, name).await?;
        Ok(Some(UpstreamState {
            name: Value::Value(name.to_owned()),
            server_id: Value::Value(server_id),
            balance: refreshed(&prior.balance, upstream.balance),
            keepalive: Value::Value(upstream.keepalive),
            backend_servers: Value::Value(
                upstream
                    .backend_servers
                    .into_iter()
                    .map(UpstreamServerBlock::from)
                    .collect(),
            ),
            ..prior.clone()
        }))
    }

    async fn update(
        &self,
        client: &RoxyClient,
        id: &str,
        _prior: &UpstreamState,
        plan: &UpstreamState,
    ) -> Result<(), ProviderError> {
        let (server_id, name) = parse_id(id)?;
        Ok(client
            .update_nginx_upstream(server_id, name, &plan.section())
            .await?)
    }

    async fn delete(&self, client: &RoxyClient, id: &str, _state: &UpstreamState) -> Result<(), ProviderError> {
        let (server_id, name) = parse_id(id)?;
        Ok(client.delete_nginx_upstream(server_id, name).await?)
    }

    fn import_state(&self, id: &str) -> Result<UpstreamState, ProviderError> {
        parse_id(id)?;
        Ok(UpstreamState {
            id: Value::Value(id.to_owned()),
            action: Value::Value(ConfigAction::default().to_string()),
            ..UpstreamState::default()
        })
    }
}
