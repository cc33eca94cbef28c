use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::VariantNames;
use tf_provider::map;
use tf_provider::schema::Block;
use tf_provider::value::Value;

use roxywi_api::RoxyClient;
use roxywi_api::haproxy::{BackendSection as ApiBackend, BalanceAlgorithm, SectionKind};

use super::blocks::{
    AclBlock, BackendServerBlock, CircuitBreakingBlock, CookieBlock, HeaderBlock, HealthCheckBlock, HttpOnly,
    ServersCheckBlock, SslBlock, acl_block, action_attribute, backend_server_block, block_one, blocks, check_acls,
    check_action, check_backend_servers, check_circuit_breaking, check_headers, check_health_check, check_mode,
    circuit_breaking_block, cookie_block, default_action, default_backend_servers, default_health_check,
    header_block, health_check_block, parse_section_id, servers_check_block, ssl_block, wire, wire_one,
};
use crate::error::ProviderError;
use crate::resource::{ResourceKind, changed};
use crate::schema::{block, bool, defaulted, list_of, number, required, set_of, string, with_blocks};
use crate::validate::Validator;
use crate::value::{Blocks, Flag, Int, Str, default_to, flag, int, text};

const SERVER_MAXCONN: i64 = 2000;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendState {
    pub id: Str,
    pub name: Str,
    pub server_id: Int,
    pub balance: Str,
    pub mode: Str,
    pub action: Str,
    pub cache: Flag,
    pub compression: Flag,
    pub forward_for: Flag,
    pub ssl_offloading: Flag,
    pub redispatch: Flag,
    pub acls: Blocks<AclBlock>,
    pub backend_servers: Blocks<BackendServerBlock>,
    pub headers: Blocks<HeaderBlock>,
    pub circuit_breaking: Blocks<CircuitBreakingBlock>,
    pub servers_check: Blocks<ServersCheckBlock>,
    pub ssl: Blocks<SslBlock>,
    pub cookie: Blocks<CookieBlock>,
    pub health_check: Blocks<HealthCheckBlock>,
}

impl BackendState {
    fn section(&self) -> ApiBackend {
        ApiBackend {
            name: text(&self.name),
            mode: text(&self.mode),
            balance: text(&self.balance),
            action: text(&self.action),
            cache: flag(&self.cache),
            compression: flag(&self.compression),
            forward_for: flag(&self.forward_for),
            ssl_offloading: flag(&self.ssl_offloading),
            redispatch: flag(&self.redispatch),
            acls: wire(&self.acls),
            backend_servers: wire(&self.backend_servers),
            headers: wire(&self.headers),
            circuit_breaking: wire_one(&self.circuit_breaking),
            servers_check: wire_one(&self.servers_check),
            ssl: wire_one(&self.ssl),
            cookie: wire_one(&self.cookie),
            health_check: wire_one(&self.health_check),
        }
    }
}

pub struct BackendSection;

#[async_trait]
impl ResourceKind for BackendSection {
    type State = BackendState;
    const NAME: &'static str = "roxywi_haproxy_section_backend";

    fn schema(&self) -> Block {
        with_blocks(
            block(
                "An HAProxy backend",
                map! {
                    "name" => required(string(), "Backend name. Changing it recreates the section"),
                    "server_id" => required(number(), "Server running HAProxy. Changing it recreates the section"),
                    "balance" => required(string(), "Balancing algorithm, e.g. roundrobin or leastconn"),
                    "mode" => defaulted(string(), "http or tcp, default http"),
                    "action" => action_attribute(),
                    "cache" => defaulted(bool(), "Enable the response cache"),
                    "compression" => defaulted(bool(), "Compress responses"),
                    "forward_for" => defaulted(bool(), "Add X-Forwarded-For"),
                    "ssl_offloading" => defaulted(bool(), "Terminate TLS and talk plain HTTP to servers"),
                    "redispatch" => defaulted(bool(), "Redispatch sessions of failed servers"),
                },
            ),
            map! {
                "acls" => list_of(acl_block()),
                "backend_servers" => list_of(backend_server_block(SERVER_MAXCONN)),
                "headers" => list_of(header_block()),
                "circuit_breaking" => set_of(circuit_breaking_block()),
                "servers_check" => set_of(servers_check_block()),
                "ssl" => set_of(ssl_block()),
                "cookie" => set_of(cookie_block()),
                "health_check" => set_of(health_check_block()),
            },
        )
    }

    fn validate(&self, state: &BackendState, checks: &mut Validator) {
        checks.one_of("balance", &state.balance, BalanceAlgorithm::VARIANTS);
        check_mode(checks, &state.mode);
        check_action(checks, &state.action);
        check_acls(checks, &state.acls);
        check_backend_servers(checks, &state.backend_servers);
        check_headers(checks, &state.headers);
        check_circuit_breaking(checks, &state.circuit_breaking);
        check_health_check(checks, &state.health_check);
        checks.at_most_one("servers_check", &state.servers_check);
        checks.at_most_one("ssl", &state.ssl);
        checks.at_most_one("cookie", &state.cookie);

        HttpOnly {
            switches: vec![
                ("cache", &state.cache),
                ("compression", &state.compression),
                ("forward_for", &state.forward_for),
                ("ssl_offloading", &state.ssl_offloading),
                ("redispatch", &state.redispatch),
            ],
            headers: Some(&state.headers),
            cookie: Some(&state.cookie),
            servers: Some(&state.backend_servers),
            health_check: Some(&state.health_check),
        }
        .check(checks, &state.mode);
    }

    fn apply_defaults(&self, state: &mut BackendState) {
        default_to(&mut state.mode, "http".to_owned());
        default_action(&mut state.action);
        for switch in [
            &mut state.cache,
            &mut state.compression,
            &mut state.forward_for,
            &mut state.ssl_offloading,
            &mut state.redispatch,
        ] {
            default_to(switch, false);
        }
        default_backend_servers(&mut state.backend_servers, SERVER_MAXCONN);
        default_health_check(&mut state.health_check);
    }

    fn id<'s>(&self, state: &'s BackendState) -> &'s Str {
        &state.id
    }

    fn set_id(&self, state: &mut BackendState, id: Str) {
        state.id = id;
    }

    fn replaced_fields(&self, prior: &BackendState, proposed: &BackendState) -> Vec<&'static str> {
        let mut out = Vec::new();
        changed("name", &prior.name, &proposed.name, &mut out);
        changed("server_id", &prior.server_id, &proposed.server_id, &mut out);
        out
    }

    async fn create(&self, client: &RoxyClient, plan: &BackendState) -> Result<String, ProviderError> {
        Ok(client
            .create_haproxy_section(int(&plan.server_id), SectionKind::Backend, &plan.section())
            .await?)
    }

    async fn read(
        &self,
        client: &RoxyClient,
        id: &str,
        prior: &BackendState,
    ) -> Result<Option<BackendState>, ProviderError> {
        let (server_id, name) = parse_section_id(id)?;
        let backend: ApiBackend = client
            .get_haproxy_section(server_id, SectionKind::Backend, name)
            .await?;
        Ok(Some(BackendState {
            id: prior.id.clone(),
            name: Value::Value(name.to_owned()),
            server_id: Value::Value(server_id),
            balance: Value::Value(backend.balance),
            mode: Value::Value(backend.mode),
            action: prior.action.clone(),
            cache: Value::Value(backend.cache),
            compression: Value::Value(backend.compression),
            forward_for: Value::Value(backend.forward_for),
            ssl_offloading: Value::Value(backend.ssl_offloading),
            redispatch: Value::Value(backend.redispatch),
            acls: blocks(backend.acls),
            backend_servers: blocks(backend.backend_servers),
            headers: blocks(backend.headers),
            circuit_breaking: block_one(backend.circuit_breaking),
            servers_check: block_one(backend.servers_check),
            ssl: block_one(backend.ssl),
            cookie: block_one(backend.cookie),
            health_check: block_one(backend.health_check),
        }))
    }

    async fn update(
        &self,
        client: &RoxyClient,
        id: &str,
        _prior: &BackendState,
        plan: &BackendState,
    ) -> Result<(), ProviderError> {
        let (server_id, name) = parse_section_id(id)?;
        Ok(client
            .update_haproxy_section(server_id, SectionKind::Backend, name, &plan.section())
            .await?)
    }

    async fn delete(&self, client: &RoxyClient, id: &str, _state: &BackendState) -> Result<(), ProviderError> {
        let (server_id, name) = parse_section_id(id)?;
        Ok(client
            .delete_haproxy_section(server_id, SectionKind::Backend, name)
            .await?)
    }

    fn import_state(&self, id: &str) -> Result<BackendState, ProviderError> {
        parse_section_id(id)?;
        let mut state = BackendState {
            id: Value::Value(id.to_owned()),
            ..BackendState::default()
        };
        default_action(&mut state.action);
        Ok(state)
    }
}
