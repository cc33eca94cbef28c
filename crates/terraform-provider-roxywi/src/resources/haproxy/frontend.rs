use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_provider::map;
use tf_provider::schema::Block;
use tf_provider::value::Value;

use roxywi_api::RoxyClient;
use roxywi_api::haproxy::{FrontendSection as ApiFrontend, SectionKind};

use super::blocks::{
    AclBlock, BindBlock, HeaderBlock, HttpOnly, SslBlock, acl_block, action_attribute, bind_block, block_one, blocks,
    check_acls, check_action, check_binds, check_headers, check_mode, default_action, header_block,
    parse_section_id, ssl_block, wire, wire_one,
};
use crate::error::ProviderError;
use crate::resource::{ResourceKind, changed};
use crate::schema::{block, bool, defaulted, list_of, number, optional, required, set_of, string, with_blocks};
use crate::validate::Validator;
use crate::value::{Blocks, Flag, Int, Str, default_to, flag, int, refreshed, text};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontendState {
    pub id: Str,
    pub name: Str,
    pub server_id: Int,
    pub mode: Str,
    pub action: Str,
    pub maxconn: Int,
    pub backends: Str,
    pub blacklist: Str,
    pub whitelist: Str,
    pub cache: Flag,
    pub compression: Flag,
    pub forward_for: Flag,
    pub ssl_offloading: Flag,
    pub slow_attack: Flag,
    pub antibot: Flag,
    pub ddos: Flag,
    pub waf: Flag,
    pub binds: Blocks<BindBlock>,
    pub acls: Blocks<AclBlock>,
    pub headers: Blocks<HeaderBlock>,
    pub ssl: Blocks<SslBlock>,
}

impl FrontendState {
    fn section(&self) -> ApiFrontend {
        ApiFrontend {
            name: text(&self.name),
            mode: text(&self.mode),
            action: text(&self.action),
            maxconn: int(&self.maxconn),
            backends: text(&self.backends),
            blacklist: text(&self.blacklist),
            whitelist: text(&self.whitelist),
            cache: flag(&self.cache),
            compression: flag(&self.compression),
            forward_for: flag(&self.forward_for),
            ssl_offloading: flag(&self.ssl_offloading),
            slow_attack: flag(&self.slow_attack),
            antibot: flag(&self.antibot),
            ddos: flag(&self.ddos),
            waf: flag(&self.waf),
            binds: wire(&self.binds),
            acls: wire(&self.acls),
            headers: wire(&self.headers),
            ssl: wire_one(&self.ssl),
        }
    }
}

pub struct FrontendSection;

#[async_trait]
impl ResourceKind for FrontendSection {
    type State = FrontendState;
    const NAME: &'static str = "roxywi_haproxy_section_frontend";

    fn schema(&self) -> Block {
        with_blocks(
            block(
                "An HAProxy frontend",
                map! {
                    "name" => required(string(), "Frontend name. Changing it recreates the section"),
                    "server_id" => required(number(), "Server running HAProxy. Changing it recreates the section"),
                    "mode" => defaulted(string(), "http or tcp, default http"),
                    "action" => action_attribute(),
                    "maxconn" => defaulted(number(), "Connection limit, default 2000"),
                    "backends" => optional(string(), "Default backend"),
                    "blacklist" => optional(string(), "Black list name"),
                    "whitelist" => optional(string(), "White list name"),
                    "cache" => defaulted(bool(), "Enable the response cache"),
                    "compression" => defaulted(bool(), "Compress responses"),
                    "forward_for" => defaulted(bool(), "Add X-Forwarded-For"),
                    "ssl_offloading" => defaulted(bool(), "Redirect plain HTTP to HTTPS"),
                    "slow_attack" => defaulted(bool(), "Slowloris protection"),
                    "antibot" => defaulted(bool(), "Bot protection"),
                    "ddos" => defaulted(bool(), "DDoS protection"),
                    "waf" => defaulted(bool(), "Web application firewall"),
                },
            ),
            map! {
                "binds" => list_of(bind_block()),
                "acls" => list_of(acl_block()),
                "headers" => list_of(header_block()),
                "ssl" => set_of(ssl_block()),
            },
        )
    }

    fn validate(&self, state: &FrontendState, checks: &mut Validator) {
        check_mode(checks, &state.mode);
        check_action(checks, &state.action);
        check_binds(checks, &state.binds);
        check_acls(checks, &state.acls);
        check_headers(checks, &state.headers);
        checks.at_most_one("ssl", &state.ssl);

        HttpOnly {
            switches: vec![
                ("cache", &state.cache),
                ("compression", &state.compression),
                ("forward_for", &state.forward_for),
                ("ssl_offloading", &state.ssl_offloading),
            ],
            headers: Some(&state.headers),
            ..HttpOnly::default()
        }
        .check(checks, &state.mode);
    }

    fn apply_defaults(&self, state: &mut FrontendState) {
        default_to(&mut state.mode, "http".to_owned());
        default_to(&mut state.maxconn, 2000);
        default_action(&mut state.action);
        for switch in [
            &mut state.cache,
            &mut state.compression,
            &mut state.forward_for,
            &mut state.ssl_offloading,
            &mut state.slow_attack,
            &mut state.antibot,
            &mut state.ddos,
            &mut state.waf,
        ] {
            default_to(switch, false);
        }
    }

    fn id<'s>(&self, state: &'s FrontendState) -> &'s Str {
        &state.id
    }

    fn set_id(&self, state: &mut FrontendState, id: Str) {
        state.id = id;
    }

    fn replaced_fields(&self, prior: &FrontendState, proposed: &FrontendState) -> Vec<&'static str> {
        let mut out = Vec::new();
        changed("name", &prior.name, &proposed.name, &mut out);
        changed("server_id", &prior.server_id, &proposed.server_id, &mut out);
        out
    }

    async fn create(&self, client: &RoxyClient, plan: &FrontendState) -> Result<String, ProviderError> {
        Ok(client
            .create_haproxy_section(int(&plan.server_id), SectionKind::Frontend, &plan.section())
            .await?)
    }

    async fn read(
        &self,
        client: &RoxyClient,
        id: &str,
        prior: &FrontendState,
    ) -> Result<Option<FrontendState>, ProviderError> {
        let (server_id, name) = parse_section_id(id)?;
        let frontend: ApiFrontend = client
            .get_haproxy_section(server_id, SectionKind::Frontend, name)
            .await?;
        Ok(Some(FrontendState {
            id: prior.id.clone(),
            name: Value::Value(name.to_owned()),
            server_id: Value::Value(server_id),
            mode: Value::Value(frontend.mode),
            action: prior.action.clone(),
            maxconn: Value::Value(frontend.maxconn),
            backends: refreshed(&prior.backends, frontend.backends),
            blacklist: refreshed(&prior.blacklist, frontend.blacklist),
            whitelist: refreshed(&prior.whitelist, frontend.whitelist),
            cache: Value::Value(frontend.cache),
            compression: Value::Value(frontend.compression),
            forward_for: Value::Value(frontend.forward_for),
            ssl_offloading: Value::Value(frontend.ssl_offloading),
            slow_attack: Value::Value(frontend.slow_attack),
            antibot: Value::Value(frontend.antibot),
            ddos: Value::Value(frontend.ddos),
            waf: Value::Value(frontend.waf),
            binds: blocks(frontend.binds),
            acls: blocks(frontend.acls),
            headers: blocks(frontend.headers),
            ssl: block_one(frontend.ssl),
        }))
    }

    async fn update(
        &self,
        client: &RoxyClient,
        id: &str,
        _prior: &FrontendState,
        plan: &FrontendState,
    ) -> Result<(), ProviderError> {
        let (server_id, name) = parse_section_id(id)?;
        Ok(client
            .update_haproxy_section(server_id, SectionKind::Frontend, name, &plan.section())
            .await?)
    }

    async fn delete(&self, client: &RoxyClient, id: &str, _state: &FrontendState) -> Result<(), ProviderError> {
        let (server_id, name) = parse_section_id(id)?;
        Ok(client
            .delete_haproxy_section(server_id, SectionKind::Frontend, name)
            .await?)
    }

    fn import_state(&self, id: &str) -> Result<FrontendState, ProviderError> {
        parse_section_id(id)?;
        let mut state = FrontendState {
            id: Value::Value(id.to_owned()),
            ..FrontendState::default()
        };
        default_action(&mut state.action);
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn frontend() -> FrontendState {
        let mut state = FrontendState {
            name: Value::Value("www".into()),
            server_id: Value::Value(1),
            backends: Value::Value("web".into()),
            binds: Value::Value(vec![BindBlock {
                ip: Value::Null,
                port: Value::Value(80),
            }]),
            ..FrontendState::default()
        };
        FrontendSection.apply_defaults(&mut state);
        state
    }

    #[test]
    fn defaults_and_binds() {
        let section = frontend().section();
        assert_eq!(section.maxconn, 2000);
        assert_eq!(section.binds[0].ip, "");
        assert_eq!(section.binds[0].port, 80);
        assert!(!section.waf);
    }

    #[test]
    fn tcp_frontend_rejects_headers() {
        let state = FrontendState {
            mode: Value::Value("tcp".into()),
            headers: Value::Value(vec![HeaderBlock {
                path: Value::Value("http-request".into()),
                method: Value::Value("set-header".into()),
                name: Value::Value("X-Env".into()),
                value: Value::Value("prod".into()),
            }]),
            ddos: Value::Value(true),
            ..frontend()
        };
        let mut checks = Validator::new();
        FrontendSection.validate(&state, &mut checks);
        let attrs: Vec<&str> = checks.violations().iter().map(|v| v.attribute.as_str()).collect();
        assert_eq!(attrs, ["headers"]);
    }

    #[test]
    fn renaming_recreates() {
        let prior = frontend();
        let renamed = FrontendState {
            name: Value::Value("www2".into()),
            ..prior.clone()
        };
        assert_eq!(FrontendSection.replaced_fields(&prior, &renamed), ["name"]);
    }
}
