// The `global` section. It always exists on a managed server, so both
// create and update write it in place.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_provider::map;
use tf_provider::schema::Block;
use tf_provider::value::Value;

use roxywi_api::RoxyClient;
use roxywi_api::haproxy::GlobalSection as ApiGlobal;

use super::blocks::{action_attribute, check_action, default_action, parse_section_id};
use crate::error::ProviderError;
use crate::resource::{ResourceKind, changed};
use crate::schema::{block, bool, defaulted, number, optional, required, string, string_list};
use crate::validate::Validator;
use crate::value::{Flag, Int, Str, StrList, default_to, flag, int, refreshed, refreshed_list, strings, text};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalState {
    pub id: Str,
    pub server_id: Int,
    pub log: StrList,
    pub socket: StrList,
    pub maxconn: Int,
    pub pidfile: Str,
    pub user: Str,
    pub group: Str,
    pub chroot: Str,
    pub daemon: Flag,
    pub option: Str,
    pub action: Str,
}

impl GlobalState {
    fn section(&self) -> ApiGlobal {
        ApiGlobal {
            log: strings(&self.log),
            socket: strings(&self.socket),
            maxconn: int(&self.maxconn),
            pidfile: text(&self.pidfile),
            user: text(&self.user),
            group: text(&self.group),
            chroot: text(&self.chroot),
            daemon: flag(&self.daemon),
            option: text(&self.option),
            action: text(&self.action),
        }
    }
}

pub struct GlobalSection;

#[async_trait]
impl ResourceKind for GlobalSection {
    type State = GlobalState;
    const NAME: &'static str = "roxywi_haproxy_section_global";

    fn schema(&self) -> Block {
        block(
            "The HAProxy global section of a server",
            map! {
                "server_id" => required(number(), "Server running HAProxy. Changing it recreates the resource"),
                "log" => optional(string_list(), "log directives"),
                "socket" => optional(string_list(), "stats socket directives"),
                "maxconn" => defaulted(number(), "Process-wide connection limit, default 5000"),
                "pidfile" => defaulted(string(), "PID file, default /var/run/haproxy.pid"),
                "user" => defaulted(string(), "User HAProxy runs as, default haproxy"),
                "group" => defaulted(string(), "Group HAProxy runs as, default haproxy"),
                "chroot" => defaulted(string(), "chroot directory, default haproxy"),
                "daemon" => defaulted(bool(), "Run in the background, default true"),
                "option" => optional(string(), "Extra raw directives, one per line"),
                "action" => action_attribute(),
            },
        )
    }

    fn validate(&self, state: &GlobalState, checks: &mut Validator) {
        check_action(checks, &state.action);
    }

    fn apply_defaults(&self, state: &mut GlobalState) {
        default_to(&mut state.maxconn, 5000);
        default_to(&mut state.pidfile, "/var/run/haproxy.pid".to_owned());
        default_to(&mut state.user, "haproxy".to_owned());
        default_to(&mut state.group, "haproxy".to_owned());
        default_to(&mut state.chroot, "haproxy".to_owned());
        default_to(&mut state.daemon, true);
        default_action(&mut state.action);
    }

    fn id<'s>(&self, state: &'s GlobalState) -> &'s Str {
        &state.id
    }

    fn set_id(&self, state: &mut GlobalState, id: Str) {
        state.id = id;
    }

    fn replaced_fields(&self, prior: &GlobalState, proposed: &GlobalState) -> Vec<&'static str> {
        let mut out = Vec::new();
        changed("server_id", &prior.server_id, &proposed.server_id, &mut out);
        out
    }

    async fn create(&self, client: &RoxyClient, plan: &GlobalState) -> Result<String, ProviderError> {
        let server_id = int(&plan.server_id);
        client.put_haproxy_global(server_id, &plan.section()).await?;
        Ok(format!("{server_id}-global"))
    }

    async fn read(
        &self,
        client: &RoxyClient,
        id: &str,
        prior: &GlobalState,
    ) -> Result<Option<GlobalState>, ProviderError> {
        let (server_id, _) = parse_section_id(id)?;
        let global = client.get_haproxy_global(server_id).await?;
        Ok(Some(GlobalState {
            server_id: Value::Value(server_id),
            log: refreshed_list(&prior.log, global.log),
            socket: refreshed_list(&prior.socket, global.socket),
            maxconn: Value::Value(global.maxconn),
            pidfile: Value::Value(global.pidfile),
            user: Value::Value(global.user),
            group: Value::Value(global.group),
            chroot: Value::Value(global.chroot),
            daemon: Value::Value(global.daemon),
            option: refreshed(&prior.option, global.option),
            ..prior.clone()
        }))
    }

    async fn update(
        &self,
        client: &RoxyClient,
        id: &str,
        _prior: &GlobalState,
        plan: &GlobalState,
    ) -> Result<(), ProviderError> {
        let (server_id, _) = parse_section_id(id)?;
        Ok(client.put_haproxy_global(server_id, &plan.section()).await?)
    }

    async fn delete(&self, client: &RoxyClient, id: &str, _state: &GlobalState) -> Result<(), ProviderError> {
        let (server_id, _) = parse_section_id(id)?;
        Ok(client.delete_haproxy_global(server_id).await?)
    }

    fn import_state(&self, id: &str) -> Result<GlobalState, ProviderError> {
        parse_section_id(id)?;
        let mut state = GlobalState {
            id: Value::Value(id.to_owned()),
            ..GlobalState::default()
        };
        default_action(&mut state.action);
        Ok(state)
    }
}
