// The `defaults` section. Like `global` it always exists; removing the
// resource leaves the server's section as it is.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_provider::map;
use tf_provider::schema::Block;
use tf_provider::value::Value;
use tracing::debug;

use roxywi_api::RoxyClient;
use roxywi_api::haproxy::{DefaultsSection as ApiDefaults, Timeouts};

use super::blocks::{action_attribute, block_one, check_action, default_action, parse_section_id, wire_one};
use crate::error::ProviderError;
use crate::resource::{ResourceKind, changed};
use crate::schema::{block, defaulted, number, optional, required, set_of, string, with_blocks};
use crate::validate::Validator;
use crate::value::{Blocks, Int, Str, default_to, int, items_mut, refreshed, text};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutBlock {
    pub check: Int,
    pub client: Int,
    pub connect: Int,
    pub http_keep_alive: Int,
    pub http_request: Int,
    pub queue: Int,
    pub server: Int,
}

impl From<&TimeoutBlock> for Timeouts {
    fn from(t: &TimeoutBlock) -> Self {
        Self {
            check: int(&t.check),
            client: int(&t.client),
            connect: int(&t.connect),
            http_keep_alive: int(&t.http_keep_alive),
            http_request: int(&t.http_request),
            queue: int(&t.queue),
            server: int(&t.server),
        }
    }
}

impl From<Timeouts> for TimeoutBlock {
    fn from(t: Timeouts) -> Self {
        Self {
            check: Value::Value(t.check),
            client: Value::Value(t.client),
            connect: Value::Value(t.connect),
            http_keep_alive: Value::Value(t.http_keep_alive),
            http_request: Value::Value(t.http_request),
            queue: Value::Value(t.queue),
            server: Value::Value(t.server),
        }
    }
}

impl TimeoutBlock {
    fn apply_defaults(&mut self) {
        default_to(&mut self.check, 10);
        default_to(&mut self.client, 60);
        default_to(&mut self.connect, 10);
        default_to(&mut self.http_keep_alive, 10);
        default_to(&mut self.http_request, 10);
        default_to(&mut self.queue, 60);
        default_to(&mut self.server, 60);
    }
}

fn timeout_block() -> Block {
    block(
        "Timeouts in seconds",
        map! {
            "check" => defaulted(number(), "Default 10"),
            "client" => defaulted(number(), "Default 60"),
            "connect" => defaulted(number(), "Default 10"),
            "http_keep_alive" => defaulted(number(), "Default 10"),
            "http_request" => defaulted(number(), "Default 10"),
            "queue" => defaulted(number(), "Default 60"),
            "server" => defaulted(number(), "Default 60"),
        },
    )
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsState {
    pub id: Str,
    pub server_id: Int,
    pub log: Str,
    pub retries: Int,
    pub maxconn: Int,
    pub option: Str,
    pub action: Str,
    pub timeout: Blocks<TimeoutBlock>,
}

impl DefaultsState {
    fn section(&self) -> ApiDefaults {
        ApiDefaults {
            log: text(&self.log),
            retries: int(&self.retries),
            maxconn: int(&self.maxconn),
            option: text(&self.option),
            action: text(&self.action),
            timeout: wire_one(&self.timeout),
        }
    }
}

pub struct DefaultsSection;

#[async_trait]
impl ResourceKind for DefaultsSection {
    type State = DefaultsState;
    const NAME: &'static str = "roxywi_haproxy_section_defaults";

    fn schema(&self) -> Block {
        with_blocks(
            block(
                "The HAProxy defaults section of a server",
                map! {
                    "server_id" => required(number(), "Server running HAProxy. Changing it recreates the resource"),
                    "log" => defaulted(string(), "Log target, default global"),
                    "retries" => defaulted(number(), "Connection retries, default 3"),
                    "maxconn" => defaulted(number(), "Per-proxy connection limit, default 5000"),
                    "option" => optional(string(), "Extra raw directives, one per line"),
                    "action" => action_attribute(),
                },
            ),
            map! { "timeout" => set_of(timeout_block()) },
        )
    }

    fn validate(&self, state: &DefaultsState, checks: &mut Validator) {
        check_action(checks, &state.action);
        checks.at_most_one("timeout", &state.timeout);
    }

    fn apply_defaults(&self, state: &mut DefaultsState) {
        default_to(&mut state.log, "global".to_owned());
        default_to(&mut state.retries, 3);
        default_to(&mut state.maxconn, 5000);
        default_action(&mut state.action);
        items_mut(&mut state.timeout)
            .iter_mut()
            .for_each(TimeoutBlock::apply_defaults);
    }

    fn id<'s>(&self, state: &'s DefaultsState) -> &'s Str {
        &state.id
    }

    fn set_id(&self, state: &mut DefaultsState, id: Str) {
        state.id = id;
    }

    fn replaced_fields(&self, prior: &DefaultsState, proposed: &DefaultsState) -> Vec<&'static str> {
        let mut out = Vec::new();
        changed("server_id", &prior.server_id, &proposed.server_id, &mut out);
        out
    }

    async fn create(&self, client: &RoxyClient, plan: &DefaultsState) -> Result<String, ProviderError> {
        let server_id = int(&plan.server_id);
        client.put_haproxy_defaults(server_id, &plan.section()).await?;
        Ok(format!("{server_id}-defaults"))
    }

    async fn read(
        &self,
        client: &RoxyClient,
        id: &str,
        prior: &DefaultsState,
    ) -> Result<Option<DefaultsState>, ProviderError> {
        let (server_id, _) = parse_section_id(id)?;
        let defaults = client.get_haproxy_defaults(server_id).await?;
        Ok(Some(DefaultsState {
            server_id: Value::Value(server_id),
            log: Value::Value(defaults.log),
            retries: Value::Value(defaults.retries),
            maxconn: Value::Value(defaults.maxconn),
            option: refreshed(&prior.option, defaults.option),
            timeout: block_one(defaults.timeout),
            ..prior.clone()
        }))
    }

    async fn update(
        &self,
        client: &RoxyClient,
        id: &str,
        _prior: &DefaultsState,
        plan: &DefaultsState,
    ) -> Result<(), ProviderError> {
        let (server_id, _) = parse_section_id(id)?;
        Ok(client.put_haproxy_defaults(server_id, &plan.section()).await?)
    }

    async fn delete(&self, _client: &RoxyClient, id: &str, _state: &DefaultsState) -> Result<(), ProviderError> {
        debug!(id, "defaults section is left in place");
        Ok(())
    }

    fn import_state(&self, id: &str) -> Result<DefaultsState, ProviderError> {
        parse_section_id(id)?;
        let mut state = DefaultsState {
            id: Value::Value(id.to_owned()),
            ..DefaultsState::default()
        };
        default_action(&mut state.action);
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn timeout_defaults_fill_the_block() {
        let mut state = DefaultsState {
            timeout: Value::Value(vec![TimeoutBlock {
                client: Value::Value(30),
                ..TimeoutBlock::default()
            }]),
            ..DefaultsState::default()
        };
        DefaultsSection.apply_defaults(&mut state);
        let section = state.section();
        let timeout = section.timeout.unwrap();
        assert_eq!(timeout.client, 30);
        assert_eq!(timeout.check, 10);
        assert_eq!(timeout.server, 60);
        assert_eq!(section.log, "global");
        assert_eq!(section.retries, 3);
    }

    #[test]
    fn no_timeout_block_sends_none() {
        let mut state = DefaultsState::default();
        DefaultsSection.apply_defaults(&mut state);
        assert_eq!(state.section().timeout, None);
    }

    #[test]
    fn only_one_timeout_block() {
        let state = DefaultsState {
            timeout: Value::Value(vec![TimeoutBlock::default(), TimeoutBlock::default()]),
            ..DefaultsState::default()
        };
        let mut checks = Validator::new();
        DefaultsSection.validate(&state, &mut checks);
        assert_eq!(checks.violations()[0].attribute, "timeout");
    }
}
