// A UDP listener by ID, with its group expanded.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_provider::schema::Schema;
use tf_provider::value::{Value, ValueEmpty};
use tf_provider::{DataSource, Diagnostics, map};
use tracing::debug;

use roxywi_api::udp::{ListenerGroup, UdpBackend, UdpListener};

use crate::error::{ProviderError, attribute_error};
use crate::provider::SharedClient;
use crate::schema::{block, computed, list_of, number, required, set_of, string, with_blocks};
use crate::value::{Blocks, Int, Str, known};

const NAME: &str = "roxywi_udp_listener";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupBlock {
    pub group_id: Int,
    pub name: Str,
    pub description: Str,
}

impl From<ListenerGroup> for GroupBlock {
    fn from(g: ListenerGroup) -> Self {
        Self {
            group_id: Value::Value(g.group_id),
            name: Value::Value(g.name),
            description: Value::Value(g.description),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigBlock {
    pub backend_ip: Str,
    pub port: Int,
    pub weight: Int,
}

impl From<UdpBackend> for ConfigBlock {
    fn from(b: UdpBackend) -> Self {
        Self {
            backend_ip: Value::Value(b.backend_ip),
            port: Value::Value(b.port),
            weight: Value::Value(b.weight),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UdpListenerLookup {
    pub id: Str,
    pub name: Str,
    pub vip: Str,
    pub port: Int,
    pub lb_algo: Str,
    pub description: Str,
    pub cluster_id: Int,
    pub server_id: Int,
    pub check_enabled: Int,
    pub delay_loop: Int,
    pub delay_before_retry: Int,
    pub retry: Int,
    pub group_id: Blocks<GroupBlock>,
    pub config: Blocks<ConfigBlock>,
}

impl UdpListenerLookup {
    fn from_api(id: String, listener: UdpListener) -> Self {
        Self {
            id: Value::Value(id),
            name: Value::Value(listener.name),
            vip: Value::Value(listener.vip),
            port: Value::Value(listener.port),
            lb_algo: Value::Value(listener.lb_algo),
            description: Value::Value(listener.description),
            cluster_id: Value::Value(listener.cluster_id),
            server_id: Value::Value(listener.server_id),
            check_enabled: Value::Value(listener.check_enabled),
            delay_loop: Value::Value(listener.delay_loop),
            delay_before_retry: Value::Value(listener.delay_before_retry),
            retry: Value::Value(listener.retry),
            group_id: Value::Value(listener.group.into_iter().map(GroupBlock::from).collect()),
            config: Value::Value(listener.config.into_iter().map(ConfigBlock::from).collect()),
        }
    }
}

pub struct UdpListenerDataSource {
    client: SharedClient,
}

impl UdpListenerDataSource {
    pub fn new(client: SharedClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DataSource for UdpListenerDataSource {
    type State<'a> = UdpListenerLookup;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(Schema {
            version: 1,
            block: with_blocks(
                block(
                    "Reads a UDP listener",
                    map! {
                        "id" => required(string(), "Listener ID"),
                        "name" => computed(string(), "Listener name"),
                        "vip" => computed(string(), "Virtual IP the listener binds to"),
                        "port" => computed(number(), "Listening port"),
                        "lb_algo" => computed(string(), "Scheduling algorithm"),
                        "description" => computed(string(), "Description"),
                        "cluster_id" => computed(number(), "Owning HA cluster, 0 for a standalone server"),
                        "server_id" => computed(number(), "Owning server, 0 for a cluster"),
                        "check_enabled" => computed(number(), "1 when health checks are enabled"),
                        "delay_loop" => computed(number(), "Seconds between health checks"),
                        "delay_before_retry" => computed(number(), "Seconds before a failed check is retried"),
                        "retry" => computed(number(), "Check retries"),
                    },
                ),
                map! {
                    "group_id" => list_of(block(
                        "Owning group",
                        map! {
                            "group_id" => computed(number(), "Group ID"),
                            "name" => computed(string(), "Group name"),
                            "description" => computed(string(), "Group description"),
                        },
                    )),
                    "config" => set_of(block(
                        "Real servers",
                        map! {
                            "backend_ip" => computed(string(), "Backend address"),
                            "port" => computed(number(), "Backend port"),
                            "weight" => computed(number(), "Scheduling weight"),
                        },
                    )),
                },
            ),
        })
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::State<'a>) -> Option<()> {
        match &config.id {
            Value::Value(id) if id.trim().is_empty() => {
                attribute_error(diags, "id", "must not be empty");
                None
            }
            _ => Some(()),
        }
    }

    async fn read<'a>(
        &self,
        diags: &mut Diagnostics,
        config: Self::State<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<Self::State<'a>> {
        let Some(id) = known(&config.id) else {
            attribute_error(diags, "id", "must be known before the listener can be read");
            return None;
        };
        let client = super::configured(&self.client, diags, NAME)?;
        debug!(id = %id, "reading UDP listener");
        match client.get_udp_listener(id).await {
            Ok(listener) => Some(UdpListenerLookup::from_api(id.clone(), listener)),
            Err(e) => {
                ProviderError::from(e).report(diags, &format!("Error reading {NAME}"));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn expanded_group_becomes_a_single_block() {
        let listener = UdpListener {
            name: "dns".into(),
            port: 53,
            check_enabled: 1,
            group: Some(ListenerGroup {
                group_id: 2,
                name: "ops".into(),
                description: String::new(),
            }),
            config: vec![UdpBackend {
                backend_ip: "10.0.0.5".into(),
                port: 53,
                weight: 50,
            }],
            ..UdpListener::default()
        };
        let lookup = UdpListenerLookup::from_api("7".into(), listener);
        assert_eq!(lookup.id, Value::Value("7".to_owned()));
        assert_eq!(lookup.check_enabled, Value::Value(1));
        let groups = crate::value::items(&lookup.group_id);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].group_id, Value::Value(2));
        assert_eq!(crate::value::items(&lookup.config)[0].weight, Value::Value(50));
    }

    #[test]
    fn missing_group_is_an_empty_list() {
        let lookup = UdpListenerLookup::from_api("7".into(), UdpListener::default());
        assert!(crate::value::items(&lookup.group_id).is_empty());
    }
}
