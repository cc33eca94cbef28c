use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_provider::map;
use tf_provider::schema::Block;
use tf_provider::value::Value;

use roxywi_api::RoxyClient;
use roxywi_api::haproxy::{Peer, PeersSection as ApiPeers, SectionKind};

use super::blocks::{action_attribute, blocks, check_action, default_action, parse_section_id, wire};
use crate::error::ProviderError;
use crate::resource::{ResourceKind, changed};
use crate::schema::{block, list_of, number, required, string, with_blocks};
use crate::validate::Validator;
use crate::value::{Blocks, Int, Str, int, items, text};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeerBlock {
    pub name: Str,
    pub ip: Str,
    pub port: Int,
}

impl From<&PeerBlock> for Peer {
    fn from(p: &PeerBlock) -> Self {
        Self {
            name: text(&p.name),
            ip: text(&p.ip),
            port: int(&p.port),
        }
    }
}

impl From<Peer> for PeerBlock {
    fn from(p: Peer) -> Self {
        Self {
            name: Value::Value(p.name),
            ip: Value::Value(p.ip),
            port: Value::Value(p.port),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeersState {
    pub id: Str,
    pub name: Str,
    pub server_id: Int,
    pub action: Str,
    pub peers: Blocks<PeerBlock>,
}

impl PeersState {
    fn section(&self) -> ApiPeers {
        ApiPeers {
            name: text(&self.name),
            action: text(&self.action),
            peers: wire(&self.peers),
        }
    }
}

pub struct PeersSection;

#[async_trait]
impl ResourceKind for PeersSection {
    type State = PeersState;
    const NAME: &'static str = "roxywi_haproxy_section_peers";

    fn schema(&self) -> Block {
        with_blocks(
            block(
                "HAProxy peers that share stick tables",
                map! {
                    "name" => required(string(), "Section name. Changing it recreates the section"),
                    "server_id" => required(number(), "Server running HAProxy. Changing it recreates the section"),
                    "action" => action_attribute(),
                },
            ),
            map! {
                "peers" => list_of(block(
                    "A peer",
                    map! {
                        "name" => required(string(), "Peer name, usually the hostname"),
                        "ip" => required(string(), "Peer address"),
                        "port" => required(number(), "Peer port"),
                    },
                )),
            },
        )
    }

    fn validate(&self, state: &PeersState, checks: &mut Validator) {
        check_action(checks, &state.action);
        for peer in items(&state.peers) {
            checks.ip_address("peers.ip", &peer.ip);
            checks.port("peers.port", &peer.port);
        }
    }

    fn apply_defaults(&self, state: &mut PeersState) {
        default_action(&mut state.action);
    }

    fn id<'s>(&self, state: &'s PeersState) -> &'s Str {
        &state.id
    }

    fn set_id(&self, state: &mut PeersState, id: Str) {
        state.id = id;
    }

    fn replaced_fields(&self, prior: &PeersState, proposed: &PeersState) -> Vec<&'static str> {
        let mut out = Vec::new();
        changed("name", &prior.name, &proposed.name, &mut out);
        changed("server_id", &prior.server_id, &proposed.server_id, &mut out);
        out
    }

    async fn create(&self, client: &RoxyClient, plan: &PeersState) -> Result<String, ProviderError> {
        Ok(client
            .create_haproxy_section(int(&plan.server_id), SectionKind::Peers, &plan.section())
            .await?)
    }

    async fn read(
        &self,
        client: &RoxyClient,
        id: &str,
        prior: &PeersState,
    ) -> Result<Option<PeersState>, ProviderError> {
        let (server_id, name) = parse_section_id(id)?;
        let peers: ApiPeers = client
            .get_haproxy_section(server_id, SectionKind::Peers, name)
            .await?;
        Ok(Some(PeersState {
            id: prior.id.clone(),
            name: Value::Value(name.to_owned()),
            server_id: Value::Value(server_id),
            action: prior.action.clone(),
            peers: blocks(peers.peers),
        }))
    }

    async fn update(
        &self,
        client: &RoxyClient,
        id: &str,
        _prior: &PeersState,
        plan: &PeersState,
    ) -> Result<(), ProviderError> {
        let (server_id, name) = parse_section_id(id)?;
        Ok(client
            .update_haproxy_section(server_id, SectionKind::Peers, name, &plan.section())
            .await?)
    }

    async fn delete(&self, client: &RoxyClient, id: &str, _state: &PeersState) -> Result<(), ProviderError> {
        let (server_id, name) = parse_section_id(id)?;
        Ok(client
            .delete_haproxy_section(server_id, SectionKind::Peers, name)
            .await?)
    }

    fn import_state(&self, id: &str) -> Result<PeersState, ProviderError> {
        parse_section_id(id)?;
        let mut state = PeersState {
            id: Value::Value(id.to_owned()),
            ..PeersState::default()
        };
        default_action(&mut state.action);
        Ok(state)
    }
}
