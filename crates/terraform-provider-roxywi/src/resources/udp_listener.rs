// UDP (LVS) listeners
//
// The VIP must already exist on the owning HA cluster or standalone
// server; it is checked before every create and update.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::VariantNames;
use tf_provider::map;
use tf_provider::schema::Block;
use tf_provider::value::Value;

use roxywi_api::RoxyClient;
use roxywi_api::udp::{LbAlgorithm, UdpBackend, UdpListenerRequest};

use crate::error::ProviderError;
use crate::resource::{ResourceKind, changed};
use crate::schema::{block, list_of, number, optional, required, string, with_blocks};
use crate::validate::Validator;
use crate::value::{Blocks, Int, Str, as_str, int, items, known, refreshed, text};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendBlock {
    pub backend_ip: Str,
    pub port: Int,
    pub weight: Int,
}

impl From<UdpBackend> for BackendBlock {
    fn from(b: UdpBackend) -> Self {
        Self {
            backend_ip: Value::Value(b.backend_ip),
            port: Value::Value(b.port),
            weight: Value::Value(b.weight),
        }
    }
}

impl From<&BackendBlock> for UdpBackend {
    fn from(b: &BackendBlock) -> Self {
        Self {
            backend_ip: text(&b.backend_ip),
            port: int(&b.port),
            weight: int(&b.weight),
        }
    }
}

fn backend_block() -> Block {
    block(
        "A real server behind the listener",
        map! {
            "backend_ip" => required(string(), "Backend address"),
            "port" => required(number(), "Backend port"),
            "weight" => required(number(), "Scheduling weight"),
        },
    )
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UdpListenerState {
    pub id: Str,
    pub name: Str,
    pub vip: Str,
    pub port: Str,
    pub cluster_id: Int,
    pub server_id: Int,
    pub config: Blocks<BackendBlock>,
    pub lb_algo: Str,
    pub group_id: Str,
    pub description: Str,
}

impl UdpListenerState {
    fn request(&self) -> UdpListenerRequest {
        UdpListenerRequest {
            cluster_id: int(&self.cluster_id),
            server_id: int(&self.server_id),
            config: items(&self.config).iter().map(UdpBackend::from).collect(),
            description: text(&self.description),
            group_id: text(&self.group_id),
            lb_algo: text(&self.lb_algo),
            name: text(&self.name),
            port: text(&self.port),
            vip: text(&self.vip),
        }
    }

    async fn check_vip(&self, client: &RoxyClient) -> Result<(), ProviderError> {
        Ok(client
            .ensure_vip_exists(int(&self.cluster_id), int(&self.server_id), as_str(&self.vip))
            .await?)
    }
}

pub struct UdpListener;

#[async_trait]
impl ResourceKind for UdpListener {
    type State = UdpListenerState;
    const NAME: &'static str = "roxywi_udp_listener";

    fn schema(&self) -> Block {
        with_blocks(
            block(
                "A UDP load-balancing listener on an HA cluster or a single server",
                map! {
                    "name" => required(string(), "Listener name"),
                    "vip" => required(string(), "Virtual IP; must already be bound on the cluster or server"),
                    "port" => required(string(), "Listening port"),
                    "cluster_id" => optional(number(), "HA cluster ID; set this or server_id"),
                    "server_id" => optional(number(), "Server ID; set this or cluster_id"),
                    "lb_algo" => required(string(), "Scheduler: rr, wrr, lc, wlc, sh, dh or lblc"),
                    "group_id" => optional(string(), "Owning group ID"),
                    "description" => optional(string(), "Free text; single quotes are stripped"),
                },
            ),
            map! { "config" => list_of(backend_block()) },
        )
    }

    fn validate(&self, state: &UdpListenerState, checks: &mut Validator) {
        checks.not_blank("vip", &state.vip);
        checks.one_of("lb_algo", &state.lb_algo, LbAlgorithm::VARIANTS);
        for backend in items(&state.config) {
            checks.port("config.port", &backend.port);
        }

        let owner = |v: &Int| known(v).map(|id| *id != 0);
        match (owner(&state.cluster_id), owner(&state.server_id)) {
            (Some(true), Some(true)) => checks.reject(
                "cluster_id",
                "only one of cluster_id or server_id may be set",
            ),
            (Some(false) | None, Some(false) | None)
                if !matches!(state.cluster_id, Value::Unknown)
                    && !matches!(state.server_id, Value::Unknown) =>
            {
                checks.reject("cluster_id", "either cluster_id or server_id must be specified");
            }
            _ => {}
        }
    }

    fn id<'s>(&self, state: &'s UdpListenerState) -> &'s Str {
        &state.id
    }

    fn set_id(&self, state: &mut UdpListenerState, id: Str) {
        state.id = id;
    }

    fn replaced_fields(&self, prior: &UdpListenerState, proposed: &UdpListenerState) -> Vec<&'static str> {
        let mut out = Vec::new();
        changed("cluster_id", &int(&prior.cluster_id), &int(&proposed.cluster_id), &mut out);
        changed("server_id", &int(&prior.server_id), &int(&proposed.server_id), &mut out);
        out
    }

    async fn create(&self, client: &RoxyClient, plan: &UdpListenerState) -> Result<String, ProviderError> {
        plan.check_vip(client).await?;
        Ok(client.create_udp_listener(&plan.request()).await?)
    }

    async fn read(
        &self,
        client: &RoxyClient,
        id: &str,
        prior: &UdpListenerState,
    ) -> Result<Option<UdpListenerState>, ProviderError> {
        let listener = client.get_udp_listener(id).await?;
        let port = if listener.port == 0 {
            String::new()
        } else {
            listener.port.to_string()
        };
        Ok(Some(UdpListenerState {
            id: prior.id.clone(),
            name: refreshed(&prior.name, listener.name.clone()),
            vip: refreshed(&prior.vip, listener.vip.clone()),
            port: refreshed(&prior.port, port),
            cluster_id: refreshed(&prior.cluster_id, listener.cluster_id),
            server_id: refreshed(&prior.server_id, listener.server_id),
            lb_algo: refreshed(&prior.lb_algo, listener.lb_algo.clone()),
            group_id: refreshed(&prior.group_id, listener.group_id()),
            description: refreshed(&prior.description, listener.description.clone()),
            config: Value::Value(listener.config.into_iter().map(BackendBlock::from).collect()),
        }))
    }

    async fn update(
        &self,
        client: &RoxyClient,
        id: &str,
        _prior: &UdpListenerState,
        plan: &UdpListenerState,
    ) -> Result<(), ProviderError> {
        plan.check_vip(client).await?;
        Ok(client.update_udp_listener(id, &plan.request()).await?)
    }

    async fn delete(&self, client: &RoxyClient, id: &str, _state: &UdpListenerState) -> Result<(), ProviderError> {
        Ok(client.delete_udp_listener(id).await?)
    }
}
