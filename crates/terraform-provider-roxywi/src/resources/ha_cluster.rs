// Keepalived HA clusters and their extra VIPs
//
// Cluster VIP state ID: "{cluster_id}-vip-{vip_id}".

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_provider::map;
use tf_provider::schema::Block;
use tf_provider::value::Value;

use roxywi_api::RoxyClient;
use roxywi_api::ha::{ClusterServer, ClusterServices, ClusterVip, HaCluster as ApiCluster, ServiceFlags};

use crate::error::ProviderError;
use crate::resource::{ResourceKind, changed};
use crate::schema::{block, bool, defaulted, list_of, number, optional, required, string, with_blocks};
use crate::validate::Validator;
use crate::value::{Blocks, Flag, Int, Str, default_to, flag, id_number, int, items, refreshed, split_id, text};

const CLUSTER_SERVICES: &[&str] = &["haproxy", "nginx", "apache"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerBlock {
    pub id: Int,
    pub master: Flag,
    pub eth: Str,
}

impl From<&ServerBlock> for ClusterServer {
    fn from(s: &ServerBlock) -> Self {
        Self {
            id: int(&s.id),
            master: flag(&s.master),
            eth: text(&s.eth),
        }
    }
}

impl From<ClusterServer> for ServerBlock {
    fn from(s: ClusterServer) -> Self {
        Self {
            id: Value::Value(s.id),
            master: Value::Value(s.master),
            eth: Value::Value(s.eth),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceBlock {
    pub name: Str,
    pub enabled: Flag,
    pub docker: Flag,
}

fn server_block() -> Block {
    block(
        "A cluster member",
        map! {
            "id" => required(number(), "Server ID"),
            "master" => required(bool(), "Whether this member starts as master"),
            "eth" => required(string(), "Interface the VIP is bound to"),
        },
    )
}

fn service_block() -> Block {
    block(
        "A service kept highly available on the cluster",
        map! {
            "name" => required(string(), "haproxy, nginx or apache"),
            "enabled" => required(bool(), "Whether keepalived tracks the service"),
            "docker" => required(bool(), "Whether the service runs in Docker"),
        },
    )
}

fn servers(list: &Blocks<ServerBlock>) -> Vec<ClusterServer> {
    items(list).iter().map(ClusterServer::from).collect()
}

fn check_servers(list: &Blocks<ServerBlock>, checks: &mut Validator) {
    for server in items(list) {
        checks.not_blank("servers.eth", &server.eth);
    }
}

// ── Cluster ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HaClusterState {
    pub id: Str,
    pub name: Str,
    pub description: Str,
    pub vip: Str,
    pub return_master: Flag,
    pub syn_flood: Flag,
    pub use_src: Flag,
    pub virt_server: Flag,
    pub servers: Blocks<ServerBlock>,
    pub services: Blocks<ServiceBlock>,
}

impl HaClusterState {
    fn request(&self, reconfigure: bool) -> ApiCluster {
        let services: ClusterServices = items(&self.services)
            .iter()
            .map(|s| {
                let flags = ServiceFlags {
                    enabled: flag(&s.enabled),
                    docker: flag(&s.docker),
                };
                (text(&s.name), flags)
            })
            .collect();
        ApiCluster {
            name: text(&self.name),
            description: text(&self.description),
            vip: text(&self.vip),
            return_master: flag(&self.return_master),
            syn_flood: flag(&self.syn_flood),
            use_src: flag(&self.use_src),
            virt_server: flag(&self.virt_server),
            servers: servers(&self.servers),
            services,
            reconfigure,
        }
    }

    /// Whether the change touches keepalived's generated config.
    fn needs_reconfigure(&self, prior: &HaClusterState) -> bool {
        self.return_master != prior.return_master
            || self.servers != prior.servers
            || self.services != prior.services
            || self.use_src != prior.use_src
            || self.vip != prior.vip
    }
}

/// Services in the order of `prior`; names the prior state lacks follow in
/// wire order. Stays null when nothing was configured or reported.
fn service_blocks(prior: &Blocks<ServiceBlock>, mut services: ClusterServices) -> Blocks<ServiceBlock> {
    if matches!(prior, Value::Null) && services.is_empty() {
        return Value::Null;
    }
    let block = |name: String, flags: ServiceFlags| ServiceBlock {
        name: Value::Value(name),
        enabled: Value::Value(flags.enabled),
        docker: Value::Value(flags.docker),
    };
    let mut ordered = Vec::with_capacity(services.len());
    for name in items(prior).iter().map(|s| text(&s.name)) {
        if let Some(flags) = services.shift_remove(&name) {
            ordered.push(block(name, flags));
        }
    }
    ordered.extend(services.into_iter().map(|(name, flags)| block(name, flags)));
    Value::Value(ordered)
}

pub struct HaCluster;

#[async_trait]
impl ResourceKind for HaCluster {
    type State = HaClusterState;
    const NAME: &'static str = "roxywi_ha_cluster";

    fn schema(&self) -> Block {
        with_blocks(
            block(
                "A keepalived cluster floating a VIP between servers",
                map! {
                    "name" => required(string(), "Cluster name"),
                    "description" => required(string(), "Free text"),
                    "vip" => required(string(), "Main virtual IP address"),
                    "return_master" => defaulted(bool(), "Move the VIP back to the master once it recovers"),
                    "syn_flood" => defaulted(bool(), "Enable SYN flood protection on the members"),
                    "use_src" => defaulted(bool(), "Use the VIP as source address for outgoing traffic"),
                    "virt_server" => defaulted(bool(), "Create an LVS virtual server for the VIP"),
                },
            ),
            map! {
                "servers" => list_of(server_block()),
                "services" => list_of(service_block()),
            },
        )
    }

    fn validate(&self, state: &HaClusterState, checks: &mut Validator) {
        checks.ip_address("vip", &state.vip);
        check_servers(&state.servers, checks);
        for service in items(&state.services) {
            checks.one_of("services.name", &service.name, CLUSTER_SERVICES);
        }
    }

    fn apply_defaults(&self, state: &mut HaClusterState) {
        default_to(&mut state.return_master, false);
        default_to(&mut state.syn_flood, false);
        default_to(&mut state.use_src, false);
        default_to(&mut state.virt_server, false);
    }

    fn id<'s>(&self, state: &'s HaClusterState) -> &'s Str {
        &state.id
    }

    fn set_id(&self, state: &mut HaClusterState, id: Str) {
        state.id = id;
    }

    async fn create(&self, client: &RoxyClient, plan: &HaClusterState) -> Result<String, ProviderError> {
        Ok(client.create_ha_cluster(&plan.request(true)).await?)
    }

    async fn read(
        &self,
        client: &RoxyClient,
        id: &str,
        prior: &HaClusterState,
    ) -> Result<Option<HaClusterState>, ProviderError> {
        let cluster = client.get_ha_cluster(id).await?;
        let services = service_blocks(&prior.services, cluster.services);
        Ok(Some(HaClusterState {
            id: prior.id.clone(),
            name: refreshed(&prior.name, cluster.name),
            description: refreshed(&prior.description, cluster.description),
            vip: refreshed(&prior.vip, cluster.vip),
            return_master: Value::Value(cluster.return_master),
            syn_flood: Value::Value(cluster.syn_flood),
            use_src: Value::Value(cluster.use_src),
            virt_server: Value::Value(cluster.virt_server),
            servers: Value::Value(cluster.servers.into_iter().map(ServerBlock::from).collect()),
            services,
        }))
    }

    async fn update(
        &self,
        client: &RoxyClient,
        id: &str,
        prior: &HaClusterState,
        plan: &HaClusterState,
    ) -> Result<(), ProviderError> {
        let body = plan.request(plan.needs_reconfigure(prior));
        Ok(client.update_ha_cluster(id, &body).await?)
    }

    async fn delete(&self, client: &RoxyClient, id: &str, _state: &HaClusterState) -> Result<(), ProviderError> {
        Ok(client.delete_ha_cluster(id).await?)
    }
}

// ── Extra VIPs ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HaClusterVipState {
    pub id: Str,
    pub cluster_id: Int,
    pub vip: Str,
    pub return_master: Flag,
    pub use_src: Flag,
    pub virt_server: Flag,
    pub servers: Blocks<ServerBlock>,
}

impl HaClusterVipState {
    fn request(&self, reconfigure: bool) -> ClusterVip {
        ClusterVip {
            cluster_id: int(&self.cluster_id),
            vip: text(&self.vip),
            return_master: flag(&self.return_master),
            use_src: flag(&self.use_src),
            virt_server: flag(&self.virt_server),
            servers: servers(&self.servers),
            reconfigure,
        }
    }
}

/// `(cluster_id, vip_id)` from `"{cluster_id}-vip-{vip_id}"`.
fn parse_vip_id(id: &str) -> Result<(&str, &str), ProviderError> {
    let parts = split_id(id, 3)?;
    if parts.len() != 3 || parts[1] != "vip" {
        return Err(ProviderError::InvalidId(id.to_owned()));
    }
    id_number(id, parts[0])?;
    Ok((parts[0], parts[2]))
}

pub struct HaClusterVip;

#[async_trait]
impl ResourceKind for HaClusterVip {
    type State = HaClusterVipState;
    const NAME: &'static str = "roxywi_ha_cluster_vip";

    fn schema(&self) -> Block {
        with_blocks(
            block(
                "An additional VIP on an existing HA cluster",
                map! {
                    "cluster_id" => required(number(), "Owning cluster. Changing it recreates the VIP"),
                    "vip" => required(string(), "Virtual IP address"),
                    "return_master" => defaulted(bool(), "Move the VIP back to the master once it recovers"),
                    "use_src" => defaulted(bool(), "Use the VIP as source address for outgoing traffic"),
                    "virt_server" => optional(bool(), "Create an LVS virtual server for the VIP"),
                },
            ),
            map! { "servers" => list_of(server_block()) },
        )
    }

    fn validate(&self, state: &HaClusterVipState, checks: &mut Validator) {
        checks.ip_address("vip", &state.vip);
        check_servers(&state.servers, checks);
    }

    fn apply_defaults(&self, state: &mut HaClusterVipState) {
        default_to(&mut state.return_master, false);
        default_to(&mut state.use_src, false);
    }

    fn id<'s>(&self, state: &'s HaClusterVipState) -> &'s Str {
        &state.id
    }

    fn set_id(&self, state: &mut HaClusterVipState, id: Str) {
        state.id = id;
    }

    fn replaced_fields(&self, prior: &HaClusterVipState, proposed: &HaClusterVipState) -> Vec<&'static str> {
        let mut out = Vec::new();
        changed("cluster_id", &prior.cluster_id, &proposed.cluster_id, &mut out);
        out
    }

    async fn create(&self, client: &RoxyClient, plan: &HaClusterVipState) -> Result<String, ProviderError> {
        let vip_id = client.create_cluster_vip(&plan.request(true)).await?;
        Ok(format!("{}-vip-{vip_id}", int(&plan.cluster_id)))
    }

    async fn read(
        &self,
        client: &RoxyClient,
        id: &str,
        prior: &HaClusterVipState,
    ) -> Result<Option<HaClusterVipState>, ProviderError> {
        let (cluster_id, vip_id) = parse_vip_id(id)?;
        let vip = client.get_cluster_vip(cluster_id, vip_id).await?;
        Ok(Some(HaClusterVipState {
            id: prior.id.clone(),
            cluster_id: Value::Value(id_number(id, cluster_id)?),
            vip: refreshed(&prior.vip, vip.vip),
            return_master: Value::Value(vip.return_master),
            use_src: Value::Value(vip.use_src),
            virt_server: refreshed(&prior.virt_server, vip.virt_server),
            servers: Value::Value(vip.servers.into_iter().map(ServerBlock::from).collect()),
        }))
    }

    async fn update(
        &self,
        client: &RoxyClient,
        id: &str,
        _prior: &HaClusterVipState,
        plan: &HaClusterVipState,
    ) -> Result<(), ProviderError> {
        let (cluster_id, vip_id) = parse_vip_id(id)?;
        Ok(client
            .update_cluster_vip(cluster_id, vip_id, &plan.request(false))
            .await?)
    }

    async fn delete(&self, client: &RoxyClient, id: &str, _state: &HaClusterVipState) -> Result<(), ProviderError> {
        let (cluster_id, vip_id) = parse_vip_id(id)?;
        Ok(client.delete_cluster_vip(cluster_id, vip_id).await?)
    }

    fn import_state(&self, id: &str) -> Result<HaClusterVipState, ProviderError> {
        parse_vip_id(id)?;
        Ok(HaClusterVipState {
            id: Value::Value(id.to_owned()),
            ..HaClusterVipState::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn member(id: i64, master: bool) -> ServerBlock {
        ServerBlock {
            id: Value::Value(id),
            master: Value::Value(master),
            eth: Value::Value("eth0".into()),
        }
    }

    fn cluster() -> HaClusterState {
        HaClusterState {
            name: Value::Value("edge".into()),
            vip: Value::Value("10.0.0.100".into()),
            servers: Value::Value(vec![member(1, true), member(2, false)]),
            services: Value::Value(vec![ServiceBlock {
                name: Value::Value("haproxy".into()),
                enabled: Value::Value(true),
                docker: Value::Value(false),
            }]),
            ..HaClusterState::default()
        }
    }

    #[test]
    fn services_read_back_in_configured_order() {
        let prior = HaClusterState {
            services: Value::Value(
                ["nginx", "haproxy"]
                    .into_iter()
                    .map(|name| ServiceBlock {
                        name: Value::Value(name.into()),
                        enabled: Value::Value(true),
                        docker: Value::Value(false),
                    })
                    .collect(),
            ),
            ..cluster()
        };
        let mut wire = ClusterServices::new();
        for name in ["apache", "haproxy", "nginx"] {
            wire.insert(
                name.to_owned(),
                ServiceFlags {
                    enabled: true,
                    docker: name == "apache",
                },
            );
        }

        let services = service_blocks(&prior.services, wire);
        let names: Vec<String> = items(&services).iter().map(|s| text(&s.name)).collect();
        assert_eq!(names, ["nginx", "haproxy", "apache"]);
        assert_eq!(items(&services)[2].docker, Value::Value(true));
    }

    #[test]
    fn no_services_stays_null() {
        assert_eq!(service_blocks(&Value::Null, ClusterServices::new()), Value::Null);
        assert_eq!(
            service_blocks(&Value::Value(Vec::new()), ClusterServices::new()),
            Value::Value(Vec::new())
        );
    }

    #[test]
    fn services_become_a_map() {
        let body = cluster().request(true);
        assert_eq!(body.services.len(), 1);
        assert!(body.services["haproxy"].enabled);
        assert_eq!(body.servers[0].id, 1);
        assert!(body.reconfigure);
    }

    #[test]
    fn description_changes_skip_reconfigure() {
        let prior = cluster();
        let renamed = HaClusterState {
            description: Value::Value("edge pair".into()),
            ..prior.clone()
        };
        assert!(!renamed.needs_reconfigure(&prior));

        let moved = HaClusterState {
            vip: Value::Value("10.0.0.101".into()),
            ..prior.clone()
        };
        assert!(moved.needs_reconfigure(&prior));

        let shrunk = HaClusterState {
            servers: Value::Value(vec![member(1, true)]),
            ..prior.clone()
        };
        assert!(shrunk.needs_reconfigure(&prior));
    }

    #[test]
    fn cluster_validation() {
        let state = HaClusterState {
            vip: Value::Value("not-an-ip".into()),
            services: Value::Value(vec![ServiceBlock {
                name: Value::Value("squid".into()),
                ..ServiceBlock::default()
            }]),
            ..cluster()
        };
        let mut checks = Validator::new();
        HaCluster.validate(&state, &mut checks);
        let attrs: Vec<&str> = checks.violations().iter().map(|v| v.attribute.as_str()).collect();
        assert_eq!(attrs, ["vip", "services.name"]);
    }

    #[test]
    fn vip_ids() {
        assert_eq!(parse_vip_id("3-vip-12").unwrap(), ("3", "12"));
        assert!(parse_vip_id("3-12").is_err());
        assert!(parse_vip_id("3-vap-12").is_err());
        assert!(parse_vip_id("x-vip-12").is_err());
        assert!(HaClusterVip.import_state("3-vip-12").is_ok());
    }
}
