// HA (keepalived) cluster and VIP endpoints

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::client::RoxyClient;
use crate::error::Error;
use crate::wire;

const CLUSTER_PATH: &str = "/api/ha/cluster";

/// A cluster member.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterServer {
    #[serde(default, with = "wire::flex_int")]
    pub id: i64,
    #[serde(default, with = "wire::int_bool")]
    pub master: bool,
    #[serde(default, with = "wire::flex_string")]
    pub eth: String,
}

/// Per-service switches, keyed by service name in [`ClusterServices`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceFlags {
    #[serde(default, with = "wire::int_bool")]
    pub enabled: bool,
    #[serde(default, with = "wire::int_bool")]
    pub docker: bool,
}

/// `{"haproxy": {"enabled": 1, "docker": 0}, ...}`, in the order the API
/// sent or will receive the keys.
pub type ClusterServices = IndexMap<String, ServiceFlags>;

/// Body for `POST`/`PUT /api/ha/cluster`, and its read-back shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HaCluster {
    #[serde(default, with = "wire::quoted_text")]
    pub name: String,
    #[serde(default, with = "wire::quoted_text")]
    pub description: String,
    #[serde(default, with = "wire::flex_string")]
    pub vip: String,
    #[serde(default, with = "wire::int_bool")]
    pub return_master: bool,
    #[serde(default, with = "wire::int_bool")]
    pub syn_flood: bool,
    #[serde(default, with = "wire::int_bool")]
    pub use_src: bool,
    #[serde(default, with = "wire::int_bool")]
    pub virt_server: bool,
    #[serde(default, with = "wire::embedded_list")]
    pub servers: Vec<ClusterServer>,
    #[serde(default, deserialize_with = "services_or_empty")]
    pub services: ClusterServices,
    /// Asks Roxy-WI to re-run keepalived configuration on the members.
    #[serde(default, skip_serializing_if = "std::ops::Not::not", skip_deserializing)]
    pub reconfigure: bool,
}

/// A secondary VIP on an existing cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterVip {
    #[serde(default, with = "wire::flex_int")]
    pub cluster_id: i64,
    #[serde(default, with = "wire::flex_string")]
    pub vip: String,
    #[serde(default, with = "wire::int_bool")]
    pub return_master: bool,
    #[serde(default, with = "wire::int_bool")]
    pub use_src: bool,
    #[serde(default, with = "wire::int_bool")]
    pub virt_server: bool,
    #[serde(default, with = "wire::embedded_list")]
    pub servers: Vec<ClusterServer>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not", skip_deserializing)]
    pub reconfigure: bool,
}

fn services_or_empty<'de, D>(deserializer: D) -> Result<ClusterServices, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error as _;

    match Value::deserialize(deserializer)? {
        Value::Null => Ok(ClusterServices::new()),
        Value::Array(items) if items.is_empty() => Ok(ClusterServices::new()),
        other => serde_json::from_value(other).map_err(D::Error::custom),
    }
}

impl RoxyClient {
    // ── Clusters ─────────────────────────────────────────────────────

    pub async fn create_ha_cluster(&self, cluster: &HaCluster) -> Result<String, Error> {
        debug!(name = %cluster.name, vip = %cluster.vip, "creating HA cluster");
        self.create(CLUSTER_PATH, cluster).await
    }

    pub async fn get_ha_cluster(&self, id: &str) -> Result<HaCluster, Error> {
        self.get(&format!("{CLUSTER_PATH}/{id}")).await
    }

    pub async fn update_ha_cluster(&self, id: &str, cluster: &HaCluster) -> Result<(), Error> {
        debug!(id, reconfigure = cluster.reconfigure, "updating HA cluster");
        let _: Value = self.put(&format!("{CLUSTER_PATH}/{id}"), cluster).await?;
        Ok(())
    }

    pub async fn delete_ha_cluster(&self, id: &str) -> Result<(), Error> {
        debug!(id, "deleting HA cluster");
        self.delete(&format!("{CLUSTER_PATH}/{id}")).await
    }

    // ── VIPs ─────────────────────────────────────────────────────────

    pub async fn create_cluster_vip(&self, vip: &ClusterVip) -> Result<String, Error> {
        debug!(cluster_id = vip.cluster_id, vip = %vip.vip, "adding cluster VIP");
        self.create(&format!("{CLUSTER_PATH}/{}/vip", vip.cluster_id), vip)
            .await
    }

    pub async fn get_cluster_vip(&self, cluster_id: &str, vip_id: &str) -> Result<ClusterVip, Error> {
        self.get(&format!("{CLUSTER_PATH}/{cluster_id}/vip/{vip_id}"))
            .await
    }

    pub async fn update_cluster_vip(
        &self,
        cluster_id: &str,
        vip_id: &str,
        vip: &ClusterVip,
    ) -> Result<(), Error> {
        debug!(cluster_id, vip_id, "updating cluster VIP");
        let _: Value = self
            .put(&format!("{CLUSTER_PATH}/{cluster_id}/vip/{vip_id}"), vip)
            .await?;
        Ok(())
    }

    pub async fn delete_cluster_vip(&self, cluster_id: &str, vip_id: &str) -> Result<(), Error> {
        debug!(cluster_id, vip_id, "deleting cluster VIP");
        self.delete(&format!("{CLUSTER_PATH}/{cluster_id}/vip/{vip_id}"))
            .await
    }
}
