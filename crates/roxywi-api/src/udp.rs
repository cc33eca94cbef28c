// UDP (LVS) listener endpoints

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use strum::{AsRefStr, Display, EnumString, VariantNames};
use tracing::debug;

use crate::client::RoxyClient;
use crate::error::Error;
use crate::wire;

const LISTENER_PATH: &str = "/api/udp/listener";

/// IPVS scheduling algorithms.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr, VariantNames,
)]
#[strum(serialize_all = "lowercase")]
pub enum LbAlgorithm {
    Rr,
    Wrr,
    Lc,
    Wlc,
    Sh,
    Dh,
    Lblc,
}

/// One real server behind the listener.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UdpBackend {
    #[serde(default, with = "wire::flex_string")]
    pub backend_ip: String,
    #[serde(default, with = "wire::flex_int")]
    pub port: i64,
    #[serde(default, with = "wire::flex_int")]
    pub weight: i64,
}

/// Body for `POST`/`PUT /api/udp/listener`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UdpListenerRequest {
    pub cluster_id: i64,
    pub server_id: i64,
    pub config: Vec<UdpBackend>,
    #[serde(with = "wire::quoted_text")]
    pub description: String,
    pub group_id: String,
    pub lb_algo: String,
    #[serde(with = "wire::quoted_text")]
    pub name: String,
    pub port: String,
    pub vip: String,
}

/// The owning group, expanded by the API on read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ListenerGroup {
    #[serde(default, with = "wire::flex_int")]
    pub group_id: i64,
    #[serde(default, with = "wire::flex_string")]
    pub name: String,
    #[serde(default, with = "wire::flex_string")]
    pub description: String,
}

/// A listener as returned by `GET /api/udp/listener/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UdpListener {
    #[serde(default, with = "wire::flex_int")]
    pub cluster_id: i64,
    #[serde(default, with = "wire::flex_int")]
    pub server_id: i64,
    #[serde(default, with = "wire::embedded_list")]
    pub config: Vec<UdpBackend>,
    #[serde(default, with = "wire::quoted_text")]
    pub description: String,
    #[serde(default, rename = "group_id", deserialize_with = "listener_group")]
    pub group: Option<ListenerGroup>,
    #[serde(default, with = "wire::flex_string")]
    pub lb_algo: String,
    #[serde(default, with = "wire::quoted_text")]
    pub name: String,
    #[serde(default, with = "wire::flex_int")]
    pub port: i64,
    #[serde(default, with = "wire::flex_string")]
    pub vip: String,
    #[serde(default, with = "wire::flex_int")]
    pub check_enabled: i64,
    #[serde(default, with = "wire::flex_int")]
    pub delay_loop: i64,
    #[serde(default, with = "wire::flex_int")]
    pub delay_before_retry: i64,
    #[serde(default, with = "wire::flex_int")]
    pub retry: i64,
}

impl UdpListener {
    /// Group ID as a string; empty when the API returned none.
    pub fn group_id(&self) -> String {
        self.group
            .as_ref()
            .map(|g| g.group_id.to_string())
            .unwrap_or_default()
    }
}

/// `group_id` arrives either as a bare ID or as the expanded group object.
fn listener_group<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<ListenerGroup>, D::Error> {
    use serde::de::Error as _;

    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        obj @ Value::Object(_) => serde_json::from_value(obj).map(Some).map_err(D::Error::custom),
        scalar => Ok(wire::id_from_value(&scalar).map(|id| ListenerGroup {
            group_id: id.parse().unwrap_or_default(),
            ..ListenerGroup::default()
        })),
    }
}

/// An entry of `GET /api/ha/cluster/{id}/vips`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ClusterVipEntry {
    #[serde(default, with = "wire::flex_string")]
    pub vip: String,
}

impl RoxyClient {
    pub async fn create_udp_listener(&self, listener: &UdpListenerRequest) -> Result<String, Error> {
        debug!(name = %listener.name, vip = %listener.vip, "creating udp listener");
        self.create(LISTENER_PATH, listener).await
    }

    pub async fn get_udp_listener(&self, id: &str) -> Result<UdpListener, Error> {
        self.get(&format!("{LISTENER_PATH}/{id}")).await
    }

    pub async fn update_udp_listener(
        &self,
        id: &str,
        listener: &UdpListenerRequest,
    ) -> Result<(), Error> {
        debug!(id, "updating udp listener");
        let _: Value = self.put(&format!("{LISTENER_PATH}/{id}"), listener).await?;
        Ok(())
    }

    pub async fn delete_udp_listener(&self, id: &str) -> Result<(), Error> {
        debug!(id, "deleting udp listener");
        self.delete(&format!("{LISTENER_PATH}/{id}")).await
    }

    /// `GET /api/ha/cluster/{cluster_id}/vips`
    pub async fn list_cluster_vips(&self, cluster_id: i64) -> Result<Vec<String>, Error> {
        let entries: Vec<ClusterVipEntry> =
            self.get(&format!("/api/ha/cluster/{cluster_id}/vips")).await?;
        Ok(entries.into_iter().map(|e| e.vip).collect())
    }

    /// A listener's VIP must already be bound, either on an HA cluster or
    /// on a standalone server. The cluster wins when both are set.
    pub async fn ensure_vip_exists(
        &self,
        cluster_id: i64,
        server_id: i64,
        vip: &str,
    ) -> Result<(), Error> {
        let known = if cluster_id != 0 {
            self.list_cluster_vips(cluster_id).await?
        } else if server_id != 0 {
            self.list_server_ips(server_id).await?
        } else {
            return Err(Error::InvalidRequest(
                "either cluster_id or server_id must be specified".into(),
            ));
        };
        debug!(vip, candidates = known.len(), "checking VIP");
        if known.iter().any(|candidate| candidate == vip) {
            Ok(())
        } else {
            Err(Error::Empty {
                what: format!("VIP {vip}"),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn group_object_is_expanded() {
        let listener: UdpListener = serde_json::from_value(json!({
            "name": "dns",
            "group_id": {"group_id": 3, "name": "edge", "description": "edge"},
            "config": "[{'backend_ip': '10.0.0.5', 'port': 53, 'weight': 1}]",
            "port": "53",
        }))
        .unwrap();
        assert_eq!(listener.group_id(), "3");
        assert_eq!(listener.port, 53);
        assert_eq!(listener.config.len(), 1);
        assert_eq!(listener.config[0].backend_ip, "10.0.0.5");
    }

    #[test]
    fn scalar_group_is_accepted() {
        let listener: UdpListener = serde_json::from_value(json!({"group_id": "7"})).unwrap();
        assert_eq!(listener.group_id(), "7");
        let listener: UdpListener = serde_json::from_value(json!({"group_id": null})).unwrap();
        assert_eq!(listener.group_id(), "");
    }
}
