// NGINX upstream sections

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString, VariantNames};

use crate::client::RoxyClient;
use crate::error::Error;
use crate::wire;

const SERVICE: &str = "nginx";
const UPSTREAM: &str = "upstream";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr, VariantNames,
)]
#[strum(serialize_all = "snake_case")]
pub enum UpstreamBalance {
    RoundRobin,
    IpHash,
    LeastConn,
    Random,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamServer {
    #[serde(default, with = "wire::flex_string")]
    pub server: String,
    #[serde(default, with = "wire::flex_int")]
    pub port: i64,
    #[serde(default, with = "wire::flex_int")]
    pub max_fails: i64,
    #[serde(default, with = "wire::flex_int")]
    pub fail_timeout: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamSection {
    #[serde(default, with = "wire::flex_string")]
    pub name: String,
    #[serde(default, with = "wire::flex_string")]
    pub balance: String,
    #[serde(default, with = "wire::flex_int")]
    pub keepalive: i64,
    #[serde(default, with = "wire::flex_string")]
    pub action: String,
    #[serde(default, with = "wire::embedded_list")]
    pub backend_servers: Vec<UpstreamServer>,
}

impl RoxyClient {
    /// Returns the `"{server_id}-{name}"` ID.
    pub async fn create_nginx_upstream(
        &self,
        server_id: i64,
        upstream: &UpstreamSection,
    ) -> Result<String, Error> {
        self.create_section(SERVICE, server_id, UPSTREAM, upstream)
            .await
    }

    pub async fn get_nginx_upstream(&self, server_id: i64, name: &str) -> Result<UpstreamSection, Error> {
        self.get_section(SERVICE, server_id, UPSTREAM, Some(name))
            .await
    }

    pub async fn update_nginx_upstream(
        &self,
        server_id: i64,
        name: &str,
        upstream: &UpstreamSection,
    ) -> Result<(), Error> {
        self.put_section(SERVICE, server_id, UPSTREAM, Some(name), upstream)
            .await
    }

    pub async fn delete_nginx_upstream(&self, server_id: i64, name: &str) -> Result<(), Error> {
        self.delete_section(SERVICE, server_id, UPSTREAM, Some(name))
            .await
    }
}
