// Let's Encrypt certificate endpoints

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString, VariantNames};
use tracing::debug;

use crate::client::RoxyClient;
use crate::error::Error;
use crate::wire;

const PATH: &str = "/api/service/letsencrypt";

/// ACME challenge provider.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr, VariantNames,
)]
#[strum(serialize_all = "lowercase")]
pub enum ChallengeType {
    Standalone,
    Route53,
    Digitalocean,
    Cloudflare,
    Linode,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    #[serde(default, with = "wire::flex_int")]
    pub server_id: i64,
    #[serde(default, with = "wire::string_list")]
    pub domains: Vec<String>,
    #[serde(default, rename = "type", with = "wire::flex_string")]
    pub kind: String,
    #[serde(default, with = "wire::flex_string")]
    pub email: String,
    #[serde(default, with = "wire::flex_string")]
    pub api_key: String,
    #[serde(default, with = "wire::flex_string")]
    pub api_token: String,
    #[serde(default, with = "wire::flex_string")]
    pub description: String,
}

impl RoxyClient {
    pub async fn create_certificate(&self, cert: &Certificate) -> Result<String, Error> {
        debug!(server_id = cert.server_id, domains = ?cert.domains, "requesting certificate");
        self.create(PATH, cert).await
    }

    pub async fn get_certificate(&self, id: &str) -> Result<Certificate, Error> {
        self.get(&format!("{PATH}/{id}")).await
    }

    pub async fn update_certificate(&self, id: &str, cert: &Certificate) -> Result<(), Error> {
        let _: serde_json::Value = self.put(&format!("{PATH}/{id}"), cert).await?;
        Ok(())
    }

    pub async fn delete_certificate(&self, id: &str) -> Result<(), Error> {
        debug!(id, "deleting certificate");
        self.delete(&format!("{PATH}/{id}")).await
    }
}
