// Server endpoints
//
// A server is a managed host (HAProxy/Nginx/Keepalived node) reachable
// over SSH with a stored credential.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::RoxyClient;
use crate::error::Error;
use crate::wire;

/// A managed server. The same shape is sent and received.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    #[serde(default, with = "wire::quoted_text")]
    pub hostname: String,
    #[serde(default, with = "wire::flex_string")]
    pub ip: String,
    #[serde(default, with = "wire::flex_int")]
    pub port: i64,
    #[serde(default, with = "wire::flex_int")]
    pub group_id: i64,
    #[serde(default, with = "wire::flex_int")]
    pub cred_id: i64,
    #[serde(default, with = "wire::int_bool")]
    pub enabled: bool,
    #[serde(default, with = "wire::quoted_text")]
    pub description: String,
}

impl RoxyClient {
    /// `POST /api/server`
    pub async fn create_server(&self, server: &Server) -> Result<String, Error> {
        debug!(hostname = %server.hostname, ip = %server.ip, "creating server");
        self.create("/api/server", server).await
    }

    /// `GET /api/server/{id}`
    pub async fn get_server(&self, id: &str) -> Result<Server, Error> {
        self.get(&format!("/api/server/{id}")).await
    }

    /// `PUT /api/server/{id}`
    pub async fn update_server(&self, id: &str, server: &Server) -> Result<(), Error> {
        debug!(id, "updating server");
        let _: serde_json::Value = self.put(&format!("/api/server/{id}"), server).await?;
        Ok(())
    }

    /// `DELETE /api/server/{id}`
    pub async fn delete_server(&self, id: &str) -> Result<(), Error> {
        debug!(id, "deleting server");
        self.delete(&format!("/api/server/{id}")).await
    }

    /// `GET /api/server/{id}/ip` -- addresses configured on the host.
    pub async fn list_server_ips(&self, server_id: i64) -> Result<Vec<String>, Error> {
        let raw: serde_json::Value = self.get(&format!("/api/server/{server_id}/ip")).await?;
        Ok(wire::parse_embedded(&raw)?
            .iter()
            .map(wire::string_from_value)
            .collect())
    }
}
