// Service installation endpoints

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString, VariantNames};
use tracing::{debug, info};

use crate::client::RoxyClient;
use crate::error::Error;
use crate::wire;

/// Services Roxy-WI can install on a managed server.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr, VariantNames,
)]
#[strum(serialize_all = "lowercase")]
pub enum Service {
    Haproxy,
    Nginx,
    Apache,
    Keepalived,
}

/// Install-time switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InstallOptions {
    #[serde(with = "wire::int_bool")]
    pub auto_start: bool,
    #[serde(with = "wire::int_bool")]
    pub checker: bool,
    #[serde(with = "wire::int_bool")]
    pub metrics: bool,
    #[serde(with = "wire::int_bool")]
    pub docker: bool,
}

/// `GET /api/service/{service}/{server_id}/install`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Installation {
    #[serde(default, with = "wire::flex_int")]
    pub server_id: i64,
    #[serde(default, with = "wire::flex_string")]
    pub service: String,
    #[serde(default, with = "wire::int_bool")]
    pub auto_start: bool,
    #[serde(default, with = "wire::int_bool")]
    pub checker: bool,
    #[serde(default, with = "wire::int_bool")]
    pub metrics: bool,
    #[serde(default, with = "wire::int_bool")]
    pub docker: bool,
}

fn install_path(service: Service, server_id: i64) -> String {
    format!("/api/service/{service}/{server_id}/install")
}

impl RoxyClient {
    /// Installs the service and returns the `"{server_id}-{service}"` ID.
    pub async fn install_service(
        &self,
        service: Service,
        server_id: i64,
        options: &InstallOptions,
    ) -> Result<String, Error> {
        info!(%service, server_id, "installing service");
        self.create(&install_path(service, server_id), options).await
    }

    pub async fn get_installation(&self, service: Service, server_id: i64) -> Result<Installation, Error> {
        self.get(&install_path(service, server_id)).await
    }

    pub async fn update_installation(
        &self,
        service: Service,
        server_id: i64,
        options: &InstallOptions,
    ) -> Result<(), Error> {
        debug!(%service, server_id, "updating service installation");
        let _: serde_json::Value = self.put(&install_path(service, server_id), options).await?;
        Ok(())
    }

    pub async fn uninstall_service(&self, service: Service, server_id: i64) -> Result<(), Error> {
        info!(%service, server_id, "removing service");
        self.delete(&install_path(service, server_id)).await
    }
}
