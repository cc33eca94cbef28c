// Installing a managed service on a server.
//
// State ID: "{server_id}-{service}".

use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::VariantNames;
use tf_provider::map;
use tf_provider::schema::Block;
use tf_provider::value::Value;

use roxywi_api::RoxyClient;
use roxywi_api::services::{InstallOptions, Service};

use crate::error::ProviderError;
use crate::resource::{ResourceKind, changed};
use crate::schema::{block, bool, defaulted, number, required, string};
use crate::validate::Validator;
use crate::value::{Flag, Int, Str, as_str, default_to, flag, id_number, int, split_id};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceInstallationState {
    pub id: Str,
    pub service: Str,
    pub server_id: Int,
    pub auto_start: Flag,
    pub checker: Flag,
    pub metrics: Flag,
    pub docker: Flag,
}

impl ServiceInstallationState {
    fn options(&self) -> InstallOptions {
        InstallOptions {
            auto_start: flag(&self.auto_start),
            checker: flag(&self.checker),
            metrics: flag(&self.metrics),
            docker: flag(&self.docker),
        }
    }
}

fn parse_id(id: &str) -> Result<(i64, Service), ProviderError> {
    let parts = split_id(id, 2)?;
    let server_id = id_number(id, parts[0])?;
    let service = Service::from_str(parts[1]).map_err(|_| ProviderError::InvalidId(id.to_owned()))?;
    Ok((server_id, service))
}

pub struct ServiceInstallation;

#[async_trait]
impl ResourceKind for ServiceInstallation {
    type State = ServiceInstallationState;
    const NAME: &'static str = "roxywi_service_installation";

    fn schema(&self) -> Block {
        block(
            "Installs HAProxy, NGINX, Apache or Keepalived on a managed server",
            map! {
                "service" => required(string(), "haproxy, nginx, apache or keepalived. Changing it reinstalls"),
                "server_id" => required(number(), "Target server. Changing it reinstalls"),
                "auto_start" => defaulted(bool(), "Start the service on boot"),
                "checker" => defaulted(bool(), "Enable the Roxy-WI availability checker"),
                "metrics" => defaulted(bool(), "Collect metrics"),
                "docker" => defaulted(bool(), "Run the service in Docker"),
            },
        )
    }

    fn validate(&self, state: &ServiceInstallationState, checks: &mut Validator) {
        checks.one_of("service", &state.service, Service::VARIANTS);
    }

    fn apply_defaults(&self, state: &mut ServiceInstallationState) {
        default_to(&mut state.auto_start, false);
        default_to(&mut state.checker, false);
        default_to(&mut state.metrics, false);
        default_to(&mut state.docker, false);
    }

    fn id<'s>(&self, state: &'s ServiceInstallationState) -> &'s Str {
        &state.id
    }

    fn set_id(&self, state: &mut ServiceInstallationState, id: Str) {
        state.id = id;
    }

    fn replaced_fields(
        &self,
        prior: &ServiceInstallationState,
        proposed: &ServiceInstallationState,
    ) -> Vec<&'static str> {
        let mut out = Vec::new();
        changed("service", &prior.service, &proposed.service, &mut out);
        changed("server_id", &prior.server_id, &proposed.server_id, &mut out);
        out
    }

    async fn create(&self, client: &RoxyClient, plan: &ServiceInstallationState) -> Result<String, ProviderError> {
        let raw = as_str(&plan.service);
        let service =
            Service::from_str(raw).map_err(|_| ProviderError::Invalid(format!("unsupported service: {raw}")))?;
        Ok(client
            .install_service(service, int(&plan.server_id), &plan.options())
            .await?)
    }

    async fn read(
        &self,
        client: &RoxyClient,
        id: &str,
        prior: &ServiceInstallationState,
    ) -> Result<Option<ServiceInstallationState>, ProviderError> {
        let (server_id, service) = parse_id(id)?;
        let installed = client.get_installation(service, server_id).await?;
        Ok(Some(ServiceInstallationState {
            id: prior.id.clone(),
            service: Value::Value(service.to_string()),
            server_id: Value::Value(server_id),
            auto_start: Value::Value(installed.auto_start),
            checker: Value::Value(installed.checker),
            metrics: Value::Value(installed.metrics),
            docker: Value::Value(installed.docker),
        }))
    }

    async fn update(
        &self,
        client: &RoxyClient,
        id: &str,
        _prior: &ServiceInstallationState,
        plan: &ServiceInstallationState,
    ) -> Result<(), ProviderError> {
        let (server_id, service) = parse_id(id)?;
        Ok(client
            .update_installation(service, server_id, &plan.options())
            .await?)
    }

    async fn delete(&self, client: &RoxyClient, id: &str, _state: &ServiceInstallationState) -> Result<(), ProviderError> {
        let (server_id, service) = parse_id(id)?;
        Ok(client.uninstall_service(service, server_id).await?)
    }

    fn import_state(&self, id: &str) -> Result<ServiceInstallationState, ProviderError> {
        parse_id(id)?;
        Ok(ServiceInstallationState {
            id: Value::Value(id.to_owned()),
            ..ServiceInstallationState::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_names_server_and_service() {
        assert_eq!(parse_id("5-haproxy").unwrap(), (5, Service::Haproxy));
        assert_eq!(parse_id("5-keepalived").unwrap(), (5, Service::Keepalived));
        assert!(parse_id("5-squid").is_err());
        assert!(parse_id("haproxy").is_err());
    }

    #[test]
    fn switches_default_off() {
        let mut state = ServiceInstallationState {
            metrics: Value::Value(true),
            ..ServiceInstallationState::default()
        };
        ServiceInstallation.apply_defaults(&mut state);
        let options = state.options();
        assert!(options.metrics);
        assert!(!options.auto_start);
        assert_eq!(state.docker, Value::Value(false));
    }

    #[test]
    fn moving_servers_reinstalls() {
        let prior = ServiceInstallationState {
            service: Value::Value("nginx".into()),
            server_id: Value::Value(1),
            ..ServiceInstallationState::default()
        };
        let proposed = ServiceInstallationState {
            server_id: Value::Value(2),
            ..prior.clone()
        };
        assert_eq!(ServiceInstallation.replaced_fields(&prior, &proposed), ["server_id"]);
    }
}
