use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_provider::schema::Schema;
use tf_provider::value::{Value, ValueEmpty};
use tf_provider::{AttributePath, Diagnostics, DynamicDataSource, DynamicResource, Provider, map};
use tracing::info;

use roxywi_api::RoxyClient;
use roxywi_config::{ConfigError, ProviderBlock};

use crate::data_sources;
use crate::resource::ApiResource;
use crate::resources;
use crate::schema::{block, bool, number, optional, sensitive, string};
use crate::value::known;

/// The client built by `configure`, shared by every resource and data source.
pub type SharedClient = Arc<ArcSwapOption<RoxyClient>>;

/// The `provider "roxywi"` block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub login: Value<String>,
    pub password: Value<String>,
    pub base_url: Value<String>,
    pub insecure: Value<bool>,
    pub timeout: Value<i64>,
}

impl ProviderConfig {
    /// Unknown and null attributes fall through to the environment.
    fn to_block(&self) -> ProviderBlock {
        ProviderBlock {
            login: known(&self.login).cloned(),
            password: known(&self.password).cloned(),
            base_url: known(&self.base_url).cloned(),
            insecure: known(&self.insecure).copied(),
            timeout: known(&self.timeout).and_then(|t| u64::try_from(*t).ok()),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct RoxyProvider {
    client: SharedClient,
}

impl RoxyProvider {
    fn resource<K: crate::resource::ResourceKind>(&self, kind: K) -> ApiResource<K> {
        ApiResource::new(kind, Arc::clone(&self.client))
    }
}

fn report_config_error(diags: &mut Diagnostics, err: &ConfigError) {
    match err.field() {
        Some(field) => diags.error(
            "Invalid provider configuration".to_owned(),
            err.to_string(),
            AttributePath::new(field),
        ),
        None => diags.root_error("Invalid provider configuration".to_owned(), err.to_string()),
    }
}

#[async_trait]
impl Provider for RoxyProvider {
    type Config<'a> = ProviderConfig;
    type MetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(Schema {
            version: 1,
            block: block(
                "Manage Roxy-WI servers, HAProxy/NGINX configuration and HA clusters",
                map! {
                    "login" => optional(string(), "Login name. Falls back to ROXYWI_USERNAME"),
                    "password" => sensitive(optional(string(), "Password. Falls back to ROXYWI_PASSWORD")),
                    "base_url" => optional(string(), "Roxy-WI URL. Falls back to ROXYWI_BASE_URL, then https://demo.roxy-wi.org"),
                    "insecure" => optional(bool(), "Accept invalid TLS certificates"),
                    "timeout" => optional(number(), "Request timeout in seconds (default 30)"),
                },
            ),
        })
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::Config<'a>) -> Option<()> {
        if let Some(timeout) = known(&config.timeout) {
            if *timeout <= 0 {
                diags.error(
                    "Invalid provider configuration".to_owned(),
                    "timeout must be at least one second".to_owned(),
                    AttributePath::new("timeout"),
                );
                return None;
            }
        }
        Some(())
    }

    async fn configure<'a>(
        &self,
        diags: &mut Diagnostics,
        terraform_version: String,
        config: Self::Config<'a>,
    ) -> Option<()> {
        let settings = match roxywi_config::resolve(&config.to_block()) {
            Ok(settings) => settings,
            Err(e) => {
                report_config_error(diags, &e);
                return None;
            }
        };

        let transport = settings.transport(Some(&terraform_version));
        let client = match RoxyClient::connect(
            settings.base_url.as_str(),
            &transport,
            &settings.login,
            &settings.password,
        )
        .await
        {
            Ok(client) => client,
            Err(e) => {
                diags.root_error("Unable to create Roxy-WI client".to_owned(), e.to_string());
                return None;
            }
        };

        info!(base_url = %settings.base_url, login = %settings.login, "connected to Roxy-WI");
        self.client.store(Some(Arc::new(client)));
        Some(())
    }

    fn get_resources(
        &self,
        _diags: &mut Diagnostics,
    ) -> Option<HashMap<String, Box<dyn DynamicResource>>> {
        use resources::{backup, channel, group, ha_cluster, haproxy, letsencrypt, nginx, server};
        use resources::{service_installation, ssh_credential, udp_listener, user, user_role_binding};

        Some(map! {
            "group" => self.resource(group::Group),
            "server" => self.resource(server::Server),
            "ssh_credential" => self.resource(ssh_credential::SshCredential),
            "user" => self.resource(user::User),
            "user_role_binding" => self.resource(user_role_binding::UserRoleBinding),
            "channel" => self.resource(channel::Channel),
            "backup_fs" => self.resource(backup::FsBackup),
            "backup_s3" => self.resource(backup::S3Backup),
            "backup_git" => self.resource(backup::GitBackup),
            "udp_listener" => self.resource(udp_listener::UdpListener),
            "ha_cluster" => self.resource(ha_cluster::HaCluster),
            "ha_cluster_vip" => self.resource(ha_cluster::HaClusterVip),
            "service_installation" => self.resource(service_installation::ServiceInstallation),
            "haproxy_section_global" => self.resource(haproxy::global::GlobalSection),
            "haproxy_section_defaults" => self.resource(haproxy::defaults::DefaultsSection),
            "haproxy_section_backend" => self.resource(haproxy::backend::BackendSection),
            "haproxy_section_frontend" => self.resource(haproxy::frontend::FrontendSection),
            "haproxy_section_listen" => self.resource(haproxy::listen::ListenSection),
            "haproxy_section_peers" => self.resource(haproxy::peers::PeersSection),
            "haproxy_section_userlist" => self.resource(haproxy::userlist::UserlistSection),
            "haproxy_list" => self.resource(haproxy::list::HaproxyList),
            "nginx_section_upstream" => self.resource(nginx::NginxUpstream),
            "letsencrypt" => self.resource(letsencrypt::Letsencrypt),
        })
    }

    fn get_data_sources(
        &self,
        _diags: &mut Diagnostics,
    ) -> Option<HashMap<String, Box<dyn DynamicDataSource>>> {
        Some(map! {
            "group" => data_sources::group::GroupDataSource::new(Arc::clone(&self.client)),
            "udp_listener" => data_sources::udp_listener::UdpListenerDataSource::new(Arc::clone(&self.client)),
            "user_role" => data_sources::user_role::UserRoleDataSource::new(Arc::clone(&self.client)),
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn unknown_attributes_fall_through() {
        let config = ProviderConfig {
            login: Value::Value("admin".into()),
            password: Value::Unknown,
            timeout: Value::Value(-5),
            ..ProviderConfig::default()
        };
        let block = config.to_block();
        assert_eq!(block.login.as_deref(), Some("admin"));
        assert_eq!(block.password, None);
        assert_eq!(block.base_url, None);
        assert_eq!(block.timeout, None);
    }

    #[test]
    fn registers_every_resource() {
        let provider = RoxyProvider::default();
        let mut diags = Diagnostics::default();
        let resources = provider.get_resources(&mut diags).unwrap();
        assert_eq!(resources.len(), 23);
        assert!(resources.contains_key("haproxy_section_backend"));
        let data_sources = provider.get_data_sources(&mut diags).unwrap();
        assert_eq!(data_sources.len(), 3);
    }
}
