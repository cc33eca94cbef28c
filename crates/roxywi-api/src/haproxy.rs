// HAProxy configuration sections and white/black lists

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use strum::{AsRefStr, Display, EnumString, VariantNames};
use tracing::debug;

use crate::client::RoxyClient;
use crate::error::Error;
use crate::wire;

const SERVICE: &str = "haproxy";
const LIST_PATH: &str = "/api/service/haproxy/list";

/// Section kinds; the lowercase name is both the URL segment and `type`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr, VariantNames,
)]
#[strum(serialize_all = "lowercase")]
pub enum SectionKind {
    Global,
    Defaults,
    Backend,
    Frontend,
    Listen,
    Peers,
    Userlist,
}

impl SectionKind {
    /// Singletons have no name segment and are never created or removed.
    pub fn is_singleton(self) -> bool {
        matches!(self, Self::Global | Self::Defaults)
    }
}

/// What Roxy-WI does with the config after writing it.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, AsRefStr, VariantNames,
)]
#[strum(serialize_all = "lowercase")]
pub enum ConfigAction {
    #[default]
    Save,
    Reload,
    Restart,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, AsRefStr, VariantNames,
)]
#[strum(serialize_all = "lowercase")]
pub enum ProxyMode {
    #[default]
    Http,
    Tcp,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr, VariantNames,
)]
pub enum BalanceAlgorithm {
    #[strum(serialize = "roundrobin")]
    RoundRobin,
    #[strum(serialize = "source")]
    Source,
    #[strum(serialize = "leastconn")]
    LeastConn,
    #[strum(serialize = "first")]
    First,
    #[strum(serialize = "rdp-cookie")]
    RdpCookie,
    #[strum(serialize = "uri")]
    Uri,
    #[strum(serialize = "uri whole")]
    UriWhole,
    #[strum(serialize = "static-rr")]
    StaticRr,
    #[strum(serialize = "url_param userid")]
    UrlParamUserid,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr, VariantNames,
)]
#[strum(serialize_all = "kebab-case")]
pub enum HealthCheckType {
    TcpCheck,
    SslHelloChk,
    Httpchk,
    LdapCheck,
    MysqlCheck,
    PgsqlCheck,
    RedisCheck,
    Smtpchk,
}

impl HealthCheckType {
    /// Checks that speak HTTP or SMTP and cannot run on a `tcp` proxy.
    pub fn needs_http_mode(self) -> bool {
        matches!(self, Self::Httpchk | Self::Smtpchk)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr, VariantNames,
)]
#[strum(serialize_all = "kebab-case")]
pub enum HeaderPath {
    HttpResponse,
    HttpRequest,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr, VariantNames,
)]
#[strum(serialize_all = "kebab-case")]
pub enum HeaderMethod {
    AddHeader,
    SetHeader,
    DelHeader,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr, VariantNames,
)]
#[strum(serialize_all = "lowercase")]
pub enum ObserveLayer {
    Layer7,
    Layer4,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr, VariantNames,
)]
#[strum(serialize_all = "kebab-case")]
pub enum OnError {
    MarkDown,
    Fastinter,
    SuddenDeath,
    FailCheck,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr, VariantNames,
)]
#[strum(serialize_all = "lowercase")]
pub enum ListColor {
    White,
    Black,
}

// ── Section building blocks ─────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acl {
    #[serde(default, with = "wire::flex_int")]
    pub acl_if: i64,
    #[serde(default, with = "wire::flex_string")]
    pub acl_value: String,
    #[serde(default, with = "wire::flex_int")]
    pub acl_then: i64,
    #[serde(default, with = "wire::flex_string")]
    pub acl_then_value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendServer {
    #[serde(default, with = "wire::flex_string")]
    pub server: String,
    #[serde(default, with = "wire::flex_int")]
    pub port: i64,
    #[serde(default, with = "wire::flex_int")]
    pub port_check: i64,
    #[serde(default, with = "wire::flex_int")]
    pub maxconn: i64,
    #[serde(default, with = "wire::lenient_bool")]
    pub send_proxy: bool,
    #[serde(default, with = "wire::lenient_bool")]
    pub backup: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    #[serde(default, with = "wire::flex_string")]
    pub path: String,
    #[serde(default, with = "wire::flex_string")]
    pub method: String,
    #[serde(default, with = "wire::flex_string")]
    pub name: String,
    #[serde(default, with = "wire::flex_string")]
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bind {
    #[serde(default, with = "wire::flex_string")]
    pub ip: String,
    #[serde(default, with = "wire::flex_int")]
    pub port: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitBreaking {
    #[serde(default, with = "wire::flex_int")]
    pub error_limit: i64,
    #[serde(default, with = "wire::flex_string")]
    pub observe: String,
    #[serde(default, with = "wire::flex_string")]
    pub on_error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServersCheck {
    #[serde(default, with = "wire::flex_int")]
    pub fall: i64,
    #[serde(default, with = "wire::flex_int")]
    pub inter: i64,
    #[serde(default, with = "wire::flex_int")]
    pub rise: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SslSettings {
    #[serde(default, with = "wire::flex_string")]
    pub cert: String,
    #[serde(default, with = "wire::flex_int")]
    pub ssl_check_backend: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    #[serde(default, with = "wire::flex_string")]
    pub domain: String,
    #[serde(default, with = "wire::flex_string")]
    pub dynamic: String,
    #[serde(default, with = "wire::flex_string")]
    pub dynamic_key: String,
    #[serde(default, with = "wire::flex_string")]
    pub name: String,
    #[serde(default, with = "wire::flex_string")]
    pub nocache: String,
    #[serde(default, with = "wire::flex_string")]
    pub postonly: String,
    #[serde(default, with = "wire::flex_string")]
    pub prefix: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheck {
    #[serde(default, with = "wire::flex_string")]
    pub check: String,
    #[serde(default, with = "wire::flex_string")]
    pub domain: String,
    #[serde(default, with = "wire::flex_string")]
    pub path: String,
}

/// Timeouts of the `defaults` section, in seconds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeouts {
    #[serde(default, with = "wire::flex_int")]
    pub check: i64,
    #[serde(default, with = "wire::flex_int")]
    pub client: i64,
    #[serde(default, with = "wire::flex_int")]
    pub connect: i64,
    #[serde(default, with = "wire::flex_int")]
    pub http_keep_alive: i64,
    #[serde(default, with = "wire::flex_int")]
    pub http_request: i64,
    #[serde(default, with = "wire::flex_int")]
    pub queue: i64,
    #[serde(default, with = "wire::flex_int")]
    pub server: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peer {
    #[serde(default, with = "wire::flex_string")]
    pub name: String,
    #[serde(default, with = "wire::flex_string")]
    pub ip: String,
    #[serde(default, with = "wire::flex_int")]
    pub port: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserlistUser {
    #[serde(default, with = "wire::flex_string")]
    pub user: String,
    #[serde(default, with = "wire::flex_string")]
    pub password: String,
    #[serde(default, with = "wire::flex_string")]
    pub group: String,
}

// ── Sections ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalSection {
    #[serde(default, with = "wire::string_list")]
    pub log: Vec<String>,
    #[serde(default, with = "wire::string_list")]
    pub socket: Vec<String>,
    #[serde(default, with = "wire::flex_int")]
    pub maxconn: i64,
    #[serde(default, with = "wire::flex_string")]
    pub pidfile: String,
    #[serde(default, with = "wire::flex_string")]
    pub user: String,
    #[serde(default, with = "wire::flex_string")]
    pub group: String,
    #[serde(default, with = "wire::flex_string")]
    pub chroot: String,
    #[serde(default, with = "wire::lenient_bool")]
    pub daemon: bool,
    #[serde(default, with = "wire::flex_string")]
    pub option: String,
    #[serde(default, with = "wire::flex_string")]
    pub action: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultsSection {
    #[serde(default, with = "wire::flex_string")]
    pub log: String,
    #[serde(default, with = "wire::flex_int")]
    pub retries: i64,
    #[serde(default, with = "wire::flex_int")]
    pub maxconn: i64,
    #[serde(default, with = "wire::flex_string")]
    pub option: String,
    #[serde(default, with = "wire::flex_string")]
    pub action: String,
    #[serde(default, with = "wire::embedded_object", skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Timeouts>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendSection {
    #[serde(default, with = "wire::flex_string")]
    pub name: String,
    #[serde(default, with = "wire::flex_string")]
    pub mode: String,
    #[serde(default, with = "wire::flex_string")]
    pub balance: String,
    #[serde(default, with = "wire::flex_string")]
    pub action: String,
    #[serde(default, with = "wire::lenient_bool")]
    pub cache: bool,
    #[serde(default, with = "wire::lenient_bool")]
    pub compression: bool,
    #[serde(default, with = "wire::lenient_bool")]
    pub forward_for: bool,
    #[serde(default, with = "wire::lenient_bool")]
    pub ssl_offloading: bool,
    #[serde(default, with = "wire::lenient_bool")]
    pub redispatch: bool,
    #[serde(default, with = "wire::embedded_list")]
    pub acls: Vec<Acl>,
    #[serde(default, with = "wire::embedded_list")]
    pub backend_servers: Vec<BackendServer>,
    #[serde(default, with = "wire::embedded_list")]
    pub headers: Vec<Header>,
    #[serde(default, with = "wire::embedded_object", skip_serializing_if = "Option::is_none")]
    pub circuit_breaking: Option<CircuitBreaking>,
    #[serde(default, with = "wire::embedded_object", skip_serializing_if = "Option::is_none")]
    pub servers_check: Option<ServersCheck>,
    #[serde(default, with = "wire::embedded_object", skip_serializing_if = "Option::is_none")]
    pub ssl: Option<SslSettings>,
    #[serde(default, with = "wire::embedded_object", skip_serializing_if = "Option::is_none")]
    pub cookie: Option<Cookie>,
    #[serde(default, with = "wire::embedded_object", skip_serializing_if = "Option::is_none")]
    pub health_check: Option<HealthCheck>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontendSection {
    #[serde(default, with = "wire::flex_string")]
    pub name: String,
    #[serde(default, with = "wire::flex_string")]
    pub mode: String,
    #[serde(default, with = "wire::flex_string")]
    pub action: String,
    #[serde(default, with = "wire::flex_int")]
    pub maxconn: i64,
    /// Name of the default backend.
    #[serde(default, with = "wire::flex_string")]
    pub backends: String,
    #[serde(default, with = "wire::flex_string")]
    pub blacklist: String,
    #[serde(default, with = "wire::flex_string")]
    pub whitelist: String,
    #[serde(default, with = "wire::lenient_bool")]
    pub cache: bool,
    #[serde(default, with = "wire::lenient_bool")]
    pub compression: bool,
    #[serde(default, with = "wire::lenient_bool")]
    pub forward_for: bool,
    #[serde(default, with = "wire::lenient_bool")]
    pub ssl_offloading: bool,
    #[serde(default, with = "wire::lenient_bool")]
    pub slow_attack: bool,
    #[serde(default, with = "wire::lenient_bool")]
    pub antibot: bool,
    #[serde(default, with = "wire::lenient_bool")]
    pub ddos: bool,
    #[serde(default, with = "wire::lenient_bool")]
    pub waf: bool,
    #[serde(default, with = "wire::embedded_list")]
    pub binds: Vec<Bind>,
    #[serde(default, with = "wire::embedded_list")]
    pub acls: Vec<Acl>,
    #[serde(default, with = "wire::embedded_list")]
    pub headers: Vec<Header>,
    #[serde(default, with = "wire::embedded_object", skip_serializing_if = "Option::is_none")]
    pub ssl: Option<SslSettings>,
}

/// A frontend and backend in one block. Top-level switches go on the wire
/// as `1`/`0`, unlike the split sections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenSection {
    #[serde(default, with = "wire::flex_string")]
    pub name: String,
    #[serde(default, with = "wire::flex_string")]
    pub mode: String,
    #[serde(default, with = "wire::flex_string")]
    pub balance: String,
    #[serde(default, with = "wire::flex_string")]
    pub action: String,
    #[serde(default, with = "wire::flex_int")]
    pub maxconn: i64,
    #[serde(default, with = "wire::flex_string")]
    pub blacklist: String,
    #[serde(default, with = "wire::flex_string")]
    pub whitelist: String,
    #[serde(default, with = "wire::int_bool")]
    pub cache: bool,
    #[serde(default, with = "wire::int_bool")]
    pub compression: bool,
    #[serde(default, with = "wire::int_bool")]
    pub forward_for: bool,
    #[serde(default, with = "wire::int_bool")]
    pub ssl_offloading: bool,
    #[serde(default, with = "wire::int_bool")]
    pub redispatch: bool,
    #[serde(default, with = "wire::int_bool")]
    pub slow_attack: bool,
    #[serde(default, with = "wire::embedded_list")]
    pub binds: Vec<Bind>,
    #[serde(default, with = "wire::embedded_list")]
    pub backend_servers: Vec<BackendServer>,
    #[serde(default, with = "wire::embedded_list")]
    pub acls: Vec<Acl>,
    #[serde(default, with = "wire::embedded_list")]
    pub headers: Vec<Header>,
    #[serde(default, with = "wire::embedded_object", skip_serializing_if = "Option::is_none")]
    pub circuit_breaking: Option<CircuitBreaking>,
    #[serde(default, with = "wire::embedded_object", skip_serializing_if = "Option::is_none")]
    pub servers_check: Option<ServersCheck>,
    #[serde(default, with = "wire::embedded_object", skip_serializing_if = "Option::is_none")]
    pub ssl: Option<SslSettings>,
    #[serde(default, with = "wire::embedded_object", skip_serializing_if = "Option::is_none")]
    pub cookie: Option<Cookie>,
    #[serde(default, with = "wire::embedded_object", skip_serializing_if = "Option::is_none")]
    pub health_check: Option<HealthCheck>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeersSection {
    #[serde(default, with = "wire::flex_string")]
    pub name: String,
    #[serde(default, with = "wire::flex_string")]
    pub action: String,
    #[serde(default, with = "wire::embedded_list")]
    pub peers: Vec<Peer>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserlistSection {
    #[serde(default, with = "wire::flex_string")]
    pub name: String,
    #[serde(default, with = "wire::flex_string")]
    pub action: String,
    #[serde(default, with = "wire::string_list")]
    pub userlist_groups: Vec<String>,
    #[serde(default, with = "wire::embedded_list")]
    pub userlist_users: Vec<UserlistUser>,
}

/// A white or black list of source addresses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HaproxyList {
    #[serde(default, with = "wire::flex_string")]
    pub name: String,
    #[serde(default, with = "wire::flex_string")]
    pub color: String,
    #[serde(default, with = "wire::flex_string")]
    pub content: String,
    #[serde(default, with = "wire::flex_string")]
    pub server_ip: String,
    #[serde(default, with = "wire::flex_string")]
    pub action: String,
    #[serde(default, with = "wire::flex_int")]
    pub group_id: i64,
}

impl RoxyClient {
    // ── Singleton sections ───────────────────────────────────────────

    /// The global section always exists, so writing it is a `PUT`.
    pub async fn put_haproxy_global(&self, server_id: i64, section: &GlobalSection) -> Result<(), Error> {
        self.put_section(SERVICE, server_id, SectionKind::Global.as_ref(), None, section)
            .await
    }

    pub async fn get_haproxy_global(&self, server_id: i64) -> Result<GlobalSection, Error> {
        self.get_section(SERVICE, server_id, SectionKind::Global.as_ref(), None)
            .await
    }

    pub async fn delete_haproxy_global(&self, server_id: i64) -> Result<(), Error> {
        self.delete_section(SERVICE, server_id, SectionKind::Global.as_ref(), None)
            .await
    }

    pub async fn put_haproxy_defaults(
        &self,
        server_id: i64,
        section: &DefaultsSection,
    ) -> Result<(), Error> {
        self.put_section(SERVICE, server_id, SectionKind::Defaults.as_ref(), None, section)
            .await
    }

    pub async fn get_haproxy_defaults(&self, server_id: i64) -> Result<DefaultsSection, Error> {
        self.get_section(SERVICE, server_id, SectionKind::Defaults.as_ref(), None)
            .await
    }

    // ── Named sections ───────────────────────────────────────────────

    /// Creates a named section and returns its `"{server_id}-{name}"` ID.
    pub async fn create_haproxy_section<T: Serialize + Sync>(
        &self,
        server_id: i64,
        kind: SectionKind,
        section: &T,
    ) -> Result<String, Error> {
        self.create_section(SERVICE, server_id, kind.as_ref(), section)
            .await
    }

    pub async fn get_haproxy_section<T: serde::de::DeserializeOwned>(
        &self,
        server_id: i64,
        kind: SectionKind,
        name: &str,
    ) -> Result<T, Error> {
        self.get_section(SERVICE, server_id, kind.as_ref(), Some(name))
            .await
    }

    pub async fn update_haproxy_section<T: Serialize + Sync>(
        &self,
        server_id: i64,
        kind: SectionKind,
        name: &str,
        section: &T,
    ) -> Result<(), Error> {
        self.put_section(SERVICE, server_id, kind.as_ref(), Some(name), section)
            .await
    }

    pub async fn delete_haproxy_section(
        &self,
        server_id: i64,
        kind: SectionKind,
        name: &str,
    ) -> Result<(), Error> {
        self.delete_section(SERVICE, server_id, kind.as_ref(), Some(name))
            .await
    }

    // ── Lists ────────────────────────────────────────────────────────

    /// Returns the `"{group}-{color}-{name}"` ID.
    pub async fn create_haproxy_list(&self, list: &HaproxyList) -> Result<String, Error> {
        debug!(name = %list.name, color = %list.color, "creating haproxy list");
        self.create(LIST_PATH, list).await
    }

    pub async fn get_haproxy_list(&self, name: &str, color: &str) -> Result<HaproxyList, Error> {
        self.get(&format!("{LIST_PATH}/{name}/{color}")).await
    }

    pub async fn update_haproxy_list(&self, list: &HaproxyList) -> Result<(), Error> {
        debug!(name = %list.name, color = %list.color, "updating haproxy list");
        let _: Value = self.put(LIST_PATH, list).await?;
        Ok(())
    }

    pub async fn delete_haproxy_list(&self, name: &str, color: &str, group_id: i64) -> Result<(), Error> {
        debug!(name, color, "deleting haproxy list");
        self.delete_with_body(
            LIST_PATH,
            &json!({ "name": name, "color": color, "group_id": group_id }),
        )
        .await
    }
}
