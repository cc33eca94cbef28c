// Nested blocks shared by the backend, frontend and listen sections,
// plus the ID and `action` plumbing every HAProxy section uses.

use serde::{Deserialize, Serialize};
use strum::VariantNames;
use tf_provider::map;
use tf_provider::schema::{Attribute, Block};
use tf_provider::value::Value;

use roxywi_api::haproxy::{
    Acl, BackendServer, Bind, CircuitBreaking, ConfigAction, Cookie, Header, HeaderMethod, HeaderPath,
    HealthCheck, HealthCheckType, ObserveLayer, OnError, ProxyMode, ServersCheck, SslSettings,
};

use crate::error::ProviderError;
use crate::schema::{self, block, bool, defaulted, number, optional, required, string};
use crate::validate::Validator;
use crate::value::{
    Blocks, Flag, Int, Str, as_str, default_to, flag, id_number, int, items, items_mut, non_empty, non_zero, split_id, text,
};

// ── Section IDs and actions ─────────────────────────────────────────

/// `(server_id, name)` from `"{server_id}-{name}"`; the name keeps any dashes.
pub(crate) fn parse_section_id(id: &str) -> Result<(i64, &str), ProviderError> {
    let parts = split_id(id, 2)?;
    Ok((id_number(id, parts[0])?, parts[1]))
}

pub(crate) fn action_attribute() -> Attribute {
    defaulted(string(), schema::ACTION)
}

pub(crate) fn check_action(checks: &mut Validator, action: &Str) {
    checks.one_of("action", action, ConfigAction::VARIANTS);
}

pub(crate) fn default_action(action: &mut Str) {
    default_to(action, ConfigAction::default().to_string());
}

pub(crate) fn check_mode(checks: &mut Validator, mode: &Str) {
    checks.one_of("mode", mode, ProxyMode::VARIANTS);
}

pub(crate) fn is_tcp(mode: &Str) -> bool {
    as_str(mode) == ProxyMode::Tcp.as_ref()
}

/// Blocks a user set in config, mapped through `From`.
pub(crate) fn wire<'a, B: 'a, W: From<&'a B>>(list: &'a Blocks<B>) -> Vec<W> {
    items(list).iter().map(W::from).collect()
}

/// First element of a single-element set, mapped through `From`.
pub(crate) fn wire_one<'a, B: 'a, W: From<&'a B>>(set: &'a Blocks<B>) -> Option<W> {
    items(set).first().map(W::from)
}

pub(crate) fn blocks<W, B: From<W>>(list: Vec<W>) -> Blocks<B> {
    Value::Value(list.into_iter().map(B::from).collect())
}

pub(crate) fn block_one<W, B: From<W>>(item: Option<W>) -> Blocks<B> {
    Value::Value(item.map(B::from).into_iter().collect())
}

// ── HTTP-only settings ──────────────────────────────────────────────

/// HTTP-only settings of a proxy section, rejected in `tcp` mode.
#[derive(Default)]
pub(crate) struct HttpOnly<'a> {
    pub switches: Vec<(&'static str, &'a Flag)>,
    pub headers: Option<&'a Blocks<HeaderBlock>>,
    pub cookie: Option<&'a Blocks<CookieBlock>>,
    pub servers: Option<&'a Blocks<BackendServerBlock>>,
    pub health_check: Option<&'a Blocks<HealthCheckBlock>>,
}

impl HttpOnly<'_> {
    pub(crate) fn check(&self, checks: &mut Validator, mode: &Str) {
        if !is_tcp(mode) {
            return;
        }
        let tcp = |checks: &mut Validator, attribute: &str| {
            checks.reject(attribute, format!("{attribute} cannot be used in tcp mode"));
        };
        for &(name, switch) in &self.switches {
            if flag(switch) {
                tcp(checks, name);
            }
        }
        if self.headers.is_some_and(|h| !items(h).is_empty()) {
            tcp(checks, "headers");
        }
        if self.cookie.is_some_and(|c| !items(c).is_empty()) {
            tcp(checks, "cookie");
        }
        if let Some(servers) = self.servers {
            if items(servers).iter().any(|s| flag(&s.send_proxy)) {
                tcp(checks, "backend_servers.send_proxy");
            }
        }
        if let Some(health_check) = self.health_check.and_then(|h| items(h).first()) {
            let needs_http = as_str(&health_check.check)
                .parse::<HealthCheckType>()
                .is_ok_and(HealthCheckType::needs_http_mode);
            if needs_http {
                checks.reject(
                    "health_check.check",
                    format!("{} health checks cannot be used in tcp mode", as_str(&health_check.check)),
                );
            }
        }
    }
}

// ── ACLs ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AclBlock {
    pub acl_if: Int,
    pub acl_value: Str,
    pub acl_then: Int,
    pub acl_then_value: Str,
}

impl From<&AclBlock> for Acl {
    fn from(a: &AclBlock) -> Self {
        Self {
            acl_if: int(&a.acl_if),
            acl_value: text(&a.acl_value),
            acl_then: int(&a.acl_then),
            acl_then_value: text(&a.acl_then_value),
        }
    }
}

impl From<Acl> for AclBlock {
    fn from(a: Acl) -> Self {
        Self {
            acl_if: Value::Value(a.acl_if),
            acl_value: Value::Value(a.acl_value),
            acl_then: Value::Value(a.acl_then),
            acl_then_value: non_empty(a.acl_then_value),
        }
    }
}

pub(crate) fn acl_block() -> Block {
    block(
        "An ACL rule",
        map! {
            "acl_if" => required(number(), "Condition kind, 1 to 6"),
            "acl_value" => required(string(), "Condition argument"),
            "acl_then" => required(number(), "Action kind, 2 to 5"),
            "acl_then_value" => optional(string(), "Action argument"),
        },
    )
}

pub(crate) fn check_acls(checks: &mut Validator, acls: &Blocks<AclBlock>) {
    for acl in items(acls) {
        checks.int_between("acls.acl_if", &acl.acl_if, 1..=6);
        checks.int_between("acls.acl_then", &acl.acl_then, 2..=5);
    }
}

// ── Backend servers ─────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendServerBlock {
    pub server: Str,
    pub port: Int,
    pub port_check: Int,
    pub maxconn: Int,
    pub send_proxy: Flag,
    pub backup: Flag,
}

impl From<&BackendServerBlock> for BackendServer {
    fn from(s: &BackendServerBlock) -> Self {
        Self {
            server: text(&s.server),
            port: int(&s.port),
            port_check: int(&s.port_check),
            maxconn: int(&s.maxconn),
            send_proxy: flag(&s.send_proxy),
            backup: flag(&s.backup),
        }
    }
}

impl From<BackendServer> for BackendServerBlock {
    fn from(s: BackendServer) -> Self {
        Self {
            server: Value::Value(s.server),
            port: Value::Value(s.port),
            port_check: Value::Value(s.port_check),
            maxconn: Value::Value(s.maxconn),
            send_proxy: Value::Value(s.send_proxy),
            backup: Value::Value(s.backup),
        }
    }
}

pub(crate) fn backend_server_block(default_maxconn: i64) -> Block {
    block(
        "A server traffic is balanced to",
        map! {
            "server" => required(string(), "Address of the server"),
            "port" => required(number(), "Traffic port"),
            "port_check" => required(number(), "Health check port"),
            "maxconn" => defaulted(number(), &format!("Connection limit, default {default_maxconn}")),
            "send_proxy" => defaulted(bool(), "Send the PROXY protocol header"),
            "backup" => defaulted(bool(), "Only used when all other servers are down"),
        },
    )
}

pub(crate) fn check_backend_servers(checks: &mut Validator, servers: &Blocks<BackendServerBlock>) {
    for server in items(servers) {
        checks.port("backend_servers.port", &server.port);
        checks.port("backend_servers.port_check", &server.port_check);
    }
}

pub(crate) fn default_backend_servers(servers: &mut Blocks<BackendServerBlock>, maxconn: i64) {
    for server in items_mut(servers) {
        default_to(&mut server.maxconn, maxconn);
        default_to(&mut server.send_proxy, false);
        default_to(&mut server.backup, false);
    }
}

// ── Headers ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderBlock {
    pub path: Str,
    pub method: Str,
    pub name: Str,
    pub value: Str,
}

impl From<&HeaderBlock> for Header {
    fn from(h: &HeaderBlock) -> Self {
        Self {
            path: text(&h.path),
            method: text(&h.method),
            name: text(&h.name),
            value: text(&h.value),
        }
    }
}

impl From<Header> for HeaderBlock {
    fn from(h: Header) -> Self {
        Self {
            path: Value::Value(h.path),
            method: Value::Value(h.method),
            name: Value::Value(h.name),
            value: Value::Value(h.value),
        }
    }
}

pub(crate) fn header_block() -> Block {
    block(
        "An HTTP header rewrite",
        map! {
            "path" => required(string(), "http-response or http-request"),
            "method" => required(string(), "add-header, set-header or del-header"),
            "name" => required(string(), "Header name"),
            "value" => required(string(), "Header value"),
        },
    )
}

pub(crate) fn check_headers(checks: &mut Validator, headers: &Blocks<HeaderBlock>) {
    for header in items(headers) {
        checks.one_of("headers.path", &header.path, HeaderPath::VARIANTS);
        checks.one_of("headers.method", &header.method, HeaderMethod::VARIANTS);
    }
}

// ── Binds ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BindBlock {
    pub ip: Str,
    pub port: Int,
}

impl From<&BindBlock> for Bind {
    fn from(b: &BindBlock) -> Self {
        Self {
            ip: text(&b.ip),
            port: int(&b.port),
        }
    }
}

impl From<Bind> for BindBlock {
    fn from(b: Bind) -> Self {
        Self {
            ip: non_empty(b.ip),
            port: Value::Value(b.port),
        }
    }
}

pub(crate) fn bind_block() -> Block {
    block(
        "An address the section listens on",
        map! {
            "ip" => optional(string(), "Listening address; all addresses when unset"),
            "port" => required(number(), "Listening port"),
        },
    )
}

pub(crate) fn check_binds(checks: &mut Validator, binds: &Blocks<BindBlock>) {
    for bind in items(binds) {
        checks.port("binds.port", &bind.port);
    }
}

// ── Single-element settings ─────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakingBlock {
    pub error_limit: Int,
    pub observe: Str,
    pub on_error: Str,
}

impl From<&CircuitBreakingBlock> for CircuitBreaking {
    fn from(c: &CircuitBreakingBlock) -> Self {
        Self {
            error_limit: int(&c.error_limit),
            observe: text(&c.observe),
            on_error: text(&c.on_error),
        }
    }
}

impl From<CircuitBreaking> for CircuitBreakingBlock {
    fn from(c: CircuitBreaking) -> Self {
        Self {
            error_limit: Value::Value(c.error_limit),
            observe: Value::Value(c.observe),
            on_error: Value::Value(c.on_error),
        }
    }
}

pub(crate) fn circuit_breaking_block() -> Block {
    block(
        "Marks servers down after repeated errors",
        map! {
            "error_limit" => required(number(), "Errors before on_error fires"),
            "observe" => required(string(), "layer7 or layer4"),
            "on_error" => required(string(), "mark-down, fastinter, sudden-death or fail-check"),
        },
    )
}

pub(crate) fn check_circuit_breaking(checks: &mut Validator, set: &Blocks<CircuitBreakingBlock>) {
    checks.at_most_one("circuit_breaking", set);
    for cb in items(set) {
        checks.one_of("circuit_breaking.observe", &cb.observe, ObserveLayer::VARIANTS);
        checks.one_of("circuit_breaking.on_error", &cb.on_error, OnError::VARIANTS);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServersCheckBlock {
    pub fall: Int,
    pub inter: Int,
    pub rise: Int,
}

impl From<&ServersCheckBlock> for ServersCheck {
    fn from(c: &ServersCheckBlock) -> Self {
        Self {
            fall: int(&c.fall),
            inter: int(&c.inter),
            rise: int(&c.rise),
        }
    }
}

impl From<ServersCheck> for ServersCheckBlock {
    fn from(c: ServersCheck) -> Self {
        Self {
            fall: Value::Value(c.fall),
            inter: Value::Value(c.inter),
            rise: Value::Value(c.rise),
        }
    }
}

pub(crate) fn servers_check_block() -> Block {
    block(
        "Health check cadence for every server",
        map! {
            "fall" => required(number(), "Failed checks before a server is down"),
            "inter" => required(number(), "Milliseconds between checks"),
            "rise" => required(number(), "Passed checks before a server is up"),
        },
    )
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SslBlock {
    pub cert: Str,
    pub ssl_check_backend: Int,
}

impl From<&SslBlock> for SslSettings {
    fn from(s: &SslBlock) -> Self {
        Self {
            cert: text(&s.cert),
            ssl_check_backend: int(&s.ssl_check_backend),
        }
    }
}

impl From<SslSettings> for SslBlock {
    fn from(s: SslSettings) -> Self {
        Self {
            cert: Value::Value(s.cert),
            ssl_check_backend: non_zero(s.ssl_check_backend),
        }
    }
}

pub(crate) fn ssl_block() -> Block {
    block(
        "TLS settings",
        map! {
            "cert" => required(string(), "Certificate file on the server"),
            "ssl_check_backend" => optional(number(), "1 to verify backend certificates"),
        },
    )
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CookieBlock {
    pub domain: Str,
    pub dynamic: Str,
    pub dynamic_key: Str,
    pub name: Str,
    pub nocache: Str,
    pub postonly: Str,
    pub prefix: Str,
}

impl From<&CookieBlock> for Cookie {
    fn from(c: &CookieBlock) -> Self {
        Self {
            domain: text(&c.domain),
            dynamic: text(&c.dynamic),
            dynamic_key: text(&c.dynamic_key),
            name: text(&c.name),
            nocache: text(&c.nocache),
            postonly: text(&c.postonly),
            prefix: text(&c.prefix),
        }
    }
}

impl From<Cookie> for CookieBlock {
    fn from(c: Cookie) -> Self {
        Self {
            domain: non_empty(c.domain),
            dynamic: non_empty(c.dynamic),
            dynamic_key: non_empty(c.dynamic_key),
            name: Value::Value(c.name),
            nocache: non_empty(c.nocache),
            postonly: non_empty(c.postonly),
            prefix: non_empty(c.prefix),
        }
    }
}

pub(crate) fn cookie_block() -> Block {
    block(
        "Sticky sessions through a cookie",
        map! {
            "name" => required(string(), "Cookie name"),
            "domain" => optional(string(), "Cookie domain"),
            "dynamic" => optional(string(), "Enable dynamic cookies"),
            "dynamic_key" => optional(string(), "Secret for dynamic cookies"),
            "nocache" => optional(string(), "Mark responses as non-cacheable"),
            "postonly" => optional(string(), "Only set the cookie on POST"),
            "prefix" => optional(string(), "Prefix an existing cookie instead"),
        },
    )
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthCheckBlock {
    pub check: Str,
    pub domain: Str,
    pub path: Str,
}

impl From<&HealthCheckBlock> for HealthCheck {
    fn from(h: &HealthCheckBlock) -> Self {
        Self {
            check: text(&h.check),
            domain: text(&h.domain),
            path: text(&h.path),
        }
    }
}

impl From<HealthCheck> for HealthCheckBlock {
    fn from(h: HealthCheck) -> Self {
        Self {
            check: Value::Value(h.check),
            domain: non_empty(h.domain),
            path: Value::Value(h.path),
        }
    }
}

pub(crate) fn health_check_block() -> Block {
    block(
        "Active health check",
        map! {
            "check" => required(string(), "tcp-check, ssl-hello-chk, httpchk, ldap-check, mysql-check, pgsql-check, redis-check or smtpchk"),
            "domain" => optional(string(), "Host header sent by httpchk"),
            "path" => defaulted(string(), "Path probed by httpchk, default /"),
        },
    )
}

pub(crate) fn check_health_check(checks: &mut Validator, set: &Blocks<HealthCheckBlock>) {
    checks.at_most_one("health_check", set);
    for hc in items(set) {
        checks.one_of("health_check.check", &hc.check, HealthCheckType::VARIANTS);
    }
}

pub(crate) fn default_health_check(set: &mut Blocks<HealthCheckBlock>) {
    for hc in items_mut(set) {
        default_to(&mut hc.path, "/".to_owned());
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn attributes(checks: &Validator) -> Vec<&str> {
        checks.violations().iter().map(|v| v.attribute.as_str()).collect()
    }

    #[test]
    fn section_ids_split_on_first_dash() {
        assert_eq!(parse_section_id("2-web").unwrap(), (2, "web"));
        assert_eq!(parse_section_id("2-web-blue").unwrap(), (2, "web-blue"));
        assert!(parse_section_id("web").is_err());
        assert!(parse_section_id("x-web").is_err());
    }

    #[test]
    fn tcp_mode_rejects_http_features() {
        let cache: Flag = Value::Value(true);
        let compression: Flag = Value::Value(false);
        let servers: Blocks<BackendServerBlock> = Value::Value(vec![BackendServerBlock {
            send_proxy: Value::Value(true),
            ..BackendServerBlock::default()
        }]);
        let health: Blocks<HealthCheckBlock> = Value::Value(vec![HealthCheckBlock {
            check: Value::Value("httpchk".into()),
            ..HealthCheckBlock::default()
        }]);
        let http_only = HttpOnly {
            switches: vec![("cache", &cache), ("compression", &compression)],
            servers: Some(&servers),
            health_check: Some(&health),
            ..HttpOnly::default()
        };

        let mut checks = Validator::new();
        http_only.check(&mut checks, &Value::Value("tcp".into()));
        assert_eq!(
            attributes(&checks),
            ["cache", "backend_servers.send_proxy", "health_check.check"]
        );

        let mut checks = Validator::new();
        http_only.check(&mut checks, &Value::Value("http".into()));
        assert!(checks.is_ok());
    }

    #[test]
    fn tcp_health_checks_are_fine_in_tcp_mode() {
        let health: Blocks<HealthCheckBlock> = Value::Value(vec![HealthCheckBlock {
            check: Value::Value("tcp-check".into()),
            ..HealthCheckBlock::default()
        }]);
        let http_only = HttpOnly {
            health_check: Some(&health),
            ..HttpOnly::default()
        };
        let mut checks = Validator::new();
        http_only.check(&mut checks, &Value::Value("tcp".into()));
        assert!(checks.is_ok());
    }

    #[test]
    fn acl_ranges() {
        let acls = Value::Value(vec![AclBlock {
            acl_if: Value::Value(7),
            acl_then: Value::Value(1),
            ..AclBlock::default()
        }]);
        let mut checks = Validator::new();
        check_acls(&mut checks, &acls);
        assert_eq!(attributes(&checks), ["acls.acl_if", "acls.acl_then"]);
    }

    #[test]
    fn backend_server_defaults_fill_each_entry() {
        let mut servers = Value::Value(vec![
            BackendServerBlock::default(),
            BackendServerBlock {
                maxconn: Value::Value(50),
                ..BackendServerBlock::default()
            },
        ]);
        default_backend_servers(&mut servers, 2000);
        let maxconn: Vec<Int> = items(&servers).iter().map(|s| s.maxconn.clone()).collect();
        assert_eq!(maxconn, [Value::Value(2000), Value::Value(50)]);
        assert_eq!(items(&servers)[0].backup, Value::Value(false));
    }

    #[test]
    fn single_element_sets_map_to_options() {
        let empty: Blocks<SslBlock> = Value::Value(Vec::new());
        assert_eq!(wire_one::<_, SslSettings>(&empty), None);

        let read: Blocks<SslBlock> = block_one(Some(SslSettings {
            cert: "/etc/ssl/a.pem".into(),
            ssl_check_backend: 1,
        }));
        assert_eq!(items(&read).len(), 1);
        assert_eq!(items(&read)[0].cert, Value::Value("/etc/ssl/a.pem".to_owned()));
        assert_eq!(items(&block_one::<SslSettings, SslBlock>(None)).len(), 0);
    }
}
