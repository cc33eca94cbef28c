// Static configuration checks
//
// Checks collect violations first and flush them into Terraform
// diagnostics at the end, so a plan reports every bad attribute at once.
// Unknown and null values are skipped: unknowns are checked again at
// apply time and required-ness is enforced by Terraform itself.

use std::net::IpAddr;
use std::ops::RangeInclusive;

use tf_provider::value::Value;
use tf_provider::{AttributePath, Diagnostics};

use crate::value::known;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Dotted path for nested attributes, e.g. `backend_servers.port`.
    pub attribute: String,
    pub detail: String,
}

#[derive(Debug, Default)]
pub struct Validator {
    violations: Vec<Violation>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject(&mut self, attribute: &str, detail: impl Into<String>) {
        self.violations.push(Violation {
            attribute: attribute.to_owned(),
            detail: detail.into(),
        });
    }

    pub fn one_of(&mut self, attribute: &str, value: &Value<String>, allowed: &[&str]) {
        if let Some(v) = known(value) {
            if !allowed.contains(&v.as_str()) {
                self.reject(
                    attribute,
                    format!("expected {attribute} to be one of {allowed:?}, got {v}"),
                );
            }
        }
    }

    pub fn one_of_ignore_case(&mut self, attribute: &str, value: &Value<String>, allowed: &[&str]) {
        if let Some(v) = known(value) {
            if !allowed.iter().any(|a| a.eq_ignore_ascii_case(v)) {
                self.reject(
                    attribute,
                    format!("expected {attribute} to be one of {allowed:?}, got {v}"),
                );
            }
        }
    }

    pub fn int_between(&mut self, attribute: &str, value: &Value<i64>, range: RangeInclusive<i64>) {
        if let Some(v) = known(value) {
            if !range.contains(v) {
                self.reject(
                    attribute,
                    format!(
                        "expected {attribute} to be in the range ({} - {}), got {v}",
                        range.start(),
                        range.end()
                    ),
                );
            }
        }
    }

    pub fn port(&mut self, attribute: &str, value: &Value<i64>) {
        self.int_between(attribute, value, 1..=65535);
    }

    pub fn ip_address(&mut self, attribute: &str, value: &Value<String>) {
        if let Some(v) = known(value) {
            if v.parse::<IpAddr>().is_err() {
                self.reject(
                    attribute,
                    format!("expected {attribute} to contain a valid IP, got: {v}"),
                );
            }
        }
    }

    /// An empty string passes; use [`Validator::not_blank`] to forbid it.
    pub fn email(&mut self, attribute: &str, value: &Value<String>) {
        if let Some(v) = known(value) {
            if !v.is_empty() && !looks_like_email(v) {
                self.reject(attribute, format!("{v} is not a valid email address"));
            }
        }
    }

    pub fn not_blank(&mut self, attribute: &str, value: &Value<String>) {
        if let Some(v) = known(value) {
            if v.trim().is_empty() {
                self.reject(attribute, format!("{attribute} must not be empty"));
            }
        }
    }

    /// Single-element blocks accept at most one entry.
    pub fn at_most_one<T>(&mut self, attribute: &str, value: &Value<Vec<T>>) {
        if let Some(items) = known(value) {
            if items.len() > 1 {
                self.reject(
                    attribute,
                    format!("at most one {attribute} block is allowed, got {}", items.len()),
                );
            }
        }
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn is_ok(&self) -> bool {
        self.violations.is_empty()
    }

    /// Flush into diagnostics; `None` when anything was rejected.
    pub fn report(self, diags: &mut Diagnostics) -> Option<()> {
        if self.violations.is_empty() {
            return Some(());
        }
        for violation in self.violations {
            let root = violation
                .attribute
                .split('.')
                .next()
                .unwrap_or(violation.attribute.as_str())
                .to_owned();
            diags.error(
                format!("Invalid {}", violation.attribute),
                violation.detail,
                AttributePath::new(root),
            );
        }
        None
    }
}

fn looks_like_email(raw: &str) -> bool {
    let Some((local, domain)) = raw.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !raw.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Value<String> {
        Value::Value(v.to_owned())
    }

    #[test]
    fn enums_and_ranges() {
        let mut v = Validator::new();
        v.one_of("mode", &s("http"), &["http", "tcp"]);
        v.int_between("acl_if", &Value::Value(3), 1..=6);
        assert!(v.is_ok());

        v.one_of("mode", &s("udp"), &["http", "tcp"]);
        v.int_between("acl_then", &Value::Value(1), 2..=5);
        v.port("binds.port", &Value::Value(70_000));
        let attrs: Vec<&str> = v.violations().iter().map(|x| x.attribute.as_str()).collect();
        assert_eq!(attrs, ["mode", "acl_then", "binds.port"]);
    }

    #[test]
    fn unknown_values_are_skipped() {
        let mut v = Validator::new();
        v.one_of("mode", &Value::Unknown, &["http"]);
        v.ip_address("vip", &Value::Unknown);
        v.port("port", &Value::Null);
        assert!(v.is_ok());
    }

    #[test]
    fn receiver_matches_without_case() {
        let mut v = Validator::new();
        v.one_of_ignore_case("receiver", &s("Telegram"), &["telegram", "slack"]);
        assert!(v.is_ok());
        v.one_of("receiver", &s("Telegram"), &["telegram", "slack"]);
        assert!(!v.is_ok());
    }

    #[test]
    fn addresses() {
        let mut v = Validator::new();
        v.ip_address("vip", &s("10.0.0.10"));
        v.ip_address("vip", &s("fe80::1"));
        v.email("email", &s("ops@example.com"));
        v.email("email", &s(""));
        assert!(v.is_ok());

        v.ip_address("vip", &s("10.0.0"));
        v.email("email", &s("ops@localhost"));
        v.email("email", &s("not an email"));
        assert_eq!(v.violations().len(), 3);
    }

    #[test]
    fn single_blocks() {
        let mut v = Validator::new();
        v.at_most_one("ssl", &Value::Value(vec![1, 2]));
        assert_eq!(v.violations()[0].attribute, "ssl");
    }
}
