use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::VariantNames;
use tf_provider::map;
use tf_provider::schema::Block;
use tf_provider::value::Value;

use roxywi_api::RoxyClient;
use roxywi_api::letsencrypt::{Certificate, ChallengeType};

use crate::error::ProviderError;
use crate::resource::{ResourceKind, changed};
use crate::schema::{block, number, optional, required, sensitive, string, string_list};
use crate::validate::Validator;
use crate::value::{Int, Str, StrList, int, refreshed, string_list as to_list, strings, text};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LetsencryptState {
    pub id: Str,
    pub server_id: Int,
    pub domains: StrList,
    #[serde(rename = "type")]
    pub kind: Str,
    pub email: Str,
    pub api_key: Str,
    pub api_token: Str,
    pub description: Str,
}

impl LetsencryptState {
    fn certificate(&self) -> Certificate {
        Certificate {
            server_id: int(&self.server_id),
            domains: strings(&self.domains),
            kind: text(&self.kind),
            email: text(&self.email),
            api_key: text(&self.api_key),
            api_token: text(&self.api_token),
            description: text(&self.description),
        }
    }
}

/// Domain lists compare as sets; the API may reorder them.
fn same_domains(a: &StrList, b: &StrList) -> bool {
    let a: BTreeSet<String> = strings(a).into_iter().collect();
    let b: BTreeSet<String> = strings(b).into_iter().collect();
    a == b
}

pub struct Letsencrypt;

#[async_trait]
impl ResourceKind for Letsencrypt {
    type State = LetsencryptState;
    const NAME: &'static str = "roxywi_letsencrypt";

    fn schema(&self) -> Block {
        block(
            "A Let's Encrypt certificate issued on a server",
            map! {
                "server_id" => required(number(), "Server the certificate is issued on. Changing it reissues"),
                "domains" => required(string_list(), "Domains on the certificate. Changing them reissues"),
                "type" => required(string(), "Challenge: standalone, route53, digitalocean, cloudflare or linode"),
                "email" => optional(string(), "Contact address for the ACME account"),
                "api_key" => sensitive(optional(string(), "DNS provider API key")),
                "api_token" => sensitive(optional(string(), "DNS provider API token")),
                "description" => optional(string(), "Free text"),
            },
        )
    }

    fn validate(&self, state: &LetsencryptState, checks: &mut Validator) {
        checks.one_of("type", &state.kind, ChallengeType::VARIANTS);
        checks.email("email", &state.email);
    }

    fn id<'s>(&self, state: &'s LetsencryptState) -> &'s Str {
        &state.id
    }

    fn set_id(&self, state: &mut LetsencryptState, id: Str) {
        state.id = id;
    }

    fn replaced_fields(&self, prior: &LetsencryptState, proposed: &LetsencryptState) -> Vec<&'static str> {
        let mut out = Vec::new();
        changed("server_id", &prior.server_id, &proposed.server_id, &mut out);
        changed("type", &prior.kind, &proposed.kind, &mut out);
        if !same_domains(&prior.domains, &proposed.domains) {
            out.push("domains");
        }
        out
    }

    async fn create(&self, client: &RoxyClient, plan: &LetsencryptState) -> Result<String, ProviderError> {
        Ok(client.create_certificate(&plan.certificate()).await?)
    }

    async fn read(
        &self,
        client: &RoxyClient,
        id: &str,
        prior: &LetsencryptState,
    ) -> Result<Option<LetsencryptState>, ProviderError> {
        let cert = client.get_certificate(id).await?;
        let domains = to_list(cert.domains);
        // Keep the configured order when only the order differs.
        let domains = if same_domains(&prior.domains, &domains) {
            prior.domains.clone()
        } else {
            domains
        };
        Ok(Some(LetsencryptState {
            server_id: Value::Value(cert.server_id),
            domains,
            kind: Value::Value(cert.kind),
            email: refreshed(&prior.email, cert.email),
            description: refreshed(&prior.description, cert.description),
            ..prior.clone()
        }))
    }

    async fn update(
        &self,
        client: &RoxyClient,
        id: &str,
        _prior: &LetsencryptState,
        plan: &LetsencryptState,
    ) -> Result<(), ProviderError> {
        Ok(client.update_certificate(id, &plan.certificate()).await?)
    }

    async fn delete(&self, client: &RoxyClient, id: &str, _state: &LetsencryptState) -> Result<(), ProviderError> {
        Ok(client.delete_certificate(id).await?)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn domains(names: &[&str]) -> StrList {
        to_list(names.iter().map(|n| (*n).to_owned()).collect())
    }

    fn cert(names: &[&str]) -> LetsencryptState {
        LetsencryptState {
            server_id: Value::Value(1),
            domains: domains(names),
            kind: Value::Value("standalone".into()),
            ..LetsencryptState::default()
        }
    }

    #[test]
    fn reordering_domains_is_not_a_reissue() {
        let prior = cert(&["a.example.com", "b.example.com"]);
        let reordered = cert(&["b.example.com", "a.example.com"]);
        assert!(Letsencrypt.replaced_fields(&prior, &reordered).is_empty());

        let added = cert(&["a.example.com", "b.example.com", "c.example.com"]);
        assert_eq!(Letsencrypt.replaced_fields(&prior, &added), ["domains"]);
    }

    #[test]
    fn challenge_and_email_are_checked() {
        let state = LetsencryptState {
            kind: Value::Value("http01".into()),
            email: Value::Value("not-an-address".into()),
            ..cert(&["a.example.com"])
        };
        let mut checks = Validator::new();
        Letsencrypt.validate(&state, &mut checks);
        let attrs: Vec<&str> = checks.violations().iter().map(|v| v.attribute.as_str()).collect();
        assert_eq!(attrs, ["type", "email"]);
    }
}
