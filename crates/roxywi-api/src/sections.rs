// Config-section plumbing shared by the HAProxy and NGINX endpoints
//
// Sections live under `/api/service/{service}/{server_id}/section/{kind}`.
// Named sections (backends, upstreams, ...) append `/{name}`; singletons
// (global, defaults) do not. Every write carries `type` and `server_id`
// next to the section's own fields.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::client::RoxyClient;
use crate::error::Error;

/// Body wrapper that adds the routing fields the API expects.
#[derive(Debug, Serialize)]
pub(crate) struct SectionBody<'a, T: Serialize> {
    #[serde(rename = "type")]
    pub kind: &'a str,
    pub server_id: i64,
    #[serde(flatten)]
    pub section: &'a T,
}

pub(crate) fn section_path(service: &str, server_id: i64, kind: &str, name: Option<&str>) -> String {
    let base = format!("/api/service/{service}/{server_id}/section/{kind}");
    match name {
        Some(name) => format!("{base}/{name}"),
        None => base,
    }
}

impl RoxyClient {
    /// `POST` a new named section; the reply's `id` is `"{server_id}-{name}"`.
    pub(crate) async fn create_section<T: Serialize + Sync>(
        &self,
        service: &str,
        server_id: i64,
        kind: &str,
        section: &T,
    ) -> Result<String, Error> {
        debug!(service, server_id, kind, "creating config section");
        let body = SectionBody {
            kind,
            server_id,
            section,
        };
        self.create(&section_path(service, server_id, kind, None), &body)
            .await
    }

    pub(crate) async fn get_section<T: DeserializeOwned>(
        &self,
        service: &str,
        server_id: i64,
        kind: &str,
        name: Option<&str>,
    ) -> Result<T, Error> {
        self.get(&section_path(service, server_id, kind, name)).await
    }

    pub(crate) async fn put_section<T: Serialize + Sync>(
        &self,
        service: &str,
        server_id: i64,
        kind: &str,
        name: Option<&str>,
        section: &T,
    ) -> Result<(), Error> {
        debug!(service, server_id, kind, name, "writing config section");
        let body = SectionBody {
            kind,
            server_id,
            section,
        };
        let _: Value = self
            .put(&section_path(service, server_id, kind, name), &body)
            .await?;
        Ok(())
    }

    pub(crate) async fn delete_section(
        &self,
        service: &str,
        server_id: i64,
        kind: &str,
        name: Option<&str>,
    ) -> Result<(), Error> {
        debug!(service, server_id, kind, name, "deleting config section");
        self.delete(&section_path(service, server_id, kind, name))
            .await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn paths_for_named_and_singleton_sections() {
        assert_eq!(
            section_path("haproxy", 3, "backend", Some("web")),
            "/api/service/haproxy/3/section/backend/web"
        );
        assert_eq!(
            section_path("haproxy", 3, "global", None),
            "/api/service/haproxy/3/section/global"
        );
    }

    #[test]
    fn body_carries_routing_fields() {
        #[derive(Serialize)]
        struct Tiny {
            name: &'static str,
        }
        let body = SectionBody {
            kind: "peers",
            server_id: 9,
            section: &Tiny { name: "mesh" },
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"type": "peers", "server_id": 9, "name": "mesh"})
        );
    }
}
