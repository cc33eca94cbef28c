// Group endpoints
//
// Groups are the tenancy unit of Roxy-WI: servers, credentials and
// channels all hang off a group ID.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::RoxyClient;
use crate::error::Error;
use crate::wire;

/// Body for create and update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GroupRequest {
    pub name: String,
    pub description: String,
}

/// A group as returned by `GET /api/group/{id}` and `GET /api/groups`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Group {
    /// Present in list replies only.
    #[serde(default, with = "wire::flex_id")]
    pub group_id: String,
    #[serde(default, with = "wire::flex_string")]
    pub name: String,
    #[serde(default, with = "wire::flex_string")]
    pub description: String,
}

impl RoxyClient {
    /// `POST /api/group`, returns the new group ID.
    pub async fn create_group(&self, group: &GroupRequest) -> Result<String, Error> {
        debug!(name = %group.name, "creating group");
        self.create("/api/group", group).await
    }

    /// `GET /api/group/{id}`
    pub async fn get_group(&self, id: &str) -> Result<Group, Error> {
        self.get(&format!("/api/group/{id}")).await
    }

    /// `GET /api/groups`
    pub async fn list_groups(&self) -> Result<Vec<Group>, Error> {
        self.get("/api/groups").await
    }

    /// Find a group by exact name via `GET /api/groups`.
    pub async fn find_group_by_name(&self, name: &str) -> Result<Group, Error> {
        self.list_groups()
            .await?
            .into_iter()
            .find(|g| g.name == name)
            .ok_or_else(|| Error::Empty {
                what: format!("group with name '{name}'"),
            })
    }

    /// `PUT /api/group/{id}`
    pub async fn update_group(&self, id: &str, group: &GroupRequest) -> Result<(), Error> {
        debug!(id, "updating group");
        let _: serde_json::Value = self.put(&format!("/api/group/{id}"), group).await?;
        Ok(())
    }

    /// `DELETE /api/group/{id}`
    pub async fn delete_group(&self, id: &str) -> Result<(), Error> {
        debug!(id, "deleting group");
        self.delete(&format!("/api/group/{id}")).await
    }
}
