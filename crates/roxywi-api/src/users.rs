// User, role and group membership endpoints

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::client::RoxyClient;
use crate::error::Error;
use crate::wire;

/// Body for `POST`/`PUT /api/user`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(with = "wire::int_bool")]
    pub enabled: bool,
}

/// A user as returned by `GET /api/user/{id}`. The password is never echoed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct User {
    #[serde(default, with = "wire::flex_string")]
    pub username: String,
    #[serde(default, with = "wire::flex_string")]
    pub email: String,
    #[serde(default, with = "wire::int_bool")]
    pub enabled: bool,
}

/// One entry of `GET /api/user/{id}/groups`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UserGroup {
    #[serde(default, with = "wire::flex_int")]
    pub user_group_id: i64,
    #[serde(default, with = "wire::flex_int")]
    pub user_role_id: i64,
}

/// One entry of `GET /api/user/roles`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Role {
    #[serde(default, with = "wire::flex_id")]
    pub role_id: String,
    #[serde(default, with = "wire::flex_string")]
    pub name: String,
    #[serde(default, with = "wire::flex_string")]
    pub description: String,
}

impl RoxyClient {
    // ── Users ────────────────────────────────────────────────────────

    /// `POST /api/user`
    pub async fn create_user(&self, user: &UserRequest) -> Result<String, Error> {
        debug!(username = %user.username, "creating user");
        self.create("/api/user", user).await
    }

    /// `GET /api/user/{id}`
    pub async fn get_user(&self, id: &str) -> Result<User, Error> {
        self.get(&format!("/api/user/{id}")).await
    }

    /// `PUT /api/user/{id}`
    pub async fn update_user(&self, id: &str, user: &UserRequest) -> Result<(), Error> {
        debug!(id, "updating user");
        let _: Value = self.put(&format!("/api/user/{id}"), user).await?;
        Ok(())
    }

    /// `DELETE /api/user/{id}`
    pub async fn delete_user(&self, id: &str) -> Result<(), Error> {
        debug!(id, "deleting user");
        self.delete(&format!("/api/user/{id}")).await
    }

    // ── Roles ────────────────────────────────────────────────────────

    /// `GET /api/user/roles`
    pub async fn list_roles(&self) -> Result<Vec<Role>, Error> {
        self.get("/api/user/roles").await
    }

    // ── Group membership ─────────────────────────────────────────────

    /// `POST /api/user/{user_id}/groups/{group_id}` with `{"role_id": N}`
    pub async fn add_user_to_group(
        &self,
        user_id: i64,
        group_id: i64,
        role_id: i64,
    ) -> Result<(), Error> {
        debug!(user_id, group_id, role_id, "binding user to group");
        let _: Value = self
            .post(
                &format!("/api/user/{user_id}/groups/{group_id}"),
                &json!({ "role_id": role_id }),
            )
            .await?;
        Ok(())
    }

    /// `GET /api/user/{user_id}/groups`
    pub async fn list_user_groups(&self, user_id: i64) -> Result<Vec<UserGroup>, Error> {
        self.get(&format!("/api/user/{user_id}/groups")).await
    }

    /// `PUT /api/user/{user_id}/groups/{group_id}` with `{"role_id": N}`
    pub async fn update_user_group_role(
        &self,
        user_id: i64,
        group_id: i64,
        role_id: i64,
    ) -> Result<(), Error> {
        debug!(user_id, group_id, role_id, "changing user role in group");
        let _: Value = self
            .put(
                &format!("/api/user/{user_id}/groups/{group_id}"),
                &json!({ "role_id": role_id }),
            )
            .await?;
        Ok(())
    }

    /// `DELETE /api/user/{user_id}/groups/{group_id}`
    pub async fn remove_user_from_group(&self, user_id: i64, group_id: i64) -> Result<(), Error> {
        debug!(user_id, group_id, "removing user from group");
        self.delete(&format!("/api/user/{user_id}/groups/{group_id}"))
            .await
    }
}
