// Membership of a user in a group, with the role held there.
//
// State ID: "{user_id}-{group_id}".

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_provider::map;
use tf_provider::schema::Block;
use tf_provider::value::Value;

use roxywi_api::RoxyClient;

use crate::error::ProviderError;
use crate::resource::{ResourceKind, changed};
use crate::schema::{block, number, required};
use crate::value::{Int, Str, id_number, int, split_id};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserRoleBindingState {
    pub id: Str,
    pub user_id: Int,
    pub group_id: Int,
    pub role_id: Int,
}

fn parse_id(id: &str) -> Result<(i64, i64), ProviderError> {
    let parts = split_id(id, 2)?;
    Ok((id_number(id, parts[0])?, id_number(id, parts[1])?))
}

pub struct UserRoleBinding;

#[async_trait]
impl ResourceKind for UserRoleBinding {
    type State = UserRoleBindingState;
    const NAME: &'static str = "roxywi_user_role_binding";

    fn schema(&self) -> Block {
        block(
            "Grants a user a role inside a group",
            map! {
                "user_id" => required(number(), "User ID. Changing it recreates the binding"),
                "group_id" => required(number(), "Group ID. Changing it recreates the binding"),
                "role_id" => required(number(), "Role ID, see the roxywi_user_role data source"),
            },
        )
    }

    fn id<'s>(&self, state: &'s UserRoleBindingState) -> &'s Str {
        &state.id
    }

    fn set_id(&self, state: &mut UserRoleBindingState, id: Str) {
        state.id = id;
    }

    fn replaced_fields(&self, prior: &UserRoleBindingState, proposed: &UserRoleBindingState) -> Vec<&'static str> {
        let mut out = Vec::new();
        changed("user_id", &prior.user_id, &proposed.user_id, &mut out);
        changed("group_id", &prior.group_id, &proposed.group_id, &mut out);
        out
    }

    async fn create(&self, client: &RoxyClient, plan: &UserRoleBindingState) -> Result<String, ProviderError> {
        let (user_id, group_id) = (int(&plan.user_id), int(&plan.group_id));
        client
            .add_user_to_group(user_id, group_id, int(&plan.role_id))
            .await?;
        Ok(format!("{user_id}-{group_id}"))
    }

    async fn read(
        &self,
        client: &RoxyClient,
        id: &str,
        prior: &UserRoleBindingState,
    ) -> Result<Option<UserRoleBindingState>, ProviderError> {
        let (user_id, group_id) = parse_id(id)?;
        let groups = client.list_user_groups(user_id).await?;
        let Some(entry) = groups.iter().find(|g| g.user_group_id == group_id) else {
            return Ok(None);
        };
        Ok(Some(UserRoleBindingState {
            id: prior.id.clone(),
            user_id: Value::Value(user_id),
            group_id: Value::Value(group_id),
            role_id: Value::Value(entry.user_role_id),
        }))
    }

    async fn update(
        &self,
        client: &RoxyClient,
        id: &str,
        _prior: &UserRoleBindingState,
        plan: &UserRoleBindingState,
    ) -> Result<(), ProviderError> {
        let (user_id, group_id) = parse_id(id)?;
        Ok(client
            .update_user_group_role(user_id, group_id, int(&plan.role_id))
            .await?)
    }

    async fn delete(&self, client: &RoxyClient, id: &str, _state: &UserRoleBindingState) -> Result<(), ProviderError> {
        let (user_id, group_id) = parse_id(id)?;
        Ok(client.remove_user_from_group(user_id, group_id).await?)
    }

    fn import_state(&self, id: &str) -> Result<UserRoleBindingState, ProviderError> {
        parse_id(id)?;
        Ok(UserRoleBindingState {
            id: Value::Value(id.to_owned()),
            ..UserRoleBindingState::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_carries_user_and_group() {
        assert_eq!(parse_id("4-2").unwrap(), (4, 2));
        assert!(parse_id("4").is_err());
        assert!(parse_id("four-2").is_err());
    }

    #[test]
    fn moving_the_binding_recreates_it() {
        let prior = UserRoleBindingState {
            user_id: Value::Value(1),
            group_id: Value::Value(1),
            role_id: Value::Value(3),
            ..UserRoleBindingState::default()
        };
        let role_only = UserRoleBindingState {
            role_id: Value::Value(4),
            ..prior.clone()
        };
        assert!(UserRoleBinding.replaced_fields(&prior, &role_only).is_empty());

        let regrouped = UserRoleBindingState {
            group_id: Value::Value(2),
            ..prior.clone()
        };
        assert_eq!(UserRoleBinding.replaced_fields(&prior, &regrouped), ["group_id"]);
    }
}
