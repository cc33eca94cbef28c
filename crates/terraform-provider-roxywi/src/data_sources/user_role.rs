// Every role a user can hold in a group.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_provider::schema::Schema;
use tf_provider::value::{Value, ValueEmpty};
use tf_provider::{DataSource, Diagnostics, map};

use roxywi_api::users::Role;

use crate::error::ProviderError;
use crate::provider::SharedClient;
use crate::schema::{block, computed, list_of, string, with_blocks};
use crate::value::{Blocks, Str};

const NAME: &str = "roxywi_user_role";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleBlock {
    pub role_id: Str,
    pub name: Str,
    pub description: Str,
}

impl From<Role> for RoleBlock {
    fn from(role: Role) -> Self {
        Self {
            role_id: Value::Value(role.role_id),
            name: Value::Value(role.name),
            description: Value::Value(role.description),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserRoles {
    pub id: Str,
    pub roles: Blocks<RoleBlock>,
}

fn roles_state(roles: Vec<Role>) -> Result<UserRoles, ProviderError> {
    if roles.is_empty() {
        return Err(ProviderError::Invalid("No roles found".to_owned()));
    }
    Ok(UserRoles {
        id: Value::Value("roles".to_owned()),
        roles: Value::Value(roles.into_iter().map(RoleBlock::from).collect()),
    })
}

pub struct UserRoleDataSource {
    client: SharedClient,
}

impl UserRoleDataSource {
    pub fn new(client: SharedClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DataSource for UserRoleDataSource {
    type State<'a> = UserRoles;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(Schema {
            version: 1,
            block: with_blocks(
                block(
                    "Lists the roles defined in Roxy-WI",
                    map! { "id" => computed(string(), "Always \"roles\"") },
                ),
                map! {
                    "roles" => list_of(block(
                        "A role",
                        map! {
                            "role_id" => computed(string(), "Role ID"),
                            "name" => computed(string(), "Role name"),
                            "description" => computed(string(), "Role description"),
                        },
                    )),
                },
            ),
        })
    }

    async fn validate<'a>(&self, _diags: &mut Diagnostics, _config: Self::State<'a>) -> Option<()> {
        Some(())
    }

    async fn read<'a>(
        &self,
        diags: &mut Diagnostics,
        _config: Self::State<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<Self::State<'a>> {
        let client = super::configured(&self.client, diags, NAME)?;
        match client
            .list_roles()
            .await
            .map_err(ProviderError::from)
            .and_then(roles_state)
        {
            Ok(state) => Some(state),
            Err(e) => {
                e.report(diags, &format!("Error reading {NAME}"));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn roles_become_blocks() {
        let state = roles_state(vec![Role {
            role_id: "1".into(),
            name: "superAdmin".into(),
            description: "Has the highest level of administrative permissions".into(),
        }])
        .unwrap();
        assert_eq!(state.id, Value::Value("roles".to_owned()));
        assert_eq!(crate::value::items(&state.roles)[0].name, Value::Value("superAdmin".to_owned()));
    }

    #[test]
    fn empty_role_list_is_an_error() {
        assert_eq!(roles_state(Vec::new()).unwrap_err().to_string(), "No roles found");
    }
}
