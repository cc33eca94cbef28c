use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_provider::map;
use tf_provider::schema::Block;
use tf_provider::value::Value;

use roxywi_api::RoxyClient;
use roxywi_api::haproxy::{SectionKind, UserlistSection as ApiUserlist, UserlistUser};

use super::blocks::{action_attribute, check_action, default_action, parse_section_id, wire};
use crate::error::ProviderError;
use crate::resource::{ResourceKind, changed};
use crate::schema::{block, list_of, number, optional, required, sensitive, string, string_list, with_blocks};
use crate::validate::Validator;
use crate::value::{Blocks, Int, Str, StrList, int, items, non_empty, refreshed_list, strings, text};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserBlock {
    pub user: Str,
    pub password: Str,
    pub group: Str,
}

impl From<&UserBlock> for UserlistUser {
    fn from(u: &UserBlock) -> Self {
        Self {
            user: text(&u.user),
            password: text(&u.password),
            group: text(&u.group),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserlistState {
    pub id: Str,
    pub name: Str,
    pub server_id: Int,
    pub action: Str,
    pub userlist_groups: StrList,
    pub userlist_users: Blocks<UserBlock>,
}

impl UserlistState {
    fn section(&self) -> ApiUserlist {
        ApiUserlist {
            name: text(&self.name),
            action: text(&self.action),
            userlist_groups: strings(&self.userlist_groups),
            userlist_users: wire(&self.userlist_users),
        }
    }
}

/// Users as read back. Passwords come from the prior entry with the same
/// user name, since the API may return them hashed or not at all.
fn refreshed_users(prior: &Blocks<UserBlock>, fresh: Vec<UserlistUser>) -> Blocks<UserBlock> {
    let users = fresh
        .into_iter()
        .map(|u| {
            let password = items(prior)
                .iter()
                .find(|p| text(&p.user) == u.user)
                .map_or_else(|| non_empty(u.password.clone()), |p| p.password.clone());
            UserBlock {
                user: Value::Value(u.user),
                password,
                group: non_empty(u.group),
            }
        })
        .collect();
    Value::Value(users)
}

pub struct UserlistSection;

#[async_trait]
impl ResourceKind for UserlistSection {
    type State = UserlistState;
    const NAME: &'static str = "roxywi_haproxy_section_userlist";

    fn schema(&self) -> Block {
        with_blocks(
            block(
                "An HAProxy userlist for HTTP basic auth",
                map! {
                    "name" => required(string(), "Userlist name. Changing it recreates the section"),
                    "server_id" => required(number(), "Server running HAProxy. Changing it recreates the section"),
                    "action" => action_attribute(),
                    "userlist_groups" => optional(string_list(), "Groups users may belong to"),
                },
            ),
            map! {
                "userlist_users" => list_of(block(
                    "A user",
                    map! {
                        "user" => required(string(), "User name"),
                        "password" => sensitive(required(string(), "Password")),
                        "group" => optional(string(), "Group from userlist_groups"),
                    },
                )),
            },
        )
    }

    fn validate(&self, state: &UserlistState, checks: &mut Validator) {
        check_action(checks, &state.action);
        let groups = strings(&state.userlist_groups);
        for user in items(&state.userlist_users) {
            if let Value::Value(group) = &user.group {
                if !group.is_empty() && !matches!(state.userlist_groups, Value::Unknown) && !groups.contains(group) {
                    checks.reject(
                        "userlist_users.group",
                        format!("group {group} is not listed in userlist_groups"),
                    );
                }
            }
        }
    }

    fn apply_defaults(&self, state: &mut UserlistState) {
        default_action(&mut state.action);
    }

    fn id<'s>(&self, state: &'s UserlistState) -> &'s Str {
        &state.id
    }

    fn set_id(&self, state: &mut UserlistState, id: Str) {
        state.id = id;
    }

    fn replaced_fields(&self, prior: &UserlistState, proposed: &UserlistState) -> Vec<&'static str> {
        let mut out = Vec::new();
        changed("name", &prior.name, &proposed.name, &mut out);
        changed("server_id", &prior.server_id, &proposed.server_id, &mut out);
        out
    }

    async fn create(&self, client: &RoxyClient, plan: &UserlistState) -> Result<String, ProviderError> {
        Ok(client
            .create_haproxy_section(int(&plan.server_id), SectionKind::Userlist, &plan.section())
            .await?)
    }

    async fn read(
        &self,
        client: &RoxyClient,
        id: &str,
        prior: &UserlistState,
    ) -> Result<Option<UserlistState>, ProviderError> {
        let (server_id, name) = parse_section_id(id)?;
        let userlist: ApiUserlist = client
            .get_haproxy_section(server_id, SectionKind::Userlist, name)
            .await?;
        Ok(Some(UserlistState {
            id: prior.id.clone(),
            name: Value::Value(name.to_owned()),
            server_id: Value::Value(server_id),
            action: prior.action.clone(),
            userlist_groups: refreshed_list(&prior.userlist_groups, userlist.userlist_groups),
            userlist_users: refreshed_users(&prior.userlist_users, userlist.userlist_users),
        }))
    }

    async fn update(
        &self,
        client: &RoxyClient,
        id: &str,
        _prior: &UserlistState,
        plan: &UserlistState,
    ) -> Result<(), ProviderError> {
        let (server_id, name) = parse_section_id(id)?;
        Ok(client
            .update_haproxy_section(server_id, SectionKind::Userlist, name, &plan.section())
            .await?)
    }

    async fn delete(&self, client: &RoxyClient, id: &str, _state: &UserlistState) -> Result<(), ProviderError> {
        let (server_id, name) = parse_section_id(id)?;
        Ok(client
            .delete_haproxy_section(server_id, SectionKind::Userlist, name)
            .await?)
    }

    fn import_state(&self, id: &str) -> Result<UserlistState, ProviderError> {
        parse_section_id(id)?;
        let mut state = UserlistState {
            id: Value::Value(id.to_owned()),
            ..UserlistState::default()
        };
        default_action(&mut state.action);
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn user(name: &str, password: &str, group: Str) -> UserBlock {
        UserBlock {
            user: Value::Value(name.into()),
            password: Value::Value(password.into()),
            group,
        }
    }

    #[test]
    fn passwords_survive_refresh() {
        let prior = Value::Value(vec![user("admin", "s3cret", Value::Null)]);
        let fresh = vec![
            UserlistUser {
                user: "admin".into(),
                password: "$6$hashed".into(),
                group: String::new(),
            },
            UserlistUser {
                user: "ops".into(),
                password: String::new(),
                group: "staff".into(),
            },
        ];
        let users = refreshed_users(&prior, fresh);
        assert_eq!(
            items(&users),
            [
                user("admin", "s3cret", Value::Null),
                UserBlock {
                    user: Value::Value("ops".into()),
                    password: Value::Null,
                    group: Value::Value("staff".into()),
                },
            ]
        );
    }

    #[test]
    fn user_groups_must_be_declared() {
        let state = UserlistState {
            userlist_groups: Value::Value(vec![Value::Value("staff".into())]),
            userlist_users: Value::Value(vec![
                user("a", "x", Value::Value("staff".into())),
                user("b", "y", Value::Value("admins".into())),
            ]),
            ..UserlistState::default()
        };
        let mut checks = Validator::new();
        UserlistSection.validate(&state, &mut checks);
        assert_eq!(checks.violations().len(), 1);
        assert_eq!(checks.violations()[0].detail, "group admins is not listed in userlist_groups");
    }
}
