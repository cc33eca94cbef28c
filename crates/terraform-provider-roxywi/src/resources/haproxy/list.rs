// White and black lists of source addresses.
//
// State ID: "{group_id}-{color}-{name}".

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::VariantNames;
use tf_provider::map;
use tf_provider::schema::Block;
use tf_provider::value::Value;

use roxywi_api::RoxyClient;
use roxywi_api::haproxy::{HaproxyList as ApiList, ListColor};

use super::blocks::{action_attribute, check_action, default_action};
use crate::error::ProviderError;
use crate::resource::{ResourceKind, changed};
use crate::schema::{block, defaulted, number, required, string};
use crate::validate::Validator;
use crate::value::{Int, Str, id_number, int, split_id, text};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListState {
    pub id: Str,
    pub name: Str,
    pub color: Str,
    pub server_ip: Str,
    pub content: Str,
    pub group_id: Int,
    pub action: Str,
}

impl ListState {
    fn list(&self) -> ApiList {
        ApiList {
            name: text(&self.name),
            color: text(&self.color),
            content: text(&self.content),
            server_ip: text(&self.server_ip),
            action: text(&self.action),
            group_id: int(&self.group_id),
        }
    }
}

struct ListId<'a> {
    group_id: i64,
    color: &'a str,
    name: &'a str,
}

fn parse_id(id: &str) -> Result<ListId<'_>, ProviderError> {
    let parts = split_id(id, 3)?;
    if parts.len() < 3 || parts[1].parse::<ListColor>().is_err() {
        return Err(ProviderError::InvalidId(id.to_owned()));
    }
    Ok(ListId {
        group_id: id_number(id, parts[0])?,
        color: parts[1],
        name: parts[2],
    })
}

pub struct HaproxyList;

#[async_trait]
impl ResourceKind for HaproxyList {
    type State = ListState;
    const NAME: &'static str = "roxywi_haproxy_list";

    fn schema(&self) -> Block {
        block(
            "An HAProxy white or black list",
            map! {
                "name" => required(string(), "List file name. Changing it recreates the list"),
                "color" => required(string(), "white or black. Changing it recreates the list"),
                "server_ip" => required(string(), "Server the list is uploaded to. Changing it recreates the list"),
                "content" => required(string(), "Addresses or networks, one per line"),
                "group_id" => defaulted(number(), "Owning group; the caller's group when unset"),
                "action" => action_attribute(),
            },
        )
    }

    fn validate(&self, state: &ListState, checks: &mut Validator) {
        checks.one_of("color", &state.color, ListColor::VARIANTS);
        checks.ip_address("server_ip", &state.server_ip);
        check_action(checks, &state.action);
    }

    fn apply_defaults(&self, state: &mut ListState) {
        default_action(&mut state.action);
        if matches!(state.group_id, Value::Null) {
            state.group_id = Value::Unknown;
        }
    }

    fn id<'s>(&self, state: &'s ListState) -> &'s Str {
        &state.id
    }

    fn set_id(&self, state: &mut ListState, id: Str) {
        state.id = id;
    }

    fn replaced_fields(&self, prior: &ListState, proposed: &ListState) -> Vec<&'static str> {
        let mut out = Vec::new();
        changed("name", &prior.name, &proposed.name, &mut out);
        changed("color", &prior.color, &proposed.color, &mut out);
        changed("server_ip", &prior.server_ip, &proposed.server_ip, &mut out);
        out
    }

    async fn create(&self, client: &RoxyClient, plan: &ListState) -> Result<String, ProviderError> {
        let id = client.create_haproxy_list(&plan.list()).await?;
        parse_id(&id)?;
        Ok(id)
    }

    async fn read(&self, client: &RoxyClient, id: &str, prior: &ListState) -> Result<Option<ListState>, ProviderError> {
        let parsed = parse_id(id)?;
        let list = client.get_haproxy_list(parsed.name, parsed.color).await?;
        Ok(Some(ListState {
            name: Value::Value(parsed.name.to_owned()),
            color: Value::Value(parsed.color.to_owned()),
            group_id: Value::Value(parsed.group_id),
            content: Value::Value(list.content),
            server_ip: if list.server_ip.is_empty() {
                prior.server_ip.clone()
            } else {
                Value::Value(list.server_ip)
            },
            ..prior.clone()
        }))
    }

    async fn update(
        &self,
        client: &RoxyClient,
        _id: &str,
        _prior: &ListState,
        plan: &ListState,
    ) -> Result<(), ProviderError> {
        Ok(client.update_haproxy_list(&plan.list()).await?)
    }

    async fn delete(&self, client: &RoxyClient, id: &str, _state: &ListState) -> Result<(), ProviderError> {
        let parsed = parse_id(id)?;
        Ok(client
            .delete_haproxy_list(parsed.name, parsed.color, parsed.group_id)
            .await?)
    }

    fn import_state(&self, id: &str) -> Result<ListState, ProviderError> {
        parse_id(id)?;
        let mut state = ListState {
            id: Value::Value(id.to_owned()),
            ..ListState::default()
        };
        default_action(&mut state.action);
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn ids_carry_group_color_and_name() {
        let id = parse_id("1-white-office-net").unwrap();
        assert_eq!((id.group_id, id.color, id.name), (1, "white", "office-net"));
        assert!(parse_id("1-white").is_err());
        assert!(parse_id("1-grey-office").is_err());
        assert!(parse_id("g-black-office").is_err());
    }

    #[test]
    fn unset_group_is_computed() {
        let mut state = ListState::default();
        HaproxyList.apply_defaults(&mut state);
        assert_eq!(state.group_id, Value::Unknown);
        assert_eq!(state.action, Value::Value("save".to_owned()));

        let mut pinned = ListState {
            group_id: Value::Value(3),
            ..ListState::default()
        };
        HaproxyList.apply_defaults(&mut pinned);
        assert_eq!(pinned.list().group_id, 3);
    }
}
