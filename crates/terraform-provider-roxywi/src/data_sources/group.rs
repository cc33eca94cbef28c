// Look up a group by ID or by name.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_provider::schema::Schema;
use tf_provider::value::{Value, ValueEmpty};
use tf_provider::{DataSource, Diagnostics, map};
use tracing::debug;

use crate::error::{ProviderError, attribute_error};
use crate::provider::SharedClient;
use crate::schema::{block, computed, defaulted, string};
use crate::value::{Str, is_unknown, known};

const NAME: &str = "roxywi_group";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupLookup {
    pub id: Str,
    pub name: Str,
    pub description: Str,
}

pub struct GroupDataSource {
    client: SharedClient,
}

impl GroupDataSource {
    pub fn new(client: SharedClient) -> Self {
        Self { client }
    }
}

/// Exactly one of `id` or `name`; unknown values are assumed set.
fn check_selector(diags: &mut Diagnostics, lookup: &GroupLookup) -> Option<()> {
    let set = |v: &Str| is_unknown(v) || known(v).is_some_and(|s| !s.is_empty());
    match (set(&lookup.id), set(&lookup.name)) {
        (true, false) | (false, true) => Some(()),
        (true, true) => {
            attribute_error(diags, "name", "only one of id or name may be set");
            None
        }
        (false, false) => {
            attribute_error(diags, "id", "one of id or name must be set");
            None
        }
    }
}

#[async_trait]
impl DataSource for GroupDataSource {
    type State<'a> = GroupLookup;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(Schema {
            version: 1,
            block: block(
                "Looks up a Roxy-WI group",
                map! {
                    "id" => defaulted(string(), "Group ID; set this or name"),
                    "name" => defaulted(string(), "Group name; set this or id"),
                    "description" => computed(string(), "Group description"),
                },
            ),
        })
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::State<'a>) -> Option<()> {
        check_selector(diags, &config)
    }

    async fn read<'a>(
        &self,
        diags: &mut Diagnostics,
        config: Self::State<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<Self::State<'a>> {
        check_selector(diags, &config)?;
        let client = super::configured(&self.client, diags, NAME)?;

        let found = match (known(&config.id).filter(|id| !id.is_empty()), known(&config.name)) {
            (Some(id), _) => {
                debug!(id = %id, "looking up group by ID");
                client.get_group(id).await.map(|g| (id.clone(), g))
            }
            (None, Some(name)) => {
                debug!(name = %name, "looking up group by name");
                client.find_group_by_name(name).await.map(|g| (g.group_id.clone(), g))
            }
            (None, None) => {
                diags.root_error_short(format!("{NAME}: one of id or name must be set"));
                return None;
            }
        };

        match found {
            Ok((id, group)) => Some(GroupLookup {
                id: Value::Value(id),
                name: Value::Value(group.name),
                description: Value::Value(group.description),
            }),
            Err(e) => {
                ProviderError::from(e).report(diags, &format!("Error reading {NAME}"));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(id: Str, name: Str) -> GroupLookup {
        GroupLookup {
            id,
            name,
            ..GroupLookup::default()
        }
    }

    #[test]
    fn exactly_one_selector() {
        let mut diags = Diagnostics::default();
        assert!(check_selector(&mut diags, &lookup(Value::Value("1".into()), Value::Null)).is_some());
        assert!(check_selector(&mut diags, &lookup(Value::Null, Value::Unknown)).is_some());
        assert!(check_selector(&mut diags, &lookup(Value::Null, Value::Null)).is_none());
        assert!(
            check_selector(
                &mut diags,
                &lookup(Value::Value("1".into()), Value::Value("ops".into()))
            )
            .is_none()
        );
    }
}
