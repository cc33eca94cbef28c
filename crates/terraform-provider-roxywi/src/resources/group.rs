use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_provider::map;
use tf_provider::schema::Block;

use roxywi_api::RoxyClient;
use roxywi_api::groups::GroupRequest;

use crate::error::ProviderError;
use crate::resource::ResourceKind;
use crate::schema::{block, optional, required, string};
use crate::value::{Str, refreshed, text};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupState {
    pub id: Str,
    pub name: Str,
    pub description: Str,
}

impl GroupState {
    fn request(&self) -> GroupRequest {
        GroupRequest {
            name: text(&self.name),
            description: text(&self.description),
        }
    }
}

pub struct Group;

#[async_trait]
impl ResourceKind for Group {
    type State = GroupState;
    const NAME: &'static str = "roxywi_group";

    fn schema(&self) -> Block {
        block(
            "A Roxy-WI group. Servers, credentials and channels belong to a group",
            map! {
                "name" => required(string(), "Group name"),
                "description" => optional(string(), "Group description"),
            },
        )
    }

    fn id<'s>(&self, state: &'s GroupState) -> &'s Str {
        &state.id
    }

    fn set_id(&self, state: &mut GroupState, id: Str) {
        state.id = id;
    }

    async fn create(&self, client: &RoxyClient, plan: &GroupState) -> Result<String, ProviderError> {
        Ok(client.create_group(&plan.request()).await?)
    }

    async fn read(
        &self,
        client: &RoxyClient,
        id: &str,
        prior: &GroupState,
    ) -> Result<Option<GroupState>, ProviderError> {
        let group = client.get_group(id).await?;
        Ok(Some(GroupState {
            id: prior.id.clone(),
            name: refreshed(&prior.name, group.name),
            description: refreshed(&prior.description, group.description),
        }))
    }

    async fn update(
        &self,
        client: &RoxyClient,
        id: &str,
        _prior: &GroupState,
        plan: &GroupState,
    ) -> Result<(), ProviderError> {
        Ok(client.update_group(id, &plan.request()).await?)
    }

    async fn delete(&self, client: &RoxyClient, id: &str, _state: &GroupState) -> Result<(), ProviderError> {
        Ok(client.delete_group(id).await?)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use secrecy::SecretString;
    use serde_json::json;
    use tf_provider::value::Value;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use roxywi_api::TransportConfig;

    use super::*;

    async fn setup() -> (MockServer, RoxyClient) {
        let server = MockServer::start().await;
        let client = RoxyClient::new(&server.uri(), &TransportConfig::default())
            .unwrap()
            .with_token(SecretString::from("test-token"));
        (server, client)
    }

    #[tokio::test]
    async fn create_sends_empty_description_for_null() {
        let (server, client) = setup().await;
        Mock::given(method("POST"))
            .and(path("/api/group"))
            .and(body_json(json!({"name": "ops", "description": ""})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 4})))
            .expect(1)
            .mount(&server)
            .await;

        let plan = GroupState {
            name: Value::Value("ops".into()),
            ..GroupState::default()
        };
        assert_eq!(Group.create(&client, &plan).await.unwrap(), "4");
    }

    #[tokio::test]
    async fn read_keeps_unset_description_null() {
        let (server, client) = setup().await;
        Mock::given(method("GET"))
            .and(path("/api/group/4"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "ops", "description": ""})))
            .mount(&server)
            .await;

        let prior = GroupState {
            id: Value::Value("4".into()),
            name: Value::Value("old".into()),
            description: Value::Null,
        };
        let fresh = Group.read(&client, "4", &prior).await.unwrap().unwrap();
        assert_eq!(
            fresh,
            GroupState {
                id: Value::Value("4".into()),
                name: Value::Value("ops".into()),
                description: Value::Null,
            }
        );
    }

    #[tokio::test]
    async fn read_reports_description_drift() {
        let (server, client) = setup().await;
        Mock::given(method("GET"))
            .and(path("/api/group/4"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"name": "ops", "description": "edited in UI"})),
            )
            .mount(&server)
            .await;

        let prior = GroupState {
            id: Value::Value("4".into()),
            name: Value::Value("ops".into()),
            description: Value::Null,
        };
        let fresh = Group.read(&client, "4", &prior).await.unwrap().unwrap();
        assert_eq!(fresh.description, Value::Value("edited in UI".into()));
    }

    #[tokio::test]
    async fn read_of_deleted_group_is_not_found() {
        let (server, client) = setup().await;
        Mock::given(method("GET"))
            .and(path("/api/group/4"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = Group.read(&client, "4", &GroupState::default()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn update_puts_to_group_id() {
        let (server, client) = setup().await;
        Mock::given(method("PUT"))
            .and(path("/api/group/4"))
            .and(body_json(json!({"name": "ops", "description": "on call"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"status": "Ok"})))
            .expect(1)
            .mount(&server)
            .await;

        let plan = GroupState {
            id: Value::Value("4".into()),
            name: Value::Value("ops".into()),
            description: Value::Value("on call".into()),
        };
        Group.update(&client, "4", &GroupState::default(), &plan).await.unwrap();
    }
}
