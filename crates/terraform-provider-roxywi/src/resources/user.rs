use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_provider::map;
use tf_provider::schema::Block;

use roxywi_api::RoxyClient;
use roxywi_api::users::UserRequest;

use crate::error::ProviderError;
use crate::resource::ResourceKind;
use crate::schema::{block, bool, required, sensitive, string};
use crate::validate::Validator;
use crate::value::{Flag, Str, flag, refreshed, text};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserState {
    pub id: Str,
    pub username: Str,
    pub email: Str,
    pub password: Str,
    pub enabled: Flag,
}

impl UserState {
    fn request(&self) -> UserRequest {
        UserRequest {
            username: text(&self.username),
            email: text(&self.email),
            password: text(&self.password),
            enabled: flag(&self.enabled),
        }
    }
}

pub struct User;

#[async_trait]
impl ResourceKind for User {
    type State = UserState;
    const NAME: &'static str = "roxywi_user";

    fn schema(&self) -> Block {
        block(
            "A Roxy-WI user account",
            map! {
                "username" => required(string(), "Login name"),
                "email" => required(string(), "Email address"),
                "password" => sensitive(required(string(), "Password; never read back")),
                "enabled" => required(bool(), "Whether the account may log in"),
            },
        )
    }

    fn validate(&self, state: &UserState, checks: &mut Validator) {
        checks.email("email", &state.email);
        checks.not_blank("email", &state.email);
    }

    fn id<'s>(&self, state: &'s UserState) -> &'s Str {
        &state.id
    }

    fn set_id(&self, state: &mut UserState, id: Str) {
        state.id = id;
    }

    async fn create(&self, client: &RoxyClient, plan: &UserState) -> Result<String, ProviderError> {
        Ok(client.create_user(&plan.request()).await?)
    }

    async fn read(
        &self,
        client: &RoxyClient,
        id: &str,
        prior: &UserState,
    ) -> Result<Option<UserState>, ProviderError> {
        let user = client.get_user(id).await?;
        Ok(Some(UserState {
            username: refreshed(&prior.username, user.username),
            email: refreshed(&prior.email, user.email),
            enabled: refreshed(&prior.enabled, user.enabled),
            ..prior.clone()
        }))
    }

    async fn update(
        &self,
        client: &RoxyClient,
        id: &str,
        _prior: &UserState,
        plan: &UserState,
    ) -> Result<(), ProviderError> {
        Ok(client.update_user(id, &plan.request()).await?)
    }

    async fn delete(&self, client: &RoxyClient, id: &str, _state: &UserState) -> Result<(), ProviderError> {
        Ok(client.delete_user(id).await?)
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

    fn alice() -> UserState {
        UserState {
            id: Value::Value("9".into()),
            username: Value::Value("alice".into()),
            email: Value::Value("alice@example.com".into()),
            password: Value::Value("hunter2".into()),
            enabled: Value::Value(true),
        }
    }

    #[tokio::test]
    async fn create_sends_enabled_as_int() {
        let (server, client) = setup().await;
        Mock::given(method("POST"))
            .and(path("/api/user"))
            .and(body_json(json!({
                "username": "alice",
                "email": "alice@example.com",
                "password": "hunter2",
                "enabled": 1,
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 9})))
            .expect(1)
            .mount(&server)
            .await;

        assert_eq!(User.create(&client, &alice()).await.unwrap(), "9");
    }

    #[tokio::test]
    async fn read_keeps_password_from_state() {
        let (server, client) = setup().await;
        Mock::given(method("GET"))
            .and(path("/api/user/9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "username": "alice",
                "email": "alice@corp.example.com",
                "enabled": 0,
            })))
            .mount(&server)
            .await;

        let fresh = User.read(&client, "9", &alice()).await.unwrap().unwrap();
        assert_eq!(
            fresh,
            UserState {
                email: Value::Value("alice@corp.example.com".into()),
                enabled: Value::Value(false),
                ..alice()
            }
        );
    }

    #[tokio::test]
    async fn delete_targets_user_id() {
        let (server, client) = setup().await;
        Mock::given(method("DELETE"))
            .and(path("/api/user/9"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        User.delete(&client, "9", &alice()).await.unwrap();
    }

    #[test]
    fn malformed_email_is_rejected() {
        let mut checks = Validator::new();
        let state = UserState {
            email: Value::Value("not-an-email".into()),
            ..alice()
        };
        User.validate(&state, &mut checks);

        let mut diags = tf_provider::Diagnostics::default();
        assert!(checks.report(&mut diags).is_none());
        assert_eq!(diags.errors[0].attribute, tf_provider::AttributePath::new("email"));
    }

    #[test]
    fn password_is_sensitive() {
        let schema = User.schema();
        assert!(schema.attributes["password"].sensitive);
    }
}
