// Generic resource lifecycle
//
// Every Roxy-WI resource follows the same plan/apply shape; a `ResourceKind`
// supplies the schema, defaults and the four API calls, and `ApiResource`
// turns that into a `tf_provider::Resource`.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tf_provider::schema::{Block, Schema};
use tf_provider::value::{Value, ValueEmpty};
use tf_provider::{AttributePath, Diagnostics, Resource};
use tracing::{debug, info};

use roxywi_api::RoxyClient;

use crate::error::ProviderError;
use crate::provider::SharedClient;
use crate::schema;
use crate::validate::Validator;

#[async_trait]
pub trait ResourceKind: Send + Sync + 'static {
    type State: Serialize + DeserializeOwned + Clone + Default + Debug + Send + Sync;

    /// Full resource type name, for logs and diagnostics.
    const NAME: &'static str;

    /// Schema block without `id`.
    fn schema(&self) -> Block;

    fn validate(&self, _state: &Self::State, _checks: &mut Validator) {}

    /// Fill schema defaults for attributes left null.
    fn apply_defaults(&self, _state: &mut Self::State) {}

    fn id<'s>(&self, state: &'s Self::State) -> &'s Value<String>;

    fn set_id(&self, state: &mut Self::State, id: Value<String>);

    /// Force-new attributes whose value differs between the two states.
    fn replaced_fields(&self, _prior: &Self::State, _proposed: &Self::State) -> Vec<&'static str> {
        Vec::new()
    }

    /// Create the remote object and return its state ID.
    async fn create(&self, client: &RoxyClient, plan: &Self::State) -> Result<String, ProviderError>;

    /// Refresh `prior` from the API. `None` means the object is gone.
    async fn read(
        &self,
        client: &RoxyClient,
        id: &str,
        prior: &Self::State,
    ) -> Result<Option<Self::State>, ProviderError>;

    async fn update(
        &self,
        client: &RoxyClient,
        id: &str,
        prior: &Self::State,
        plan: &Self::State,
    ) -> Result<(), ProviderError>;

    async fn delete(&self, client: &RoxyClient, id: &str, state: &Self::State) -> Result<(), ProviderError>;

    /// Seed for `terraform import`; the ID must parse the way create built it.
    /// A seed may carry a different state ID than the one imported.
    fn import_state(&self, id: &str) -> Result<Self::State, ProviderError> {
        let mut state = Self::State::default();
        self.set_id(&mut state, Value::Value(id.to_owned()));
        Ok(state)
    }
}

/// Names of force-new attributes that changed.
pub fn changed<T: PartialEq>(name: &'static str, prior: &T, proposed: &T, out: &mut Vec<&'static str>) {
    if prior != proposed {
        out.push(name);
    }
}

pub struct ApiResource<K> {
    kind: K,
    client: SharedClient,
}

impl<K: ResourceKind> ApiResource<K> {
    pub fn new(kind: K, client: SharedClient) -> Self {
        Self { kind, client }
    }

    fn client(&self, diags: &mut Diagnostics) -> Option<Arc<RoxyClient>> {
        let client = self.client.load_full();
        if client.is_none() {
            ProviderError::NotConfigured.report(diags, K::NAME);
        }
        client
    }

    async fn read_back(
        &self,
        diags: &mut Diagnostics,
        client: &RoxyClient,
        mut state: K::State,
        id: String,
        operation: &str,
    ) -> Option<K::State> {
        self.kind.set_id(&mut state, Value::Value(id.clone()));
        match self.kind.read(client, &id, &state).await {
            Ok(Some(mut fresh)) => {
                self.kind.set_id(&mut fresh, Value::Value(id));
                Some(fresh)
            }
            Ok(None) => {
                diags.root_error(
                    format!("Error reading {} after {operation}", K::NAME),
                    format!("{} {id} was not found", K::NAME),
                );
                None
            }
            Err(e) => {
                e.report(diags, &format!("Error reading {} after {operation}", K::NAME));
                None
            }
        }
    }
}

fn known_id<S>(kind: &impl ResourceKind<State = S>, state: &S) -> Option<String> {
    match kind.id(state) {
        Value::Value(id) if !id.is_empty() => Some(id.clone()),
        _ => None,
    }
}

#[async_trait]
impl<K: ResourceKind> Resource for ApiResource<K> {
    type State<'a> = Value<K::State>;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(schema::with_id(self.kind.schema()))
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::State<'a>) -> Option<()> {
        let Value::Value(config) = config else {
            return Some(());
        };
        let mut checks = Validator::new();
        self.kind.validate(&config, &mut checks);
        checks.report(diags)
    }

    async fn read<'a>(
        &self,
        diags: &mut Diagnostics,
        state: Self::State<'a>,
        private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let Value::Value(prior) = state else {
            return Some((Value::Null, private_state));
        };
        let Some(id) = known_id(&self.kind, &prior) else {
            return Some((Value::Null, private_state));
        };
        let client = self.client(diags)?;

        debug!(resource = K::NAME, id = %id, "refreshing");
        match self.kind.read(&client, &id, &prior).await {
            Ok(Some(mut fresh)) => {
                self.kind.set_id(&mut fresh, Value::Value(id));
                Some((Value::Value(fresh), private_state))
            }
            Ok(None) => {
                info!(resource = K::NAME, id = %id, "not found, removing from state");
                Some((Value::Null, private_state))
            }
            Err(e) if e.is_not_found() => {
                info!(resource = K::NAME, id = %id, "not found, removing from state");
                Some((Value::Null, private_state))
            }
            Err(e) => {
                e.report(diags, &format!("Error reading {}", K::NAME));
                None
            }
        }
    }

    async fn plan_create<'a>(
        &self,
        _diags: &mut Diagnostics,
        proposed_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        match proposed_state {
            Value::Value(mut state) => {
                self.kind.apply_defaults(&mut state);
                self.kind.set_id(&mut state, Value::Unknown);
                Some((Value::Value(state), ValueEmpty::default()))
            }
            other => Some((other, ValueEmpty::default())),
        }
    }

    async fn plan_update<'a>(
        &self,
        _diags: &mut Diagnostics,
        prior_state: Self::State<'a>,
        proposed_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        prior_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(
        Self::State<'a>,
        Self::PrivateState<'a>,
        Vec<AttributePath>,
    )> {
        let (Value::Value(prior), Value::Value(mut state)) = (prior_state, proposed_state.clone()) else {
            return Some((proposed_state, prior_private_state, Vec::new()));
        };
        self.kind.apply_defaults(&mut state);
        self.kind.set_id(&mut state, self.kind.id(&prior).clone());

        let replace = self
            .kind
            .replaced_fields(&prior, &state)
            .into_iter()
            .map(|name| AttributePath::new(name))
            .collect();
        Some((Value::Value(state), prior_private_state, replace))
    }

    async fn plan_destroy<'a>(
        &self,
        _diags: &mut Diagnostics,
        _prior_state: Self::State<'a>,
        prior_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<Self::PrivateState<'a>> {
        Some(prior_private_state)
    }

    async fn create<'a>(
        &self,
        diags: &mut Diagnostics,
        planned_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let Value::Value(plan) = planned_state else {
            diags.root_error_short(format!("{}: nothing to create", K::NAME));
            return None;
        };
        let client = self.client(diags)?;

        let id = match self.kind.create(&client, &plan).await {
            Ok(id) => id,
            Err(e) => {
                e.report(diags, &format!("Error creating {}", K::NAME));
                return None;
            }
        };
        info!(resource = K::NAME, id = %id, "created");

        let state = self.read_back(diags, &client, plan, id, "create").await?;
        Some((Value::Value(state), private_state))
    }

    async fn update<'a>(
        &self,
        diags: &mut Diagnostics,
        prior_state: Self::State<'a>,
        planned_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let (Value::Value(prior), Value::Value(plan)) = (prior_state, planned_state) else {
            diags.root_error_short(format!("{}: nothing to update", K::NAME));
            return None;
        };
        let Some(id) = known_id(&self.kind, &prior) else {
            diags.root_error_short(format!("{}: missing ID in state", K::NAME));
            return None;
        };
        let client = self.client(diags)?;

        if let Err(e) = self.kind.update(&client, &id, &prior, &plan).await {
            e.report(diags, &format!("Error updating {}", K::NAME));
            return None;
        }
        info!(resource = K::NAME, id = %id, "updated");

        let state = self.read_back(diags, &client, plan, id, "update").await?;
        Some((Value::Value(state), private_state))
    }

    async fn destroy<'a>(
        &self,
        diags: &mut Diagnostics,
        state: Self::State<'a>,
        _planned_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<()> {
        let Value::Value(state) = state else {
            return Some(());
        };
        let Some(id) = known_id(&self.kind, &state) else {
            return Some(());
        };
        let client = self.client(diags)?;

        match self.kind.delete(&client, &id, &state).await {
            Ok(()) => {
                info!(resource = K::NAME, id = %id, "deleted");
                Some(())
            }
            Err(e) => {
                e.report(diags, &format!("Error deleting {}", K::NAME));
                None
            }
        }
    }

    async fn import<'a>(
        &self,
        diags: &mut Diagnostics,
        id: String,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let seed = match self.kind.import_state(&id) {
            Ok(seed) => seed,
            Err(e) => {
                e.report(diags, &format!("Error importing {}", K::NAME));
                return None;
            }
        };
        let client = self.client(diags)?;
        let id = known_id(&self.kind, &seed).unwrap_or(id);
        let state = self.read_back(diags, &client, seed, id, "import").await?;
        Some((Value::Value(state), ValueEmpty::default()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use arc_swap::ArcSwapOption;
    use pretty_assertions::assert_eq;
    use serde::Deserialize;
    use tf_provider::schema::Attribute;
    use tf_provider::map;

    use roxywi_api::TransportConfig;

    use super::*;
    use crate::value::{Int, Str, default_to};

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Widget {
        id: Str,
        name: Str,
        size: Int,
    }

    /// Keeps the remote object in memory; `read_status` makes every read fail.
    #[derive(Default)]
    struct Widgets {
        stored: Mutex<Option<Widget>>,
        read_status: Option<u16>,
    }

    #[async_trait]
    impl ResourceKind for Widgets {
        type State = Widget;
        const NAME: &'static str = "roxywi_widget";

        fn schema(&self) -> Block {
            Block {
                attributes: map! {
                    "name" => Attribute::default(),
                    "size" => Attribute::default(),
                },
                ..Default::default()
            }
        }

        fn validate(&self, state: &Widget, checks: &mut Validator) {
            if crate::value::as_str(&state.name).is_empty() {
                checks.reject("name", "name must not be empty");
            }
        }

        fn apply_defaults(&self, state: &mut Widget) {
            default_to(&mut state.size, 1);
        }

        fn id<'s>(&self, state: &'s Widget) -> &'s Str {
            &state.id
        }

        fn set_id(&self, state: &mut Widget, id: Str) {
            state.id = id;
        }

        fn replaced_fields(&self, prior: &Widget, proposed: &Widget) -> Vec<&'static str> {
            let mut out = Vec::new();
            changed("name", &prior.name, &proposed.name, &mut out);
            out
        }

        async fn create(&self, _client: &RoxyClient, plan: &Widget) -> Result<String, ProviderError> {
            *self.stored.lock().unwrap() = Some(plan.clone());
            Ok("11".to_owned())
        }

        async fn read(
            &self,
            _client: &RoxyClient,
            _id: &str,
            _prior: &Widget,
        ) -> Result<Option<Widget>, ProviderError> {
            if let Some(status) = self.read_status {
                return Err(roxywi_api::Error::Api {
                    status,
                    message: "{\"error\": \"nope\"}".to_owned(),
                }
                .into());
            }
            Ok(self.stored.lock().unwrap().clone())
        }

        async fn update(
            &self,
            _client: &RoxyClient,
            _id: &str,
            _prior: &Widget,
            plan: &Widget,
        ) -> Result<(), ProviderError> {
            *self.stored.lock().unwrap() = Some(plan.clone());
            Ok(())
        }

        async fn delete(&self, _client: &RoxyClient, _id: &str, _state: &Widget) -> Result<(), ProviderError> {
            *self.stored.lock().unwrap() = None;
            Ok(())
        }

        fn import_state(&self, id: &str) -> Result<Widget, ProviderError> {
            let id = id
                .strip_prefix("widget/")
                .ok_or_else(|| ProviderError::InvalidId(id.to_owned()))?;
            Ok(Widget {
                id: Value::Value(id.to_owned()),
                ..Widget::default()
            })
        }
    }

    fn configured(kind: Widgets) -> ApiResource<Widgets> {
        let client = RoxyClient::new("http://127.0.0.1:9", &TransportConfig::default()).unwrap();
        ApiResource::new(kind, Arc::new(ArcSwapOption::from_pointee(client)))
    }

    fn unconfigured(kind: Widgets) -> ApiResource<Widgets> {
        ApiResource::new(kind, Arc::new(ArcSwapOption::empty()))
    }

    fn widget(id: Str, name: &str, size: Int) -> Widget {
        Widget {
            id,
            name: Value::Value(name.to_owned()),
            size,
        }
    }

    fn stored(name: &str, size: i64) -> Widgets {
        Widgets {
            stored: Mutex::new(Some(widget(Value::Null, name, Value::Value(size)))),
            ..Widgets::default()
        }
    }

    #[test]
    fn schema_adds_computed_id() {
        let res = unconfigured(Widgets::default());
        let schema = Resource::schema(&res, &mut Diagnostics::default()).unwrap();
        assert!(schema.block.attributes.contains_key("id"));
        assert!(schema.block.attributes.contains_key("name"));
    }

    #[tokio::test]
    async fn validate_reports_on_the_attribute() {
        let res = unconfigured(Widgets::default());
        let mut diags = Diagnostics::default();
        let config = Value::Value(widget(Value::Null, "", Value::Null));

        assert!(res.validate(&mut diags, config).await.is_none());
        assert_eq!(diags.errors.len(), 1);
        assert_eq!(diags.errors[0].attribute, AttributePath::new("name"));
    }

    #[tokio::test]
    async fn plan_create_fills_defaults_and_leaves_id_unknown() {
        let res = unconfigured(Widgets::default());
        let mut diags = Diagnostics::default();
        let proposed = Value::Value(widget(Value::Null, "web", Value::Null));

        let (planned, _) = res
            .plan_create(&mut diags, proposed.clone(), proposed, ValueEmpty::default())
            .await
            .unwrap();
        assert_eq!(planned, Value::Value(widget(Value::Unknown, "web", Value::Value(1))));
    }

    #[tokio::test]
    async fn plan_update_keeps_id_and_flags_force_new() {
        let res = unconfigured(Widgets::default());
        let mut diags = Diagnostics::default();
        let prior = Value::Value(widget(Value::Value("11".into()), "web", Value::Value(1)));
        let proposed = Value::Value(widget(Value::Unknown, "db", Value::Null));

        let (planned, _, replace) = res
            .plan_update(
                &mut diags,
                prior,
                proposed.clone(),
                proposed,
                ValueEmpty::default(),
                ValueEmpty::default(),
            )
            .await
            .unwrap();
        assert_eq!(planned, Value::Value(widget(Value::Value("11".into()), "db", Value::Value(1))));
        assert_eq!(replace, vec![AttributePath::new("name")]);
    }

    #[tokio::test]
    async fn plan_update_in_place_has_no_replacements() {
        let res = unconfigured(Widgets::default());
        let mut diags = Diagnostics::default();
        let prior = Value::Value(widget(Value::Value("11".into()), "web", Value::Value(1)));
        let proposed = Value::Value(widget(Value::Value("11".into()), "web", Value::Value(4)));

        let (_, _, replace) = res
            .plan_update(
                &mut diags,
                prior,
                proposed.clone(),
                proposed,
                ValueEmpty::default(),
                ValueEmpty::default(),
            )
            .await
            .unwrap();
        assert!(replace.is_empty());
    }

    #[tokio::test]
    async fn create_reads_back_with_returned_id() {
        let res = configured(Widgets::default());
        let mut diags = Diagnostics::default();
        let plan = Value::Value(widget(Value::Unknown, "web", Value::Value(3)));

        let (state, _) = res
            .create(&mut diags, plan.clone(), plan, ValueEmpty::default(), ValueEmpty::default())
            .await
            .unwrap();
        assert!(diags.errors.is_empty());
        assert_eq!(state, Value::Value(widget(Value::Value("11".into()), "web", Value::Value(3))));
    }

    #[tokio::test]
    async fn create_without_configuration_fails() {
        let res = unconfigured(Widgets::default());
        let mut diags = Diagnostics::default();
        let plan = Value::Value(widget(Value::Unknown, "web", Value::Value(3)));

        let created = res
            .create(&mut diags, plan.clone(), plan, ValueEmpty::default(), ValueEmpty::default())
            .await;
        assert!(created.is_none());
        assert_eq!(diags.errors[0].detail, "provider not configured");
    }

    #[tokio::test]
    async fn read_refreshes_from_remote() {
        let res = configured(stored("web", 8));
        let mut diags = Diagnostics::default();
        let prior = Value::Value(widget(Value::Value("11".into()), "web", Value::Value(3)));

        let (state, _) = res
            .read(&mut diags, prior, ValueEmpty::default(), ValueEmpty::default())
            .await
            .unwrap();
        assert_eq!(state, Value::Value(widget(Value::Value("11".into()), "web", Value::Value(8))));
    }

    #[tokio::test]
    async fn read_of_missing_object_drops_state() {
        let res = configured(Widgets::default());
        let mut diags = Diagnostics::default();
        let prior = Value::Value(widget(Value::Value("11".into()), "web", Value::Value(3)));

        let (state, _) = res
            .read(&mut diags, prior, ValueEmpty::default(), ValueEmpty::default())
            .await
            .unwrap();
        assert_eq!(state, Value::Null);
        assert!(diags.errors.is_empty());
    }

    #[tokio::test]
    async fn read_404_drops_state() {
        let res = configured(Widgets {
            read_status: Some(404),
            ..Widgets::default()
        });
        let mut diags = Diagnostics::default();
        let prior = Value::Value(widget(Value::Value("11".into()), "web", Value::Value(3)));

        let (state, _) = res
            .read(&mut diags, prior, ValueEmpty::default(), ValueEmpty::default())
            .await
            .unwrap();
        assert_eq!(state, Value::Null);
        assert!(diags.errors.is_empty());
    }

    #[tokio::test]
    async fn read_500_is_an_error() {
        let res = configured(Widgets {
            read_status: Some(500),
            ..Widgets::default()
        });
        let mut diags = Diagnostics::default();
        let prior = Value::Value(widget(Value::Value("11".into()), "web", Value::Value(3)));

        let refreshed = res
            .read(&mut diags, prior, ValueEmpty::default(), ValueEmpty::default())
            .await;
        assert!(refreshed.is_none());
        assert_eq!(diags.errors[0].summary, "Error reading roxywi_widget");
        assert!(diags.errors[0].detail.contains("500"));
    }

    #[tokio::test]
    async fn read_without_id_needs_no_client() {
        let res = unconfigured(Widgets::default());
        let mut diags = Diagnostics::default();
        let prior = Value::Value(widget(Value::Null, "web", Value::Value(3)));

        let (state, _) = res
            .read(&mut diags, prior, ValueEmpty::default(), ValueEmpty::default())
            .await
            .unwrap();
        assert_eq!(state, Value::Null);
        assert!(diags.errors.is_empty());
    }

    #[tokio::test]
    async fn update_reads_back_new_values() {
        let res = configured(stored("web", 3));
        let mut diags = Diagnostics::default();
        let prior = Value::Value(widget(Value::Value("11".into()), "web", Value::Value(3)));
        let plan = Value::Value(widget(Value::Value("11".into()), "web", Value::Value(5)));

        let (state, _) = res
            .update(
                &mut diags,
                prior,
                plan.clone(),
                plan,
                ValueEmpty::default(),
                ValueEmpty::default(),
            )
            .await
            .unwrap();
        assert_eq!(state, Value::Value(widget(Value::Value("11".into()), "web", Value::Value(5))));
    }

    #[tokio::test]
    async fn destroy_removes_remote_object() {
        let kind = stored("web", 3);
        let res = configured(kind);
        let mut diags = Diagnostics::default();
        let state = Value::Value(widget(Value::Value("11".into()), "web", Value::Value(3)));

        assert!(res.destroy(&mut diags, state, ValueEmpty::default(), ValueEmpty::default()).await.is_some());
        assert!(res.kind.stored.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn destroy_of_null_state_is_a_no_op() {
        let res = unconfigured(Widgets::default());
        let mut diags = Diagnostics::default();

        assert!(res.destroy(&mut diags, Value::Null, ValueEmpty::default(), ValueEmpty::default()).await.is_some());
        assert!(diags.errors.is_empty());
    }

    #[tokio::test]
    async fn import_uses_id_from_seed() {
        let res = configured(stored("web", 3));
        let mut diags = Diagnostics::default();

        let (state, _) = res.import(&mut diags, "widget/11".to_owned()).await.unwrap();
        assert_eq!(state, Value::Value(widget(Value::Value("11".into()), "web", Value::Value(3))));
    }

    #[tokio::test]
    async fn import_of_missing_object_fails() {
        let res = configured(Widgets::default());
        let mut diags = Diagnostics::default();

        assert!(res.import(&mut diags, "widget/11".to_owned()).await.is_none());
        assert_eq!(diags.errors[0].summary, "Error reading roxywi_widget after import");
        assert_eq!(diags.errors[0].detail, "roxywi_widget 11 was not found");
    }

    #[tokio::test]
    async fn import_rejects_malformed_id() {
        let res = configured(Widgets::default());
        let mut diags = Diagnostics::default();

        assert!(res.import(&mut diags, "11".to_owned()).await.is_none());
        assert_eq!(diags.errors[0].detail, "invalid ID format: 11");
    }
}
