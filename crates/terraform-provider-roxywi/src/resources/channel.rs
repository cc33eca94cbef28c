use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::VariantNames;
use tf_provider::map;
use tf_provider::schema::Block;
use tf_provider::value::Value;

use roxywi_api::RoxyClient;
use roxywi_api::channels::{Channel as ApiChannel, Receiver};

use crate::error::ProviderError;
use crate::resource::ResourceKind;
use crate::schema::{block, number, required, sensitive, string};
use crate::validate::Validator;
use crate::value::{Int, Str, as_str, int, refreshed, split_id, text};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelState {
    pub id: Str,
    pub receiver: Str,
    pub channel: Str,
    pub token: Str,
    pub group_id: Int,
}

impl ChannelState {
    fn receiver(&self) -> Result<Receiver, ProviderError> {
        let raw = as_str(&self.receiver);
        Receiver::from_str(raw)
            .map_err(|_| ProviderError::Invalid(format!("unsupported receiver: {raw}")))
    }

    fn request(&self) -> ApiChannel {
        ApiChannel {
            receiver: text(&self.receiver).to_ascii_lowercase(),
            channel: text(&self.channel),
            group_id: int(&self.group_id),
            token: text(&self.token),
        }
    }
}

pub struct Channel;

#[async_trait]
impl ResourceKind for Channel {
    type State = ChannelState;
    const NAME: &'static str = "roxywi_channel";

    fn schema(&self) -> Block {
        block(
            "A notification channel (Telegram, Slack, PagerDuty or Mattermost)",
            map! {
                "receiver" => required(string(), "telegram, slack, pd or mm. Changing it recreates the channel"),
                "channel" => required(string(), "Channel name"),
                "token" => sensitive(required(string(), "Bot or integration token")),
                "group_id" => required(number(), "Owning group ID"),
            },
        )
    }

    fn validate(&self, state: &ChannelState, checks: &mut Validator) {
        checks.one_of_ignore_case("receiver", &state.receiver, Receiver::VARIANTS);
    }

    fn id<'s>(&self, state: &'s ChannelState) -> &'s Str {
        &state.id
    }

    fn set_id(&self, state: &mut ChannelState, id: Str) {
        state.id = id;
    }

    fn replaced_fields(&self, prior: &ChannelState, proposed: &ChannelState) -> Vec<&'static str> {
        match (&prior.receiver, &proposed.receiver) {
            (Value::Value(a), Value::Value(b)) if a.eq_ignore_ascii_case(b) => Vec::new(),
            (a, b) if a == b => Vec::new(),
            _ => vec!["receiver"],
        }
    }

    async fn create(&self, client: &RoxyClient, plan: &ChannelState) -> Result<String, ProviderError> {
        Ok(client.create_channel(plan.receiver()?, &plan.request()).await?)
    }

    async fn read(
        &self,
        client: &RoxyClient,
        id: &str,
        prior: &ChannelState,
    ) -> Result<Option<ChannelState>, ProviderError> {
        let channel = client.get_channel(prior.receiver()?, id).await?;
        Ok(Some(ChannelState {
            channel: refreshed(&prior.channel, channel.channel),
            group_id: refreshed(&prior.group_id, channel.group_id),
            ..prior.clone()
        }))
    }

    async fn update(
        &self,
        client: &RoxyClient,
        id: &str,
        _prior: &ChannelState,
        plan: &ChannelState,
    ) -> Result<(), ProviderError> {
        Ok(client
            .update_channel(plan.receiver()?, id, &plan.request())
            .await?)
    }

    async fn delete(&self, client: &RoxyClient, id: &str, state: &ChannelState) -> Result<(), ProviderError> {
        Ok(client.delete_channel(state.receiver()?, id).await?)
    }

    /// The URL needs the receiver, so imports use `"{receiver}-{id}"`.
    fn import_state(&self, id: &str) -> Result<ChannelState, ProviderError> {
        let parts = split_id(id, 2)?;
        let state = ChannelState {
            id: Value::Value(parts[1].to_owned()),
            receiver: Value::Value(parts[0].to_ascii_lowercase()),
            ..ChannelState::default()
        };
        state.receiver()?;
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receiver_is_case_insensitive() {
        let state = ChannelState {
            receiver: Value::Value("Telegram".into()),
            ..ChannelState::default()
        };
        assert_eq!(state.receiver().unwrap(), Receiver::Telegram);
        assert_eq!(state.request().receiver, "telegram");

        let mut checks = Validator::new();
        Channel.validate(&state, &mut checks);
        assert!(checks.is_ok());
    }

    #[test]
    fn import_needs_receiver_prefix() {
        let state = Channel.import_state("pd-12").unwrap();
        assert_eq!(state.id, Value::Value("12".to_owned()));
        assert_eq!(state.receiver().unwrap(), Receiver::PagerDuty);
        assert!(Channel.import_state("12").is_err());
        assert!(Channel.import_state("fax-12").is_err());
    }

    #[test]
    fn receiver_case_does_not_force_replacement() {
        let imported = Channel.import_state("telegram-3").unwrap();
        let configured = ChannelState {
            receiver: Value::Value("Telegram".into()),
            ..imported.clone()
        };
        assert!(Channel.replaced_fields(&imported, &configured).is_empty());

        let moved = ChannelState {
            receiver: Value::Value("slack".into()),
            ..imported.clone()
        };
        assert_eq!(Channel.replaced_fields(&imported, &moved), ["receiver"]);
    }
}
