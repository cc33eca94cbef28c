// Notification channel endpoints
//
// Channels are keyed by receiver type in the URL: telegram, slack,
// pd (PagerDuty) or mm (Mattermost).

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString, VariantNames};
use tracing::debug;

use crate::client::RoxyClient;
use crate::error::Error;
use crate::wire;

/// Receiver kinds accepted in `/api/channel/{receiver}`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr, VariantNames,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Receiver {
    Telegram,
    Slack,
    #[strum(serialize = "pd")]
    PagerDuty,
    #[strum(serialize = "mm")]
    Mattermost,
}

/// The same shape is sent and received.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    #[serde(default, with = "wire::flex_string")]
    pub receiver: String,
    #[serde(default, with = "wire::quoted_text")]
    pub channel: String,
    #[serde(default, with = "wire::flex_int")]
    pub group_id: i64,
    #[serde(default, with = "wire::flex_string")]
    pub token: String,
}

impl RoxyClient {
    /// `POST /api/channel/{receiver}`
    pub async fn create_channel(&self, receiver: Receiver, channel: &Channel) -> Result<String, Error> {
        debug!(%receiver, "creating notification channel");
        self.create(&format!("/api/channel/{receiver}"), channel).await
    }

    /// `GET /api/channel/{receiver}/{id}`
    pub async fn get_channel(&self, receiver: Receiver, id: &str) -> Result<Channel, Error> {
        self.get(&format!("/api/channel/{receiver}/{id}")).await
    }

    /// `PUT /api/channel/{receiver}/{id}`
    pub async fn update_channel(
        &self,
        receiver: Receiver,
        id: &str,
        channel: &Channel,
    ) -> Result<(), Error> {
        debug!(%receiver, id, "updating notification channel");
        let _: serde_json::Value = self
            .put(&format!("/api/channel/{receiver}/{id}"), channel)
            .await?;
        Ok(())
    }

    /// `DELETE /api/channel/{receiver}/{id}`
    pub async fn delete_channel(&self, receiver: Receiver, id: &str) -> Result<(), Error> {
        debug!(%receiver, id, "deleting notification channel");
        self.delete(&format!("/api/channel/{receiver}/{id}")).await
    }
}
