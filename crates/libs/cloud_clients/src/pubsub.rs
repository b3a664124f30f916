use crate::{storage::api_error, CloudError, TokenSource};
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const PUBSUB_API: &str = "https://pubsub.googleapis.com";

/// One pulled bus message with its decoded payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
    pub ack_id: String,
    pub message_id: String,
    pub data: String,
}

#[derive(Serialize)]
struct PullRequest {
    #[serde(rename = "maxMessages")]
    max_messages: u32,
}

#[derive(Deserialize, Default)]
struct PullResponse {
    #[serde(rename = "receivedMessages", default)]
    received_messages: Vec<WireReceivedMessage>,
}

#[derive(Deserialize)]
struct WireReceivedMessage {
    #[serde(rename = "ackId")]
    ack_id: String,
    message: WireMessage,
}

#[derive(Deserialize)]
struct WireMessage {
    #[serde(default)]
    data: String,
    #[serde(rename = "messageId", default)]
    message_id: String,
}

#[derive(Serialize)]
struct AcknowledgeRequest<'a> {
    #[serde(rename = "ackIds")]
    ack_ids: &'a [String],
}

/// Bus client bound to one project. Delivery is at-least-once; consumers that
/// do not acknowledge see redelivery after the subscription's ack deadline.
#[derive(Clone)]
pub struct PubSubClient {
    http: reqwest::Client,
    token: Arc<TokenSource>,
    project: String,
    base_url: String,
}

impl PubSubClient {
    #[must_use]
    pub fn new(token: Arc<TokenSource>, project: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            token,
            project: project.to_string(),
            base_url: PUBSUB_API.to_string(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn subscription_url(&self, subscription: &str, verb: &str) -> String {
        format!(
            "{}/v1/projects/{}/subscriptions/{subscription}:{verb}",
            self.base_url, self.project
        )
    }

    /// Long-polls the subscription for up to `max_messages` messages.
    pub async fn pull(
        &self,
        subscription: &str,
        max_messages: u32,
    ) -> Result<Vec<ReceivedMessage>, CloudError> {
        let token = self.token.token().await?;
        let response = self
            .http
            .post(self.subscription_url(subscription, "pull"))
            .bearer_auth(token)
            .json(&PullRequest { max_messages })
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        let pulled: PullResponse = response.json().await?;
        decode_messages(pulled)
    }

    pub async fn acknowledge(
        &self,
        subscription: &str,
        ack_ids: &[String],
    ) -> Result<(), CloudError> {
        if ack_ids.is_empty() {
            return Ok(());
        }
        let token = self.token.token().await?;
        let response = self
            .http
            .post(self.subscription_url(subscription, "acknowledge"))
            .bearer_auth(token)
            .json(&AcknowledgeRequest { ack_ids })
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(())
    }
}

fn decode_messages(pulled: PullResponse) -> Result<Vec<ReceivedMessage>, CloudError> {
    pulled
        .received_messages
        .into_iter()
        .map(|wire| {
            let decoded = general_purpose::STANDARD.decode(wire.message.data)?;
            Ok(ReceivedMessage {
                ack_id: wire.ack_id,
                message_id: wire.message.message_id,
                data: String::from_utf8(decoded)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pulled_payloads_are_base64_decoded() {
        let pulled: PullResponse = serde_json::from_str(
            r#"{
                "receivedMessages": [
                    {
                        "ackId": "ack-1",
                        "message": {
                            "data": "eyJidWNrZXQiOiJiIiwibmFtZSI6Im4ifQ==",
                            "messageId": "m-1"
                        }
                    }
                ]
            }"#,
        )
        .unwrap();

        let messages = decode_messages(pulled).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].ack_id, "ack-1");
        assert_eq!(messages[0].data, r#"{"bucket":"b","name":"n"}"#);
    }

    #[test]
    fn empty_pull_yields_no_messages() {
        let pulled: PullResponse = serde_json::from_str("{}").unwrap();
        assert!(decode_messages(pulled).unwrap().is_empty());
    }
}
