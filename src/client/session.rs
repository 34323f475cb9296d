//! Chat session facade for a display layer.
//!
//! Wires the callbacks a chat front end triggers (topic selected, message
//! submitted) to the relay client and the subscription manager.

use std::sync::Arc;

use tracing::debug;

use crate::broker::message::Message;
use crate::client::api::RelayClient;
use crate::client::sink::DisplaySink;
use crate::client::subscription::{SubscriptionManager, SubscriptionState};
use crate::utils::RelayError;

pub struct ChatSession<S: DisplaySink> {
    client: Arc<RelayClient>,
    name: String,
    sink: Arc<S>,
    subscriptions: SubscriptionManager<RelayClient, S>,
}

impl<S: DisplaySink> ChatSession<S> {
    /// `name` is the sender name stamped on every submitted message.
    pub fn new(client: RelayClient, name: impl Into<String>, sink: Arc<S>) -> Self {
        let client = Arc::new(client);
        let subscriptions = SubscriptionManager::new(client.clone(), sink.clone());
        Self {
            client,
            name: name.into(),
            sink,
            subscriptions,
        }
    }

    /// Fetches the topic list and hands it to the sink.
    pub async fn load_topics(&self) -> Result<Vec<String>, RelayError> {
        let topics = self.client.list_topics().await?;
        self.sink.on_topic_list_loaded(&topics);
        Ok(topics)
    }

    pub async fn on_topic_selected(&self, topic: &str) -> Result<(), RelayError> {
        self.subscriptions.select_topic(topic).await
    }

    /// Publishes `text` to the current topic.
    ///
    /// Returns `Ok(false)` without sending when the text is blank or no topic
    /// is selected.
    pub async fn on_message_submitted(&self, text: &str) -> Result<bool, RelayError> {
        if text.trim().is_empty() {
            return Ok(false);
        }
        let Some(topic) = self.subscriptions.current_topic() else {
            debug!("no topic selected, message not sent");
            return Ok(false);
        };

        let message = Message::new(self.name.as_str(), text, topic);
        self.client.publish(&message).await?;
        Ok(true)
    }

    pub fn state(&self) -> SubscriptionState {
        self.subscriptions.state()
    }

    pub fn history(&self) -> Vec<Message> {
        self.subscriptions.history()
    }

    pub async fn close(&self) {
        self.subscriptions.unsubscribe().await;
    }
}
