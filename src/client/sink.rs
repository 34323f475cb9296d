//! Outbound interface towards the display layer.

use tokio::sync::mpsc;

use crate::broker::message::Message;

/// Receives updates from the client core.
///
/// Calls arrive on the core's own tasks. A sink may read back through
/// `SubscriptionManager::history` or `state` while handling a message, but
/// a topic switch waits until the call returns, so implementations should
/// return quickly and hand heavy work to their own render loop.
pub trait DisplaySink: Send + Sync + 'static {
    fn on_message_received(&self, message: &Message);

    fn on_topic_list_loaded(&self, topics: &[String]);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayUpdate {
    TopicsLoaded(Vec<String>),
    MessageReceived(Message),
}

/// A sink that forwards every update into a channel, for display loops that
/// poll their own queue.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<DisplayUpdate>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<DisplayUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl DisplaySink for ChannelSink {
    fn on_message_received(&self, message: &Message) {
        // a closed receiver means the display is gone; nothing left to update
        let _ = self
            .tx
            .send(DisplayUpdate::MessageReceived(message.clone()));
    }

    fn on_topic_list_loaded(&self, topics: &[String]) {
        let _ = self.tx.send(DisplayUpdate::TopicsLoaded(topics.to_vec()));
    }
}
