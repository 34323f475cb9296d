//! Client-side subscription manager
//!
//! Keeps at most one live event stream, for the currently selected topic,
//! and forwards decoded messages to a [`DisplaySink`].
//!
//! Switching topics is two-phase. The old receive loop is first quiesced:
//! once no forward is in flight, the active generation is cleared and the
//! history emptied, and only then is the loop's task aborted and joined.
//! Only after that is the new stream opened. A late event of the old
//! subscription therefore either reached the sink before the switch began or
//! is never forwarded at all.
//!
//! A loop whose stream fails or ends on its own drops the manager back to
//! `Idle`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::broker::message::Message;
use crate::client::sink::DisplaySink;
use crate::client::source::{EventSource, EventStream};
use crate::utils::RelayError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionState {
    Idle,
    Subscribed(String),
}

/// State shared with the receive loop.
#[derive(Debug, Default)]
struct Shared {
    active: Option<ActiveTopic>,
    history: Vec<Message>,
}

#[derive(Debug)]
struct ActiveTopic {
    topic: String,
    generation: u64,
}

#[derive(Debug)]
struct ReceiveLoop {
    topic: String,
    task: JoinHandle<()>,
}

pub struct SubscriptionManager<E: EventSource, S: DisplaySink> {
    source: Arc<E>,
    sink: Arc<S>,
    shared: Arc<Mutex<Shared>>,
    // held by a receive loop from its generation check until the sink returns
    forwarding: Arc<Mutex<()>>,
    current: tokio::sync::Mutex<Option<ReceiveLoop>>,
    generations: AtomicU64,
}

impl<E: EventSource, S: DisplaySink> SubscriptionManager<E, S> {
    pub fn new(source: Arc<E>, sink: Arc<S>) -> Self {
        Self {
            source,
            sink,
            shared: Arc::new(Mutex::new(Shared::default())),
            forwarding: Arc::new(Mutex::new(())),
            current: tokio::sync::Mutex::new(None),
            generations: AtomicU64::new(0),
        }
    }

    /// Switches to `topic`.
    ///
    /// Selecting the topic already subscribed to is a no-op. A topic whose
    /// stream has died is no longer subscribed, so selecting it again
    /// reopens the stream. On failure to open the new stream the error is
    /// returned and the manager is left `Idle`; the previous subscription
    /// has already been torn down.
    pub async fn select_topic(&self, topic: &str) -> Result<(), RelayError> {
        let mut current = self.current.lock().await;
        let same_topic = current
            .as_ref()
            .is_some_and(|running| running.topic == topic);
        if same_topic && self.current_topic().as_deref() == Some(topic) {
            return Ok(());
        }

        if let Some(previous) = current.take() {
            self.quiesce(previous).await;
        }
        self.lock_shared().history.clear();

        let events = self.source.open(topic).await.inspect_err(|err| {
            warn!(topic, error = %err, "failed to open event stream");
        })?;

        let generation = self.generations.fetch_add(1, Ordering::SeqCst) + 1;
        self.lock_shared().active = Some(ActiveTopic {
            topic: topic.to_string(),
            generation,
        });

        let task = tokio::spawn(receive_loop(
            events,
            generation,
            self.shared.clone(),
            self.forwarding.clone(),
            self.sink.clone(),
        ));
        *current = Some(ReceiveLoop {
            topic: topic.to_string(),
            task,
        });
        info!(topic, "subscribed");
        Ok(())
    }

    /// Tears down the active subscription, if any. Idempotent.
    pub async fn unsubscribe(&self) {
        let mut current = self.current.lock().await;
        if let Some(previous) = current.take() {
            self.quiesce(previous).await;
        }
    }

    pub fn state(&self) -> SubscriptionState {
        match &self.lock_shared().active {
            Some(active) => SubscriptionState::Subscribed(active.topic.clone()),
            None => SubscriptionState::Idle,
        }
    }

    pub fn current_topic(&self) -> Option<String> {
        self.lock_shared()
            .active
            .as_ref()
            .map(|active| active.topic.clone())
    }

    /// Messages received for the current topic, oldest first.
    pub fn history(&self) -> Vec<Message> {
        self.lock_shared().history.clone()
    }

    /// Stops `previous` from forwarding, then waits for its task to finish.
    async fn quiesce(&self, previous: ReceiveLoop) {
        {
            let _forwarding = lock(&self.forwarding);
            let mut shared = self.lock_shared();
            shared.active = None;
            shared.history.clear();
        }
        // the loop can no longer forward anything; abort it so the stream,
        // and with it the server-side registration, is released
        previous.task.abort();
        let _ = previous.task.await;
        debug!(topic = %previous.topic, "unsubscribed");
    }

    fn lock_shared(&self) -> MutexGuard<'_, Shared> {
        lock(&self.shared)
    }
}

impl<E: EventSource, S: DisplaySink> Drop for SubscriptionManager<E, S> {
    fn drop(&mut self) {
        if let Some(running) = self.current.get_mut().take() {
            running.task.abort();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn receive_loop<S: DisplaySink>(
    mut events: EventStream,
    generation: u64,
    shared: Arc<Mutex<Shared>>,
    forwarding: Arc<Mutex<()>>,
    sink: Arc<S>,
) {
    while let Some(item) = events.next().await {
        let event = match item {
            Ok(event) => event,
            Err(err) => {
                warn!(error = %err, "event stream failed");
                break;
            }
        };

        let message = match event.decode() {
            Ok(message) => message,
            Err(err) => {
                warn!(topic = event.topic(), error = %err, "skipping undecodable event");
                continue;
            }
        };

        // a switch waits on this guard, so nothing is forwarded once it has begun
        let _forwarding = lock(&forwarding);
        {
            let mut state = lock(&shared);
            let Some(active) = state
                .active
                .as_ref()
                .filter(|active| active.generation == generation)
            else {
                debug!(generation, "receive loop superseded");
                return;
            };
            if message.topic != active.topic {
                debug!(
                    expected = %active.topic,
                    got = %message.topic,
                    "dropping message for another topic"
                );
                continue;
            }
            state.history.push(message.clone());
        }
        sink.on_message_received(&message);
    }

    let mut state = lock(&shared);
    if let Some(active) = state
        .active
        .take_if(|active| active.generation == generation)
    {
        warn!(topic = %active.topic, "event stream ended, subscription is idle");
    }
}
