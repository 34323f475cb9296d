//! HTTP client for the relay server.

use std::collections::VecDeque;

use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt, stream};
use reqwest::{Response, StatusCode};
use tracing::debug;

use crate::broker::message::{Event, Message};
use crate::client::source::{EventSource, EventStream};
use crate::transport::frame::FrameDecoder;
use crate::transport::message::{EVENTS_PATH, EventsQuery, MESSAGES_PATH, TOPICS_PATH};
use crate::utils::RelayError;

#[derive(Debug, Clone)]
pub struct RelayClient {
    base_url: String,
    http: reqwest::Client,
}

impl RelayClient {
    /// `base_url` is the server root, e.g. `http://127.0.0.1:8000`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_http_client(base_url, reqwest::Client::new())
    }

    /// Uses a preconfigured `reqwest` client, e.g. one carrying custom
    /// root certificates.
    pub fn with_http_client(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, http }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetches the server's topic list in registry order.
    pub async fn list_topics(&self) -> Result<Vec<String>, RelayError> {
        let response = self.http.get(self.url(TOPICS_PATH)).send().await?;
        let response = check_status(response, None).await?;
        Ok(response.json().await?)
    }

    /// Publishes `message`. Returns once the server accepted it, not when
    /// subscribers received it.
    pub async fn publish(&self, message: &Message) -> Result<(), RelayError> {
        let response = self
            .http
            .post(self.url(MESSAGES_PATH))
            .json(message)
            .send()
            .await?;
        check_status(response, Some(&message.topic)).await?;
        debug!(topic = %message.topic, "message published");
        Ok(())
    }

    /// Opens the event stream for `topic`.
    pub async fn subscribe(&self, topic: &str) -> Result<EventStream, RelayError> {
        let query = EventsQuery {
            topic: topic.to_string(),
        };
        let response = self
            .http
            .get(self.url(EVENTS_PATH))
            .query(&query)
            .send()
            .await?;
        let response = check_status(response, Some(topic)).await?;
        debug!(topic, "event stream established");

        Ok(decode_events(response))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl EventSource for RelayClient {
    fn open<'a>(&'a self, topic: &'a str) -> BoxFuture<'a, Result<EventStream, RelayError>> {
        self.subscribe(topic).boxed()
    }
}

async fn check_status(response: Response, topic: Option<&str>) -> Result<Response, RelayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    match (status, topic) {
        (StatusCode::NOT_FOUND, Some(topic)) => Err(RelayError::UnknownTopic(topic.to_string())),
        (StatusCode::BAD_REQUEST, _) => Err(RelayError::Rejected(body)),
        _ => Err(RelayError::Transport(format!(
            "unexpected status {status}: {body}"
        ))),
    }
}

/// Turns the response body into a stream of decoded events.
///
/// The stream ends after the first error.
fn decode_events(response: Response) -> EventStream {
    let body = response.bytes_stream().boxed();
    let state = Some((body, FrameDecoder::new(), VecDeque::new()));

    stream::unfold(state, |state| async move {
        let (mut body, mut decoder, mut ready) = state?;
        loop {
            if let Some(frame) = ready.pop_front() {
                return Some((Ok(Event::from(frame)), Some((body, decoder, ready))));
            }
            let chunk = match body.next().await? {
                Ok(chunk) => chunk,
                Err(err) => return Some((Err(RelayError::from(err)), None)),
            };
            match decoder.push(&chunk) {
                Ok(frames) => ready.extend(frames),
                Err(err) => return Some((Err(err), None)),
            }
        }
    })
    .boxed()
}
