//! HTTP transport
//!
//! Exposes the broker over three endpoints:
//! - `GET /topics`: the registry as a JSON array, in configuration order
//! - `POST|PUT /messages`: validate a message and fan it out
//! - `GET /events?topic=<name>`: a server-sent event stream for one topic
//!
//! Each connection is served by its own task. Connections share nothing but
//! the `Broker`, whose streams do their own locking.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::Stream;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::broker::Broker;
use crate::broker::message::{Event, Message};
use crate::config::Settings;
use crate::transport::message::{
    EVENTS_PATH, EventsQuery, MESSAGES_PATH, PUBLISH_ACK, TOPICS_PATH,
};
use crate::transport::sse;
use crate::utils::RelayError;

#[derive(Clone)]
struct AppState {
    broker: Arc<Broker>,
    keep_alive: Duration,
}

/// Builds the router serving `broker`.
pub fn router(broker: Arc<Broker>, settings: &Settings) -> Router {
    let state = AppState {
        broker,
        keep_alive: Duration::from_secs(settings.broker.keep_alive_secs.max(1)),
    };

    Router::new()
        .route(TOPICS_PATH, get(list_topics))
        .route(MESSAGES_PATH, post(publish_message).put(publish_message))
        .route(EVENTS_PATH, get(stream_events))
        .with_state(state)
}

/// Binds `addr` and serves until the listener fails.
pub async fn start_http_server(
    addr: String,
    broker: Arc<Broker>,
    settings: Settings,
) -> Result<(), RelayError> {
    let listener = TcpListener::bind(&addr).await?;
    info!("relay listening on http://{}", listener.local_addr()?);
    serve(listener, broker, settings).await
}

/// Serves on an already bound listener.
pub async fn serve(
    listener: TcpListener,
    broker: Arc<Broker>,
    settings: Settings,
) -> Result<(), RelayError> {
    axum::serve(listener, router(broker, &settings)).await?;
    Ok(())
}

async fn list_topics(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.broker.list_topics().to_vec())
}

async fn publish_message(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<&'static str, RelayError> {
    let message: Message = serde_json::from_slice(&body)?;
    let event = Event::from_message(&message)?;
    let delivered = state.broker.publish(&message.topic, event)?;
    debug!(topic = %message.topic, sender = %message.name, delivered, "message accepted");
    Ok(PUBLISH_ACK)
}

async fn stream_events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Result<Sse<impl Stream<Item = Result<SseEvent, Infallible>>>, RelayError> {
    let subscription = state.broker.attach(&query.topic)?;
    info!(topic = %query.topic, subscriber = %subscription.id(), "event stream opened");

    Ok(Sse::new(sse::event_stream(subscription))
        .keep_alive(KeepAlive::new().interval(state.keep_alive)))
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = match &self {
            RelayError::UnknownTopic(_) => StatusCode::NOT_FOUND,
            RelayError::Decode(_) | RelayError::Rejected(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            warn!(error = %self, "request failed");
        } else {
            debug!(error = %self, "request rejected");
        }
        (status, self.to_string()).into_response()
    }
}
