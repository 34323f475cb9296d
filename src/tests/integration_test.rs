use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::broker::Broker;
use crate::broker::message::Message;
use crate::client::{ChannelSink, ChatSession, DisplayUpdate, RelayClient, SubscriptionState};
use crate::config::Settings;
use crate::transport::serve;

async fn start_relay() -> (Arc<Broker>, String) {
    let settings = Settings::default();
    let broker = Arc::new(Broker::from_settings(&settings.broker));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(serve(listener, broker.clone(), settings));
    (broker, format!("http://{addr}"))
}

async fn next_message(rx: &mut UnboundedReceiver<DisplayUpdate>) -> Message {
    loop {
        let update = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("display update in time")
            .expect("sink open");
        if let DisplayUpdate::MessageReceived(message) = update {
            return message;
        }
    }
}

async fn assert_quiet(rx: &mut UnboundedReceiver<DisplayUpdate>) {
    let next = tokio::time::timeout(Duration::from_millis(150), rx.recv()).await;
    assert!(next.is_err(), "unexpected display update: {next:?}");
}

#[tokio::test]
async fn chat_session_end_to_end() {
    let (_broker, base_url) = start_relay().await;
    let (sink, mut updates) = ChannelSink::new();
    let session = ChatSession::new(RelayClient::new(&base_url), "Ann", Arc::new(sink));

    let topics = session.load_topics().await.unwrap();
    assert_eq!(topics, ["default", "other"]);
    assert_eq!(
        updates.recv().await,
        Some(DisplayUpdate::TopicsLoaded(topics.clone()))
    );

    // nothing is sent before a topic is selected
    assert!(!session.on_message_submitted("hello?").await.unwrap());

    session.on_topic_selected("default").await.unwrap();
    assert_eq!(
        session.state(),
        SubscriptionState::Subscribed("default".to_string())
    );

    let publisher = RelayClient::new(&base_url);
    publisher
        .publish(&Message::new("Bob", "x", "other"))
        .await
        .unwrap();
    publisher
        .publish(&Message::new("Bob", "y", "default"))
        .await
        .unwrap();

    let received = next_message(&mut updates).await;
    assert_eq!(received.message, "y");
    assert_eq!(received.topic, "default");
    assert_quiet(&mut updates).await;

    // blank submissions are ignored, real ones go to the current topic
    assert!(!session.on_message_submitted("   ").await.unwrap());
    assert!(session.on_message_submitted("hi all").await.unwrap());
    let echoed = next_message(&mut updates).await;
    assert_eq!(echoed.name, "Ann");
    assert_eq!(echoed.topic, "default");
    assert_eq!(session.history().len(), 2);

    session.on_topic_selected("other").await.unwrap();
    assert!(session.history().is_empty());

    publisher
        .publish(&Message::new("Bob", "late", "default"))
        .await
        .unwrap();
    publisher
        .publish(&Message::new("Bob", "z", "other"))
        .await
        .unwrap();
    let received = next_message(&mut updates).await;
    assert_eq!(received.message, "z");
    assert_eq!(session.history(), vec![received]);

    session.close().await;
    assert_eq!(session.state(), SubscriptionState::Idle);
}

#[tokio::test]
async fn switch_during_in_flight_publish_never_lands_in_new_history() {
    let (broker, base_url) = start_relay().await;
    let (sink, mut updates) = ChannelSink::new();
    let session = ChatSession::new(RelayClient::new(&base_url), "Ann", Arc::new(sink));
    session.on_topic_selected("default").await.unwrap();

    let publisher = RelayClient::new(&base_url);
    let in_flight = {
        let publisher = publisher.clone();
        tokio::spawn(async move {
            for i in 0..20 {
                publisher
                    .publish(&Message::new("Bob", format!("d{i}"), "default"))
                    .await
                    .unwrap();
            }
        })
    };

    session.on_topic_selected("other").await.unwrap();
    let history_after_switch = session.history();
    in_flight.await.unwrap();

    assert!(history_after_switch.iter().all(|m| m.topic == "other"));

    publisher
        .publish(&Message::new("Bob", "fresh", "other"))
        .await
        .unwrap();

    // drain until the message on the new topic shows up
    loop {
        let message = next_message(&mut updates).await;
        if message.topic == "other" {
            assert_eq!(message.message, "fresh");
            break;
        }
    }
    let history = session.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].message, "fresh");

    // the old topic's stream is gone on the server side as well
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while broker.subscriber_count("default").unwrap() > 0 {
        assert!(tokio::time::Instant::now() < deadline);
        publisher
            .publish(&Message::new("Bob", "poke", "default"))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(session.history().len(), 1);
}
