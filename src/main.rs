//! CLI for topicrelay
//!
//! Subcommands:
//! - `server`: run the HTTP relay
//! - `client`: a line-based chat client (useful for smoke tests)

use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

use topicrelay::broker::Broker;
use topicrelay::client::{ChannelSink, ChatSession, DisplayUpdate, RelayClient};
use topicrelay::config::{Settings, load_config};
use topicrelay::transport::start_http_server;
use topicrelay::utils::{RelayError, logging};

#[derive(Parser)]
#[command(name = "topicrelay")]
enum Command {
    /// Start the relay server
    Server,
    /// Run the line-based chat client
    Client {
        /// Server base URL (defaults to `client.base_url` from the configuration)
        #[arg(long)]
        url: Option<String>,
        /// Sender name (defaults to `client.name` from the configuration)
        #[arg(long)]
        name: Option<String>,
        /// Topic to join on startup (defaults to the first topic the server lists)
        #[arg(long)]
        topic: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cmd = Command::parse();

    let settings = match load_config() {
        Ok(settings) => settings,
        Err(e) => {
            logging::init("info");
            error!("Invalid configuration: {}", e);
            return;
        }
    };
    logging::init(&settings.log.level);

    let result = match cmd {
        Command::Server => run_server(settings).await,
        Command::Client { url, name, topic } => run_client(settings, url, name, topic).await,
    };
    if let Err(e) = result {
        error!("Exited with error: {}", e);
    }
}

async fn run_server(settings: Settings) -> Result<(), RelayError> {
    let addr = settings.bind_addr();
    let broker = Arc::new(Broker::from_settings(&settings.broker));
    info!(topics = ?broker.list_topics(), "starting relay");

    tokio::select! {
        result = start_http_server(addr, broker, settings) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
            Ok(())
        }
    }
}

async fn run_client(
    settings: Settings,
    url: Option<String>,
    name: Option<String>,
    topic: Option<String>,
) -> Result<(), RelayError> {
    let url = url.unwrap_or(settings.client.base_url);
    let name = name.unwrap_or(settings.client.name);

    let (sink, mut updates) = ChannelSink::new();
    let session = ChatSession::new(RelayClient::new(url), name, Arc::new(sink));

    // render loop: the only place that writes to the terminal
    let render = tokio::spawn(async move {
        while let Some(update) = updates.recv().await {
            match update {
                DisplayUpdate::TopicsLoaded(topics) => {
                    println!("*** topics: {}", topics.join(", "))
                }
                DisplayUpdate::MessageReceived(msg) => {
                    let time = msg.time.format("%H:%M");
                    println!("{time} <{}> {}", msg.name, msg.message)
                }
            }
        }
    });

    let topics = session.load_topics().await?;
    if let Some(initial) = topic.or_else(|| topics.first().cloned()) {
        session.on_topic_selected(&initial).await?;
        println!("*** joined {initial}");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line == "/quit" {
            break;
        } else if line == "/topics" {
            session.load_topics().await?;
        } else if let Some(next) = line.strip_prefix("/topic ") {
            match session.on_topic_selected(next.trim()).await {
                Ok(()) => println!("*** joined {}", next.trim()),
                Err(e) => warn!("Could not switch topic: {}", e),
            }
        } else if let Err(e) = session.on_message_submitted(line).await {
            warn!("Message not sent: {}", e);
        }
    }

    session.close().await;
    drop(session);
    let _ = render.await;
    Ok(())
}
