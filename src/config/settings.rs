use serde::Deserialize;

/// Top-level configuration settings for the application.
///
/// Includes settings for the HTTP server, the broker, the chat client and
/// logging.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub broker: BrokerSettings,
    pub client: ClientSettings,
    pub log: LogSettings,
}

/// Configuration settings for the server.
///
/// Defines the host and port the server will bind to.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// Configuration settings for the broker.
///
/// `topics` is the fixed registry established at startup. `subscriber_buffer`
/// bounds every subscriber queue; events beyond it are dropped for that
/// subscriber only.
#[derive(Debug, Deserialize, Clone)]
pub struct BrokerSettings {
    pub topics: Vec<String>,
    pub subscriber_buffer: usize,
    pub keep_alive_secs: u64,
}

/// Configuration settings for the chat client.
#[derive(Debug, Deserialize, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogSettings {
    pub level: String,
}

/// Partial configuration settings loaded from files or environment.
///
/// Allows partial specification of settings. Missing values can be filled using defaults.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub broker: Option<PartialBrokerSettings>,
    pub client: Option<PartialClientSettings>,
    pub log: Option<PartialLogSettings>,
}

#[derive(Debug, Deserialize)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize)]
pub struct PartialBrokerSettings {
    pub topics: Option<Vec<String>>,
    pub subscriber_buffer: Option<usize>,
    pub keep_alive_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct PartialClientSettings {
    pub base_url: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PartialLogSettings {
    pub level: Option<String>,
}

/// Provides default values for `Settings`.
///
/// Ensures the application has sensible defaults if no configuration is provided.
impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 8000,
            },
            broker: BrokerSettings {
                topics: vec!["default".to_string(), "other".to_string()],
                subscriber_buffer: 64,
                keep_alive_secs: 15,
            },
            client: ClientSettings {
                base_url: "http://127.0.0.1:8000".to_string(),
                name: "anonymous".to_string(),
            },
            log: LogSettings {
                level: "info".to_string(),
            },
        }
    }
}

impl Settings {
    /// Fills every field missing from `partial` with the value from `self`.
    pub fn merged_with(self, partial: PartialSettings) -> Settings {
        let PartialSettings {
            server,
            broker,
            client,
            log,
        } = partial;

        Settings {
            server: match server {
                Some(s) => ServerSettings {
                    host: s.host.unwrap_or(self.server.host),
                    port: s.port.unwrap_or(self.server.port),
                },
                None => self.server,
            },
            broker: match broker {
                Some(b) => BrokerSettings {
                    topics: b.topics.unwrap_or(self.broker.topics),
                    subscriber_buffer: b.subscriber_buffer.unwrap_or(self.broker.subscriber_buffer),
                    keep_alive_secs: b.keep_alive_secs.unwrap_or(self.broker.keep_alive_secs),
                },
                None => self.broker,
            },
            client: match client {
                Some(c) => ClientSettings {
                    base_url: c.base_url.unwrap_or(self.client.base_url),
                    name: c.name.unwrap_or(self.client.name),
                },
                None => self.client,
            },
            log: match log {
                Some(l) => LogSettings {
                    level: l.level.unwrap_or(self.log.level),
                },
                None => self.log,
            },
        }
    }

    /// Address the HTTP server binds to, as `host:port`.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
