use serde::Deserialize;

/// Top-level configuration settings for the application.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Settings {
    pub server: ServerSettings,
    pub hub: HubSettings,
    pub chat: ChatSettings,
    pub log: LogSettings,
}

/// Where the WebSocket server listens and how many sessions it admits.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub max_connections: usize,
}

/// Fan-out tuning.
///
/// `channel_capacity` bounds each connection's outbound queue;
/// `max_delivery_failures` is how many consecutive full-queue drops a
/// subscription survives.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct HubSettings {
    pub channel_capacity: usize,
    pub max_delivery_failures: u32,
}

/// The topic `chat` frames are relayed to.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ChatSettings {
    pub topic: String,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LogSettings {
    pub level: String,
}

/// Partial configuration settings loaded from files or environment.
///
/// Every field is optional; missing values are filled from `Settings::default()`.
#[derive(Debug, Deserialize, Default)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub hub: Option<PartialHubSettings>,
    pub chat: Option<PartialChatSettings>,
    pub log: Option<PartialLogSettings>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub max_connections: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialHubSettings {
    pub channel_capacity: Option<usize>,
    pub max_delivery_failures: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialChatSettings {
    pub topic: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialLogSettings {
    pub level: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 8080,
                max_connections: 1000,
            },
            hub: HubSettings {
                channel_capacity: 256,
                max_delivery_failures: 8,
            },
            chat: ChatSettings {
                topic: "/topics/livechat".to_string(),
            },
            log: LogSettings {
                level: "info".to_string(),
            },
        }
    }
}

impl Settings {
    /// Overlay whatever `partial` specifies onto the defaults.
    pub fn merge(partial: PartialSettings) -> Self {
        let default = Settings::default();
        let server = partial.server.unwrap_or_default();
        let hub = partial.hub.unwrap_or_default();
        let chat = partial.chat.unwrap_or_default();
        let log = partial.log.unwrap_or_default();

        Settings {
            server: ServerSettings {
                host: server.host.unwrap_or(default.server.host),
                port: server.port.unwrap_or(default.server.port),
                max_connections: server
                    .max_connections
                    .unwrap_or(default.server.max_connections),
            },
            hub: HubSettings {
                channel_capacity: hub
                    .channel_capacity
                    .unwrap_or(default.hub.channel_capacity),
                max_delivery_failures: hub
                    .max_delivery_failures
                    .unwrap_or(default.hub.max_delivery_failures),
            },
            chat: ChatSettings {
                topic: chat.topic.unwrap_or(default.chat.topic),
            },
            log: LogSettings {
                level: log.level.unwrap_or(default.log.level),
            },
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
