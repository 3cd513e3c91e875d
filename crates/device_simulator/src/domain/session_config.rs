use common::domain::{DomainError, DomainResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Kind of message the device publishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    /// Telemetry events, published every second
    Event,
    /// Device state, published every five seconds
    State,
}

impl MessageType {
    /// Last segment of the publish topic
    pub fn topic_suffix(self) -> &'static str {
        match self {
            MessageType::Event => "events",
            MessageType::State => "state",
        }
    }

    pub fn tick_interval(self) -> Duration {
        match self {
            MessageType::Event => Duration::from_secs(1),
            MessageType::State => Duration::from_secs(5),
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageType::Event => f.write_str("event"),
            MessageType::State => f.write_str("state"),
        }
    }
}

impl FromStr for MessageType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "event" | "events" => Ok(MessageType::Event),
            "state" => Ok(MessageType::State),
            other => Err(DomainError::InvalidConfig(format!(
                "unknown message type '{}', expected 'event' or 'state'",
                other
            ))),
        }
    }
}

/// Default number of ticks a session may skip before giving up
pub const DEFAULT_MAX_SKIPPED_TICKS: u32 = 10;

/// Publish cadence and budget of one session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub message_type: MessageType,
    pub message_count: u32,
    pub tick_interval: Duration,
    pub max_skipped_ticks: u32,
}

impl SessionConfig {
    pub fn new(message_type: MessageType, message_count: u32) -> DomainResult<Self> {
        if message_count == 0 {
            return Err(DomainError::InvalidConfig(
                "message count must be positive".to_string(),
            ));
        }

        Ok(Self {
            message_type,
            message_count,
            tick_interval: message_type.tick_interval(),
            max_skipped_ticks: DEFAULT_MAX_SKIPPED_TICKS,
        })
    }

    pub fn with_max_skipped_ticks(mut self, max_skipped_ticks: u32) -> Self {
        self.max_skipped_ticks = max_skipped_ticks;
        self
    }
}

pub const DEFAULT_BROKER_HOST: &str = "mqtt.googleapis.com";
pub const DEFAULT_BROKER_PORT: u16 = 8883;

/// Where and how the session reaches the broker
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    pub ca_certs_path: PathBuf,
    pub keep_alive: Duration,
    pub connect_timeout: Duration,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_BROKER_HOST.to_string(),
            port: DEFAULT_BROKER_PORT,
            ca_certs_path: PathBuf::from("roots.pem"),
            keep_alive: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(30),
        }
    }
}
