use async_trait::async_trait;
use bytes::Bytes;
use common::domain::DomainResult;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Delivery guarantee requested for a publish
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryQos {
    AtMostOnce,
    AtLeastOnce,
}

/// Everything a transport needs to open an authenticated broker session
#[derive(Clone)]
pub struct ConnectOptions {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub username: String,
    pub password: String,
    pub ca_certs_path: PathBuf,
    pub keep_alive: Duration,
    pub connect_timeout: Duration,
}

// Password carries the device token.
impl fmt::Debug for ConnectOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectOptions")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("client_id", &self.client_id)
            .field("username", &self.username)
            .field("ca_certs_path", &self.ca_certs_path)
            .field("keep_alive", &self.keep_alive)
            .field("connect_timeout", &self.connect_timeout)
            .finish_non_exhaustive()
    }
}

/// Result reported by the transport when a connection attempt completes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectOutcome {
    Accepted,
    Refused(String),
}

/// Hooks invoked by the transport from its own I/O context.
///
/// Implementations may only record status; they never drive the publish loop.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait ConnectionObserver: Send + Sync {
    fn on_connect(&self, outcome: ConnectOutcome);

    fn on_disconnect(&self, reason: Option<String>);

    fn on_publish_ack(&self, message_id: u16);
}

/// Trait for the broker transport used by the session
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait TelemetryTransport: Send + Sync {
    /// Open the connection and wait until the broker accepts or refuses it
    async fn connect(
        &self,
        options: ConnectOptions,
        observer: Arc<dyn ConnectionObserver>,
    ) -> DomainResult<()>;

    /// Hand a payload to the transport without waiting for acknowledgement
    async fn publish(&self, topic: &str, payload: Bytes, qos: DeliveryQos) -> DomainResult<()>;

    /// Close the connection
    async fn disconnect(&self) -> DomainResult<()>;
}
