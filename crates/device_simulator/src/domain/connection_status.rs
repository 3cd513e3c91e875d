use crate::domain::{ConnectOutcome, ConnectionObserver};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{debug, info, warn};

/// Connection status fed by transport callbacks.
///
/// Written from the transport's event context, read by the session loop.
#[derive(Debug, Default)]
pub struct ConnectionStatus {
    connected: AtomicBool,
    connects: AtomicU64,
    disconnects: AtomicU64,
    acked: AtomicU64,
}

impl ConnectionStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub fn connect_count(&self) -> u64 {
        self.connects.load(Ordering::Relaxed)
    }

    pub fn disconnect_count(&self) -> u64 {
        self.disconnects.load(Ordering::Relaxed)
    }

    /// Publishes acknowledged by the broker so far
    pub fn acked_count(&self) -> u64 {
        self.acked.load(Ordering::Relaxed)
    }
}

impl ConnectionObserver for ConnectionStatus {
    fn on_connect(&self, outcome: ConnectOutcome) {
        match outcome {
            ConnectOutcome::Accepted => {
                self.connected.store(true, Ordering::Release);
                self.connects.fetch_add(1, Ordering::Relaxed);
                info!("on_connect: connection accepted");
            }
            ConnectOutcome::Refused(reason) => {
                self.connected.store(false, Ordering::Release);
                warn!(reason = %reason, "on_connect: connection refused");
            }
        }
    }

    fn on_disconnect(&self, reason: Option<String>) {
        self.connected.store(false, Ordering::Release);
        self.disconnects.fetch_add(1, Ordering::Relaxed);
        match reason {
            Some(reason) => warn!(reason = %reason, "on_disconnect"),
            None => info!("on_disconnect: clean disconnect"),
        }
    }

    fn on_publish_ack(&self, message_id: u16) {
        self.acked.fetch_add(1, Ordering::Relaxed);
        debug!(message_id, "on_publish");
    }
}
