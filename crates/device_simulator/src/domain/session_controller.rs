use crate::domain::{
    device_topic, BrokerConfig, CompositeIndex, ConnectOptions, ConnectionObserver,
    ConnectionStatus, DeliveryQos, EnvironmentModel, GIndex, SessionConfig, TelemetryRecord,
    TelemetryTransport,
};
use chrono::{DateTime, Utc};
use common::auth::AuthToken;
use common::domain::{Clock, DeviceIdentity, DomainError, DomainResult, SystemClock};
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// The broker authenticates with the token alone; the username is ignored.
pub const BRIDGE_USERNAME: &str = "unused";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
    Publishing,
    Disconnecting,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::Connected => "connected",
            SessionState::Publishing => "publishing",
            SessionState::Disconnecting => "disconnecting",
        };
        f.write_str(name)
    }
}

/// Outcome of a session that ended without a fatal error
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    /// Records accepted by the transport
    pub published: u32,
    /// Records the transport failed to hand off
    pub publish_failures: u32,
    /// Ticks dropped because no valid index could be computed
    pub skipped_ticks: u32,
    /// Whether the session stopped on the cancellation signal
    pub cancelled: bool,
}

impl SessionSummary {
    /// Ticks that reached the transport, successfully or not
    pub fn handoffs(&self) -> u32 {
        self.published + self.publish_failures
    }
}

/// Drives one device session: connect, publish `message_count` records on a
/// fixed cadence, then tear the connection down.
///
/// A controller runs once. After [`SessionController::run`] returns it stays
/// in [`SessionState::Disconnected`].
pub struct SessionController {
    config: SessionConfig,
    identity: DeviceIdentity,
    token: AuthToken,
    broker: BrokerConfig,
    transport: Arc<dyn TelemetryTransport>,
    model: EnvironmentModel,
    index: Arc<dyn CompositeIndex>,
    clock: Arc<dyn Clock>,
    status: Arc<ConnectionStatus>,
    state: SessionState,
    finished: bool,
}

impl SessionController {
    pub fn new(
        config: SessionConfig,
        identity: DeviceIdentity,
        token: AuthToken,
        broker: BrokerConfig,
        transport: Arc<dyn TelemetryTransport>,
    ) -> Self {
        let model = EnvironmentModel::initialize(identity.device_id());
        Self {
            config,
            identity,
            token,
            broker,
            transport,
            model,
            index: Arc::new(GIndex::new()),
            clock: Arc::new(SystemClock),
            status: Arc::new(ConnectionStatus::new()),
            state: SessionState::Disconnected,
            finished: false,
        }
    }

    pub fn with_index(mut self, index: Arc<dyn CompositeIndex>) -> Self {
        self.index = index;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn topic(&self) -> String {
        device_topic(self.identity.device_id(), self.config.message_type)
    }

    /// Run the session to completion.
    ///
    /// Returns a summary when all ticks were handed off or the token was
    /// cancelled. Fatal errors are returned after the connection, if any, has
    /// been torn down.
    #[instrument(
        name = "device_session",
        skip_all,
        fields(
            device_id = %self.identity.device_id(),
            message_type = %self.config.message_type,
            message_count = self.config.message_count,
        )
    )]
    pub async fn run(&mut self, ctx: CancellationToken) -> DomainResult<SessionSummary> {
        if self.finished {
            return Err(DomainError::InvalidConfig(
                "session controller has already run".to_string(),
            ));
        }
        self.finished = true;

        self.start().await?;

        self.transition(SessionState::Publishing);
        let result = self.publish_loop(&ctx).await;

        self.shutdown().await;

        match &result {
            Ok(summary) => info!(
                published = summary.published,
                publish_failures = summary.publish_failures,
                skipped_ticks = summary.skipped_ticks,
                acked = self.status.acked_count(),
                cancelled = summary.cancelled,
                "session finished"
            ),
            Err(e) => warn!(error = %e, "session terminated"),
        }

        result
    }

    async fn start(&mut self) -> DomainResult<()> {
        self.transition(SessionState::Connecting);

        let options = ConnectOptions {
            host: self.broker.host.clone(),
            port: self.broker.port,
            client_id: self.identity.client_id(),
            username: BRIDGE_USERNAME.to_string(),
            password: self.token.encoded().to_string(),
            ca_certs_path: self.broker.ca_certs_path.clone(),
            keep_alive: self.broker.keep_alive,
            connect_timeout: self.broker.connect_timeout,
        };
        let observer: Arc<dyn ConnectionObserver> = self.status.clone();

        match self.transport.connect(options, observer).await {
            Ok(()) => {
                self.transition(SessionState::Connected);
                Ok(())
            }
            Err(e) => {
                self.transition(SessionState::Disconnected);
                Err(match e {
                    DomainError::TransportConnectError(_) => e,
                    other => DomainError::TransportConnectError(other.to_string()),
                })
            }
        }
    }

    async fn publish_loop(&mut self, ctx: &CancellationToken) -> DomainResult<SessionSummary> {
        let topic = self.topic();
        let mut summary = SessionSummary::default();
        let mut first_tick = true;

        while summary.handoffs() < self.config.message_count {
            if first_tick {
                first_tick = false;
                if ctx.is_cancelled() {
                    info!("cancelled before first tick");
                    summary.cancelled = true;
                    break;
                }
            } else {
                tokio::select! {
                    biased;
                    _ = ctx.cancelled() => {
                        info!("received shutdown signal, stopping session");
                        summary.cancelled = true;
                        break;
                    }
                    _ = tokio::time::sleep(self.config.tick_interval) => {}
                }
            }

            let now = self.clock.now();
            if self.token.is_expired_at(now) {
                return Err(DomainError::CredentialExpired {
                    expired_at: self.token.expires_at(),
                });
            }

            match self.tick(&topic, now, summary.handoffs() + 1).await {
                Ok(()) => summary.published += 1,
                Err(DomainError::TransportPublishError(reason)) => {
                    warn!(topic = %topic, reason = %reason, "failed to publish record");
                    summary.publish_failures += 1;
                }
                Err(e) if e.is_recoverable() => {
                    summary.skipped_ticks += 1;
                    warn!(
                        error = %e,
                        skipped_ticks = summary.skipped_ticks,
                        "skipping tick"
                    );
                    if summary.skipped_ticks > self.config.max_skipped_ticks {
                        return Err(DomainError::SkipBudgetExhausted {
                            skipped: summary.skipped_ticks,
                            limit: self.config.max_skipped_ticks,
                        });
                    }
                }
                Err(e) => return Err(e),
            }
        }

        Ok(summary)
    }

    async fn tick(
        &mut self,
        topic: &str,
        now: DateTime<Utc>,
        message_number: u32,
    ) -> DomainResult<()> {
        let readings = self.model.advance().clone();
        let g_index = self.index.compute(&readings)?;

        let record =
            TelemetryRecord::new(now.timestamp(), self.identity.device_id(), readings, g_index);
        let payload = record.encode()?;

        info!(
            topic = %topic,
            "publishing message {} of {}",
            message_number,
            self.config.message_count
        );
        debug!(g_index, timestamp = record.timestamp, "record assembled");

        self.transport
            .publish(topic, payload, DeliveryQos::AtLeastOnce)
            .await
    }

    async fn shutdown(&mut self) {
        self.transition(SessionState::Disconnecting);
        if let Err(e) = self.transport.disconnect().await {
            warn!(error = %e, "failed to disconnect cleanly");
        }
        self.transition(SessionState::Disconnected);
    }

    fn transition(&mut self, next: SessionState) {
        debug!(from = %self.state, to = %next, "session state transition");
        self.state = next;
    }
}
