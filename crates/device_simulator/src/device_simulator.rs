use crate::domain::{
    BrokerConfig, SessionConfig, SessionController, SessionSummary, TelemetryTransport,
};
use crate::mqtt::MqttTransport;
use common::auth::CredentialIssuer;
use common::domain::{DeviceIdentity, DomainResult};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub struct DeviceSimulatorConfig {
    pub identity: DeviceIdentity,
    pub session: SessionConfig,
    pub broker: BrokerConfig,
}

/// A device session ready to run under the process runner
pub struct DeviceSimulator {
    controller: SessionController,
}

impl DeviceSimulator {
    /// Issue the device token and prepare a session over MQTT
    pub fn new(config: DeviceSimulatorConfig, issuer: &dyn CredentialIssuer) -> DomainResult<Self> {
        Self::with_transport(config, issuer, Arc::new(MqttTransport::new()))
    }

    pub fn with_transport(
        config: DeviceSimulatorConfig,
        issuer: &dyn CredentialIssuer,
        transport: Arc<dyn TelemetryTransport>,
    ) -> DomainResult<Self> {
        debug!(device = %config.identity, "initializing device simulator");

        let token = issuer.issue(&config.identity)?;
        let controller = SessionController::new(
            config.session,
            config.identity,
            token,
            config.broker,
            transport,
        );

        Ok(Self { controller })
    }

    /// Convert into a runner process.
    ///
    /// The session summary, or the fatal error, is reported through
    /// `outcome`; the process itself fails with the same error so the
    /// runner shuts everything down.
    #[allow(clippy::type_complexity)]
    pub fn into_runner_process(
        self,
        outcome: oneshot::Sender<DomainResult<SessionSummary>>,
    ) -> Box<
        dyn FnOnce(CancellationToken) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>
            + Send,
    > {
        Box::new({
            let mut controller = self.controller;
            move |ctx| -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>> {
                Box::pin(async move {
                    let result = controller.run(ctx).await;
                    let process_result = match &result {
                        Ok(_) => Ok(()),
                        Err(e) => Err(anyhow::Error::new(e.clone())),
                    };
                    let _ = outcome.send(result);
                    process_result
                })
            }
        })
    }
}
