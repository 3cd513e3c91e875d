use crate::domain::{
    ConnectOptions, ConnectOutcome, ConnectionObserver, DeliveryQos, TelemetryTransport,
};
use async_trait::async_trait;
use bytes::Bytes;
use common::domain::{DomainError, DomainResult};
use rumqttc::{
    AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS,
    TlsConfiguration, Transport,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

const DEFAULT_REQUEST_CAPACITY: usize = 100;
const DISCONNECT_GRACE: Duration = Duration::from_secs(5);
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

struct Connection {
    client: AsyncClient,
    stop: CancellationToken,
    event_loop: JoinHandle<()>,
}

/// MQTT over TLS transport backed by rumqttc.
///
/// The rumqttc event loop runs on its own task and reports connection events
/// to the session's [`ConnectionObserver`].
pub struct MqttTransport {
    connection: Mutex<Option<Connection>>,
    request_capacity: usize,
}

impl MqttTransport {
    pub fn new() -> Self {
        Self {
            connection: Mutex::new(None),
            request_capacity: DEFAULT_REQUEST_CAPACITY,
        }
    }

    /// Bound of the request queue between the client handle and the event loop
    pub fn with_request_capacity(mut self, request_capacity: usize) -> Self {
        self.request_capacity = request_capacity;
        self
    }

    pub async fn is_connected(&self) -> bool {
        self.connection.lock().await.is_some()
    }
}

impl Default for MqttTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn to_qos(qos: DeliveryQos) -> QoS {
    match qos {
        DeliveryQos::AtMostOnce => QoS::AtMostOnce,
        DeliveryQos::AtLeastOnce => QoS::AtLeastOnce,
    }
}

async fn mqtt_options(options: &ConnectOptions) -> DomainResult<MqttOptions> {
    let ca = tokio::fs::read(&options.ca_certs_path).await.map_err(|e| {
        DomainError::TransportConnectError(format!(
            "failed to read CA certificates from {}: {}",
            options.ca_certs_path.display(),
            e
        ))
    })?;

    let mut mqtt_options = MqttOptions::new(&options.client_id, &options.host, options.port);
    mqtt_options.set_credentials(&options.username, &options.password);
    mqtt_options.set_keep_alive(options.keep_alive);
    mqtt_options.set_clean_session(true);
    mqtt_options.set_transport(Transport::Tls(TlsConfiguration::Simple {
        ca,
        alpn: None,
        client_auth: None,
    }));

    Ok(mqtt_options)
}

#[instrument(name = "mqtt_event_loop", skip_all)]
async fn drive_event_loop(
    mut eventloop: EventLoop,
    observer: Arc<dyn ConnectionObserver>,
    stop: CancellationToken,
    mut connected: Option<oneshot::Sender<DomainResult<()>>>,
) {
    loop {
        tokio::select! {
            _ = stop.cancelled() => {
                debug!("event loop stop requested");
                break;
            }
            event = eventloop.poll() => match event {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    if ack.code == ConnectReturnCode::Success {
                        observer.on_connect(ConnectOutcome::Accepted);
                        if let Some(tx) = connected.take() {
                            let _ = tx.send(Ok(()));
                        }
                    } else {
                        let reason = format!("{:?}", ack.code);
                        observer.on_connect(ConnectOutcome::Refused(reason.clone()));
                        if let Some(tx) = connected.take() {
                            let _ = tx.send(Err(DomainError::TransportConnectError(reason)));
                        }
                        break;
                    }
                }
                Ok(Event::Incoming(Packet::PubAck(ack))) => {
                    observer.on_publish_ack(ack.pkid);
                }
                Ok(Event::Incoming(Packet::Disconnect)) => {
                    observer.on_disconnect(Some("broker closed the connection".to_string()));
                }
                Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                    observer.on_disconnect(None);
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    if let Some(tx) = connected.take() {
                        observer.on_connect(ConnectOutcome::Refused(e.to_string()));
                        let _ = tx.send(Err(DomainError::TransportConnectError(e.to_string())));
                        break;
                    }

                    // rumqttc reconnects on the next poll
                    observer.on_disconnect(Some(e.to_string()));
                    tokio::select! {
                        _ = stop.cancelled() => break,
                        _ = tokio::time::sleep(RECONNECT_DELAY) => {}
                    }
                }
            }
        }
    }

    debug!("event loop stopped");
}

#[async_trait]
impl TelemetryTransport for MqttTransport {
    #[instrument(
        name = "mqtt_connect",
        skip_all,
        fields(host = %options.host, port = options.port, client_id = %options.client_id)
    )]
    async fn connect(
        &self,
        options: ConnectOptions,
        observer: Arc<dyn ConnectionObserver>,
    ) -> DomainResult<()> {
        let mut connection = self.connection.lock().await;
        if connection.is_some() {
            return Err(DomainError::TransportConnectError(
                "transport is already connected".to_string(),
            ));
        }

        let mqtt_options = mqtt_options(&options).await?;
        let (client, eventloop) = AsyncClient::new(mqtt_options, self.request_capacity);

        let stop = CancellationToken::new();
        let (tx, rx) = oneshot::channel();
        let event_loop =
            tokio::spawn(drive_event_loop(eventloop, observer, stop.clone(), Some(tx)));

        let outcome = match tokio::time::timeout(options.connect_timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(DomainError::TransportConnectError(
                "event loop stopped before the broker answered".to_string(),
            )),
            Err(_) => Err(DomainError::TransportConnectError(format!(
                "no answer from broker within {:?}",
                options.connect_timeout
            ))),
        };

        match outcome {
            Ok(()) => {
                info!("connected to broker");
                *connection = Some(Connection {
                    client,
                    stop,
                    event_loop,
                });
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "failed to connect to broker");
                stop.cancel();
                let _ = event_loop.await;
                Err(e)
            }
        }
    }

    async fn publish(&self, topic: &str, payload: Bytes, qos: DeliveryQos) -> DomainResult<()> {
        let client = match self.connection.lock().await.as_ref() {
            Some(connection) => connection.client.clone(),
            None => {
                return Err(DomainError::TransportPublishError(
                    "transport is not connected".to_string(),
                ))
            }
        };

        // Never wait on the request queue: it stops draining while the
        // event loop is reconnecting.
        client
            .try_publish(topic, to_qos(qos), false, payload.to_vec())
            .map_err(|e| DomainError::TransportPublishError(e.to_string()))
    }

    #[instrument(name = "mqtt_disconnect", skip_all)]
    async fn disconnect(&self) -> DomainResult<()> {
        let Some(connection) = self.connection.lock().await.take() else {
            debug!("disconnect requested without an open connection");
            return Ok(());
        };

        let result = connection
            .client
            .try_disconnect()
            .map_err(|e| DomainError::TransportDisconnectError(e.to_string()));

        let mut event_loop = connection.event_loop;
        match &result {
            Ok(()) => {
                if tokio::time::timeout(DISCONNECT_GRACE, &mut event_loop).await.is_err() {
                    warn!("event loop did not stop after disconnect, stopping it");
                    connection.stop.cancel();
                    let _ = event_loop.await;
                }
            }
            Err(e) => {
                warn!(error = %e, "disconnect request not queued, stopping event loop");
                connection.stop.cancel();
                let _ = event_loop.await;
            }
        }

        info!("disconnected from broker");
        result
    }
}
