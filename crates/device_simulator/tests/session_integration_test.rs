use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use common::auth::{JwtCredentialIssuer, SigningAlgorithm};
use common::domain::{DeviceIdentity, DomainError, DomainResult, FixedClock};
use device_simulator::domain::{
    parse_device_topic, BrokerConfig, ConnectOptions, ConnectOutcome, ConnectionObserver,
    DeliveryQos, MessageType, Quantity, SessionConfig, SessionSummary, TelemetryTransport,
    G_INDEX_FIELD,
};
use device_simulator::{DeviceSimulator, DeviceSimulatorConfig};
use envsim_runner::Runner;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

const EC_PRIVATE_KEY: &[u8] = include_bytes!("../../common/tests/fixtures/ec_private.pem");

struct Delivery {
    topic: String,
    payload: Bytes,
    qos: DeliveryQos,
    at: Instant,
}

// In-memory broker: accepts the connection and acks every publish
#[derive(Default)]
struct RecordingTransport {
    observer: Mutex<Option<Arc<dyn ConnectionObserver>>>,
    connects: Mutex<Vec<ConnectOptions>>,
    deliveries: Mutex<Vec<Delivery>>,
    disconnects: Mutex<u32>,
}

impl RecordingTransport {
    fn deliveries(&self) -> std::sync::MutexGuard<'_, Vec<Delivery>> {
        self.deliveries.lock().unwrap()
    }

    fn disconnects(&self) -> u32 {
        *self.disconnects.lock().unwrap()
    }
}

#[async_trait]
impl TelemetryTransport for RecordingTransport {
    async fn connect(
        &self,
        options: ConnectOptions,
        observer: Arc<dyn ConnectionObserver>,
    ) -> DomainResult<()> {
        self.connects.lock().unwrap().push(options);
        observer.on_connect(ConnectOutcome::Accepted);
        *self.observer.lock().unwrap() = Some(observer);
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: Bytes, qos: DeliveryQos) -> DomainResult<()> {
        let message_id = {
            let mut deliveries = self.deliveries.lock().unwrap();
            deliveries.push(Delivery {
                topic: topic.to_string(),
                payload,
                qos,
                at: Instant::now(),
            });
            deliveries.len() as u16
        };

        if let Some(observer) = self.observer.lock().unwrap().as_ref() {
            observer.on_publish_ack(message_id);
        }
        Ok(())
    }

    async fn disconnect(&self) -> DomainResult<()> {
        *self.disconnects.lock().unwrap() += 1;
        if let Some(observer) = self.observer.lock().unwrap().take() {
            observer.on_disconnect(None);
        }
        Ok(())
    }
}

fn simulator_config(message_type: MessageType, message_count: u32) -> DeviceSimulatorConfig {
    DeviceSimulatorConfig {
        identity: DeviceIdentity::new("my-project", "us-central1", "my-registry", "dev-1")
            .unwrap(),
        session: SessionConfig::new(message_type, message_count).unwrap(),
        broker: BrokerConfig::default(),
    }
}

fn issuer() -> JwtCredentialIssuer {
    JwtCredentialIssuer::from_pem(EC_PRIVATE_KEY, SigningAlgorithm::Es256).unwrap()
}

async fn run_session(
    simulator: DeviceSimulator,
    token: CancellationToken,
) -> (anyhow::Result<()>, DomainResult<SessionSummary>) {
    let (tx, rx) = oneshot::channel();
    let result = Runner::new()
        .without_signal_handlers()
        .with_cancellation_token(token)
        .with_named_process("device_session", simulator.into_runner_process(tx))
        .run()
        .await;
    (result, rx.await.unwrap())
}

#[tokio::test(start_paused = true)]
async fn test_three_events_end_to_end() {
    let transport = Arc::new(RecordingTransport::default());
    let simulator = DeviceSimulator::with_transport(
        simulator_config(MessageType::Event, 3),
        &issuer(),
        Arc::clone(&transport) as Arc<dyn TelemetryTransport>,
    )
    .unwrap();

    let (result, outcome) = run_session(simulator, CancellationToken::new()).await;
    assert!(result.is_ok());
    let summary = outcome.unwrap();
    assert_eq!(summary.published, 3);
    assert!(!summary.cancelled);

    let connects = transport.connects.lock().unwrap();
    assert_eq!(connects.len(), 1);
    assert_eq!(
        connects[0].client_id,
        "projects/my-project/locations/us-central1/registries/my-registry/devices/dev-1"
    );
    assert_eq!(connects[0].username, "unused");
    assert_eq!(connects[0].password.split('.').count(), 3);

    let deliveries = transport.deliveries();
    assert_eq!(deliveries.len(), 3);

    let mut last_timestamp = 0;
    for delivery in deliveries.iter() {
        let topic = parse_device_topic(&delivery.topic).unwrap();
        assert_eq!(topic.device_id, "dev-1");
        assert_eq!(topic.message_type, MessageType::Event);
        assert_eq!(delivery.qos, DeliveryQos::AtLeastOnce);

        let record: serde_json::Value = serde_json::from_slice(&delivery.payload).unwrap();
        let record = record.as_object().unwrap();
        assert_eq!(record.len(), 15);
        assert_eq!(record["device"], "dev-1");
        for quantity in Quantity::ALL {
            assert!(record[quantity.wire_name()].is_f64());
        }
        assert!(record[G_INDEX_FIELD].as_f64().unwrap().is_finite());

        let timestamp = record["timestamp"].as_i64().unwrap();
        assert!(timestamp >= last_timestamp);
        last_timestamp = timestamp;
    }

    for pair in deliveries.windows(2) {
        let gap = pair[1].at - pair[0].at;
        assert!(gap >= Duration::from_secs(1) && gap < Duration::from_millis(1010));
    }

    assert_eq!(transport.disconnects(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_runner_cancellation_stops_session() {
    let transport = Arc::new(RecordingTransport::default());
    let simulator = DeviceSimulator::with_transport(
        simulator_config(MessageType::State, 100),
        &issuer(),
        Arc::clone(&transport) as Arc<dyn TelemetryTransport>,
    )
    .unwrap();

    let token = CancellationToken::new();
    let cancel = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(12)).await;
        cancel.cancel();
    });

    let (result, outcome) = run_session(simulator, token).await;
    assert!(result.is_ok());

    let summary = outcome.unwrap();
    assert!(summary.cancelled);
    // ticks at 0s, 5s, 10s
    assert_eq!(summary.published, 3);
    assert_eq!(transport.deliveries().len(), 3);
    assert_eq!(transport.disconnects(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_expired_token_ends_session_without_publishing() {
    let transport = Arc::new(RecordingTransport::default());
    let stale_issuer =
        issuer().with_clock(Arc::new(FixedClock(Utc::now() - chrono::Duration::hours(2))));

    let simulator = DeviceSimulator::with_transport(
        simulator_config(MessageType::Event, 3),
        &stale_issuer,
        Arc::clone(&transport) as Arc<dyn TelemetryTransport>,
    )
    .unwrap();

    let (result, outcome) = run_session(simulator, CancellationToken::new()).await;
    assert!(result.is_err());
    assert!(matches!(outcome, Err(DomainError::CredentialExpired { .. })));
    assert!(transport.deliveries().is_empty());
    assert_eq!(transport.disconnects(), 1);
}
