use common::auth::{CredentialConfig, SigningAlgorithm};
use common::domain::{DeviceIdentity, DomainError, DomainResult};
use common::telemetry::{LogFormat, TelemetryConfig};
use config::{Config, ConfigError, Environment};
use device_simulator::domain::{BrokerConfig, MessageType, SessionConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServiceConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log output format (json, pretty)
    #[serde(default = "default_log_format")]
    pub log_format: String,

    // Device identity
    /// Cloud project; falls back to GOOGLE_CLOUD_PROJECT
    #[serde(default)]
    pub project_id: String,

    #[serde(default = "default_cloud_region")]
    pub cloud_region: String,

    #[serde(default)]
    pub registry_id: String,

    #[serde(default)]
    pub device_id: String,

    // Credentials
    /// Path to the PEM private key used to sign device tokens
    #[serde(default)]
    pub private_key_file: String,

    /// Token signing algorithm (RS256 or ES256)
    #[serde(default)]
    pub algorithm: String,

    // Broker
    /// CA root certificates trusted for the broker connection
    #[serde(default = "default_ca_certs")]
    pub ca_certs: String,

    #[serde(default = "default_mqtt_bridge_hostname")]
    pub mqtt_bridge_hostname: String,

    #[serde(default = "default_mqtt_bridge_port")]
    pub mqtt_bridge_port: u16,

    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    // Session
    /// Number of records to publish
    #[serde(default = "default_num_messages")]
    pub num_messages: u32,

    /// event (every second) or state (every five seconds)
    #[serde(default = "default_message_type")]
    pub message_type: String,

    /// Ticks without a valid index tolerated before giving up
    #[serde(default = "default_max_skipped_ticks")]
    pub max_skipped_ticks: u32,

    // Shutdown
    #[serde(default = "default_closer_timeout_secs")]
    pub closer_timeout_secs: u64,

    // OpenTelemetry configuration
    #[serde(default = "default_otel_endpoint")]
    pub otel_endpoint: String,

    #[serde(default = "default_otel_enabled")]
    pub otel_enabled: bool,

    #[serde(default = "default_otel_service_name")]
    pub otel_service_name: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_cloud_region() -> String {
    "us-central1".to_string()
}

fn default_ca_certs() -> String {
    "roots.pem".to_string()
}

fn default_mqtt_bridge_hostname() -> String {
    device_simulator::domain::DEFAULT_BROKER_HOST.to_string()
}

fn default_mqtt_bridge_port() -> u16 {
    device_simulator::domain::DEFAULT_BROKER_PORT
}

fn default_keep_alive_secs() -> u64 {
    60
}

fn default_connect_timeout_secs() -> u64 {
    30
}

fn default_num_messages() -> u32 {
    100
}

fn default_message_type() -> String {
    "event".to_string()
}

fn default_max_skipped_ticks() -> u32 {
    device_simulator::domain::DEFAULT_MAX_SKIPPED_TICKS
}

fn default_closer_timeout_secs() -> u64 {
    10
}

// OpenTelemetry defaults
fn default_otel_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_otel_enabled() -> bool {
    false
}

fn default_otel_service_name() -> String {
    "envsim-device".to_string()
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let project_fallback = std::env::var("GOOGLE_CLOUD_PROJECT").unwrap_or_default();

        Config::builder()
            .set_default("project_id", project_fallback)?
            .add_source(Environment::with_prefix("ENVSIM"))
            .build()?
            .try_deserialize()
    }

    pub fn identity(&self) -> DomainResult<DeviceIdentity> {
        DeviceIdentity::new(
            &self.project_id,
            &self.cloud_region,
            &self.registry_id,
            &self.device_id,
        )
    }

    pub fn credential_config(&self) -> DomainResult<CredentialConfig> {
        if self.private_key_file.trim().is_empty() {
            return Err(DomainError::InvalidConfig(
                "private_key_file must be set".to_string(),
            ));
        }
        if self.algorithm.trim().is_empty() {
            return Err(DomainError::InvalidConfig(
                "algorithm must be set to RS256 or ES256".to_string(),
            ));
        }

        let algorithm: SigningAlgorithm = self.algorithm.parse()?;
        Ok(CredentialConfig::new(algorithm, &self.private_key_file))
    }

    pub fn session_config(&self) -> DomainResult<SessionConfig> {
        let message_type: MessageType = self.message_type.parse()?;
        Ok(SessionConfig::new(message_type, self.num_messages)?
            .with_max_skipped_ticks(self.max_skipped_ticks))
    }

    pub fn broker_config(&self) -> DomainResult<BrokerConfig> {
        if self.mqtt_bridge_hostname.trim().is_empty() {
            return Err(DomainError::InvalidConfig(
                "mqtt_bridge_hostname must be set".to_string(),
            ));
        }

        Ok(BrokerConfig {
            host: self.mqtt_bridge_hostname.clone(),
            port: self.mqtt_bridge_port,
            ca_certs_path: PathBuf::from(&self.ca_certs),
            keep_alive: Duration::from_secs(self.keep_alive_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
        })
    }

    pub fn telemetry_config(&self) -> DomainResult<TelemetryConfig> {
        let log_format: LogFormat = self
            .log_format
            .parse()
            .map_err(DomainError::InvalidConfig)?;

        Ok(TelemetryConfig {
            service_name: self.otel_service_name.clone(),
            otel_endpoint: self.otel_endpoint.clone(),
            otel_enabled: self.otel_enabled,
            log_level: self.log_level.clone(),
            log_format,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Mutex to ensure tests run serially and don't interfere with each other
    static TEST_LOCK: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        "ENVSIM_PROJECT_ID",
        "ENVSIM_REGISTRY_ID",
        "ENVSIM_DEVICE_ID",
        "ENVSIM_PRIVATE_KEY_FILE",
        "ENVSIM_ALGORITHM",
        "ENVSIM_NUM_MESSAGES",
        "ENVSIM_MESSAGE_TYPE",
        "ENVSIM_MQTT_BRIDGE_PORT",
        "ENVSIM_LOG_LEVEL",
        "ENVSIM_LOG_FORMAT",
        "GOOGLE_CLOUD_PROJECT",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_default_config() {
        let _lock = TEST_LOCK.lock().unwrap();
        clear_env();

        let config = ServiceConfig::from_env().unwrap();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.cloud_region, "us-central1");
        assert_eq!(config.ca_certs, "roots.pem");
        assert_eq!(config.num_messages, 100);
        assert_eq!(config.message_type, "event");
        assert_eq!(config.mqtt_bridge_hostname, "mqtt.googleapis.com");
        assert_eq!(config.mqtt_bridge_port, 8883);
        assert_eq!(config.max_skipped_ticks, 10);
        assert!(!config.otel_enabled);
        assert!(config.project_id.is_empty());
    }

    #[test]
    fn test_custom_config() {
        let _lock = TEST_LOCK.lock().unwrap();
        clear_env();

        std::env::set_var("ENVSIM_PROJECT_ID", "my-project");
        std::env::set_var("ENVSIM_REGISTRY_ID", "my-registry");
        std::env::set_var("ENVSIM_DEVICE_ID", "dev-1");
        std::env::set_var("ENVSIM_PRIVATE_KEY_FILE", "/keys/ec_private.pem");
        std::env::set_var("ENVSIM_ALGORITHM", "ES256");
        std::env::set_var("ENVSIM_NUM_MESSAGES", "3");
        std::env::set_var("ENVSIM_MESSAGE_TYPE", "state");
        std::env::set_var("ENVSIM_MQTT_BRIDGE_PORT", "443");

        let config = ServiceConfig::from_env().unwrap();

        let identity = config.identity().unwrap();
        assert_eq!(
            identity.client_id(),
            "projects/my-project/locations/us-central1/registries/my-registry/devices/dev-1"
        );

        let credentials = config.credential_config().unwrap();
        assert_eq!(credentials.algorithm, SigningAlgorithm::Es256);

        let session = config.session_config().unwrap();
        assert_eq!(session.message_type, MessageType::State);
        assert_eq!(session.message_count, 3);
        assert_eq!(session.tick_interval, Duration::from_secs(5));

        assert_eq!(config.broker_config().unwrap().port, 443);

        clear_env();
    }

    #[test]
    fn test_project_falls_back_to_cloud_env() {
        let _lock = TEST_LOCK.lock().unwrap();
        clear_env();

        std::env::set_var("GOOGLE_CLOUD_PROJECT", "fallback-project");
        let config = ServiceConfig::from_env().unwrap();
        assert_eq!(config.project_id, "fallback-project");

        std::env::set_var("ENVSIM_PROJECT_ID", "explicit-project");
        let config = ServiceConfig::from_env().unwrap();
        assert_eq!(config.project_id, "explicit-project");

        clear_env();
    }

    #[test]
    fn test_missing_identity_is_rejected() {
        let _lock = TEST_LOCK.lock().unwrap();
        clear_env();

        let config = ServiceConfig::from_env().unwrap();
        assert!(matches!(
            config.identity(),
            Err(DomainError::InvalidDeviceIdentity(_))
        ));
        assert!(matches!(
            config.credential_config(),
            Err(DomainError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_unknown_algorithm_is_credential_error() {
        let _lock = TEST_LOCK.lock().unwrap();
        clear_env();

        std::env::set_var("ENVSIM_PRIVATE_KEY_FILE", "/keys/key.pem");
        std::env::set_var("ENVSIM_ALGORITHM", "HS256");
        let config = ServiceConfig::from_env().unwrap();
        assert!(matches!(
            config.credential_config(),
            Err(DomainError::CredentialError(_))
        ));

        clear_env();
    }

    #[test]
    fn test_zero_messages_rejected() {
        let _lock = TEST_LOCK.lock().unwrap();
        clear_env();

        std::env::set_var("ENVSIM_NUM_MESSAGES", "0");
        let config = ServiceConfig::from_env().unwrap();
        assert!(matches!(
            config.session_config(),
            Err(DomainError::InvalidConfig(_))
        ));

        clear_env();
    }

    #[test]
    fn test_log_format_is_validated() {
        let _lock = TEST_LOCK.lock().unwrap();
        clear_env();

        let config = ServiceConfig::from_env().unwrap();
        assert_eq!(config.telemetry_config().unwrap().log_format, LogFormat::Json);

        std::env::set_var("ENVSIM_LOG_FORMAT", "pretty");
        let config = ServiceConfig::from_env().unwrap();
        assert_eq!(config.telemetry_config().unwrap().log_format, LogFormat::Pretty);

        std::env::set_var("ENVSIM_LOG_FORMAT", "jsno");
        let config = ServiceConfig::from_env().unwrap();
        assert!(matches!(
            config.telemetry_config(),
            Err(DomainError::InvalidConfig(msg)) if msg.contains("jsno")
        ));

        clear_env();
    }
}
