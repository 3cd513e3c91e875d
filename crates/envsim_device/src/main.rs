mod config;

use common::auth::JwtCredentialIssuer;
use common::domain::{DomainError, DomainResult};
use common::telemetry::{init_telemetry, shutdown_telemetry, TelemetryProviders};
use crate::config::ServiceConfig;
use device_simulator::{DeviceSimulator, DeviceSimulatorConfig};
use envsim_runner::Runner;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, error, info};

const EXIT_OK: i32 = 0;
const EXIT_FAILURE: i32 = 1;
const EXIT_CREDENTIAL: i32 = 2;
const EXIT_CREDENTIAL_EXPIRED: i32 = 3;
const EXIT_CONNECT: i32 = 4;
const EXIT_SKIP_BUDGET: i32 = 5;

#[tokio::main]
async fn main() {
    let config = match ServiceConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(EXIT_FAILURE);
        }
    };

    let telemetry_config = match config.telemetry_config() {
        Ok(telemetry_config) => telemetry_config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(EXIT_FAILURE);
        }
    };

    // Initialize telemetry (tracing + optional OpenTelemetry for traces and logs)
    let telemetry_providers: Option<TelemetryProviders> = match init_telemetry(&telemetry_config) {
        Ok(providers) => providers,
        Err(e) => {
            eprintln!("Failed to initialize telemetry: {}", e);
            std::process::exit(EXIT_FAILURE);
        }
    };

    info!(
        device_id = %config.device_id,
        message_type = %config.message_type,
        num_messages = config.num_messages,
        otel_enabled = config.otel_enabled,
        "Starting envsim-device"
    );
    debug!("Configuration: {:?}", config);

    let simulator = match build_simulator(&config) {
        Ok(simulator) => simulator,
        Err(e) => {
            error!(error = %e, "Failed to initialize device session");
            shutdown_telemetry(telemetry_providers);
            std::process::exit(exit_code(&e));
        }
    };

    let (outcome_tx, outcome_rx) = oneshot::channel();

    let run_result = Runner::new()
        .with_named_process("device_session", simulator.into_runner_process(outcome_tx))
        .with_closer(move || async move {
            info!("Running cleanup tasks...");
            // Flush pending traces and logs
            shutdown_telemetry(telemetry_providers);
            Ok::<(), anyhow::Error>(())
        })
        .with_closer_timeout(Duration::from_secs(config.closer_timeout_secs))
        .run()
        .await;

    let code = match outcome_rx.await {
        Ok(Ok(_)) => EXIT_OK,
        Ok(Err(e)) => exit_code(&e),
        // session never reported: it panicked
        Err(_) if run_result.is_err() => EXIT_FAILURE,
        Err(_) => EXIT_OK,
    };

    if let Err(e) = run_result {
        eprintln!("envsim-device failed: {:#}", e);
    }
    std::process::exit(code);
}

fn build_simulator(config: &ServiceConfig) -> DomainResult<DeviceSimulator> {
    let identity = config.identity()?;
    let session = config.session_config()?;
    let broker = config.broker_config()?;

    let credentials = config.credential_config()?;
    let private_key = credentials.read_private_key()?;
    let issuer = JwtCredentialIssuer::from_pem(&private_key, credentials.algorithm)?;

    DeviceSimulator::new(
        DeviceSimulatorConfig {
            identity,
            session,
            broker,
        },
        &issuer,
    )
}

fn exit_code(error: &DomainError) -> i32 {
    match error {
        DomainError::CredentialError(_) => EXIT_CREDENTIAL,
        DomainError::CredentialExpired { .. } => EXIT_CREDENTIAL_EXPIRED,
        DomainError::TransportConnectError(_) => EXIT_CONNECT,
        DomainError::SkipBudgetExhausted { .. } => EXIT_SKIP_BUDGET,
        _ => EXIT_FAILURE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct() {
        let codes = [
            exit_code(&DomainError::CredentialError("bad key".to_string())),
            exit_code(&DomainError::CredentialExpired {
                expired_at: chrono::Utc::now(),
            }),
            exit_code(&DomainError::TransportConnectError("refused".to_string())),
            exit_code(&DomainError::SkipBudgetExhausted { skipped: 11, limit: 10 }),
            exit_code(&DomainError::InvalidConfig("bad".to_string())),
        ];
        assert_eq!(codes, [2, 3, 4, 5, 1]);
    }

    #[test]
    fn test_invalid_identity_is_generic_failure() {
        let code = exit_code(&DomainError::InvalidDeviceIdentity("device_id".to_string()));
        assert_eq!(code, EXIT_FAILURE);
    }
}
