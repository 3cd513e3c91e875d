use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

#[derive(Error, Debug, Clone)]
pub enum DomainError {
    #[error("Invalid device identity: {0}")]
    InvalidDeviceIdentity(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Credential error: {0}")]
    CredentialError(String),

    #[error("Credential expired at {expired_at}")]
    CredentialExpired {
        expired_at: chrono::DateTime<chrono::Utc>,
    },

    #[error("Transport connect error: {0}")]
    TransportConnectError(String),

    #[error("Transport publish error: {0}")]
    TransportPublishError(String),

    #[error("Transport disconnect error: {0}")]
    TransportDisconnectError(String),

    #[error("Composite index denominator is zero")]
    DivisionByZero,

    #[error("Composite index is not a finite number: {0}")]
    NonFiniteIndex(f64),

    #[error("Skipped {skipped} ticks, exceeding the limit of {limit}")]
    SkipBudgetExhausted { skipped: u32, limit: u32 },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl DomainError {
    /// Recoverable errors are absorbed by the tick that produced them.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DomainError::DivisionByZero
                | DomainError::NonFiniteIndex(_)
                | DomainError::TransportPublishError(_)
        )
    }
}
