use crate::auth::AuthToken;
use crate::domain::{DeviceIdentity, DomainResult};

/// Trait for issuing device credentials
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait CredentialIssuer: Send + Sync {
    /// Issue a fresh token for the device, valid from now for the fixed window
    fn issue(&self, identity: &DeviceIdentity) -> DomainResult<AuthToken>;
}
