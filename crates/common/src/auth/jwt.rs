use crate::auth::{AuthToken, CredentialIssuer, DeviceTokenClaims, SigningAlgorithm};
use crate::domain::{Clock, DeviceIdentity, DomainError, DomainResult, SystemClock};
use chrono::{DateTime, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use std::sync::Arc;
use tracing::info;

/// JWT-based implementation of CredentialIssuer.
///
/// The private key is parsed once at construction so that a malformed key or
/// an algorithm/key mismatch is reported before any session is attempted.
pub struct JwtCredentialIssuer {
    algorithm: SigningAlgorithm,
    encoding_key: EncodingKey,
    clock: Arc<dyn Clock>,
}

impl JwtCredentialIssuer {
    pub fn from_pem(private_key_pem: &[u8], algorithm: SigningAlgorithm) -> DomainResult<Self> {
        let encoding_key = match algorithm {
            SigningAlgorithm::Rs256 => EncodingKey::from_rsa_pem(private_key_pem),
            SigningAlgorithm::Es256 => EncodingKey::from_ec_pem(private_key_pem),
        }
        .map_err(|e| {
            DomainError::CredentialError(format!(
                "private key is not a valid {} key: {}",
                algorithm, e
            ))
        })?;

        Ok(Self {
            algorithm,
            encoding_key,
            clock: Arc::new(SystemClock),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn algorithm(&self) -> SigningAlgorithm {
        self.algorithm
    }

    /// Issue a token whose validity window starts at `now`
    pub fn issue_at(
        &self,
        identity: &DeviceIdentity,
        now: DateTime<Utc>,
    ) -> DomainResult<AuthToken> {
        // JWT timestamps carry whole seconds
        let issued_at = DateTime::from_timestamp(now.timestamp(), 0).unwrap_or(now);
        let unsigned = AuthToken::new(String::new(), identity.project_id().to_string(), issued_at);
        let claims: DeviceTokenClaims = unsigned.claims();

        let encoded = encode(
            &Header::new(self.algorithm.jwt_algorithm()),
            &claims,
            &self.encoding_key,
        )
        .map_err(|e| DomainError::CredentialError(format!("JWT encoding error: {}", e)))?;

        info!(
            algorithm = %self.algorithm,
            audience = %claims.aud,
            expires_at = %unsigned.expires_at(),
            "issued device token"
        );

        Ok(AuthToken::new(encoded, claims.aud, issued_at))
    }
}

impl CredentialIssuer for JwtCredentialIssuer {
    fn issue(&self, identity: &DeviceIdentity) -> DomainResult<AuthToken> {
        self.issue_at(identity, self.clock.now())
    }
}
