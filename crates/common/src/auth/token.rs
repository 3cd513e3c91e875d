use crate::auth::TOKEN_VALIDITY_MINUTES;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Registered claims carried by a device token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceTokenClaims {
    pub iat: i64, // issued at, unix seconds
    pub exp: i64, // expiration, unix seconds
    pub aud: String,
}

/// A signed, time-bounded device credential.
///
/// `expires_at` is always `issued_at` plus the fixed validity window.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken {
    encoded: String,
    audience: String,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl AuthToken {
    pub fn new(encoded: String, audience: String, issued_at: DateTime<Utc>) -> Self {
        Self {
            encoded,
            audience,
            issued_at,
            expires_at: issued_at + Self::validity(),
        }
    }

    pub fn validity() -> Duration {
        Duration::minutes(TOKEN_VALIDITY_MINUTES)
    }

    pub fn encoded(&self) -> &str {
        &self.encoded
    }

    pub fn audience(&self) -> &str {
        &self.audience
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Valid on the half-open interval `[issued_at, expires_at)`
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.issued_at <= now && now < self.expires_at
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn claims(&self) -> DeviceTokenClaims {
        DeviceTokenClaims {
            iat: self.issued_at.timestamp(),
            exp: self.expires_at.timestamp(),
            aud: self.audience.clone(),
        }
    }
}

// The encoded form is a bearer secret; keep it out of logs.
impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthToken")
            .field("audience", &self.audience)
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}
