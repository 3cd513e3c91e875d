use crate::domain::{DomainError, DomainResult};
use std::fmt;

/// Identity of a simulated device within a cloud IoT registry.
///
/// The project ID doubles as the token audience, and the full tuple forms the
/// MQTT client identifier expected by the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    project_id: String,
    region: String,
    registry_id: String,
    device_id: String,
}

impl DeviceIdentity {
    pub fn new(
        project_id: impl Into<String>,
        region: impl Into<String>,
        registry_id: impl Into<String>,
        device_id: impl Into<String>,
    ) -> DomainResult<Self> {
        let identity = Self {
            project_id: project_id.into(),
            region: region.into(),
            registry_id: registry_id.into(),
            device_id: device_id.into(),
        };

        for (field, value) in [
            ("project_id", &identity.project_id),
            ("region", &identity.region),
            ("registry_id", &identity.registry_id),
            ("device_id", &identity.device_id),
        ] {
            if value.trim().is_empty() {
                return Err(DomainError::InvalidDeviceIdentity(format!(
                    "{} cannot be empty",
                    field
                )));
            }
        }

        Ok(identity)
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn registry_id(&self) -> &str {
        &self.registry_id
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Canonical client identifier:
    /// `projects/{project}/locations/{region}/registries/{registry}/devices/{device}`
    pub fn client_id(&self) -> String {
        format!(
            "projects/{}/locations/{}/registries/{}/devices/{}",
            self.project_id, self.region, self.registry_id, self.device_id
        )
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.client_id())
    }
}
