use crate::domain::EnvironmentalState;
use bytes::Bytes;
use common::domain::{DomainError, DomainResult};
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Field name of the composite index in the published record
pub const G_INDEX_FIELD: &str = "G - Index";

/// Snapshot of one tick, ready to publish
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryRecord {
    pub timestamp: i64,
    pub device: String,
    pub readings: EnvironmentalState,
    pub g_index: f64,
}

impl TelemetryRecord {
    pub fn new(
        timestamp: i64,
        device: impl Into<String>,
        readings: EnvironmentalState,
        g_index: f64,
    ) -> Self {
        Self {
            timestamp,
            device: device.into(),
            readings,
            g_index,
        }
    }

    /// Encode as indented JSON, four spaces per level
    pub fn encode(&self) -> DomainResult<Bytes> {
        let mut buf = Vec::with_capacity(512);
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut serializer)
            .map_err(|e| DomainError::SerializationError(e.to_string()))?;
        Ok(Bytes::from(buf))
    }
}

impl Serialize for TelemetryRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3 + crate::domain::Quantity::COUNT))?;
        map.serialize_entry("timestamp", &self.timestamp)?;
        map.serialize_entry("device", &self.device)?;
        for (quantity, value) in self.readings.iter() {
            map.serialize_entry(quantity.wire_name(), &value)?;
        }
        map.serialize_entry(G_INDEX_FIELD, &self.g_index)?;
        map.end()
    }
}
