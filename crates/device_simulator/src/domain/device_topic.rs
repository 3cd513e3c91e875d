use crate::domain::MessageType;
use common::domain::{DomainError, DomainResult};

/// Publish topic of a device: `/devices/{device_id}/{events|state}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceTopic {
    pub device_id: String,
    pub message_type: MessageType,
}

pub fn device_topic(device_id: &str, message_type: MessageType) -> String {
    format!("/devices/{}/{}", device_id, message_type.topic_suffix())
}

/// Parse a device publish topic
///
/// # Examples
/// ```
/// use device_simulator::domain::{parse_device_topic, MessageType};
///
/// let parsed = parse_device_topic("/devices/dev-1/events").unwrap();
/// assert_eq!(parsed.device_id, "dev-1");
/// assert_eq!(parsed.message_type, MessageType::Event);
/// ```
pub fn parse_device_topic(topic: &str) -> DomainResult<DeviceTopic> {
    let invalid = || {
        DomainError::InvalidConfig(format!(
            "Invalid topic format '{}': expected '/devices/{{device_id}}/{{events|state}}'",
            topic
        ))
    };

    let parts: Vec<&str> = topic.split('/').collect();
    let [leading, devices, device_id, suffix] = parts.as_slice() else {
        return Err(invalid());
    };

    if !leading.is_empty() || *devices != "devices" || device_id.trim().is_empty() {
        return Err(invalid());
    }

    let message_type = match *suffix {
        "events" => MessageType::Event,
        "state" => MessageType::State,
        _ => return Err(invalid()),
    };

    Ok(DeviceTopic {
        device_id: device_id.to_string(),
        message_type,
    })
}
