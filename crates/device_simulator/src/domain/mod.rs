mod composite_index;
mod connection_status;
mod device_topic;
mod environment;
mod environment_model;
mod session_config;
mod session_controller;
mod telemetry_record;
mod transport;

pub use composite_index::*;
pub use connection_status::*;
pub use device_topic::*;
pub use environment::*;
pub use environment_model::*;
pub use session_config::*;
pub use session_controller::*;
pub use telemetry_record::*;
pub use transport::*;
