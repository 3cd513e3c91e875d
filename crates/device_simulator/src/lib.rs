pub mod domain;
pub mod mqtt;
mod device_simulator;

pub use device_simulator::*;
