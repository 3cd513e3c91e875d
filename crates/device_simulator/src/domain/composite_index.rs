use crate::domain::{EnvironmentalState, Quantity};
use common::domain::{DomainError, DomainResult};

/// Trait for deriving the scalar index published with every reading
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait CompositeIndex: Send + Sync {
    fn compute(&self, state: &EnvironmentalState) -> DomainResult<f64>;
}

/// The "G - Index":
///
/// ```text
/// ((tempIn - tempOut)^3 / 500 + (ch4 + co2 + n2o + cfc)^(1/4)
///   - 10 * (soilMoisture + solarIrradiance) + uvIndex)
/// / (pressure + (humidityIn - humidityOut))
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct GIndex;

impl GIndex {
    pub fn new() -> Self {
        Self
    }
}

impl CompositeIndex for GIndex {
    fn compute(&self, state: &EnvironmentalState) -> DomainResult<f64> {
        let q = |quantity: Quantity| state.get(quantity);

        let denominator =
            q(Quantity::Pressure) + (q(Quantity::HumidityIn) - q(Quantity::HumidityOut));
        if denominator == 0.0 {
            return Err(DomainError::DivisionByZero);
        }

        let temperature_gap = q(Quantity::TempIn) - q(Quantity::TempOut);
        let gases = q(Quantity::Methane)
            + q(Quantity::CarbonDioxide)
            + q(Quantity::NitrousOxide)
            + q(Quantity::Cfc);

        let numerator = temperature_gap.powi(3) / 500.0 + gases.sqrt().sqrt()
            - 10.0 * (q(Quantity::SoilMoisture) + q(Quantity::SolarIrradiance))
            + q(Quantity::UvIndex);

        let index = numerator / denominator;
        if !index.is_finite() {
            return Err(DomainError::NonFiniteIndex(index));
        }

        Ok(index)
    }
}
