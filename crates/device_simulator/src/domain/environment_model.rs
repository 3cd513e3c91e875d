use crate::domain::{EnvironmentalState, Quantity};
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;
use sha2::{Digest, Sha256};

/// Mean and standard deviation of the per-tick temperature step
pub const TEMPERATURE_STEP: (f64, f64) = (0.01, 0.005);

/// Mean and standard deviation of the per-tick step of every other quantity
pub const QUANTITY_STEP: (f64, f64) = (0.1, 0.01);

/// Direction in which both temperatures drift for a whole session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemperatureTrend {
    Rising,
    Falling,
}

impl TemperatureTrend {
    pub fn sign(self) -> f64 {
        match self {
            TemperatureTrend::Rising => 1.0,
            TemperatureTrend::Falling => -1.0,
        }
    }
}

/// Derive the simulation generator from a device identifier.
///
/// The SHA-256 digest of the identifier is the ChaCha8 seed, so a given device
/// always replays the same readings.
pub fn seeded_rng(seed: &str) -> ChaCha8Rng {
    ChaCha8Rng::from_seed(Sha256::digest(seed.as_bytes()).into())
}

/// Seeded random walk over the environmental quantities.
///
/// Temperatures drift in the session's fixed trend direction; every other
/// quantity moves up or down on a fresh coin flip each tick, with outdoor
/// humidity taking the opposite sign of its flip. Values are never clamped.
pub struct EnvironmentModel<R: RngCore = ChaCha8Rng> {
    rng: R,
    state: EnvironmentalState,
    trend: TemperatureTrend,
    ticks: u64,
}

impl EnvironmentModel<ChaCha8Rng> {
    /// Build the model for a device, seeded from its identifier
    pub fn initialize(seed: &str) -> Self {
        Self::from_rng(seeded_rng(seed))
    }
}

impl<R: RngCore> EnvironmentModel<R> {
    /// Build the model from an explicit generator
    pub fn from_rng(mut rng: R) -> Self {
        let values = Quantity::ALL.map(|q| q.base() + rng.gen::<f64>() * q.range());

        let trend = if rng.gen::<f64>() > 0.5 {
            TemperatureTrend::Rising
        } else {
            TemperatureTrend::Falling
        };

        Self {
            rng,
            state: EnvironmentalState::from_values(values),
            trend,
            ticks: 0,
        }
    }

    pub fn state(&self) -> &EnvironmentalState {
        &self.state
    }

    pub fn trend(&self) -> TemperatureTrend {
        self.trend
    }

    /// Number of completed `advance` calls
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Evolve every quantity by one tick and return the new state
    pub fn advance(&mut self) -> &EnvironmentalState {
        for quantity in Quantity::ALL {
            let delta = if quantity.is_temperature() {
                self.trend.sign() * self.normal(TEMPERATURE_STEP)
            } else {
                let coin = if self.rng.gen::<f64>() > 0.5 { 1.0 } else { -1.0 };
                let sign = match quantity {
                    Quantity::HumidityOut => -coin,
                    _ => coin,
                };
                sign * self.normal(QUANTITY_STEP)
            };
            self.state.add(quantity, delta);
        }

        self.ticks += 1;
        &self.state
    }

    fn normal(&mut self, (mean, std_dev): (f64, f64)) -> f64 {
        let z: f64 = self.rng.sample(StandardNormal);
        mean + std_dev * z
    }
}
