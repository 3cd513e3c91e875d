use std::fmt;

/// The simulated physical quantities, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantity {
    TempIn,
    TempOut,
    Pressure,
    HumidityIn,
    HumidityOut,
    UvIndex,
    SolarIrradiance,
    SoilMoisture,
    CarbonDioxide,
    Methane,
    NitrousOxide,
    Cfc,
}

impl Quantity {
    pub const COUNT: usize = 12;

    pub const ALL: [Quantity; Quantity::COUNT] = [
        Quantity::TempIn,
        Quantity::TempOut,
        Quantity::Pressure,
        Quantity::HumidityIn,
        Quantity::HumidityOut,
        Quantity::UvIndex,
        Quantity::SolarIrradiance,
        Quantity::SoilMoisture,
        Quantity::CarbonDioxide,
        Quantity::Methane,
        Quantity::NitrousOxide,
        Quantity::Cfc,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Field name used in the published record
    pub fn wire_name(self) -> &'static str {
        match self {
            Quantity::TempIn => "Temp In",
            Quantity::TempOut => "Temp Out",
            Quantity::Pressure => "Pressure",
            Quantity::HumidityIn => "Humidity In",
            Quantity::HumidityOut => "Humidity Out",
            Quantity::UvIndex => "UV Index",
            Quantity::SolarIrradiance => "Solar Irradiance",
            Quantity::SoilMoisture => "Soil Moisture",
            Quantity::CarbonDioxide => "Carbon Dioxide ppb",
            Quantity::Methane => "Methan ppb",
            Quantity::NitrousOxide => "Nitrous Oxide ppb",
            Quantity::Cfc => "CFC ppb",
        }
    }

    /// Lower bound of the initial value
    pub fn base(self) -> f64 {
        match self {
            Quantity::TempIn => 45.0,
            Quantity::TempOut => 35.0,
            Quantity::Pressure => 1000.0,
            Quantity::HumidityIn => 25.0,
            Quantity::HumidityOut => 15.0,
            Quantity::UvIndex => 5.0,
            Quantity::SolarIrradiance => 6.0,
            Quantity::SoilMoisture => 50.0,
            Quantity::CarbonDioxide => 430.0,
            Quantity::Methane => 1900.0,
            Quantity::NitrousOxide => 330.0,
            Quantity::Cfc => 900.0,
        }
    }

    /// Width of the uniform spread above `base` for the initial value
    pub fn range(self) -> f64 {
        match self {
            Quantity::TempIn => 20.0,
            Quantity::TempOut => 10.0,
            Quantity::Pressure => 25.0,
            Quantity::HumidityIn => 30.0,
            Quantity::HumidityOut => 30.0,
            Quantity::UvIndex => 10.0,
            Quantity::SolarIrradiance => 10.0,
            Quantity::SoilMoisture => 10.0,
            Quantity::CarbonDioxide => 50.0,
            Quantity::Methane => 200.0,
            Quantity::NitrousOxide => 100.0,
            Quantity::Cfc => 300.0,
        }
    }

    pub fn is_temperature(self) -> bool {
        matches!(self, Quantity::TempIn | Quantity::TempOut)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Current reading of every simulated quantity.
///
/// Values are only written by the environment model's evolution rule.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentalState {
    values: [f64; Quantity::COUNT],
}

impl EnvironmentalState {
    pub(crate) fn from_values(values: [f64; Quantity::COUNT]) -> Self {
        Self { values }
    }

    pub fn get(&self, quantity: Quantity) -> f64 {
        self.values[quantity.index()]
    }

    pub(crate) fn add(&mut self, quantity: Quantity, delta: f64) {
        self.values[quantity.index()] += delta;
    }

    /// Iterate `(quantity, value)` pairs in wire order
    pub fn iter(&self) -> impl Iterator<Item = (Quantity, f64)> + '_ {
        Quantity::ALL.iter().map(move |q| (*q, self.values[q.index()]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_is_in_index_order() {
        for (i, quantity) in Quantity::ALL.iter().enumerate() {
            assert_eq!(quantity.index(), i);
        }
    }

    #[test]
    fn test_wire_names_are_unique() {
        let mut names: Vec<_> = Quantity::ALL.iter().map(|q| q.wire_name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), Quantity::COUNT);
    }

    #[test]
    fn test_only_temperatures_follow_trend() {
        let temperatures: Vec<_> = Quantity::ALL
            .iter()
            .filter(|q| q.is_temperature())
            .collect();
        assert_eq!(temperatures, vec![&Quantity::TempIn, &Quantity::TempOut]);
    }

    #[test]
    fn test_state_get_and_iter() {
        let mut values = [0.0; Quantity::COUNT];
        values[Quantity::Pressure.index()] = 1012.5;
        let mut state = EnvironmentalState::from_values(values);
        state.add(Quantity::Pressure, 0.5);

        assert_eq!(state.get(Quantity::Pressure), 1013.0);
        let collected: Vec<_> = state.iter().collect();
        assert_eq!(collected.len(), Quantity::COUNT);
        assert_eq!(collected[2], (Quantity::Pressure, 1013.0));
    }
}
