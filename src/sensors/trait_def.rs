use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantity {
    Temperature,
    Pressure,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub quantity: Quantity,
    pub value: f64,
}

impl Measurement {
    pub fn temperature(celsius: f64) -> Self {
        Self {
            quantity: Quantity::Temperature,
            value: celsius,
        }
    }

    pub fn pressure(hpa: f64) -> Self {
        Self {
            quantity: Quantity::Pressure,
            value: hpa,
        }
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.quantity {
            Quantity::Temperature => write!(f, "Temperature(from LPS25H) = {:.2}°C", self.value),
            Quantity::Pressure => write!(f, "Pressure = {:.0} hPa", self.value),
        }
    }
}

pub trait Sensor {
    type Error: fmt::Debug;

    fn name(&self) -> &'static str;
    fn measure(&mut self) -> Result<Vec<Measurement>, Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_console_format() {
        assert_eq!(
            Measurement::temperature(21.456).to_string(),
            "Temperature(from LPS25H) = 21.46°C"
        );
        assert_eq!(
            Measurement::pressure(1013.4).to_string(),
            "Pressure = 1013 hPa"
        );
    }
}
