use ringbuffer::{ConstGenericRingBuffer, RingBuffer};

use crate::sensors::{Measurement, Quantity};

pub const WINDOW: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// Last [`WINDOW`] values of each quantity.
#[derive(Default)]
pub struct History {
    temperature: ConstGenericRingBuffer<f64, WINDOW>,
    pressure: ConstGenericRingBuffer<f64, WINDOW>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, measurement: &Measurement) {
        if measurement.value.is_finite() {
            self.buffer_mut(measurement.quantity).push(measurement.value);
        }
    }

    pub fn stats(&self, quantity: Quantity) -> Option<Stats> {
        let buffer = self.buffer(quantity);
        if buffer.is_empty() {
            return None;
        }

        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        for &value in buffer.iter() {
            min = min.min(value);
            max = max.max(value);
            sum += value;
        }
        let count = buffer.len();
        Some(Stats {
            count,
            min,
            max,
            mean: sum / count as f64,
        })
    }

    fn buffer(&self, quantity: Quantity) -> &ConstGenericRingBuffer<f64, WINDOW> {
        match quantity {
            Quantity::Temperature => &self.temperature,
            Quantity::Pressure => &self.pressure,
        }
    }

    fn buffer_mut(&mut self, quantity: Quantity) -> &mut ConstGenericRingBuffer<f64, WINDOW> {
        match quantity {
            Quantity::Temperature => &mut self.temperature,
            Quantity::Pressure => &mut self.pressure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_history_has_no_stats() {
        let history = History::new();
        assert_eq!(history.stats(Quantity::Pressure), None);
    }

    #[test]
    fn stats_are_per_quantity() {
        let mut history = History::new();
        history.record(&Measurement::pressure(1000.0));
        history.record(&Measurement::pressure(1010.0));
        history.record(&Measurement::temperature(20.0));

        let pressure = history.stats(Quantity::Pressure).unwrap();
        assert_eq!(pressure.count, 2);
        assert_eq!(pressure.min, 1000.0);
        assert_eq!(pressure.max, 1010.0);
        assert_eq!(pressure.mean, 1005.0);

        let temperature = history.stats(Quantity::Temperature).unwrap();
        assert_eq!(temperature.count, 1);
        assert_eq!(temperature.mean, 20.0);
    }

    #[test]
    fn window_drops_oldest_values() {
        let mut history = History::new();
        for i in 0..(WINDOW + 4) {
            history.record(&Measurement::temperature(i as f64));
        }
        let stats = history.stats(Quantity::Temperature).unwrap();
        assert_eq!(stats.count, WINDOW);
        assert_eq!(stats.min, 4.0);
        assert_eq!(stats.max, (WINDOW + 3) as f64);
    }

    #[test]
    fn non_finite_values_are_skipped() {
        let mut history = History::new();
        history.record(&Measurement::pressure(f64::NAN));
        assert_eq!(history.stats(Quantity::Pressure), None);
    }
}
