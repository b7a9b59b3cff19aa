//! STMicroelectronics LPS25H pressure/temperature sensor, one-shot mode.
//!
//! A measurement cycle is strictly `initialize` -> `await_ready` ->
//! `read_measurement`. The driver tracks where it is in that cycle and
//! refuses out-of-order calls; any bus fault drops it back to idle so the
//! next cycle can start from `initialize` on the same bus.

use std::fmt;
use std::time::Duration;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::{debug, trace, warn};

use super::trait_def::{Measurement, Sensor};

/// 7-bit slave address with SA0 pulled high (Sense HAT wiring).
pub const ADDRESS: u8 = 0x5C;

pub const WHO_AM_I: u8 = 0x0F;
pub const CTRL_REG1: u8 = 0x20;
pub const CTRL_REG2: u8 = 0x21;
pub const PRESS_OUT_XL: u8 = 0x28;
pub const PRESS_OUT_L: u8 = 0x29;
pub const PRESS_OUT_H: u8 = 0x2A;
pub const PTEMP_OUT_L: u8 = 0x2B;
pub const PTEMP_OUT_H: u8 = 0x2C;

pub const DEVICE_ID: u8 = 0xBD;

const CTRL1_POWER_DOWN: u8 = 0x00;
// PD=1, ODR=001 (1 Hz)
const CTRL1_ACTIVE: u8 = 0x84;
const CTRL2_ONE_SHOT: u8 = 0x01;

const TEMPERATURE_OFFSET_C: f64 = 42.5;
const TEMPERATURE_LSB_PER_C: f64 = 480.0;
const PRESSURE_LSB_PER_HPA: f64 = 4096.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError<E> {
    BusFault(E),
    Timeout,
    UnexpectedDevice(u8),
    OutOfSequence,
}

impl<E: fmt::Debug> fmt::Display for SensorError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorError::BusFault(e) => write!(f, "bus fault: {e:?}"),
            SensorError::Timeout => write!(f, "measurement did not complete in time"),
            SensorError::UnexpectedDevice(id) => {
                write!(f, "unexpected WHO_AM_I {id:#04x}, expected {DEVICE_ID:#04x}")
            }
            SensorError::OutOfSequence => write!(f, "operation called out of sequence"),
        }
    }
}

impl<E: fmt::Debug> std::error::Error for SensorError<E> {}

/// How long to wait for a one-shot conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// `None` polls forever.
    pub max_polls: Option<u32>,
}

impl PollPolicy {
    pub const fn bounded(interval: Duration, max_polls: u32) -> Self {
        Self {
            interval,
            max_polls: Some(max_polls),
        }
    }

    pub const fn unbounded(interval: Duration) -> Self {
        Self {
            interval,
            max_polls: None,
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        // A one-shot conversion at default averaging finishes well inside a second.
        Self::bounded(Duration::from_millis(25), 40)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Triggered,
    Ready,
}

/// Output registers as read off the bus, in register order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawReading {
    pub temp_l: u8,
    pub temp_h: u8,
    pub press_xl: u8,
    pub press_l: u8,
    pub press_h: u8,
}

impl RawReading {
    pub fn temperature_raw(&self) -> i16 {
        i16::from_le_bytes([self.temp_l, self.temp_h])
    }

    pub fn pressure_raw(&self) -> u32 {
        u32::from(self.press_xl) | u32::from(self.press_l) << 8 | u32::from(self.press_h) << 16
    }

    pub fn decode(&self) -> PressureReading {
        PressureReading {
            temperature_c: TEMPERATURE_OFFSET_C
                + f64::from(self.temperature_raw()) / TEMPERATURE_LSB_PER_C,
            pressure_hpa: f64::from(self.pressure_raw()) / PRESSURE_LSB_PER_HPA,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PressureReading {
    pub temperature_c: f64,
    pub pressure_hpa: f64,
}

pub struct Lps25h<I2C, D> {
    i2c: I2C,
    delay: D,
    poll: PollPolicy,
    max_attempts: u8,
    phase: Phase,
}

impl<I2C, D> Lps25h<I2C, D>
where
    I2C: I2c,
    D: DelayNs,
{
    pub fn new(i2c: I2C, delay: D) -> Self {
        Self {
            i2c,
            delay,
            poll: PollPolicy::default(),
            max_attempts: 3,
            phase: Phase::Idle,
        }
    }

    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    /// Number of full measurement cycles tried by [`Sensor::measure`] before giving up.
    pub fn with_max_attempts(mut self, attempts: u8) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn release(self) -> (I2C, D) {
        (self.i2c, self.delay)
    }

    /// Check WHO_AM_I.
    pub fn probe(&mut self) -> Result<(), SensorError<I2C::Error>> {
        let id = self.read_register(WHO_AM_I)?;
        if id != DEVICE_ID {
            return Err(SensorError::UnexpectedDevice(id));
        }
        debug!("LPS25H found at {ADDRESS:#04x}");
        Ok(())
    }

    /// Reset the control registers and trigger a single conversion.
    pub fn initialize(&mut self) -> Result<(), SensorError<I2C::Error>> {
        self.phase = Phase::Idle;
        self.write_register(CTRL_REG1, CTRL1_POWER_DOWN)?;
        self.write_register(CTRL_REG1, CTRL1_ACTIVE)?;
        self.write_register(CTRL_REG2, CTRL2_ONE_SHOT)?;
        self.phase = Phase::Triggered;
        Ok(())
    }

    /// Poll CTRL_REG2 until the device clears the one-shot bit.
    pub fn await_ready(&mut self) -> Result<(), SensorError<I2C::Error>> {
        match self.phase {
            Phase::Idle => return Err(SensorError::OutOfSequence),
            Phase::Ready => return Ok(()),
            Phase::Triggered => {}
        }

        let interval_ns = u32::try_from(self.poll.interval.as_nanos()).unwrap_or(u32::MAX);
        let mut polls: u32 = 0;
        loop {
            if self.poll.max_polls.is_some_and(|max| polls >= max) {
                self.phase = Phase::Idle;
                return Err(SensorError::Timeout);
            }
            self.delay.delay_ns(interval_ns);
            polls += 1;

            let status = self.read_register(CTRL_REG2)?;
            trace!("CTRL_REG2 = {status:#04x} after {polls} polls");
            if status == 0 {
                break;
            }
        }

        self.phase = Phase::Ready;
        Ok(())
    }

    /// Read the output registers of a completed conversion.
    pub fn read_measurement(&mut self) -> Result<PressureReading, SensorError<I2C::Error>> {
        if self.phase != Phase::Ready {
            return Err(SensorError::OutOfSequence);
        }
        let raw = self.read_raw()?;
        self.phase = Phase::Idle;

        let reading = raw.decode();
        debug!(
            "raw temp {:#06x}, raw pressure {:#08x} -> {:?}",
            raw.temperature_raw(),
            raw.pressure_raw(),
            reading
        );
        Ok(reading)
    }

    /// One full trigger/poll/read cycle.
    pub fn one_shot(&mut self) -> Result<PressureReading, SensorError<I2C::Error>> {
        self.initialize()?;
        self.await_ready()?;
        self.read_measurement()
    }

    pub fn power_down(&mut self) -> Result<(), SensorError<I2C::Error>> {
        self.phase = Phase::Idle;
        self.write_register(CTRL_REG1, CTRL1_POWER_DOWN)
    }

    fn read_raw(&mut self) -> Result<RawReading, SensorError<I2C::Error>> {
        Ok(RawReading {
            temp_l: self.read_register(PTEMP_OUT_L)?,
            temp_h: self.read_register(PTEMP_OUT_H)?,
            press_xl: self.read_register(PRESS_OUT_XL)?,
            press_l: self.read_register(PRESS_OUT_L)?,
            press_h: self.read_register(PRESS_OUT_H)?,
        })
    }

    fn read_register(&mut self, register: u8) -> Result<u8, SensorError<I2C::Error>> {
        let mut buf = [0u8; 1];
        if let Err(e) = self.i2c.write_read(ADDRESS, &[register], &mut buf) {
            self.phase = Phase::Idle;
            return Err(SensorError::BusFault(e));
        }
        Ok(buf[0])
    }

    fn write_register(&mut self, register: u8, value: u8) -> Result<(), SensorError<I2C::Error>> {
        if let Err(e) = self.i2c.write(ADDRESS, &[register, value]) {
            self.phase = Phase::Idle;
            return Err(SensorError::BusFault(e));
        }
        Ok(())
    }
}

impl<I2C, D> Sensor for Lps25h<I2C, D>
where
    I2C: I2c,
    D: DelayNs,
{
    type Error = SensorError<I2C::Error>;

    fn name(&self) -> &'static str {
        "LPS25H"
    }

    fn measure(&mut self) -> Result<Vec<Measurement>, Self::Error> {
        let mut attempt = 1;
        loop {
            match self.one_shot() {
                Ok(reading) => {
                    return Ok(vec![
                        Measurement::temperature(reading.temperature_c),
                        Measurement::pressure(reading.pressure_hpa),
                    ]);
                }
                Err(error) if attempt < self.max_attempts => {
                    warn!(
                        "LPS25H: measurement attempt {attempt}/{} failed: {error}",
                        self.max_attempts
                    );
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}
