use std::fmt;

use embedded_hal::i2c::{self, ErrorKind};
use linux_embedded_hal::i2cdev::linux::LinuxI2CError;

use crate::sensors::SensorError;

#[derive(Debug)]
pub enum AppError {
    DeviceOpen { path: String, source: LinuxI2CError },
    SlaveConfig { device: &'static str, address: u8, kind: ErrorKind },
    UnexpectedDevice { device: &'static str, address: u8, id: u8 },
    BusFault { device: &'static str, address: u8, kind: ErrorKind },
    Timeout { device: &'static str },
    OutOfSequence { device: &'static str },
}

impl AppError {
    /// Classify a driver error raised while claiming `address`.
    pub fn from_probe<E: i2c::Error>(device: &'static str, address: u8, error: SensorError<E>) -> Self {
        match error {
            SensorError::BusFault(e) => Self::SlaveConfig {
                device,
                address,
                kind: e.kind(),
            },
            other => Self::from_sensor(device, address, other),
        }
    }

    pub fn from_sensor<E: i2c::Error>(device: &'static str, address: u8, error: SensorError<E>) -> Self {
        match error {
            SensorError::BusFault(e) => Self::BusFault {
                device,
                address,
                kind: e.kind(),
            },
            SensorError::Timeout => Self::Timeout { device },
            SensorError::UnexpectedDevice(id) => Self::UnexpectedDevice { device, address, id },
            SensorError::OutOfSequence => Self::OutOfSequence { device },
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::DeviceOpen { path, source } => {
                write!(f, "Unable to open i2c device {path}: {source}")
            }
            AppError::SlaveConfig {
                device,
                address,
                kind,
            } => write!(
                f,
                "Unable to configure i2c slave device {device} at {address:#04x}: {kind}"
            ),
            AppError::UnexpectedDevice {
                device,
                address,
                id,
            } => write!(
                f,
                "Device at {address:#04x} is not a {device} (WHO_AM_I = {id:#04x})"
            ),
            AppError::BusFault {
                device,
                address,
                kind,
            } => write!(f, "{device} at {address:#04x} bus fault: {kind}"),
            AppError::Timeout { device } => write!(f, "{device} measurement timed out"),
            AppError::OutOfSequence { device } => {
                write!(f, "{device} operation called out of sequence")
            }
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::DeviceOpen { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_bus_fault_is_slave_config() {
        let error = AppError::from_probe(
            "LPS25H",
            0x5C,
            SensorError::BusFault(ErrorKind::NoAcknowledge(i2c::NoAcknowledgeSource::Address)),
        );
        assert!(matches!(
            error,
            AppError::SlaveConfig {
                address: 0x5C,
                kind: ErrorKind::NoAcknowledge(_),
                ..
            }
        ));
        assert!(error
            .to_string()
            .starts_with("Unable to configure i2c slave device LPS25H at 0x5c"));
    }

    #[test]
    fn probe_id_mismatch_keeps_address() {
        let error =
            AppError::from_probe::<ErrorKind>("LPS25H", 0x5C, SensorError::UnexpectedDevice(0x33));
        assert_eq!(
            error.to_string(),
            "Device at 0x5c is not a LPS25H (WHO_AM_I = 0x33)"
        );
    }

    #[test]
    fn measurement_timeout_is_reported() {
        let error = AppError::from_sensor::<ErrorKind>("LPS25H", 0x5C, SensorError::Timeout);
        assert!(matches!(error, AppError::Timeout { device: "LPS25H" }));
    }
}
