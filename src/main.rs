use core::time::Duration;
use std::cell::RefCell;

use anyhow::Context;
#[cfg(feature = "led-matrix")]
use embedded_hal::i2c::Error as _;
use embedded_hal_bus::i2c::RefCellDevice;
use linux_embedded_hal::{Delay, I2cdev};
use log::{debug, error, info, trace, warn};

mod error;
mod history;
#[cfg(feature = "led-matrix")]
mod led_matrix;
mod sensors;

use error::AppError;
use history::History;
#[cfg(feature = "led-matrix")]
use led_matrix::LedMatrix;
use sensors::{Lps25h, PollPolicy, Quantity, Sensor, LPS25H_ADDRESS};

const I2C_BUS: &str = "/dev/i2c-1";

const ITERATIONS: u32 = 10;
const CYCLE_DELAY: Duration = Duration::from_millis(1000);

const POLL_INTERVAL: Duration = Duration::from_millis(25);
const MAX_POLLS: u32 = 40;
const MAX_ATTEMPTS: u8 = 3;

#[derive(Debug, PartialEq)]
struct Options {
    bus: String,
    iterations: u32,
    unbounded_poll: bool,
}

struct Devices<'a> {
    sensor: Lps25h<RefCellDevice<'a, I2cdev>, Delay>,
    #[cfg(feature = "led-matrix")]
    led_matrix: LedMatrix<RefCellDevice<'a, I2cdev>>,
}

fn preamble() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

/// `[--unbounded-poll] [BUS] [ITERATIONS]`
fn parse_args(args: impl IntoIterator<Item = String>) -> anyhow::Result<Options> {
    let mut options = Options {
        bus: I2C_BUS.to_string(),
        iterations: ITERATIONS,
        unbounded_poll: false,
    };
    let mut positional = 0;
    for arg in args {
        if arg == "--unbounded-poll" {
            options.unbounded_poll = true;
            continue;
        }
        match positional {
            0 => options.bus = arg,
            1 => {
                options.iterations = arg
                    .parse()
                    .with_context(|| format!("invalid iteration count {arg:?}"))?
            }
            _ => anyhow::bail!("unexpected argument {arg:?}"),
        }
        positional += 1;
    }
    Ok(options)
}

fn get_pressure_sensor<'a>(
    i2c: RefCellDevice<'a, I2cdev>,
    options: &Options,
) -> Result<Lps25h<RefCellDevice<'a, I2cdev>, Delay>, AppError> {
    info!("Setting up LPS25H at {LPS25H_ADDRESS:#04x}");
    let poll = if options.unbounded_poll {
        PollPolicy::unbounded(POLL_INTERVAL)
    } else {
        PollPolicy::bounded(POLL_INTERVAL, MAX_POLLS)
    };
    let mut sensor = Lps25h::new(i2c, Delay)
        .with_poll_policy(poll)
        .with_max_attempts(MAX_ATTEMPTS);
    sensor
        .probe()
        .map_err(|e| AppError::from_probe("LPS25H", LPS25H_ADDRESS, e))?;
    Ok(sensor)
}

#[cfg(feature = "led-matrix")]
fn get_led_matrix(
    i2c: RefCellDevice<'_, I2cdev>,
) -> Result<LedMatrix<RefCellDevice<'_, I2cdev>>, AppError> {
    info!("Setting up LED matrix at {:#04x}", led_matrix::ADDRESS);
    let mut matrix = LedMatrix::new(i2c);
    matrix.clear().map_err(|e| AppError::SlaveConfig {
        device: "LED matrix",
        address: led_matrix::ADDRESS,
        kind: e.kind(),
    })?;
    Ok(matrix)
}

fn main() -> anyhow::Result<()> {
    preamble();
    let options = parse_args(std::env::args().skip(1))?;

    let i2c = I2cdev::new(&options.bus).map_err(|source| AppError::DeviceOpen {
        path: options.bus.clone(),
        source,
    })?;
    let i2c_ref_cell = RefCell::new(i2c);

    let mut devices = Devices {
        sensor: get_pressure_sensor(RefCellDevice::new(&i2c_ref_cell), &options)?,
        #[cfg(feature = "led-matrix")]
        led_matrix: get_led_matrix(RefCellDevice::new(&i2c_ref_cell))?,
    };

    trace!("Calling run");
    let result = run(&mut devices, options.iterations);

    if let Err(error) = devices.sensor.power_down() {
        warn!("Failed to power down LPS25H: {error}");
    }
    #[cfg(feature = "led-matrix")]
    {
        if let Err(error) = devices.led_matrix.clear() {
            warn!("Failed to clear LED matrix: {error:?}");
        }
    }

    result?;
    Ok(())
}

fn run(devices: &mut Devices, iterations: u32) -> Result<(), AppError> {
    debug!("Starting main loop");
    let mut history = History::new();
    #[cfg(feature = "led-matrix")]
    let mut rng = rand::rng();

    for cycle in 1..=iterations {
        let name = devices.sensor.name();
        let measurements = match devices.sensor.measure() {
            Ok(measurements) => measurements,
            Err(error) => {
                error!("Error while measuring in cycle {cycle}: {error}");
                return Err(AppError::from_sensor(name, LPS25H_ADDRESS, error));
            }
        };

        for measurement in &measurements {
            println!("{measurement}");
            history.record(measurement);
        }

        #[cfg(feature = "led-matrix")]
        {
            if let Err(error) = devices.led_matrix.show_random(&mut rng) {
                warn!("Error while updating LED matrix: {error:?}");
            }
        }

        std::thread::sleep(CYCLE_DELAY);
    }

    for quantity in [Quantity::Temperature, Quantity::Pressure] {
        if let Some(stats) = history.stats(quantity) {
            info!(
                "{quantity:?} over last {} readings: min {:.2}, max {:.2}, mean {:.2}",
                stats.count, stats.min, stats.max, stats.mean
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn defaults_without_arguments() {
        let options = parse_args(args(&[])).unwrap();
        assert_eq!(
            options,
            Options {
                bus: "/dev/i2c-1".to_string(),
                iterations: 10,
                unbounded_poll: false,
            }
        );
    }

    #[test]
    fn positional_arguments_override_defaults() {
        let options = parse_args(args(&["/dev/i2c-0", "3", "--unbounded-poll"])).unwrap();
        assert_eq!(options.bus, "/dev/i2c-0");
        assert_eq!(options.iterations, 3);
        assert!(options.unbounded_poll);
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(parse_args(args(&["/dev/i2c-1", "ten"])).is_err());
        assert!(parse_args(args(&["/dev/i2c-1", "1", "extra"])).is_err());
    }
}
