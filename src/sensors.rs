mod trait_def;

mod lps25h;

pub(crate) use lps25h::{Lps25h, PollPolicy, SensorError, ADDRESS as LPS25H_ADDRESS};
pub(crate) use trait_def::{Measurement, Quantity, Sensor};
