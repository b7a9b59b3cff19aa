//! Sense HAT 8x8 RGB LED matrix.
//!
//! The HAT's microcontroller exposes the frame buffer as registers starting
//! at 0x00. Each row is stored as eight red, eight green and eight blue
//! bytes, and only the low five bits of each byte are used.

use embedded_hal::i2c::I2c;
use log::trace;
use rand::Rng;

pub const ADDRESS: u8 = 0x46;

pub const WIDTH: usize = 8;
pub const HEIGHT: usize = 8;
pub const MAX_CHANNEL: u8 = 0x1F;

const FRAME_REGISTER: u8 = 0x00;
const FRAME_BYTES: usize = WIDTH * HEIGHT * 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const OFF: Rgb = Rgb { r: 0, g: 0, b: 0 };

    /// Channels above [`MAX_CHANNEL`] are clamped.
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r.min(MAX_CHANNEL),
            g: g.min(MAX_CHANNEL),
            b: b.min(MAX_CHANNEL),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pixels: [[Rgb; WIDTH]; HEIGHT],
}

impl Default for Frame {
    fn default() -> Self {
        Self::filled(Rgb::OFF)
    }
}

impl Frame {
    pub fn filled(color: Rgb) -> Self {
        Self {
            pixels: [[color; WIDTH]; HEIGHT],
        }
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut frame = Self::default();
        for row in frame.pixels.iter_mut() {
            for pixel in row.iter_mut() {
                *pixel = Rgb {
                    r: rng.random_range(0..=MAX_CHANNEL),
                    g: rng.random_range(0..=MAX_CHANNEL),
                    b: rng.random_range(0..=MAX_CHANNEL),
                };
            }
        }
        frame
    }

    pub fn set(&mut self, x: usize, y: usize, color: Rgb) {
        if let Some(pixel) = self.pixels.get_mut(y).and_then(|row| row.get_mut(x)) {
            *pixel = color;
        }
    }

    /// Register address followed by the frame in the HAT's row-planar layout.
    fn encode(&self) -> [u8; FRAME_BYTES + 1] {
        let mut buf = [0u8; FRAME_BYTES + 1];
        buf[0] = FRAME_REGISTER;
        for (y, row) in self.pixels.iter().enumerate() {
            let base = 1 + y * WIDTH * 3;
            for (x, pixel) in row.iter().enumerate() {
                buf[base + x] = pixel.r;
                buf[base + WIDTH + x] = pixel.g;
                buf[base + 2 * WIDTH + x] = pixel.b;
            }
        }
        buf
    }
}

pub struct LedMatrix<I2C> {
    i2c: I2C,
}

impl<I2C: I2c> LedMatrix<I2C> {
    pub fn new(i2c: I2C) -> Self {
        Self { i2c }
    }

    pub fn release(self) -> I2C {
        self.i2c
    }

    pub fn write_frame(&mut self, frame: &Frame) -> Result<(), I2C::Error> {
        self.i2c.write(ADDRESS, &frame.encode())
    }

    pub fn clear(&mut self) -> Result<(), I2C::Error> {
        self.write_frame(&Frame::default())
    }

    pub fn show_random<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), I2C::Error> {
        let frame = Frame::random(rng);
        trace!("LED matrix: {frame:?}");
        self.write_frame(&frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn encode_uses_row_planar_layout() {
        let mut frame = Frame::default();
        frame.set(0, 0, Rgb::new(1, 2, 3));
        frame.set(7, 1, Rgb::new(4, 5, 6));

        let buf = frame.encode();
        assert_eq!(buf.len(), 193);
        assert_eq!(buf[0], 0x00);
        // row 0
        assert_eq!(buf[1], 1);
        assert_eq!(buf[1 + 8], 2);
        assert_eq!(buf[1 + 16], 3);
        // row 1, column 7
        assert_eq!(buf[1 + 24 + 7], 4);
        assert_eq!(buf[1 + 24 + 8 + 7], 5);
        assert_eq!(buf[1 + 24 + 16 + 7], 6);
        assert_eq!(buf.iter().filter(|&&b| b != 0).count(), 6);
    }

    #[test]
    fn set_ignores_out_of_range_pixels() {
        let mut frame = Frame::default();
        frame.set(8, 0, Rgb::new(31, 31, 31));
        frame.set(0, 8, Rgb::new(31, 31, 31));
        assert_eq!(frame, Frame::default());
    }

    #[test]
    fn channels_are_clamped_to_five_bits() {
        assert_eq!(Rgb::new(0xFF, 0x20, 0x1F), Rgb { r: 31, g: 31, b: 31 });
    }

    #[test]
    fn random_frames_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let frame = Frame::random(&mut rng);
        assert!(frame.encode()[1..].iter().all(|&b| b <= MAX_CHANNEL));
    }

    #[test]
    fn show_random_writes_whole_frame() {
        let expected = Frame::random(&mut StdRng::seed_from_u64(42)).encode().to_vec();
        let i2c = I2cMock::new(&[
            I2cTransaction::write(ADDRESS, expected),
            I2cTransaction::write(ADDRESS, Frame::default().encode().to_vec()),
        ]);

        let mut matrix = LedMatrix::new(i2c);
        matrix.show_random(&mut StdRng::seed_from_u64(42)).unwrap();
        matrix.clear().unwrap();
        matrix.release().done();
    }
}
