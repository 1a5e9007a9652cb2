//! RGBW color values and the packed hardware encoding.
//!
//! The LED hardware consumes a single 32-bit word per frame with
//! gamma-corrected channel bytes laid out as `W G R B` (most to least
//! significant byte). That layout and the correction curve are a
//! bit-exact contract with the driver and must not change.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Packed gamma-corrected color word as consumed by the LED driver.
///
/// Byte layout: bits 24-31 corrected white, 16-23 corrected green,
/// 8-15 corrected red, 0-7 corrected blue.
pub type PackedColor = u32;

/// Perceptual correction curve: `corrected[i] = round(255 * (i/255)^2)`.
///
/// `(i*i + 127) / 255` is the integer form of that rounding. The
/// curve is monotonic non-decreasing, which `unpack` relies on.
const GAMMA: [u8; 256] = build_gamma();

const fn build_gamma() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0usize;
    while i < 256 {
        table[i] = ((i * i + 127) / 255) as u8;
        i += 1;
    }
    table
}

/// Error returned when a hex color string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorParseError {
    /// The string length is not one of the accepted forms.
    #[error("expected 3, 4, 6 or 8 hex digits, got {0}")]
    BadLength(usize),

    /// The string contains a non-hexadecimal character.
    #[error("invalid hex digit {0:?}")]
    BadDigit(char),
}

/// A four-channel RGBW color. Each channel is an independent 8-bit
/// intensity; all combinations are legal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub w: u8,
}

impl Color {
    /// All channels off.
    pub const BLACK: Self = Self::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, w: u8) -> Self {
        Self { r, g, b, w }
    }

    /// Pack into the gamma-corrected hardware word. Total function.
    pub fn pack(self) -> PackedColor {
        (u32::from(GAMMA[self.w as usize]) << 24)
            | (u32::from(GAMMA[self.g as usize]) << 16)
            | (u32::from(GAMMA[self.r as usize]) << 8)
            | u32::from(GAMMA[self.b as usize])
    }

    /// Recover an approximate color from a packed word.
    ///
    /// Each corrected byte is mapped back to the smallest intensity
    /// whose gamma value is >= the byte. The curve is lossy (many
    /// intensities share a corrected byte), so this is an approximate
    /// inverse by design: the result lands in the same gamma bucket
    /// as the original intensity, not necessarily on the same value.
    pub fn unpack(packed: PackedColor) -> Self {
        Self {
            w: gamma_floor((packed >> 24) as u8),
            g: gamma_floor((packed >> 16) as u8),
            r: gamma_floor((packed >> 8) as u8),
            b: gamma_floor(packed as u8),
        }
    }

    /// Eight lowercase hex digits, `rrggbbww`.
    pub fn to_hex(self) -> String {
        format!("{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.w)
    }
}

/// Smallest intensity whose corrected value reaches `byte`.
fn gamma_floor(byte: u8) -> u8 {
    GAMMA.partition_point(|&g| g < byte) as u8
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Color {
    type Err = ColorParseError;

    /// Parse `rgb`, `rgbw`, `rrggbb` or `rrggbbww`, with an optional
    /// leading `#`. Three- and six-digit forms imply a zero white
    /// channel; nibble forms expand by digit doubling (`f` -> `ff`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix('#').unwrap_or(s);
        let digits = s
            .chars()
            .map(|c| c.to_digit(16).map(|d| d as u8).ok_or(ColorParseError::BadDigit(c)))
            .collect::<Result<Vec<u8>, _>>()?;

        let double = |n: u8| n * 17;
        match digits.as_slice() {
            [r, g, b] => Ok(Self::new(double(*r), double(*g), double(*b), 0)),
            [r, g, b, w] => Ok(Self::new(double(*r), double(*g), double(*b), double(*w))),
            [r1, r0, g1, g0, b1, b0] => {
                Ok(Self::new(r1 * 16 + r0, g1 * 16 + g0, b1 * 16 + b0, 0))
            }
            [r1, r0, g1, g0, b1, b0, w1, w0] => Ok(Self::new(
                r1 * 16 + r0,
                g1 * 16 + g0,
                b1 * 16 + b0,
                w1 * 16 + w0,
            )),
            other => Err(ColorParseError::BadLength(other.len())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn gamma_is_monotonic_non_decreasing() {
        for i in 1..256 {
            assert!(GAMMA[i] >= GAMMA[i - 1], "curve dips at {}", i);
        }
    }

    #[test]
    fn gamma_endpoints() {
        assert_eq!(GAMMA[0], 0);
        assert_eq!(GAMMA[255], 255);
    }

    #[test]
    fn pack_is_monotonic_per_channel() {
        let mut prev = Color::new(0, 0, 0, 0).pack();
        for i in 1..=255u8 {
            let next = Color::new(i, i, i, i).pack();
            // Every byte of the packed word must be >= the previous one.
            for shift in [0, 8, 16, 24] {
                assert!((next >> shift) as u8 >= (prev >> shift) as u8);
            }
            prev = next;
        }
    }

    #[test]
    fn pack_byte_layout() {
        // Full white only touches the top byte; full blue the bottom.
        assert_eq!(Color::new(0, 0, 0, 255).pack(), 0xff00_0000);
        assert_eq!(Color::new(0, 0, 255, 0).pack(), 0x0000_00ff);
        assert_eq!(Color::new(255, 0, 0, 0).pack(), 0x0000_ff00);
        assert_eq!(Color::new(0, 255, 0, 0).pack(), 0x00ff_0000);
    }

    #[test]
    fn unpack_lands_in_the_same_gamma_bucket() {
        for i in 0..=255u8 {
            let c = Color::new(i, i, i, i);
            let back = Color::unpack(c.pack());
            for (orig, approx) in [(c.r, back.r), (c.g, back.g), (c.b, back.b), (c.w, back.w)] {
                assert_eq!(
                    GAMMA[orig as usize], GAMMA[approx as usize],
                    "intensity {} left its gamma bucket (got {})",
                    orig, approx
                );
            }
        }
    }

    #[test]
    fn hex_roundtrip() {
        let c = Color::new(0x12, 0x34, 0x56, 0x78);
        assert_eq!(c.to_hex(), "12345678");
        assert_eq!("12345678".parse::<Color>().unwrap(), c);
        assert_eq!("#12345678".parse::<Color>().unwrap(), c);
    }

    #[test]
    fn short_forms_double_digits_and_zero_white() {
        assert_eq!("fff".parse::<Color>().unwrap(), Color::new(255, 255, 255, 0));
        assert_eq!("f80".parse::<Color>().unwrap(), Color::new(255, 136, 0, 0));
        assert_eq!("f804".parse::<Color>().unwrap(), Color::new(255, 136, 0, 68));
        assert_eq!("402000".parse::<Color>().unwrap(), Color::new(64, 32, 0, 0));
    }

    #[test]
    fn malformed_strings_are_rejected() {
        assert_eq!("12345".parse::<Color>(), Err(ColorParseError::BadLength(5)));
        assert_eq!("".parse::<Color>(), Err(ColorParseError::BadLength(0)));
        assert!(matches!(
            "zzz".parse::<Color>(),
            Err(ColorParseError::BadDigit('z'))
        ));
        assert!("ff ff ff".parse::<Color>().is_err());
    }
}
