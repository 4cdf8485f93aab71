use serde::Serialize;

use crate::bitwise::Bits;

/// A BGR555 palette entry, channels kept in their native 5-bit range.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Color {
    /// Opaque RGBA with each channel widened from 5 to 8 bits.
    #[must_use]
    pub const fn to_rgba(self) -> Rgba {
        [
            expand_channel(self.red),
            expand_channel(self.green),
            expand_channel(self.blue),
            0xFF,
        ]
    }
}

/// Widens a 5-bit channel so that 0x1F maps to 0xFF.
const fn expand_channel(value: u8) -> u8 {
    (value << 3) | (value >> 2)
}

impl From<u16> for Color {
    fn from(color: u16) -> Self {
        // Color     Values     Bits
        //-------------------------------
        // red ---> [0 - 31]    0-4
        // green -> [0 - 31]    5-9
        // blue --> [0 - 31]    10-14
        // unused ---------->   15
        let red = color.get_bits(0..=4);
        let green = color.get_bits(5..=9);
        let blue = color.get_bits(10..=14);

        Self {
            red: red as u8,
            green: green as u8,
            blue: blue as u8,
        }
    }
}

/// One output pixel, `[r, g, b, a]`.
pub type Rgba = [u8; 4];

pub mod colors {
    use super::Rgba;

    pub const TRANSPARENT: Rgba = [0, 0, 0, 0];
    /// Fill used by consumers in place of a layer that failed to decode.
    pub const ERROR: Rgba = [0xFF, 0, 0xFF, 0xFF];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_from_u16() {
        // red: 8, green: 4, blue: 2
        let color: u16 = 0b0000_1000_1000_1000;

        let palette_color: Color = color.into();
        assert_eq!(
            palette_color,
            Color {
                red: 8,
                green: 4,
                blue: 2
            }
        );
    }

    #[test]
    fn channels_expand_to_full_range() {
        let color = Color {
            red: 0x1F,
            green: 0,
            blue: 0x10,
        };
        assert_eq!(color.to_rgba(), [0xFF, 0, 0x84, 0xFF]);
        assert_eq!(Color::from(0x7FFF).to_rgba(), [0xFF; 4]);
    }
}
