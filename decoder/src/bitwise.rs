use std::fmt::Debug;
use std::mem::size_of;
use std::ops::RangeInclusive;

/// Bit-field helpers for the packed values found in ROM data
/// (palette entries, tile cells, block headers).
/// Bit indexes go from lsb to msb (right to left).
pub trait Bits
where
    Self: Copy + Into<u128> + TryFrom<u128>,
    <Self as TryFrom<u128>>::Error: Debug,
{
    fn is_bit_on(&self, bit_idx: u8) -> bool {
        debug_assert!(bit_idx < (size_of::<Self>() * 8) as u8);
        let bitwise: u128 = (*self).into();
        (bitwise & (1 << bit_idx)) != 0
    }

    fn is_bit_off(&self, bit_idx: u8) -> bool {
        !self.is_bit_on(bit_idx)
    }

    fn get_bits(&self, bits_range: RangeInclusive<u8>) -> Self {
        let start = *bits_range.start();
        let length = bits_range.len() as u32;
        debug_assert!(u32::from(start) + length <= (size_of::<Self>() * 8) as u32);

        // `length` ones moved in place, e.g. 5..=9 gives 0b11111 << 5.
        let mask = ((1_u128 << length) - 1) << start;
        let value: u128 = (*self).into();

        // The shifted value always fits back into `Self` because the mask
        // never exceeds the width of the type.
        <Self as TryFrom<u128>>::try_from((value & mask) >> start)
            .expect("masked value fits the source width")
    }
}

impl Bits for u32 {}
impl Bits for u16 {}
impl Bits for u8 {}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn tile_cell_flags() {
        // tile 0x155, hflip on, vflip off, bank 0xA
        let cell = 0b1010_0101_0101_0101_u16;
        assert!(cell.is_bit_on(10));
        assert!(cell.is_bit_off(11));
        assert_eq!(cell.get_bits(0..=9), 0x155);
        assert_eq!(cell.get_bits(12..=15), 0xA);
    }

    #[test]
    fn palette_channels() {
        let color = 0b0_00010_00100_01000_u16;
        assert_eq!(color.get_bits(0..=4), 8);
        assert_eq!(color.get_bits(5..=9), 4);
        assert_eq!(color.get_bits(10..=14), 2);
        assert!(color.is_bit_off(15));
    }

    #[test]
    fn full_width_is_identity() {
        let value = rand::rng().random_range(0..=u32::MAX);
        assert_eq!(value.get_bits(0..=31), value);
        assert_eq!(value.get_bits(24..=31), value >> 24);
    }

    #[test]
    #[should_panic]
    fn invalid_index() {
        let b = 0u8;
        b.is_bit_on(8);
    }
}
