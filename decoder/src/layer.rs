use crate::bitwise::Bits;
use crate::error::{DecodeError, Result};
use crate::render::TILE_SIZE;
use crate::render::bitmap::Bitmap;
use crate::rom::{Pointer, RomImage};
use crate::tileset::Tileset;

/// One entry of an arrangement grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileCell {
    pub tile: u16,
    pub flip_x: bool,
    pub flip_y: bool,
    pub palette_bank: u8,
}

impl From<u16> for TileCell {
    fn from(cell: u16) -> Self {
        // Field         Bits
        //----------------------
        // tile index    0-9
        // h-flip        10
        // v-flip        11
        // palette bank  12-15
        Self {
            tile: cell.get_bits(0..=9),
            flip_x: cell.is_bit_on(10),
            flip_y: cell.is_bit_on(11),
            palette_bank: cell.get_bits(12..=15) as u8,
        }
    }
}

/// Paints the arrangement grid at `arrangement` into a `width` × `height`
/// bitmap.
///
/// The grid holds `ceil(width / 8)` × `ceil(height / 8)` little-endian cells,
/// row-major; tiles on the right and bottom edges are clipped. Any cell that
/// names a tile the tileset does not have fails the whole layer.
pub fn decode_layer(
    rom: &RomImage,
    arrangement: Pointer,
    tileset: &Tileset,
    width: usize,
    height: usize,
) -> Result<Bitmap> {
    if arrangement.is_null() {
        return Err(DecodeError::DecodeFailure(
            "layer has no arrangement data".into(),
        ));
    }

    let mut cursor = rom.cursor();
    cursor.seek(arrangement.resolve(rom.len())?)?;

    let columns = width.div_ceil(TILE_SIZE);
    let rows = height.div_ceil(TILE_SIZE);
    let mut bitmap = Bitmap::new(width, height);

    for row in 0..rows {
        for column in 0..columns {
            let cell = TileCell::from(cursor.read_u16()?);
            let (chunk, local) = tileset.tile(usize::from(cell.tile)).ok_or_else(|| {
                DecodeError::DecodeFailure(format!(
                    "cell ({column}, {row}) uses tile {} but the tileset has {}",
                    cell.tile,
                    tileset.tile_count()
                ))
            })?;

            for y in 0..TILE_SIZE {
                for x in 0..TILE_SIZE {
                    let source_x = if cell.flip_x { TILE_SIZE - 1 - x } else { x };
                    let source_y = if cell.flip_y { TILE_SIZE - 1 - y } else { y };
                    bitmap.set_pixel_clipped(
                        column * TILE_SIZE + x,
                        row * TILE_SIZE + y,
                        chunk.pixel(local, source_x, source_y, cell.palette_bank),
                    );
                }
            }
        }
    }

    Ok(bitmap)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::header::MapHeader;
    use crate::render::color::colors;
    use crate::testing::RomBuilder;
    use crate::tileset::{TilesetCache, decode_tileset};

    const RED: [u8; 4] = [0xFF, 0, 0, 0xFF];
    const GREEN: [u8; 4] = [0, 0xFF, 0, 0xFF];

    /// One 4bpp tile whose only opaque pixel is the top-left one (color 1),
    /// table at 0x40, block at 0x100, grid at 0x600.
    fn rom_with_grid(cells: &[u16]) -> (RomImage, Tileset) {
        let mut rom = RomBuilder::new(0x800);
        rom.put_pointer(0x40, 0x100);
        let mut palette = [0u16; 256];
        palette[1] = 0x001F;
        palette[0x31] = 0x03E0;
        let mut tile = [0u8; 32];
        tile[0] = 0x01;
        rom.put_tile_block(0x100, 4, &palette, &[tile]);
        for (i, &cell) in cells.iter().enumerate() {
            rom.put_u16(0x600 + i * 2, cell);
        }
        let rom = rom.build();

        let header = MapHeader {
            data_offset: 0,
            width_units: 0,
            height_units: 0,
            layer_pointers: [Pointer::NULL; 4],
            tileset_pointer: Pointer::from_raw(0x40),
            connector_table_pointer: Pointer::NULL,
        };
        let tileset = decode_tileset(&rom, &header, &mut TilesetCache::new()).unwrap();
        (rom, tileset)
    }

    #[test]
    fn cell_fields() {
        assert_eq!(
            TileCell::from(0b0011_1100_0000_0101),
            TileCell {
                tile: 5,
                flip_x: true,
                flip_y: true,
                palette_bank: 3,
            }
        );
    }

    #[test]
    fn paints_cells_row_major_with_flips_and_banks() {
        let hflip = 1 << 10;
        let vflip = 1 << 11;
        let bank3 = 3 << 12;
        let (rom, tileset) = rom_with_grid(&[0, hflip, vflip | bank3, hflip | vflip]);

        let layer = decode_layer(&rom, Pointer::from_raw(0x600), &tileset, 16, 16).unwrap();
        assert_eq!((layer.width(), layer.height()), (16, 16));
        assert_eq!(layer[(0, 0)], RED);
        assert_eq!(layer[(15, 0)], RED);
        assert_eq!(layer[(0, 15)], GREEN);
        assert_eq!(layer[(15, 15)], RED);
        assert_eq!(layer[(8, 0)], colors::TRANSPARENT);
    }

    #[test]
    fn partial_tiles_are_clipped() {
        let (rom, tileset) = rom_with_grid(&[0; 4]);
        let layer = decode_layer(&rom, Pointer::from_raw(0x600), &tileset, 9, 3).unwrap();
        assert_eq!((layer.width(), layer.height()), (9, 3));
        assert_eq!(layer[(8, 0)], RED);
    }

    #[test]
    fn unknown_tile_fails_the_layer() {
        let (rom, tileset) = rom_with_grid(&[0, 1]);
        let err = decode_layer(&rom, Pointer::from_raw(0x600), &tileset, 16, 8).unwrap_err();
        assert!(matches!(err, DecodeError::DecodeFailure(_)));
    }

    #[test]
    fn malformed_arrangement_pointer() {
        let (rom, tileset) = rom_with_grid(&[]);
        let err = decode_layer(&rom, Pointer::from_raw(0x9000), &tileset, 8, 8).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedPointer { .. }));
    }

    #[test]
    fn grid_past_the_end_is_out_of_range() {
        let (rom, tileset) = rom_with_grid(&[]);
        let err = decode_layer(&rom, Pointer::from_raw(0x7FE), &tileset, 16, 8).unwrap_err();
        assert!(matches!(err, DecodeError::OutOfRange { .. }));
    }
}
