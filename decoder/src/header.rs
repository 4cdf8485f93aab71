use serde::Serialize;

use crate::error::Result;
use crate::layout::{RomLayout, VIEWPORT_HEIGHT, VIEWPORT_WIDTH, pixel_extent};
use crate::rom::{Pointer, RomImage};

/// Number of background layers a map can carry (BG0 to BG3).
pub const LAYER_COUNT: usize = 4;

const TILESET_POINTER: usize = 0x00;
const WIDTH_UNITS: usize = 0x08;
const LAYER_POINTERS: usize = 0x14;
const CONNECTOR_TABLE_POINTER: usize = 0x40;

/// Map data header, decoded on demand for each render.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MapHeader {
    /// Buffer offset of the map data block the fields below were read from.
    pub data_offset: usize,
    pub width_units: u16,
    pub height_units: u16,
    /// Arrangement grids for BG0 to BG3, null when the layer is absent.
    pub layer_pointers: [Pointer; LAYER_COUNT],
    pub tileset_pointer: Pointer,
    pub connector_table_pointer: Pointer,
}

impl MapHeader {
    /// Follows the record's map-data pointer chain (pointer to pointer) and
    /// reads the header found there.
    pub fn read(rom: &RomImage, layout: &RomLayout, record_offset: usize) -> Result<Self> {
        let mut cursor = rom.cursor();
        cursor.seek(layout.map_data_offset(record_offset, rom.len())?)?;
        let indirect = cursor.read_resolved_pointer()?;
        cursor.seek(indirect)?;
        let data_offset = cursor.read_resolved_pointer()?;

        cursor.seek(data_offset + TILESET_POINTER)?;
        let tileset_pointer = cursor.read_pointer()?;

        cursor.seek(data_offset + WIDTH_UNITS)?;
        let width_units = cursor.read_u16()?;
        let height_units = cursor.read_u16()?;

        cursor.seek(data_offset + LAYER_POINTERS)?;
        let mut layer_pointers = [Pointer::NULL; LAYER_COUNT];
        for pointer in &mut layer_pointers {
            *pointer = cursor.read_pointer()?;
        }

        cursor.seek(data_offset + CONNECTOR_TABLE_POINTER)?;
        let connector_table_pointer = cursor.read_pointer()?;

        tracing::debug!(
            "map header at 0x{data_offset:06X}: {width_units}x{height_units} units, tileset {tileset_pointer}"
        );

        Ok(Self {
            data_offset,
            width_units,
            height_units,
            layer_pointers,
            tileset_pointer,
            connector_table_pointer,
        })
    }

    /// Pixel width of every layer of this map.
    #[must_use]
    pub const fn width(&self) -> usize {
        pixel_extent(self.width_units, VIEWPORT_WIDTH)
    }

    /// Pixel height of every layer of this map.
    #[must_use]
    pub const fn height(&self) -> usize {
        pixel_extent(self.height_units, VIEWPORT_HEIGHT)
    }
}
