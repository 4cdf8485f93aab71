//! Where the map tables live inside the cartridge.
//!
//! The defaults describe the one title this decoder targets. A layout can be
//! loaded from JSON to point the decoder at a relocated table set; every field
//! is a plain buffer offset (tag byte already stripped).
use serde::{Deserialize, Serialize};

use crate::error::{DecodeError, Result};

/// Visible screen width in pixels.
pub const VIEWPORT_WIDTH: usize = 240;

/// Visible screen height in pixels.
pub const VIEWPORT_HEIGHT: usize = 160;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RomLayout {
    /// First catalog record.
    pub catalog_base: usize,
    /// Distance between two catalog records.
    pub catalog_stride: usize,
    /// Number of catalog records.
    pub catalog_count: usize,
    /// Table of 4-byte name pointers indexed by the record's name index.
    pub name_table_base: usize,
    /// Offset of the u16 name index inside a record.
    pub record_name_index: usize,
    /// Offset of the pointer chain leading to the map data inside a record.
    pub record_map_data: usize,
}

impl Default for RomLayout {
    fn default() -> Self {
        Self {
            catalog_base: 0x08_E2E0,
            catalog_stride: 0x38,
            catalog_count: 0x1C4,
            name_table_base: 0x06_BCE8,
            record_name_index: 0x0C,
            record_map_data: 0x2C,
        }
    }
}

impl RomLayout {
    /// Rejects layouts the catalog scan cannot walk. A zero stride would read
    /// the same record `catalog_count` times.
    pub fn check(&self) -> Result<()> {
        if self.catalog_stride == 0 && self.catalog_count > 1 {
            return Err(DecodeError::DecodeFailure(format!(
                "catalog stride is 0 for {} records",
                self.catalog_count
            )));
        }
        Ok(())
    }

    /// Offset of the `index`-th catalog record.
    pub fn record_offset(&self, index: usize, len: usize) -> Result<usize> {
        table_entry(self.catalog_base, index, self.catalog_stride, len)
    }

    /// Offset of the name pointer for a non-zero name index.
    pub fn name_entry_offset(&self, name_index: u16, len: usize) -> Result<usize> {
        table_entry(self.name_table_base, usize::from(name_index), 4, len)
    }

    /// Offset of the map data pointer inside the record at `record_offset`.
    pub fn map_data_offset(&self, record_offset: usize, len: usize) -> Result<usize> {
        table_entry(record_offset, 1, self.record_map_data, len)
    }
}

/// `base + index * width`. Values loaded from a layout file can overflow, which
/// is reported as an offset past the image of `len` bytes.
fn table_entry(base: usize, index: usize, width: usize, len: usize) -> Result<usize> {
    index
        .checked_mul(width)
        .and_then(|distance| base.checked_add(distance))
        .ok_or(DecodeError::OutOfRange {
            offset: usize::MAX,
            len,
        })
}

/// Pixel size of a map side declared in units: the map scrolls by `units`
/// pixels past one full viewport.
#[must_use]
pub const fn pixel_extent(units: u16, viewport: usize) -> usize {
    units as usize + viewport - 1
}
