use serde::Serialize;

use crate::error::Result;
use crate::layout::RomLayout;
use crate::rom::RomImage;

/// Width of the big-endian map id that opens every record.
const MAP_ID_WIDTH: usize = 2;

/// One entry of the map catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MapDescriptor {
    /// Map id as stored in the record; informational only.
    pub map_id: u16,
    /// Resolved map name, empty when the record has no name index.
    pub name: String,
    /// Offset of the catalog record. Identifies the map.
    pub header_offset: usize,
}

impl MapDescriptor {
    #[must_use]
    pub fn display_name(&self) -> String {
        if self.name.is_empty() {
            format!("[{:04X}] 0x{:06X}", self.map_id, self.header_offset)
        } else {
            format!("[{:04X}] {}", self.map_id, self.name)
        }
    }
}

/// Walks every catalog record of `layout`.
///
/// Scanning stops at the first record that fails to decode and the
/// descriptors read before it are returned, so a truncated or partly corrupt
/// image still lists the maps that could be read.
///
/// A layout that fails [`RomLayout::check`] yields no descriptors.
#[must_use]
pub fn scan(rom: &RomImage, layout: &RomLayout) -> Vec<MapDescriptor> {
    if let Err(e) = layout.check() {
        tracing::warn!("catalog scan skipped: {e}");
        return Vec::new();
    }

    let mut descriptors = Vec::new();
    for index in 0..layout.catalog_count {
        match read_record(rom, layout, index) {
            Ok(descriptor) => descriptors.push(descriptor),
            Err(e) => {
                tracing::warn!(
                    "catalog scan stopped at record {index}: {e}; keeping {} maps",
                    descriptors.len()
                );
                break;
            }
        }
    }

    tracing::debug!("catalog scan found {} maps", descriptors.len());
    descriptors
}

fn read_record(rom: &RomImage, layout: &RomLayout, index: usize) -> Result<MapDescriptor> {
    let record_offset = layout.record_offset(index, rom.len())?;
    let mut cursor = rom.cursor();
    cursor.seek(record_offset)?;

    let map_id = cursor.read_u16_be()?;
    // unused bytes up to the name index
    cursor.skip(layout.record_name_index.saturating_sub(MAP_ID_WIDTH));
    let name_index = cursor.read_u16()?;

    let name = if name_index == 0 {
        String::new()
    } else {
        cursor.seek(layout.name_entry_offset(name_index, rom.len())?)?;
        let name_pointer = cursor.read_pointer()?;
        if name_pointer.is_null() {
            String::new()
        } else {
            let name_offset = name_pointer.resolve(rom.len())?;
            cursor.with_position(name_offset, |cursor| cursor.read_null_terminated_text())?
        }
    };

    debug_assert_eq!(cursor.depth(), 0);
    Ok(MapDescriptor {
        map_id,
        name,
        header_offset: record_offset,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::testing::RomBuilder;

    fn small_layout(count: usize) -> RomLayout {
        RomLayout {
            catalog_base: 0x100,
            catalog_stride: 0x38,
            catalog_count: count,
            name_table_base: 0x40,
            ..RomLayout::default()
        }
    }

    #[test]
    fn resolves_names_through_the_name_table() {
        let layout = small_layout(2);
        let mut rom = RomBuilder::new(0x400);
        rom.put_u16_be(0x100, 0x0001);
        rom.put_u16(0x10C, 0);
        rom.put_u16_be(0x138, 0x0102);
        rom.put_u16(0x144, 2);
        rom.put_pointer(0x48, 0x300);
        rom.put_text(0x300, "Harbor");

        let descriptors = scan(&rom.build(), &layout);
        assert_eq!(
            descriptors,
            vec![
                MapDescriptor {
                    map_id: 1,
                    name: String::new(),
                    header_offset: 0x100,
                },
                MapDescriptor {
                    map_id: 0x0102,
                    name: "Harbor".into(),
                    header_offset: 0x138,
                },
            ]
        );
        assert_eq!(descriptors[1].display_name(), "[0102] Harbor");
        assert_eq!(descriptors[0].display_name(), "[0001] 0x000100");
    }

    #[test]
    fn null_name_slot_means_no_name() {
        let layout = small_layout(1);
        let mut rom = RomBuilder::new(0x400);
        // readable text at offset 0 must not be picked up through a null slot
        rom.put_text(0, "GARBAGE");
        rom.put_u16_be(0x100, 4);
        rom.put_u16(0x10C, 3);
        rom.put_u32(0x40 + 12, 0);

        let descriptors = scan(&rom.build(), &layout);
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].name, "");
        assert_eq!(descriptors[0].display_name(), "[0004] 0x000100");
    }

    #[test]
    fn stops_at_first_bad_record_and_keeps_prefix() {
        let layout = small_layout(3);
        let mut rom = RomBuilder::new(0x400);
        rom.put_u16_be(0x100, 7);
        // record 1 names a string behind a pointer past the image end
        rom.put_u16(0x144, 1);
        rom.put_pointer(0x44, 0x10_0000);
        rom.put_u16_be(0x170, 9);

        let descriptors = scan(&rom.build(), &layout);
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].map_id, 7);
    }

    #[test]
    fn truncated_catalog_yields_what_fits() {
        let layout = small_layout(5);
        // room for exactly two records
        let rom = RomBuilder::new(0x100 + 2 * 0x38).build();
        assert_eq!(scan(&rom, &layout).len(), 2);
    }

    #[test]
    fn huge_catalog_count_stops_at_the_image_end() {
        let layout = small_layout(usize::MAX);
        let rom = RomBuilder::new(0x400).build();
        // records at 0x100, 0x138, ... up to the last one that fits
        assert_eq!(scan(&rom, &layout).len(), (0x400 - 0x100 - 0x0E) / 0x38 + 1);
    }

    #[test]
    fn overflowing_layout_stops_soft() {
        let layout = RomLayout {
            catalog_base: usize::MAX - 0x10,
            catalog_count: usize::MAX,
            ..small_layout(0)
        };
        assert!(scan(&RomBuilder::new(0x400).build(), &layout).is_empty());
    }

    #[test]
    fn zero_stride_layout_is_skipped() {
        let layout = RomLayout {
            catalog_stride: 0,
            ..small_layout(usize::MAX)
        };
        assert!(scan(&RomBuilder::new(0x400).build(), &layout).is_empty());
    }
}
