use serde::Serialize;

use crate::error::Result;
use crate::rom::{Pointer, RomImage};

/// Unused bytes at the start of a connector record.
const RECORD_PREAMBLE: usize = 8;

/// Unused byte between the bottom edge and the destination id.
const RECORD_GAP: usize = 1;

/// Horizontal shift consumers apply before drawing a connector over the map.
/// Found empirically against the in-game rendering; the format does not
/// encode it.
pub const CONNECTOR_DISPLAY_X_OFFSET: i32 = 8;

/// A map region leading to another map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Connector {
    pub left: i16,
    pub top: i16,
    pub right: i16,
    pub bottom: i16,
    /// Stored big-endian, unlike every other field of the record.
    pub destination_map_id: u16,
}

/// Screen rectangle for drawing a connector, `(left, top, right, bottom)`.
pub type DisplayRect = (i32, i32, i32, i32);

impl Connector {
    /// Rectangle with [`CONNECTOR_DISPLAY_X_OFFSET`] applied.
    #[must_use]
    pub fn display_rect(&self) -> DisplayRect {
        (
            i32::from(self.left) + CONNECTOR_DISPLAY_X_OFFSET,
            i32::from(self.top),
            i32::from(self.right) + CONNECTOR_DISPLAY_X_OFFSET,
            i32::from(self.bottom),
        )
    }
}

/// Reads the connector table at `table`.
///
/// A zero count ends the decode before the array pointer is even read. A null
/// table pointer means the map has no connectors.
pub fn decode_connectors(rom: &RomImage, table: Pointer) -> Result<Vec<Connector>> {
    if table.is_null() {
        return Ok(Vec::new());
    }

    let mut cursor = rom.cursor();
    cursor.seek(table.resolve(rom.len())?)?;

    let count = cursor.read_u32()?;
    if count == 0 {
        return Ok(Vec::new());
    }

    let array = cursor.read_resolved_pointer()?;
    cursor.seek(array)?;

    let mut connectors = Vec::new();
    for _ in 0..count {
        let record = cursor.read_resolved_pointer()?;
        cursor.push_position(record)?;

        cursor.skip(RECORD_PREAMBLE);
        let left = cursor.read_i16()?;
        let top = cursor.read_i16()?;
        let right = cursor.read_i16()?;
        let bottom = cursor.read_i16()?;
        cursor.skip(RECORD_GAP);
        let destination_map_id = cursor.read_u16_be()?;

        cursor.pop_position()?;
        connectors.push(Connector {
            left,
            top,
            right,
            bottom,
            destination_map_id,
        });
    }

    debug_assert_eq!(cursor.depth(), 0);
    Ok(connectors)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::error::DecodeError;
    use crate::testing::RomBuilder;

    #[test]
    fn destination_is_big_endian() {
        let mut rom = RomBuilder::new(0x200);
        rom.put_u32(0x40, 1);
        rom.put_pointer(0x44, 0x80);
        rom.put_pointer(0x80, 0x100);
        rom.put_connector(0x100, [0, 0, 16, 16], 5);
        let rom = rom.build();
        assert_eq!(&rom.bytes()[0x111..0x113], &[0x00, 0x05]);

        let connectors = decode_connectors(&rom, Pointer::from_raw(0x40)).unwrap();
        assert_eq!(
            connectors,
            vec![Connector {
                left: 0,
                top: 0,
                right: 16,
                bottom: 16,
                destination_map_id: 5,
            }]
        );
    }

    #[test]
    fn keeps_storage_order_and_signed_edges() {
        let mut rom = RomBuilder::new(0x200);
        rom.put_u32(0x40, 3);
        rom.put_pointer(0x44, 0x80);
        rom.put_pointer(0x80, 0x140);
        rom.put_pointer(0x84, 0x100);
        rom.put_pointer(0x88, 0x140);
        rom.put_connector(0x100, [-8, 0, 0, 32], 0x0203);
        rom.put_connector(0x140, [100, 4, 120, 20], 0x0010);

        let connectors = decode_connectors(&rom.build(), Pointer::from_raw(0x40)).unwrap();
        let ids: Vec<_> = connectors.iter().map(|c| c.destination_map_id).collect();
        assert_eq!(ids, vec![0x0010, 0x0203, 0x0010]);
        assert_eq!(connectors[1].left, -8);
    }

    #[test]
    fn zero_count_reads_nothing_else() {
        // the count is the last word of the image: reading the array pointer
        // would run off the end
        let mut rom = RomBuilder::new(0x44);
        rom.put_u32(0x40, 0);
        assert_eq!(
            decode_connectors(&rom.build(), Pointer::from_raw(0x40)),
            Ok(Vec::new())
        );
    }

    #[test]
    fn null_table_means_no_connectors() {
        let rom = RomBuilder::new(0x10).build();
        assert_eq!(decode_connectors(&rom, Pointer::NULL), Ok(Vec::new()));
    }

    #[test]
    fn table_pointer_outside_the_image() {
        let rom = RomBuilder::new(0x200).build();
        assert_eq!(
            decode_connectors(&rom, Pointer::from_raw(0x0800_9000)),
            Err(DecodeError::MalformedPointer {
                pointer: 0x9000,
                len: 0x200
            })
        );
    }

    #[test]
    fn array_pointer_outside_the_image() {
        let mut rom = RomBuilder::new(0x200);
        rom.put_u32(0x40, 2);
        rom.put_pointer(0x44, 0x9000);
        assert_eq!(
            decode_connectors(&rom.build(), Pointer::from_raw(0x40)),
            Err(DecodeError::MalformedPointer {
                pointer: 0x9000,
                len: 0x200
            })
        );
    }

    #[test]
    fn record_pointer_outside_the_image() {
        let mut rom = RomBuilder::new(0x200);
        rom.put_u32(0x40, 1);
        rom.put_pointer(0x44, 0x80);
        rom.put_pointer(0x80, 0x9000);
        assert!(matches!(
            decode_connectors(&rom.build(), Pointer::from_raw(0x40)),
            Err(DecodeError::MalformedPointer { pointer: 0x9000, .. })
        ));
    }

    #[test]
    fn record_past_the_end() {
        let mut rom = RomBuilder::new(0x108);
        rom.put_u32(0x40, 1);
        rom.put_pointer(0x44, 0x80);
        rom.put_pointer(0x80, 0x100);
        assert!(matches!(
            decode_connectors(&rom.build(), Pointer::from_raw(0x40)),
            Err(DecodeError::OutOfRange { .. })
        ));
    }

    #[test]
    fn display_rect_shifts_horizontally() {
        let connector = Connector {
            left: 0,
            top: 0,
            right: 16,
            bottom: 16,
            destination_map_id: 5,
        };
        assert_eq!(connector.display_rect(), (8, 0, 24, 16));
    }
}
