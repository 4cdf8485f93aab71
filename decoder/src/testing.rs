//! Synthetic ROM images for unit tests.
use crate::rom::{ROM_POINTER_TAG, RomImage};

/// Zero-filled image that tests poke values into before freezing it.
pub struct RomBuilder {
    data: Vec<u8>,
}

impl RomBuilder {
    pub fn new(len: usize) -> Self {
        Self { data: vec![0; len] }
    }

    pub fn put_bytes(&mut self, at: usize, bytes: &[u8]) {
        self.data[at..at + bytes.len()].copy_from_slice(bytes);
    }

    pub fn put_u8(&mut self, at: usize, value: u8) {
        self.data[at] = value;
    }

    pub fn put_u16(&mut self, at: usize, value: u16) {
        self.put_bytes(at, &value.to_le_bytes());
    }

    pub fn put_u16_be(&mut self, at: usize, value: u16) {
        self.put_bytes(at, &value.to_be_bytes());
    }

    pub fn put_i16(&mut self, at: usize, value: i16) {
        self.put_bytes(at, &value.to_le_bytes());
    }

    pub fn put_u32(&mut self, at: usize, value: u32) {
        self.put_bytes(at, &value.to_le_bytes());
    }

    /// Stores a tagged ROM pointer to `target`.
    pub fn put_pointer(&mut self, at: usize, target: usize) {
        self.put_u32(at, ROM_POINTER_TAG | target as u32);
    }

    /// Null-terminated UTF-16LE text.
    pub fn put_text(&mut self, at: usize, text: &str) {
        let mut offset = at;
        for unit in text.encode_utf16().chain([0]) {
            self.put_u16(offset, unit);
            offset += 2;
        }
    }

    /// Writes a tile graphics block and returns the offset just past it.
    pub fn put_tile_block<T: AsRef<[u8]>>(
        &mut self,
        at: usize,
        bits_per_pixel: u8,
        palette: &[u16],
        tiles: &[T],
    ) -> usize {
        self.put_u16(at, tiles.len() as u16);
        self.put_u8(at + 2, bits_per_pixel);
        for (i, &color) in palette.iter().enumerate() {
            self.put_u16(at + 4 + i * 2, color);
        }
        let mut offset = at + 0x204;
        for tile in tiles {
            self.put_bytes(offset, tile.as_ref());
            offset += tile.as_ref().len();
        }
        offset
    }

    /// A 19-byte connector record.
    pub fn put_connector(&mut self, at: usize, edges: [i16; 4], destination: u16) {
        for (i, edge) in edges.into_iter().enumerate() {
            self.put_i16(at + 8 + i * 2, edge);
        }
        self.put_u16_be(at + 17, destination);
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    pub fn build(self) -> RomImage {
        RomImage::new(self.data)
    }
}
