//! Tile graphics blocks and their per-ROM cache.
//!
//! A block is laid out as:
//!
//! ```text
//! 0x000  u16   tile count
//! 0x002  u8    bits per pixel (4 or 8)
//! 0x003  u8    reserved
//! 0x004  u16 × 256  BGR555 palette
//! 0x204  tile data, 32 bytes per 4bpp tile / 64 bytes per 8bpp tile
//! ```
//!
//! A map points at a table of two block pointers (primary, then an optional
//! secondary). Tile indexes run through the primary block first and continue
//! into the secondary one.
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;

use serde::Serialize;

use crate::error::{DecodeError, Result};
use crate::header::MapHeader;
use crate::render::bitmap::Bitmap;
use crate::render::color::{Color, Rgba, colors};
use crate::render::{MAX_COLORS_FULL_PALETTE, MAX_COLORS_SINGLE_PALETTE, TILE_SIZE};
use crate::rom::{Cursor, RomImage};

const PALETTE_OFFSET: usize = 0x004;
const TILE_DATA_OFFSET: usize = PALETTE_OFFSET + MAX_COLORS_FULL_PALETTE * 2;

/// Pixels in one tile.
const TILE_PIXELS: usize = TILE_SIZE * TILE_SIZE;

/// Tiles per row in a chunk's preview sheet.
pub const SHEET_COLUMNS: usize = 16;

/// Number of block pointers in a map's tileset table.
const TILESET_SLOTS: usize = 2;

/// Half-open span `[start, end)` of ROM bytes a chunk was decoded from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ByteRange {
    pub start: usize,
    pub end: usize,
}

impl ByteRange {
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl Display for ByteRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:06X}..0x{:06X}", self.start, self.end)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ColorDepth {
    /// 16 colors per tile, palette bank chosen by the tile cell.
    Bpp4,
    /// 256 colors per tile, palette bank ignored.
    Bpp8,
}

impl ColorDepth {
    fn from_bits(bits: u8) -> Result<Self> {
        match bits {
            4 => Ok(Self::Bpp4),
            8 => Ok(Self::Bpp8),
            other => Err(DecodeError::DecodeFailure(format!(
                "unsupported tile depth: {other} bits per pixel"
            ))),
        }
    }

    #[must_use]
    pub const fn tile_bytes(self) -> usize {
        match self {
            Self::Bpp4 => TILE_PIXELS / 2,
            Self::Bpp8 => TILE_PIXELS,
        }
    }
}

/// Field layout of a block, read before deciding whether it needs decoding.
struct BlockHeader {
    tile_count: usize,
    depth: ColorDepth,
    range: ByteRange,
}

impl BlockHeader {
    fn read(cursor: &mut Cursor<'_>, offset: usize) -> Result<Self> {
        cursor.with_position(offset, |cursor| {
            let tile_count = usize::from(cursor.read_u16()?);
            let depth = ColorDepth::from_bits(cursor.read_u8()?)?;
            Ok(Self {
                tile_count,
                depth,
                range: ByteRange {
                    start: offset,
                    end: offset + TILE_DATA_OFFSET + tile_count * depth.tile_bytes(),
                },
            })
        })
    }
}

/// A decoded tile graphics block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TilesetChunk {
    range: ByteRange,
    depth: ColorDepth,
    tile_count: usize,
    /// Palette index of every pixel, tile after tile, row-major inside a tile.
    indices: Vec<u8>,
    palette: Vec<Color>,
    sheet: Bitmap,
}

impl TilesetChunk {
    fn decode(cursor: &mut Cursor<'_>, block: &BlockHeader) -> Result<Self> {
        cursor.push_position(block.range.start + PALETTE_OFFSET)?;

        let palette = (0..MAX_COLORS_FULL_PALETTE)
            .map(|_| cursor.read_u16().map(Color::from))
            .collect::<Result<Vec<_>>>()?;

        let data = cursor.read_bytes(block.tile_count * block.depth.tile_bytes())?;
        let indices = expand_tiles(data, block.depth);

        cursor.pop_position()?;

        let mut chunk = Self {
            range: block.range,
            depth: block.depth,
            tile_count: block.tile_count,
            indices,
            palette,
            sheet: Bitmap::new(0, 0),
        };
        chunk.sheet = chunk.render_sheet();
        Ok(chunk)
    }

    #[must_use]
    pub const fn range(&self) -> ByteRange {
        self.range
    }

    #[must_use]
    pub const fn depth(&self) -> ColorDepth {
        self.depth
    }

    #[must_use]
    pub const fn tile_count(&self) -> usize {
        self.tile_count
    }

    #[must_use]
    pub fn palette(&self) -> &[Color] {
        &self.palette
    }

    /// All tiles laid out [`SHEET_COLUMNS`] per row, left to right and top to
    /// bottom. 4bpp tiles are shown with palette bank 0.
    #[must_use]
    pub const fn sheet(&self) -> &Bitmap {
        &self.sheet
    }

    /// Color of pixel `(x, y)` of `tile`, transparent for color index 0.
    #[must_use]
    pub fn pixel(&self, tile: usize, x: usize, y: usize, bank: u8) -> Rgba {
        debug_assert!(tile < self.tile_count && x < TILE_SIZE && y < TILE_SIZE);
        let index = usize::from(self.indices[tile * TILE_PIXELS + y * TILE_SIZE + x]);
        if index == 0 {
            return colors::TRANSPARENT;
        }

        let palette_index = match self.depth {
            ColorDepth::Bpp4 => usize::from(bank) * MAX_COLORS_SINGLE_PALETTE + index,
            ColorDepth::Bpp8 => index,
        };
        self.palette[palette_index].to_rgba()
    }

    fn render_sheet(&self) -> Bitmap {
        let rows = self.tile_count.div_ceil(SHEET_COLUMNS);
        let columns = self.tile_count.min(SHEET_COLUMNS);
        let mut sheet = Bitmap::new(columns * TILE_SIZE, rows * TILE_SIZE);

        for tile in 0..self.tile_count {
            let origin_x = (tile % SHEET_COLUMNS) * TILE_SIZE;
            let origin_y = (tile / SHEET_COLUMNS) * TILE_SIZE;
            for y in 0..TILE_SIZE {
                for x in 0..TILE_SIZE {
                    sheet[(origin_x + x, origin_y + y)] = self.pixel(tile, x, y, 0);
                }
            }
        }
        sheet
    }
}

/// One palette index per pixel. In 4bpp data the low nibble is the left pixel.
fn expand_tiles(data: &[u8], depth: ColorDepth) -> Vec<u8> {
    match depth {
        ColorDepth::Bpp8 => data.to_vec(),
        ColorDepth::Bpp4 => data
            .iter()
            .flat_map(|&byte| [byte & 0x0F, byte >> 4])
            .collect(),
    }
}

/// Chunks decoded for the currently loaded ROM, keyed by source range.
///
/// Entries live until [`TilesetCache::reset`], which the session calls when a
/// new ROM replaces the current one.
#[derive(Default)]
pub struct TilesetCache {
    entries: HashMap<ByteRange, Arc<TilesetChunk>>,
    hits: usize,
    decodes: usize,
}

impl TilesetCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        tracing::debug!("dropping {} cached tileset chunks", self.entries.len());
        self.entries.clear();
        self.hits = 0;
        self.decodes = 0;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn get(&self, range: &ByteRange) -> Option<&Arc<TilesetChunk>> {
        self.entries.get(range)
    }

    /// Lookups answered without decoding since the last reset.
    #[must_use]
    pub const fn hits(&self) -> usize {
        self.hits
    }

    /// Tile expansions performed since the last reset.
    #[must_use]
    pub const fn decodes(&self) -> usize {
        self.decodes
    }

    /// Returns the chunk for the block at `offset`, decoding it only if its
    /// byte range has not been seen yet. A failed decode leaves the cache as
    /// it was.
    pub fn chunk_at(&mut self, cursor: &mut Cursor<'_>, offset: usize) -> Result<Arc<TilesetChunk>> {
        let block = BlockHeader::read(cursor, offset)?;

        if let Some(chunk) = self.entries.get(&block.range) {
            self.hits += 1;
            tracing::debug!("tileset cache hit for {}", block.range);
            return Ok(Arc::clone(chunk));
        }

        let chunk = Arc::new(TilesetChunk::decode(cursor, &block)?);
        self.decodes += 1;
        tracing::debug!(
            "decoded {} tiles ({:?}) from {}",
            chunk.tile_count,
            chunk.depth,
            block.range
        );
        self.entries.insert(block.range, Arc::clone(&chunk));
        Ok(chunk)
    }
}

/// The chunks a map draws its tiles from, in tile-index order.
#[derive(Clone, Debug, Default)]
pub struct Tileset {
    chunks: Vec<Arc<TilesetChunk>>,
}

impl Tileset {
    #[must_use]
    pub fn chunks(&self) -> &[Arc<TilesetChunk>] {
        &self.chunks
    }

    #[must_use]
    pub fn get(&self, range: &ByteRange) -> Option<&TilesetChunk> {
        self.chunks
            .iter()
            .find(|chunk| chunk.range == *range)
            .map(|chunk| &**chunk)
    }

    /// Total number of addressable tiles.
    #[must_use]
    pub fn tile_count(&self) -> usize {
        self.chunks.iter().map(|chunk| chunk.tile_count).sum()
    }

    /// Chunk holding the map-wide tile `index`, and the index inside it.
    #[must_use]
    pub fn tile(&self, index: usize) -> Option<(&TilesetChunk, usize)> {
        let mut local = index;
        for chunk in &self.chunks {
            if local < chunk.tile_count {
                return Some((chunk, local));
            }
            local -= chunk.tile_count;
        }
        None
    }
}

/// Resolves the map's tileset table and decodes (or fetches from `cache`)
/// each block it points to. A null tileset pointer yields an empty tileset.
pub fn decode_tileset(
    rom: &RomImage,
    header: &MapHeader,
    cache: &mut TilesetCache,
) -> Result<Tileset> {
    let mut tileset = Tileset::default();
    if header.tileset_pointer.is_null() {
        return Ok(tileset);
    }

    let mut cursor = rom.cursor();
    let table = header.tileset_pointer.resolve(rom.len())?;
    cursor.seek(table)?;

    for _ in 0..TILESET_SLOTS {
        let pointer = cursor.read_pointer()?;
        if pointer.is_null() {
            continue;
        }
        let block = pointer.resolve(rom.len())?;
        tileset.chunks.push(cache.chunk_at(&mut cursor, block)?);
    }

    debug_assert_eq!(cursor.depth(), 0);
    Ok(tileset)
}
