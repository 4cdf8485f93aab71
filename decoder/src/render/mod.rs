//! Pixel-side types: GBA colors and owned RGBA bitmaps.
pub mod bitmap;
pub mod color;

/// Tiles are square cells of this many pixels.
pub const TILE_SIZE: usize = 8;

/// Each palette bank can contain 16 colors.
pub const MAX_COLORS_SINGLE_PALETTE: usize = 16;

/// Banks used together as one 256-color palette.
pub const MAX_COLORS_FULL_PALETTE: usize = 256;
