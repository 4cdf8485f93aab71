//! Decoder for the map data of a Game Boy Advance cartridge.
//!
//! [`MapSession`] is the entry point: it scans the map catalog of a ROM image
//! and renders maps into RGBA layers, caching decoded tile graphics for as
//! long as the image stays loaded.
#[allow(clippy::cast_possible_truncation)]
mod bitwise;

pub mod catalog;
pub mod connector;
pub mod error;
pub mod header;
pub mod layer;
pub mod layout;
pub mod render;
pub mod rom;
pub mod session;
pub mod tileset;

#[cfg(test)]
#[allow(clippy::cast_possible_truncation)]
mod testing;

pub use catalog::MapDescriptor;
pub use connector::Connector;
pub use error::DecodeError;
pub use header::MapHeader;
pub use layout::RomLayout;
pub use render::bitmap::Bitmap;
pub use session::{BatchFailure, LayerOutcome, MapRender, MapSession};
