//! One loaded ROM and everything decoded from it.
//!
//! The session owns the image, the catalog scanned from it and the tileset
//! cache. Loading another image replaces all three at once, so cached chunks
//! never outlive the ROM they were decoded from.
use std::fmt::Display;
use std::sync::Arc;

use crate::catalog::{self, MapDescriptor};
use crate::connector::{self, Connector};
use crate::error::{DecodeError, Result};
use crate::header::{LAYER_COUNT, MapHeader};
use crate::layer;
use crate::layout::RomLayout;
use crate::render::bitmap::Bitmap;
use crate::rom::RomImage;
use crate::rom::info::RomInfo;
use crate::tileset::{self, Tileset, TilesetCache};

/// Result of decoding one background layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LayerOutcome {
    /// The header has no arrangement pointer for this layer.
    Absent,
    Decoded(Bitmap),
    Failed(DecodeError),
}

impl LayerOutcome {
    #[must_use]
    pub const fn bitmap(&self) -> Option<&Bitmap> {
        match self {
            Self::Decoded(bitmap) => Some(bitmap),
            Self::Absent | Self::Failed(_) => None,
        }
    }
}

/// Everything a viewer needs to draw one map.
#[derive(Clone, Debug)]
pub struct MapRender {
    pub descriptor: MapDescriptor,
    pub header: MapHeader,
    pub width: usize,
    pub height: usize,
    /// BG0 (front) to BG3 (back).
    pub layers: [LayerOutcome; LAYER_COUNT],
    pub tileset: Tileset,
    pub connectors: Vec<Connector>,
}

impl MapRender {
    /// Flattens the selected layers, BG3 first and BG0 on top. A layer that
    /// failed to decode is drawn as a placeholder.
    #[must_use]
    pub fn composite(&self, visible: [bool; LAYER_COUNT]) -> Bitmap {
        let mut bitmap = Bitmap::new(self.width, self.height);
        for index in (0..LAYER_COUNT).rev() {
            if !visible[index] {
                continue;
            }
            match &self.layers[index] {
                LayerOutcome::Absent => {}
                LayerOutcome::Decoded(layer) => bitmap.draw_over(layer),
                LayerOutcome::Failed(_) => {
                    bitmap.draw_over(&Bitmap::placeholder(self.width, self.height));
                }
            }
        }
        bitmap
    }
}

/// A map that could not be rendered or handed to the batch sink.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchFailure {
    pub descriptor: MapDescriptor,
    pub message: String,
}

impl Display for BatchFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.descriptor.display_name(), self.message)
    }
}

pub struct MapSession {
    rom: RomImage,
    layout: RomLayout,
    cache: TilesetCache,
    descriptors: Vec<MapDescriptor>,
}

impl MapSession {
    /// Opens `data` with the default table layout.
    #[must_use]
    pub fn new(data: impl Into<Arc<[u8]>>) -> Self {
        Self::with_layout(data, RomLayout::default())
    }

    #[must_use]
    pub fn with_layout(data: impl Into<Arc<[u8]>>, layout: RomLayout) -> Self {
        let mut session = Self {
            rom: RomImage::new(Vec::<u8>::new()),
            layout,
            cache: TilesetCache::new(),
            descriptors: Vec::new(),
        };
        session.load(data);
        session
    }

    /// Replaces the ROM, drops every cached chunk and rescans the catalog.
    pub fn load(&mut self, data: impl Into<Arc<[u8]>>) {
        self.rom = RomImage::new(data);
        self.cache.reset();
        self.descriptors = catalog::scan(&self.rom, &self.layout);
        tracing::info!(
            "loaded ROM: {} bytes, {} maps",
            self.rom.len(),
            self.descriptors.len()
        );
    }

    #[must_use]
    pub const fn rom(&self) -> &RomImage {
        &self.rom
    }

    #[must_use]
    pub const fn layout(&self) -> &RomLayout {
        &self.layout
    }

    #[must_use]
    pub fn descriptors(&self) -> &[MapDescriptor] {
        &self.descriptors
    }

    /// Descriptor whose catalog record sits at `header_offset`.
    #[must_use]
    pub fn find(&self, header_offset: usize) -> Option<&MapDescriptor> {
        self.descriptors
            .iter()
            .find(|descriptor| descriptor.header_offset == header_offset)
    }

    #[must_use]
    pub const fn cache(&self) -> &TilesetCache {
        &self.cache
    }

    pub fn reset_cache(&mut self) {
        self.cache.reset();
    }

    pub fn info(&self) -> Result<RomInfo> {
        RomInfo::read(&self.rom)
    }

    pub fn read_header(&self, descriptor: &MapDescriptor) -> Result<MapHeader> {
        MapHeader::read(&self.rom, &self.layout, descriptor.header_offset)
    }

    pub fn decode_tileset(&mut self, header: &MapHeader) -> Result<Tileset> {
        tileset::decode_tileset(&self.rom, header, &mut self.cache)
    }

    pub fn decode_connectors(&self, header: &MapHeader) -> Result<Vec<Connector>> {
        connector::decode_connectors(&self.rom, header.connector_table_pointer)
    }

    /// Decodes a whole map. Header, tileset and connector errors fail the
    /// render; a broken layer is reported in its [`LayerOutcome`] and the
    /// other layers are still decoded.
    pub fn render_map(&mut self, descriptor: &MapDescriptor) -> Result<MapRender> {
        let header = self.read_header(descriptor)?;
        let tileset = self.decode_tileset(&header)?;
        let connectors = self.decode_connectors(&header)?;
        let (width, height) = (header.width(), header.height());

        let layers = std::array::from_fn(|index| {
            let pointer = header.layer_pointers[index];
            if pointer.is_null() {
                return LayerOutcome::Absent;
            }
            match layer::decode_layer(&self.rom, pointer, &tileset, width, height) {
                Ok(bitmap) => LayerOutcome::Decoded(bitmap),
                Err(e) => {
                    tracing::warn!("{}: BG{index} failed: {e}", descriptor.display_name());
                    LayerOutcome::Failed(e)
                }
            }
        });

        Ok(MapRender {
            descriptor: descriptor.clone(),
            header,
            width,
            height,
            layers,
            tileset,
            connectors,
        })
    }

    /// Decodes a single layer, e.g. to export it on its own.
    pub fn render_layer(&mut self, descriptor: &MapDescriptor, index: usize) -> Result<Bitmap> {
        if index >= LAYER_COUNT {
            return Err(DecodeError::DecodeFailure(format!(
                "layer index {index} is not in 0..{LAYER_COUNT}"
            )));
        }

        let header = self.read_header(descriptor)?;
        let pointer = header.layer_pointers[index];
        if pointer.is_null() {
            return Err(DecodeError::DecodeFailure(format!(
                "{} has no BG{index}",
                descriptor.display_name()
            )));
        }
        let tileset = self.decode_tileset(&header)?;
        layer::decode_layer(&self.rom, pointer, &tileset, header.width(), header.height())
    }

    /// Renders each map in turn and hands it to `sink`, one map in memory at a
    /// time. Maps that fail to render or that `sink` rejects are collected,
    /// the rest of the batch still runs.
    pub fn render_batch<E: Display>(
        &mut self,
        descriptors: &[MapDescriptor],
        mut sink: impl FnMut(&MapRender) -> std::result::Result<(), E>,
    ) -> Vec<BatchFailure> {
        let mut failures = Vec::new();
        for descriptor in descriptors {
            let message = match self.render_map(descriptor) {
                Ok(render) => match sink(&render) {
                    Ok(()) => continue,
                    Err(e) => e.to_string(),
                },
                Err(e) => e.to_string(),
            };
            let failure = BatchFailure {
                descriptor: descriptor.clone(),
                message,
            };
            tracing::warn!("{failure}");
            failures.push(failure);
        }
        failures
    }

    /// [`MapSession::render_batch`] over the whole catalog.
    pub fn render_all<E: Display>(
        &mut self,
        sink: impl FnMut(&MapRender) -> std::result::Result<(), E>,
    ) -> Vec<BatchFailure> {
        let descriptors = self.descriptors.clone();
        self.render_batch(&descriptors, sink)
    }
}
