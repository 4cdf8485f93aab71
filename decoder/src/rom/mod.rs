//! Read-only access to the cartridge image.
//!
//! [`RomImage`] owns the bytes and is cheap to clone; every decode operation
//! takes its own [`Cursor`] from it, so independent cursors over the same image
//! never share position state.
pub mod cursor;
pub mod info;

use std::fmt::Display;
use std::sync::Arc;

use serde::Serialize;

use crate::error::{DecodeError, Result};

pub use cursor::Cursor;

/// Mask applied to stored pointers, the high byte is the address-space tag
/// (`0x08` for the cartridge ROM mirror).
pub const POINTER_OFFSET_MASK: u32 = 0x00FF_FFFF;

/// Address-space tag the cartridge uses for ROM pointers.
pub const ROM_POINTER_TAG: u32 = 0x0800_0000;

/// Immutable cartridge bytes shared between cursors.
#[derive(Clone)]
pub struct RomImage {
    data: Arc<[u8]>,
}

impl RomImage {
    #[must_use]
    pub fn new(data: impl Into<Arc<[u8]>>) -> Self {
        Self { data: data.into() }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// A fresh cursor at offset 0 with an empty position stack.
    #[must_use]
    pub fn cursor(&self) -> Cursor<'_> {
        Cursor::new(&self.data)
    }
}

impl std::fmt::Debug for RomImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RomImage").field("len", &self.len()).finish()
    }
}

/// A stored 4-byte ROM address, already stripped of its tag byte.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Pointer(u32);

impl Pointer {
    pub const NULL: Self = Self(0);

    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw & POINTER_OFFSET_MASK)
    }

    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn offset(self) -> usize {
        self.0 as usize
    }

    /// Buffer offset this pointer designates, checked against the image size.
    pub const fn resolve(self, len: usize) -> Result<usize> {
        if self.offset() < len {
            Ok(self.offset())
        } else {
            Err(DecodeError::MalformedPointer {
                pointer: self.0,
                len,
            })
        }
    }

    /// Same pointer re-tagged as a cartridge address, for display.
    #[must_use]
    pub const fn rom_address(self) -> u32 {
        self.0 | ROM_POINTER_TAG
    }
}

impl Display for Pointer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:08X}", self.rom_address())
    }
}
