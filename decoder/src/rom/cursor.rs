use crate::error::{DecodeError, Result};
use crate::rom::Pointer;

/// Terminator unit for null-terminated names.
const TEXT_TERMINATOR: u16 = 0x0000;

/// A reading position over a ROM image with a stack of saved positions.
///
/// Every read advances the position by the width it consumed. Callers that
/// need to follow a pointer and come back use [`Cursor::push_position`] and
/// [`Cursor::pop_position`] (or [`Cursor::with_position`], which pairs them).
/// After a failed read the position is unspecified and the whole decode is
/// expected to be abandoned.
///
/// [`Cursor::seek`] and [`Cursor::push_position`] only accept offsets inside
/// the image. [`Cursor::skip`] does not check: it may leave the position at or
/// past the end, and the next read then fails with `OutOfRange`.
pub struct Cursor<'a> {
    data: &'a [u8],
    position: usize,
    stack: Vec<usize>,
}

impl<'a> Cursor<'a> {
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            position: 0,
            stack: Vec::new(),
        }
    }

    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of saved positions still waiting for a pop.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub const fn seek(&mut self, offset: usize) -> Result<()> {
        if offset >= self.data.len() {
            return Err(DecodeError::OutOfRange {
                offset,
                len: self.data.len(),
            });
        }
        self.position = offset;
        Ok(())
    }

    /// Moves forward without reading. Bounds are checked by the next read.
    pub const fn skip(&mut self, count: usize) {
        self.position = self.position.saturating_add(count);
    }

    pub fn push_position(&mut self, offset: usize) -> Result<()> {
        let saved = self.position;
        self.seek(offset)?;
        self.stack.push(saved);
        Ok(())
    }

    pub fn pop_position(&mut self) -> Result<()> {
        self.position = self.stack.pop().ok_or(DecodeError::StackUnderflow)?;
        Ok(())
    }

    /// Runs `read` at `offset` and restores the current position afterwards.
    /// On error the saved position is dropped along with the decode.
    pub fn with_position<T>(
        &mut self,
        offset: usize,
        read: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        self.push_position(offset)?;
        let value = read(self)?;
        self.pop_position()?;
        Ok(value)
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        let out_of_range = DecodeError::OutOfRange {
            offset: self.position,
            len: self.data.len(),
        };
        let end = self.position.checked_add(N).ok_or(out_of_range.clone())?;
        let bytes = self.data.get(self.position..end).ok_or(out_of_range)?;
        self.position = end;

        // `bytes` has exactly N elements.
        let mut array = [0; N];
        array.copy_from_slice(bytes);
        Ok(array)
    }

    /// Borrows `count` bytes starting at the current position.
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        let out_of_range = DecodeError::OutOfRange {
            offset: self.position,
            len: self.data.len(),
        };
        let end = self
            .position
            .checked_add(count)
            .ok_or(out_of_range.clone())?;
        let bytes = self.data.get(self.position..end).ok_or(out_of_range)?;
        self.position = end;
        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take::<1>()?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.take().map(u16::from_le_bytes)
    }

    /// Big-endian u16, only the catalog map id and connector destination use it.
    pub fn read_u16_be(&mut self) -> Result<u16> {
        self.take().map(u16::from_be_bytes)
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        self.take().map(i16::from_le_bytes)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.take().map(u32::from_le_bytes)
    }

    pub fn read_pointer(&mut self) -> Result<Pointer> {
        self.read_u32().map(Pointer::from_raw)
    }

    /// Reads a pointer and checks that it lands inside the image.
    pub fn read_resolved_pointer(&mut self) -> Result<usize> {
        let pointer = self.read_pointer()?;
        pointer.resolve(self.data.len())
    }

    /// UTF-16LE units up to (and consuming) a 0x0000 terminator.
    pub fn read_null_terminated_text(&mut self) -> Result<String> {
        let mut units = Vec::new();
        loop {
            let unit = self.read_u16()?;
            if unit == TEXT_TERMINATOR {
                break;
            }
            units.push(unit);
        }
        Ok(String::from_utf16_lossy(&units))
    }

    /// A u16 unit count followed by that many UTF-16LE units.
    pub fn read_length_prefixed_text(&mut self) -> Result<String> {
        let count = self.read_u16()?;
        let units = (0..count)
            .map(|_| self.read_u16())
            .collect::<Result<Vec<_>>>()?;
        Ok(String::from_utf16_lossy(&units))
    }

    /// Fixed-width ASCII field, trailing NUL padding removed.
    pub fn read_ascii(&mut self, width: usize) -> Result<String> {
        let bytes = self.read_bytes(width)?;
        let text = bytes
            .iter()
            .take_while(|&&byte| byte != 0)
            .map(|&byte| if byte.is_ascii() { byte as char } else { '?' })
            .collect();
        Ok(text)
    }
}
