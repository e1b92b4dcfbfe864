use zerocopy::FromBytes;

use crate::error::FormatError;

/// Bounds-checked, strictly sequential reader over a byte slice.
///
/// Every read either returns exactly the requested bytes and advances, or fails and leaves
/// the cursor where it was.
#[derive(Debug, Clone)]
pub struct WireCursor<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> WireCursor<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.position
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Bytes consumed so far.
    pub fn consumed(&self) -> &'a [u8] {
        &self.bytes[..self.position]
    }

    /// Removes `n` bytes from the front and returns them.
    pub fn read_fixed(&mut self, n: usize, field: &'static str) -> Result<&'a [u8], FormatError> {
        if n > self.remaining() {
            return Err(FormatError::Truncated {
                field,
                needed: n,
                remaining: self.remaining(),
            });
        }
        let front = &self.bytes[self.position..self.position + n];
        self.position += n;
        Ok(front)
    }

    /// Removes `N` bytes from the front and copies them into an owned array.
    pub fn read_array<const N: usize>(&mut self, field: &'static str) -> Result<[u8; N], FormatError> {
        let mut res = [0u8; N];
        res.copy_from_slice(self.read_fixed(N, field)?);
        Ok(res)
    }

    pub fn read_u16_le(&mut self, field: &'static str) -> Result<u16, FormatError> {
        Ok(u16::from_le_bytes(self.read_array::<2>(field)?))
    }

    pub fn read_u32_le(&mut self, field: &'static str) -> Result<u32, FormatError> {
        Ok(u32::from_le_bytes(self.read_array::<4>(field)?))
    }

    /// Removes `std::mem::size_of::<T>()` bytes from the front and returns them as a `T`.
    pub fn read_struct<T: FromBytes>(&mut self, field: &'static str) -> Result<T, FormatError> {
        let bytes = self.read_fixed(std::mem::size_of::<T>(), field)?;
        T::read_from(bytes).ok_or(FormatError::Truncated {
            field,
            needed: std::mem::size_of::<T>(),
            remaining: bytes.len(),
        })
    }

    /// Carves the next `n` bytes out as an independent cursor for a nested structure.
    pub fn sub_cursor(&mut self, n: usize, field: &'static str) -> Result<WireCursor<'a>, FormatError> {
        Ok(WireCursor::new(self.read_fixed(n, field)?))
    }

    /// Succeeds only if every byte has been consumed.
    pub fn finish(self, field: &'static str) -> Result<(), FormatError> {
        if !self.is_empty() {
            return Err(FormatError::LengthMismatch {
                field,
                declared: self.position,
                actual: self.bytes.len(),
            });
        }
        Ok(())
    }
}
