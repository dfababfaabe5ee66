//! RAM-backed block store
//!
//! Used by the tests and as a volatile fallback when no SD card is present.

use alloc::vec::Vec;

use super::{BlockStore, StorageError};

#[derive(Debug, Clone, Default)]
pub struct MemoryBlockStore {
    bytes: Vec<u8>,
    writes: usize,
}

impl MemoryBlockStore {
    /// Create an empty (not yet existing) resource
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a resource pre-filled with `bytes`
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes, writes: 0 }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Number of completed `write_at` calls
    pub fn write_count(&self) -> usize {
        self.writes
    }
}

impl BlockStore for MemoryBlockStore {
    fn size(&mut self) -> Result<u32, StorageError> {
        Ok(self.bytes.len() as u32)
    }

    fn read_at(&mut self, offset: u32, buf: &mut [u8]) -> Result<usize, StorageError> {
        let start = offset as usize;
        if start > self.bytes.len() {
            return Err(StorageError::InvalidOffset(offset));
        }

        let available = &self.bytes[start..];
        let count = available.len().min(buf.len());
        buf[..count].copy_from_slice(&available[..count]);
        Ok(count)
    }

    fn write_at(&mut self, offset: u32, data: &[u8]) -> Result<(), StorageError> {
        let start = offset as usize;
        if start > self.bytes.len() {
            return Err(StorageError::InvalidOffset(offset));
        }

        let end = start + data.len();
        if end > self.bytes.len() {
            self.bytes.resize(end, 0);
        }
        self.bytes[start..end].copy_from_slice(data);
        self.writes += 1;
        Ok(())
    }
}
