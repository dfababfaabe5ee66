//! Durable storage for the sensor node.
//!
//! Everything persistent goes through [`BlockStore`], a byte-addressed view of
//! one named resource. Two resources exist on the device:
//!
//! ```text
//! /
//! ├── logging.db      (sensor event table, header + ring of 8-byte records)
//! └── settings.txt    (one 132-byte WifiSettings block at offset 0)
//! ```

pub mod export;
pub mod memory;
pub mod record;
pub mod sd_card;
pub mod sensor_log;
pub mod settings;

pub use export::{EXPORT_BATCH_LEN, ExportBatch, ExportSink, ExportSummary, QueryStringSink, export_range};
pub use memory::MemoryBlockStore;
pub use record::{RECORD_LEN, SensorEvent};
pub use sd_card::{SdCardFile, SdCardStorage};
pub use sensor_log::{LogConfig, LogError, OverflowPolicy, RangeScan, SensorLog, TableOpen};
pub use settings::{SETTINGS_LEN, SettingsStore, WifiSettings};

use thiserror_no_std::Error;

/// Name of the resource holding the sensor event table
pub const LOG_FILE_NAME: &str = "logging.db";

/// Name of the resource holding the persisted settings block
pub const SETTINGS_FILE_NAME: &str = "settings.txt";

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    #[error("storage medium unavailable")]
    Unavailable,
    #[error("storage I/O failed")]
    Io,
    #[error("offset {0} lies beyond the end of the resource")]
    InvalidOffset(u32),
    #[error("resource ended before the requested range")]
    Truncated,
}

/// Byte-addressed access to one named, durable resource.
///
/// A write is complete only once it is flushed: `write_at` must not return
/// `Ok` before the data would survive a power loss. Writing at exactly
/// [`size`](BlockStore::size) extends the resource; offsets past the end are
/// rejected with [`StorageError::InvalidOffset`].
pub trait BlockStore {
    /// Current length in bytes, `0` when the resource does not exist yet.
    fn size(&mut self) -> Result<u32, StorageError>;

    /// Read into `buf` starting at `offset`. The count is short only at the
    /// end of the resource.
    fn read_at(&mut self, offset: u32, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write `data` at `offset`, then flush.
    fn write_at(&mut self, offset: u32, data: &[u8]) -> Result<(), StorageError>;

    /// Fill all of `buf` from `offset` or fail with [`StorageError::Truncated`].
    fn read_exact_at(&mut self, offset: u32, buf: &mut [u8]) -> Result<(), StorageError> {
        let read = self.read_at(offset, buf)?;
        if read == buf.len() {
            Ok(())
        } else {
            Err(StorageError::Truncated)
        }
    }
}

impl<B: BlockStore + ?Sized> BlockStore for &mut B {
    fn size(&mut self) -> Result<u32, StorageError> {
        (**self).size()
    }

    fn read_at(&mut self, offset: u32, buf: &mut [u8]) -> Result<usize, StorageError> {
        (**self).read_at(offset, buf)
    }

    fn write_at(&mut self, offset: u32, data: &[u8]) -> Result<(), StorageError> {
        (**self).write_at(offset, data)
    }
}
