//! Fixed-capacity sensor event table over a [`BlockStore`].
//!
//! ## Layout
//!
//! ```text
//! offset 0   header (24 bytes, little-endian)
//!            magic "SLOG" | version u16 | record_len u16 | capacity u32
//!            | count u32 | head u32 | reserved u32
//! offset 24  slot 0, slot 1, ... slot capacity-1 (8 bytes each)
//! ```
//!
//! `head` is the slot of the oldest retained record. Until the table fills,
//! `head` stays 0 and records occupy slots `0..count`. Once full, each append
//! overwrites the slot at `head` and advances it, so the table always holds
//! the newest `capacity` records.
//!
//! ## Durability
//!
//! Every append writes the record first and the header second, each flushed
//! by the store before the next begins. A power loss between the two writes
//! loses only the newest record; the table stays consistent.

use log::{debug, error, info, warn};
use thiserror_no_std::Error;

use super::{BlockStore, RECORD_LEN, SensorEvent, StorageError};

const TABLE_MAGIC: [u8; 4] = *b"SLOG";
const FORMAT_VERSION: u16 = 1;

/// Size of the table header in bytes
pub const HEADER_LEN: usize = 24;

/// Largest capacity whose slots still fit in a 32-bit offset
pub const MAX_CAPACITY: u32 = (u32::MAX - HEADER_LEN as u32) / RECORD_LEN as u32;

/// What `append` does once the table holds `capacity` records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Overwrite the oldest record (ring buffer)
    Wrap,
    /// Refuse the append with [`LogError::TableFull`]. The event is lost; the
    /// caller is told so.
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogConfig {
    /// Number of records retained, clamped to `1..=MAX_CAPACITY`
    pub capacity: u32,
    pub policy: OverflowPolicy,
}

impl LogConfig {
    /// A wrapping table of `capacity` records
    pub const fn new(capacity: u32) -> Self {
        let capacity = if capacity == 0 {
            1
        } else if capacity > MAX_CAPACITY {
            MAX_CAPACITY
        } else {
            capacity
        };

        Self {
            capacity,
            policy: OverflowPolicy::Wrap,
        }
    }

    pub const fn with_policy(mut self, policy: OverflowPolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// How [`SensorLog::initialize`] obtained its table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableOpen {
    OpenedExisting,
    CreatedNew,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogError {
    #[error("sensor log storage unavailable")]
    StorageUnavailable,
    #[error("record {index} out of range (table holds {count})")]
    OutOfRange { index: u32, count: u32 },
    #[error("sensor log table full")]
    TableFull,
    #[error("sensor log storage I/O failed")]
    Io,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TableHeader {
    capacity: u32,
    count: u32,
    head: u32,
}

impl TableHeader {
    const fn empty(capacity: u32) -> Self {
        Self {
            capacity,
            count: 0,
            head: 0,
        }
    }

    fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut bytes = [0u8; HEADER_LEN];

        bytes[0..4].copy_from_slice(&TABLE_MAGIC);
        bytes[4..6].copy_from_slice(&FORMAT_VERSION.to_le_bytes());
        bytes[6..8].copy_from_slice(&(RECORD_LEN as u16).to_le_bytes());
        bytes[8..12].copy_from_slice(&self.capacity.to_le_bytes());
        bytes[12..16].copy_from_slice(&self.count.to_le_bytes());
        bytes[16..20].copy_from_slice(&self.head.to_le_bytes());

        bytes
    }

    /// Decodes a header, `None` when the signature or record format differs.
    fn from_bytes(bytes: &[u8; HEADER_LEN]) -> Option<Self> {
        let word = |at: usize| u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
        let half = |at: usize| u16::from_le_bytes([bytes[at], bytes[at + 1]]);

        if bytes[0..4] != TABLE_MAGIC
            || half(4) != FORMAT_VERSION
            || half(6) as usize != RECORD_LEN
        {
            return None;
        }

        Some(Self {
            capacity: word(8),
            count: word(12),
            head: word(16),
        })
    }

    /// Bytes the resource must hold for this header's records to be readable
    fn required_len(&self) -> u64 {
        let slots = if self.head == 0 { self.count } else { self.capacity };
        HEADER_LEN as u64 + slots as u64 * RECORD_LEN as u64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TableState {
    Closed,
    Ready(TableHeader),
    Unavailable,
}

/// Append-only ring of [`SensorEvent`] records.
///
/// Indexes are 1-based: `read_at(1)` is the oldest retained record and
/// `read_at(count())` the newest.
pub struct SensorLog<B: BlockStore> {
    store: B,
    config: LogConfig,
    state: TableState,
}

impl<B: BlockStore> SensorLog<B> {
    /// Wrap a store. Nothing is read until [`initialize`](Self::initialize).
    pub fn new(store: B, config: LogConfig) -> Self {
        Self {
            store,
            config,
            state: TableState::Closed,
        }
    }

    /// Open the table in the store, or create one.
    ///
    /// A table whose header does not validate against this log's record
    /// format and capacity is discarded and replaced by an empty one. When the
    /// store cannot be read or written the log becomes unavailable for the rest
    /// of the session: later appends and reads fail with
    /// [`LogError::StorageUnavailable`] without touching the store.
    pub fn initialize(&mut self) -> Result<TableOpen, LogError> {
        info!("Sensor log initialising ({} records)", self.config.capacity);

        match self.open_existing() {
            Ok(Some(header)) => {
                info!(
                    "Opened existing sensor log: {} of {} records",
                    header.count, header.capacity
                );
                self.state = TableState::Ready(header);
                return Ok(TableOpen::OpenedExisting);
            }
            Ok(None) => {}
            Err(e) => {
                error!("Could not open sensor log: {}", e);
                self.state = TableState::Unavailable;
                return Err(LogError::StorageUnavailable);
            }
        }

        info!("Creating sensor log table");
        let header = TableHeader::empty(self.config.capacity);
        if let Err(e) = self.store.write_at(0, &header.to_bytes()) {
            error!("Could not create sensor log table: {}", e);
            self.state = TableState::Unavailable;
            return Err(LogError::StorageUnavailable);
        }

        self.state = TableState::Ready(header);
        Ok(TableOpen::CreatedNew)
    }

    fn open_existing(&mut self) -> Result<Option<TableHeader>, StorageError> {
        let size = self.store.size()?;
        if size == 0 {
            info!("No sensor log table found");
            return Ok(None);
        }
        if (size as usize) < HEADER_LEN {
            warn!("Sensor log shorter than its header ({} bytes), discarding", size);
            return Ok(None);
        }

        let mut raw = [0u8; HEADER_LEN];
        self.store.read_exact_at(0, &mut raw)?;

        let Some(header) = TableHeader::from_bytes(&raw) else {
            warn!("Did not find a sensor log signature, discarding");
            return Ok(None);
        };

        if header.capacity != self.config.capacity {
            warn!(
                "Sensor log capacity {} differs from configured {}, discarding",
                header.capacity, self.config.capacity
            );
            return Ok(None);
        }

        let wrapped_early = header.head != 0 && header.count != header.capacity;
        if header.count > header.capacity || header.head >= header.capacity || wrapped_early {
            warn!("Sensor log header inconsistent ({:?}), discarding", header);
            return Ok(None);
        }

        if (size as u64) < header.required_len() {
            warn!("Sensor log truncated at {} bytes, discarding", size);
            return Ok(None);
        }

        Ok(Some(header))
    }

    /// Append one event, flushing the record and then the header.
    pub fn append(&mut self, event: &SensorEvent) -> Result<(), LogError> {
        let header = self.header()?;
        let mut next = header;

        let slot = if header.count < header.capacity {
            next.count += 1;
            (header.head + header.count) % header.capacity
        } else {
            match self.config.policy {
                OverflowPolicy::Reject => return Err(LogError::TableFull),
                OverflowPolicy::Wrap => {
                    next.head = (header.head + 1) % header.capacity;
                    header.head
                }
            }
        };

        self.store
            .write_at(slot_offset(slot), &event.to_bytes())
            .map_err(io_error)?;
        self.store.write_at(0, &next.to_bytes()).map_err(io_error)?;

        self.state = TableState::Ready(next);
        debug!("Logged event {} into slot {}", event, slot);
        Ok(())
    }

    /// Number of records currently held (never more than the capacity).
    pub fn count(&self) -> u32 {
        match self.state {
            TableState::Ready(header) => header.count,
            TableState::Closed | TableState::Unavailable => 0,
        }
    }

    pub fn capacity(&self) -> u32 {
        self.config.capacity
    }

    /// Whether `initialize` succeeded
    pub fn is_available(&self) -> bool {
        matches!(self.state, TableState::Ready(_))
    }

    /// Read the record at a 1-based index, 1 being the oldest.
    pub fn read_at(&mut self, index: u32) -> Result<SensorEvent, LogError> {
        let header = self.header()?;
        if index == 0 || index > header.count {
            return Err(LogError::OutOfRange {
                index,
                count: header.count,
            });
        }

        let slot = (header.head + index - 1) % header.capacity;
        let mut raw = [0u8; RECORD_LEN];
        self.store
            .read_exact_at(slot_offset(slot), &mut raw)
            .map_err(io_error)?;

        Ok(SensorEvent::from_bytes(&raw))
    }

    /// Lazily walk the table newest-first, yielding events whose timestamp
    /// lies in `min_timestamp..=max_timestamp`.
    ///
    /// Records are visited one at a time until the first match; from there
    /// every `stride`-th record is visited (a stride of 0 counts as 1). The
    /// first non-matching record visited after a match ends the scan, since the
    /// table is written in time order. After a clock reset that assumption
    /// breaks and the scan may end early.
    pub fn range_scan(
        &mut self,
        min_timestamp: u32,
        max_timestamp: u32,
        stride: u32,
    ) -> RangeScan<'_, B> {
        let cursor = self.count();
        RangeScan {
            log: self,
            min_timestamp,
            max_timestamp,
            stride: stride.max(1),
            cursor,
            started: false,
            done: min_timestamp > max_timestamp,
        }
    }

    /// Give the store back, e.g. to inspect it after a run.
    pub fn into_inner(self) -> B {
        self.store
    }

    fn header(&self) -> Result<TableHeader, LogError> {
        match self.state {
            TableState::Ready(header) => Ok(header),
            TableState::Closed | TableState::Unavailable => Err(LogError::StorageUnavailable),
        }
    }
}

const fn slot_offset(slot: u32) -> u32 {
    HEADER_LEN as u32 + slot * RECORD_LEN as u32
}

fn io_error(e: StorageError) -> LogError {
    error!("Sensor log storage error: {}", e);
    LogError::Io
}

/// Newest-first iterator returned by [`SensorLog::range_scan`].
///
/// Single use: once exhausted, start a new scan.
pub struct RangeScan<'a, B: BlockStore> {
    log: &'a mut SensorLog<B>,
    min_timestamp: u32,
    max_timestamp: u32,
    stride: u32,
    /// Next 1-based index to visit, 0 when past the oldest record
    cursor: u32,
    started: bool,
    done: bool,
}

impl<B: BlockStore> RangeScan<'_, B> {
    fn contains(&self, event: &SensorEvent) -> bool {
        (self.min_timestamp..=self.max_timestamp).contains(&event.timestamp)
    }
}

impl<B: BlockStore> Iterator for RangeScan<'_, B> {
    type Item = Result<SensorEvent, LogError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done && self.cursor > 0 {
            let index = self.cursor;

            match self.log.read_at(index) {
                Ok(event) if self.contains(&event) => {
                    self.started = true;
                    self.cursor = index.saturating_sub(self.stride);
                    return Some(Ok(event));
                }
                Ok(_) if self.started => {
                    self.done = true;
                }
                Ok(_) => {
                    self.cursor = index - 1;
                }
                Err(e) => {
                    let step = if self.started { self.stride } else { 1 };
                    self.cursor = index.saturating_sub(step);
                    return Some(Err(e));
                }
            }
        }

        None
    }
}
