//! Batched export of a timestamp range from the [`SensorLog`].
//!
//! Matching records are gathered column-wise into [`ExportBatch`]es of up to
//! [`EXPORT_BATCH_LEN`] and handed to an [`ExportSink`] as each batch fills,
//! so memory use stays bounded no matter how large the range is.

use core::fmt::{self, Debug};

use alloc::vec::Vec;
use heapless::Vec as BoundedVec;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::{BlockStore, SensorEvent, SensorLog};

/// Records per batch handed to an [`ExportSink`]
pub const EXPORT_BATCH_LEN: usize = 50;

/// Up to 50 events as five parallel columns
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportBatch {
    pub temperature: BoundedVec<i8, EXPORT_BATCH_LEN>,
    pub humidity: BoundedVec<i8, EXPORT_BATCH_LEN>,
    pub sound_level: BoundedVec<i8, EXPORT_BATCH_LEN>,
    pub light_level: BoundedVec<i8, EXPORT_BATCH_LEN>,
    pub timestamp: BoundedVec<u32, EXPORT_BATCH_LEN>,
}

impl ExportBatch {
    pub fn len(&self) -> usize {
        self.timestamp.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamp.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.timestamp.is_full()
    }

    /// Add one event, handing it back when the batch is already full.
    pub fn push(&mut self, event: &SensorEvent) -> Result<(), SensorEvent> {
        if self.is_full() {
            return Err(*event);
        }

        // All five columns share one length, so none of these can fail now.
        let _ = self.temperature.push(event.temperature);
        let _ = self.humidity.push(event.humidity);
        let _ = self.sound_level.push(event.sound_level);
        let _ = self.light_level.push(event.light_level);
        let _ = self.timestamp.push(event.timestamp);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.temperature.clear();
        self.humidity.clear();
        self.sound_level.clear();
        self.light_level.clear();
        self.timestamp.clear();
    }

    /// Compact binary frame for transports that do not want the query string
    pub fn to_postcard(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    pub fn from_postcard(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }
}

/// Consumer of export batches (an HTTP response body, a serial link, ...)
pub trait ExportSink {
    type Error: Debug;

    fn write_batch(&mut self, batch: &ExportBatch) -> Result<(), Self::Error>;
}

/// Writes batches in the query-string form the companion app parses:
/// `&t=72,71,&h=40,41,&s=30,31,&l=99,98,&ts=1700000060,1700000000,`
pub struct QueryStringSink<W: fmt::Write> {
    out: W,
}

impl<W: fmt::Write> QueryStringSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn column<T: fmt::Display>(&mut self, key: &str, values: impl IntoIterator<Item = T>) -> fmt::Result {
        write!(self.out, "&{}=", key)?;
        for value in values {
            write!(self.out, "{},", value)?;
        }
        Ok(())
    }
}

impl<W: fmt::Write> ExportSink for QueryStringSink<W> {
    type Error = fmt::Error;

    fn write_batch(&mut self, batch: &ExportBatch) -> Result<(), Self::Error> {
        self.column("t", batch.temperature.iter())?;
        self.column("h", batch.humidity.iter())?;
        self.column("s", batch.sound_level.iter())?;
        // Light goes out on its 0-255 scale
        self.column("l", batch.light_level.iter().map(|&l| l as u8))?;
        self.column("ts", batch.timestamp.iter())
    }
}

/// What one [`export_range`] call produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSummary {
    /// Events written to the sink
    pub records: usize,
    /// Batches written to the sink, at least one
    pub batches: usize,
    /// Records that could not be read and were left out
    pub skipped: usize,
}

/// Stream every event [`SensorLog::range_scan`] yields into `sink`.
///
/// A batch goes out whenever 50 events have been gathered and once more for
/// the remainder. When nothing matched, one empty batch still goes out so the
/// consumer always receives a reply. Records that fail to read are logged and
/// left out; only sink errors abort the export.
pub fn export_range<B, S>(
    log: &mut SensorLog<B>,
    min_timestamp: u32,
    max_timestamp: u32,
    stride: u32,
    sink: &mut S,
) -> Result<ExportSummary, S::Error>
where
    B: BlockStore,
    S: ExportSink,
{
    let mut summary = ExportSummary::default();
    let mut batch = ExportBatch::default();

    for item in log.range_scan(min_timestamp, max_timestamp, stride) {
        let event = match item {
            Ok(event) => event,
            Err(e) => {
                warn!("Skipping unreadable record during export: {}", e);
                summary.skipped += 1;
                continue;
            }
        };

        // Full batches are flushed below, so there is always room here.
        if batch.push(&event).is_ok() {
            summary.records += 1;
        }

        if batch.is_full() {
            flush(sink, &mut batch, &mut summary)?;
        }
    }

    if !batch.is_empty() || summary.batches == 0 {
        flush(sink, &mut batch, &mut summary)?;
    }

    debug!(
        "Exported {} records in {} batches ({} skipped)",
        summary.records, summary.batches, summary.skipped
    );
    Ok(summary)
}

fn flush<S: ExportSink>(
    sink: &mut S,
    batch: &mut ExportBatch,
    summary: &mut ExportSummary,
) -> Result<(), S::Error> {
    sink.write_batch(batch).map_err(|e| {
        warn!("Export sink rejected batch: {:?}", e);
        e
    })?;
    summary.batches += 1;
    batch.clear();
    Ok(())
}
