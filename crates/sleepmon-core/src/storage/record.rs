//! Binary record format of one sensor reading.
//!
//! Binary format (little-endian, 8 bytes, no padding):
//! - timestamp: 4 bytes (u32, seconds since epoch)
//! - temperature: 1 byte (i8, °F)
//! - humidity: 1 byte (i8, %)
//! - sound_level: 1 byte (i8, dB)
//! - light_level: 1 byte (raw byte, 0-255 scale)
//!
//! The width must never change between firmware versions, otherwise tables
//! written by an older build become unreadable.

use core::fmt::Display;

/// Size in bytes of one encoded [`SensorEvent`]
pub const RECORD_LEN: usize = 8;

/// One reading of all four channels, as stored in the sensor log
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SensorEvent {
    /// Seconds since epoch, from the real-time clock
    pub timestamp: u32,
    pub temperature: i8,
    pub humidity: i8,
    pub sound_level: i8,
    /// Light level byte. Values above 127 wrap negative; consumers that want
    /// the 0-255 scale reinterpret it as `u8`.
    pub light_level: i8,
}

impl SensorEvent {
    pub const fn new(
        timestamp: u32,
        temperature: i8,
        humidity: i8,
        sound_level: i8,
        light_level: i8,
    ) -> Self {
        Self {
            timestamp,
            temperature,
            humidity,
            sound_level,
            light_level,
        }
    }

    /// Returns the encoded size of this record in bytes (8).
    pub const fn size() -> usize {
        RECORD_LEN
    }

    /// Encodes the event into its on-disk layout.
    pub fn to_bytes(&self) -> [u8; RECORD_LEN] {
        let mut bytes = [0u8; RECORD_LEN];

        bytes[0..4].copy_from_slice(&self.timestamp.to_le_bytes());
        bytes[4] = self.temperature as u8;
        bytes[5] = self.humidity as u8;
        bytes[6] = self.sound_level as u8;
        bytes[7] = self.light_level as u8;

        bytes
    }

    /// Decodes an event from its on-disk layout. Every 8-byte block is a
    /// structurally valid event.
    pub fn from_bytes(bytes: &[u8; RECORD_LEN]) -> Self {
        let mut timestamp_bytes = [0u8; 4];
        timestamp_bytes.copy_from_slice(&bytes[0..4]);

        Self {
            timestamp: u32::from_le_bytes(timestamp_bytes),
            temperature: bytes[4] as i8,
            humidity: bytes[5] as i8,
            sound_level: bytes[6] as i8,
            light_level: bytes[7] as i8,
        }
    }
}

impl Display for SensorEvent {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{}, {}, {}, {}, {}",
            self.timestamp, self.temperature, self.humidity, self.sound_level, self.light_level
        )
    }
}
