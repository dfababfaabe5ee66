//! Sensor readout and conversion into [`SensorEvent`]s.
//!
//! The board carries a DHT11 (temperature and humidity), an analog microphone
//! and a photocell. Drivers live with the platform; this module turns their
//! raw values into the units the log stores.

pub mod conversion;

pub use conversion::{SoundLevelTracker, celsius_to_fahrenheit, light_level_from_adc};

use thiserror_no_std::Error;

use crate::storage::SensorEvent;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    #[error("{sensor} read failed")]
    ReadFailed { sensor: &'static str },
}

/// Anything that can produce one complete reading on demand
pub trait SensorSource {
    fn read(&mut self) -> Result<SensorEvent, SensorError>;
}

/// Raw values from one pass over the slow sensors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawReading {
    pub timestamp: u32,
    pub celsius: i16,
    /// Relative humidity as reported; 100 and above are read errors
    pub humidity: i16,
    /// Photocell ADC count, 10-bit
    pub light_adc: u16,
}

/// Builds events from raw readings, carrying over the last good humidity and
/// light values when a reading is rejected.
#[derive(Debug, Default)]
pub struct EventBuilder {
    last: SensorEvent,
    sound: SoundLevelTracker,
}

impl EventBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one microphone sample taken between readings.
    pub fn sample_microphone(&mut self, adc: u16) {
        self.sound.record(adc);
    }

    /// Complete an event and start a new sound window.
    pub fn finish(&mut self, raw: RawReading) -> SensorEvent {
        let mut event = self.last;

        event.timestamp = raw.timestamp;
        event.temperature = celsius_to_fahrenheit(raw.celsius);
        event.humidity = conversion::accept_humidity(raw.humidity, self.last.humidity);
        event.sound_level = self.sound.level();
        if let Some(light) = light_level_from_adc(raw.light_adc) {
            event.light_level = light;
        }

        self.sound.reset();
        self.last = event;
        event
    }
}
