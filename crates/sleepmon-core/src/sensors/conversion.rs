/// Top of the 10-bit ADC range; a reading at or above it is a glitch
const ADC_MAX: u16 = 1023;

/// Supply voltage seen by the photocell divider
const SUPPLY_VOLTS: f32 = 4.98;

/// Loudest level the microphone maps to, in dB
const MAX_SOUND_DB: u32 = 120;

/// The log stores whole degrees Fahrenheit. Out-of-range values saturate.
pub fn celsius_to_fahrenheit(celsius: i16) -> i8 {
    // 1.8 * c + 32 in tenths, truncated toward zero
    let fahrenheit = (celsius as i32 * 18 + 320) / 10;
    fahrenheit.clamp(i8::MIN as i32, i8::MAX as i32) as i8
}

/// Humidity outside 0..100 is a DHT11 read error; keep the previous value.
pub fn accept_humidity(reading: i16, previous: i8) -> i8 {
    if (0..100).contains(&reading) {
        reading as i8
    } else {
        previous
    }
}

/// Photocell ADC count to a 0-255 light level, stored as its raw byte.
///
/// A reading of 0 means the divider is disconnected and yields `None`.
pub fn light_level_from_adc(adc: u16) -> Option<i8> {
    if adc == 0 {
        return None;
    }

    let volts = adc as f32 * SUPPLY_VOLTS / ADC_MAX as f32;
    Some((volts / 5.0 * 255.0) as u8 as i8)
}

/// Peak-to-peak microphone amplitude over one sampling window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoundLevelTracker {
    min: u16,
    max: u16,
}

impl Default for SoundLevelTracker {
    fn default() -> Self {
        Self {
            min: ADC_MAX,
            max: 0,
        }
    }
}

impl SoundLevelTracker {
    pub fn record(&mut self, adc: u16) {
        if adc >= ADC_MAX {
            return;
        }
        self.max = self.max.max(adc);
        self.min = self.min.min(adc);
    }

    /// Level in dB, 0 when nothing was recorded
    pub fn level(&self) -> i8 {
        if self.max < self.min {
            return 0;
        }
        ((self.max - self.min) as u32 * MAX_SOUND_DB / ADC_MAX as u32) as i8
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
