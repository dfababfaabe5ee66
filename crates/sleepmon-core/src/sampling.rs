use log::{debug, error, warn};
use thiserror_no_std::Error;

use crate::sensors::{SensorError, SensorSource};
use crate::storage::{BlockStore, LogError, SensorEvent, SensorLog};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingError {
    #[error("sensor error: {0}")]
    Sensor(SensorError),
    #[error("sensor log error: {0}")]
    Log(LogError),
}

/// Reads one event per call and appends it to the log.
///
/// An event the log refuses is gone; it is counted in
/// [`lost_events`](Self::lost_events) and reported, never retried.
pub struct Sampler<S: SensorSource> {
    source: S,
    lost: u32,
}

impl<S: SensorSource> Sampler<S> {
    pub fn new(source: S) -> Self {
        Self { source, lost: 0 }
    }

    pub fn record<B: BlockStore>(&mut self, log: &mut SensorLog<B>) -> Result<SensorEvent, SamplingError> {
        let event = self.source.read().map_err(|e| {
            warn!("Skipping sample: {}", e);
            SamplingError::Sensor(e)
        })?;

        debug!("Sampled {}", event);

        if let Err(e) = log.append(&event) {
            self.lost += 1;
            error!("Event {} lost ({} so far): {}", event, self.lost, e);
            return Err(SamplingError::Log(e));
        }

        Ok(event)
    }

    /// Events read but not stored since start-up
    pub fn lost_events(&self) -> u32 {
        self.lost
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }
}
