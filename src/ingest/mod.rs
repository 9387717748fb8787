/// Reading sources for the disaster sensing service.
///
/// Submodules:
/// - `synthetic`: random readings in the ranges of the demo sensors.
/// - `csv`: loading, appending and writing reading files.

pub mod csv;
pub mod synthetic;

use std::collections::VecDeque;

use crate::model::Reading;

/// Produces one reading per call. `None` means the source is exhausted.
pub trait ReadingSource {
    fn next_reading(&mut self) -> Option<Reading>;
}

/// Replays a fixed list of readings in order, then stops.
///
/// Drives the monitor from a fixed set of readings instead of the generator.
#[derive(Debug, Clone, Default)]
pub struct ReplaySource {
    pending: VecDeque<Reading>,
}

impl ReplaySource {
    pub fn new(readings: impl IntoIterator<Item = Reading>) -> Self {
        Self {
            pending: readings.into_iter().collect(),
        }
    }
}

impl ReadingSource for ReplaySource {
    fn next_reading(&mut self) -> Option<Reading> {
        self.pending.pop_front()
    }
}
