use std::collections::VecDeque;

use crate::model::LabeledReading;

/// Running history of labeled readings, oldest first.
///
/// Owned by the monitor, which is the only writer. Readers borrow it.
#[derive(Debug)]
pub struct ReadingHistory {
    readings: VecDeque<LabeledReading>,
    capacity: usize,
}

impl ReadingHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            readings: VecDeque::with_capacity(capacity.min(4096)),
            capacity,
        }
    }

    /// Appends a reading, dropping the oldest when full.
    pub fn push(&mut self, reading: LabeledReading) {
        if self.readings.len() == self.capacity {
            self.readings.pop_front();
        }
        self.readings.push_back(reading);
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &LabeledReading> {
        self.readings.iter()
    }

    pub fn latest(&self) -> Option<&LabeledReading> {
        self.readings.back()
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
