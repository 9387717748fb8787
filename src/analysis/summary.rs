/// Summary cards over the reading history.
///
/// A filter selects readings by disaster type and an inclusive score range;
/// the summary then reports the total, counts per disaster type and per
/// severity label, and the most recent matching reading.

use std::collections::BTreeMap;

use crate::history::ReadingHistory;
use crate::model::{LabeledReading, SeverityLabel};

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryFilter {
    /// `None` selects every disaster type.
    pub disaster_type: Option<String>,
    pub min_score: f64,
    pub max_score: f64,
}

impl Default for SummaryFilter {
    fn default() -> Self {
        Self {
            disaster_type: None,
            min_score: f64::NEG_INFINITY,
            max_score: f64::INFINITY,
        }
    }
}

impl SummaryFilter {
    pub fn matches(&self, labeled: &LabeledReading) -> bool {
        let type_ok = match &self.disaster_type {
            Some(wanted) => labeled
                .reading
                .disaster_type
                .as_deref()
                .is_some_and(|t| t.eq_ignore_ascii_case(wanted)),
            None => true,
        };
        type_ok && labeled.score >= self.min_score && labeled.score <= self.max_score
    }
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Summary {
    pub total: usize,
    pub counts_by_type: BTreeMap<String, usize>,
    pub counts_by_label: BTreeMap<SeverityLabel, usize>,
    pub latest: Option<LabeledReading>,
}

impl Summary {
    pub fn count_for_type(&self, disaster_type: &str) -> usize {
        self.counts_by_type.get(disaster_type).copied().unwrap_or(0)
    }

    pub fn count_for_label(&self, label: SeverityLabel) -> usize {
        self.counts_by_label.get(&label).copied().unwrap_or(0)
    }
}

/// Summarises the readings in `history` that pass `filter`.
pub fn summarize(history: &ReadingHistory, filter: &SummaryFilter) -> Summary {
    let mut summary = Summary::default();

    for labeled in history.iter().filter(|r| filter.matches(r)) {
        summary.total += 1;
        *summary
            .counts_by_type
            .entry(labeled.reading.disaster_label().to_string())
            .or_insert(0) += 1;
        *summary.counts_by_label.entry(labeled.label).or_insert(0) += 1;
        summary.latest = Some(labeled.clone());
    }

    summary
}
