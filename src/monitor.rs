/// Tick-driven monitoring loop.
///
/// Each tick pulls one reading from the source, scores and labels it,
/// appends it to the history (and the CSV log, if configured) and hands it
/// to the alert dispatcher. The tick never waits on alert delivery.
///
/// The monitor is the single writer of the history; everything else reads
/// it through `history()`.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::Utc;

use crate::alert::dispatch::{AlertDispatcher, Dispatch};
use crate::alert::thresholds::{self, Predictor};
use crate::history::ReadingHistory;
use crate::ingest::csv;
use crate::ingest::ReadingSource;
use crate::logging::{self, Component};
use crate::model::{LabeledReading, Reading, SeverityLabel};

/// Longest single sleep between stop-flag checks.
const STOP_POLL: Duration = Duration::from_millis(500);

/// What one tick did.
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    pub labeled: LabeledReading,
    pub dispatch: Dispatch,
}

pub struct Monitor {
    source: Box<dyn ReadingSource>,
    predictor: Box<dyn Predictor>,
    dispatcher: AlertDispatcher,
    history: ReadingHistory,
    log_csv: Option<PathBuf>,
    stop: Arc<AtomicBool>,
    ticks: u64,
}

impl Monitor {
    pub fn new(
        source: Box<dyn ReadingSource>,
        predictor: Box<dyn Predictor>,
        dispatcher: AlertDispatcher,
        history_capacity: usize,
    ) -> Self {
        Self {
            source,
            predictor,
            dispatcher,
            history: ReadingHistory::with_capacity(history_capacity),
            log_csv: None,
            stop: Arc::new(AtomicBool::new(false)),
            ticks: 0,
        }
    }

    /// Appends every labeled reading to `path`.
    pub fn with_log_csv(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_csv = Some(path.into());
        self
    }

    fn label(&self, reading: Reading) -> LabeledReading {
        thresholds::classify_with(self.predictor.as_ref(), reading, Utc::now())
    }

    /// Loads past readings into the history without alerting on them.
    /// Returns how many were added.
    pub fn seed(&mut self, readings: Vec<Reading>) -> usize {
        let count = readings.len();
        for reading in readings {
            let labeled = self.label(reading);
            self.history.push(labeled);
        }
        count
    }

    /// Runs one tick. Returns `None` once the source is exhausted.
    pub fn tick(&mut self) -> Option<TickOutcome> {
        let reading = self.source.next_reading()?;
        self.ticks += 1;

        let labeled = self.label(reading);
        let subject = labeled.reading.disaster_label().to_string();

        let message = format!(
            "T={}°C H={}% P={}hPa → score {:.1} ({})",
            labeled.reading.temperature,
            labeled.reading.humidity,
            labeled.reading.pressure,
            labeled.score,
            labeled.label
        );
        if labeled.label == SeverityLabel::Safe {
            logging::debug(Component::Scorer, Some(&subject), &message);
        } else {
            logging::warn(Component::Scorer, Some(&subject), &message);
        }

        if let Some(path) = &self.log_csv {
            if let Err(e) = csv::append_reading(path, &labeled) {
                logging::warn(
                    Component::Sensor,
                    Some(&path.display().to_string()),
                    &format!("could not append reading: {}", e),
                );
            }
        }

        self.history.push(labeled.clone());
        let dispatch = self.dispatcher.maybe_notify(&labeled);

        Some(TickOutcome { labeled, dispatch })
    }

    /// Ticks every `interval` until the source runs dry, `max_ticks` is
    /// reached, or the stop flag is raised. Returns the ticks run.
    pub fn run(&mut self, interval: Duration, max_ticks: Option<u64>) -> u64 {
        let mut ran = 0u64;

        while !self.stop.load(Ordering::Relaxed) {
            if max_ticks.is_some_and(|max| ran >= max) {
                break;
            }
            if self.tick().is_none() {
                logging::info(Component::Sensor, None, "reading source exhausted");
                break;
            }
            ran += 1;

            if max_ticks.is_some_and(|max| ran >= max) {
                break;
            }
            self.sleep_unless_stopped(interval);
        }

        ran
    }

    fn sleep_unless_stopped(&self, interval: Duration) {
        let mut remaining = interval;
        while !remaining.is_zero() && !self.stop.load(Ordering::Relaxed) {
            let step = remaining.min(STOP_POLL);
            thread::sleep(step);
            remaining -= step;
        }
    }

    /// Flag that ends `run` at the next check when set.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn history(&self) -> &ReadingHistory {
        &self.history
    }

    pub fn dispatcher(&self) -> &AlertDispatcher {
        &self.dispatcher
    }

    /// Ticks run over the monitor's lifetime.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::thresholds::ThresholdScorer;
    use crate::ingest::ReplaySource;
    use crate::model::NotifyError;
    use crate::notify::Notifier;
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;

    struct CountingNotifier {
        calls: AtomicUsize,
    }

    impl Notifier for CountingNotifier {
        fn notify(&self, _alert: &LabeledReading) -> Result<(), NotifyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(NotifyError::HttpError(500))
        }
    }

    /// Labels everything Critical, whatever the score says.
    struct AlwaysCritical;

    impl Predictor for AlwaysCritical {
        fn predict(&self, _reading: &Reading) -> SeverityLabel {
            SeverityLabel::Critical
        }
    }

    fn monitor_over(readings: Vec<Reading>, predictor: Box<dyn Predictor>) -> Monitor {
        let notifier = Arc::new(CountingNotifier { calls: AtomicUsize::new(0) });
        Monitor::new(
            Box::new(ReplaySource::new(readings)),
            predictor,
            AlertDispatcher::new(notifier),
            10,
        )
    }

    #[test]
    fn test_tick_labels_records_and_dispatches() {
        let mut monitor = monitor_over(
            vec![
                Reading::new(25.0, 70.0, 1015.0),
                Reading::new(30.0, 60.0, 1010.0),
            ],
            Box::new(ThresholdScorer::default()),
        );

        let first = monitor.tick().expect("first reading");
        assert_eq!(first.labeled.label, SeverityLabel::Safe);
        assert_eq!(first.dispatch, Dispatch::Skipped);

        let second = monitor.tick().expect("second reading");
        assert_eq!(second.labeled.label, SeverityLabel::Warning);
        assert_eq!(second.dispatch, Dispatch::Submitted);

        assert!(monitor.tick().is_none());
        assert_eq!(monitor.history().len(), 2);
        assert_eq!(monitor.ticks(), 2);
        assert_eq!(monitor.dispatcher().submitted(), 1);
    }

    #[test]
    fn test_seed_fills_history_without_alerting() {
        let mut monitor = monitor_over(Vec::new(), Box::new(ThresholdScorer::default()));
        let added = monitor.seed(vec![
            Reading::new(45.0, 35.0, 960.0),
            Reading::new(30.0, 60.0, 1010.0),
        ]);
        assert_eq!(added, 2);
        assert_eq!(monitor.history().len(), 2);
        assert_eq!(monitor.dispatcher().submitted(), 0);
        assert_eq!(monitor.ticks(), 0);
    }

    #[test]
    fn test_predictor_decides_label_score_still_recorded() {
        let mut monitor = monitor_over(vec![Reading::new(25.0, 70.0, 1015.0)], Box::new(AlwaysCritical));
        let outcome = monitor.tick().expect("one reading");
        assert_eq!(outcome.labeled.label, SeverityLabel::Critical);
        assert_eq!(outcome.labeled.score, 45.0);
        assert_eq!(outcome.dispatch, Dispatch::Submitted);
    }

    #[test]
    fn test_run_respects_max_ticks_and_history_capacity() {
        let readings: Vec<Reading> = (0..25).map(|i| Reading::new(20.0 + i as f64, 70.0, 1015.0)).collect();
        let mut monitor = monitor_over(readings, Box::new(ThresholdScorer::default()));

        let ran = monitor.run(Duration::ZERO, Some(15));
        assert_eq!(ran, 15);
        assert_eq!(monitor.history().len(), 10);
        assert_eq!(monitor.history().latest().map(|r| r.reading.temperature), Some(34.0));
    }

    #[test]
    fn test_run_stops_when_source_is_exhausted() {
        let mut monitor = monitor_over(
            vec![Reading::new(25.0, 70.0, 1015.0); 3],
            Box::new(ThresholdScorer::default()),
        );
        assert_eq!(monitor.run(Duration::ZERO, None), 3);
    }

    #[test]
    fn test_raised_stop_flag_ends_run_promptly() {
        let mut monitor = monitor_over(
            vec![Reading::new(25.0, 70.0, 1015.0); 3],
            Box::new(ThresholdScorer::default()),
        );
        let stop = monitor.stop_handle();
        let stopper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            stop.store(true, Ordering::Relaxed);
        });

        let started = Instant::now();
        let ran = monitor.run(Duration::from_secs(60), None);
        stopper.join().expect("stopper thread");

        assert_eq!(ran, 1);
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
