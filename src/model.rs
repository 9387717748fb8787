/// Core data types for the disaster sensing service.
///
/// This module defines the shared domain model imported by all other modules.
/// It contains no I/O and no logic beyond formatting; scoring lives in
/// `alert::thresholds`.

use chrono::{DateTime, Utc};
use std::fmt;

// ---------------------------------------------------------------------------
// Disaster tags
// ---------------------------------------------------------------------------

/// Disaster tags produced by the synthetic sensor source.
///
/// Readings carry the tag as a free-form string; these are only the values
/// the generator picks from.
pub const DISASTER_TYPES: &[&str] = &["flood", "landslide", "wildfire"];

// ---------------------------------------------------------------------------
// Reading types
// ---------------------------------------------------------------------------

/// A single sample from a sensor source.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub temperature: f64,  // °C
    pub humidity: f64,     // %, expected 0–100
    pub pressure: f64,     // hPa
    pub disaster_type: Option<String>,
}

impl Reading {
    pub fn new(temperature: f64, humidity: f64, pressure: f64) -> Self {
        Self {
            temperature,
            humidity,
            pressure,
            disaster_type: None,
        }
    }

    pub fn with_disaster_type(mut self, disaster_type: impl Into<String>) -> Self {
        self.disaster_type = Some(disaster_type.into());
        self
    }

    /// The disaster tag, or `"unknown"` when the source supplied none.
    pub fn disaster_label(&self) -> &str {
        self.disaster_type.as_deref().unwrap_or("unknown")
    }
}

/// Severity levels, in ascending order of severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SeverityLabel {
    Safe,
    Warning,
    Critical,
}

impl SeverityLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeverityLabel::Safe => "Safe",
            SeverityLabel::Warning => "Warning",
            SeverityLabel::Critical => "Critical",
        }
    }

    /// Parses the label names written to the CSV log.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "safe" => Some(SeverityLabel::Safe),
            "warning" => Some(SeverityLabel::Warning),
            "critical" => Some(SeverityLabel::Critical),
            _ => None,
        }
    }
}

impl fmt::Display for SeverityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reading together with its score and label.
///
/// This is the unit handed to the dispatcher, the history and the summary.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledReading {
    pub reading: Reading,
    pub score: f64,
    pub label: SeverityLabel,
    pub observed_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can arise when delivering an alert notification.
#[derive(Debug, Clone, PartialEq)]
pub enum NotifyError {
    /// A required environment variable was not set.
    MissingConfig(String),
    /// Non-2xx HTTP response from the notification endpoint.
    HttpError(u16),
    /// The request never produced a response (DNS, connect, timeout).
    Transport(String),
    /// The payload could not be encoded.
    Serialize(String),
}

impl fmt::Display for NotifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifyError::MissingConfig(var) => write!(f, "Missing configuration: {} is not set", var),
            NotifyError::HttpError(code) => write!(f, "HTTP error: {}", code),
            NotifyError::Transport(msg) => write!(f, "Transport error: {}", msg),
            NotifyError::Serialize(msg) => write!(f, "Serialize error: {}", msg),
        }
    }
}

impl std::error::Error for NotifyError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_labels_are_ordered() {
        assert!(SeverityLabel::Safe < SeverityLabel::Warning);
        assert!(SeverityLabel::Warning < SeverityLabel::Critical);
    }

    #[test]
    fn test_label_parse_accepts_logged_names() {
        for label in [SeverityLabel::Safe, SeverityLabel::Warning, SeverityLabel::Critical] {
            assert_eq!(SeverityLabel::parse(label.as_str()), Some(label));
        }
        assert_eq!(SeverityLabel::parse(" critical "), Some(SeverityLabel::Critical));
        assert_eq!(SeverityLabel::parse("Severe"), None);
    }

    #[test]
    fn test_missing_disaster_type_reports_unknown() {
        let reading = Reading::new(25.0, 70.0, 1015.0);
        assert_eq!(reading.disaster_label(), "unknown");
        assert_eq!(reading.with_disaster_type("flood").disaster_label(), "flood");
    }

    #[test]
    fn test_notify_error_display() {
        assert_eq!(NotifyError::HttpError(500).to_string(), "HTTP error: 500");
        assert_eq!(
            NotifyError::MissingConfig("EMAILJS_USER_ID".into()).to_string(),
            "Missing configuration: EMAILJS_USER_ID is not set"
        );
    }
}
