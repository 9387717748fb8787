/// Outbound alert notifications.
///
/// Submodules:
/// - `emailjs` — templated-email delivery over HTTP.

pub mod emailjs;

use crate::model::{LabeledReading, NotifyError};

/// A sink that can deliver one alert for one labeled reading.
///
/// Implementations block for the duration of the delivery; the dispatcher
/// is responsible for keeping that off the reading path.
pub trait Notifier: Send + Sync {
    fn notify(&self, alert: &LabeledReading) -> Result<(), NotifyError>;
}
