//! Severity scoring and alert dispatch.
//!
//! Submodules:
//! - `thresholds` — reading → score → Safe / Warning / Critical.
//! - `dispatch` — fire-and-forget notification for non-Safe readings.

pub mod dispatch;
pub mod thresholds;
