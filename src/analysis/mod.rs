/// Data organization utilities for the disaster sensing service.
///
/// This module provides the aggregate views a dashboard shows over the
/// running history. Charting itself happens outside this crate.
///
/// Submodules:
/// - `summary` — filtered totals, per-type and per-label counts.

pub mod summary;
