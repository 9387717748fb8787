//! Disaster sensing service.
//!
//! Scores temperature / humidity / pressure readings into Safe, Warning or
//! Critical, keeps a bounded history of them, and fires a best-effort email
//! alert for every reading that is not Safe.

pub mod alert;
pub mod analysis;
pub mod config;
pub mod history;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod monitor;
pub mod notify;
