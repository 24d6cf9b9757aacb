//! Prometheus metrics for the fleet sync operator
//!
//! Reconcile counters and timings for both controllers, plus per-record
//! reachability and availability gauges.

pub mod prometheus;

pub use prometheus::*;
