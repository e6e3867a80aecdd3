//! Webpage Availability Monitor Library
//!
//! This library provides components for probing a single HTTP endpoint on a
//! fixed interval, tracking lifetime availability, retaining recent failures
//! in a bounded log with a durable sink, and exposing the results over HTTP.

pub mod config;
pub mod probe;
pub mod availability;
pub mod failure_log;
pub mod monitor;
pub mod server;
pub mod errors;

pub use config::Config;
pub use probe::{HttpProber, ProbeResult};
pub use availability::{AvailabilitySnapshot, AvailabilityTracker};
pub use failure_log::{FailureLogStore, FailureRecord, MAX_RESIDENT_CAP};
pub use monitor::{Monitor, MonitorState};
pub use server::build_server;
pub use errors::{MonitorError, Result};
