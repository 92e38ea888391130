//! Command implementations
//!
//! Each module corresponds to a CLI entry point.

pub mod export;

pub use export::{export_until, run as export_run, Destination, ExportOptions, ExportRequest};
