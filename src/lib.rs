//! # Query Exporter
//!
//! Exports the result of a database query into one or more delimited text
//! files, splitting output into fixed-size chunks when configured, and
//! retrying the whole operation on failure a bounded number of times.
//!
//! This crate follows the **Hexagonal Architecture** (Ports and Adapters):
//! - `domain`: errors and job models.
//! - `ports`: the database contract the core depends on.
//! - `application`: the row serializer and the retrying runner.
//! - `infrastructure`: Oracle and SQLite drivers, local output files.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod ports;

pub use application::export_runner::RetryingExportRunner;
pub use application::row_serializer::RowSerializer;
pub use domain::errors::{ExportError, Result};
pub use domain::export_models::{ExportJobConfig, JobResult, RowLimit};
pub use infrastructure::driver_registry::DriverRegistry;
