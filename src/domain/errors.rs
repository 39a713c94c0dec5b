// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Core error definitions for the query exporter.
//!
//! This module provides a centralized `ExportError` enum and a `Result` type
//! used throughout the crate. The retry loop counts every error an attempt
//! returns; configuration, budget and cancellation errors end the job.

use thiserror::Error;

/// Error types encountered during the export process.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection failed: {0}")]
    ConnectionError(String),

    #[error("Query failed: {0}")]
    QueryError(String),

    #[error("Export to file failed: {0}")]
    SerializationError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Job {job_id} aborted after {attempts} attempts, retry budget exhausted: {last_error}")]
    RetryBudgetExhausted {
        job_id: String,
        attempts: u32,
        last_error: String,
    },

    #[error("Job {job_id} cancelled before attempt {next_attempt}")]
    Cancelled { job_id: String, next_attempt: u32 },
}

/// A specialized Result type for the query exporter.
pub type Result<T> = std::result::Result<T, ExportError>;
