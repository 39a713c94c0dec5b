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

//! # Retrying Export Runner
//!
//! Runs one export job inside a bounded retry loop.
//!
//! Each **attempt** is a full pass of: ensure the output folder, resolve the
//! driver, connect, run the query, serialize the cursor, clean up. Every
//! handle an attempt opens lives in that attempt's stack frame, so nothing
//! leaks from a failed attempt into the next one; the next attempt simply
//! re-runs the query from scratch and rewrites the files from chunk 1.
//!
//! ```text
//! Idle -> Running -> Success
//!            |
//!            +-> RetryWait -> Running      (failures <= retry_count)
//!            +-> Aborted                   (failures >  retry_count)
//! ```

use crate::application::row_serializer::RowSerializer;
use crate::domain::errors::{ExportError, Result};
use crate::domain::export_models::{ExportAttemptResult, ExportJobConfig, JobResult};
use crate::infrastructure::driver_registry::DriverRegistry;
use crate::infrastructure::local_storage::output_files::ensure_directory;
use crate::ports::database_port::RowCursor;
use log::{error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Granularity at which the retry wait looks at the shutdown flag.
const WAIT_SLICE: Duration = Duration::from_millis(200);

/// Orchestrates connection lifecycle, serialization and retries for one job.
pub struct RetryingExportRunner {
    config: ExportJobConfig,
    drivers: Arc<DriverRegistry>,
    serializer: RowSerializer,
    shutdown: Arc<AtomicBool>,
}

impl RetryingExportRunner {
    /// Creates a runner for `config`, resolving drivers from `drivers`.
    pub fn new(config: ExportJobConfig, drivers: Arc<DriverRegistry>) -> Self {
        let serializer = RowSerializer::new(config.separator);
        Self {
            config,
            drivers,
            serializer,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag that, once set, stops the job before its next attempt.
    ///
    /// An attempt that is already running is never interrupted.
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    pub fn config(&self) -> &ExportJobConfig {
        &self.config
    }

    /// Runs the job to completion, propagating the fatal error if it aborts.
    pub fn run(&self) -> Result<JobResult> {
        let start = Instant::now();
        let mut history = Vec::new();
        self.attempt_loop(&mut history)?;
        Ok(JobResult::success(
            self.config.job_id.clone(),
            history,
            start.elapsed().as_secs_f64(),
        ))
    }

    /// Runs the job and folds any fatal error into the returned `JobResult`.
    pub fn execute(&self) -> JobResult {
        let start = Instant::now();
        let mut history = Vec::new();
        match self.attempt_loop(&mut history) {
            Ok(_) => JobResult::success(
                self.config.job_id.clone(),
                history,
                start.elapsed().as_secs_f64(),
            ),
            Err(e) => {
                error!("{}", e);
                JobResult::failure(
                    self.config.job_id.clone(),
                    history,
                    start.elapsed().as_secs_f64(),
                    e.to_string(),
                )
            }
        }
    }

    fn attempt_loop(&self, history: &mut Vec<ExportAttemptResult>) -> Result<u64> {
        let job_id = &self.config.job_id;
        let max_attempts = self.config.retry_count.saturating_add(1);
        let mut failures: u32 = 0;
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            if self.shutdown.load(Ordering::SeqCst) {
                warn!("Job {} stopping, shutdown requested", job_id);
                return Err(ExportError::Cancelled {
                    job_id: job_id.clone(),
                    next_attempt: attempt,
                });
            }

            info!(
                "Job {}: attempt {}/{} exporting to {}",
                job_id,
                attempt,
                max_attempts,
                self.config.destination().display()
            );

            match self.run_attempt() {
                Ok(rows) => {
                    history.push(ExportAttemptResult::success(rows, failures));
                    info!(
                        "Job {} finished: {} rows exported in {} attempt(s)",
                        job_id, rows, attempt
                    );
                    return Ok(rows);
                }
                Err(e) => {
                    failures += 1;
                    history.push(ExportAttemptResult::failure(failures));
                    error!(
                        "Task {} failed {} times, most recent failure: {}",
                        job_id, failures, e
                    );
                    last_error = e.to_string();

                    if failures <= self.config.retry_count {
                        info!(
                            "Try again after {} seconds...",
                            self.config.retry_delay.as_secs_f64()
                        );
                        self.wait_before_retry();
                    }
                }
            }
        }

        Err(ExportError::RetryBudgetExhausted {
            job_id: job_id.clone(),
            attempts: max_attempts,
            last_error,
        })
    }

    /// One attempt. All handles opened here are closed before it returns.
    fn run_attempt(&self) -> Result<u64> {
        ensure_directory(&self.config.dest_dir)?;

        let driver = self.drivers.resolve(&self.config.connection.driver)?;
        let mut session = driver.connect(&self.config.connection)?;

        let destination = self.config.destination();
        let limit = self.config.row_limit;
        let serializer = self.serializer;
        let outcome = session.query_with(&self.config.sql, &mut |cursor: &mut dyn RowCursor| {
            serializer.export(cursor, &destination, limit)
        });

        if let Err(e) = session.close() {
            warn!(
                "Job {}: failed to close {} connection: {}",
                self.config.job_id,
                driver.name(),
                e
            );
        }
        outcome
    }

    /// Blocks for the retry delay, returning early only if shutdown is requested.
    fn wait_before_retry(&self) {
        let deadline = Instant::now() + self.config.retry_delay;
        loop {
            let now = Instant::now();
            if now >= deadline || self.shutdown.load(Ordering::SeqCst) {
                break;
            }
            thread::sleep(WAIT_SLICE.min(deadline - now));
        }
    }
}
