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

//! # Database Port
//!
//! This Port defines what the exporter needs from a database: open a
//! connection, run one query, and walk its result forward exactly once.
//! It doesn't care IF the database is Oracle, SQLite, or a Mock for testing.
//!
//! The cursor is never handed out by value. A session *lends* it to a
//! consumer for the duration of one call, so the cursor and the statement
//! behind it are always closed before `query_with` returns, on every path.

use crate::domain::errors::Result;
use crate::domain::export_models::ConnectionDescriptor;

/// A forward-only, read-once view over the rows of one query result.
pub trait RowCursor {
    /// Column names in select order. Available before the first row is read.
    fn column_names(&self) -> &[String];

    /// Advances to the next row and returns its values as text.
    ///
    /// SQL NULL is returned as an empty string. `Ok(None)` means the cursor
    /// is exhausted; it is never rewound.
    fn next_row(&mut self) -> Result<Option<Vec<String>>>;
}

/// Callback that drains a lent cursor and reports the number of rows it wrote.
pub type CursorConsumer<'a> = dyn FnMut(&mut dyn RowCursor) -> Result<u64> + 'a;

/// One open connection.
pub trait DatabaseSession {
    /// Executes `sql` and passes a cursor over its result to `consume`.
    ///
    /// Execution failures are reported as `QueryError`. Whatever `consume`
    /// returns is returned unchanged; a failure while closing the statement
    /// is logged and never replaces it.
    fn query_with(&mut self, sql: &str, consume: &mut CursorConsumer<'_>) -> Result<u64>;

    /// Closes the connection.
    fn close(self: Box<Self>) -> Result<()>;
}

/// Opens sessions for one kind of database.
///
/// We add `: Send + Sync` so a single registry of drivers can be shared
/// between independently running jobs.
pub trait DatabaseDriver: Send + Sync {
    /// Identifier this driver is registered under (e.g. `oracle`).
    fn name(&self) -> &str;

    /// Establishes a new connection. Failures are reported as `ConnectionError`.
    fn connect(&self, descriptor: &ConnectionDescriptor) -> Result<Box<dyn DatabaseSession>>;
}
