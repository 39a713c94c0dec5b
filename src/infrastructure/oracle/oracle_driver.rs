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

//! Oracle implementation of the database port, built on the `oracle` crate (ODPI-C).
//!
//! Each session owns exactly one dedicated connection. A query is executed as
//! a prepared statement with row prefetching, and every column is fetched as
//! text so the serializer never has to know about Oracle types.

use crate::domain::errors::{ExportError, Result};
use crate::domain::export_models::ConnectionDescriptor;
use crate::ports::database_port::{CursorConsumer, DatabaseDriver, DatabaseSession, RowCursor};
use log::{debug, info, warn};
use oracle::{Connection, ResultSet, Row};

/// URL prefix of JDBC thin-driver URLs; the remainder is a valid connect string.
const JDBC_THIN_PREFIX: &str = "jdbc:oracle:thin:@";

/// Converts the configured URL into an ODPI-C connect string.
///
/// Accepts Easy Connect strings (`//host:1521/service`), TNS aliases, and JDBC
/// thin URLs (`jdbc:oracle:thin:@//host:1521/service`).
pub fn connect_string_from_url(url: &str) -> String {
    let url = url.trim();
    match url.get(..JDBC_THIN_PREFIX.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(JDBC_THIN_PREFIX) => {
            url[JDBC_THIN_PREFIX.len()..].to_string()
        }
        _ => url.to_string(),
    }
}

/// Driver registered as `oracle`.
#[derive(Debug, Clone)]
pub struct OracleDriver {
    prefetch_rows: u32,
}

impl OracleDriver {
    pub fn new(prefetch_rows: u32) -> Self {
        Self { prefetch_rows }
    }
}

impl DatabaseDriver for OracleDriver {
    fn name(&self) -> &str {
        "oracle"
    }

    fn connect(&self, descriptor: &ConnectionDescriptor) -> Result<Box<dyn DatabaseSession>> {
        let conn_str = connect_string_from_url(&descriptor.url);
        info!("Connecting to {} as {}", conn_str, descriptor.username);

        let conn = Connection::connect(&descriptor.username, &descriptor.password, &conn_str)
            .map_err(|e| {
                ExportError::ConnectionError(format!(
                    "can not create connection with URL '{}': {}",
                    descriptor.url, e
                ))
            })?;

        Ok(Box::new(OracleSession {
            conn,
            prefetch_rows: self.prefetch_rows,
        }))
    }
}

struct OracleSession {
    conn: Connection,
    prefetch_rows: u32,
}

impl DatabaseSession for OracleSession {
    fn query_with(&mut self, sql: &str, consume: &mut CursorConsumer<'_>) -> Result<u64> {
        let mut stmt = self
            .conn
            .statement(sql)
            .prefetch_rows(self.prefetch_rows)
            .build()
            .map_err(|e| ExportError::QueryError(e.to_string()))?;

        debug!("Executing query: {}", sql);
        let outcome = match stmt.query(&[]) {
            Ok(rows) => {
                let mut cursor = OracleCursor::new(rows);
                consume(&mut cursor)
                // cursor (and its result set) is dropped here, before the statement closes
            }
            Err(e) => Err(ExportError::QueryError(e.to_string())),
        };

        if let Err(e) = stmt.close() {
            warn!("Failed to close statement: {}", e);
        }
        outcome
    }

    fn close(self: Box<Self>) -> Result<()> {
        self.conn
            .close()
            .map_err(|e| ExportError::ConnectionError(e.to_string()))
    }
}

/// Forward-only cursor over an Oracle result set.
struct OracleCursor<'s> {
    rows: ResultSet<'s, Row>,
    columns: Vec<String>,
}

impl<'s> OracleCursor<'s> {
    fn new(rows: ResultSet<'s, Row>) -> Self {
        let columns = rows
            .column_info()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        Self { rows, columns }
    }
}

impl RowCursor for OracleCursor<'_> {
    fn column_names(&self) -> &[String] {
        &self.columns
    }

    fn next_row(&mut self) -> Result<Option<Vec<String>>> {
        let row = match self.rows.next() {
            Some(row_res) => {
                row_res.map_err(|e| ExportError::SerializationError(e.to_string()))?
            }
            None => return Ok(None),
        };

        let mut values = Vec::with_capacity(self.columns.len());
        for i in 0..self.columns.len() {
            let v: Option<String> = row.get(i).map_err(|e| {
                ExportError::SerializationError(format!(
                    "cannot read column {}: {}",
                    self.columns[i], e
                ))
            })?;
            values.push(v.unwrap_or_default());
        }
        Ok(Some(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_string_from_url() {
        assert_eq!(
            connect_string_from_url("jdbc:oracle:thin:@//db.local:1521/ORCLPDB1"),
            "//db.local:1521/ORCLPDB1"
        );
        assert_eq!(
            connect_string_from_url("JDBC:ORACLE:THIN:@db.local:1521:ORCL"),
            "db.local:1521:ORCL"
        );
        assert_eq!(connect_string_from_url(" //h:1521/svc "), "//h:1521/svc");
        assert_eq!(connect_string_from_url("PROD_TNS"), "PROD_TNS");
    }

    #[test]
    fn test_driver_name() {
        assert_eq!(OracleDriver::new(5000).name(), "oracle");
    }
}
