//! SQLite implementation of the database port, built on `rusqlite`.
//!
//! Databases are opened read-only so a mistyped path fails at connect time
//! instead of silently creating an empty database file.

use crate::domain::errors::{ExportError, Result};
use crate::domain::export_models::ConnectionDescriptor;
use crate::ports::database_port::{CursorConsumer, DatabaseDriver, DatabaseSession, RowCursor};
use log::{debug, info, warn};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, Rows};

const URL_PREFIXES: &[&str] = &["jdbc:sqlite:", "sqlite:"];

/// Extracts the database path from `sqlite:` / `jdbc:sqlite:` URLs or plain paths.
pub fn database_path_from_url(url: &str) -> &str {
    let url = url.trim();
    for prefix in URL_PREFIXES {
        if let Some(head) = url.get(..prefix.len()) {
            if head.eq_ignore_ascii_case(prefix) {
                let rest = &url[prefix.len()..];
                return rest.strip_prefix("//").unwrap_or(rest);
            }
        }
    }
    url
}

/// Driver registered as `sqlite`. Credentials are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDriver;

impl DatabaseDriver for SqliteDriver {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn connect(&self, descriptor: &ConnectionDescriptor) -> Result<Box<dyn DatabaseSession>> {
        let path = database_path_from_url(&descriptor.url);
        info!("Opening SQLite database {}", path);

        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags).map_err(|e| {
            ExportError::ConnectionError(format!("can not open SQLite database '{}': {}", path, e))
        })?;
        Ok(Box::new(SqliteSession { conn }))
    }
}

struct SqliteSession {
    conn: Connection,
}

impl DatabaseSession for SqliteSession {
    fn query_with(&mut self, sql: &str, consume: &mut CursorConsumer<'_>) -> Result<u64> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| ExportError::QueryError(e.to_string()))?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        debug!("Executing query: {}", sql);
        let outcome = match stmt.query([]) {
            Ok(rows) => {
                let mut cursor = SqliteCursor { rows, columns };
                consume(&mut cursor)
            }
            Err(e) => Err(ExportError::QueryError(e.to_string())),
        };

        if let Err(e) = stmt.finalize() {
            warn!("Failed to finalize statement: {}", e);
        }
        outcome
    }

    fn close(self: Box<Self>) -> Result<()> {
        self.conn
            .close()
            .map_err(|(_, e)| ExportError::ConnectionError(e.to_string()))
    }
}

struct SqliteCursor<'s> {
    rows: Rows<'s>,
    columns: Vec<String>,
}

/// Renders a column value as text. NULL becomes an empty string and reals
/// keep their fractional part (`2.0`, not `2`).
fn value_to_text(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => format!("{:?}", f),
        ValueRef::Text(t) | ValueRef::Blob(t) => String::from_utf8_lossy(t).into_owned(),
    }
}

impl RowCursor for SqliteCursor<'_> {
    fn column_names(&self) -> &[String] {
        &self.columns
    }

    fn next_row(&mut self) -> Result<Option<Vec<String>>> {
        let row = match self.rows.next() {
            Ok(Some(row)) => row,
            Ok(None) => return Ok(None),
            Err(e) => return Err(ExportError::SerializationError(e.to_string())),
        };

        let mut values = Vec::with_capacity(self.columns.len());
        for (i, name) in self.columns.iter().enumerate() {
            let v = row.get_ref(i).map_err(|e| {
                ExportError::SerializationError(format!("cannot read column {}: {}", name, e))
            })?;
            values.push(value_to_text(v));
        }
        Ok(Some(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(url: &str) -> ConnectionDescriptor {
        ConnectionDescriptor {
            driver: "sqlite".into(),
            url: url.into(),
            username: String::new(),
            password: String::new(),
        }
    }

    fn seeded_db(dir: &std::path::Path) -> std::path::PathBuf {
        let path = dir.join("src.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE t (id INTEGER, name TEXT, score REAL, note TEXT);
             INSERT INTO t VALUES (1, '  alice ', 1.5, NULL);
             INSERT INTO t VALUES (2, 'bob', 2.0, 'x');",
        )
        .unwrap();
        path
    }

    #[test]
    fn test_database_path_from_url() {
        assert_eq!(database_path_from_url("sqlite:/data/a.db"), "/data/a.db");
        assert_eq!(database_path_from_url("sqlite:///data/a.db"), "/data/a.db");
        assert_eq!(database_path_from_url("JDBC:SQLITE:/data/a.db"), "/data/a.db");
        assert_eq!(database_path_from_url("relative/a.db"), "relative/a.db");
    }

    #[test]
    fn test_query_streams_rows_as_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = seeded_db(dir.path());
        let mut session = SqliteDriver
            .connect(&descriptor(path.to_str().unwrap()))
            .unwrap();

        let mut seen = Vec::new();
        let count = session
            .query_with("SELECT id, name, score, note FROM t ORDER BY id", &mut |cursor: &mut dyn RowCursor| {
                seen.push(cursor.column_names().to_vec());
                let mut n = 0;
                while let Some(row) = cursor.next_row()? {
                    seen.push(row);
                    n += 1;
                }
                Ok(n)
            })
            .unwrap();
        session.close().unwrap();

        assert_eq!(count, 2);
        assert_eq!(seen[0], vec!["id", "name", "score", "note"]);
        assert_eq!(seen[1], vec!["1", "  alice ", "1.5", ""]);
        assert_eq!(seen[2], vec!["2", "bob", "2.0", "x"]);
    }

    #[test]
    fn test_value_to_text() {
        assert_eq!(value_to_text(ValueRef::Null), "");
        assert_eq!(value_to_text(ValueRef::Integer(-7)), "-7");
        assert_eq!(value_to_text(ValueRef::Real(2.0)), "2.0");
        assert_eq!(value_to_text(ValueRef::Real(0.25)), "0.25");
        assert_eq!(value_to_text(ValueRef::Text(b"abc")), "abc");
    }

    #[test]
    fn test_bad_sql_is_query_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = seeded_db(dir.path());
        let mut session = SqliteDriver
            .connect(&descriptor(path.to_str().unwrap()))
            .unwrap();

        let err = session
            .query_with("SELECT * FROM missing_table", &mut |_: &mut dyn RowCursor| Ok(0))
            .unwrap_err();
        assert!(matches!(err, ExportError::QueryError(_)));
    }

    #[test]
    fn test_missing_database_is_connection_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.db");
        let err = SqliteDriver
            .connect(&descriptor(missing.to_str().unwrap()))
            .err()
            .unwrap();
        assert!(matches!(err, ExportError::ConnectionError(_)));
        assert!(!missing.exists());
    }
}
