//! # Row Serializer
//!
//! Drains a row cursor into one or more delimited text files.
//!
//! ## Output
//! - Every file starts with a header line of column names.
//! - Each data line holds the row's values, trimmed, joined by the separator.
//! - A file that ends up with no data rows is removed; chunked output stops
//!   as soon as the cursor is exhausted, so an exact multiple of the chunk size
//!   never leaves an empty trailing file behind.

use crate::domain::errors::{ExportError, Result};
use crate::domain::export_models::RowLimit;
use crate::infrastructure::local_storage::output_files::{
    chunk_file_name, delete_if_exists, DelimitedFileWriter,
};
use crate::ports::database_port::RowCursor;
use log::{debug, info};
use std::num::NonZeroU64;
use std::path::Path;
use std::time::Instant;

/// Converts query results into delimited text files.
#[derive(Debug, Clone, Copy)]
pub struct RowSerializer {
    separator: u8,
}

/// One-row lookahead over a cursor so "no more rows" can be asked without consuming.
struct RowStream<'c> {
    cursor: &'c mut dyn RowCursor,
    pending: Option<Vec<String>>,
    exhausted: bool,
}

impl<'c> RowStream<'c> {
    fn new(cursor: &'c mut dyn RowCursor) -> Self {
        Self {
            cursor,
            pending: None,
            exhausted: false,
        }
    }

    fn header(&self) -> Vec<String> {
        self.cursor.column_names().to_vec()
    }

    fn next(&mut self) -> Result<Option<Vec<String>>> {
        if let Some(row) = self.pending.take() {
            return Ok(Some(row));
        }
        if self.exhausted {
            return Ok(None);
        }
        let row = self.cursor.next_row()?;
        if row.is_none() {
            self.exhausted = true;
        }
        Ok(row)
    }

    fn has_more(&mut self) -> Result<bool> {
        if self.pending.is_none() && !self.exhausted {
            self.pending = self.next()?;
        }
        Ok(self.pending.is_some())
    }
}

impl RowSerializer {
    pub fn new(separator: u8) -> Self {
        Self { separator }
    }

    /// Writes the whole cursor according to `limit`, returning the total data rows written.
    pub fn export(
        &self,
        cursor: &mut dyn RowCursor,
        destination: &Path,
        limit: RowLimit,
    ) -> Result<u64> {
        match limit {
            RowLimit::Unlimited => self.export_single(cursor, destination),
            RowLimit::PerFile(rows_per_file) => {
                self.export_chunked(cursor, destination, rows_per_file)
            }
        }
    }

    /// Writes every remaining row of `cursor` to `destination`.
    ///
    /// An existing file at `destination` is replaced. If the cursor yields no
    /// rows the file is removed again and 0 is returned.
    pub fn export_single(&self, cursor: &mut dyn RowCursor, destination: &Path) -> Result<u64> {
        let mut stream = RowStream::new(cursor);
        let header = stream.header();
        let rows = self.write_file(&mut stream, &header, destination, None)?;
        info!("Exported {} rows to {}", rows, destination.display());
        Ok(rows)
    }

    /// Splits the cursor across `name_1.ext`, `name_2.ext`, ... holding at most
    /// `rows_per_file` data rows each.
    ///
    /// A failure aborts the whole operation; chunks already written stay on disk.
    pub fn export_chunked(
        &self,
        cursor: &mut dyn RowCursor,
        destination: &Path,
        rows_per_file: NonZeroU64,
    ) -> Result<u64> {
        let mut stream = RowStream::new(cursor);
        let header = stream.header();
        let mut index = 1;
        let mut total = 0;

        while stream.has_more()? {
            let chunk = chunk_file_name(destination, index);
            let rows = self.write_file(&mut stream, &header, &chunk, Some(rows_per_file))?;
            info!("Chunk {}: exported {} rows to {}", index, rows, chunk.display());
            total += rows;
            index += 1;
        }

        info!(
            "Exported {} rows in {} files for {}",
            total,
            index - 1,
            destination.display()
        );
        Ok(total)
    }

    /// Replaces `path` with a header plus up to `cap` rows taken from `stream`.
    fn write_file(
        &self,
        stream: &mut RowStream<'_>,
        header: &[String],
        path: &Path,
        cap: Option<NonZeroU64>,
    ) -> Result<u64> {
        delete_if_exists(path).map_err(|e| {
            ExportError::SerializationError(format!("cannot replace {}: {}", path.display(), e))
        })?;
        let mut out = DelimitedFileWriter::create(path, self.separator).map_err(|e| {
            ExportError::SerializationError(format!("cannot create {}: {}", path.display(), e))
        })?;

        let rows = match self.write_rows(&mut out, stream, header, cap) {
            Ok(rows) => rows,
            Err(e) => {
                // Release the handle before the error leaves this frame.
                drop(out);
                return Err(e);
            }
        };
        out.finish()?;

        if rows == 0 {
            delete_if_exists(path)?;
            debug!("Removed {} since the query returned no rows", path.display());
        }
        Ok(rows)
    }

    fn write_rows(
        &self,
        out: &mut DelimitedFileWriter,
        stream: &mut RowStream<'_>,
        header: &[String],
        cap: Option<NonZeroU64>,
    ) -> Result<u64> {
        out.write_line(header)?;

        let mut rows: u64 = 0;
        let mut last_log = Instant::now();
        loop {
            if cap.is_some_and(|c| rows >= c.get()) {
                break;
            }
            let Some(values) = stream.next()? else {
                break;
            };
            out.write_line(values.iter().map(|v| v.trim()))?;
            rows += 1;

            if last_log.elapsed().as_secs() >= 5 {
                info!("Exported {} rows to {}...", rows, out.path().display());
                last_log = Instant::now();
            }
        }
        Ok(rows)
    }
}
