//! Infrastructure adapter for the local output files of an export.
//!
//! Provides directory creation, delete-then-create semantics for target
//! paths, chunk file naming, and a buffered delimited-line writer.

use crate::domain::errors::{ExportError, Result};
use csv::{QuoteStyle, Terminator, Writer, WriterBuilder};
use log::info;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

#[cfg(windows)]
const LINE_TERMINATOR: Terminator = Terminator::CRLF;
#[cfg(windows)]
const LINE_BREAK: &[u8] = b"\r\n";
#[cfg(not(windows))]
const LINE_TERMINATOR: Terminator = Terminator::Any(b'\n');
#[cfg(not(windows))]
const LINE_BREAK: &[u8] = b"\n";

/// Creates `dir` and all missing parents.
pub fn ensure_directory(dir: &Path) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
        info!("Output folder {} created", dir.display());
    }
    Ok(())
}

/// Removes `path` if it is present. Returns whether a file was deleted.
pub fn delete_if_exists(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => {
            info!("delete file: {}", path.display());
            Ok(true)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Derives the n-th chunk file name: `dir/orders.csv` -> `dir/orders_3.csv`.
///
/// A base name without an extension gets the counter appended (`dir/orders_3`).
pub fn chunk_file_name(base: &Path, index: u64) -> PathBuf {
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match base.extension() {
        Some(ext) => format!("{}_{}.{}", stem, index, ext.to_string_lossy()),
        None => format!("{}_{}", stem, index),
    };
    base.with_file_name(name)
}

/// Buffered writer producing one delimited line per record, without quoting.
pub struct DelimitedFileWriter {
    path: PathBuf,
    wtr: Writer<BufWriter<File>>,
}

impl DelimitedFileWriter {
    /// Creates (truncating) the file at `path`.
    pub fn create(path: &Path, separator: u8) -> io::Result<Self> {
        let file = File::create(path)?;
        let buf_writer = BufWriter::with_capacity(128 * 1024, file);
        let wtr = WriterBuilder::new()
            .delimiter(separator)
            .quote_style(QuoteStyle::Never)
            .terminator(LINE_TERMINATOR)
            .from_writer(buf_writer);
        Ok(Self {
            path: path.to_path_buf(),
            wtr,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the fields joined by the separator, followed by a line break.
    ///
    /// A record made of one empty field becomes an empty line; `csv` would
    /// write `""` for it even with quoting disabled.
    pub fn write_line<I, T>(&mut self, fields: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        let fields: Vec<T> = fields.into_iter().collect();
        let written = match fields.as_slice() {
            [only] if only.as_ref().is_empty() => self.write_empty_line(),
            _ => self.wtr.write_record(&fields).map_err(io::Error::from),
        };
        written.map_err(|e: io::Error| {
            ExportError::SerializationError(format!(
                "failed to write line to {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    fn write_empty_line(&mut self) -> io::Result<()> {
        self.wtr.flush()?;
        self.wtr.get_mut().write_all(LINE_BREAK)
    }

    /// Flushes all buffered lines and closes the file.
    pub fn finish(self) -> Result<()> {
        let path = self.path;
        let mut inner = self.wtr.into_inner().map_err(|e| {
            ExportError::SerializationError(format!(
                "failed to flush {}: {}",
                path.display(),
                e.error()
            ))
        })?;
        inner.flush().map_err(|e| {
            ExportError::SerializationError(format!("failed to flush {}: {}", path.display(), e))
        })
    }
}
