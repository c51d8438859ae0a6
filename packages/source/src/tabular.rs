//! Header-keyed CSV tables.
//!
//! Every tabular input is an export of a spreadsheet, so headers and cells
//! come with stray whitespace and the occasional byte-order mark. Rows are
//! kept as header → trimmed text maps; typed parsing happens in
//! [`crate::records`].

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use crate::SourceError;

/// One CSV row, keyed by trimmed header.
pub type Row = BTreeMap<String, String>;

/// A parsed CSV file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    /// Label used in log and error messages (usually the file name).
    pub name: String,
    /// Trimmed headers, in file order.
    pub headers: Vec<String>,
    /// The data rows.
    pub rows: Vec<Row>,
}

impl Table {
    /// Fails unless every column in `columns` is present.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::MissingColumn`] naming the first absent column.
    pub fn require(&self, columns: &[&str]) -> Result<(), SourceError> {
        for column in columns {
            if !self.headers.iter().any(|h| h == column) {
                return Err(SourceError::MissingColumn {
                    table: self.name.clone(),
                    column: (*column).to_string(),
                });
            }
        }
        Ok(())
    }

    /// Number of data rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no data rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Reads a CSV file using `delimiter` as the field separator.
///
/// # Errors
///
/// Returns [`SourceError`] if the file cannot be opened or is not valid CSV.
pub fn read_table(path: &Path, delimiter: u8) -> Result<Table, SourceError> {
    let file = std::fs::File::open(path)?;
    let name = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
    let table = parse_table(&name, file, delimiter)?;
    log::info!("Read {} rows from {}", table.len(), path.display());
    Ok(table)
}

/// Parses CSV from any reader.
///
/// Rows shorter than the header are padded with empty cells. Records that
/// cannot be decoded (invalid UTF-8, malformed quoting) are skipped with a
/// warning.
///
/// # Errors
///
/// Returns [`SourceError::Csv`] if the header cannot be read or the reader
/// fails with an I/O error.
pub fn parse_table(name: &str, reader: impl Read, delimiter: u8) -> Result<Table, SourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_owned())
        .collect();

    let mut rows = Vec::new();
    let mut skipped = 0_usize;
    for result in reader.records() {
        let record = match result {
            Ok(record) => record,
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                log::warn!("Skipping unreadable record in {name}: {e}");
                skipped += 1;
                continue;
            }
        };
        let row: Row = headers
            .iter()
            .enumerate()
            .map(|(i, header)| (header.clone(), record.get(i).unwrap_or("").trim().to_owned()))
            .collect();
        rows.push(row);
    }

    if skipped > 0 {
        log::warn!("Skipped {skipped} unreadable records in {name}");
    }

    Ok(Table {
        name: name.to_string(),
        headers,
        rows,
    })
}
