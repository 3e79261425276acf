//! Catalog builder - loads CSV files into a Catalog

use std::collections::HashSet;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::error::{Diagnostic, DiagnosticKind, Error, Result};
use crate::naming::{sanitize_identifier, unique_name};
use crate::schema::{Catalog, ColumnDef, Row, TableDef};
use crate::types::ScalarType;

/// Null markers recognised when no others are configured
pub const DEFAULT_NULL_VALUES: &[&str] = &["", "NULL", "NaN"];

const SNIFF_RECORDS: usize = 100;

/// Builder for constructing a Catalog from CSV files
pub struct CatalogBuilder {
    catalog: Catalog,
    diagnostics: Vec<Diagnostic>,
    null_values: HashSet<String>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self {
            catalog: Catalog::new(),
            diagnostics: Vec::new(),
            null_values: DEFAULT_NULL_VALUES.iter().map(|v| v.to_string()).collect(),
        }
    }

    /// Replace the null markers; the empty cell is always treated as missing
    pub fn with_null_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.null_values = values.into_iter().map(Into::into).collect();
        self.null_values.insert(String::new());
        self
    }

    /// Load every `*.csv` file of a directory, in file-name order.
    ///
    /// A file that fails to load is skipped with a diagnostic. Returns the
    /// number of tables loaded.
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize> {
        if !dir.is_dir() {
            return Err(Error::Io {
                path: dir.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
            });
        }

        let pattern = format!("{}/*.csv", glob::Pattern::escape(&dir.to_string_lossy()));
        let options = glob::MatchOptions {
            case_sensitive: false,
            ..glob::MatchOptions::new()
        };
        let entries = glob::glob_with(&pattern, options).map_err(|e| Error::Io {
            path: dir.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, e),
        })?;

        let mut paths: Vec<PathBuf> = Vec::new();
        for entry in entries {
            match entry {
                Ok(path) if path.is_file() => paths.push(path),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", e.path().display(), e);
                    self.skip(e.path(), e.to_string());
                }
            }
        }
        paths.sort();

        let mut loaded = 0;
        for path in paths {
            match self.load_file(&path) {
                Ok(()) => loaded += 1,
                Err(err) => {
                    let reason = describe(&err);
                    tracing::warn!("Skipping {}: {}", path.display(), reason);
                    self.skip(&path, reason);
                }
            }
        }

        tracing::info!("Loaded {} table(s) from {}", loaded, dir.display());
        Ok(loaded)
    }

    /// Load one CSV file as a table named after the file
    pub fn load_file(&mut self, path: &Path) -> Result<()> {
        let bytes = std::fs::read(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.load_bytes(path, &file_name, &bytes)
    }

    /// Load CSV text from any reader; `source_file` names the table
    pub fn load_reader<R: Read>(&mut self, source_file: &str, mut reader: R) -> Result<()> {
        let path = PathBuf::from(source_file);
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|source| Error::Io {
                path: path.clone(),
                source,
            })?;
        self.load_bytes(&path, source_file, &bytes)
    }

    fn load_bytes(&mut self, path: &Path, source_file: &str, bytes: &[u8]) -> Result<()> {
        if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            return Err(Error::EmptyInput {
                path: path.to_path_buf(),
            });
        }

        let delimiter = sniff_delimiter(bytes);
        tracing::debug!("Using delimiter {:?} for {}", delimiter as char, source_file);

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .has_headers(true)
            .trim(csv::Trim::Headers)
            .from_reader(bytes);

        let csv_error = |source: csv::Error| Error::Csv {
            path: path.to_path_buf(),
            source,
        };

        let headers = reader.headers().map_err(csv_error)?.clone();
        if headers.iter().all(str::is_empty) {
            return Err(Error::EmptyInput {
                path: path.to_path_buf(),
            });
        }

        let mut names: Vec<String> = Vec::with_capacity(headers.len());
        for (index, header) in headers.iter().enumerate() {
            let name = if header.is_empty() {
                format!("column_{}", index + 1)
            } else {
                sanitize_identifier(header)
            };
            if names.contains(&name) {
                return Err(Error::DuplicateColumn {
                    path: path.to_path_buf(),
                    column: name,
                });
            }
            names.push(name);
        }

        let mut rows: Vec<Row> = Vec::new();
        for record in reader.records() {
            let record = record.map_err(csv_error)?;
            rows.push(self.normalize_row(&record, names.len()));
        }
        if rows.is_empty() {
            return Err(Error::EmptyInput {
                path: path.to_path_buf(),
            });
        }

        let stem = Path::new(source_file)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| source_file.to_string());
        let name = unique_name(&sanitize_identifier(&stem), |candidate| {
            self.catalog
                .tables
                .iter()
                .any(|(key, t)| key != source_file && t.name == candidate)
        });
        let mut table = TableDef::new(name, source_file);
        for (index, name) in names.iter().enumerate() {
            table.add_column(profile_column(name, index, &rows));
        }
        table.rows = rows;

        tracing::info!(
            "Loaded table {} from {} ({} columns, {} rows)",
            table.name,
            source_file,
            table.columns.len(),
            table.row_count()
        );
        self.catalog.add_table(table);
        Ok(())
    }

    /// Pad or truncate a record to the header width, dropping leading
    /// whitespace and mapping null markers to `None`
    fn normalize_row(&self, record: &csv::StringRecord, width: usize) -> Row {
        let mut row: Row = record
            .iter()
            .take(width)
            .map(str::trim_start)
            .map(|cell| {
                if self.null_values.contains(cell) {
                    None
                } else {
                    Some(cell.to_string())
                }
            })
            .collect();
        row.resize(width, None);
        row
    }

    fn skip(&mut self, path: &Path, reason: String) {
        self.diagnostics.push(
            Diagnostic::warning(
                DiagnosticKind::FileSkipped,
                format!("skipped '{}': {}", path.display(), reason),
            )
            .with_help("the remaining files are still loaded"),
        );
    }

    /// Build the final catalog
    pub fn build(self) -> (Catalog, Vec<Diagnostic>) {
        (self.catalog, self.diagnostics)
    }

    /// Get a reference to the catalog being built
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }
}

impl Default for CatalogBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Column statistics over the loaded rows
fn profile_column(name: &str, index: usize, rows: &[Row]) -> ColumnDef {
    let cells = || rows.iter().map(move |row| row.get(index).and_then(|v| v.as_deref()));
    let data_type = ScalarType::infer(cells());

    let mut column = ColumnDef::new(name, data_type);
    column.nullable = cells().any(|v| v.is_none());
    column.size = cells()
        .flatten()
        .map(|v| v.chars().count() as u64)
        .max();
    if !rows.is_empty() {
        let distinct: HashSet<Option<String>> = cells()
            .map(|v| v.map(|v| data_type.canonical(v)))
            .collect();
        column.unique = distinct.len() == rows.len();
    }
    column
}

/// Pick the field delimiter of a CSV sample.
///
/// Falls back to a comma when the sample has no recognisable dialect or the
/// sniffed delimiter does not occur in the header line.
pub fn sniff_delimiter(sample: &[u8]) -> u8 {
    let mut sniffer = csv_nose::Sniffer::new();
    sniffer.sample_size(csv_nose::SampleSize::Records(SNIFF_RECORDS));
    let delimiter = match sniffer.sniff_bytes(sample) {
        Ok(metadata) => metadata.dialect.delimiter,
        Err(e) => {
            tracing::debug!("Could not sniff a delimiter, using ',': {}", e);
            return b',';
        }
    };

    let header = sample
        .split(|b| *b == b'\n')
        .find(|line| !line.iter().all(u8::is_ascii_whitespace))
        .unwrap_or_default();
    if header.contains(&delimiter) {
        delimiter
    } else {
        b','
    }
}

/// Error text including its source chain
fn describe(err: &Error) -> String {
    let mut text = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = std::error::Error::source(cause);
    }
    text
}
