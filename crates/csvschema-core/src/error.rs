//! Error and diagnostic types

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Result alias used across the crate
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors that stop an operation.
///
/// Inference misses are never errors; they surface as [`Diagnostic`]s.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum Error {
    #[error("failed to read '{}'", path.display())]
    #[diagnostic(code(csvschema::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV in '{}'", path.display())]
    #[diagnostic(code(csvschema::csv))]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("'{}' has no data rows", path.display())]
    #[diagnostic(code(csvschema::empty_input))]
    EmptyInput { path: PathBuf },

    #[error("duplicate column '{column}' in '{}'", path.display())]
    #[diagnostic(
        code(csvschema::duplicate_column),
        help("column names are compared case-insensitively")
    )]
    DuplicateColumn { path: PathBuf, column: String },

    #[error("no loadable CSV files in '{}'", dir.display())]
    #[diagnostic(
        code(csvschema::no_tables),
        help("the directory must contain at least one non-empty .csv file")
    )]
    NoTables { dir: PathBuf },

    #[error("invalid {kind} name '{value}': {reason}")]
    #[diagnostic(code(csvschema::invalid_identifier))]
    InvalidIdentifier {
        kind: IdentifierKind,
        value: String,
        reason: String,
    },

    #[error("invalid configuration in '{}': {message}", path.display())]
    #[diagnostic(code(csvschema::config))]
    Config { path: PathBuf, message: String },

    #[error("invalid schema snapshot '{}': {message}", path.display())]
    #[diagnostic(code(csvschema::snapshot))]
    Snapshot { path: PathBuf, message: String },

    #[error("unknown dialect '{0}'")]
    #[diagnostic(
        code(csvschema::unknown_dialect),
        help("supported dialects: postgresql, mysql, sqlserver")
    )]
    UnknownDialect(String),

    #[error("naming suggester failed: {0}")]
    #[diagnostic(code(csvschema::naming))]
    Naming(String),
}

/// What an identifier names, for error messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierKind {
    Table,
    Column,
    Schema,
}

impl std::fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdentifierKind::Table => write!(f, "table"),
            IdentifierKind::Column => write!(f, "column"),
            IdentifierKind::Schema => write!(f, "schema"),
        }
    }
}

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Info,
}

/// A non-fatal event recorded while loading or inferring a schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub message: String,
    pub table: Option<String>,
    pub column: Option<String>,
    pub help: Option<String>,
}

impl Diagnostic {
    pub fn warning(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: Severity::Warning,
            message: message.into(),
            table: None,
            column: None,
            help: None,
        }
    }

    pub fn info(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            ..Self::warning(kind, message)
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Get the diagnostic code string (e.g., "W0003")
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message)
    }
}

/// Types of diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticKind {
    /// W0001: A source file could not be loaded
    FileSkipped,
    /// W0002: No prefix of the columns is free of duplicates
    NoPrimaryKey,
    /// W0003: An `_id` column names no known table
    UnresolvedForeignKey,
    /// W0004: The referenced table has no usable key column
    MissingReferencedColumn,
    /// W0005: A key names a column the table does not have
    UnknownKeyColumn,
    /// W0006: Foreign keys form a cycle
    DependencyCycle,
    /// W0007: A snapshot table is absent from the loaded data
    SnapshotTableMissing,
    /// W0008: A suggested table name was rejected
    NameFallback,
    /// W0009: A foreign key points at a table that does not exist
    DanglingReference,
    /// I0001: Constraints were restored from a snapshot instead of inferred
    SnapshotApplied,
}

impl DiagnosticKind {
    pub fn code(&self) -> &'static str {
        match self {
            DiagnosticKind::FileSkipped => "W0001",
            DiagnosticKind::NoPrimaryKey => "W0002",
            DiagnosticKind::UnresolvedForeignKey => "W0003",
            DiagnosticKind::MissingReferencedColumn => "W0004",
            DiagnosticKind::UnknownKeyColumn => "W0005",
            DiagnosticKind::DependencyCycle => "W0006",
            DiagnosticKind::SnapshotTableMissing => "W0007",
            DiagnosticKind::NameFallback => "W0008",
            DiagnosticKind::DanglingReference => "W0009",
            DiagnosticKind::SnapshotApplied => "I0001",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DiagnosticKind::FileSkipped => "file-skipped",
            DiagnosticKind::NoPrimaryKey => "no-primary-key",
            DiagnosticKind::UnresolvedForeignKey => "unresolved-foreign-key",
            DiagnosticKind::MissingReferencedColumn => "missing-referenced-column",
            DiagnosticKind::UnknownKeyColumn => "unknown-key-column",
            DiagnosticKind::DependencyCycle => "dependency-cycle",
            DiagnosticKind::SnapshotTableMissing => "snapshot-table-missing",
            DiagnosticKind::NameFallback => "name-fallback",
            DiagnosticKind::DanglingReference => "dangling-reference",
            DiagnosticKind::SnapshotApplied => "snapshot-applied",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_builder() {
        let diag = Diagnostic::warning(DiagnosticKind::UnresolvedForeignKey, "no table 'user'")
            .with_table("events")
            .with_column("user_id");

        assert_eq!(diag.code(), "W0003");
        assert_eq!(diag.severity, Severity::Warning);
        assert_eq!(diag.table.as_deref(), Some("events"));
        assert_eq!(diag.column.as_deref(), Some("user_id"));
        assert_eq!(diag.to_string(), "[W0003] no table 'user'");
    }

    #[test]
    fn test_info_keeps_kind() {
        let diag = Diagnostic::info(DiagnosticKind::SnapshotApplied, "used ddl_public.json");
        assert_eq!(diag.severity, Severity::Info);
        assert_eq!(diag.kind.name(), "snapshot-applied");
        assert_eq!(diag.to_string(), "[I0001] used ddl_public.json");
    }
}
