//! Scalar type system for CSV cells

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Dialect-neutral type of a loaded column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    Integer,
    Float,
    Boolean,
    Date,
    Timestamp,
    Text,
}

const TRUE_LITERALS: &[&str] = &["true", "t", "yes", "y"];
const FALSE_LITERALS: &[&str] = &["false", "f", "no", "n"];

const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

impl ScalarType {
    /// Detect the narrowest type that can hold a single non-null cell
    pub fn detect(cell: &str) -> Self {
        let cell = cell.trim();
        if cell.parse::<i64>().is_ok() {
            ScalarType::Integer
        } else if is_float(cell) {
            ScalarType::Float
        } else if parse_bool(cell).is_some() {
            ScalarType::Boolean
        } else if is_date(cell) {
            ScalarType::Date
        } else if is_timestamp(cell) {
            ScalarType::Timestamp
        } else {
            ScalarType::Text
        }
    }

    /// Widen two observed types into one that holds both
    pub fn unify(self, other: ScalarType) -> ScalarType {
        use ScalarType::*;
        match (self, other) {
            (a, b) if a == b => a,
            (Integer, Float) | (Float, Integer) => Float,
            (Date, Timestamp) | (Timestamp, Date) => Timestamp,
            _ => Text,
        }
    }

    /// Infer a column type from its cells; nulls do not participate
    pub fn infer<'a, I>(cells: I) -> ScalarType
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        cells
            .into_iter()
            .flatten()
            .map(ScalarType::detect)
            .reduce(ScalarType::unify)
            .unwrap_or(ScalarType::Text)
    }

    /// Canonical form of a cell under this type, used for equality checks.
    ///
    /// Cells that do not parse as the column type are kept verbatim.
    pub fn canonical(&self, cell: &str) -> String {
        let trimmed = cell.trim();
        match self {
            ScalarType::Integer => match trimmed.parse::<i64>() {
                Ok(v) => v.to_string(),
                Err(_) => trimmed.to_string(),
            },
            ScalarType::Float => match trimmed.parse::<f64>() {
                // -0.0 and 0.0 collide, as they would in the database
                Ok(v) if v == 0.0 => "0".to_string(),
                Ok(v) => v.to_string(),
                Err(_) => trimmed.to_string(),
            },
            ScalarType::Boolean => match parse_bool(trimmed) {
                Some(v) => v.to_string(),
                None => trimmed.to_string(),
            },
            ScalarType::Date | ScalarType::Timestamp | ScalarType::Text => cell.to_string(),
        }
    }

    /// Get a human-readable name for this type
    pub fn display_name(&self) -> &'static str {
        match self {
            ScalarType::Integer => "integer",
            ScalarType::Float => "float",
            ScalarType::Boolean => "boolean",
            ScalarType::Date => "date",
            ScalarType::Timestamp => "timestamp",
            ScalarType::Text => "text",
        }
    }
}

impl std::fmt::Display for ScalarType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

fn is_float(cell: &str) -> bool {
    // "inf"/"nan" parse as f64 but read as text in a CSV
    cell.chars().any(|c| c.is_ascii_digit()) && cell.parse::<f64>().is_ok()
}

fn parse_bool(cell: &str) -> Option<bool> {
    let lower = cell.to_ascii_lowercase();
    if TRUE_LITERALS.contains(&lower.as_str()) {
        Some(true)
    } else if FALSE_LITERALS.contains(&lower.as_str()) {
        Some(false)
    } else {
        None
    }
}

/// `YYYY-MM-DD` naming a real calendar day
fn is_date(cell: &str) -> bool {
    cell.len() == 10 && NaiveDate::parse_from_str(cell, "%Y-%m-%d").is_ok()
}

/// A date followed by `T` or a space and an `HH:MM[:SS[.fff]]` time, or an
/// RFC 3339 timestamp with an offset
fn is_timestamp(cell: &str) -> bool {
    if cell.len() < 16 || !cell.is_char_boundary(10) || !is_date(&cell[..10]) {
        return false;
    }
    DateTime::parse_from_rfc3339(cell).is_ok()
        || TIMESTAMP_FORMATS
            .iter()
            .any(|format| NaiveDateTime::parse_from_str(cell, format).is_ok())
}
