//! Target SQL dialects and the renderer seam

use std::str::FromStr;

use crate::error::Error;
use crate::schema::TableDef;
use crate::types::ScalarType;

/// Longest text column that still maps to a bounded character type
const BOUNDED_TEXT_LENGTH: u64 = 255;

/// Supported SQL dialects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SqlDialect {
    #[default]
    PostgreSQL,
    MySQL,
    SqlServer,
}

impl SqlDialect {
    /// Column type for a scalar type; `size` is the longest observed value
    pub fn map_type(&self, ty: ScalarType, size: Option<u64>) -> String {
        let bounded = size.is_some_and(|s| s <= BOUNDED_TEXT_LENGTH);
        let name = match (self, ty) {
            (SqlDialect::PostgreSQL, ScalarType::Integer) => "bigint",
            (SqlDialect::PostgreSQL, ScalarType::Float) => "double precision",
            (SqlDialect::PostgreSQL, ScalarType::Boolean) => "boolean",
            (SqlDialect::PostgreSQL, ScalarType::Date) => "date",
            (SqlDialect::PostgreSQL, ScalarType::Timestamp) => "timestamp",
            (SqlDialect::PostgreSQL, ScalarType::Text) => "text",

            (SqlDialect::MySQL, ScalarType::Integer) => "BIGINT",
            (SqlDialect::MySQL, ScalarType::Float) => "DOUBLE",
            (SqlDialect::MySQL, ScalarType::Boolean) => "BOOLEAN",
            (SqlDialect::MySQL, ScalarType::Date) => "DATE",
            (SqlDialect::MySQL, ScalarType::Timestamp) => "DATETIME",
            (SqlDialect::MySQL, ScalarType::Text) if bounded => "VARCHAR(255)",
            (SqlDialect::MySQL, ScalarType::Text) => "TEXT",

            (SqlDialect::SqlServer, ScalarType::Integer) => "BIGINT",
            (SqlDialect::SqlServer, ScalarType::Float) => "FLOAT",
            (SqlDialect::SqlServer, ScalarType::Boolean) => "BIT",
            (SqlDialect::SqlServer, ScalarType::Date) => "DATE",
            (SqlDialect::SqlServer, ScalarType::Timestamp) => "DATETIME2",
            (SqlDialect::SqlServer, ScalarType::Text) if bounded => "NVARCHAR(255)",
            (SqlDialect::SqlServer, ScalarType::Text) => "NVARCHAR(MAX)",
        };
        name.to_string()
    }

    /// Quote an identifier the way the engine expects
    pub fn quote_identifier(&self, name: &str) -> String {
        match self {
            SqlDialect::PostgreSQL => format!("\"{}\"", name.replace('"', "\"\"")),
            SqlDialect::MySQL => format!("`{}`", name.replace('`', "``")),
            SqlDialect::SqlServer => format!("[{}]", name.replace(']', "]]")),
        }
    }
}

impl FromStr for SqlDialect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgresql" | "postgres" | "pg" => Ok(SqlDialect::PostgreSQL),
            "mysql" | "mariadb" => Ok(SqlDialect::MySQL),
            "sqlserver" | "mssql" | "tsql" => Ok(SqlDialect::SqlServer),
            _ => Err(Error::UnknownDialect(s.to_string())),
        }
    }
}

impl std::fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlDialect::PostgreSQL => write!(f, "postgresql"),
            SqlDialect::MySQL => write!(f, "mysql"),
            SqlDialect::SqlServer => write!(f, "sqlserver"),
        }
    }
}

/// Turns inferred tables into SQL text for one dialect.
///
/// Implementations own identifier escaping and constraint naming; tables
/// arrive in creation order with foreign keys to absent tables removed.
pub trait SchemaRenderer {
    fn dialect(&self) -> SqlDialect;

    /// `CREATE TABLE` statement, including key and index constraints
    fn render_create_table(&self, schema: &str, table: &TableDef) -> String;

    /// `INSERT` statements for the table's loaded rows
    fn render_inserts(&self, schema: &str, table: &TableDef) -> Vec<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dialect() {
        assert_eq!("postgres".parse::<SqlDialect>().unwrap(), SqlDialect::PostgreSQL);
        assert_eq!("MySQL".parse::<SqlDialect>().unwrap(), SqlDialect::MySQL);
        assert_eq!("mssql".parse::<SqlDialect>().unwrap(), SqlDialect::SqlServer);
        assert!(matches!(
            "oracle".parse::<SqlDialect>(),
            Err(Error::UnknownDialect(ref name)) if name == "oracle"
        ));
        assert_eq!(SqlDialect::SqlServer.to_string(), "sqlserver");
    }

    #[test]
    fn test_map_type() {
        let pg = SqlDialect::PostgreSQL;
        assert_eq!(pg.map_type(ScalarType::Float, None), "double precision");
        assert_eq!(pg.map_type(ScalarType::Text, Some(10)), "text");

        let my = SqlDialect::MySQL;
        assert_eq!(my.map_type(ScalarType::Timestamp, None), "DATETIME");
        assert_eq!(my.map_type(ScalarType::Text, Some(40)), "VARCHAR(255)");
        assert_eq!(my.map_type(ScalarType::Text, Some(4000)), "TEXT");
        assert_eq!(my.map_type(ScalarType::Text, None), "TEXT");

        let ms = SqlDialect::SqlServer;
        assert_eq!(ms.map_type(ScalarType::Boolean, None), "BIT");
        assert_eq!(ms.map_type(ScalarType::Text, Some(255)), "NVARCHAR(255)");
        assert_eq!(ms.map_type(ScalarType::Text, Some(256)), "NVARCHAR(MAX)");
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(SqlDialect::PostgreSQL.quote_identifier("a\"b"), "\"a\"\"b\"");
        assert_eq!(SqlDialect::MySQL.quote_identifier("order"), "`order`");
        assert_eq!(SqlDialect::SqlServer.quote_identifier("user"), "[user]");
    }
}
