//! Configuration file handling

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::dialect::SqlDialect;
use crate::error::{Error, IdentifierKind, Result};
use crate::naming::{validate_identifier, ConfiguredNames};
use crate::schema::DEFAULT_NULL_VALUES;

/// File name searched for by [`PipelineConfig::find_and_load`]
pub const CONFIG_FILE_NAME: &str = "csvschema.toml";

/// Configuration for one schema-inference run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Target dialect (postgresql, mysql, sqlserver)
    pub dialect: String,

    /// Schema the tables are created in
    pub schema: String,

    /// Snapshot file; defaults to `ddl_<schema>.json` in the data directory
    pub snapshot: Option<PathBuf>,

    /// Reuse an existing snapshot instead of inferring constraints
    pub use_snapshot: bool,

    /// Write a snapshot after inference
    pub write_snapshot: bool,

    /// Cell values read as missing
    pub null_values: Vec<String>,

    /// File name (or stem) -> table name
    pub table_names: IndexMap<String, String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            dialect: SqlDialect::default().to_string(),
            schema: "public".to_string(),
            snapshot: None,
            use_snapshot: true,
            write_snapshot: false,
            null_values: DEFAULT_NULL_VALUES.iter().map(|v| v.to_string()).collect(),
            table_names: IndexMap::new(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: PipelineConfig = toml::from_str(&contents).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        config.validate().map_err(|e| Error::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(config)
    }

    /// Try to find and load csvschema.toml in `start` or its parent directories
    pub fn find_and_load(start: &Path) -> Result<Option<Self>> {
        let mut current_dir = start.to_path_buf();

        loop {
            let config_path = current_dir.join(CONFIG_FILE_NAME);
            if config_path.is_file() {
                tracing::debug!("Using configuration {}", config_path.display());
                return Ok(Some(Self::from_file(&config_path)?));
            }

            // Try parent directory
            if !current_dir.pop() {
                break;
            }
        }

        Ok(None)
    }

    /// Check values that the TOML types alone do not constrain
    pub fn validate(&self) -> Result<()> {
        self.sql_dialect()?;
        validate_identifier(IdentifierKind::Schema, &self.schema)?;
        Ok(())
    }

    pub fn sql_dialect(&self) -> Result<SqlDialect> {
        self.dialect.parse()
    }

    /// Snapshot location for a data directory
    pub fn snapshot_path(&self, dir: &Path) -> PathBuf {
        match &self.snapshot {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => dir.join(path),
            None => crate::snapshot::default_path(dir, &self.schema),
        }
    }

    /// Table-name overrides as a naming suggester, if any are configured
    pub fn configured_names(&self) -> Option<ConfiguredNames> {
        if self.table_names.is_empty() {
            None
        } else {
            Some(ConfiguredNames::new(self.table_names.clone()))
        }
    }

    /// Overlay explicitly given values onto this configuration
    pub fn merge(mut self, dialect: Option<SqlDialect>, schema: Option<&str>) -> Self {
        if let Some(dialect) = dialect {
            self.dialect = dialect.to_string();
        }
        if let Some(schema) = schema {
            self.schema = schema.to_string();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.sql_dialect().unwrap(), SqlDialect::PostgreSQL);
        assert_eq!(config.schema, "public");
        assert!(config.use_snapshot);
        assert!(!config.write_snapshot);
        assert_eq!(config.null_values, vec!["", "NULL", "NaN"]);
        assert!(config.configured_names().is_none());
        assert_eq!(
            config.snapshot_path(Path::new("/data")),
            Path::new("/data/ddl_public.json")
        );
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(
            &path,
            r#"
dialect = "mssql"
schema = "sales"
write_snapshot = true
null_values = ["", "n/a"]

[table_names]
"cust_export.csv" = "customers"
"#,
        )
        .unwrap();

        let config = PipelineConfig::from_file(&path).unwrap();
        assert_eq!(config.sql_dialect().unwrap(), SqlDialect::SqlServer);
        assert_eq!(config.schema, "sales");
        assert!(config.use_snapshot);
        assert!(config.write_snapshot);
        assert_eq!(config.null_values, vec!["", "n/a"]);
        assert_eq!(config.table_names["cust_export.csv"], "customers");
        assert!(config.configured_names().is_some());
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);

        for contents in [
            "dialect = \"oracle\"",
            "schema = \"my schema\"",
            "unknown_key = 1",
            "use_snapshot = \"yes\"",
        ] {
            std::fs::write(&path, contents).unwrap();
            assert!(
                matches!(PipelineConfig::from_file(&path), Err(Error::Config { .. })),
                "accepted {contents:?}"
            );
        }
    }

    #[test]
    fn test_find_and_load_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "schema = \"staging\"").unwrap();
        let nested = dir.path().join("data").join("2024");
        std::fs::create_dir_all(&nested).unwrap();

        let config = PipelineConfig::find_and_load(&nested).unwrap().unwrap();
        assert_eq!(config.schema, "staging");
    }

    #[test]
    fn test_merge_overrides() {
        let config = PipelineConfig::default().merge(Some(SqlDialect::MySQL), Some("shop"));
        assert_eq!(config.dialect, "mysql");
        assert_eq!(config.schema, "shop");
        assert_eq!(
            config.snapshot_path(Path::new("/data")),
            Path::new("/data/ddl_shop.json")
        );
    }
}
