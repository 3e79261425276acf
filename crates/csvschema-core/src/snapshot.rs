//! Schema snapshot: inferred constraints persisted as JSON
//!
//! A snapshot lets a later run skip inference for a dataset that was already
//! analysed. The file maps each table name to its columns and constraints:
//!
//! ```json
//! {
//!   "orders": {
//!     "source_file": "orders.csv",
//!     "columns": [{ "name": "id", "type": "integer", "size": 1, "nullable": false, "unique": true }],
//!     "primary_keys": ["id"],
//!     "foreign_keys": [{
//!       "column": "customer_id", "referenced_table": "customers", "referenced_column": "id",
//!       "on_update_action": null, "on_delete_action": null
//!     }],
//!     "unique_columns": []
//!   }
//! }
//! ```

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Diagnostic, DiagnosticKind, Error, IdentifierKind, Result};
use crate::inference::EntityNameEquivalence;
use crate::naming::validate_identifier;
use crate::schema::{Catalog, ColumnDef, ForeignKeyDef, ReferentialAction, TableDef};
use crate::types::ScalarType;

/// Default snapshot location for a data directory and schema
pub fn default_path(dir: &Path, schema: &str) -> PathBuf {
    dir.join(format!("ddl_{schema}.json"))
}

/// All tables of one snapshot, keyed by working table name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaSnapshot {
    pub tables: IndexMap<String, TableSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSnapshot {
    /// File the table was loaded from; matched before the table name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
    pub columns: Vec<ColumnSnapshot>,
    #[serde(default)]
    pub primary_keys: Vec<String>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeySnapshot>,
    #[serde(default)]
    pub unique_columns: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSnapshot {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: ScalarType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    pub nullable: bool,
    #[serde(default)]
    pub unique: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeySnapshot {
    pub column: String,
    pub referenced_table: String,
    pub referenced_column: String,
    #[serde(default, rename = "on_update_action")]
    pub on_update: Option<ReferentialAction>,
    #[serde(default, rename = "on_delete_action")]
    pub on_delete: Option<ReferentialAction>,
}

impl SchemaSnapshot {
    /// Capture the constraints of every table in the catalog
    pub fn from_catalog(catalog: &Catalog) -> Self {
        let tables = catalog
            .tables
            .values()
            .map(|table| (table.name.clone(), TableSnapshot::from(table)))
            .collect();
        Self { tables }
    }

    /// Write the snapshot as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| Error::Snapshot {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        std::fs::write(path, json).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!("Wrote schema snapshot to {}", path.display());
        Ok(())
    }

    /// Read a snapshot written by [`SchemaSnapshot::save`]
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|e| Error::Snapshot {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Copy the snapshot's columns and constraints onto matching catalog tables.
    ///
    /// Tables are found by source file, then by working or original name. A
    /// snapshot table with no loaded counterpart is skipped with a diagnostic.
    pub fn apply(
        &self,
        catalog: &mut Catalog,
        equivalence: &dyn EntityNameEquivalence,
    ) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        for (name, snapshot) in &self.tables {
            let index = snapshot
                .source_file
                .as_deref()
                .and_then(|file| catalog.tables.get_index_of(file))
                .or_else(|| catalog.resolve(name, equivalence));
            let Some((_, table)) = index.and_then(|i| catalog.tables.get_index_mut(i)) else {
                tracing::warn!("Table {} from snapshot not found in the loaded data", name);
                diagnostics.push(
                    Diagnostic::warning(
                        DiagnosticKind::SnapshotTableMissing,
                        format!("snapshot table '{name}' is not in the loaded data"),
                    )
                    .with_table(name),
                );
                continue;
            };

            let name = match validate_identifier(IdentifierKind::Table, name) {
                Ok(valid) => valid,
                Err(err) => {
                    tracing::warn!(
                        "Keeping name {} for {}: {}",
                        table.original_name,
                        table.source_file,
                        err
                    );
                    diagnostics.push(
                        Diagnostic::warning(
                            DiagnosticKind::NameFallback,
                            format!(
                                "kept name '{}' for '{}': snapshot name rejected: {}",
                                table.original_name, table.source_file, err
                            ),
                        )
                        .with_table(&table.original_name),
                    );
                    table.original_name.clone()
                }
            };
            table.rename(&name);
            snapshot.apply_to(table, &mut diagnostics);
        }

        diagnostics
    }
}

impl TableSnapshot {
    fn apply_to(&self, table: &mut TableDef, diagnostics: &mut Vec<Diagnostic>) {
        let loaded: Vec<String> = table.columns.keys().cloned().collect();
        let restored: Vec<String> = self.columns.iter().map(|c| c.name.to_lowercase()).collect();
        if loaded != restored {
            tracing::warn!(
                "Columns of table {} differ from the snapshot; using the snapshot",
                table.name
            );
        }

        table.columns.clear();
        for column in &self.columns {
            table.add_column(ColumnDef::from(column));
        }

        table.primary_key.clear();
        if let Err(diag) = table.set_primary_key(&self.primary_keys) {
            diagnostics.push(diag);
        }

        table.foreign_keys.clear();
        for fk in &self.foreign_keys {
            table.add_foreign_key(ForeignKeyDef::from(fk));
        }

        table.unique_indexes.clear();
        for columns in &self.unique_columns {
            if let Err(diag) = table.add_unique_index(columns) {
                diagnostics.push(diag);
            }
        }

        tracing::debug!("Restored table {} from snapshot", table.name);
    }
}

impl From<&TableDef> for TableSnapshot {
    fn from(table: &TableDef) -> Self {
        Self {
            source_file: Some(table.source_file.clone()).filter(|f| !f.is_empty()),
            columns: table.columns.values().map(ColumnSnapshot::from).collect(),
            primary_keys: table.primary_key.clone(),
            foreign_keys: table.foreign_keys.iter().map(ForeignKeySnapshot::from).collect(),
            unique_columns: table
                .unique_indexes
                .iter()
                .map(|index| index.columns.clone())
                .collect(),
        }
    }
}

impl From<&ColumnDef> for ColumnSnapshot {
    fn from(column: &ColumnDef) -> Self {
        Self {
            name: column.name.clone(),
            data_type: column.data_type,
            size: column.size,
            nullable: column.nullable,
            unique: column.unique,
        }
    }
}

impl From<&ColumnSnapshot> for ColumnDef {
    fn from(column: &ColumnSnapshot) -> Self {
        let mut def = ColumnDef::new(&column.name, column.data_type);
        def.size = column.size;
        def.nullable = column.nullable;
        def.unique = column.unique;
        def
    }
}

impl From<&ForeignKeyDef> for ForeignKeySnapshot {
    fn from(fk: &ForeignKeyDef) -> Self {
        Self {
            column: fk.column.clone(),
            referenced_table: fk.references_table.clone(),
            referenced_column: fk.references_column.clone(),
            on_update: fk.on_update,
            on_delete: fk.on_delete,
        }
    }
}

impl From<&ForeignKeySnapshot> for ForeignKeyDef {
    fn from(fk: &ForeignKeySnapshot) -> Self {
        Self {
            column: fk.column.clone(),
            references_table: fk.referenced_table.clone(),
            references_column: fk.referenced_column.clone(),
            on_update: fk.on_update,
            on_delete: fk.on_delete,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::InflectorEquivalence;
    use pretty_assertions::assert_eq;

    fn inferred_catalog() -> Catalog {
        let mut customers = TableDef::new("customers", "customers.csv");
        customers.add_column(
            ColumnDef::new("id", ScalarType::Integer)
                .not_null()
                .unique()
                .with_size(1),
        );
        customers.add_column(ColumnDef::new("email", ScalarType::Text).with_size(12).unique());
        customers.set_primary_key(&["id".to_string()]).unwrap();
        customers.add_unique_index(&["email".to_string()]).unwrap();

        let mut orders = TableDef::new("orders", "orders.csv");
        orders.add_column(ColumnDef::new("id", ScalarType::Integer).not_null());
        orders.add_column(ColumnDef::new("customer_id", ScalarType::Integer));
        orders.add_column(ColumnDef::new("placed", ScalarType::Timestamp));
        orders
            .set_primary_key(&["id".to_string(), "customer_id".to_string()])
            .unwrap();
        orders.add_foreign_key(
            ForeignKeyDef::new("customer_id", "customers", "id").on_delete(ReferentialAction::Cascade),
        );

        let mut catalog = Catalog::new();
        catalog.add_table(customers);
        catalog.add_table(orders);
        catalog
    }

    fn bare_catalog() -> Catalog {
        let mut catalog = Catalog::new();
        for (name, columns) in [("customers", vec!["id", "email"]), ("orders", vec!["id"])] {
            let mut table = TableDef::new(name, format!("{name}.csv"));
            for column in columns {
                table.add_column(ColumnDef::new(column, ScalarType::Text));
            }
            catalog.add_table(table);
        }
        catalog
    }

    #[test]
    fn test_round_trip() {
        let original = inferred_catalog();
        let dir = tempfile::tempdir().unwrap();
        let path = default_path(dir.path(), "public");

        SchemaSnapshot::from_catalog(&original).save(&path).unwrap();
        assert!(path.ends_with("ddl_public.json"));

        let loaded = SchemaSnapshot::load(&path).unwrap();
        assert_eq!(loaded, SchemaSnapshot::from_catalog(&original));

        let mut restored = bare_catalog();
        let diags = loaded.apply(&mut restored, &InflectorEquivalence);
        assert!(diags.is_empty(), "unexpected diagnostics: {:?}", diags);

        for (key, table) in &original.tables {
            let other = &restored.tables[key];
            assert_eq!(table.name, other.name);
            assert_eq!(table.columns, other.columns);
            assert_eq!(table.primary_key, other.primary_key);
            assert_eq!(table.foreign_keys, other.foreign_keys);
            assert_eq!(table.unique_indexes, other.unique_indexes);
        }
    }

    #[test]
    fn test_json_shape() {
        let snapshot = SchemaSnapshot::from_catalog(&inferred_catalog());
        let value = serde_json::to_value(&snapshot).unwrap();

        let orders = &value["orders"];
        assert_eq!(orders["primary_keys"], serde_json::json!(["id", "customer_id"]));
        assert_eq!(orders["columns"][2]["type"], "timestamp");
        assert!(orders["columns"][2].get("size").is_none());
        assert_eq!(orders["foreign_keys"][0]["referenced_table"], "customers");
        assert_eq!(orders["foreign_keys"][0]["on_delete_action"], "CASCADE");
        assert!(orders["foreign_keys"][0]["on_update_action"].is_null());
    }

    #[test]
    fn test_missing_table_is_skipped() {
        let mut snapshot = SchemaSnapshot::from_catalog(&inferred_catalog());
        let mut shipments = snapshot.tables["orders"].clone();
        shipments.source_file = None;
        snapshot.tables.insert("shipments".to_string(), shipments);

        let mut catalog = bare_catalog();
        let diags = snapshot.apply(&mut catalog, &InflectorEquivalence);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, DiagnosticKind::SnapshotTableMissing);
        assert_eq!(diags[0].table.as_deref(), Some("shipments"));
        assert_eq!(catalog.tables["orders.csv"].primary_key, vec!["id", "customer_id"]);
    }

    #[test]
    fn test_renamed_table_is_found_by_source_file() {
        let mut exported = TableDef::new("cust_export", "cust_export.csv");
        exported.add_column(ColumnDef::new("id", ScalarType::Integer));
        exported.rename("clients");
        let mut catalog = Catalog::new();
        catalog.add_table(exported);
        let snapshot = SchemaSnapshot::from_catalog(&catalog);
        assert!(snapshot.tables.contains_key("clients"));

        let mut reloaded = Catalog::new();
        reloaded.add_table(TableDef::new("cust_export", "cust_export.csv"));
        let diags = snapshot.apply(&mut reloaded, &InflectorEquivalence);
        assert!(diags.is_empty());

        let table = &reloaded.tables["cust_export.csv"];
        assert_eq!(table.name, "clients");
        assert_eq!(table.original_name, "cust_export");
        assert_eq!(table.column_names(), vec!["id"]);
    }

    #[test]
    fn test_invalid_snapshot_name_keeps_file_name() {
        let mut snapshot = SchemaSnapshot::from_catalog(&inferred_catalog());
        let orders = snapshot.tables.shift_remove("orders").unwrap();
        snapshot.tables.insert("drop table orders".to_string(), orders);

        let mut catalog = bare_catalog();
        let diags = snapshot.apply(&mut catalog, &InflectorEquivalence);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, DiagnosticKind::NameFallback);
        assert_eq!(diags[0].table.as_deref(), Some("orders"));

        let table = &catalog.tables["orders.csv"];
        assert_eq!(table.name, "orders");
        assert_eq!(table.primary_key, vec!["id", "customer_id"]);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ddl_public.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            SchemaSnapshot::load(&path),
            Err(Error::Snapshot { .. })
        ));
    }
}
