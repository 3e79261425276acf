//! Schema catalog - stores loaded tables, their columns, rows and constraints

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Diagnostic, DiagnosticKind};
use crate::inference::EntityNameEquivalence;
use crate::types::ScalarType;

/// One loaded row; `None` is a missing value
pub type Row = Vec<Option<String>>;

/// Schema catalog - holds every table of one load, in discovery order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    /// Source key (the CSV file name) -> Table
    pub tables: IndexMap<String, TableDef>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table under its source key, replacing an earlier table with the same key
    pub fn add_table(&mut self, table: TableDef) {
        self.tables.insert(table.source_key().to_string(), table);
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Look up a table by its working name, falling back to its original name.
    ///
    /// Exact (case-insensitive) matches win over entity-name matches, and the
    /// working name wins over the original name.
    pub fn resolve(&self, name: &str, equivalence: &dyn EntityNameEquivalence) -> Option<usize> {
        let tables = || self.tables.values().enumerate();
        tables()
            .find(|(_, t)| t.name.eq_ignore_ascii_case(name))
            .or_else(|| tables().find(|(_, t)| t.original_name.eq_ignore_ascii_case(name)))
            .or_else(|| tables().find(|(_, t)| equivalence.equivalent(&t.name, name)))
            .or_else(|| tables().find(|(_, t)| equivalence.equivalent(&t.original_name, name)))
            .map(|(index, _)| index)
    }

    /// Look up a table by name (see [`Catalog::resolve`])
    pub fn find_table(
        &self,
        name: &str,
        equivalence: &dyn EntityNameEquivalence,
    ) -> Option<&TableDef> {
        self.resolve(name, equivalence)
            .and_then(|index| self.tables.get_index(index))
            .map(|(_, table)| table)
    }

    /// Get all working table names in discovery order
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.values().map(|t| t.name.as_str()).collect()
    }
}

/// Table definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableDef {
    /// Working name; may be replaced by a naming suggestion
    pub name: String,
    /// Name derived from the source file; never changes
    pub original_name: String,
    /// File the table was loaded from
    pub source_file: String,
    pub columns: IndexMap<String, ColumnDef>,
    /// Ordered key columns; empty when no key was found
    pub primary_key: Vec<String>,
    pub foreign_keys: Vec<ForeignKeyDef>,
    pub unique_indexes: Vec<UniqueIndexDef>,
    /// Row values in column order
    #[serde(skip)]
    pub rows: Vec<Row>,
}

impl TableDef {
    pub fn new(name: impl Into<String>, source_file: impl Into<String>) -> Self {
        let name = name.into().to_lowercase();
        Self {
            original_name: name.clone(),
            name,
            source_file: source_file.into(),
            columns: IndexMap::new(),
            primary_key: Vec::new(),
            foreign_keys: Vec::new(),
            unique_indexes: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Key under which the catalog stores this table
    pub fn source_key(&self) -> &str {
        if self.source_file.is_empty() {
            &self.original_name
        } else {
            &self.source_file
        }
    }

    /// Add a column; returns false if a column with that name already exists
    pub fn add_column(&mut self, column: ColumnDef) -> bool {
        if self.column_exists(&column.name) {
            return false;
        }
        self.columns.insert(column.name.clone(), column);
        true
    }

    /// Get a column by name
    pub fn get_column(&self, name: &str) -> Option<&ColumnDef> {
        // Case-insensitive lookup
        self.columns
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    pub fn get_column_mut(&mut self, name: &str) -> Option<&mut ColumnDef> {
        self.columns
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    /// Check if a column exists
    pub fn column_exists(&self, name: &str) -> bool {
        self.get_column(name).is_some()
    }

    /// Get all column names
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.keys().map(|s| s.as_str()).collect()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Values of one column, in row order
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = Option<&str>> + '_ {
        self.rows
            .iter()
            .map(move |row| row.get(index).and_then(|v| v.as_deref()))
    }

    /// Replace the primary key.
    ///
    /// Rejects the whole key if any column is unknown; the table keeps its
    /// previous key in that case.
    pub fn set_primary_key(&mut self, columns: &[String]) -> Result<(), Diagnostic> {
        if let Some(missing) = columns.iter().find(|c| !self.column_exists(c)) {
            tracing::warn!(
                "Column {} does not exist in table {}; primary key not set",
                missing,
                self.name
            );
            return Err(Diagnostic::warning(
                DiagnosticKind::UnknownKeyColumn,
                format!(
                    "primary key column '{}' does not exist in table '{}'",
                    missing, self.name
                ),
            )
            .with_table(&self.name)
            .with_column(missing.as_str()));
        }

        let mut key: Vec<String> = Vec::with_capacity(columns.len());
        for column in columns {
            let column = column.to_lowercase();
            if !key.contains(&column) {
                key.push(column);
            }
        }
        self.primary_key = key;
        Ok(())
    }

    pub fn has_primary_key(&self) -> bool {
        !self.primary_key.is_empty()
    }

    /// The key column when the primary key has exactly one column
    pub fn single_primary_key(&self) -> Option<&str> {
        match self.primary_key.as_slice() {
            [only] => Some(only.as_str()),
            _ => None,
        }
    }

    pub fn is_primary_key(&self, column: &str) -> bool {
        self.primary_key.iter().any(|k| k.eq_ignore_ascii_case(column))
    }

    /// Add a foreign key; adding an identical one again is a no-op
    pub fn add_foreign_key(&mut self, foreign_key: ForeignKeyDef) -> bool {
        if self.foreign_keys.iter().any(|fk| fk.same_edge(&foreign_key)) {
            return false;
        }
        self.foreign_keys.push(foreign_key);
        true
    }

    /// Add a unique index over the given columns.
    ///
    /// Unknown columns reject the index; an index already present is a no-op.
    pub fn add_unique_index(&mut self, columns: &[String]) -> Result<bool, Diagnostic> {
        if let Some(missing) = columns.iter().find(|c| !self.column_exists(c)) {
            tracing::warn!(
                "Column {} does not exist in table {}; unique index not added",
                missing,
                self.name
            );
            return Err(Diagnostic::warning(
                DiagnosticKind::UnknownKeyColumn,
                format!(
                    "unique index column '{}' does not exist in table '{}'",
                    missing, self.name
                ),
            )
            .with_table(&self.name)
            .with_column(missing.as_str()));
        }

        let index = UniqueIndexDef {
            columns: columns.iter().map(|c| c.to_lowercase()).collect(),
        };
        if self.unique_indexes.contains(&index) {
            return Ok(false);
        }
        self.unique_indexes.push(index);
        Ok(true)
    }

    /// Change the working name; the original name is kept for lookups
    pub fn rename(&mut self, new_name: &str) {
        let new_name = new_name.to_lowercase();
        if new_name != self.name {
            tracing::info!("Updating table name from {} to {}", self.name, new_name);
            self.name = new_name;
        }
    }

    /// Whether `name` refers to this table by working or original name
    pub fn answers_to(&self, name: &str, equivalence: &dyn EntityNameEquivalence) -> bool {
        equivalence.equivalent(&self.name, name) || equivalence.equivalent(&self.original_name, name)
    }
}

/// Column definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: ScalarType,
    /// Longest observed value, in characters
    pub size: Option<u64>,
    /// At least one value was missing
    pub nullable: bool,
    /// No value repeats across the loaded rows
    pub unique: bool,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, data_type: ScalarType) -> Self {
        Self {
            name: name.into().to_lowercase(),
            data_type,
            size: None,
            nullable: true,
            unique: false,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }
}

/// Referential action attached to a foreign key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferentialAction {
    #[serde(rename = "NO ACTION")]
    NoAction,
    #[serde(rename = "RESTRICT")]
    Restrict,
    #[serde(rename = "CASCADE")]
    Cascade,
    #[serde(rename = "SET NULL")]
    SetNull,
    #[serde(rename = "SET DEFAULT")]
    SetDefault,
}

impl std::fmt::Display for ReferentialAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            ReferentialAction::NoAction => "NO ACTION",
            ReferentialAction::Restrict => "RESTRICT",
            ReferentialAction::Cascade => "CASCADE",
            ReferentialAction::SetNull => "SET NULL",
            ReferentialAction::SetDefault => "SET DEFAULT",
        };
        f.write_str(text)
    }
}

/// Foreign key constraint
///
/// The referenced table is held by name and is not checked on construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForeignKeyDef {
    pub column: String,
    pub references_table: String,
    pub references_column: String,
    pub on_update: Option<ReferentialAction>,
    pub on_delete: Option<ReferentialAction>,
}

impl ForeignKeyDef {
    pub fn new(
        column: impl Into<String>,
        references_table: impl Into<String>,
        references_column: impl Into<String>,
    ) -> Self {
        Self {
            column: column.into(),
            references_table: references_table.into(),
            references_column: references_column.into(),
            on_update: None,
            on_delete: None,
        }
    }

    pub fn on_update(mut self, action: ReferentialAction) -> Self {
        self.on_update = Some(action);
        self
    }

    pub fn on_delete(mut self, action: ReferentialAction) -> Self {
        self.on_delete = Some(action);
        self
    }

    /// Same (column, table, column) triple, ignoring actions
    pub fn same_edge(&self, other: &ForeignKeyDef) -> bool {
        self.column.eq_ignore_ascii_case(&other.column)
            && self.references_table.eq_ignore_ascii_case(&other.references_table)
            && self
                .references_column
                .eq_ignore_ascii_case(&other.references_column)
    }
}

/// Unique index over one or more columns
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UniqueIndexDef {
    pub columns: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::InflectorEquivalence;

    fn table_with(name: &str, columns: &[&str]) -> TableDef {
        let mut table = TableDef::new(name, format!("{name}.csv"));
        for column in columns {
            table.add_column(ColumnDef::new(*column, ScalarType::Integer));
        }
        table
    }

    #[test]
    fn test_column_names_are_lowercased_and_unique() {
        let mut table = TableDef::new("Orders", "Orders.csv");
        assert!(table.add_column(ColumnDef::new("ID", ScalarType::Integer)));
        assert!(!table.add_column(ColumnDef::new("id", ScalarType::Text)));
        assert_eq!(table.column_names(), vec!["id"]);
        assert_eq!(table.name, "orders");
    }

    #[test]
    fn test_set_primary_key_rejects_unknown_column() {
        let mut table = table_with("orders", &["id", "total"]);
        table.set_primary_key(&["id".to_string()]).unwrap();

        let err = table
            .set_primary_key(&["id".to_string(), "missing".to_string()])
            .unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::UnknownKeyColumn);
        assert_eq!(err.column.as_deref(), Some("missing"));
        assert_eq!(table.primary_key, vec!["id"]);
        assert_eq!(table.single_primary_key(), Some("id"));
    }

    #[test]
    fn test_add_foreign_key_is_a_set() {
        let mut table = table_with("orders", &["id", "customer_id"]);
        let fk = ForeignKeyDef::new("customer_id", "customers", "id");
        assert!(table.add_foreign_key(fk.clone()));
        assert!(!table.add_foreign_key(fk.on_delete(ReferentialAction::Cascade)));
        assert_eq!(table.foreign_keys.len(), 1);
    }

    #[test]
    fn test_add_unique_index() {
        let mut table = table_with("users", &["id", "email"]);
        assert!(table.add_unique_index(&["email".to_string()]).unwrap());
        assert!(!table.add_unique_index(&["EMAIL".to_string()]).unwrap());
        assert!(table.add_unique_index(&["phone".to_string()]).is_err());
        assert_eq!(table.unique_indexes.len(), 1);
    }

    #[test]
    fn test_resolve_falls_back_to_original_name() {
        let mut catalog = Catalog::new();
        let mut customers = table_with("cust_export", &["id"]);
        customers.rename("customers");
        catalog.add_table(customers);
        catalog.add_table(table_with("orders", &["id"]));

        let eq = InflectorEquivalence;
        assert_eq!(catalog.resolve("customers", &eq), Some(0));
        assert_eq!(catalog.resolve("cust_export", &eq), Some(0));
        assert_eq!(catalog.resolve("customer", &eq), Some(0));
        assert_eq!(catalog.resolve("order", &eq), Some(1));
        assert_eq!(catalog.resolve("invoices", &eq), None);
    }
}
