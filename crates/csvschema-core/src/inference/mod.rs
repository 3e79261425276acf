//! Constraint inference: primary keys, foreign keys, unique indexes and creation order

pub mod keys;
mod lemma;
pub mod ordering;
pub mod relationships;

use crate::error::Diagnostic;
use crate::schema::Catalog;

pub use keys::{assign_primary_keys, assign_unique_indexes, find_primary_key, find_unique_indexes};
pub use lemma::{EntityNameEquivalence, InflectorEquivalence};
pub use ordering::{creation_order, TableOrder};
pub use relationships::resolve_foreign_keys;

/// Runs the constraint phases over a catalog in their fixed order:
/// primary keys, then foreign keys, then unique indexes.
pub struct SchemaInference<'a> {
    equivalence: &'a dyn EntityNameEquivalence,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> SchemaInference<'a> {
    pub fn new(equivalence: &'a dyn EntityNameEquivalence) -> Self {
        Self {
            equivalence,
            diagnostics: Vec::new(),
        }
    }

    /// Infer every constraint and return the diagnostics of this run
    pub fn infer(&mut self, catalog: &mut Catalog) -> Vec<Diagnostic> {
        self.diagnostics.clear();

        self.diagnostics.extend(assign_primary_keys(catalog));
        self.diagnostics
            .extend(resolve_foreign_keys(catalog, self.equivalence));
        self.diagnostics.extend(assign_unique_indexes(catalog));

        std::mem::take(&mut self.diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnDef, TableDef};
    use crate::types::ScalarType;

    fn table(name: &str, columns: &[&str], rows: &[&[&str]]) -> TableDef {
        let mut table = TableDef::new(name, format!("{name}.csv"));
        for column in columns {
            table.add_column(ColumnDef::new(*column, ScalarType::Integer));
        }
        table.rows = rows
            .iter()
            .map(|row| row.iter().map(|v| Some(v.to_string())).collect())
            .collect();
        table
    }

    #[test]
    fn test_phases_run_in_order() {
        let mut catalog = Catalog::new();
        catalog.add_table(table("customers", &["id", "code"], &[&["1", "10"], &["2", "20"]]));
        catalog.add_table(table(
            "orders",
            &["id", "customer_id"],
            &[&["1", "1"], &["2", "1"]],
        ));

        let mut inference = SchemaInference::new(&InflectorEquivalence);
        let diags = inference.infer(&mut catalog);
        assert!(diags.is_empty(), "unexpected diagnostics: {:?}", diags);

        let customers = &catalog.tables["customers.csv"];
        assert_eq!(customers.primary_key, vec!["id"]);
        assert_eq!(customers.unique_indexes.len(), 1);

        let orders = &catalog.tables["orders.csv"];
        assert_eq!(orders.primary_key, vec!["id"]);
        assert_eq!(orders.foreign_keys.len(), 1);
        assert_eq!(orders.foreign_keys[0].references_table, "customers");
        assert!(orders.unique_indexes.is_empty());
    }

    #[test]
    fn test_inference_is_idempotent() {
        let mut catalog = Catalog::new();
        catalog.add_table(table("items", &["id", "sku"], &[&["1", "5"], &["2", "6"]]));

        let mut inference = SchemaInference::new(&InflectorEquivalence);
        inference.infer(&mut catalog);
        let first = catalog.tables["items.csv"].clone();
        inference.infer(&mut catalog);
        let second = &catalog.tables["items.csv"];

        assert_eq!(first.primary_key, second.primary_key);
        assert_eq!(first.unique_indexes, second.unique_indexes);
        assert_eq!(first.foreign_keys, second.foreign_keys);
    }
}
