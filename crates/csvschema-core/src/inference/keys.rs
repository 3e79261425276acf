//! Primary-key and unique-index discovery over loaded rows

use std::collections::HashSet;

use crate::error::{Diagnostic, DiagnosticKind};
use crate::schema::{Catalog, TableDef};
use crate::types::ScalarType;

/// Find the shortest prefix of the declared columns that has no duplicate rows.
///
/// Only prefixes are tried, `1..column_count` columns long, so a table with a
/// single column never gets a key and keys that are not a prefix are missed.
/// An empty result means no key was found.
pub fn find_primary_key(table: &TableDef) -> Vec<String> {
    let column_count = table.columns.len();
    let types: Vec<ScalarType> = table.columns.values().map(|c| c.data_type).collect();

    for width in 1..column_count {
        if has_duplicate_prefix(table, &types[..width]) {
            tracing::debug!(
                "Table {}: first {} column(s) contain duplicates",
                table.name,
                width
            );
            continue;
        }
        return table
            .columns
            .keys()
            .take(width)
            .cloned()
            .collect();
    }

    Vec::new()
}

/// Whether two rows collide on the first `types.len()` columns.
///
/// Missing values compare equal to each other.
fn has_duplicate_prefix(table: &TableDef, types: &[ScalarType]) -> bool {
    let mut seen: HashSet<Vec<Option<String>>> = HashSet::with_capacity(table.row_count());
    for row in &table.rows {
        let key: Vec<Option<String>> = types
            .iter()
            .enumerate()
            .map(|(i, ty)| {
                row.get(i)
                    .and_then(|v| v.as_deref())
                    .map(|v| ty.canonical(v))
            })
            .collect();
        if !seen.insert(key) {
            return true;
        }
    }
    false
}

/// Find columns outside the primary key whose values are all present and distinct
pub fn find_unique_indexes(table: &TableDef) -> Vec<String> {
    let row_count = table.row_count();
    if row_count == 0 {
        return Vec::new();
    }

    table
        .columns
        .values()
        .enumerate()
        .filter(|(_, column)| !table.is_primary_key(&column.name))
        .filter(|(index, column)| {
            let distinct: HashSet<String> = table
                .column_values(*index)
                .flatten()
                .map(|v| column.data_type.canonical(v))
                .collect();
            distinct.len() == row_count
        })
        .map(|(_, column)| column.name.clone())
        .collect()
}

/// Assign a primary key to every table in the catalog
pub fn assign_primary_keys(catalog: &mut Catalog) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    for table in catalog.tables.values_mut() {
        let key = find_primary_key(table);

        if key.is_empty() {
            tracing::warn!("No primary key found for table {}", table.name);
            let mut diag = Diagnostic::warning(
                DiagnosticKind::NoPrimaryKey,
                format!("no primary key found for table '{}'", table.name),
            )
            .with_table(&table.name);
            if table.columns.len() < 2 {
                diag = diag.with_help("tables with a single column never get a primary key");
            }
            diagnostics.push(diag);
            table.primary_key.clear();
            continue;
        }

        tracing::info!(
            "Found primary key for table {}: {}",
            table.name,
            key.join(", ")
        );
        if let Err(diag) = table.set_primary_key(&key) {
            diagnostics.push(diag);
            continue;
        }
        if let [only] = key.as_slice() {
            if let Some(column) = table.get_column_mut(only) {
                column.unique = true;
            }
        }
    }

    diagnostics
}

/// Add a unique index for every qualifying column of every table
pub fn assign_unique_indexes(catalog: &mut Catalog) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    for table in catalog.tables.values_mut() {
        let candidates = find_unique_indexes(table);
        if candidates.is_empty() {
            continue;
        }

        tracing::info!(
            "Found unique indexes for table {}: {}",
            table.name,
            candidates.join(", ")
        );
        for column in candidates {
            match table.add_unique_index(std::slice::from_ref(&column)) {
                Ok(_) => {
                    if let Some(def) = table.get_column_mut(&column) {
                        def.unique = true;
                    }
                }
                Err(diag) => diagnostics.push(diag),
            }
        }
    }

    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnDef;

    fn table(columns: &[(&str, ScalarType)], rows: &[&[Option<&str>]]) -> TableDef {
        let mut table = TableDef::new("t", "t.csv");
        for (name, ty) in columns {
            table.add_column(ColumnDef::new(*name, *ty));
        }
        table.rows = rows
            .iter()
            .map(|row| row.iter().map(|v| v.map(str::to_string)).collect())
            .collect();
        table
    }

    #[test]
    fn test_single_column_key() {
        let t = table(
            &[("id", ScalarType::Integer), ("name", ScalarType::Text)],
            &[&[Some("1"), Some("a")], &[Some("2"), Some("a")]],
        );
        assert_eq!(find_primary_key(&t), vec!["id"]);
    }

    #[test]
    fn test_composite_prefix_key() {
        let t = table(
            &[
                ("order_id", ScalarType::Integer),
                ("line", ScalarType::Integer),
                ("sku", ScalarType::Text),
            ],
            &[
                &[Some("1"), Some("1"), Some("a")],
                &[Some("1"), Some("2"), Some("b")],
                &[Some("2"), Some("1"), Some("a")],
            ],
        );
        assert_eq!(find_primary_key(&t), vec!["order_id", "line"]);
    }

    #[test]
    fn test_non_prefix_key_is_missed() {
        // "code" is unique but is not a prefix; the full width is never tried
        let t = table(
            &[("kind", ScalarType::Text), ("code", ScalarType::Text)],
            &[&[Some("x"), Some("1")], &[Some("x"), Some("2")]],
        );
        assert!(find_primary_key(&t).is_empty());
    }

    #[test]
    fn test_single_column_table_has_no_key() {
        let t = table(&[("id", ScalarType::Integer)], &[&[Some("1")], &[Some("2")]]);
        assert!(find_primary_key(&t).is_empty());
    }

    #[test]
    fn test_missing_values_collide() {
        let t = table(
            &[
                ("id", ScalarType::Integer),
                ("name", ScalarType::Text),
                ("note", ScalarType::Text),
            ],
            &[&[None, Some("a"), None], &[None, Some("b"), None]],
        );
        assert_eq!(find_primary_key(&t), vec!["id", "name"]);
    }

    #[test]
    fn test_float_values_compare_by_value() {
        let t = table(
            &[("amount", ScalarType::Float), ("note", ScalarType::Text)],
            &[&[Some("1.0"), Some("a")], &[Some("1"), Some("b")]],
        );
        assert!(find_primary_key(&t).is_empty());
    }

    #[test]
    fn test_unique_indexes_skip_key_and_nulls() {
        let mut t = table(
            &[
                ("id", ScalarType::Integer),
                ("email", ScalarType::Text),
                ("phone", ScalarType::Text),
                ("city", ScalarType::Text),
            ],
            &[
                &[Some("1"), Some("a@x"), Some("555"), Some("Oslo")],
                &[Some("2"), Some("b@x"), None, Some("Oslo")],
            ],
        );
        t.set_primary_key(&["id".to_string()]).unwrap();
        assert_eq!(find_unique_indexes(&t), vec!["email"]);
    }

    #[test]
    fn test_assign_is_idempotent() {
        let mut catalog = Catalog::new();
        catalog.add_table(table(
            &[("id", ScalarType::Integer), ("email", ScalarType::Text)],
            &[&[Some("1"), Some("a@x")], &[Some("2"), Some("b@x")]],
        ));

        for _ in 0..2 {
            assert!(assign_primary_keys(&mut catalog).is_empty());
            assert!(assign_unique_indexes(&mut catalog).is_empty());
        }

        let t = &catalog.tables["t.csv"];
        assert_eq!(t.primary_key, vec!["id"]);
        assert_eq!(t.unique_indexes.len(), 1);
        assert_eq!(t.unique_indexes[0].columns, vec!["email"]);
        assert!(t.get_column("id").unwrap().unique);
        assert!(t.get_column("email").unwrap().unique);
    }

    #[test]
    fn test_no_key_is_reported() {
        let mut catalog = Catalog::new();
        catalog.add_table(table(&[("only", ScalarType::Text)], &[&[Some("a")]]));

        let diags = assign_primary_keys(&mut catalog);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, DiagnosticKind::NoPrimaryKey);
        assert_eq!(diags[0].table.as_deref(), Some("t"));
        assert!(diags[0].help.is_some());
    }
}
