//! Foreign-key inference from column names

use crate::error::{Diagnostic, DiagnosticKind};
use crate::inference::EntityNameEquivalence;
use crate::schema::{Catalog, ForeignKeyDef, TableDef};

const ID_SUFFIX: &str = "_id";
const ID_COLUMN: &str = "id";

/// Infer foreign keys for every non-key column of every table.
///
/// Two strategies are tried per column and the first match wins:
/// 1. another table has a single-column primary key with the same name;
/// 2. the column is `<entity>_id` and a table named after `<entity>` exists.
///
/// Primary keys must already be assigned. Misses are returned as diagnostics
/// and never stop the walk.
pub fn resolve_foreign_keys(
    catalog: &mut Catalog,
    equivalence: &dyn EntityNameEquivalence,
) -> Vec<Diagnostic> {
    let mut proposals: Vec<(usize, ForeignKeyDef)> = Vec::new();
    let mut diagnostics = Vec::new();

    for (index, table) in catalog.tables.values().enumerate() {
        for column in table.columns.keys() {
            if table.is_primary_key(column) {
                continue;
            }

            if let Some(fk) = match_primary_key_name(catalog, index, column) {
                proposals.push((index, fk));
                continue;
            }

            let Some(stem) = column.strip_suffix(ID_SUFFIX).filter(|s| !s.is_empty()) else {
                continue;
            };
            match match_convention(catalog, index, table, column, stem, equivalence) {
                Ok(Some(fk)) => proposals.push((index, fk)),
                Ok(None) => {}
                Err(diag) => diagnostics.push(diag),
            }
        }
    }

    for (index, fk) in proposals {
        if let Some((_, table)) = catalog.tables.get_index_mut(index) {
            let description = format!(
                "{}.{} -> {}.{}",
                table.name, fk.column, fk.references_table, fk.references_column
            );
            if table.add_foreign_key(fk) {
                tracing::info!("Found foreign key: {}", description);
            }
        }
    }

    diagnostics
}

/// Strategy 1: the column shares its name with another table's single-column key.
///
/// When several tables qualify, the one with the smallest name wins so the
/// result does not depend on catalog order.
fn match_primary_key_name(catalog: &Catalog, owner: usize, column: &str) -> Option<ForeignKeyDef> {
    catalog
        .tables
        .values()
        .enumerate()
        .filter(|(index, _)| *index != owner)
        .filter_map(|(_, other)| {
            other
                .single_primary_key()
                .filter(|key| key.eq_ignore_ascii_case(column))
                .map(|key| (other.name.as_str(), key))
        })
        .min_by(|a, b| a.0.cmp(b.0))
        .map(|(table, key)| ForeignKeyDef::new(column, table, key))
}

/// Strategy 2: `<entity>_id` refers to the table named after `<entity>`.
///
/// `Ok(None)` means the column refers to its own table and is left alone.
fn match_convention(
    catalog: &Catalog,
    owner: usize,
    table: &TableDef,
    column: &str,
    stem: &str,
    equivalence: &dyn EntityNameEquivalence,
) -> Result<Option<ForeignKeyDef>, Diagnostic> {
    if table.answers_to(stem, equivalence) {
        tracing::debug!(
            "Skipping {}.{}: refers to its own table",
            table.name,
            column
        );
        return Ok(None);
    }

    let target = match catalog.resolve(stem, equivalence) {
        Some(index) if index == owner => return Ok(None),
        Some(index) => catalog.tables.get_index(index).map(|(_, t)| t),
        None => None,
    };
    let Some(target) = target else {
        tracing::warn!(
            "Referenced table not found for {}.{} (referenced table name: {})",
            table.name,
            column,
            stem
        );
        return Err(Diagnostic::warning(
            DiagnosticKind::UnresolvedForeignKey,
            format!(
                "referenced table not found for {}.{} (referenced table name: {})",
                table.name, column, stem
            ),
        )
        .with_table(&table.name)
        .with_column(column)
        .with_help(format!(
            "add a '{stem}' table or rename the column if it is not a reference"
        )));
    };

    let key_is_id = target.single_primary_key() == Some(ID_COLUMN);
    if key_is_id || target.column_exists(ID_COLUMN) {
        return Ok(Some(ForeignKeyDef::new(column, &target.name, ID_COLUMN)));
    }

    tracing::warn!(
        "Table {} has no '{}' column to reference from {}.{}",
        target.name,
        ID_COLUMN,
        table.name,
        column
    );
    Err(Diagnostic::warning(
        DiagnosticKind::MissingReferencedColumn,
        format!(
            "table '{}' has no '{}' column to reference from {}.{}",
            target.name, ID_COLUMN, table.name, column
        ),
    )
    .with_table(&table.name)
    .with_column(column))
}
