//! Table creation order from foreign-key dependencies

use std::collections::{BTreeSet, VecDeque};

use crate::error::{Diagnostic, DiagnosticKind};
use crate::inference::EntityNameEquivalence;
use crate::schema::Catalog;

/// Creation order over catalog positions
#[derive(Debug, Clone, Default)]
pub struct TableOrder {
    /// Every table exactly once; referenced tables come before their dependents
    /// except among `cyclic`, which are appended last in discovery order
    pub order: Vec<usize>,
    /// Tables left over by a foreign-key cycle
    pub cyclic: Vec<usize>,
    pub diagnostics: Vec<Diagnostic>,
}

impl TableOrder {
    pub fn is_cyclic(&self) -> bool {
        !self.cyclic.is_empty()
    }
}

/// Sort tables so that every referenced table is created first.
///
/// Kahn's algorithm, seeded and expanded in discovery order. Self-references
/// and references to absent tables add no edge.
pub fn creation_order(catalog: &Catalog, equivalence: &dyn EntityNameEquivalence) -> TableOrder {
    let count = catalog.len();
    let mut dependents: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); count];
    let mut in_degree = vec![0usize; count];
    let mut diagnostics = Vec::new();

    for (index, table) in catalog.tables.values().enumerate() {
        for fk in &table.foreign_keys {
            match catalog.resolve(&fk.references_table, equivalence) {
                Some(referenced) if referenced == index => {}
                Some(referenced) => {
                    // Several keys towards the same table count as one edge
                    if dependents[referenced].insert(index) {
                        in_degree[index] += 1;
                    }
                }
                None => {
                    tracing::warn!(
                        "Foreign key {}.{} references missing table {}",
                        table.name,
                        fk.column,
                        fk.references_table
                    );
                    diagnostics.push(
                        Diagnostic::warning(
                            DiagnosticKind::DanglingReference,
                            format!(
                                "foreign key {}.{} references missing table '{}'",
                                table.name, fk.column, fk.references_table
                            ),
                        )
                        .with_table(&table.name)
                        .with_column(&fk.column),
                    );
                }
            }
        }
    }

    let mut queue: VecDeque<usize> = (0..count).filter(|&i| in_degree[i] == 0).collect();
    let mut placed = vec![false; count];
    let mut order = Vec::with_capacity(count);

    while let Some(index) = queue.pop_front() {
        placed[index] = true;
        order.push(index);
        for &dependent in &dependents[index] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                queue.push_back(dependent);
            }
        }
    }

    let cyclic: Vec<usize> = (0..count).filter(|&i| !placed[i]).collect();
    if !cyclic.is_empty() {
        let names: Vec<&str> = cyclic
            .iter()
            .filter_map(|&i| catalog.tables.get_index(i))
            .map(|(_, t)| t.name.as_str())
            .collect();
        tracing::warn!(
            "Circular dependency detected among tables: {}",
            names.join(", ")
        );
        diagnostics.push(
            Diagnostic::warning(
                DiagnosticKind::DependencyCycle,
                format!("circular foreign-key dependency among: {}", names.join(", ")),
            )
            .with_help("these tables are created in discovery order; add their foreign keys after loading"),
        );
        order.extend(&cyclic);
    }

    TableOrder {
        order,
        cyclic,
        diagnostics,
    }
}
