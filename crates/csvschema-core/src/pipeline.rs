//! Pipeline entry point: load, infer, order

use std::path::Path;

use crate::config::PipelineConfig;
use crate::dialect::{SchemaRenderer, SqlDialect};
use crate::error::{Diagnostic, DiagnosticKind, Error, IdentifierKind, Result};
use crate::inference::{
    creation_order, EntityNameEquivalence, InflectorEquivalence, SchemaInference,
};
use crate::naming::{apply_suggestions, validate_identifier, NamingSuggester};
use crate::schema::{Catalog, CatalogBuilder, TableDef};
use crate::snapshot::SchemaSnapshot;

/// Schema inference over a directory of CSV files
pub struct Pipeline {
    config: PipelineConfig,
    dialect: SqlDialect,
    suggester: Option<Box<dyn NamingSuggester>>,
    equivalence: Box<dyn EntityNameEquivalence>,
}

impl Pipeline {
    /// Create a pipeline; configured table names become the naming suggester
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let dialect = config.sql_dialect()?;
        validate_identifier(IdentifierKind::Schema, &config.schema)?;
        let suggester = config
            .configured_names()
            .map(|names| Box::new(names) as Box<dyn NamingSuggester>);

        Ok(Self {
            config,
            dialect,
            suggester,
            equivalence: Box::new(InflectorEquivalence),
        })
    }

    /// Replace the naming suggester
    pub fn with_suggester(mut self, suggester: Box<dyn NamingSuggester>) -> Self {
        self.suggester = Some(suggester);
        self
    }

    /// Replace the entity-name equivalence used for table lookups
    pub fn with_equivalence(mut self, equivalence: Box<dyn EntityNameEquivalence>) -> Self {
        self.equivalence = equivalence;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load every CSV file of `dir` and infer its schema.
    ///
    /// A readable snapshot replaces inference when `use_snapshot` is set.
    /// Fails with [`Error::NoTables`] when no file could be loaded.
    pub fn run_dir(&self, dir: &Path) -> Result<InferredSchema> {
        let mut builder = CatalogBuilder::new().with_null_values(self.config.null_values.clone());
        builder.load_dir(dir)?;
        let (mut catalog, mut diagnostics) = builder.build();

        if catalog.is_empty() {
            return Err(Error::NoTables {
                dir: dir.to_path_buf(),
            });
        }

        let snapshot_path = self.config.snapshot_path(dir);
        match self.load_snapshot(&snapshot_path) {
            Some(snapshot) => {
                tracing::info!("Using schema snapshot {}", snapshot_path.display());
                diagnostics.push(Diagnostic::info(
                    DiagnosticKind::SnapshotApplied,
                    format!(
                        "constraints restored from '{}' instead of inferred",
                        snapshot_path.display()
                    ),
                ));
                diagnostics.extend(snapshot.apply(&mut catalog, self.equivalence.as_ref()));
            }
            None => {
                diagnostics.extend(self.infer(&mut catalog));
                if self.config.write_snapshot {
                    SchemaSnapshot::from_catalog(&catalog).save(&snapshot_path)?;
                }
            }
        }

        Ok(self.finish(catalog, diagnostics))
    }

    /// Infer the schema of an already loaded catalog
    pub fn run_catalog(&self, mut catalog: Catalog) -> InferredSchema {
        let diagnostics = self.infer(&mut catalog);
        self.finish(catalog, diagnostics)
    }

    fn load_snapshot(&self, path: &Path) -> Option<SchemaSnapshot> {
        if !self.config.use_snapshot || !path.is_file() {
            return None;
        }
        match SchemaSnapshot::load(path) {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                tracing::warn!("Ignoring unreadable snapshot {}: {}", path.display(), err);
                None
            }
        }
    }

    fn infer(&self, catalog: &mut Catalog) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        if let Some(suggester) = &self.suggester {
            diagnostics.extend(apply_suggestions(catalog, suggester.as_ref()));
        }
        diagnostics.extend(SchemaInference::new(self.equivalence.as_ref()).infer(catalog));
        diagnostics
    }

    /// Order the tables and drop foreign keys that point at absent tables
    fn finish(&self, catalog: Catalog, mut diagnostics: Vec<Diagnostic>) -> InferredSchema {
        let equivalence = self.equivalence.as_ref();
        let order = creation_order(&catalog, equivalence);
        diagnostics.extend(order.diagnostics.iter().cloned());

        let resolvable: Vec<Vec<bool>> = catalog
            .tables
            .values()
            .map(|table| {
                table
                    .foreign_keys
                    .iter()
                    .map(|fk| catalog.resolve(&fk.references_table, equivalence).is_some())
                    .collect()
            })
            .collect();
        let cyclic: Vec<String> = order
            .cyclic
            .iter()
            .filter_map(|&i| catalog.tables.get_index(i))
            .map(|(_, table)| table.name.clone())
            .collect();

        let mut slots: Vec<Option<TableDef>> = catalog.tables.into_values().map(Some).collect();
        let mut tables = Vec::with_capacity(slots.len());
        for &index in &order.order {
            let Some(mut table) = slots.get_mut(index).and_then(Option::take) else {
                continue;
            };
            let foreign_keys = std::mem::take(&mut table.foreign_keys);
            table.foreign_keys = foreign_keys
                .into_iter()
                .zip(&resolvable[index])
                .filter(|(_, keep)| **keep)
                .map(|(fk, _)| fk)
                .collect();
            tables.push(table);
        }

        InferredSchema {
            dialect: self.dialect,
            schema: self.config.schema.clone(),
            tables,
            diagnostics,
            cyclic,
        }
    }
}

/// Result of a pipeline run, ready for a renderer
#[derive(Debug, Clone)]
pub struct InferredSchema {
    pub dialect: SqlDialect,
    pub schema: String,
    /// Tables in creation order
    pub tables: Vec<TableDef>,
    pub diagnostics: Vec<Diagnostic>,
    /// Tables whose foreign keys form a cycle
    pub cyclic: Vec<String>,
}

impl InferredSchema {
    pub fn table(&self, name: &str) -> Option<&TableDef> {
        self.tables.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn has_cycle(&self) -> bool {
        !self.cyclic.is_empty()
    }

    /// Statements for every table in creation order: each `CREATE TABLE`
    /// followed by that table's inserts
    pub fn render(&self, renderer: &dyn SchemaRenderer) -> Vec<String> {
        if renderer.dialect() != self.dialect {
            tracing::warn!(
                "Rendering for {} a schema inferred for {}",
                renderer.dialect(),
                self.dialect
            );
        }

        let mut statements = Vec::new();
        for table in &self.tables {
            statements.push(renderer.render_create_table(&self.schema, table));
            statements.extend(renderer.render_inserts(&self.schema, table));
        }
        statements
    }
}
