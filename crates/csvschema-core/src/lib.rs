//! csvschema-core: relational schema inference for CSV files
//!
//! This library loads a directory of CSV files, infers primary keys,
//! foreign keys and unique indexes from the data, and orders the tables so
//! that every referenced table is created before the tables that reference it.
//! Rendering the result as SQL is left to a [`SchemaRenderer`].

pub mod config;
pub mod dialect;
pub mod error;
pub mod inference;
pub mod naming;
pub mod pipeline;
pub mod schema;
pub mod snapshot;
pub mod types;

pub use config::PipelineConfig;
pub use dialect::{SchemaRenderer, SqlDialect};
pub use error::{Diagnostic, DiagnosticKind, Error, Result, Severity};
pub use inference::{EntityNameEquivalence, InflectorEquivalence, SchemaInference, TableOrder};
pub use naming::{ConfiguredNames, NamingSuggester};
pub use pipeline::{InferredSchema, Pipeline};
pub use schema::{Catalog, CatalogBuilder, ColumnDef, ForeignKeyDef, TableDef};
pub use snapshot::SchemaSnapshot;
pub use types::ScalarType;
