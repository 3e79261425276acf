//! Schema management module

mod builder;
mod catalog;

pub use builder::{sniff_delimiter, CatalogBuilder, DEFAULT_NULL_VALUES};
pub use catalog::{
    Catalog, ColumnDef, ForeignKeyDef, ReferentialAction, Row, TableDef, UniqueIndexDef,
};
