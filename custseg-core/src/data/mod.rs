//! Data engineering: tables, schema declaration, document store ingestion.

pub mod ingestion;
pub mod schema;
pub mod source;
pub mod table;

pub use ingestion::DataIngestion;
pub use schema::{ColumnSchema, ColumnType, SchemaDefinition};
pub use source::{Document, DocumentStore, JsonlDocumentStore, connect};
pub use table::Table;
