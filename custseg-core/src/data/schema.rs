//! Schema declaration for the customer dataset.
//!
//! The schema is an ordered column list read once from a YAML file:
//!
//! ```yaml
//! columns:
//!   - Age: int
//!   - Income: float
//!   - name: Recency
//!     dtype: int
//!     nullable: true
//! ```

use crate::error::{Result, SegmentError, Stage};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Column data type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Integer,
    Float,
    Category,
    Unknown,
}

impl ColumnType {
    /// Map the dtype spellings used in schema files.
    pub fn from_decl(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "int" | "int32" | "int64" | "integer" => Self::Integer,
            "float" | "float32" | "float64" | "double" => Self::Float,
            "category" | "object" | "string" | "str" => Self::Category,
            _ => Self::Unknown,
        }
    }
}

/// Schema for a single column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub dtype: ColumnType,
    #[serde(default)]
    pub nullable: bool,
}

/// Ordered, immutable schema definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    pub columns: Vec<ColumnSchema>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ColumnDecl {
    Full {
        name: String,
        dtype: String,
        #[serde(default)]
        nullable: bool,
    },
    Short(BTreeMap<String, String>),
    Name(String),
}

#[derive(Deserialize)]
struct SchemaFile {
    columns: Vec<ColumnDecl>,
}

impl SchemaDefinition {
    /// Schema of untyped columns with the given names.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: names
                .into_iter()
                .map(|n| ColumnSchema {
                    name: n.into(),
                    dtype: ColumnType::Unknown,
                    nullable: true,
                })
                .collect(),
        }
    }

    /// Parse a YAML schema declaration.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let file: SchemaFile = serde_yaml::from_str(yaml)
            .map_err(|e| SegmentError::serialization(Stage::Validation, "parsing schema", e))?;

        let mut columns = Vec::with_capacity(file.columns.len());
        for decl in file.columns {
            match decl {
                ColumnDecl::Full {
                    name,
                    dtype,
                    nullable,
                } => columns.push(ColumnSchema {
                    name,
                    dtype: ColumnType::from_decl(&dtype),
                    nullable,
                }),
                ColumnDecl::Short(map) => {
                    if map.len() != 1 {
                        return Err(SegmentError::schema_mismatch(
                            Stage::Validation,
                            format!("column entry must have exactly one key, got {}", map.len()),
                        ));
                    }
                    for (name, dtype) in map {
                        columns.push(ColumnSchema {
                            name,
                            dtype: ColumnType::from_decl(&dtype),
                            nullable: false,
                        });
                    }
                }
                ColumnDecl::Name(name) => columns.push(ColumnSchema {
                    name,
                    dtype: ColumnType::Unknown,
                    nullable: true,
                }),
            }
        }

        if columns.is_empty() {
            return Err(SegmentError::schema_mismatch(
                Stage::Validation,
                "schema declares no columns",
            ));
        }
        Ok(Self { columns })
    }

    /// Load the schema file.
    pub fn load(path: &Path) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| SegmentError::from_io(Stage::Validation, path, e))?;
        Self::from_yaml_str(&yaml)
    }

    /// Column names in declaration order.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
