use std::fmt;
use thiserror::Error;

use crate::schema::TableKind;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TableError {
    #[error("schema mismatch in {table}: {reason}")]
    SchemaMismatch { table: TableKind, reason: String },

    #[error("column '{column}' not found (available: {available})")]
    ColumnNotFound { column: String, available: String },

    #[error("column '{column}' is not numeric")]
    NotNumeric { column: String },

    #[error("column '{column}' has no period dimension (Years/Quarter required)")]
    MissingPeriod { column: String },

    #[error("i/o error on {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("configuration error: {0}")]
    Config(String),
}

pub type TableResult<T> = Result<T, TableError>;

impl TableError {
    pub(crate) fn mismatch(table: TableKind, reason: impl Into<String>) -> Self {
        TableError::SchemaMismatch {
            table,
            reason: reason.into(),
        }
    }
}

/// Non-fatal conditions raised while loading a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadWarning {
    /// The header resolved to nothing in the table's declared column set; the
    /// column was dropped and is reported by its header text.
    UnknownColumn { table: TableKind, column: String },
}

impl fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadWarning::UnknownColumn { table, column } => {
                write!(f, "unknown column '{}' in {} (dropped)", column, table)
            }
        }
    }
}
