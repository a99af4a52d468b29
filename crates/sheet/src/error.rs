use gridgraph_primitives::AddressError;
use thiserror::Error;

/// Errors that can occur during table operations
#[derive(Error, Debug)]
pub enum TableError {
    #[error("Invalid position: {0}")]
    InvalidPosition(#[from] AddressError),

    #[error("Invalid cell notation: {0}")]
    InvalidCellNotation(String),

    #[error("{kind} position {position} is already occupied in table '{table}'")]
    PositionOccupied {
        kind: &'static str,
        position: usize,
        table: String,
    },

    #[error("Row not found at position {position} (table has {count} rows)")]
    RowNotFound { position: usize, count: usize },

    #[error("Column not found at position {position} (table has {count} columns)")]
    ColumnNotFound { position: usize, count: usize },

    #[error("Column not found: {name}")]
    ColumnNameNotFound { name: String },

    #[error("Cell not found: {0}")]
    CellNotFound(String),

    #[error("Invalid row order: {0}")]
    InvalidRowOrder(String),

    #[error("Invalid cell value: {reason}")]
    InvalidCellValue { reason: String },

    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("Unknown type: {0}")]
    UnknownType(String),

    #[error("Field not found: {field} on {owner}")]
    FieldNotFound { field: String, owner: String },

    #[error("Operation not supported: {0}")]
    Unsupported(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Serialize error: {0}")]
    Serialize(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TableError {
    /// Build a domain-rule violation such as a duplicate dictionary key.
    pub fn invalid_value(reason: impl Into<String>) -> Self {
        TableError::InvalidCellValue {
            reason: reason.into(),
        }
    }

    /// Whether this error is a domain-rule violation the caller can revert,
    /// as opposed to a structural or argument error.
    #[must_use]
    pub fn is_invalid_cell_value(&self) -> bool {
        matches!(self, TableError::InvalidCellValue { .. })
    }
}

pub type Result<T> = std::result::Result<T, TableError>;
