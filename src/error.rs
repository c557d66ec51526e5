use crate::types::Pt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error(
        "improper number of columns in block {block}, row {row}: expected {expected}, found {found}"
    )]
    ColumnMismatch {
        block: usize,
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("failed to fit table data within boundaries: too wide by {overage}")]
    LayoutOverflow { overage: Pt },
    #[error("invalid column constraint: {0}")]
    InvalidConstraint(String),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("invalid table description: {0}")]
    InvalidTable(String),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("pdf error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TableError>;
