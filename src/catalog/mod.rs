use crate::repository::interface::Error as RepositoryError;
use crate::schema::SchemaError;

mod database;
pub mod metastore;
mod table;

pub use metastore::Metastore;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Invalid name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("{reason}")]
    InvalidInput { reason: String },

    #[error("Invalid field definition: {0}")]
    InvalidField(#[from] SchemaError),

    // Database errors
    #[error("Database {name:?} doesn't exist")]
    DatabaseDoesNotExist { name: String },

    #[error("Database {name:?} already exists")]
    DatabaseAlreadyExists { name: String },

    // Table errors
    #[error("Table {name:?} doesn't exist in database {database:?}")]
    TableDoesNotExist { database: String, name: String },

    #[error("Table {name:?} already exists in database {database:?}")]
    TableAlreadyExists { database: String, name: String },

    // Record errors
    #[error("Record rejected: {}", errors.join(", "))]
    ValidationFailed { errors: Vec<String> },

    // Persistence errors
    #[error("Storage failure: {0}")]
    Storage(#[from] RepositoryError),

    #[error("Table document {name:?} in database {database:?} is unreadable: {source}")]
    CorruptDocument {
        database: String,
        name: String,
        source: serde_json::Error,
    },
}

/// Broad failure categories that callers react to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    AlreadyExists,
    ValidationFailed,
    StorageFailure,
}

impl CatalogError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CatalogError::InvalidName { .. }
            | CatalogError::InvalidInput { .. }
            | CatalogError::InvalidField(_) => ErrorKind::InvalidInput,
            CatalogError::DatabaseDoesNotExist { .. }
            | CatalogError::TableDoesNotExist { .. } => ErrorKind::NotFound,
            CatalogError::DatabaseAlreadyExists { .. }
            | CatalogError::TableAlreadyExists { .. } => ErrorKind::AlreadyExists,
            CatalogError::ValidationFailed { .. } => ErrorKind::ValidationFailed,
            CatalogError::Storage(_) | CatalogError::CorruptDocument { .. } => {
                ErrorKind::StorageFailure
            }
        }
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;

// Leaves room for the document extension within the usual 255-byte file name limit
const MAX_NAME_BYTES: usize = 250;

/// Check a database or table name and return it trimmed.
///
/// Names end up as path components, so anything that could escape the data
/// directory or produce a hidden file is refused.
pub fn validate_name(name: &str) -> CatalogResult<&str> {
    let trimmed = name.trim();
    let invalid = |reason| {
        Err(CatalogError::InvalidName {
            name: name.to_string(),
            reason,
        })
    };

    if trimmed.is_empty() {
        invalid("name is empty")
    } else if trimmed.starts_with('.') {
        invalid("name must not start with '.'")
    } else if trimmed.len() > MAX_NAME_BYTES {
        invalid("name is too long")
    } else if trimmed.contains(&['/', '\\', '\0'][..]) {
        invalid("name must not contain path separators")
    } else {
        Ok(trimmed)
    }
}
