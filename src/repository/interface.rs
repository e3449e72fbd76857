use std::fmt::Debug;

use async_trait::async_trait;

/// Backend-level outcomes, independent of how documents are stored
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Database {0:?} not found")]
    DatabaseNotFound(String),

    #[error("Document {document:?} not found in database {database:?}")]
    DocumentNotFound { database: String, document: String },

    #[error("{0:?} already exists")]
    AlreadyExists(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Storage for named databases, each holding named, opaque documents.
///
/// Implementations must make `create_database` and `create_document` fail with
/// `AlreadyExists` instead of overwriting, and `replace_document` must never
/// leave a partially written document behind.
#[async_trait]
pub trait Repository: Send + Sync + Debug {
    async fn setup(&self) -> Result<()>;

    async fn create_database(&self, database_name: &str) -> Result<()>;

    async fn database_exists(&self, database_name: &str) -> Result<bool>;

    /// All database names, in no particular order
    async fn list_databases(&self) -> Result<Vec<String>>;

    /// All document names in a database, in no particular order
    async fn list_documents(&self, database_name: &str) -> Result<Vec<String>>;

    async fn document_exists(
        &self,
        database_name: &str,
        document_name: &str,
    ) -> Result<bool>;

    async fn read_document(
        &self,
        database_name: &str,
        document_name: &str,
    ) -> Result<Vec<u8>>;

    async fn create_document(
        &self,
        database_name: &str,
        document_name: &str,
        contents: &[u8],
    ) -> Result<()>;

    async fn replace_document(
        &self,
        database_name: &str,
        document_name: &str,
        contents: &[u8],
    ) -> Result<()>;
}
