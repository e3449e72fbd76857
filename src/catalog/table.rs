use tracing::{debug, info, warn};

use super::{validate_name, CatalogError, CatalogResult, Metastore};
use crate::data_types::{Record, RecordList, TableDocument, TableStructure};
use crate::repository::interface::Error as RepositoryError;
use crate::schema::{validate_fields, RawField};
use crate::validation::validate_record;

impl Metastore {
    fn table_not_found(database_name: &str, table_name: &str) -> CatalogError {
        CatalogError::TableDoesNotExist {
            database: database_name.to_string(),
            name: table_name.to_string(),
        }
    }

    fn encode(
        database_name: &str,
        document: &TableDocument,
    ) -> CatalogResult<Vec<u8>> {
        document
            .to_bytes()
            .map_err(|source| CatalogError::CorruptDocument {
                database: database_name.to_string(),
                name: document.name.clone(),
                source,
            })
    }

    async fn load_table(
        &self,
        database_name: &str,
        table_name: &str,
    ) -> CatalogResult<TableDocument> {
        let bytes = self
            .repository
            .read_document(database_name, table_name)
            .await
            .map_err(|e| match e {
                RepositoryError::DocumentNotFound { .. }
                | RepositoryError::DatabaseNotFound(_) => {
                    Self::table_not_found(database_name, table_name)
                }
                e => e.into(),
            })?;

        TableDocument::from_bytes(&bytes).map_err(|source| {
            warn!("Table {table_name:?} in database {database_name:?} is unreadable: {source}");
            CatalogError::CorruptDocument {
                database: database_name.to_string(),
                name: table_name.to_string(),
                source,
            }
        })
    }

    /// Create a table document with a fixed schema and no records.
    pub async fn create_table(
        &self,
        database_name: &str,
        table_name: &str,
        raw_fields: &[RawField],
    ) -> CatalogResult<TableDocument> {
        let database_name = validate_name(database_name)?;
        let table_name = validate_name(table_name)?;

        if !self.repository.database_exists(database_name).await? {
            return Err(CatalogError::DatabaseDoesNotExist {
                name: database_name.to_string(),
            });
        }

        let already_exists = || CatalogError::TableAlreadyExists {
            database: database_name.to_string(),
            name: table_name.to_string(),
        };

        if self
            .repository
            .document_exists(database_name, table_name)
            .await?
        {
            return Err(already_exists());
        }

        // Distinguish "no columns at all" from a single malformed column
        if !raw_fields.iter().any(RawField::has_name) {
            return Err(CatalogError::InvalidInput {
                reason: "A table needs at least one named field".to_string(),
            });
        }
        let fields = validate_fields(raw_fields)?;

        let document = TableDocument::new(table_name, fields);
        let bytes = Self::encode(database_name, &document)?;

        self.repository
            .create_document(database_name, table_name, &bytes)
            .await
            .map_err(|e| match e {
                RepositoryError::AlreadyExists(_) => already_exists(),
                RepositoryError::DatabaseNotFound(_) => CatalogError::DatabaseDoesNotExist {
                    name: database_name.to_string(),
                },
                e => e.into(),
            })?;

        info!(
            "Created table {table_name:?} in database {database_name:?} with {} field(s)",
            document.fields.len()
        );
        Ok(document)
    }

    /// Names of all tables in a database, in no particular order
    pub async fn list_tables(&self, database_name: &str) -> CatalogResult<Vec<String>> {
        let database_name = validate_name(database_name)?;

        self.repository
            .list_documents(database_name)
            .await
            .map_err(|e| match e {
                RepositoryError::DatabaseNotFound(_) => CatalogError::DatabaseDoesNotExist {
                    name: database_name.to_string(),
                },
                e => e.into(),
            })
    }

    pub async fn get_table_structure(
        &self,
        database_name: &str,
        table_name: &str,
    ) -> CatalogResult<TableStructure> {
        let database_name = validate_name(database_name)?;
        let table_name = validate_name(table_name)?;

        Ok(self.load_table(database_name, table_name).await?.structure())
    }

    /// Every record of a table, in insertion order, along with its fields
    pub async fn list_records(
        &self,
        database_name: &str,
        table_name: &str,
    ) -> CatalogResult<RecordList> {
        let database_name = validate_name(database_name)?;
        let table_name = validate_name(table_name)?;

        let records = self
            .load_table(database_name, table_name)
            .await?
            .into_record_list();
        debug!(
            "Read {} record(s) from {database_name:?}.{table_name:?}",
            records.count
        );
        Ok(records)
    }

    /// Validate `record` against the table schema and append it.
    ///
    /// The whole document is read, extended and atomically replaced while
    /// holding the table's lock, so concurrent inserts don't lose records.
    pub async fn insert_record(
        &self,
        database_name: &str,
        table_name: &str,
        record: Record,
    ) -> CatalogResult<()> {
        let database_name = validate_name(database_name)?;
        let table_name = validate_name(table_name)?;

        // Tables are never dropped, so only existing ones ever get a lock entry
        if !self
            .repository
            .document_exists(database_name, table_name)
            .await?
        {
            return Err(Self::table_not_found(database_name, table_name));
        }

        let lock = self.table_lock(database_name, table_name);
        let _guard = lock.lock().await;

        let mut document = self.load_table(database_name, table_name).await?;

        if let Err(errors) = validate_record(&document.fields, &record) {
            debug!("Rejected record for {database_name:?}.{table_name:?}: {errors:?}");
            return Err(CatalogError::ValidationFailed { errors });
        }

        document.records.push(record);
        let bytes = Self::encode(database_name, &document)?;

        self.repository
            .replace_document(database_name, table_name, &bytes)
            .await
            .map_err(|e| {
                warn!("Failed to persist {database_name:?}.{table_name:?}: {e}");
                match e {
                    RepositoryError::DocumentNotFound { .. } => {
                        Self::table_not_found(database_name, table_name)
                    }
                    e => e.into(),
                }
            })?;

        debug!(
            "Inserted record into {database_name:?}.{table_name:?} ({} total)",
            document.records.len()
        );
        Ok(())
    }
}
