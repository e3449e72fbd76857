use tracing::info;

use super::{validate_name, CatalogError, CatalogResult, Metastore};
use crate::repository::interface::Error as RepositoryError;

impl Metastore {
    pub async fn create_database(&self, name: &str) -> CatalogResult<()> {
        let name = validate_name(name)?;

        self.repository
            .create_database(name)
            .await
            .map_err(|e| match e {
                RepositoryError::AlreadyExists(_) => CatalogError::DatabaseAlreadyExists {
                    name: name.to_string(),
                },
                e => e.into(),
            })?;

        info!("Created database {name:?}");
        Ok(())
    }

    /// Names of all databases, in whatever order the backend yields them
    pub async fn list_databases(&self) -> CatalogResult<Vec<String>> {
        Ok(self.repository.list_databases().await?)
    }
}
