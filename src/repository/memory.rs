use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::interface::{Error, Repository, Result};

type Documents = HashMap<String, Vec<u8>>;

/// Keeps every database in process memory; contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    databases: RwLock<HashMap<String, Documents>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn setup(&self) -> Result<()> {
        Ok(())
    }

    async fn create_database(&self, database_name: &str) -> Result<()> {
        let mut databases = self.databases.write();
        if databases.contains_key(database_name) {
            return Err(Error::AlreadyExists(database_name.to_string()));
        }
        databases.insert(database_name.to_string(), Documents::new());
        Ok(())
    }

    async fn database_exists(&self, database_name: &str) -> Result<bool> {
        Ok(self.databases.read().contains_key(database_name))
    }

    async fn list_databases(&self) -> Result<Vec<String>> {
        Ok(self.databases.read().keys().cloned().collect())
    }

    async fn list_documents(&self, database_name: &str) -> Result<Vec<String>> {
        self.databases
            .read()
            .get(database_name)
            .map(|documents| documents.keys().cloned().collect())
            .ok_or_else(|| Error::DatabaseNotFound(database_name.to_string()))
    }

    async fn document_exists(
        &self,
        database_name: &str,
        document_name: &str,
    ) -> Result<bool> {
        Ok(self
            .databases
            .read()
            .get(database_name)
            .map_or(false, |documents| documents.contains_key(document_name)))
    }

    async fn read_document(
        &self,
        database_name: &str,
        document_name: &str,
    ) -> Result<Vec<u8>> {
        self.databases
            .read()
            .get(database_name)
            .and_then(|documents| documents.get(document_name))
            .cloned()
            .ok_or_else(|| Error::DocumentNotFound {
                database: database_name.to_string(),
                document: document_name.to_string(),
            })
    }

    async fn create_document(
        &self,
        database_name: &str,
        document_name: &str,
        contents: &[u8],
    ) -> Result<()> {
        let mut databases = self.databases.write();
        let documents = databases
            .get_mut(database_name)
            .ok_or_else(|| Error::DatabaseNotFound(database_name.to_string()))?;

        if documents.contains_key(document_name) {
            return Err(Error::AlreadyExists(document_name.to_string()));
        }
        documents.insert(document_name.to_string(), contents.to_vec());
        Ok(())
    }

    async fn replace_document(
        &self,
        database_name: &str,
        document_name: &str,
        contents: &[u8],
    ) -> Result<()> {
        let mut databases = self.databases.write();
        let document = databases
            .get_mut(database_name)
            .and_then(|documents| documents.get_mut(document_name))
            .ok_or_else(|| Error::DocumentNotFound {
                database: database_name.to_string(),
                document: document_name.to_string(),
            })?;

        *document = contents.to_vec();
        Ok(())
    }
}
