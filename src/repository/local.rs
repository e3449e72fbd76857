use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tokio::fs;
use tracing::debug;

use super::interface::{Error, Repository, Result};

pub const DOCUMENT_EXTENSION: &str = "json";

/// Databases are directories under `data_dir`, documents are `<name>.json`
/// files inside them.
#[derive(Debug)]
pub struct LocalRepository {
    pub data_dir: PathBuf,
}

impl LocalRepository {
    pub async fn try_new(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let repo = Self {
            data_dir: data_dir.into(),
        };
        repo.setup().await?;
        Ok(repo)
    }

    fn database_path(&self, database_name: &str) -> PathBuf {
        self.data_dir.join(database_name)
    }

    fn document_path(&self, database_name: &str, document_name: &str) -> PathBuf {
        self.database_path(database_name)
            .join(format!("{document_name}.{DOCUMENT_EXTENSION}"))
    }

    fn document_not_found(database_name: &str, document_name: &str) -> Error {
        Error::DocumentNotFound {
            database: database_name.to_string(),
            document: document_name.to_string(),
        }
    }

    // Write into a temporary file next to the target so that publishing it is a
    // same-filesystem link/rename
    fn write_temp_file(dir: &Path, contents: &[u8]) -> std::io::Result<NamedTempFile> {
        let mut file = NamedTempFile::new_in(dir)?;
        file.write_all(contents)?;
        file.as_file().sync_all()?;
        Ok(file)
    }

    async fn blocking<T, F>(f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        tokio::task::spawn_blocking(f)
            .await
            .map_err(|e| Error::Io(std::io::Error::new(ErrorKind::Other, e)))?
    }
}

async fn is_dir(path: &Path) -> Result<bool> {
    match fs::metadata(path).await {
        Ok(metadata) => Ok(metadata.is_dir()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

async fn is_file(path: &Path) -> Result<bool> {
    match fs::metadata(path).await {
        Ok(metadata) => Ok(metadata.is_file()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl Repository for LocalRepository {
    async fn setup(&self) -> Result<()> {
        fs::create_dir_all(&self.data_dir).await?;
        Ok(())
    }

    async fn create_database(&self, database_name: &str) -> Result<()> {
        // Non-recursive on purpose: an existing directory is an error
        match fs::create_dir(self.database_path(database_name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Err(Error::AlreadyExists(database_name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn database_exists(&self, database_name: &str) -> Result<bool> {
        is_dir(&self.database_path(database_name)).await
    }

    async fn list_databases(&self) -> Result<Vec<String>> {
        let mut entries = fs::read_dir(&self.data_dir).await?;
        let mut databases = vec![];

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) if name.starts_with('.') => {
                    debug!("Skipping hidden directory {name:?}")
                }
                Ok(name) => databases.push(name),
                Err(name) => debug!("Skipping non-UTF-8 directory {name:?}"),
            }
        }

        Ok(databases)
    }

    async fn list_documents(&self, database_name: &str) -> Result<Vec<String>> {
        let mut entries = match fs::read_dir(self.database_path(database_name)).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::DatabaseNotFound(database_name.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        let suffix = format!(".{DOCUMENT_EXTENSION}");
        let mut documents = vec![];

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(name) = entry
                .file_name()
                .to_str()
                .and_then(|name| name.strip_suffix(&suffix))
                .filter(|name| !name.starts_with('.'))
            {
                documents.push(name.to_string());
            }
        }

        Ok(documents)
    }

    async fn document_exists(
        &self,
        database_name: &str,
        document_name: &str,
    ) -> Result<bool> {
        is_file(&self.document_path(database_name, document_name)).await
    }

    async fn read_document(
        &self,
        database_name: &str,
        document_name: &str,
    ) -> Result<Vec<u8>> {
        match fs::read(self.document_path(database_name, document_name)).await {
            Ok(contents) => Ok(contents),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(Self::document_not_found(database_name, document_name))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn create_document(
        &self,
        database_name: &str,
        document_name: &str,
        contents: &[u8],
    ) -> Result<()> {
        let dir = self.database_path(database_name);
        if !is_dir(&dir).await? {
            return Err(Error::DatabaseNotFound(database_name.to_string()));
        }

        let path = self.document_path(database_name, document_name);
        let contents = contents.to_vec();
        let document = document_name.to_string();

        Self::blocking(move || {
            let file = Self::write_temp_file(&dir, &contents)?;
            file.persist_noclobber(&path).map_err(|e| {
                if e.error.kind() == ErrorKind::AlreadyExists {
                    Error::AlreadyExists(document)
                } else {
                    Error::Io(e.error)
                }
            })?;
            Ok(())
        })
        .await
    }

    async fn replace_document(
        &self,
        database_name: &str,
        document_name: &str,
        contents: &[u8],
    ) -> Result<()> {
        let path = self.document_path(database_name, document_name);
        if !is_file(&path).await? {
            return Err(Self::document_not_found(database_name, document_name));
        }

        let dir = self.database_path(database_name);
        let contents = contents.to_vec();

        Self::blocking(move || {
            let file = Self::write_temp_file(&dir, &contents)?;
            file.persist(&path).map_err(|e| Error::Io(e.error))?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tempfile::TempDir;

    use super::super::interface::tests::run_generic_repository_tests;
    use super::*;

    #[tokio::test]
    async fn test_local_repository() {
        let dir = TempDir::new().unwrap();
        let repository = Arc::new(LocalRepository::try_new(dir.path()).await.unwrap());

        run_generic_repository_tests(repository).await;
    }

    #[tokio::test]
    async fn test_setup_creates_data_dir() {
        let dir = TempDir::new().unwrap();
        let data_dir = dir.path().join("nested").join("databases");

        LocalRepository::try_new(&data_dir).await.unwrap();
        assert!(data_dir.is_dir());
    }

    #[tokio::test]
    async fn test_on_disk_layout() {
        let dir = TempDir::new().unwrap();
        let repository = LocalRepository::try_new(dir.path()).await.unwrap();

        repository.create_database("shop").await.unwrap();
        repository
            .create_document("shop", "orders", b"[]")
            .await
            .unwrap();

        let path = dir.path().join("shop").join("orders.json");
        assert_eq!(std::fs::read(&path).unwrap(), b"[]");

        repository
            .replace_document("shop", "orders", b"[1]")
            .await
            .unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"[1]");

        // No temporary files are left behind next to the document
        let entries: Vec<_> = std::fs::read_dir(dir.path().join("shop"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec!["orders.json"]);
    }

    #[tokio::test]
    async fn test_foreign_files_are_ignored() {
        let dir = TempDir::new().unwrap();
        let repository = LocalRepository::try_new(dir.path()).await.unwrap();

        repository.create_database("shop").await.unwrap();
        std::fs::write(dir.path().join("stray.txt"), b"").unwrap();
        std::fs::write(dir.path().join("shop").join("notes.txt"), b"").unwrap();
        std::fs::create_dir(dir.path().join("shop").join("dir.json")).unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        std::fs::write(dir.path().join("shop").join(".hidden.json"), b"{}").unwrap();

        assert_eq!(repository.list_databases().await.unwrap(), vec!["shop"]);
        assert_eq!(
            repository.list_documents("shop").await.unwrap(),
            Vec::<String>::new()
        );
    }
}
