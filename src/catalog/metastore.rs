use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::repository::interface::Repository;

type TableKey = (String, String);

// Entry point to all databases and tables. It is decoupled from the
// persistence mechanism, which is whatever `Repository` it is built from.
#[derive(Debug, Clone)]
pub struct Metastore {
    pub repository: Arc<dyn Repository>,
    // One writer at a time per table: inserts are a read-modify-write of the
    // whole document
    table_locks: Arc<DashMap<TableKey, Arc<Mutex<()>>>>,
}

impl Metastore {
    pub fn new_from_repository(repository: Arc<dyn Repository>) -> Self {
        Self {
            repository,
            table_locks: Arc::new(DashMap::new()),
        }
    }

    pub(super) fn table_lock(&self, database_name: &str, table_name: &str) -> Arc<Mutex<()>> {
        self.table_locks
            .entry((database_name.to_string(), table_name.to_string()))
            .or_default()
            .clone()
    }

    #[cfg(test)]
    pub(super) fn table_lock_count(&self) -> usize {
        self.table_locks.len()
    }
}
