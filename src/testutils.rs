use std::sync::Arc;

use crate::catalog::Metastore;
use crate::repository::memory::MemoryRepository;
use crate::schema::RawField;

pub fn in_memory_metastore() -> Metastore {
    Metastore::new_from_repository(Arc::new(MemoryRepository::new()))
}

/// An in-memory metastore with database `db1` holding an empty table `t1`
/// that has a single required INT field `id`
pub async fn metastore_with_table() -> Metastore {
    let metastore = in_memory_metastore();

    metastore
        .create_database("db1")
        .await
        .expect("Error creating database");
    metastore
        .create_table("db1", "t1", &[RawField::new("id", "INT")])
        .await
        .expect("Error creating table");

    metastore
}
