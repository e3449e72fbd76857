pub mod catalog;
pub mod config;
pub mod data_types;
pub mod frontend;
pub mod repository;
pub mod schema;
pub mod validation;

#[cfg(test)]
pub(crate) mod testutils;
