pub mod interface;
pub mod local;
pub mod memory;
