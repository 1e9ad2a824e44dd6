//! Configuration record stores for cfgsync
//!
//! A store holds named, structured records partitioned into collections.
//! This crate provides:
//!
//! - **[`ConfigStore`]**: the collection-scoped store contract
//! - **[`FileStore`]**: one file per record, collections as subdirectories
//! - **[`MemoryStore`]**: shared in-memory store, mostly for tests and previews
//! - **[`Codec`]**: the serialization boundary (YAML, JSON, TOML)
//! - **Validation** of record names and keys, applied before any write

pub mod codec;
pub mod error;
pub mod file;
pub mod io;
pub mod memory;
pub mod store;
pub mod validation;

pub use codec::Codec;
pub use error::{Error, Result};
pub use file::FileStore;
pub use memory::MemoryStore;
pub use store::{ConfigStore, DEFAULT_COLLECTION, Record};
pub use validation::{
    validate_collection_name, validate_lookup_name, validate_name, validate_record,
};
