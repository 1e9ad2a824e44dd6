//! Comparison, filtering and import orchestration for cfgsync
//!
//! This crate sits between the record stores and the command line:
//!
//! - **Filters**: [`StorageFilter`] hooks composed into a [`FilteredStore`]
//! - **Comparer**: [`StorageComparer`] diffs two stores into a [`ChangeList`]
//! - **Importer**: [`ConfigImporter`] applies a changelist under a [`Lock`]
//! - **Settings**: layered `cfgsync.toml` resolution
//!
//! # Architecture
//!
//! ```text
//!   source store --(filters)--> StorageComparer <-- target store
//!                                     |
//!                                 ChangeList
//!                                     |
//!                               ConfigImporter --> target store
//!                                     |
//!                             ExtensionHandler
//! ```

pub mod comparer;
pub mod error;
pub mod filter;
pub mod importer;
pub mod lock;
pub mod settings;

pub use comparer::{ChangeList, ChangeSummary, CollectionChanges, StorageComparer, compare};
pub use error::{Error, Result};
pub use filter::{
    Adjustment, CoreExtensionFilter, ExcludeFilter, FilterChain, FilteredStore, StorageFilter,
};
pub use importer::{ConfigImporter, ImportOptions, ImportOutcome, ImportReport, ImportState};
pub use lock::{FileLock, IMPORT_LOCK, Lock, MemoryLock};
pub use settings::{Settings, SettingsResolver};
