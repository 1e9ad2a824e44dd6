//! Shared test utilities for the cfgsync workspace.
//!
//! This crate provides standardised fixtures so crate test suites do not
//! each grow their own. It is a dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`records`]: building records and seeding stores
//! - [`site`]: [`TestSite`] with an active and a sync directory on disk
//! - [`handlers`]: extension handlers that record or fail
//! - [`filters`]: a tagging filter for observing chain order

pub mod filters;
pub mod handlers;
pub mod records;
pub mod site;

pub use filters::TagFilter;
pub use handlers::{Call, FailingHandler, RecordingHandler};
pub use records::{manifest, record, seed, seeded_memory_store};
pub use site::TestSite;
