//! Durable blob storage for hwgate.
//!
//! The authorization ledger keeps its source of truth in a versioned
//! key/value blob store. This crate defines that interface and ships
//! three backends:
//!
//! - [`MemoryStore`]: in-process, for tests and throwaway deployments
//! - [`FileStore`]: one file per key in a local directory
//! - [`GitHubStore`]: files in a GitHub repository via the contents API
//!
//! All backends provide optimistic concurrency: a write presents the
//! version token of the revision it was based on and is rejected with
//! [`StoreError::Conflict`] if someone else wrote in between.

mod error;
mod fs;
mod github;
mod memory;
mod store;

pub use error::{StoreError, StoreResult};
pub use fs::{FileStore, FileStoreConfig};
pub use github::{GitHubStore, GitHubStoreConfig};
pub use memory::MemoryStore;
pub use store::{DurableStore, VersionToken, VersionedBlob};
