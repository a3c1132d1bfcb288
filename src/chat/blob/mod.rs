//! Blob stores for uploaded media.

pub mod blob_store;
pub mod fs;

pub use blob_store::{BlobStore, InMemoryBlobStore};
pub use fs::FsBlobStore;
