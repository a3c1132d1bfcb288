//! Document backends holding user records, the search list and message logs.

pub mod document;
pub mod memory;
pub mod sqlite;

pub use document::{DocumentBackend, StoreFuture};
pub use memory::InMemoryDocumentBackend;
pub use sqlite::SqliteDocumentBackend;
