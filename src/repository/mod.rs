//! Repository Layer
//!
//! Document-store abstraction and its implementations.

mod traits;
pub mod db;
mod memory_store;
mod sqlite_store;
mod firestore_store;


pub use traits::{ItemStore, Document, Fields, WriteMode};
pub use db::open_store;
pub use memory_store::MemoryStore;
pub use sqlite_store::SqliteStore;
pub use firestore_store::FirestoreStore;
