//! Persistence seam for cached entities and the pending event buffer.

pub mod traits;
pub mod memory;

pub use traits::{KeyValueStore, StorageError, get_json, put_json};
pub use memory::InMemoryStore;
