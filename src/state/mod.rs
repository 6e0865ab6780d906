pub mod storage;

pub use storage::{FileStore, KeyValueStore, MemoryStore, SharedKeyValueStore};
