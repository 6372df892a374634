//! Storage for the autocomplete index.

pub mod adapter;
pub mod memory;
pub mod store;

pub use adapter::{KvStore, WriteBatch, WriteOp};
pub use memory::InMemStore;
pub use store::IndexStore;
