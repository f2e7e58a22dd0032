//! Storage layer
//!
//! Two distinct concerns live here:
//!
//! - the **progress store**: ephemeral, TTL-bound job state shared across
//!   process instances (`progress`, `redis_progress`, `memory`);
//! - the **record store collaborators**: trait interfaces for the
//!   persistent product/tag/history storage this crate consumes but does
//!   not own (`repository`), with in-memory reference implementations
//!   (`memory_repository`).

pub mod memory;
pub mod memory_repository;
pub mod progress;
pub mod redis_progress;
pub mod repository;

pub use memory::MemoryProgressStore;
pub use progress::ProgressStore;
pub use redis_progress::RedisProgressStore;
pub use repository::{
    ImportHistoryStore, Product, ProductRepository, ProductUpsert, TagStore, UpsertCounts,
};
