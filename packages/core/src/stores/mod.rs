//! Storage implementations for the retrieval and extraction pipeline.
//!
//! Available backends:
//! - `MemoryStore` - in-memory storage (always available; used in tests)
//! - `PostgresStore` - PostgreSQL storage with optional pgvector (requires `postgres` feature)

pub mod memory;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::MemoryStore;

#[cfg(feature = "postgres")]
pub use postgres::PostgresStore;
