//! Conversation history stores.
//!
//! Implements the `HistoryStore` trait from `papertalk-core`:
//! - [`SqliteHistory`] — durable checkpoint store, one row per thread
//! - [`InMemoryHistory`] — HashMap-backed store for tests and demos

pub mod in_memory;
pub mod sqlite;

pub use in_memory::InMemoryHistory;
pub use sqlite::SqliteHistory;
