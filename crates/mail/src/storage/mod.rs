//! Storage backends for mail data
//!
//! Provides a `MailStore` trait with two implementations:
//! - `InMemoryMailStore` for tests and ephemeral use
//! - `SqliteMailStore` for persistent storage with compressed bodies

mod memory;
mod sqlite;
mod traits;

pub use memory::InMemoryMailStore;
pub use sqlite::SqliteMailStore;
pub use traits::MailStore;
