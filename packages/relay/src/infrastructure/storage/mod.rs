//! MessageStore implementations.
//!
//! Production deployments implement [`crate::domain::MessageStore`] against
//! the CMS database; the in-memory store here backs the standalone binary
//! and the integration tests.

mod inmemory;

pub use inmemory::InMemoryMessageStore;
