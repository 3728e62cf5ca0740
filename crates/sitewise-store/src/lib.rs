//! Sitewise Store - Storage ports and adapters
//!
//! Object-store and session-backend ports with in-memory and filesystem
//! adapters, plus the cached, retrying Project Store and Session Context
//! Store built on top of them.

pub mod fs;
pub mod memory;
pub mod ports;
pub mod project_store;
pub mod session_store;

pub use fs::FileObjectStore;
pub use memory::{MemoryObjectStore, MemorySessionBackend};
pub use ports::{ObjectStore, SessionBackend};
pub use project_store::ProjectStore;
pub use session_store::{ObjectSessionBackend, SessionContextStore};
