//! Durable Storage Module
//!
//! A string-keyed blob store the cache persists its mapping into. This plays
//! the role browser local storage plays for the dashboard: one process-wide
//! store, read once at startup and rewritten after every mutation.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use std::fmt;
use std::io;

/// Trait for durable blob storage backends.
pub trait DurableStore: fmt::Debug + Send + Sync {
    /// Reads the blob stored under `key`, `None` if nothing is stored.
    fn read(&self, key: &str) -> io::Result<Option<String>>;

    /// Replaces the blob stored under `key`.
    fn write(&self, key: &str, blob: &str) -> io::Result<()>;

    /// Removes the blob stored under `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> io::Result<()>;
}
