//! Storage layer for Aurora Compass
//!
//! This crate provides the storage collaborators behind persisted client
//! settings: a sled key-value store, a JSON file backend, and a volatile
//! in-memory backend, all exposed through the [`SettingsStorage`] capability.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod file;
pub mod kv;
pub mod settings;

pub use file::FileSettingsStorage;
pub use kv::{KvConfig, KvError, KvStore};
pub use settings::{KvSettingsStorage, MemorySettingsStorage, SettingsStorage, StorageError};

#[cfg(any(test, feature = "mock"))]
pub use settings::MockSettingsStorage;
