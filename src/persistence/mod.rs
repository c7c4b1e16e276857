//! Persistence Layer
//!
//! Durable snapshots of registry state for crash recovery. Writes are
//! advisory: a failed write is logged and the process keeps going on its
//! in-memory state.

pub mod snapshot;

pub use snapshot::{RegistrySnapshot, SnapshotStore};
