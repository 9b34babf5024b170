//! hgw-state — settings persistence for HGW.
//!
//! Settings live behind the [`SettingsBackend`] trait so the optimizer and
//! CLI never touch a process-wide store. Two backends ship with the crate:
//! [redb](https://docs.rs/redb) (on-disk or in-memory) and a `BTreeMap`
//! behind an `RwLock`.
//!
//! # Record format
//!
//! Every value is written as a JSON [`StoredRecord`]: a schema version plus
//! a tagged [`StoredValue`]. Records written under another schema version
//! are refused instead of being coerced.

pub mod backend;
pub mod error;
pub mod record;
pub mod store;
pub mod tables;

pub use backend::{MemoryBackend, RedbBackend, SettingsBackend};
pub use error::{StateError, StateResult};
pub use record::{SCHEMA_VERSION, StoredRecord, StoredValue};
pub use store::SettingsStore;
