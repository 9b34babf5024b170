//! redb table definitions for the settings store.
//!
//! Keys are `/`-separated paths (`timing/poll`, `runs/{target}/{finished_at}`);
//! values are JSON-serialized [`StoredRecord`](crate::StoredRecord)s.

use redb::TableDefinition;

/// All settings and run records.
pub const SETTINGS: TableDefinition<&str, &[u8]> = TableDefinition::new("settings");
