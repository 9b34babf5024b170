//! SettingsStore — typed settings access over any [`SettingsBackend`].

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use hgw_core::{HgwConfig, OptimizeReport};

use crate::backend::{MemoryBackend, RedbBackend, SettingsBackend};
use crate::error::{StateError, StateResult};
use crate::record::{SCHEMA_VERSION, StoredRecord, StoredValue};

/// Key the optimizer config is stored under.
pub const CONFIG_KEY: &str = "config";

/// Prefix for optimizer run records.
pub const RUNS_PREFIX: &str = "runs/";

/// Typed settings store. Cheap to clone; clones share the backend.
#[derive(Clone)]
pub struct SettingsStore {
    backend: Arc<dyn SettingsBackend>,
}

impl SettingsStore {
    pub fn new(backend: impl SettingsBackend + 'static) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    /// Open a redb-backed store at `path`.
    pub fn open(path: &Path) -> StateResult<Self> {
        Ok(Self::new(RedbBackend::open(path)?))
    }

    /// Store that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }

    // ── Raw records ────────────────────────────────────────────────

    /// Read and validate the record stored under `key`.
    pub fn get_value(&self, key: &str) -> StateResult<Option<StoredValue>> {
        let Some(bytes) = self.backend.read(key)? else {
            return Ok(None);
        };
        let record: StoredRecord = serde_json::from_slice(&bytes)
            .map_err(|e| StateError::Deserialize(format!("{key}: {e}")))?;
        if record.schema_version != SCHEMA_VERSION {
            warn!(%key, found = record.schema_version, "refusing record from another schema");
            return Err(StateError::SchemaMismatch {
                key: key.to_string(),
                found: record.schema_version,
                expected: SCHEMA_VERSION,
            });
        }
        Ok(Some(record.value))
    }

    pub fn put_value(&self, key: &str, value: StoredValue) -> StateResult<()> {
        let record = StoredRecord::new(value);
        let bytes = serde_json::to_vec(&record).map_err(|e| StateError::Serialize(e.to_string()))?;
        self.backend.write(key, &bytes)
    }

    pub fn remove(&self, key: &str) -> StateResult<bool> {
        self.backend.remove(key)
    }

    pub fn keys(&self, prefix: &str) -> StateResult<Vec<String>> {
        self.backend.keys_with_prefix(prefix)
    }

    // ── Scalars ────────────────────────────────────────────────────

    pub fn get_bool(&self, key: &str) -> StateResult<Option<bool>> {
        match self.get_value(key)? {
            None => Ok(None),
            Some(StoredValue::Bool(b)) => Ok(Some(b)),
            Some(other) => Err(type_mismatch(key, &other, "bool")),
        }
    }

    pub fn put_bool(&self, key: &str, value: bool) -> StateResult<()> {
        self.put_value(key, StoredValue::Bool(value))
    }

    pub fn get_number(&self, key: &str) -> StateResult<Option<f64>> {
        match self.get_value(key)? {
            None => Ok(None),
            Some(StoredValue::Number(n)) => Ok(Some(n)),
            Some(other) => Err(type_mismatch(key, &other, "number")),
        }
    }

    pub fn put_number(&self, key: &str, value: f64) -> StateResult<()> {
        self.put_value(key, StoredValue::Number(value))
    }

    pub fn get_text(&self, key: &str) -> StateResult<Option<String>> {
        match self.get_value(key)? {
            None => Ok(None),
            Some(StoredValue::Text(s)) => Ok(Some(s)),
            Some(other) => Err(type_mismatch(key, &other, "text")),
        }
    }

    pub fn put_text(&self, key: &str, value: &str) -> StateResult<()> {
        self.put_value(key, StoredValue::Text(value.to_string()))
    }

    pub fn get_text_list(&self, key: &str) -> StateResult<Option<Vec<String>>> {
        match self.get_value(key)? {
            None => Ok(None),
            Some(StoredValue::TextList(list)) => Ok(Some(list)),
            Some(other) => Err(type_mismatch(key, &other, "text_list")),
        }
    }

    pub fn put_text_list(&self, key: &str, value: Vec<String>) -> StateResult<()> {
        self.put_value(key, StoredValue::TextList(value))
    }

    /// Store a value typed from its textual form: `true`/`false` become
    /// booleans, anything that parses as a float becomes a number, the rest
    /// is text.
    pub fn put_parsed(&self, key: &str, raw: &str) -> StateResult<StoredValue> {
        let value = match raw.trim() {
            "true" => StoredValue::Bool(true),
            "false" => StoredValue::Bool(false),
            s => match s.parse::<f64>() {
                Ok(n) if n.is_finite() => StoredValue::Number(n),
                _ => StoredValue::Text(raw.to_string()),
            },
        };
        self.put_value(key, value.clone())?;
        Ok(value)
    }

    // ── Config ─────────────────────────────────────────────────────

    pub fn load_config(&self) -> StateResult<Option<HgwConfig>> {
        match self.get_value(CONFIG_KEY)? {
            None => Ok(None),
            Some(StoredValue::Config(config)) => Ok(Some(*config)),
            Some(other) => Err(type_mismatch(CONFIG_KEY, &other, "config")),
        }
    }

    pub fn save_config(&self, config: &HgwConfig) -> StateResult<()> {
        self.put_value(CONFIG_KEY, StoredValue::Config(Box::new(config.clone())))?;
        debug!("optimizer config saved");
        Ok(())
    }

    // ── Runs ───────────────────────────────────────────────────────

    /// Persist a finished optimizer run.
    ///
    /// Runs finishing at the same timestamp get increasing sequence
    /// suffixes, so a repeated run never overwrites an earlier one.
    pub fn record_run(&self, report: &OptimizeReport) -> StateResult<String> {
        let stem = run_key_stem(&report.target, report.finished_at_ms);
        let seq = self.keys(&stem)?.len();
        let key = format!("{stem}{seq:06}");
        self.put_value(&key, StoredValue::Run(Box::new(report.clone())))?;
        debug!(%key, "optimizer run recorded");
        Ok(key)
    }

    /// Runs recorded for `target`, oldest first.
    pub fn list_runs(&self, target: &str) -> StateResult<Vec<OptimizeReport>> {
        let prefix = format!("{RUNS_PREFIX}{target}/");
        let mut runs = Vec::new();
        for key in self.keys(&prefix)? {
            match self.get_value(&key)? {
                Some(StoredValue::Run(report)) => runs.push(*report),
                Some(other) => return Err(type_mismatch(&key, &other, "run")),
                None => {}
            }
        }
        Ok(runs)
    }
}

/// Zero-padded so lexicographic key order is chronological.
fn run_key_stem(target: &str, finished_at_ms: u64) -> String {
    format!("{RUNS_PREFIX}{target}/{finished_at_ms:020}-")
}

fn type_mismatch(key: &str, found: &StoredValue, expected: &'static str) -> StateError {
    StateError::TypeMismatch {
        key: key.to_string(),
        found: found.type_name(),
        expected,
    }
}
