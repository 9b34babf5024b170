//! Versioned, tagged records persisted by the settings store.

use serde::{Deserialize, Serialize};

use hgw_core::{HgwConfig, OptimizeReport};

/// Version written into every new record.
pub const SCHEMA_VERSION: u32 = 1;

/// Envelope around every persisted value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub schema_version: u32,
    pub value: StoredValue,
}

impl StoredRecord {
    pub fn new(value: StoredValue) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            value,
        }
    }
}

/// The closed set of value shapes the store understands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum StoredValue {
    Bool(bool),
    Number(f64),
    Text(String),
    TextList(Vec<String>),
    Config(Box<HgwConfig>),
    Run(Box<OptimizeReport>),
}

impl StoredValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            StoredValue::Bool(_) => "bool",
            StoredValue::Number(_) => "number",
            StoredValue::Text(_) => "text",
            StoredValue::TextList(_) => "text_list",
            StoredValue::Config(_) => "config",
            StoredValue::Run(_) => "run",
        }
    }
}
