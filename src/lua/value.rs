//! Parsed table-literal values and their conversion to JSON.

use std::collections::BTreeMap;

use serde_json::{Map, Number, Value};

/// A literal value from a saved-variables file.
#[derive(Debug, Clone, PartialEq)]
pub enum LuaValue {
    Nil,
    Boolean(bool),
    Integer(i64),
    Number(f64),
    String(String),
    Table(LuaTable),
}

/// Key of a table field.
///
/// Integral float keys are normalized to [`TableKey::Index`], matching how
/// the source language indexes tables.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TableKey {
    Index(i64),
    Name(String),
    Boolean(bool),
}

impl TableKey {
    /// The key as it appears in a JSON object.
    #[must_use]
    pub fn to_json_key(&self) -> String {
        match self {
            Self::Index(i) => i.to_string(),
            Self::Name(name) => name.clone(),
            Self::Boolean(b) => b.to_string(),
        }
    }
}

impl From<&str> for TableKey {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

/// A table constructor: keyed and positional fields.
///
/// Fields assigned `nil` are kept so positional placeholders survive
/// conversion. A later field with the same key replaces an earlier one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LuaTable {
    fields: BTreeMap<TableKey, LuaValue>,
    next_index: i64,
}

impl LuaTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional field.
    pub fn push(&mut self, value: LuaValue) {
        self.next_index += 1;
        self.fields.insert(TableKey::Index(self.next_index), value);
    }

    /// Set a keyed field.
    pub fn insert(&mut self, key: TableKey, value: LuaValue) {
        self.fields.insert(key, value);
    }

    /// Whether the keys are exactly `1..=len`, i.e. the table is a sequence.
    #[must_use]
    pub fn is_sequence(&self) -> bool {
        !self.fields.is_empty()
            && self
                .fields
                .keys()
                .zip(1_i64..)
                .all(|(key, expected)| *key == TableKey::Index(expected))
    }

    /// Convert to JSON: sequences become arrays, everything else an object.
    #[must_use]
    pub fn to_json(&self) -> Value {
        if self.is_sequence() {
            Value::Array(self.fields.values().map(LuaValue::to_json).collect())
        } else {
            let map: Map<String, Value> = self
                .fields
                .iter()
                .map(|(key, value)| (key.to_json_key(), value.to_json()))
                .collect();
            Value::Object(map)
        }
    }
}

impl LuaValue {
    /// Convert to JSON. Non-finite numbers become `null`.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Nil => Value::Null,
            Self::Boolean(b) => Value::Bool(*b),
            Self::Integer(i) => Value::Number((*i).into()),
            Self::Number(n) => Number::from_f64(*n).map_or(Value::Null, Value::Number),
            Self::String(s) => Value::String(s.clone()),
            Self::Table(table) => table.to_json(),
        }
    }
}
