//! In-memory entity instances: ordered field-name to value maps.

use crate::orm::entity::{EntityMeta, FieldDefault};
use serde_json::{Map, Value};

/// One entity instance: a query result row or a record built by a handler.
/// Field order follows the entity declaration (or the query's column order).
/// No identity map; every load produces a fresh `Record`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Record {
    map: Map<String, Value>,
}

impl Record {
    pub fn new() -> Record {
        Record { map: Map::new() }
    }

    pub fn from_map(map: Map<String, Value>) -> Record {
        Record { map }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.map.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.map.insert(key.into(), value);
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        self.map.get(key).and_then(Value::as_str)
    }

    pub fn i64(&self, key: &str) -> Option<i64> {
        self.map.get(key).and_then(Value::as_i64)
    }

    pub fn f64(&self, key: &str) -> Option<f64> {
        self.map.get(key).and_then(Value::as_f64)
    }

    pub fn bool(&self, key: &str) -> Option<bool> {
        self.map.get(key).and_then(Value::as_bool)
    }

    /// Current value, or `Null` when unset. Never applies defaults.
    pub fn value(&self, key: &str) -> Value {
        self.map.get(key).cloned().unwrap_or(Value::Null)
    }

    /// Value with lazy default resolution: a missing field is populated from
    /// its declared default (static value or producer) on first read and the
    /// computed value is cached onto the record.
    pub fn value_or_default(&mut self, meta: &EntityMeta, key: &str) -> Value {
        if let Some(v) = self.map.get(key) {
            if !v.is_null() {
                return v.clone();
            }
        }
        let Some(field) = meta.field(key) else {
            return Value::Null;
        };
        let value = match &field.default {
            FieldDefault::None => return Value::Null,
            FieldDefault::Value(v) => v.clone(),
            FieldDefault::Producer(f) => f(),
        };
        tracing::debug!(field = key, value = %value, "using default value");
        self.map.insert(key.to_string(), value.clone());
        value
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.map)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.map
    }
}

impl From<Record> for Value {
    fn from(r: Record) -> Value {
        r.into_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orm::entity::FieldDef;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    static CALLS: AtomicU32 = AtomicU32::new(0);

    fn counting_default() -> Value {
        CALLS.fetch_add(1, Ordering::SeqCst);
        json!("generated")
    }

    fn meta() -> EntityMeta {
        EntityMeta::builder("Thing")
            .field(FieldDef::string("id").primary_key().default_fn(counting_default))
            .field(FieldDef::integer("n"))
            .build()
            .unwrap()
    }

    #[test]
    fn producer_runs_once_and_caches() {
        let meta = meta();
        let mut rec = Record::new();
        CALLS.store(0, Ordering::SeqCst);
        let first = rec.value_or_default(&meta, "id");
        let second = rec.value_or_default(&meta, "id");
        assert_eq!(first, json!("generated"));
        assert_eq!(first, second);
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
        // Cached onto the instance, visible to plain reads.
        assert_eq!(rec.str("id"), Some("generated"));
    }

    #[test]
    fn static_default_applies_when_unset() {
        let meta = meta();
        let mut rec = Record::new();
        assert_eq!(rec.value_or_default(&meta, "n"), json!(0));
        assert_eq!(rec.value("missing"), Value::Null);
    }

    #[test]
    fn explicit_value_wins_over_default() {
        let meta = meta();
        let mut rec = Record::new();
        rec.set("n", json!(7));
        assert_eq!(rec.value_or_default(&meta, "n"), json!(7));
    }
}
