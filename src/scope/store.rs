use dashmap::DashMap;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::BTreeMap;

use super::AttributeStore;

/// Attributes attached to one inbound request.
#[derive(Debug, Default)]
pub struct RequestAttributes {
    entries: RwLock<BTreeMap<String, Value>>,
}

impl AttributeStore for RequestAttributes {
    fn get_attribute(&self, name: &str) -> Option<Value> {
        self.entries.read().get(name).cloned()
    }

    fn set_attribute(&self, name: String, value: Value) -> Option<Value> {
        self.entries.write().insert(name, value)
    }

    fn remove_attribute(&self, name: &str) -> Option<Value> {
        self.entries.write().remove(name)
    }

    fn attribute_names(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }
}

/// Application-wide attributes shared by all concurrent requests.
#[derive(Debug, Default)]
pub struct ApplicationAttributes {
    entries: DashMap<String, Value>,
}

impl AttributeStore for ApplicationAttributes {
    fn get_attribute(&self, name: &str) -> Option<Value> {
        self.entries.get(name).map(|v| v.value().clone())
    }

    fn set_attribute(&self, name: String, value: Value) -> Option<Value> {
        self.entries.insert(name, value)
    }

    fn remove_attribute(&self, name: &str) -> Option<Value> {
        self.entries.remove(name).map(|(_, v)| v)
    }

    fn attribute_names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.key().clone()).collect()
    }
}
