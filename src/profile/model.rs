use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const NAME_KEY: &str = "name";
pub const INHERITS_KEY: &str = "inherits";
pub const INSTANTIATION_KEY: &str = "instantiation";

/// One profile file: an ordered JSON object whose reserved keys are `name`,
/// `inherits` and `instantiation`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileDocument {
    attributes: Map<String, Value>,
}

impl ProfileDocument {
    pub fn new(name: &str) -> Self {
        let mut document = Self::default();
        document.insert(NAME_KEY, Value::String(name.to_string()));
        document
    }

    pub fn from_map(attributes: Map<String, Value>) -> Self {
        Self { attributes }
    }

    pub fn name(&self) -> Option<&str> {
        self.attributes.get(NAME_KEY).and_then(Value::as_str)
    }

    /// Parent name, treating an empty string the same as an absent key.
    pub fn inherits(&self) -> Option<&str> {
        self.attributes
            .get(INHERITS_KEY)
            .and_then(Value::as_str)
            .filter(|parent| !parent.is_empty())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    pub fn insert(&mut self, key: &str, value: Value) -> Option<Value> {
        self.attributes.insert(key.to_string(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        // shift_remove keeps the remaining keys in file order
        self.attributes.shift_remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.attributes.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.attributes.iter()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.attributes
    }

    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.attributes)
    }
}

/// A parsed file as discovered by the store, before graph construction.
#[derive(Debug, Clone)]
pub struct RawRecord {
    pub attributes: ProfileDocument,
    pub file_path: PathBuf,
}

/// A named profile owned by the inheritance graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileNode {
    pub name: String,
    pub inherits: Option<String>,
    pub attributes: ProfileDocument,
    pub file_path: PathBuf,
}

impl ProfileNode {
    pub fn from_record(name: String, record: RawRecord) -> Self {
        let inherits = record.attributes.inherits().map(str::to_string);
        Self {
            name,
            inherits,
            attributes: record.attributes,
            file_path: record.file_path,
        }
    }

    pub fn is_root(&self) -> bool {
        self.inherits.is_none()
    }

    pub fn directory(&self) -> &Path {
        self.file_path.parent().unwrap_or_else(|| Path::new("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document(value: Value) -> ProfileDocument {
        serde_json::from_value(value).expect("object document")
    }

    #[test]
    fn empty_inherits_means_root() {
        let doc = document(json!({"name": "Root", "inherits": ""}));
        assert_eq!(doc.name(), Some("Root"));
        assert_eq!(doc.inherits(), None);
    }

    #[test]
    fn remove_keeps_key_order() {
        let mut doc = document(json!({"name": "A", "b": 1, "c": 2, "d": 3}));
        doc.remove("b");
        let keys: Vec<_> = doc.keys().cloned().collect();
        assert_eq!(keys, vec!["name", "c", "d"]);
    }

    #[test]
    fn node_takes_parent_from_document() {
        let record = RawRecord {
            attributes: document(json!({"name": "Leaf", "inherits": "Mid"})),
            file_path: PathBuf::from("/vendor/process/Leaf.json"),
        };
        let node = ProfileNode::from_record("Leaf".into(), record);
        assert_eq!(node.inherits.as_deref(), Some("Mid"));
        assert!(!node.is_root());
        assert_eq!(node.directory(), Path::new("/vendor/process"));
    }
}
