use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use super::error::ProfileResult;
use super::graph::InheritanceGraph;
use super::kind::KindDictionary;
use super::model::{INHERITS_KEY, NAME_KEY};

/// One ancestor's contribution to a key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layer {
    pub profile: String,
    pub value: Value,
}

/// Every value a key takes along the chain, root first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayeredValue {
    pub layers: Vec<Layer>,
    pub editable: bool,
}

impl LayeredValue {
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.layers.iter().map(|layer| &layer.value)
    }

    /// The value that wins: the layer closest to the target.
    pub fn effective(&self) -> Option<&Value> {
        self.layers.last().map(|layer| &layer.value)
    }

    /// The target's own override, if it has one.
    pub fn own(&self) -> Option<&Value> {
        if self.editable { self.effective() } else { None }
    }

    /// What the key would fall back to without the target's override.
    pub fn inherited(&self) -> Option<&Layer> {
        let ancestors = if self.editable {
            self.layers.len().saturating_sub(1)
        } else {
            self.layers.len()
        };
        self.layers[..ancestors].last()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedConfig {
    pub name: String,
    /// Target first, root last.
    pub chain: Vec<String>,
    pub entries: BTreeMap<String, LayeredValue>,
}

impl ResolvedConfig {
    pub fn get(&self, key: &str) -> Option<&LayeredValue> {
        self.entries.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn editable_keys(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|(_, layered)| layered.editable)
            .map(|(key, _)| key.as_str())
    }

    /// Last-write-wins view of the chain.
    pub fn flatten(&self) -> Map<String, Value> {
        self.entries
            .iter()
            .filter_map(|(key, layered)| {
                layered
                    .effective()
                    .map(|value| (key.clone(), value.clone()))
            })
            .collect()
    }
}

/// Resolves a profile's effective configuration from its ancestor chain.
/// With a kind dictionary attached, layer values are normalized for display.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigResolver<'a> {
    kinds: Option<&'a KindDictionary>,
}

impl<'a> ConfigResolver<'a> {
    pub fn new() -> Self {
        Self { kinds: None }
    }

    pub fn with_kinds(kinds: &'a KindDictionary) -> Self {
        Self { kinds: Some(kinds) }
    }

    pub fn resolve(&self, graph: &InheritanceGraph, name: &str) -> ProfileResult<ResolvedConfig> {
        let chain = graph.ancestor_chain(name)?;
        let target = chain[0].name.clone();
        let mut entries: BTreeMap<String, LayeredValue> = BTreeMap::new();

        for node in chain.iter().rev() {
            let is_target = node.name == target;
            for (key, value) in node.attributes.iter() {
                if key == NAME_KEY || key == INHERITS_KEY {
                    continue;
                }
                let value = match self.kinds {
                    Some(kinds) => kinds.normalize(key, value),
                    None => value.clone(),
                };
                let layered = entries.entry(key.clone()).or_insert_with(|| LayeredValue {
                    layers: Vec::new(),
                    editable: false,
                });
                layered.layers.push(Layer {
                    profile: node.name.clone(),
                    value,
                });
                if is_target {
                    layered.editable = true;
                }
            }
        }

        log::debug!(
            "resolved '{}' over {} profiles: {} keys",
            target,
            chain.len(),
            entries.len()
        );
        Ok(ResolvedConfig {
            name: target,
            chain: chain.iter().map(|node| node.name.clone()).collect(),
            entries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::error::ProfileError;
    use crate::profile::kind::{ScalarKind, ValueKind};
    use crate::profile::model::RawRecord;
    use serde_json::json;
    use std::path::PathBuf;

    fn graph(values: Vec<Value>) -> InheritanceGraph {
        let records = values
            .into_iter()
            .enumerate()
            .map(|(index, value)| RawRecord {
                attributes: serde_json::from_value(value).expect("object"),
                file_path: PathBuf::from(format!("/v/{}.json", index)),
            })
            .collect();
        InheritanceGraph::build(records).0
    }

    fn sample() -> InheritanceGraph {
        graph(vec![
            json!({"name": "Root", "nozzle_diameter": [0.4], "layer_height": "0.2"}),
            json!({"name": "Mid", "inherits": "Root", "temperature": [200], "layer_height": "0.16"}),
            json!({"name": "Leaf", "inherits": "Mid", "layer_height": "0.12"}),
        ])
    }

    fn values(layered: &LayeredValue) -> Vec<Value> {
        layered.values().cloned().collect()
    }

    #[test]
    fn inherited_keys_are_not_editable() {
        let resolved = ConfigResolver::new()
            .resolve(&sample(), "Leaf")
            .expect("resolve");
        let nozzle = resolved.get("nozzle_diameter").unwrap();
        assert_eq!(values(nozzle), vec![json!([0.4])]);
        assert!(!nozzle.editable);
        let temperature = resolved.get("temperature").unwrap();
        assert_eq!(values(temperature), vec![json!([200])]);
        assert!(!temperature.editable);
        assert_eq!(resolved.chain, vec!["Leaf", "Mid", "Root"]);
    }

    #[test]
    fn layers_are_root_first_with_provenance() {
        let resolved = ConfigResolver::new()
            .resolve(&sample(), "Leaf")
            .expect("resolve");
        let layer_height = resolved.get("layer_height").unwrap();
        let profiles: Vec<_> = layer_height
            .layers
            .iter()
            .map(|layer| layer.profile.as_str())
            .collect();
        assert_eq!(profiles, vec!["Root", "Mid", "Leaf"]);
        assert!(layer_height.editable);
        assert_eq!(layer_height.effective(), Some(&json!("0.12")));
        assert_eq!(layer_height.own(), Some(&json!("0.12")));
        assert_eq!(layer_height.inherited().unwrap().profile, "Mid");
    }

    #[test]
    fn reserved_keys_are_excluded() {
        let resolved = ConfigResolver::new()
            .resolve(&sample(), "Mid")
            .expect("resolve");
        assert!(resolved.get("name").is_none());
        assert!(resolved.get("inherits").is_none());
        assert_eq!(resolved.len(), 3);
    }

    #[test]
    fn last_layer_is_own_value_iff_editable() {
        let graph = sample();
        let resolver = ConfigResolver::new();
        for name in ["Root", "Mid", "Leaf"] {
            let resolved = resolver.resolve(&graph, name).expect("resolve");
            let own = &graph.get(name).unwrap().attributes;
            for (key, layered) in &resolved.entries {
                let own_matches = layered.layers.last().map(|l| l.profile.as_str()) == Some(name)
                    && layered.effective() == own.get(key);
                assert_eq!(own_matches, layered.editable, "{}:{}", name, key);
            }
        }
    }

    #[test]
    fn child_list_replaces_parent_list_wholesale() {
        let graph = graph(vec![
            json!({"name": "P", "retract": ["1", "2", "3"]}),
            json!({"name": "C", "inherits": "P", "retract": ["9"]}),
        ]);
        let resolved = ConfigResolver::new().resolve(&graph, "C").expect("resolve");
        let retract = resolved.get("retract").unwrap();
        assert_eq!(values(retract), vec![json!(["1", "2", "3"]), json!(["9"])]);
        assert_eq!(resolved.flatten().get("retract"), Some(&json!(["9"])));
    }

    #[test]
    fn orphan_has_only_its_own_keys() {
        let graph = graph(vec![
            json!({"name": "Root", "a": 1}),
            json!({"name": "Leaf2", "inherits": "Ghost", "b": 2}),
        ]);
        let resolved = ConfigResolver::new().resolve(&graph, "Leaf2").expect("resolve");
        assert_eq!(resolved.keys().collect::<Vec<_>>(), vec!["b"]);
        assert!(resolved.editable_keys().eq(["b"]));
    }

    #[test]
    fn normalizes_with_kind_dictionary() {
        let graph = graph(vec![
            json!({"name": "P", "infill": "250%", "flags": [true, false]}),
            json!({"name": "C", "inherits": "P", "infill": 15}),
        ]);
        let mut kinds = KindDictionary::default();
        kinds.insert("infill", ValueKind::scalar(ScalarKind::Percent));
        kinds.insert("flags", ValueKind::list(ScalarKind::Bool));
        let resolved = ConfigResolver::with_kinds(&kinds)
            .resolve(&graph, "C")
            .expect("resolve");
        assert_eq!(values(resolved.get("infill").unwrap()), vec![json!("100"), json!("15")]);
        assert_eq!(values(resolved.get("flags").unwrap()), vec![json!(["1", "0"])]);
    }

    #[test]
    fn errors_propagate() {
        let resolver = ConfigResolver::new();
        assert!(matches!(
            resolver.resolve(&sample(), "Missing"),
            Err(ProfileError::NotFound(_))
        ));
        let cyclic = graph(vec![
            json!({"name": "A", "inherits": "B"}),
            json!({"name": "B", "inherits": "A"}),
        ]);
        assert!(matches!(
            resolver.resolve(&cyclic, "A"),
            Err(ProfileError::Cycle { .. })
        ));
    }
}
