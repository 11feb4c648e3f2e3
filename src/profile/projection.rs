use serde::Serialize;
use serde_json::Value;

use super::graph::InheritanceGraph;
use super::model::INSTANTIATION_KEY;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectedNode {
    pub id: String,
    pub label: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub profile_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instantiation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub file_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectedEdge {
    pub id: String,
    pub source: String,
    pub target: String,
}

/// Flat node/edge view of a vendor forest for an external layout engine.
/// Carries no positions.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphProjection {
    pub nodes: Vec<ProjectedNode>,
    pub edges: Vec<ProjectedEdge>,
}

impl GraphProjection {
    pub fn from_graph(graph: &InheritanceGraph) -> Self {
        let nodes = graph
            .nodes()
            .map(|node| ProjectedNode {
                id: node.name.clone(),
                label: node.name.clone(),
                profile_type: node.attributes.get("type").and_then(display_text),
                instantiation: node
                    .attributes
                    .get(INSTANTIATION_KEY)
                    .and_then(display_text),
                version: node.attributes.get("version").and_then(display_text),
                file_path: node.file_path.to_string_lossy().replace('\\', "/"),
            })
            .collect();
        let edges = graph
            .edges()
            .map(|(parent, child)| ProjectedEdge {
                id: format!("e-{}-{}", parent, child),
                source: parent.to_string(),
                target: child.to_string(),
            })
            .collect();
        Self { nodes, edges }
    }
}

/// Text for an optional node field. Empty and falsy values are left out;
/// non-string values are rendered as JSON.
fn display_text(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(text) if text.is_empty() => None,
        Value::String(text) => Some(text.clone()),
        Value::Number(number) if number.as_f64() == Some(0.0) => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::model::RawRecord;
    use serde_json::json;
    use std::path::PathBuf;

    #[test]
    fn projects_nodes_and_resolved_edges_only() {
        let records = vec![
            RawRecord {
                attributes: serde_json::from_value(json!({
                    "name": "Root", "type": "machine", "instantiation": "false", "version": "1.0.0.1"
                }))
                .unwrap(),
                file_path: PathBuf::from(r"C:\profiles\Vendor\machine\Root.json"),
            },
            RawRecord {
                attributes: serde_json::from_value(json!({"name": "Leaf", "inherits": "Root"}))
                    .unwrap(),
                file_path: PathBuf::from("/profiles/Vendor/machine/Leaf.json"),
            },
            RawRecord {
                attributes: serde_json::from_value(json!({"name": "Orphan", "inherits": "Ghost"}))
                    .unwrap(),
                file_path: PathBuf::from("/profiles/Vendor/Orphan.json"),
            },
        ];
        let (graph, _) = InheritanceGraph::build(records);
        let projection = GraphProjection::from_graph(&graph);

        assert_eq!(projection.nodes.len(), 3);
        assert_eq!(
            projection.edges,
            vec![ProjectedEdge {
                id: "e-Root-Leaf".into(),
                source: "Root".into(),
                target: "Leaf".into(),
            }]
        );
        let root = serde_json::to_value(&projection.nodes[2]).unwrap();
        assert_eq!(
            root,
            json!({
                "id": "Root", "label": "Root", "type": "machine", "instantiation": "false",
                "version": "1.0.0.1", "filePath": "C:/profiles/Vendor/machine/Root.json"
            })
        );
        let leaf = serde_json::to_value(&projection.nodes[0]).unwrap();
        assert!(leaf.get("type").is_none());
    }

    #[test]
    fn non_string_fields_are_rendered_not_dropped() {
        let records = vec![RawRecord {
            attributes: serde_json::from_value(json!({
                "name": "Odd", "type": "", "instantiation": true, "version": 2
            }))
            .unwrap(),
            file_path: PathBuf::from("/profiles/Vendor/Odd.json"),
        }];
        let (graph, _) = InheritanceGraph::build(records);
        let projection = GraphProjection::from_graph(&graph);
        let node = &projection.nodes[0];
        assert_eq!(node.profile_type, None);
        assert_eq!(node.instantiation.as_deref(), Some("true"));
        assert_eq!(node.version.as_deref(), Some("2"));
    }
}
