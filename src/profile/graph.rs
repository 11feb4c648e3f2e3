use std::collections::{BTreeMap, BTreeSet, HashSet};

use super::error::{Diagnostic, ProfileError, ProfileResult};
use super::model::{ProfileNode, RawRecord};

/// Forest of profiles for one vendor, keyed by profile name.
#[derive(Debug, Clone, Default)]
pub struct InheritanceGraph {
    nodes: BTreeMap<String, ProfileNode>,
    children: BTreeMap<String, BTreeSet<String>>,
}

impl InheritanceGraph {
    /// Builds the forest from records in discovery order. Individual bad
    /// records never fail the build; they are reported as diagnostics.
    pub fn build(records: Vec<RawRecord>) -> (Self, Vec<Diagnostic>) {
        let mut graph = Self::default();
        let mut diagnostics = Vec::new();

        for record in records {
            let Some(name) = record.attributes.name().map(str::to_string) else {
                diagnostics.push(Diagnostic::MissingName {
                    path: record.file_path,
                });
                continue;
            };
            if let Some(existing) = graph.nodes.get(&name) {
                diagnostics.push(Diagnostic::DuplicateName {
                    name,
                    path: record.file_path,
                    kept: existing.file_path.clone(),
                });
                continue;
            }
            graph
                .nodes
                .insert(name.clone(), ProfileNode::from_record(name, record));
        }

        for node in graph.nodes.values() {
            let Some(parent) = node.inherits.as_ref() else {
                continue;
            };
            if graph.nodes.contains_key(parent) {
                graph
                    .children
                    .entry(parent.clone())
                    .or_default()
                    .insert(node.name.clone());
            } else {
                diagnostics.push(Diagnostic::MissingParent {
                    child: node.name.clone(),
                    parent: parent.clone(),
                });
            }
        }

        let mut reported = HashSet::new();
        for name in graph.nodes.keys() {
            if let Err(ProfileError::Cycle { name, chain }) = graph.ancestor_chain(name)
                && reported.insert(name.clone())
            {
                diagnostics.push(Diagnostic::InheritanceCycle { name, chain });
            }
        }

        log::debug!(
            "built inheritance graph: {} nodes, {} roots, {} diagnostics",
            graph.nodes.len(),
            graph.roots().len(),
            diagnostics.len()
        );
        (graph, diagnostics)
    }

    pub fn get(&self, name: &str) -> Option<&ProfileNode> {
        self.nodes.get(name)
    }

    pub fn require(&self, name: &str) -> ProfileResult<&ProfileNode> {
        self.get(name)
            .ok_or_else(|| ProfileError::NotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &ProfileNode> {
        self.nodes.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    /// Parent of `name`, only if the edge was actually resolved.
    pub fn parent(&self, name: &str) -> Option<&ProfileNode> {
        self.get(name)
            .and_then(|node| node.inherits.as_deref())
            .and_then(|parent| self.get(parent))
    }

    pub fn children(&self, name: &str) -> Vec<&str> {
        self.children
            .get(name)
            .map(|set| set.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Nodes without a resolved parent: declared roots and orphans whose
    /// parent is missing.
    pub fn roots(&self) -> Vec<&str> {
        self.nodes
            .values()
            .filter(|node| self.parent(&node.name).is_none())
            .map(|node| node.name.as_str())
            .collect()
    }

    /// Resolved parent→child edges, ordered by parent then child.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.children.iter().flat_map(|(parent, children)| {
            children
                .iter()
                .map(move |child| (parent.as_str(), child.as_str()))
        })
    }

    /// True when no other profile inherits from `name`. A profile that
    /// names itself as parent does not count as its own child.
    pub fn is_leaf(&self, name: &str) -> bool {
        self.children
            .get(name)
            .is_none_or(|children| children.iter().all(|child| child == name))
    }

    /// Walks `inherits` pointers from `name` up to its root, child first.
    pub fn ancestor_chain(&self, name: &str) -> ProfileResult<Vec<&ProfileNode>> {
        let mut chain: Vec<&ProfileNode> = Vec::new();
        let mut visited = HashSet::new();
        let mut cursor = Some(self.require(name)?);
        while let Some(node) = cursor {
            if !visited.insert(node.name.as_str()) {
                return Err(ProfileError::Cycle {
                    name: node.name.clone(),
                    chain: chain.iter().map(|n| n.name.clone()).collect(),
                });
            }
            chain.push(node);
            cursor = self.parent(&node.name);
        }
        Ok(chain)
    }
}
