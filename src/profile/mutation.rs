use std::path::{Path, PathBuf};

use serde_json::Value;

use super::error::{ProfileError, ProfileResult};
use super::graph::InheritanceGraph;
use super::model::{INHERITS_KEY, INSTANTIATION_KEY, NAME_KEY, ProfileDocument, ProfileNode};
use super::store::ProfileStore;

const CHILD_STUB_VERSION: &str = "0.0.0.0";

/// Structural and key-level edits. Every operation checks its preconditions
/// against the graph, then writes to disk; the graph itself is never touched,
/// the caller reloads it once the write has succeeded.
#[derive(Debug, Clone, Copy)]
pub struct MutationService<'a> {
    store: &'a ProfileStore,
}

impl<'a> MutationService<'a> {
    pub fn new(store: &'a ProfileStore) -> Self {
        Self { store }
    }

    /// Copies `source`'s own document under `new_name`, next to the source
    /// file and with the same parent.
    pub fn clone_profile(
        &self,
        graph: &InheritanceGraph,
        source: &str,
        new_name: &str,
    ) -> ProfileResult<ProfileNode> {
        let source = graph.require(source)?;
        ensure_available(graph, new_name)?;
        let file_path = sibling_path(source, new_name)?;

        let mut attributes = source.attributes.clone();
        attributes.insert(NAME_KEY, Value::String(new_name.to_string()));
        self.store.write(&file_path, &attributes)?;
        log::info!("cloned profile '{}' as '{}'", source.name, new_name);

        Ok(ProfileNode {
            name: new_name.to_string(),
            inherits: source.inherits.clone(),
            attributes,
            file_path,
        })
    }

    /// Creates a minimal stub inheriting from `parent`; every other value
    /// comes from resolution.
    pub fn add_child(
        &self,
        graph: &InheritanceGraph,
        parent: &str,
        new_name: &str,
    ) -> ProfileResult<ProfileNode> {
        let parent = graph.require(parent)?;
        ensure_available(graph, new_name)?;
        let file_path = sibling_path(parent, new_name)?;

        let mut attributes = ProfileDocument::default();
        for key in ["from", "type", INSTANTIATION_KEY] {
            if let Some(value) = parent.attributes.get(key) {
                attributes.insert(key, value.clone());
            }
        }
        attributes.insert("version", Value::String(CHILD_STUB_VERSION.to_string()));
        attributes.insert(INHERITS_KEY, Value::String(parent.name.clone()));
        attributes.insert(NAME_KEY, Value::String(new_name.to_string()));
        self.store.write(&file_path, &attributes)?;
        log::info!("added child profile '{}' under '{}'", new_name, parent.name);

        Ok(ProfileNode {
            name: new_name.to_string(),
            inherits: Some(parent.name.clone()),
            attributes,
            file_path,
        })
    }

    /// Removes a leaf profile and its file. Profiles with children are
    /// refused, never cascaded.
    pub fn delete(&self, graph: &InheritanceGraph, name: &str) -> ProfileResult<()> {
        let node = graph.require(name)?;
        if !graph.is_leaf(name) {
            return Err(ProfileError::HasChildren {
                name: name.to_string(),
                children: graph
                    .children(name)
                    .into_iter()
                    .filter(|child| *child != name)
                    .map(str::to_string)
                    .collect(),
            });
        }
        self.store.delete(&node.file_path)?;
        log::info!("deleted profile '{}'", name);
        Ok(())
    }

    /// Overrides `key` on the target's own document. Values are not checked
    /// against the key's kind.
    pub fn set_key_value(
        &self,
        graph: &InheritanceGraph,
        target: &str,
        key: &str,
        value: Value,
    ) -> ProfileResult<ProfileDocument> {
        ensure_editable_key(key)?;
        let node = graph.require(target)?;
        let mut attributes = node.attributes.clone();
        attributes.insert(key, value);
        self.store.write(&node.file_path, &attributes)?;
        log::debug!("set '{}' on '{}'", key, target);
        Ok(attributes)
    }

    /// Drops the target's own override so the key falls back to its ancestors.
    /// Removing a key the target does not define still rewrites the file.
    pub fn delete_key_override(
        &self,
        graph: &InheritanceGraph,
        target: &str,
        key: &str,
    ) -> ProfileResult<ProfileDocument> {
        ensure_editable_key(key)?;
        let node = graph.require(target)?;
        let mut attributes = node.attributes.clone();
        attributes.remove(key);
        self.store.write(&node.file_path, &attributes)?;
        log::debug!("removed override of '{}' on '{}'", key, target);
        Ok(attributes)
    }

    /// Puts `key` back to what the target itself held when the session was
    /// loaded: no own value means the override is removed.
    pub fn restore_key_to_original(
        &self,
        graph: &InheritanceGraph,
        target: &str,
        key: &str,
        original: Option<Value>,
    ) -> ProfileResult<ProfileDocument> {
        match original {
            Some(value) => self.set_key_value(graph, target, key, value),
            None => self.delete_key_override(graph, target, key),
        }
    }
}

fn ensure_available(graph: &InheritanceGraph, name: &str) -> ProfileResult<()> {
    validate_name(name)?;
    if graph.contains(name) {
        return Err(ProfileError::DuplicateName(name.to_string()));
    }
    Ok(())
}

/// Names double as file stems, so they may not be empty, `.`/`..`, or carry
/// path separators.
pub fn validate_name(name: &str) -> ProfileResult<()> {
    let invalid = name.trim().is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.contains('\0');
    if invalid {
        return Err(ProfileError::InvalidName(name.to_string()));
    }
    Ok(())
}

fn ensure_editable_key(key: &str) -> ProfileResult<()> {
    if key == NAME_KEY || key == INHERITS_KEY {
        return Err(ProfileError::ReservedKey(key.to_string()));
    }
    Ok(())
}

fn sibling_path(node: &ProfileNode, new_name: &str) -> ProfileResult<PathBuf> {
    let path = profile_path(node.directory(), new_name);
    if path.exists() {
        return Err(ProfileError::FileExists(path));
    }
    Ok(path)
}

pub fn profile_path(directory: &Path, name: &str) -> PathBuf {
    directory.join(format!("{}.json", name))
}
