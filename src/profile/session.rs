use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde_json::Value;

use super::error::{Diagnostic, ProfileResult};
use super::graph::InheritanceGraph;
use super::kind::KindDictionary;
use super::model::{ProfileDocument, ProfileNode};
use super::mutation::MutationService;
use super::projection::GraphProjection;
use super::resolver::{ConfigResolver, ResolvedConfig};
use super::store::ProfileStore;

/// Remembers, per profile and key, what the profile itself held before the
/// session first touched that key. `None` means the key was only inherited.
#[derive(Debug, Clone, Default)]
pub struct ChangeTracker {
    originals: HashMap<String, BTreeMap<String, Option<Value>>>,
}

impl ChangeTracker {
    pub fn remember(&mut self, profile: &str, key: &str, own_value: Option<&Value>) {
        self.originals
            .entry(profile.to_string())
            .or_default()
            .entry(key.to_string())
            .or_insert_with(|| own_value.cloned());
    }

    pub fn original(&self, profile: &str, key: &str) -> Option<Option<&Value>> {
        self.originals
            .get(profile)
            .and_then(|keys| keys.get(key))
            .map(Option::as_ref)
    }

    pub fn forget(&mut self, profile: &str, key: &str) {
        if let Some(keys) = self.originals.get_mut(profile) {
            keys.remove(key);
            if keys.is_empty() {
                self.originals.remove(profile);
            }
        }
    }

    pub fn forget_profile(&mut self, profile: &str) {
        self.originals.remove(profile);
    }

    /// Tracked keys whose current own value differs from the original.
    pub fn changed_keys(&self, profile: &str, current: &ProfileDocument) -> Vec<String> {
        self.originals
            .get(profile)
            .map(|keys| {
                keys.iter()
                    .filter(|(key, original)| original.as_ref() != current.get(key))
                    .map(|(key, _)| key.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// One vendor directory loaded for editing. Mutations go to disk first and
/// the whole graph is reloaded afterwards; it is never patched in place.
#[derive(Debug)]
pub struct VendorSession {
    vendor_dir: PathBuf,
    store: ProfileStore,
    graph: InheritanceGraph,
    diagnostics: Vec<Diagnostic>,
    kinds: Option<KindDictionary>,
    tracker: ChangeTracker,
    stale: bool,
}

impl VendorSession {
    pub fn open(vendor_dir: impl Into<PathBuf>) -> ProfileResult<Self> {
        let mut session = Self {
            vendor_dir: vendor_dir.into(),
            store: ProfileStore::new(),
            graph: InheritanceGraph::default(),
            diagnostics: Vec::new(),
            kinds: None,
            tracker: ChangeTracker::default(),
            stale: false,
        };
        session.reload()?;
        Ok(session)
    }

    pub fn with_kinds(mut self, kinds: KindDictionary) -> Self {
        self.kinds = Some(kinds);
        self
    }

    pub fn reload(&mut self) -> ProfileResult<()> {
        let outcome = self.store.load_all(&self.vendor_dir)?;
        let (graph, mut diagnostics) = InheritanceGraph::build(outcome.records);
        let mut all = outcome.diagnostics;
        all.append(&mut diagnostics);
        for diagnostic in &all {
            log::warn!("{}", diagnostic);
        }
        log::info!(
            "loaded {} profiles from {:?}",
            graph.len(),
            self.vendor_dir
        );
        self.graph = graph;
        self.diagnostics = all;
        self.stale = false;
        Ok(())
    }

    /// Reload after a write that already reached disk. The write is not
    /// undone when the reload fails: the old graph is kept and marked stale
    /// until a later `reload` succeeds.
    fn reload_after_write(&mut self) {
        if let Err(err) = self.reload() {
            log::warn!(
                "profile written but reloading {:?} failed: {}",
                self.vendor_dir,
                err
            );
            self.stale = true;
        }
    }

    /// True when a write reached disk but the graph could not be reloaded.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn vendor_dir(&self) -> &Path {
        &self.vendor_dir
    }

    pub fn store(&self) -> &ProfileStore {
        &self.store
    }

    pub fn graph(&self) -> &InheritanceGraph {
        &self.graph
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn kinds(&self) -> Option<&KindDictionary> {
        self.kinds.as_ref()
    }

    pub fn tracker(&self) -> &ChangeTracker {
        &self.tracker
    }

    pub fn projection(&self) -> GraphProjection {
        GraphProjection::from_graph(&self.graph)
    }

    pub fn resolve(&self, name: &str) -> ProfileResult<ResolvedConfig> {
        let resolver = match self.kinds.as_ref() {
            Some(kinds) => ConfigResolver::with_kinds(kinds),
            None => ConfigResolver::new(),
        };
        resolver.resolve(&self.graph, name)
    }

    pub fn changed_keys(&self, name: &str) -> ProfileResult<Vec<String>> {
        let node = self.graph.require(name)?;
        Ok(self.tracker.changed_keys(name, &node.attributes))
    }

    pub fn clone_profile(&mut self, source: &str, new_name: &str) -> ProfileResult<ProfileNode> {
        let node = MutationService::new(&self.store).clone_profile(&self.graph, source, new_name)?;
        self.reload_after_write();
        Ok(node)
    }

    pub fn add_child(&mut self, parent: &str, new_name: &str) -> ProfileResult<ProfileNode> {
        let node = MutationService::new(&self.store).add_child(&self.graph, parent, new_name)?;
        self.reload_after_write();
        Ok(node)
    }

    pub fn delete(&mut self, name: &str) -> ProfileResult<()> {
        MutationService::new(&self.store).delete(&self.graph, name)?;
        self.tracker.forget_profile(name);
        self.reload_after_write();
        Ok(())
    }

    pub fn set_key_value(&mut self, target: &str, key: &str, value: Value) -> ProfileResult<()> {
        let own = self.graph.require(target)?.attributes.get(key).cloned();
        MutationService::new(&self.store).set_key_value(&self.graph, target, key, value)?;
        self.tracker.remember(target, key, own.as_ref());
        self.reload_after_write();
        Ok(())
    }

    pub fn delete_key_override(&mut self, target: &str, key: &str) -> ProfileResult<()> {
        let own = self.graph.require(target)?.attributes.get(key).cloned();
        MutationService::new(&self.store).delete_key_override(&self.graph, target, key)?;
        self.tracker.remember(target, key, own.as_ref());
        self.reload_after_write();
        Ok(())
    }

    /// Puts `key` back to its value at session load. Returns `false` when the
    /// key was never changed in this session.
    pub fn restore_key(&mut self, target: &str, key: &str) -> ProfileResult<bool> {
        let Some(original) = self.tracker.original(target, key) else {
            return Ok(false);
        };
        let original = original.cloned();
        MutationService::new(&self.store).restore_key_to_original(
            &self.graph,
            target,
            key,
            original,
        )?;
        self.tracker.forget(target, key);
        self.reload_after_write();
        Ok(true)
    }
}
