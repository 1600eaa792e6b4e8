use super::zone::CacheZone;
use crate::dns::enums::RecordType;
use crate::dns::name;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;

/// One trie node per label, authority order (root at the top, TLDs below).
/// Children are concurrent; the zone slot takes a short write lock only on
/// insert/remove.
#[derive(Debug, Default)]
struct TreeNode {
    children: DashMap<String, Arc<TreeNode>>,
    zone: RwLock<Option<Arc<CacheZone>>>,
}

/// Result of a longest-prefix walk for a question name
#[derive(Default)]
pub struct FindResult {
    /// Zone stored at exactly the question name, if any
    pub exact: Option<Arc<CacheZone>>,
    /// Deepest zone on the path holding any records
    pub closest: Option<Arc<CacheZone>>,
    /// Deepest zone on the path holding live NS records. Root NS sets are
    /// never reported here; priming comes from configuration, not cache.
    pub delegation: Option<Arc<CacheZone>>,
}

/// Label-reversed trie over owner names. All operations are safe under
/// concurrent mutation; enumeration yields a weakly consistent snapshot.
#[derive(Debug)]
pub struct CacheTree {
    root: Arc<TreeNode>,
}

impl Default for CacheTree {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheTree {
    pub fn new() -> Self {
        Self {
            root: Arc::new(TreeNode::default()),
        }
    }

    /// Walk to the node for `name` without creating anything
    fn node_at(&self, name: &str) -> Option<Arc<TreeNode>> {
        let mut node = self.root.clone();
        for label in name::labels(name).iter().rev() {
            let child = node.children.get(*label)?.value().clone();
            node = child;
        }
        Some(node)
    }

    /// Atomic get-or-insert; `factory` runs at most once per created zone
    pub fn get_or_add<F>(&self, name: &str, factory: F) -> Arc<CacheZone>
    where
        F: FnOnce(&str) -> CacheZone,
    {
        let mut node = self.root.clone();
        for label in name::labels(name).iter().rev() {
            let child = node
                .children
                .entry((*label).to_string())
                .or_default()
                .value()
                .clone();
            node = child;
        }

        if let Some(zone) = node.zone.read().as_ref() {
            return zone.clone();
        }

        let mut slot = node.zone.write();
        match slot.as_ref() {
            Some(zone) => zone.clone(),
            None => {
                let zone = Arc::new(factory(name));
                *slot = Some(zone.clone());
                zone
            }
        }
    }

    pub fn try_get(&self, name: &str) -> Option<Arc<CacheZone>> {
        self.node_at(name)?.zone.read().clone()
    }

    /// Longest-prefix walk from the root toward `name`, collecting the
    /// exact zone, the deepest zone with records and the deepest delegation.
    pub fn find_zone(&self, name: &str, now: u64) -> FindResult {
        let mut result = FindResult::default();
        let mut node = self.root.clone();

        note_zone(&mut result, &node, now);

        for label in name::labels(name).iter().rev() {
            let child = match node.children.get(*label) {
                Some(child) => child.value().clone(),
                None => return result,
            };
            node = child;
            note_zone(&mut result, &node, now);
        }

        result.exact = node.zone.read().clone();
        result
    }

    /// Remove the zone stored at `name`, leaving descendants in place
    pub fn try_remove(&self, name: &str) -> Option<Arc<CacheZone>> {
        let node = self.node_at(name)?;
        let removed = node.zone.write().take();
        removed
    }

    /// Remove the zone stored at `name` only if it holds nothing live.
    /// Returns true when a zone was removed.
    pub fn remove_if_empty(&self, name: &str, now: u64) -> bool {
        let node = match self.node_at(name) {
            Some(node) => node,
            None => return false,
        };
        let mut slot = node.zone.write();
        match slot.as_ref() {
            Some(zone) if zone.is_empty(now) => {
                *slot = None;
                true
            }
            _ => false,
        }
    }

    /// Detach the entire subtree at `name` (the zone itself plus every
    /// descendant). Returns the number of entry variants removed.
    pub fn try_remove_tree(&self, name: &str) -> usize {
        if name.is_empty() {
            let mut count = self
                .root
                .zone
                .write()
                .take()
                .map(|zone| zone.total_entries())
                .unwrap_or(0);
            let children: Vec<Arc<TreeNode>> = self
                .root
                .children
                .iter()
                .map(|child| child.value().clone())
                .collect();
            self.root.children.clear();
            for child in children {
                count += count_subtree_entries(&child);
            }
            return count;
        }

        let parent_name = name::parent(name).unwrap_or_default();
        let parent = match self.node_at(&parent_name) {
            Some(parent) => parent,
            None => return 0,
        };

        let leftmost = name::labels(name)[0];
        match parent.children.remove(leftmost) {
            Some((_, node)) => count_subtree_entries(&node),
            None => 0,
        }
    }

    /// Every zone currently in the tree, depth-first. Tolerates concurrent
    /// mutation; a zone appears at most once.
    pub fn enumerate(&self) -> Vec<Arc<CacheZone>> {
        let mut zones = Vec::new();
        collect_zones(&self.root, &mut zones);
        zones
    }

    /// Immediate child names cached under `domain`
    pub fn list_sub_domains(&self, domain: &str, out: &mut Vec<String>) {
        if let Some(node) = self.node_at(domain) {
            for child in node.children.iter() {
                if domain.is_empty() {
                    out.push(child.key().clone());
                } else {
                    out.push(format!("{}.{}", child.key(), domain));
                }
            }
        }
    }

    /// Drop all state
    pub fn clear(&self) {
        self.root.children.clear();
        *self.root.zone.write() = None;
    }
}

fn note_zone(result: &mut FindResult, node: &TreeNode, now: u64) {
    if let Some(zone) = node.zone.read().as_ref() {
        if !zone.is_empty(now) {
            result.closest = Some(zone.clone());
        }
        if !zone.name().is_empty() && zone.has_live_records(RecordType::NS, now) {
            result.delegation = Some(zone.clone());
        }
    }
}

fn collect_zones(node: &TreeNode, out: &mut Vec<Arc<CacheZone>>) {
    if let Some(zone) = node.zone.read().as_ref() {
        out.push(zone.clone());
    }
    let children: Vec<Arc<TreeNode>> = node
        .children
        .iter()
        .map(|child| child.value().clone())
        .collect();
    for child in children {
        collect_zones(&child, out);
    }
}

fn count_subtree_entries(node: &TreeNode) -> usize {
    let mut count = node
        .zone
        .read()
        .as_ref()
        .map(|zone| zone.total_entries())
        .unwrap_or(0);
    let children: Vec<Arc<TreeNode>> = node
        .children
        .iter()
        .map(|child| child.value().clone())
        .collect();
    for child in children {
        count += count_subtree_entries(&child);
    }
    count
}
