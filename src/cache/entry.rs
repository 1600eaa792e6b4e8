use super::record_info::{CachedRecord, ScopeKey};
use crate::dns::edns::ClientSubnet;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// One scoped variant of an entry set: the records cached for a single
/// (owner, type, scope) key, plus its LRU timestamp.
#[derive(Debug)]
pub struct ScopedSet {
    pub scope: ScopeKey,
    pub records: Vec<Arc<CachedRecord>>,
    last_used: AtomicU64,
}

impl ScopedSet {
    fn new(scope: ScopeKey, records: Vec<Arc<CachedRecord>>, last_used: u64) -> Self {
        Self {
            scope,
            records,
            last_used: AtomicU64::new(last_used),
        }
    }

    pub fn last_used(&self) -> u64 {
        self.last_used.load(Ordering::Relaxed)
    }

    fn touch(&self, now: u64) {
        self.last_used.store(now, Ordering::Relaxed);
    }

    fn is_dead(&self, now: u64, serve_stale: bool) -> bool {
        self.records
            .iter()
            .all(|record| !record.is_usable(now, serve_stale))
    }
}

/// The entry set for one (owner, type): an ordered list of scoped variants,
/// at most one per scope key. Reads take the lock shared; per-type writes
/// serialize on it.
#[derive(Debug, Default)]
pub struct CacheEntry {
    variants: RwLock<Vec<ScopedSet>>,
}

impl CacheEntry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the variant matching the records' own scope. Returns the net
    /// change in variant count (insertion minus pruned dead variants), for
    /// `total_entries` accounting.
    ///
    /// With serve-stale enabled, still-usable stale variants under other
    /// scopes survive the write; without it, expired variants are dropped.
    pub fn set(&self, records: Vec<Arc<CachedRecord>>, now: u64, serve_stale: bool) -> i64 {
        let (scope, stamp) = match records.first() {
            Some(head) => (head.scope_key(), head.record.received_at),
            None => return 0,
        };

        let mut variants = self.variants.write();
        let mut delta: i64 = 0;

        match variants.iter().position(|set| set.scope == scope) {
            Some(index) => {
                variants[index].records = records;
                variants[index].touch(stamp);
            }
            None => {
                variants.push(ScopedSet::new(scope, records, stamp));
                delta += 1;
            }
        }

        let before = variants.len();
        variants.retain(|set| set.scope == scope || !set.is_dead(now, serve_stale));
        delta -= (before - variants.len()) as i64;

        delta
    }

    /// Push a variant read back from a snapshot
    pub(crate) fn restore(&self, scope: ScopeKey, records: Vec<Arc<CachedRecord>>, last_used: u64) {
        self.variants
            .write()
            .push(ScopedSet::new(scope, records, last_used));
    }

    /// Select the best-scope variant for a query: the containing subnet
    /// variant with the longest prefix, falling back to the global variant.
    /// The served variant's last-used timestamp is refreshed.
    pub fn select(
        &self,
        subnet: Option<&ClientSubnet>,
        conditional_forwarding: bool,
        now: u64,
        serve_stale: bool,
    ) -> Option<Vec<Arc<CachedRecord>>> {
        let variants = self.variants.read();

        let mut best: Option<&ScopedSet> = None;
        let mut best_prefix: i32 = -1;

        if let Some(subnet) = subnet {
            for set in variants.iter() {
                if let ScopeKey::Subnet {
                    network,
                    prefix,
                    conditional_forwarding: cf,
                } = set.scope
                {
                    if cf != conditional_forwarding {
                        continue;
                    }
                    let scope = super::record_info::EcsScope::new(network, prefix);
                    if scope.contains(&subnet.address) && i32::from(prefix) > best_prefix {
                        best = Some(set);
                        best_prefix = i32::from(prefix);
                    }
                }
            }
        }

        if best.is_none() {
            best = variants.iter().find(|set| set.scope == ScopeKey::Global);
        }

        let set = best?;
        let head = set.records.first()?;
        if !head.is_usable(now, serve_stale) {
            return None;
        }

        set.touch(now);
        Some(set.records.clone())
    }

    /// True if some variant's head is still usable. Unlike `select`, this
    /// never refreshes last-used; tree traversal uses it to spot
    /// delegations without perturbing LRU order.
    pub fn has_usable(&self, now: u64, serve_stale: bool) -> bool {
        self.variants.read().iter().any(|set| {
            set.records
                .first()
                .map(|head| head.is_usable(now, serve_stale))
                .unwrap_or(false)
        })
    }

    /// Drop variants whose every record is past its usable life
    pub fn remove_expired(&self, now: u64, serve_stale: bool) -> usize {
        let mut variants = self.variants.write();
        let before = variants.len();
        variants.retain(|set| !set.is_dead(now, serve_stale));
        before - variants.len()
    }

    /// Drop variants last used before `cutoff`
    pub fn remove_least_used(&self, cutoff: u64) -> usize {
        let mut variants = self.variants.write();
        let before = variants.len();
        variants.retain(|set| set.last_used() >= cutoff);
        before - variants.len()
    }

    /// Drop every ECS-scoped variant, keeping only the global one
    pub fn remove_ecs_scoped(&self) -> usize {
        let mut variants = self.variants.write();
        let before = variants.len();
        variants.retain(|set| set.scope == ScopeKey::Global);
        before - variants.len()
    }

    pub fn variant_count(&self) -> usize {
        self.variants.read().len()
    }

    pub fn is_empty(&self, now: u64) -> bool {
        self.variants
            .read()
            .iter()
            .all(|set| set.is_dead(now, true))
    }

    /// Consistent copy of all variants, for enumeration and snapshots
    pub fn variants_snapshot(&self) -> Vec<(ScopeKey, Vec<Arc<CachedRecord>>, u64)> {
        self.variants
            .read()
            .iter()
            .map(|set| (set.scope, set.records.clone(), set.last_used()))
            .collect()
    }
}
