pub mod entry;
pub mod manager;
pub mod record_info;
pub mod snapshot;
pub mod tree;
pub mod zone;

pub use manager::CacheManager;
pub use record_info::{CacheRecordInfo, CachedRecord, EcsScope, ScopeKey};
pub use tree::CacheTree;
pub use zone::CacheZone;

use crate::dns::name;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// TTL for cached upstream failures (SERVFAIL and friends), seconds
pub const FAILURE_RECORD_TTL: u32 = 60;
/// TTL for cached negative responses (NXDOMAIN/NODATA), seconds
pub const NEGATIVE_RECORD_TTL: u32 = 300;
/// Lower clamp applied to every incoming TTL, seconds
pub const MINIMUM_RECORD_TTL: u32 = 10;
/// Upper clamp applied to every incoming TTL, seconds (7 days)
pub const MAXIMUM_RECORD_TTL: u32 = 604_800;
/// How long past expiry a record stays usable for serve-stale, seconds (3 days)
pub const SERVE_STALE_TTL: u64 = 259_200;
/// TTL granted by the one-shot expiry reset when serving stale, seconds
pub const SERVE_STALE_ANSWER_TTL: u32 = 30;
/// Upper bound on CNAME/alias chain length during query assembly
pub const MAX_CNAME_HOPS: usize = 16;

/// Snapshot file name inside the config folder
pub const CACHE_FILE_NAME: &str = "cache.bin";

/// Current wall-clock time as UNIX seconds
pub fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Clamp an incoming TTL into the configured bounds
pub fn effective_ttl(ttl: u32) -> u32 {
    ttl.clamp(MINIMUM_RECORD_TTL, MAXIMUM_RECORD_TTL)
}

/// Zone cut lookup the cache delegates to the authoritative-zone layer.
/// The default implementation derives the parent by stripping a label.
pub trait ParentZoneProvider: Send + Sync {
    /// Parent zone of `name`, or `None` at the root
    fn parent_zone(&self, name: &str) -> Option<String>;
}

/// Label-stripping fallback used when no authoritative-zone layer is wired in
#[derive(Debug, Default)]
pub struct LabelParentZones;

impl ParentZoneProvider for LabelParentZones {
    fn parent_zone(&self, name: &str) -> Option<String> {
        name::parent(name)
    }
}

#[derive(Debug, Default)]
pub struct CacheStats {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub negative_hits: AtomicU64,
    pub evictions: AtomicU64,
    pub expired_evictions: AtomicU64,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_negative_hit(&self) {
        self.negative_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_evictions(&self, count: u64) {
        self.evictions.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_expired_evictions(&self, count: u64) {
        self.expired_evictions.fetch_add(count, Ordering::Relaxed);
    }

    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;

        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}
