use super::{effective_ttl, SERVE_STALE_ANSWER_TTL, SERVE_STALE_TTL};
use crate::dns::record::DnsRecord;
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// ECS scope an upstream answer was restricted to (RFC 7871)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EcsScope {
    pub address: IpAddr,
    pub prefix: u8,
}

impl EcsScope {
    pub fn new(address: IpAddr, prefix: u8) -> Self {
        Self { address, prefix }
    }

    /// The scope's address with host bits cleared
    pub fn network(&self) -> IpAddr {
        mask_address(&self.address, self.prefix)
    }

    /// True if `address` falls inside this scope's network
    pub fn contains(&self, address: &IpAddr) -> bool {
        match (self.address, address) {
            (IpAddr::V4(_), IpAddr::V4(_)) | (IpAddr::V6(_), IpAddr::V6(_)) => {
                mask_address(address, self.prefix) == self.network()
            }
            _ => false,
        }
    }
}

fn mask_address(address: &IpAddr, prefix: u8) -> IpAddr {
    match address {
        IpAddr::V4(v4) => {
            let bits = u32::from(*v4);
            let mask = if prefix >= 32 {
                u32::MAX
            } else {
                u32::MAX.checked_shl(32 - prefix as u32).unwrap_or(0)
            };
            IpAddr::from((bits & mask).to_be_bytes())
        }
        IpAddr::V6(v6) => {
            let bits = u128::from(*v6);
            let mask = if prefix >= 128 {
                u128::MAX
            } else {
                u128::MAX.checked_shl(128 - prefix as u32).unwrap_or(0)
            };
            IpAddr::from((bits & mask).to_be_bytes())
        }
    }
}

/// Key identifying a scoped variant within an entry set
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScopeKey {
    Global,
    Subnet {
        network: IpAddr,
        prefix: u8,
        conditional_forwarding: bool,
    },
}

/// Companion metadata attached to every cached record envelope
#[derive(Clone, Debug, Default)]
pub struct CacheRecordInfo {
    /// Address records for this record's target, attached by the resolver
    pub glue: Vec<CachedRecord>,
    /// RRSIGs covering this record's rrset
    pub rrsigs: Vec<CachedRecord>,
    /// NSEC/NSEC3 proofs associated with this record
    pub nsecs: Vec<CachedRecord>,
    /// ECS scope the answer was restricted to, if any
    pub ecs_scope: Option<EcsScope>,
    /// Answer was obtained through a conditional forwarder
    pub conditional_forwarding: bool,
}

/// A record plus its cache lifetime state. Expiry mutates through atomics so
/// shared envelopes can be reset while readers hold them.
#[derive(Debug)]
pub struct CachedRecord {
    pub record: DnsRecord,
    pub info: CacheRecordInfo,
    expires_at: AtomicU64,
    expiry_reset: AtomicBool,
}

impl Clone for CachedRecord {
    fn clone(&self) -> Self {
        Self {
            record: self.record.clone(),
            info: self.info.clone(),
            expires_at: AtomicU64::new(self.expires_at.load(Ordering::Relaxed)),
            expiry_reset: AtomicBool::new(self.expiry_reset.load(Ordering::Relaxed)),
        }
    }
}

impl CachedRecord {
    pub fn new(record: DnsRecord) -> Self {
        let expires_at = record.received_at + effective_ttl(record.ttl) as u64;
        Self {
            record,
            info: CacheRecordInfo::default(),
            expires_at: AtomicU64::new(expires_at),
            expiry_reset: AtomicBool::new(false),
        }
    }

    pub fn with_info(record: DnsRecord, info: CacheRecordInfo) -> Self {
        let mut cached = Self::new(record);
        cached.info = info;
        cached
    }

    /// Restore an envelope from a snapshot without recomputing expiry
    pub(crate) fn restore(
        record: DnsRecord,
        info: CacheRecordInfo,
        expires_at: u64,
        expiry_reset: bool,
    ) -> Self {
        Self {
            record,
            info,
            expires_at: AtomicU64::new(expires_at),
            expiry_reset: AtomicBool::new(expiry_reset),
        }
    }

    pub fn expires_at(&self) -> u64 {
        self.expires_at.load(Ordering::Relaxed)
    }

    pub fn is_expired(&self, now: u64) -> bool {
        now > self.expires_at()
    }

    /// Past the hard TTL but still inside the serve-stale window
    pub fn is_stale(&self, now: u64) -> bool {
        self.is_expired(now) && !self.is_fully_expired(now)
    }

    pub fn is_fully_expired(&self, now: u64) -> bool {
        now > self.expires_at() + SERVE_STALE_TTL
    }

    /// Usable as an answer, given the caller's serve-stale stance
    pub fn is_usable(&self, now: u64, serve_stale: bool) -> bool {
        if serve_stale {
            !self.is_fully_expired(now)
        } else {
            !self.is_expired(now)
        }
    }

    /// One-shot expiry extension for stale-while-revalidate. Returns true on
    /// the first call only; re-staled records are served without a second
    /// extension.
    pub fn reset_expiry(&self, now: u64) -> bool {
        if self.expiry_reset.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.expires_at
            .store(now + SERVE_STALE_ANSWER_TTL as u64, Ordering::Relaxed);
        true
    }

    pub fn was_expiry_reset(&self) -> bool {
        self.expiry_reset.load(Ordering::Relaxed)
    }

    /// Remaining TTL seconds; stale records present the serve-stale TTL
    pub fn remaining_ttl(&self, now: u64) -> u32 {
        let remaining = self.expires_at().saturating_sub(now);
        if remaining == 0 {
            SERVE_STALE_ANSWER_TTL
        } else {
            remaining.min(u32::MAX as u64) as u32
        }
    }

    /// Materialize the record for a response, TTL adjusted to remaining life
    pub fn to_record(&self, now: u64) -> DnsRecord {
        let mut record = self.record.clone();
        record.ttl = self.remaining_ttl(now);
        record
    }

    /// The variant key this record's scope metadata selects
    pub fn scope_key(&self) -> ScopeKey {
        match &self.info.ecs_scope {
            Some(scope) => ScopeKey::Subnet {
                network: scope.network(),
                prefix: scope.prefix,
                conditional_forwarding: self.info.conditional_forwarding,
            },
            None => ScopeKey::Global,
        }
    }
}
