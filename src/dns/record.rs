use super::enums::{DnssecStatus, RecordClass, RecordType};
use super::name;
use super::rdata::{RData, SpecialCacheData, SpecialKind};
use crate::cache::{now_unix, FAILURE_RECORD_TTL, NEGATIVE_RECORD_TTL};

/// A single DNS resource record as handed to the cache by the resolver.
/// The owner name is kept canonical (lowercase, no trailing dot).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DnsRecord {
    pub name: String,
    pub rtype: RecordType,
    pub rclass: RecordClass,
    pub ttl: u32,
    pub rdata: RData,
    /// Validation status received from the resolver; propagated, never computed
    pub dnssec_status: DnssecStatus,
    /// UNIX seconds at which the record was obtained upstream
    pub received_at: u64,
}

impl DnsRecord {
    pub fn new(name: &str, rtype: RecordType, rclass: RecordClass, ttl: u32, rdata: RData) -> Self {
        Self {
            name: name::normalize(name),
            rtype,
            rclass,
            ttl,
            rdata,
            dnssec_status: DnssecStatus::Unknown,
            received_at: now_unix(),
        }
    }

    pub fn with_received_at(mut self, received_at: u64) -> Self {
        self.received_at = received_at;
        self
    }

    pub fn with_dnssec_status(mut self, status: DnssecStatus) -> Self {
        self.dnssec_status = status;
        self
    }

    /// Build a special cache sentinel for `name`. Failure and negative caches
    /// get their fixed short TTLs here so callers cannot mis-clamp them.
    pub fn special(name: &str, data: SpecialCacheData) -> Self {
        let ttl = match data.kind {
            SpecialKind::NegativeCache => NEGATIVE_RECORD_TTL,
            SpecialKind::FailureCache | SpecialKind::BlockedCache => FAILURE_RECORD_TTL,
        };
        Self::new(
            name,
            RecordType::Special,
            RecordClass::IN,
            ttl,
            RData::Special(Box::new(data)),
        )
    }

    pub fn is_root_owned(&self) -> bool {
        self.name.is_empty()
    }
}
