use super::edns::EdnsOption;
use super::enums::{RecordType, ResponseCode};
use super::record::DnsRecord;
use std::net::{Ipv4Addr, Ipv6Addr};

/// Typed record data. Wire-format encode/decode lives in the server's
/// message codec; the cache works on parsed values so query assembly can
/// follow CNAME/DNAME/SVCB targets without re-parsing bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RData {
    A(Ipv4Addr),
    Aaaa(Ipv6Addr),
    Ns(String),
    Cname(String),
    Dname(String),
    Ptr(String),
    Soa {
        mname: String,
        rname: String,
        serial: u32,
        refresh: u32,
        retry: u32,
        expire: u32,
        minimum: u32,
    },
    Mx {
        preference: u16,
        exchange: String,
    },
    Txt(Vec<String>),
    Srv {
        priority: u16,
        weight: u16,
        port: u16,
        target: String,
    },
    /// SVCB/HTTPS service binding (RFC 9460). `priority == 0` is AliasMode.
    Svcb {
        priority: u16,
        target: String,
        params: Vec<u8>,
    },
    Https {
        priority: u16,
        target: String,
        params: Vec<u8>,
    },
    Ds {
        key_tag: u16,
        algorithm: u8,
        digest_type: u8,
        digest: Vec<u8>,
    },
    Rrsig {
        type_covered: RecordType,
        algorithm: u8,
        labels: u8,
        original_ttl: u32,
        expiration: u32,
        inception: u32,
        key_tag: u16,
        signer: String,
        signature: Vec<u8>,
    },
    Nsec {
        next: String,
        types: Vec<RecordType>,
    },
    Nsec3 {
        algorithm: u8,
        flags: u8,
        iterations: u16,
        salt: Vec<u8>,
        next_hashed: Vec<u8>,
        types: Vec<RecordType>,
    },
    /// Cached negative/failure sentinel standing in for a whole response
    Special(Box<SpecialCacheData>),
    Unknown(u16, Vec<u8>),
}

impl RData {
    /// The name this record points at, for CNAME-style chasing
    pub fn cname_target(&self) -> Option<&str> {
        match self {
            RData::Cname(target) => Some(target),
            _ => None,
        }
    }

    /// Target name that additional-section synthesis resolves for this record
    pub fn additional_target(&self) -> Option<&str> {
        match self {
            RData::Ns(host) => Some(host),
            RData::Mx { exchange, .. } => Some(exchange),
            RData::Srv { target, .. } => Some(target),
            RData::Svcb { target, .. } | RData::Https { target, .. } => Some(target),
            _ => None,
        }
    }

    pub fn is_special(&self) -> bool {
        matches!(self, RData::Special(_))
    }

    pub fn as_special(&self) -> Option<&SpecialCacheData> {
        match self {
            RData::Special(data) => Some(data),
            _ => None,
        }
    }
}

/// Kind of cached special response
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SpecialKind {
    /// NXDOMAIN / NODATA with proof in the authority section
    NegativeCache,
    /// Upstream failure (SERVFAIL and friends), short-lived
    FailureCache,
    /// Response synthesized by a blocking layer
    BlockedCache,
}

impl SpecialKind {
    pub fn to_u8(self) -> u8 {
        match self {
            SpecialKind::NegativeCache => 0,
            SpecialKind::FailureCache => 1,
            SpecialKind::BlockedCache => 2,
        }
    }

    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => SpecialKind::FailureCache,
            2 => SpecialKind::BlockedCache,
            _ => SpecialKind::NegativeCache,
        }
    }
}

/// Snapshot of a negative/failure response, cached whole so it can be
/// replayed for any question type at the owner.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpecialCacheData {
    pub kind: SpecialKind,
    pub rcode: ResponseCode,
    pub original_rcode: ResponseCode,
    /// Sections exactly as the upstream returned them
    pub original_answer: Vec<DnsRecord>,
    pub original_authority: Vec<DnsRecord>,
    pub original_additional: Vec<DnsRecord>,
    /// Authority view with DNSSEC proof records stripped, served to
    /// clients that did not set DNSSEC-OK
    pub no_dnssec_authority: Vec<DnsRecord>,
    /// EDNS options the upstream response carried
    pub options: Vec<EdnsOption>,
}

impl SpecialCacheData {
    pub fn negative(
        rcode: ResponseCode,
        original_authority: Vec<DnsRecord>,
        no_dnssec_authority: Vec<DnsRecord>,
    ) -> Self {
        Self {
            kind: SpecialKind::NegativeCache,
            rcode,
            original_rcode: rcode,
            original_answer: Vec::new(),
            original_authority,
            original_additional: Vec::new(),
            no_dnssec_authority,
            options: Vec::new(),
        }
    }

    pub fn failure(rcode: ResponseCode, original_rcode: ResponseCode) -> Self {
        Self {
            kind: SpecialKind::FailureCache,
            rcode,
            original_rcode,
            original_answer: Vec::new(),
            original_authority: Vec::new(),
            original_additional: Vec::new(),
            no_dnssec_authority: Vec::new(),
            options: Vec::new(),
        }
    }
}
