use super::edns::{ClientSubnet, EdnsOption};
use super::enums::{RecordClass, RecordType, ResponseCode};
use super::name;
use super::record::DnsRecord;

#[derive(Clone, Debug)]
pub struct CacheQuestion {
    pub name: String,
    pub qtype: RecordType,
    pub qclass: RecordClass,
}

impl CacheQuestion {
    pub fn new(name: &str, qtype: RecordType) -> Self {
        Self {
            name: name::normalize(name),
            qtype,
            qclass: RecordClass::IN,
        }
    }
}

/// A query as the resolver hands it to the cache: the question plus the
/// request attributes that influence cache answer assembly.
#[derive(Clone, Debug)]
pub struct CacheRequest {
    pub question: CacheQuestion,
    /// DNSSEC-OK (DO) flag from the request EDNS
    pub dnssec_ok: bool,
    /// CD flag: return the upstream result unfiltered
    pub checking_disabled: bool,
    /// EDNS Client Subnet option carried by the request, if any
    pub client_subnet: Option<ClientSubnet>,
    /// Set when the resolver reached this answer through a conditional forwarder
    pub conditional_forwarding: bool,
}

impl CacheRequest {
    pub fn new(name: &str, qtype: RecordType) -> Self {
        Self {
            question: CacheQuestion::new(name, qtype),
            dnssec_ok: false,
            checking_disabled: false,
            client_subnet: None,
            conditional_forwarding: false,
        }
    }

    pub fn with_dnssec_ok(mut self) -> Self {
        self.dnssec_ok = true;
        self
    }

    pub fn with_checking_disabled(mut self) -> Self {
        self.checking_disabled = true;
        self
    }

    pub fn with_client_subnet(mut self, subnet: ClientSubnet) -> Self {
        self.client_subnet = Some(subnet);
        self
    }
}

/// A response assembled from cache. A cache miss is the absence of a
/// response, not an error.
#[derive(Clone, Debug, Default)]
pub struct CacheResponse {
    pub rcode: ResponseCode,
    pub answer: Vec<DnsRecord>,
    pub authority: Vec<DnsRecord>,
    pub additional: Vec<DnsRecord>,
    /// EDNS options to attach to the response OPT record
    pub options: Vec<EdnsOption>,
    /// AD bit: answer head validated Secure (or negative proof trusted)
    pub authentic_data: bool,
    /// Advertised UDP payload size for the response EDNS
    pub udp_payload_size: u16,
}

impl CacheResponse {
    pub fn referral(udp_payload_size: u16) -> Self {
        Self {
            udp_payload_size,
            ..Self::default()
        }
    }
}
