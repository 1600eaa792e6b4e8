//! EDNS option model for cached and synthesized responses.
//!
//! Only the options the cache produces or stores are modeled: Client Subnet
//! (RFC 7871) and Extended DNS Errors (RFC 8914). Anything else rides along
//! as an opaque `EdnsOption`.

use std::net::IpAddr;

/// A single EDNS option as carried in an OPT record's RDATA
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EdnsOption {
    /// Option code (2 bytes)
    pub code: u16,
    /// Option data
    pub data: Vec<u8>,
}

/// EDNS option codes the cache knows about
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdnsOptionCode {
    /// Client Subnet (RFC 7871)
    ClientSubnet = 8,
    /// DNS Cookies (RFC 7873)
    Cookie = 10,
    /// Padding (RFC 7830)
    Padding = 12,
    /// Extended DNS Error (RFC 8914)
    ExtendedDnsError = 15,
}

/// Extended DNS Error info codes the cache emits (RFC 8914)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdeCode {
    StaleAnswer = 3,
    StaleNxDomainAnswer = 19,
}

/// Extended DNS Error option (RFC 8914)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtendedDnsError {
    pub info_code: u16,
    pub extra_text: String,
}

impl ExtendedDnsError {
    pub fn new(code: EdeCode) -> Self {
        Self {
            info_code: code as u16,
            extra_text: String::new(),
        }
    }

    pub fn to_option(&self) -> EdnsOption {
        let mut data = Vec::with_capacity(2 + self.extra_text.len());
        data.extend_from_slice(&self.info_code.to_be_bytes());
        data.extend_from_slice(self.extra_text.as_bytes());
        EdnsOption {
            code: EdnsOptionCode::ExtendedDnsError as u16,
            data,
        }
    }

    pub fn from_option(option: &EdnsOption) -> Option<Self> {
        if option.code != EdnsOptionCode::ExtendedDnsError as u16 || option.data.len() < 2 {
            return None;
        }
        Some(Self {
            info_code: u16::from_be_bytes([option.data[0], option.data[1]]),
            extra_text: String::from_utf8_lossy(&option.data[2..]).into_owned(),
        })
    }
}

/// Client Subnet option (RFC 7871)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientSubnet {
    pub source_prefix: u8,
    pub scope_prefix: u8,
    pub address: IpAddr,
}

impl ClientSubnet {
    pub fn new(address: IpAddr, source_prefix: u8) -> Self {
        Self {
            source_prefix,
            scope_prefix: 0,
            address,
        }
    }

    /// Address family per the RFC: 1 = IPv4, 2 = IPv6
    pub fn family(&self) -> u16 {
        match self.address {
            IpAddr::V4(_) => 1,
            IpAddr::V6(_) => 2,
        }
    }

    /// Serialize to wire option format: FAMILY, SOURCE PREFIX-LENGTH,
    /// SCOPE PREFIX-LENGTH, ADDRESS (truncated to the source prefix)
    pub fn to_option(&self) -> EdnsOption {
        let address_bytes: Vec<u8> = match self.address {
            IpAddr::V4(v4) => v4.octets().to_vec(),
            IpAddr::V6(v6) => v6.octets().to_vec(),
        };
        let significant = (self.source_prefix as usize).div_ceil(8);

        let mut data = Vec::with_capacity(4 + significant);
        data.extend_from_slice(&self.family().to_be_bytes());
        data.push(self.source_prefix);
        data.push(self.scope_prefix);
        data.extend_from_slice(&address_bytes[..significant.min(address_bytes.len())]);

        EdnsOption {
            code: EdnsOptionCode::ClientSubnet as u16,
            data,
        }
    }

    pub fn from_option(option: &EdnsOption) -> Option<Self> {
        if option.code != EdnsOptionCode::ClientSubnet as u16 || option.data.len() < 4 {
            return None;
        }

        let family = u16::from_be_bytes([option.data[0], option.data[1]]);
        let source_prefix = option.data[2];
        let scope_prefix = option.data[3];
        let address_bytes = &option.data[4..];

        let address = match family {
            1 => {
                let mut octets = [0u8; 4];
                for (i, byte) in address_bytes.iter().take(4).enumerate() {
                    octets[i] = *byte;
                }
                IpAddr::from(octets)
            }
            2 => {
                let mut octets = [0u8; 16];
                for (i, byte) in address_bytes.iter().take(16).enumerate() {
                    octets[i] = *byte;
                }
                IpAddr::from(octets)
            }
            _ => return None,
        };

        Some(Self {
            source_prefix,
            scope_prefix,
            address,
        })
    }
}
