/// Pseudo-type code used for special cache sentinels (private-use range)
const SPECIAL_TYPE_CODE: u16 = 65534;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum RecordType {
    #[default]
    A,
    NS,
    CNAME,
    SOA,
    PTR,
    MX,
    TXT,
    AAAA,
    SRV,
    DS,
    RRSIG,
    NSEC,
    DNSKEY,
    NSEC3,
    SVCB,
    HTTPS,
    DNAME,
    OPT,
    ANY,
    /// Synthetic type for cached negative/failure sentinels; matched
    /// regardless of the queried type when special lookup is allowed
    Special,
    Unknown(u16),
}

impl From<u16> for RecordType {
    fn from(value: u16) -> Self {
        match value {
            1 => RecordType::A,
            2 => RecordType::NS,
            5 => RecordType::CNAME,
            6 => RecordType::SOA,
            12 => RecordType::PTR,
            15 => RecordType::MX,
            16 => RecordType::TXT,
            28 => RecordType::AAAA,
            33 => RecordType::SRV,
            39 => RecordType::DNAME,
            41 => RecordType::OPT,
            43 => RecordType::DS,
            46 => RecordType::RRSIG,
            47 => RecordType::NSEC,
            48 => RecordType::DNSKEY,
            50 => RecordType::NSEC3,
            64 => RecordType::SVCB,
            65 => RecordType::HTTPS,
            255 => RecordType::ANY,
            SPECIAL_TYPE_CODE => RecordType::Special,
            x => RecordType::Unknown(x),
        }
    }
}

impl From<RecordType> for u16 {
    fn from(rtype: RecordType) -> Self {
        match rtype {
            RecordType::A => 1,
            RecordType::NS => 2,
            RecordType::CNAME => 5,
            RecordType::SOA => 6,
            RecordType::PTR => 12,
            RecordType::MX => 15,
            RecordType::TXT => 16,
            RecordType::AAAA => 28,
            RecordType::SRV => 33,
            RecordType::DNAME => 39,
            RecordType::OPT => 41,
            RecordType::DS => 43,
            RecordType::RRSIG => 46,
            RecordType::NSEC => 47,
            RecordType::DNSKEY => 48,
            RecordType::NSEC3 => 50,
            RecordType::SVCB => 64,
            RecordType::HTTPS => 65,
            RecordType::ANY => 255,
            RecordType::Special => SPECIAL_TYPE_CODE,
            RecordType::Unknown(x) => x,
        }
    }
}

impl RecordType {
    /// Types whose targets get additional-section address records
    pub fn needs_glue(&self) -> bool {
        matches!(
            self,
            RecordType::NS | RecordType::MX | RecordType::SRV | RecordType::SVCB | RecordType::HTTPS
        )
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum RecordClass {
    #[default]
    IN,
    CS,
    CH,
    HS,
    ANY,
}

impl From<u16> for RecordClass {
    fn from(value: u16) -> Self {
        match value {
            1 => RecordClass::IN,
            2 => RecordClass::CS,
            3 => RecordClass::CH,
            4 => RecordClass::HS,
            255 => RecordClass::ANY,
            _ => RecordClass::IN,
        }
    }
}

impl From<RecordClass> for u16 {
    fn from(rclass: RecordClass) -> Self {
        match rclass {
            RecordClass::IN => 1,
            RecordClass::CS => 2,
            RecordClass::CH => 3,
            RecordClass::HS => 4,
            RecordClass::ANY => 255,
        }
    }
}

/// DNS response codes from RFC 1035 and subsequent RFCs
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ResponseCode {
    #[default]
    NoError,
    FormErr,
    ServFail,
    NxDomain,
    NotImp,
    Refused,
    YxDomain,
    YxRrSet,
    NxRrSet,
    NotAuth,
    NotZone,
    BadVers,
}

impl ResponseCode {
    pub fn to_u8(self) -> u8 {
        match self {
            ResponseCode::NoError => 0,
            ResponseCode::FormErr => 1,
            ResponseCode::ServFail => 2,
            ResponseCode::NxDomain => 3,
            ResponseCode::NotImp => 4,
            ResponseCode::Refused => 5,
            ResponseCode::YxDomain => 6,
            ResponseCode::YxRrSet => 7,
            ResponseCode::NxRrSet => 8,
            ResponseCode::NotAuth => 9,
            ResponseCode::NotZone => 10,
            ResponseCode::BadVers => 16,
        }
    }

    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => ResponseCode::NoError,
            1 => ResponseCode::FormErr,
            2 => ResponseCode::ServFail,
            3 => ResponseCode::NxDomain,
            4 => ResponseCode::NotImp,
            5 => ResponseCode::Refused,
            6 => ResponseCode::YxDomain,
            7 => ResponseCode::YxRrSet,
            8 => ResponseCode::NxRrSet,
            9 => ResponseCode::NotAuth,
            10 => ResponseCode::NotZone,
            16 => ResponseCode::BadVers,
            _ => ResponseCode::ServFail,
        }
    }
}

/// Validation status attached to each cached record by the resolver.
/// The cache only propagates these; it never validates signatures itself.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum DnssecStatus {
    #[default]
    Unknown,
    Disabled,
    Insecure,
    Secure,
    Bogus,
}

impl DnssecStatus {
    pub fn to_u8(self) -> u8 {
        match self {
            DnssecStatus::Unknown => 0,
            DnssecStatus::Disabled => 1,
            DnssecStatus::Insecure => 2,
            DnssecStatus::Secure => 3,
            DnssecStatus::Bogus => 4,
        }
    }

    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => DnssecStatus::Disabled,
            2 => DnssecStatus::Insecure,
            3 => DnssecStatus::Secure,
            4 => DnssecStatus::Bogus,
            _ => DnssecStatus::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_type_round_trip() {
        for code in [1u16, 2, 5, 6, 15, 28, 33, 39, 43, 46, 47, 50, 64, 65, 255, 65534] {
            let rtype = RecordType::from(code);
            assert_eq!(u16::from(rtype), code);
        }
        assert_eq!(RecordType::from(9999), RecordType::Unknown(9999));
    }

    #[test]
    fn test_needs_glue() {
        assert!(RecordType::NS.needs_glue());
        assert!(RecordType::MX.needs_glue());
        assert!(RecordType::HTTPS.needs_glue());
        assert!(!RecordType::A.needs_glue());
        assert!(!RecordType::CNAME.needs_glue());
    }
}
