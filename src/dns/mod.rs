pub mod edns;
pub mod enums;
pub mod message;
pub mod name;
pub mod rdata;
pub mod record;

pub use enums::{DnssecStatus, RecordClass, RecordType, ResponseCode};
pub use message::{CacheQuestion, CacheRequest, CacheResponse};
pub use rdata::{RData, SpecialCacheData, SpecialKind};
pub use record::DnsRecord;
