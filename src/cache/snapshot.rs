//! Binary snapshot codec for the cache file.
//!
//! Layout: two magic bytes `"CZ"`, a version byte, then zone records until
//! EOF. All integers are big-endian; names and blobs are length-prefixed.

use super::record_info::{CacheRecordInfo, CachedRecord, EcsScope};
use crate::dns::edns::EdnsOption;
use crate::dns::enums::{DnssecStatus, RecordClass, RecordType, ResponseCode};
use crate::dns::rdata::{RData, SpecialCacheData, SpecialKind};
use crate::dns::record::DnsRecord;
use crate::errors::{CacheError, Result};
use std::io::{Read, Write};
use std::net::IpAddr;

pub const SNAPSHOT_MAGIC: [u8; 2] = *b"CZ";
pub const SNAPSHOT_VERSION: u8 = 1;

/// Upper bound on any length field; anything larger marks a corrupt file
const MAX_LIST_LEN: u32 = 1 << 20;

fn corrupt(detail: &str) -> CacheError {
    CacheError::CorruptSnapshot(detail.to_string())
}

pub fn write_u8<W: Write>(writer: &mut W, value: u8) -> Result<()> {
    writer.write_all(&[value])?;
    Ok(())
}

pub fn write_u16<W: Write>(writer: &mut W, value: u16) -> Result<()> {
    writer.write_all(&value.to_be_bytes())?;
    Ok(())
}

pub fn write_u32<W: Write>(writer: &mut W, value: u32) -> Result<()> {
    writer.write_all(&value.to_be_bytes())?;
    Ok(())
}

pub fn write_u64<W: Write>(writer: &mut W, value: u64) -> Result<()> {
    writer.write_all(&value.to_be_bytes())?;
    Ok(())
}

pub fn read_u8<R: Read>(reader: &mut R) -> Result<u8> {
    let mut buf = [0u8; 1];
    reader.read_exact(&mut buf)?;
    Ok(buf[0])
}

pub fn read_u16<R: Read>(reader: &mut R) -> Result<u16> {
    let mut buf = [0u8; 2];
    reader.read_exact(&mut buf)?;
    Ok(u16::from_be_bytes(buf))
}

pub fn read_u32<R: Read>(reader: &mut R) -> Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

pub fn read_u64<R: Read>(reader: &mut R) -> Result<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(u64::from_be_bytes(buf))
}

pub fn write_string<W: Write>(writer: &mut W, value: &str) -> Result<()> {
    if value.len() > u16::MAX as usize {
        return Err(CacheError::InvalidInput("string too long for snapshot".into()));
    }
    write_u16(writer, value.len() as u16)?;
    writer.write_all(value.as_bytes())?;
    Ok(())
}

pub fn read_string<R: Read>(reader: &mut R) -> Result<String> {
    let len = read_u16(reader)? as usize;
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|_| corrupt("non-UTF8 string"))
}

pub fn write_bytes<W: Write>(writer: &mut W, value: &[u8]) -> Result<()> {
    write_u32(writer, value.len() as u32)?;
    writer.write_all(value)?;
    Ok(())
}

pub fn read_bytes<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
    let len = read_u32(reader)?;
    if len > MAX_LIST_LEN {
        return Err(corrupt("oversize byte blob"));
    }
    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

pub fn read_list_len<R: Read>(reader: &mut R) -> Result<usize> {
    let len = read_u32(reader)?;
    if len > MAX_LIST_LEN {
        return Err(corrupt("oversize list"));
    }
    Ok(len as usize)
}

fn write_ip<W: Write>(writer: &mut W, address: &IpAddr) -> Result<()> {
    match address {
        IpAddr::V4(v4) => {
            write_u8(writer, 4)?;
            writer.write_all(&v4.octets())?;
        }
        IpAddr::V6(v6) => {
            write_u8(writer, 6)?;
            writer.write_all(&v6.octets())?;
        }
    }
    Ok(())
}

fn read_ip<R: Read>(reader: &mut R) -> Result<IpAddr> {
    match read_u8(reader)? {
        4 => {
            let mut octets = [0u8; 4];
            reader.read_exact(&mut octets)?;
            Ok(IpAddr::from(octets))
        }
        6 => {
            let mut octets = [0u8; 16];
            reader.read_exact(&mut octets)?;
            Ok(IpAddr::from(octets))
        }
        _ => Err(corrupt("bad address family")),
    }
}

fn write_type_list<W: Write>(writer: &mut W, types: &[RecordType]) -> Result<()> {
    write_u16(writer, types.len() as u16)?;
    for rtype in types {
        write_u16(writer, u16::from(*rtype))?;
    }
    Ok(())
}

fn read_type_list<R: Read>(reader: &mut R) -> Result<Vec<RecordType>> {
    let count = read_u16(reader)? as usize;
    let mut types = Vec::with_capacity(count);
    for _ in 0..count {
        types.push(RecordType::from(read_u16(reader)?));
    }
    Ok(types)
}

pub fn write_options<W: Write>(writer: &mut W, options: &[EdnsOption]) -> Result<()> {
    write_u32(writer, options.len() as u32)?;
    for option in options {
        write_u16(writer, option.code)?;
        write_bytes(writer, &option.data)?;
    }
    Ok(())
}

pub fn read_options<R: Read>(reader: &mut R) -> Result<Vec<EdnsOption>> {
    let count = read_list_len(reader)?;
    let mut options = Vec::with_capacity(count);
    for _ in 0..count {
        let code = read_u16(reader)?;
        let data = read_bytes(reader)?;
        options.push(EdnsOption { code, data });
    }
    Ok(options)
}

fn write_rdata<W: Write>(writer: &mut W, rdata: &RData) -> Result<()> {
    match rdata {
        RData::A(address) => {
            write_u8(writer, 1)?;
            writer.write_all(&address.octets())?;
        }
        RData::Aaaa(address) => {
            write_u8(writer, 2)?;
            writer.write_all(&address.octets())?;
        }
        RData::Ns(host) => {
            write_u8(writer, 3)?;
            write_string(writer, host)?;
        }
        RData::Cname(target) => {
            write_u8(writer, 4)?;
            write_string(writer, target)?;
        }
        RData::Dname(target) => {
            write_u8(writer, 5)?;
            write_string(writer, target)?;
        }
        RData::Ptr(target) => {
            write_u8(writer, 6)?;
            write_string(writer, target)?;
        }
        RData::Soa {
            mname,
            rname,
            serial,
            refresh,
            retry,
            expire,
            minimum,
        } => {
            write_u8(writer, 7)?;
            write_string(writer, mname)?;
            write_string(writer, rname)?;
            write_u32(writer, *serial)?;
            write_u32(writer, *refresh)?;
            write_u32(writer, *retry)?;
            write_u32(writer, *expire)?;
            write_u32(writer, *minimum)?;
        }
        RData::Mx {
            preference,
            exchange,
        } => {
            write_u8(writer, 8)?;
            write_u16(writer, *preference)?;
            write_string(writer, exchange)?;
        }
        RData::Txt(strings) => {
            write_u8(writer, 9)?;
            write_u16(writer, strings.len() as u16)?;
            for value in strings {
                write_string(writer, value)?;
            }
        }
        RData::Srv {
            priority,
            weight,
            port,
            target,
        } => {
            write_u8(writer, 10)?;
            write_u16(writer, *priority)?;
            write_u16(writer, *weight)?;
            write_u16(writer, *port)?;
            write_string(writer, target)?;
        }
        RData::Svcb {
            priority,
            target,
            params,
        } => {
            write_u8(writer, 11)?;
            write_u16(writer, *priority)?;
            write_string(writer, target)?;
            write_bytes(writer, params)?;
        }
        RData::Https {
            priority,
            target,
            params,
        } => {
            write_u8(writer, 12)?;
            write_u16(writer, *priority)?;
            write_string(writer, target)?;
            write_bytes(writer, params)?;
        }
        RData::Ds {
            key_tag,
            algorithm,
            digest_type,
            digest,
        } => {
            write_u8(writer, 13)?;
            write_u16(writer, *key_tag)?;
            write_u8(writer, *algorithm)?;
            write_u8(writer, *digest_type)?;
            write_bytes(writer, digest)?;
        }
        RData::Rrsig {
            type_covered,
            algorithm,
            labels,
            original_ttl,
            expiration,
            inception,
            key_tag,
            signer,
            signature,
        } => {
            write_u8(writer, 14)?;
            write_u16(writer, u16::from(*type_covered))?;
            write_u8(writer, *algorithm)?;
            write_u8(writer, *labels)?;
            write_u32(writer, *original_ttl)?;
            write_u32(writer, *expiration)?;
            write_u32(writer, *inception)?;
            write_u16(writer, *key_tag)?;
            write_string(writer, signer)?;
            write_bytes(writer, signature)?;
        }
        RData::Nsec { next, types } => {
            write_u8(writer, 15)?;
            write_string(writer, next)?;
            write_type_list(writer, types)?;
        }
        RData::Nsec3 {
            algorithm,
            flags,
            iterations,
            salt,
            next_hashed,
            types,
        } => {
            write_u8(writer, 16)?;
            write_u8(writer, *algorithm)?;
            write_u8(writer, *flags)?;
            write_u16(writer, *iterations)?;
            write_bytes(writer, salt)?;
            write_bytes(writer, next_hashed)?;
            write_type_list(writer, types)?;
        }
        RData::Special(data) => {
            write_u8(writer, 17)?;
            write_special(writer, data)?;
        }
        RData::Unknown(code, payload) => {
            write_u8(writer, 0)?;
            write_u16(writer, *code)?;
            write_bytes(writer, payload)?;
        }
    }
    Ok(())
}

fn read_rdata<R: Read>(reader: &mut R) -> Result<RData> {
    let tag = read_u8(reader)?;
    let rdata = match tag {
        1 => {
            let mut octets = [0u8; 4];
            reader.read_exact(&mut octets)?;
            RData::A(octets.into())
        }
        2 => {
            let mut octets = [0u8; 16];
            reader.read_exact(&mut octets)?;
            RData::Aaaa(octets.into())
        }
        3 => RData::Ns(read_string(reader)?),
        4 => RData::Cname(read_string(reader)?),
        5 => RData::Dname(read_string(reader)?),
        6 => RData::Ptr(read_string(reader)?),
        7 => RData::Soa {
            mname: read_string(reader)?,
            rname: read_string(reader)?,
            serial: read_u32(reader)?,
            refresh: read_u32(reader)?,
            retry: read_u32(reader)?,
            expire: read_u32(reader)?,
            minimum: read_u32(reader)?,
        },
        8 => RData::Mx {
            preference: read_u16(reader)?,
            exchange: read_string(reader)?,
        },
        9 => {
            let count = read_u16(reader)? as usize;
            let mut strings = Vec::with_capacity(count);
            for _ in 0..count {
                strings.push(read_string(reader)?);
            }
            RData::Txt(strings)
        }
        10 => RData::Srv {
            priority: read_u16(reader)?,
            weight: read_u16(reader)?,
            port: read_u16(reader)?,
            target: read_string(reader)?,
        },
        11 => RData::Svcb {
            priority: read_u16(reader)?,
            target: read_string(reader)?,
            params: read_bytes(reader)?,
        },
        12 => RData::Https {
            priority: read_u16(reader)?,
            target: read_string(reader)?,
            params: read_bytes(reader)?,
        },
        13 => RData::Ds {
            key_tag: read_u16(reader)?,
            algorithm: read_u8(reader)?,
            digest_type: read_u8(reader)?,
            digest: read_bytes(reader)?,
        },
        14 => RData::Rrsig {
            type_covered: RecordType::from(read_u16(reader)?),
            algorithm: read_u8(reader)?,
            labels: read_u8(reader)?,
            original_ttl: read_u32(reader)?,
            expiration: read_u32(reader)?,
            inception: read_u32(reader)?,
            key_tag: read_u16(reader)?,
            signer: read_string(reader)?,
            signature: read_bytes(reader)?,
        },
        15 => RData::Nsec {
            next: read_string(reader)?,
            types: read_type_list(reader)?,
        },
        16 => RData::Nsec3 {
            algorithm: read_u8(reader)?,
            flags: read_u8(reader)?,
            iterations: read_u16(reader)?,
            salt: read_bytes(reader)?,
            next_hashed: read_bytes(reader)?,
            types: read_type_list(reader)?,
        },
        17 => RData::Special(Box::new(read_special(reader)?)),
        0 => RData::Unknown(read_u16(reader)?, read_bytes(reader)?),
        _ => return Err(corrupt("unknown rdata tag")),
    };
    Ok(rdata)
}

fn write_special<W: Write>(writer: &mut W, data: &SpecialCacheData) -> Result<()> {
    write_u8(writer, data.kind.to_u8())?;
    write_u8(writer, data.rcode.to_u8())?;
    write_u8(writer, data.original_rcode.to_u8())?;
    write_plain_records(writer, &data.original_answer)?;
    write_plain_records(writer, &data.original_authority)?;
    write_plain_records(writer, &data.original_additional)?;
    write_plain_records(writer, &data.no_dnssec_authority)?;
    write_options(writer, &data.options)?;
    Ok(())
}

fn read_special<R: Read>(reader: &mut R) -> Result<SpecialCacheData> {
    Ok(SpecialCacheData {
        kind: SpecialKind::from_u8(read_u8(reader)?),
        rcode: ResponseCode::from_u8(read_u8(reader)?),
        original_rcode: ResponseCode::from_u8(read_u8(reader)?),
        original_answer: read_plain_records(reader)?,
        original_authority: read_plain_records(reader)?,
        original_additional: read_plain_records(reader)?,
        no_dnssec_authority: read_plain_records(reader)?,
        options: read_options(reader)?,
    })
}

pub fn write_plain_record<W: Write>(writer: &mut W, record: &DnsRecord) -> Result<()> {
    write_string(writer, &record.name)?;
    write_u16(writer, u16::from(record.rtype))?;
    write_u16(writer, u16::from(record.rclass))?;
    write_u32(writer, record.ttl)?;
    write_u8(writer, record.dnssec_status.to_u8())?;
    write_u64(writer, record.received_at)?;
    write_rdata(writer, &record.rdata)
}

pub fn read_plain_record<R: Read>(reader: &mut R) -> Result<DnsRecord> {
    let name = read_string(reader)?;
    let rtype = RecordType::from(read_u16(reader)?);
    let rclass = RecordClass::from(read_u16(reader)?);
    let ttl = read_u32(reader)?;
    let dnssec_status = DnssecStatus::from_u8(read_u8(reader)?);
    let received_at = read_u64(reader)?;
    let rdata = read_rdata(reader)?;
    Ok(DnsRecord {
        name,
        rtype,
        rclass,
        ttl,
        rdata,
        dnssec_status,
        received_at,
    })
}

fn write_plain_records<W: Write>(writer: &mut W, records: &[DnsRecord]) -> Result<()> {
    write_u32(writer, records.len() as u32)?;
    for record in records {
        write_plain_record(writer, record)?;
    }
    Ok(())
}

fn read_plain_records<R: Read>(reader: &mut R) -> Result<Vec<DnsRecord>> {
    let count = read_list_len(reader)?;
    let mut records = Vec::with_capacity(count);
    for _ in 0..count {
        records.push(read_plain_record(reader)?);
    }
    Ok(records)
}

fn write_scope<W: Write>(writer: &mut W, scope: &Option<EcsScope>) -> Result<()> {
    match scope {
        Some(scope) => {
            write_u8(writer, 1)?;
            write_ip(writer, &scope.address)?;
            write_u8(writer, scope.prefix)?;
        }
        None => write_u8(writer, 0)?,
    }
    Ok(())
}

fn read_scope<R: Read>(reader: &mut R) -> Result<Option<EcsScope>> {
    match read_u8(reader)? {
        0 => Ok(None),
        1 => {
            let address = read_ip(reader)?;
            let prefix = read_u8(reader)?;
            Ok(Some(EcsScope::new(address, prefix)))
        }
        _ => Err(corrupt("bad scope tag")),
    }
}

/// Serialize a cached envelope: the record, its lifetime state and its
/// companion metadata (recursively).
pub fn write_cached_record<W: Write>(writer: &mut W, cached: &CachedRecord) -> Result<()> {
    write_plain_record(writer, &cached.record)?;
    write_u64(writer, cached.expires_at())?;
    write_u8(writer, cached.was_expiry_reset() as u8)?;
    write_scope(writer, &cached.info.ecs_scope)?;
    write_u8(writer, cached.info.conditional_forwarding as u8)?;
    write_cached_records(writer, &cached.info.glue)?;
    write_cached_records(writer, &cached.info.rrsigs)?;
    write_cached_records(writer, &cached.info.nsecs)?;
    Ok(())
}

pub fn read_cached_record<R: Read>(reader: &mut R) -> Result<CachedRecord> {
    let record = read_plain_record(reader)?;
    let expires_at = read_u64(reader)?;
    let expiry_reset = read_u8(reader)? != 0;
    let info = CacheRecordInfo {
        ecs_scope: read_scope(reader)?,
        conditional_forwarding: read_u8(reader)? != 0,
        glue: read_cached_records(reader)?,
        rrsigs: read_cached_records(reader)?,
        nsecs: read_cached_records(reader)?,
    };
    Ok(CachedRecord::restore(record, info, expires_at, expiry_reset))
}

pub fn write_cached_records<W: Write>(writer: &mut W, records: &[CachedRecord]) -> Result<()> {
    write_u32(writer, records.len() as u32)?;
    for record in records {
        write_cached_record(writer, record)?;
    }
    Ok(())
}

pub fn read_cached_records<R: Read>(reader: &mut R) -> Result<Vec<CachedRecord>> {
    let count = read_list_len(reader)?;
    let mut records = Vec::with_capacity(count);
    for _ in 0..count {
        records.push(read_cached_record(reader)?);
    }
    Ok(records)
}
