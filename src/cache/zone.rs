use super::entry::CacheEntry;
use super::record_info::CachedRecord;
use super::snapshot;
use crate::dns::edns::ClientSubnet;
use crate::dns::enums::RecordType;
use crate::dns::record::DnsRecord;
use crate::errors::Result;
use dashmap::DashMap;
use std::io::{Read, Write};
use std::sync::Arc;
use tracing::trace;

/// Per-owner storage: the entry sets for every record type cached at one
/// name. Reads run concurrently; writes serialize per type inside the entry.
#[derive(Debug)]
pub struct CacheZone {
    name: String,
    entries: DashMap<RecordType, CacheEntry>,
}

impl CacheZone {
    pub fn new(name: String) -> Self {
        Self {
            name,
            entries: DashMap::new(),
        }
    }

    /// Canonical owner name; the root zone's name is empty
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replace the scoped variant the records' metadata selects. Returns the
    /// net variant-count change for `total_entries` accounting.
    pub fn set_records(
        &self,
        records: Vec<Arc<CachedRecord>>,
        now: u64,
        serve_stale: bool,
    ) -> i64 {
        let rtype = match records.first() {
            Some(head) => head.record.rtype,
            None => return 0,
        };
        trace!("Caching {} record(s) for {}", records.len(), self.name);
        self.entries
            .entry(rtype)
            .or_default()
            .set(records, now, serve_stale)
    }

    /// Best-scope records for a question type. An expired head (outside the
    /// caller's serve-stale stance) yields nothing. With `allow_special`, a
    /// cached sentinel answers regardless of the requested type once the
    /// typed lookup misses.
    pub fn query_records(
        &self,
        qtype: RecordType,
        subnet: Option<&ClientSubnet>,
        conditional_forwarding: bool,
        now: u64,
        serve_stale: bool,
        allow_special: bool,
    ) -> Vec<Arc<CachedRecord>> {
        if qtype == RecordType::ANY {
            let mut records = Vec::new();
            for entry in self.entries.iter() {
                if *entry.key() == RecordType::Special {
                    continue;
                }
                if let Some(found) =
                    entry.select(subnet, conditional_forwarding, now, serve_stale)
                {
                    records.extend(found);
                }
            }
            return records;
        }

        if let Some(entry) = self.entries.get(&qtype) {
            if let Some(records) = entry.select(subnet, conditional_forwarding, now, serve_stale) {
                return records;
            }
        }

        // A CNAME at the owner answers any other question type
        if qtype != RecordType::CNAME && qtype != RecordType::Special {
            if let Some(entry) = self.entries.get(&RecordType::CNAME) {
                if let Some(records) =
                    entry.select(subnet, conditional_forwarding, now, serve_stale)
                {
                    return records;
                }
            }
        }

        if allow_special && qtype != RecordType::Special {
            if let Some(entry) = self.entries.get(&RecordType::Special) {
                if let Some(records) =
                    entry.select(subnet, conditional_forwarding, now, serve_stale)
                {
                    if records
                        .first()
                        .map(|head| head.record.rdata.is_special())
                        .unwrap_or(false)
                    {
                        return records;
                    }
                }
            }
        }

        Vec::new()
    }

    /// True if a live (possibly stale-usable) record set exists for `rtype`,
    /// without touching LRU state
    pub fn has_live_records(&self, rtype: RecordType, now: u64) -> bool {
        self.entries
            .get(&rtype)
            .map(|entry| entry.has_usable(now, true))
            .unwrap_or(false)
    }

    /// Drop variants with no remaining usable record; returns removed count
    pub fn remove_expired_records(&self, now: u64, serve_stale: bool) -> usize {
        let mut removed = 0;
        for entry in self.entries.iter() {
            removed += entry.remove_expired(now, serve_stale);
        }
        self.entries.retain(|_, entry| entry.variant_count() > 0);
        removed
    }

    /// Drop variants last used before `cutoff`; returns removed count
    pub fn remove_least_used_records(&self, cutoff: u64) -> usize {
        let mut removed = 0;
        for entry in self.entries.iter() {
            removed += entry.remove_least_used(cutoff);
        }
        self.entries.retain(|_, entry| entry.variant_count() > 0);
        removed
    }

    /// Drop all ECS-scoped variants, retaining only global ones
    pub fn delete_ecs_data(&self) -> usize {
        let mut removed = 0;
        for entry in self.entries.iter() {
            removed += entry.remove_ecs_scoped();
        }
        self.entries.retain(|_, entry| entry.variant_count() > 0);
        removed
    }

    /// Append every stored record (all types, all scopes) to `out`,
    /// TTL-adjusted to remaining life
    pub fn list_all_records(&self, now: u64, out: &mut Vec<DnsRecord>) {
        for entry in self.entries.iter() {
            for (_, records, _) in entry.variants_snapshot() {
                for record in records {
                    out.push(record.to_record(now));
                }
            }
        }
    }

    /// Number of scoped variants across all types
    pub fn total_entries(&self) -> usize {
        self.entries
            .iter()
            .map(|entry| entry.variant_count())
            .sum()
    }

    pub fn is_empty(&self, now: u64) -> bool {
        self.entries.iter().all(|entry| entry.is_empty(now))
    }

    /// Serialize this zone into the snapshot stream. Operates on a per-entry
    /// snapshot so concurrent mutation elsewhere is tolerated.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        snapshot::write_string(writer, &self.name)?;

        let entries: Vec<(RecordType, Vec<_>)> = self
            .entries
            .iter()
            .map(|entry| (*entry.key(), entry.variants_snapshot()))
            .collect();

        snapshot::write_u32(writer, entries.len() as u32)?;
        for (rtype, variants) in entries {
            snapshot::write_u16(writer, u16::from(rtype))?;
            snapshot::write_u32(writer, variants.len() as u32)?;
            for (_, records, last_used) in variants {
                snapshot::write_u64(writer, last_used)?;
                snapshot::write_u32(writer, records.len() as u32)?;
                for record in &records {
                    snapshot::write_cached_record(writer, record)?;
                }
            }
        }
        Ok(())
    }

    /// Read one zone back from the snapshot stream, discarding variants that
    /// are no longer usable under the given serve-stale stance.
    pub fn read_from<R: Read>(reader: &mut R, now: u64, serve_stale: bool) -> Result<Self> {
        let name = snapshot::read_string(reader)?;
        let zone = Self::new(name);

        let entry_count = snapshot::read_list_len(reader)?;
        for _ in 0..entry_count {
            let rtype = RecordType::from(snapshot::read_u16(reader)?);
            let variant_count = snapshot::read_list_len(reader)?;
            for _ in 0..variant_count {
                let last_used = snapshot::read_u64(reader)?;
                let record_count = snapshot::read_list_len(reader)?;
                let mut records = Vec::with_capacity(record_count);
                for _ in 0..record_count {
                    records.push(Arc::new(snapshot::read_cached_record(reader)?));
                }

                let usable = records
                    .iter()
                    .any(|record| record.is_usable(now, serve_stale));
                if !usable || records.is_empty() {
                    continue;
                }

                let scope = records[0].scope_key();
                zone.entries
                    .entry(rtype)
                    .or_default()
                    .restore(scope, records, last_used);
            }
        }
        Ok(zone)
    }
}
