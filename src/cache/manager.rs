use super::record_info::CachedRecord;
use super::snapshot::{SNAPSHOT_MAGIC, SNAPSHOT_VERSION};
use super::tree::{CacheTree, FindResult};
use super::zone::CacheZone;
use super::{
    now_unix, CacheStats, LabelParentZones, ParentZoneProvider, CACHE_FILE_NAME, MAX_CNAME_HOPS,
};
use crate::config::CacheConfig;
use crate::dns::edns::{ClientSubnet, EdeCode, ExtendedDnsError};
use crate::dns::enums::{DnssecStatus, RecordType, ResponseCode};
use crate::dns::message::{CacheRequest, CacheResponse};
use crate::dns::name;
use crate::dns::rdata::{RData, SpecialKind};
use crate::dns::record::DnsRecord;
use crate::errors::{CacheError, Result};
use rustc_hash::FxHashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, trace};

/// The cache manager: ingest, query assembly, eviction and snapshots over
/// the zone tree. One long-lived instance per server.
pub struct CacheManager {
    config: CacheConfig,
    tree: CacheTree,
    total_entries: AtomicI64,
    maximum_entries: AtomicI64,
    parent_zones: Box<dyn ParentZoneProvider>,
    stats: CacheStats,
}

impl CacheManager {
    pub fn new(config: CacheConfig) -> Self {
        Self::with_parent_zones(config, Box::new(LabelParentZones))
    }

    /// Wire in the authoritative-zone layer's parent-zone lookup
    pub fn with_parent_zones(config: CacheConfig, parent_zones: Box<dyn ParentZoneProvider>) -> Self {
        let maximum_entries = config.maximum_entries;
        Self {
            config,
            tree: CacheTree::new(),
            total_entries: AtomicI64::new(0),
            maximum_entries: AtomicI64::new(maximum_entries),
            parent_zones,
            stats: CacheStats::new(),
        }
    }

    pub fn total_entries(&self) -> i64 {
        self.total_entries.load(Ordering::Relaxed).max(0)
    }

    pub fn maximum_entries(&self) -> i64 {
        self.maximum_entries.load(Ordering::Relaxed)
    }

    /// 0 disables capacity eviction; negative values are rejected
    pub fn set_maximum_entries(&self, maximum: i64) -> Result<()> {
        if maximum < 0 {
            return Err(CacheError::InvalidInput(format!(
                "Invalid cache size: {}",
                maximum
            )));
        }
        self.maximum_entries.store(maximum, Ordering::Relaxed);
        Ok(())
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    pub fn debug_info(&self) -> String {
        format!(
            "Cache: entries={}/{}, hits={}, misses={}, hit_rate={:.2}%, negative_hits={}, evictions={}, expired={}",
            self.total_entries(),
            self.maximum_entries(),
            self.stats.hits.load(Ordering::Relaxed),
            self.stats.misses.load(Ordering::Relaxed),
            self.stats.hit_rate() * 100.0,
            self.stats.negative_hits.load(Ordering::Relaxed),
            self.stats.evictions.load(Ordering::Relaxed),
            self.stats.expired_evictions.load(Ordering::Relaxed)
        )
    }

    /// Apply a signed delta to the entry counter. A negative transient from
    /// racing removals is corrected by a single compensating add.
    fn adjust_total(&self, delta: i64) {
        if delta == 0 {
            return;
        }
        let new_value = self.total_entries.fetch_add(delta, Ordering::Relaxed) + delta;
        if new_value < 0 {
            self.total_entries.fetch_add(-new_value, Ordering::Relaxed);
        }
    }

    // ---- ingest ------------------------------------------------------

    /// Ingest the post-resolution record list for one upstream answer.
    pub fn cache_records(&self, records: Vec<CachedRecord>) {
        if records.is_empty() {
            return;
        }
        let now = now_unix();
        let serve_stale = self.config.serve_stale;

        let mut records = records;
        for record in &mut records {
            propagate_companion_rrsigs(record);
        }

        if records.len() == 1 {
            let record = records.remove(0);
            let owner = record.record.name.clone();
            let zone = self.get_or_add_zone(&owner);
            let delta = zone.set_records(vec![Arc::new(record)], now, serve_stale);
            self.adjust_total(delta);
            return;
        }

        // Owners sitting under a DNAME in the same answer hold synthesized
        // CNAMEs; those are recomputed per query, never cached.
        let dname_owners: Vec<String> = records
            .iter()
            .filter(|record| record.record.rtype == RecordType::DNAME)
            .map(|record| record.record.name.clone())
            .collect();

        let mut order: Vec<(String, RecordType)> = Vec::new();
        let mut groups: FxHashMap<(String, RecordType), Vec<CachedRecord>> = FxHashMap::default();
        for record in records {
            let key = (record.record.name.clone(), record.record.rtype);
            if !groups.contains_key(&key) {
                order.push(key.clone());
            }
            groups.entry(key).or_default().push(record);
        }

        let mut delta = 0i64;
        for key in order {
            if dname_owners
                .iter()
                .any(|dname| name::is_subdomain_of(&key.0, dname))
            {
                trace!("Not caching DNAME-synthesized records for {}", key.0);
                continue;
            }
            if let Some(group) = groups.remove(&key) {
                let zone = self.get_or_add_zone(&key.0);
                let arcs = group.into_iter().map(Arc::new).collect();
                delta += zone.set_records(arcs, now, serve_stale);
            }
        }
        self.adjust_total(delta);
    }

    fn get_or_add_zone(&self, owner: &str) -> Arc<CacheZone> {
        self.tree
            .get_or_add(owner, |name| CacheZone::new(name.to_string()))
    }

    // ---- query -------------------------------------------------------

    /// Answer a question from cache. `None` is a cache miss; the resolver
    /// recurses upstream. With `find_closest_name_servers`, a miss returns
    /// the deepest cached referral instead when one exists.
    pub fn query(
        &self,
        request: &CacheRequest,
        serve_stale_and_reset_expiry: bool,
        find_closest_name_servers: bool,
    ) -> Option<CacheResponse> {
        let now = now_unix();
        let serve_stale = serve_stale_and_reset_expiry;
        let question = &request.question;
        let found = self.tree.find_zone(&question.name, now);

        // Data whose validation was disabled cannot satisfy a DNSSEC query;
        // such answers are abandoned in favor of the delegation path.
        let mut disabled_fallthrough = false;

        if let Some(zone) = &found.exact {
            let records = zone.query_records(
                question.qtype,
                request.client_subnet.as_ref(),
                request.conditional_forwarding,
                now,
                serve_stale,
                true,
            );
            if let Some(head) = records.first().cloned() {
                let answered = if head.record.rdata.is_special() {
                    self.answer_from_special(request, &head, serve_stale, now)
                } else {
                    self.answer_from_records(request, records, serve_stale, now)
                };
                match answered {
                    Some(response) => {
                        self.stats.record_hit();
                        if head.record.rdata.is_special() {
                            self.stats.record_negative_hit();
                        }
                        trace!("Cache hit for {}", question.name);
                        return Some(response);
                    }
                    None => disabled_fallthrough = true,
                }
            }
        }

        if !disabled_fallthrough {
            if let Some(response) = self.answer_from_dname(request, &found, serve_stale, now) {
                self.stats.record_hit();
                return Some(response);
            }
        }

        if find_closest_name_servers {
            if let Some(response) = self.referral_response(request, &found, serve_stale, now) {
                trace!("Referral from cache for {}", question.name);
                return Some(response);
            }
        }

        self.stats.record_miss();
        trace!("Cache miss for {}", question.name);
        None
    }

    /// Deepest cached delegation at or above the question name, or none at
    /// the root.
    pub fn query_closest_delegation(&self, request: &CacheRequest) -> Option<CacheResponse> {
        let now = now_unix();
        let found = self.tree.find_zone(&request.question.name, now);
        self.referral_response(request, &found, self.config.serve_stale, now)
    }

    /// Normal answer: CNAME chase, DNSSEC companions, additional section,
    /// stale and ECS handling. `None` means DNSSEC-disabled data was hit.
    fn answer_from_records(
        &self,
        request: &CacheRequest,
        records: Vec<Arc<CachedRecord>>,
        serve_stale: bool,
        now: u64,
    ) -> Option<CacheResponse> {
        let question = &request.question;
        let mut chain = records;

        if question.qtype != RecordType::CNAME && question.qtype != RecordType::ANY {
            self.chase_cnames(request, &mut chain, serve_stale, now);
        }

        self.finalize_answer(request, chain, serve_stale, now)
    }

    /// Follow the CNAME chain at the tail of `chain`, bounded by
    /// `MAX_CNAME_HOPS`, stopping on self-loops and rdata cycles.
    fn chase_cnames(
        &self,
        request: &CacheRequest,
        chain: &mut Vec<Arc<CachedRecord>>,
        serve_stale: bool,
        now: u64,
    ) {
        for _ in 0..MAX_CNAME_HOPS {
            let tail = match chain.last() {
                Some(tail) => tail.clone(),
                None => return,
            };
            let target = match tail.record.rdata.cname_target() {
                Some(target) => target.to_string(),
                None => return, // non-CNAME terminal ends the chain
            };
            if target == tail.record.name {
                return; // self-loop
            }

            let zone = match self.tree.try_get(&target) {
                Some(zone) => zone,
                None => return,
            };
            let next = zone.query_records(
                request.question.qtype,
                request.client_subnet.as_ref(),
                request.conditional_forwarding,
                now,
                serve_stale,
                false,
            );
            if next.is_empty() || next[0].record.rdata.is_special() {
                return;
            }

            // A new record whose rdata matches a CNAME already in the answer
            // closes a cycle; stop before appending it again.
            let cycle = next.iter().any(|candidate| {
                chain.iter().any(|have| {
                    have.record.rdata.cname_target().is_some()
                        && have.record.rdata == candidate.record.rdata
                })
            });
            if cycle {
                return;
            }

            let terminal = next[0].record.rdata.cname_target().is_none();
            chain.extend(next);
            if terminal {
                return;
            }
        }
    }

    /// Post-chase assembly shared by the normal and DNAME paths
    fn finalize_answer(
        &self,
        request: &CacheRequest,
        chain: Vec<Arc<CachedRecord>>,
        serve_stale: bool,
        now: u64,
    ) -> Option<CacheResponse> {
        if chain.is_empty() {
            return None;
        }

        if request.dnssec_ok
            && chain
                .iter()
                .any(|record| record.record.dnssec_status == DnssecStatus::Disabled)
        {
            return None;
        }

        let mut authority: Vec<Arc<CachedRecord>> = Vec::new();
        let mut answer: Vec<Arc<CachedRecord>> = Vec::new();
        if request.dnssec_ok {
            for record in &chain {
                answer.push(record.clone());
                for sig in &record.info.rrsigs {
                    answer.push(Arc::new(sig.clone()));
                }
                // A signature covering fewer labels than the owner proves a
                // wildcard expansion; its NSEC/NSEC3 proofs ride along.
                if record.info.rrsigs.iter().any(is_wildcard_signature) {
                    for nsec in &record.info.nsecs {
                        authority.push(Arc::new(nsec.clone()));
                        for sig in &nsec.info.rrsigs {
                            authority.push(Arc::new(sig.clone()));
                        }
                    }
                }
            }
        } else {
            answer = chain.clone();
        }

        let mut additional: Vec<Arc<CachedRecord>> = Vec::new();
        if request.question.qtype.needs_glue() {
            let references: Vec<Arc<CachedRecord>> = chain
                .iter()
                .filter(|record| record.record.rtype.needs_glue())
                .cloned()
                .collect();
            additional = self.collect_additional(&references, request, serve_stale, now);
        }

        let mut options = Vec::new();
        let mut any_stale = false;
        if serve_stale {
            for record in chain.iter().chain(additional.iter()) {
                if record.is_stale(now) {
                    record.reset_expiry(now);
                    any_stale = true;
                }
            }
        }
        if any_stale || chain.iter().any(|record| record.was_expiry_reset()) {
            options.push(ExtendedDnsError::new(EdeCode::StaleAnswer).to_option());
        }

        if let Some(subnet) = &request.client_subnet {
            let scope_prefix = chain
                .iter()
                .filter_map(|record| record.info.ecs_scope.as_ref().map(|scope| scope.prefix))
                .max()
                .unwrap_or(0);
            let mut ecs = ClientSubnet::new(subnet.address, subnet.source_prefix);
            ecs.scope_prefix = scope_prefix;
            options.push(ecs.to_option());
        }

        let authentic_data = chain
            .first()
            .map(|record| record.record.dnssec_status == DnssecStatus::Secure)
            .unwrap_or(false);

        Some(CacheResponse {
            rcode: ResponseCode::NoError,
            answer: answer.iter().map(|record| record.to_record(now)).collect(),
            authority: authority.iter().map(|record| record.to_record(now)).collect(),
            additional: additional.iter().map(|record| record.to_record(now)).collect(),
            options,
            authentic_data,
            udp_payload_size: self.config.udp_payload_size,
        })
    }

    /// Replay a cached negative/failure sentinel. `None` means the sentinel
    /// carries DNSSEC-disabled proof and the delegation path should answer.
    fn answer_from_special(
        &self,
        request: &CacheRequest,
        head: &Arc<CachedRecord>,
        serve_stale: bool,
        now: u64,
    ) -> Option<CacheResponse> {
        let data = head.record.rdata.as_special()?;

        if request.dnssec_ok
            && data
                .original_authority
                .iter()
                .any(|record| record.dnssec_status == DnssecStatus::Disabled)
        {
            return None;
        }

        if serve_stale && head.is_stale(now) {
            head.reset_expiry(now);
        }
        let was_reset = head.was_expiry_reset();

        let mut options = data.options.clone();
        if was_reset {
            let code = if data.original_rcode == ResponseCode::NxDomain {
                EdeCode::StaleNxDomainAnswer
            } else {
                EdeCode::StaleAnswer
            };
            options.push(ExtendedDnsError::new(code).to_option());
        }
        if let Some(subnet) = &request.client_subnet {
            if let Some(scope) = &head.info.ecs_scope {
                let mut ecs = ClientSubnet::new(subnet.address, subnet.source_prefix);
                ecs.scope_prefix = scope.prefix;
                options.push(ecs.to_option());
            }
        }

        let ttl = head.remaining_ttl(now);
        let with_ttl = |records: &[DnsRecord]| -> Vec<DnsRecord> {
            records
                .iter()
                .map(|record| {
                    let mut record = record.clone();
                    record.ttl = ttl;
                    record
                })
                .collect()
        };

        let (answer, authority, additional, authentic_data) = if request.dnssec_ok {
            // With CD set the original sections go back verbatim either way;
            // the upstream result is reflected, not filtered.
            (
                with_ttl(&data.original_answer),
                with_ttl(&data.original_authority),
                with_ttl(&data.original_additional),
                data.kind == SpecialKind::NegativeCache,
            )
        } else {
            let plain = |records: &[DnsRecord]| -> Vec<DnsRecord> {
                with_ttl(records)
                    .into_iter()
                    .filter(|record| {
                        !matches!(
                            record.rtype,
                            RecordType::RRSIG | RecordType::NSEC | RecordType::NSEC3
                        )
                    })
                    .collect()
            };
            (
                plain(&data.original_answer),
                with_ttl(&data.no_dnssec_authority),
                plain(&data.original_additional),
                false,
            )
        };

        let rcode = if request.checking_disabled && request.dnssec_ok {
            data.original_rcode
        } else {
            data.rcode
        };

        Some(CacheResponse {
            rcode,
            answer,
            authority,
            additional,
            options,
            authentic_data,
            udp_payload_size: self.config.udp_payload_size,
        })
    }

    /// Synthesize an answer from a DNAME at the closest enclosing zone
    fn answer_from_dname(
        &self,
        request: &CacheRequest,
        found: &FindResult,
        serve_stale: bool,
        now: u64,
    ) -> Option<CacheResponse> {
        let closest = found.closest.as_ref()?;
        let question = &request.question;
        if !name::is_subdomain_of(&question.name, closest.name()) {
            return None;
        }

        let dnames = closest.query_records(
            RecordType::DNAME,
            request.client_subnet.as_ref(),
            request.conditional_forwarding,
            now,
            serve_stale,
            false,
        );
        let dname = dnames.first()?.clone();
        let target = match &dname.record.rdata {
            RData::Dname(target) => target.clone(),
            _ => return None,
        };

        match name::substitute_suffix(&question.name, closest.name(), &target) {
            Some(substituted) => {
                let synthesized = DnsRecord {
                    name: question.name.clone(),
                    rtype: RecordType::CNAME,
                    rclass: question.qclass,
                    ttl: dname.record.ttl,
                    rdata: RData::Cname(substituted),
                    dnssec_status: dname.record.dnssec_status,
                    received_at: dname.record.received_at,
                };
                let chain = vec![dname, Arc::new(CachedRecord::new(synthesized))];
                self.answer_from_records(request, chain, serve_stale, now)
            }
            None => {
                // Substitution exceeds the name length bound: the DNAME goes
                // back alone with YXDOMAIN.
                let mut response =
                    self.finalize_answer(request, vec![dname], serve_stale, now)?;
                response.rcode = ResponseCode::YxDomain;
                Some(response)
            }
        }
    }

    // ---- referrals ---------------------------------------------------

    /// Walk up the delegation chain and build a referral from the deepest
    /// usable NS set. Root delegations are never returned.
    fn referral_response(
        &self,
        request: &CacheRequest,
        found: &FindResult,
        serve_stale: bool,
        now: u64,
    ) -> Option<CacheResponse> {
        let question = &request.question;

        // DS lives in the parent zone; reparent the lookup before walking
        let mut delegation = if question.qtype == RecordType::DS {
            let parent = self.parent_zones.parent_zone(&question.name)?;
            self.tree.find_zone(&parent, now).delegation
        } else {
            found.delegation.clone()
        };

        while let Some(zone) = delegation.take() {
            if zone.name().is_empty() {
                return None;
            }

            let ns_records = zone.query_records(
                RecordType::NS,
                request.client_subnet.as_ref(),
                request.conditional_forwarding,
                now,
                serve_stale,
                false,
            );
            let unusable = ns_records.is_empty()
                || (request.dnssec_ok
                    && ns_records
                        .iter()
                        .all(|record| record.record.dnssec_status == DnssecStatus::Disabled));
            if unusable {
                let parent = name::parent(zone.name())?;
                delegation = self.tree.find_zone(&parent, now).delegation;
                continue;
            }

            let mut authority: Vec<DnsRecord> = Vec::new();
            for record in &ns_records {
                authority.push(record.to_record(now));
                if request.dnssec_ok {
                    for sig in &record.info.rrsigs {
                        authority.push(sig.to_record(now));
                    }
                }
            }
            if request.dnssec_ok {
                self.add_ds_records_to(&zone, &ns_records, &mut authority, serve_stale, now);
            }

            let additional = self.collect_additional(&ns_records, request, serve_stale, now);

            let mut response = CacheResponse::referral(self.config.udp_payload_size);
            response.authority = authority;
            response.additional = additional
                .iter()
                .map(|record| record.to_record(now))
                .collect();
            return Some(response);
        }
        None
    }

    /// Attach DS records for a delegation, or the NS set's NSEC proofs when
    /// the cache holds no DS (proof of an unsigned child).
    fn add_ds_records_to(
        &self,
        zone: &CacheZone,
        ns_records: &[Arc<CachedRecord>],
        authority: &mut Vec<DnsRecord>,
        serve_stale: bool,
        now: u64,
    ) {
        let ds_records = zone.query_records(RecordType::DS, None, false, now, serve_stale, false);
        if !ds_records.is_empty() {
            for record in &ds_records {
                authority.push(record.to_record(now));
                for sig in &record.info.rrsigs {
                    authority.push(sig.to_record(now));
                }
            }
            return;
        }

        if let Some(first_ns) = ns_records.first() {
            for nsec in &first_ns.info.nsecs {
                authority.push(nsec.to_record(now));
                for sig in &nsec.info.rrsigs {
                    authority.push(sig.to_record(now));
                }
            }
        }
    }

    // ---- additional-section synthesis --------------------------------

    /// Build the additional section for reference records that need glue
    fn collect_additional(
        &self,
        references: &[Arc<CachedRecord>],
        request: &CacheRequest,
        serve_stale: bool,
        now: u64,
    ) -> Vec<Arc<CachedRecord>> {
        let mut out: Vec<Arc<CachedRecord>> = Vec::new();

        for reference in references {
            if !reference.record.rtype.needs_glue() {
                continue;
            }

            // Attached glue wins when still fresh
            let glue: Vec<&CachedRecord> = reference
                .info
                .glue
                .iter()
                .filter(|record| !record.is_expired(now))
                .collect();
            if !glue.is_empty() {
                for record in glue {
                    out.push(Arc::new(record.clone()));
                    if request.dnssec_ok {
                        for sig in &record.info.rrsigs {
                            out.push(Arc::new(sig.clone()));
                        }
                    }
                }
                continue;
            }

            match &reference.record.rdata {
                RData::Svcb { priority, target, .. } | RData::Https { priority, target, .. } => {
                    self.resolve_service_target(
                        reference, *priority, target, request, serve_stale, now, &mut out,
                    );
                }
                _ => {
                    if let Some(target) = reference.record.rdata.additional_target() {
                        self.resolve_address_records(target, request, serve_stale, now, &mut out);
                    }
                }
            }
        }
        out
    }

    /// Fetch cached A and AAAA records for a target name
    fn resolve_address_records(
        &self,
        target: &str,
        request: &CacheRequest,
        serve_stale: bool,
        now: u64,
        out: &mut Vec<Arc<CachedRecord>>,
    ) {
        let zone = match self.tree.try_get(target) {
            Some(zone) => zone,
            None => return,
        };
        for qtype in [RecordType::A, RecordType::AAAA] {
            let records = zone.query_records(
                qtype,
                request.client_subnet.as_ref(),
                request.conditional_forwarding,
                now,
                serve_stale,
                false,
            );
            for record in records {
                if record.record.rdata.is_special() {
                    continue;
                }
                out.push(record.clone());
                if request.dnssec_ok {
                    for sig in &record.info.rrsigs {
                        out.push(Arc::new(sig.clone()));
                    }
                }
            }
        }
    }

    /// Resolve an SVCB/HTTPS target: AliasMode chains are followed with loop
    /// detection; ServiceMode targets (or "." meaning the owner) get A/AAAA.
    #[allow(clippy::too_many_arguments)]
    fn resolve_service_target(
        &self,
        reference: &Arc<CachedRecord>,
        priority: u16,
        target: &str,
        request: &CacheRequest,
        serve_stale: bool,
        now: u64,
        out: &mut Vec<Arc<CachedRecord>>,
    ) {
        let owner = &reference.record.name;
        let service_type = reference.record.rtype;

        if priority != 0 {
            // ServiceMode: "." means the owner itself
            let final_name = if is_root_target(target) {
                owner.clone()
            } else {
                target.to_string()
            };
            self.resolve_address_records(&final_name, request, serve_stale, now, out);
            return;
        }

        // AliasMode: "." (or the owner itself) means service unavailable
        if is_root_target(target) || target == owner {
            return;
        }

        let mut current = target.to_string();
        for _ in 0..MAX_CNAME_HOPS {
            // Loop detection over what this chain has already produced
            if out
                .iter()
                .any(|record| record.record.name == current && record.record.rtype == service_type)
            {
                return;
            }

            let zone = match self.tree.try_get(&current) {
                Some(zone) => zone,
                None => return,
            };
            let records = zone.query_records(
                service_type,
                request.client_subnet.as_ref(),
                request.conditional_forwarding,
                now,
                serve_stale,
                false,
            );
            let head = match records.first() {
                Some(head) => head.clone(),
                None => return,
            };

            let (next_priority, next_target) = match &head.record.rdata {
                RData::Svcb {
                    priority, target, ..
                }
                | RData::Https {
                    priority, target, ..
                } => (*priority, target.clone()),
                _ => return,
            };

            for record in &records {
                out.push(record.clone());
                if request.dnssec_ok {
                    for sig in &record.info.rrsigs {
                        out.push(Arc::new(sig.clone()));
                    }
                }
            }

            if next_priority == 0 {
                if is_root_target(&next_target) || next_target == current {
                    return; // alias chain terminates: unavailable
                }
                current = next_target;
            } else {
                let final_name = if is_root_target(&next_target) {
                    current.clone()
                } else {
                    next_target
                };
                self.resolve_address_records(&final_name, request, serve_stale, now, out);
                return;
            }
        }
    }

    // ---- eviction ----------------------------------------------------

    /// Periodic maintenance: drop dead records, then enforce the capacity
    /// bound by shedding stale records and finally least-recently-used
    /// entries at halving age cutoffs.
    pub fn remove_expired_records(&self) {
        let now = now_unix();
        let serve_stale = self.config.serve_stale;

        let mut expired_removed: u64 = 0;
        for zone in self.tree.enumerate() {
            let removed = zone.remove_expired_records(now, serve_stale);
            if removed > 0 {
                self.adjust_total(-(removed as i64));
                expired_removed += removed as u64;
            }
            if zone.is_empty(now) {
                self.tree.remove_if_empty(zone.name(), now);
            }
        }
        if expired_removed > 0 {
            self.stats.record_expired_evictions(expired_removed);
            debug!("Evicted {} expired cache entries", expired_removed);
        }

        let maximum = self.maximum_entries();
        if maximum <= 0 || self.over_capacity(maximum) <= 0 {
            return;
        }

        if serve_stale {
            let mut stale_removed: u64 = 0;
            for zone in self.tree.enumerate() {
                let removed = zone.remove_expired_records(now, false);
                if removed > 0 {
                    self.adjust_total(-(removed as i64));
                    stale_removed += removed as u64;
                }
                if zone.is_empty(now) {
                    self.tree.remove_if_empty(zone.name(), now);
                }
                if self.over_capacity(maximum) <= 0 {
                    break;
                }
            }
            if stale_removed > 0 {
                self.stats.record_evictions(stale_removed);
                debug!("Evicted {} stale cache entries over capacity", stale_removed);
            }
        }

        let mut cutoff_seconds: u64 = 86_400;
        loop {
            if self.over_capacity(maximum) <= 0 {
                break;
            }
            let cutoff = now.saturating_sub(cutoff_seconds);
            for zone in self.tree.enumerate() {
                let removed = zone.remove_least_used_records(cutoff);
                if removed > 0 {
                    self.adjust_total(-(removed as i64));
                    self.stats.record_evictions(removed as u64);
                }
                if zone.is_empty(now) {
                    self.tree.remove_if_empty(zone.name(), now);
                }
                if self.over_capacity(maximum) <= 0 {
                    break;
                }
            }
            if cutoff_seconds <= 1 {
                break;
            }
            cutoff_seconds /= 2;
        }
    }

    fn over_capacity(&self, maximum: i64) -> i64 {
        self.total_entries() - maximum
    }

    // ---- administration ----------------------------------------------

    /// Drop all cached state
    pub fn flush(&self) {
        self.tree.clear();
        self.total_entries.store(0, Ordering::Relaxed);
        debug!("Cache flushed");
    }

    /// Remove a domain and everything under it; returns removed entry count
    pub fn delete_zone(&self, domain: &str) -> usize {
        let removed = self.tree.try_remove_tree(&name::normalize(domain));
        self.adjust_total(-(removed as i64));
        debug!("Deleted cache zone {} ({} entries)", domain, removed);
        removed
    }

    /// Drop every ECS-scoped variant across the cache
    pub fn delete_edns_client_subnet_data(&self) {
        let mut removed: i64 = 0;
        for zone in self.tree.enumerate() {
            removed += zone.delete_ecs_data() as i64;
        }
        self.adjust_total(-removed);
        debug!("Deleted {} ECS-scoped cache entries", removed);
    }

    /// Immediate cached child names under `domain`
    pub fn list_sub_domains(&self, domain: &str, out: &mut Vec<String>) {
        self.tree.list_sub_domains(&name::normalize(domain), out);
    }

    /// All records cached at exactly `domain`
    pub fn list_all_records(&self, domain: &str, out: &mut Vec<DnsRecord>) {
        if let Some(zone) = self.tree.try_get(&name::normalize(domain)) {
            zone.list_all_records(now_unix(), out);
        }
    }

    // ---- snapshots ---------------------------------------------------

    fn snapshot_path(&self) -> std::path::PathBuf {
        self.config.config_folder.join(CACHE_FILE_NAME)
    }

    /// Write the whole cache to the snapshot file. Empty zones are skipped.
    /// Queries may proceed concurrently; each zone serializes consistently.
    pub async fn save(&self) -> Result<()> {
        let now = now_unix();
        let path = self.snapshot_path();

        let mut buf: Vec<u8> = Vec::new();
        buf.extend_from_slice(&SNAPSHOT_MAGIC);
        buf.push(SNAPSHOT_VERSION);

        let mut zones: usize = 0;
        for zone in self.tree.enumerate() {
            if zone.is_empty(now) {
                continue;
            }
            zone.write_to(&mut buf)?;
            zones += 1;
        }

        // Write to a temporary file first, then rename for atomicity
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, &buf).await?;
        fs::rename(&temp_path, &path).await?;

        debug!(
            "Saved {} cache zones to {} ({} bytes)",
            zones,
            path.display(),
            buf.len()
        );
        Ok(())
    }

    /// Load a snapshot saved by `save`. A missing file is not an error; a
    /// bad magic or version is fatal, and payload corruption propagates with
    /// whatever loaded so far left in place.
    pub async fn load(&self) -> Result<()> {
        let path = self.snapshot_path();
        if !fs::try_exists(&path).await? {
            debug!("No cache snapshot at {}", path.display());
            return Ok(());
        }

        let data = fs::read(&path).await?;
        if data.len() < 3 || data[0..2] != SNAPSHOT_MAGIC {
            return Err(CacheError::CorruptSnapshot("bad magic".to_string()));
        }
        if data[2] != SNAPSHOT_VERSION {
            return Err(CacheError::CorruptSnapshot(format!(
                "unsupported snapshot version {}",
                data[2]
            )));
        }

        let now = now_unix();
        let serve_stale = self.config.serve_stale;
        let payload = &data[3..];
        let mut cursor = Cursor::new(payload);
        let mut loaded: i64 = 0;
        let mut zones: usize = 0;

        while (cursor.position() as usize) < payload.len() {
            let zone = CacheZone::read_from(&mut cursor, now, serve_stale)?;
            let entries = zone.total_entries();
            if entries == 0 {
                continue;
            }
            let owner = zone.name().to_string();
            if self.tree.try_get(&owner).is_some() {
                continue; // live data wins over the snapshot
            }
            self.tree.get_or_add(&owner, move |_| zone);
            self.adjust_total(entries as i64);
            loaded += entries as i64;
            zones += 1;
        }

        debug!(
            "Loaded {} cache entries in {} zones from {}",
            loaded,
            zones,
            path.display()
        );
        Ok(())
    }
}

/// Copy matching RRSIGs from a record's own companions onto its glue and
/// NSEC companions so DNSSEC answers can intersperse them later.
fn propagate_companion_rrsigs(record: &mut CachedRecord) {
    if record.info.rrsigs.is_empty() {
        return;
    }
    let rrsigs = record.info.rrsigs.clone();
    let matching = |owner: &str, rtype: RecordType| -> Vec<CachedRecord> {
        rrsigs
            .iter()
            .filter(|sig| {
                sig.record.name == owner
                    && matches!(
                        &sig.record.rdata,
                        RData::Rrsig { type_covered, .. } if *type_covered == rtype
                    )
            })
            .cloned()
            .collect()
    };

    for glue in &mut record.info.glue {
        if glue.info.rrsigs.is_empty() {
            glue.info.rrsigs = matching(&glue.record.name, glue.record.rtype);
        }
    }
    for nsec in &mut record.info.nsecs {
        if nsec.info.rrsigs.is_empty() {
            nsec.info.rrsigs = matching(&nsec.record.name, nsec.record.rtype);
        }
    }
}

/// RRSIG label count below the owner's label count marks a wildcard match
fn is_wildcard_signature(sig: &CachedRecord) -> bool {
    match &sig.record.rdata {
        RData::Rrsig { labels, .. } => (*labels as usize) < name::label_count(&sig.record.name),
        _ => false,
    }
}

fn is_root_target(target: &str) -> bool {
    target.is_empty() || target == "."
}
