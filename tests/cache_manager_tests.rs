use mimir::cache::{now_unix, CacheManager, CachedRecord};
use mimir::config::CacheConfig;
use mimir::dns::edns::{ClientSubnet, EdeCode, EdnsOptionCode, ExtendedDnsError};
use mimir::dns::enums::{DnssecStatus, RecordClass, RecordType, ResponseCode};
use mimir::dns::rdata::{RData, SpecialCacheData};
use mimir::dns::record::DnsRecord;
use mimir::dns::CacheRequest;
use std::net::Ipv4Addr;

fn manager() -> CacheManager {
    CacheManager::new(CacheConfig::default())
}

fn a_record(name: &str, address: [u8; 4], ttl: u32) -> CachedRecord {
    CachedRecord::new(DnsRecord::new(
        name,
        RecordType::A,
        RecordClass::IN,
        ttl,
        RData::A(Ipv4Addr::from(address)),
    ))
}

fn cname_record(name: &str, target: &str, ttl: u32) -> CachedRecord {
    CachedRecord::new(DnsRecord::new(
        name,
        RecordType::CNAME,
        RecordClass::IN,
        ttl,
        RData::Cname(target.to_string()),
    ))
}

fn ns_record(name: &str, host: &str) -> CachedRecord {
    CachedRecord::new(DnsRecord::new(
        name,
        RecordType::NS,
        RecordClass::IN,
        172_800,
        RData::Ns(host.to_string()),
    ))
}

fn soa_record(name: &str) -> DnsRecord {
    DnsRecord::new(
        name,
        RecordType::SOA,
        RecordClass::IN,
        300,
        RData::Soa {
            mname: format!("ns1.{}", name),
            rname: format!("hostmaster.{}", name),
            serial: 2024010101,
            refresh: 7200,
            retry: 900,
            expire: 1_209_600,
            minimum: 300,
        },
    )
}

fn has_ede(response: &mimir::dns::CacheResponse, code: EdeCode) -> bool {
    response
        .options
        .iter()
        .filter(|option| option.code == EdnsOptionCode::ExtendedDnsError as u16)
        .filter_map(ExtendedDnsError::from_option)
        .any(|ede| ede.info_code == code as u16)
}

#[test]
fn test_ns_referral_with_glue() {
    let cache = manager();

    let mut ns = ns_record("com", "a.gtld-servers.net");
    ns.info.glue.push(a_record("a.gtld-servers.net", [192, 5, 6, 30], 172_800));
    cache.cache_records(vec![ns]);

    let response = cache
        .query(&CacheRequest::new("example.com", RecordType::A), false, true)
        .expect("referral expected");

    assert!(response.answer.is_empty());
    assert_eq!(response.authority.len(), 1);
    assert_eq!(response.authority[0].rtype, RecordType::NS);
    assert_eq!(response.authority[0].name, "com");
    assert_eq!(response.additional.len(), 1);
    assert_eq!(response.additional[0].name, "a.gtld-servers.net");
    assert_eq!(
        response.additional[0].rdata,
        RData::A(Ipv4Addr::new(192, 5, 6, 30))
    );
}

#[test]
fn test_cname_chase() {
    let cache = manager();
    cache.cache_records(vec![
        cname_record("www.a.test", "b.test", 60),
        a_record("b.test", [1, 2, 3, 4], 60),
    ]);

    let response = cache
        .query(&CacheRequest::new("www.a.test", RecordType::A), false, false)
        .expect("answer expected");

    assert_eq!(response.answer.len(), 2);
    assert_eq!(response.answer[0].rtype, RecordType::CNAME);
    assert_eq!(response.answer[0].name, "www.a.test");
    assert_eq!(response.answer[1].rtype, RecordType::A);
    assert_eq!(response.answer[1].rdata, RData::A(Ipv4Addr::new(1, 2, 3, 4)));
    assert!(!response.authentic_data);
    assert!(response.authority.is_empty());
    assert_eq!(response.rcode, ResponseCode::NoError);
}

#[test]
fn test_cname_loop_detection() {
    let cache = manager();
    cache.cache_records(vec![
        cname_record("x.test", "y.test", 60),
        cname_record("y.test", "x.test", 60),
    ]);

    let response = cache
        .query(&CacheRequest::new("x.test", RecordType::A), false, false)
        .expect("answer expected");

    // Both CNAMEs exactly once: the loop is cut before a third append
    assert_eq!(response.answer.len(), 2);
    let x_count = response
        .answer
        .iter()
        .filter(|record| record.name == "x.test")
        .count();
    let y_count = response
        .answer
        .iter()
        .filter(|record| record.name == "y.test")
        .count();
    assert_eq!(x_count, 1);
    assert_eq!(y_count, 1);
}

#[test]
fn test_cname_self_loop_terminates() {
    let cache = manager();
    cache.cache_records(vec![cname_record("self.test", "self.test", 60)]);

    let response = cache
        .query(&CacheRequest::new("self.test", RecordType::A), false, false)
        .expect("answer expected");
    assert_eq!(response.answer.len(), 1);
}

#[test]
fn test_dname_synthesis() {
    let cache = manager();
    cache.cache_records(vec![
        CachedRecord::new(DnsRecord::new(
            "old.test",
            RecordType::DNAME,
            RecordClass::IN,
            300,
            RData::Dname("new.test".to_string()),
        )),
        a_record("host.new.test", [10, 0, 0, 1], 300),
    ]);

    let response = cache
        .query(
            &CacheRequest::new("host.old.test", RecordType::A),
            false,
            false,
        )
        .expect("synthesized answer expected");

    assert_eq!(response.rcode, ResponseCode::NoError);
    assert_eq!(response.answer.len(), 3);
    assert_eq!(response.answer[0].rtype, RecordType::DNAME);
    assert_eq!(response.answer[1].rtype, RecordType::CNAME);
    assert_eq!(response.answer[1].name, "host.old.test");
    assert_eq!(
        response.answer[1].rdata,
        RData::Cname("host.new.test".to_string())
    );
    assert_eq!(response.answer[2].rdata, RData::A(Ipv4Addr::new(10, 0, 0, 1)));

    // The synthesized CNAME is never persisted
    let mut records = Vec::new();
    cache.list_all_records("host.old.test", &mut records);
    assert!(records.is_empty());
}

#[test]
fn test_dname_records_under_owner_not_cached_from_answer() {
    let cache = manager();

    // An upstream answer carrying the DNAME plus its synthesized CNAME
    cache.cache_records(vec![
        CachedRecord::new(DnsRecord::new(
            "old.test",
            RecordType::DNAME,
            RecordClass::IN,
            300,
            RData::Dname("new.test".to_string()),
        )),
        cname_record("host.old.test", "host.new.test", 300),
        a_record("host.new.test", [10, 0, 0, 1], 300),
    ]);

    let mut records = Vec::new();
    cache.list_all_records("host.old.test", &mut records);
    assert!(records.is_empty(), "synthesized CNAME must not be cached");

    let mut records = Vec::new();
    cache.list_all_records("old.test", &mut records);
    assert_eq!(records.len(), 1, "the DNAME itself is cached");
}

#[test]
fn test_dname_oversize_substitution_yields_yxdomain() {
    let cache = manager();
    let long_target: String = vec!["a".repeat(63); 4].join(".");
    cache.cache_records(vec![CachedRecord::new(DnsRecord::new(
        "old.test",
        RecordType::DNAME,
        RecordClass::IN,
        300,
        RData::Dname(long_target),
    ))]);

    let response = cache
        .query(
            &CacheRequest::new("host.old.test", RecordType::A),
            false,
            false,
        )
        .expect("DNAME-only answer expected");

    assert_eq!(response.rcode, ResponseCode::YxDomain);
    assert_eq!(response.answer.len(), 1);
    assert_eq!(response.answer[0].rtype, RecordType::DNAME);
}

#[test]
fn test_negative_cache_dnssec_ok_checking_disabled() {
    let cache = manager();
    let soa = soa_record("test");
    let sentinel = DnsRecord::special(
        "nx.test",
        SpecialCacheData::negative(
            ResponseCode::NxDomain,
            vec![soa.clone()],
            vec![soa.clone()],
        ),
    );
    cache.cache_records(vec![CachedRecord::new(sentinel)]);

    let request = CacheRequest::new("nx.test", RecordType::A)
        .with_dnssec_ok()
        .with_checking_disabled();
    let response = cache.query(&request, false, false).expect("negative hit");

    assert_eq!(response.rcode, ResponseCode::NxDomain);
    assert!(response.authentic_data);
    assert_eq!(response.authority.len(), 1);
    assert_eq!(response.authority[0].rtype, RecordType::SOA);
    assert_eq!(response.authority[0].name, "test");
}

#[test]
fn test_negative_cache_matches_every_question_type() {
    let cache = manager();
    let sentinel = DnsRecord::special(
        "nx.test",
        SpecialCacheData::negative(ResponseCode::NxDomain, vec![soa_record("test")], vec![]),
    );
    cache.cache_records(vec![CachedRecord::new(sentinel)]);

    for qtype in [RecordType::A, RecordType::AAAA, RecordType::TXT] {
        let response = cache
            .query(&CacheRequest::new("nx.test", qtype), false, false)
            .expect("sentinel must answer any type");
        assert_eq!(response.rcode, ResponseCode::NxDomain);
    }
}

#[test]
fn test_serve_stale_resets_expiry_once() {
    let cache = manager();
    let now = now_unix();
    let record = DnsRecord::new(
        "s.test",
        RecordType::A,
        RecordClass::IN,
        60,
        RData::A(Ipv4Addr::new(1, 1, 1, 1)),
    )
    .with_received_at(now - 120);
    cache.cache_records(vec![CachedRecord::new(record)]);

    // Without the stale flag the record is a miss
    assert!(cache
        .query(&CacheRequest::new("s.test", RecordType::A), false, false)
        .is_none());

    let response = cache
        .query(&CacheRequest::new("s.test", RecordType::A), true, false)
        .expect("stale answer expected");
    assert_eq!(response.answer.len(), 1);
    assert_eq!(response.answer[0].ttl, 30);
    assert!(has_ede(&response, EdeCode::StaleAnswer));

    // Expiry was extended exactly once; the next query still flags staleness
    // but grants no further extension
    let response = cache
        .query(&CacheRequest::new("s.test", RecordType::A), true, false)
        .expect("reset record still answers");
    assert!(response.answer[0].ttl <= 30);
    assert!(has_ede(&response, EdeCode::StaleAnswer));
}

#[test]
fn test_fully_expired_never_served() {
    let cache = manager();
    let now = now_unix();
    let record = DnsRecord::new(
        "gone.test",
        RecordType::A,
        RecordClass::IN,
        60,
        RData::A(Ipv4Addr::new(1, 1, 1, 1)),
    )
    .with_received_at(now - 400_000); // past expiry + serve-stale window
    cache.cache_records(vec![CachedRecord::new(record)]);

    assert!(cache
        .query(&CacheRequest::new("gone.test", RecordType::A), true, false)
        .is_none());
}

#[test]
fn test_capacity_eviction_drops_least_used() {
    let cache = manager();
    let now = now_unix();
    cache.set_maximum_entries(2).unwrap();

    let old = DnsRecord::new(
        "old.test",
        RecordType::A,
        RecordClass::IN,
        604_800,
        RData::A(Ipv4Addr::new(1, 1, 1, 1)),
    )
    .with_received_at(now - 172_800);
    cache.cache_records(vec![CachedRecord::new(old)]);
    cache.cache_records(vec![a_record("fresh1.test", [2, 2, 2, 2], 3600)]);
    cache.cache_records(vec![a_record("fresh2.test", [3, 3, 3, 3], 3600)]);
    assert_eq!(cache.total_entries(), 3);

    cache.remove_expired_records();

    assert_eq!(cache.total_entries(), 2);
    assert!(cache
        .query(&CacheRequest::new("old.test", RecordType::A), false, false)
        .is_none());
    assert!(cache
        .query(&CacheRequest::new("fresh1.test", RecordType::A), false, false)
        .is_some());
}

#[test]
fn test_eviction_keeps_fresh_when_under_capacity() {
    let cache = manager();
    cache.cache_records(vec![a_record("a.test", [1, 1, 1, 1], 3600)]);
    cache.cache_records(vec![a_record("b.test", [2, 2, 2, 2], 3600)]);

    cache.remove_expired_records();
    assert_eq!(cache.total_entries(), 2);
}

#[test]
fn test_case_insensitive_queries() {
    let cache = manager();
    cache.cache_records(vec![a_record("Example.COM", [93, 184, 215, 14], 3600)]);

    let lower = cache
        .query(&CacheRequest::new("example.com", RecordType::A), false, false)
        .expect("lowercase hit");
    let upper = cache
        .query(&CacheRequest::new("EXAMPLE.COM", RecordType::A), false, false)
        .expect("uppercase hit");

    assert_eq!(lower.answer.len(), upper.answer.len());
    assert_eq!(lower.answer[0].name, upper.answer[0].name);
    assert_eq!(lower.answer[0].rdata, upper.answer[0].rdata);
}

#[test]
fn test_root_ns_never_a_delegation() {
    let cache = manager();
    cache.cache_records(vec![ns_record("", "a.root-servers.net")]);

    assert!(cache
        .query_closest_delegation(&CacheRequest::new("example.com", RecordType::A))
        .is_none());
    assert!(cache
        .query(&CacheRequest::new("example.com", RecordType::A), false, true)
        .is_none());
}

#[test]
fn test_query_closest_delegation_walks_up() {
    let cache = manager();
    let mut ns = ns_record("example.com", "ns1.example.com");
    ns.info.glue.push(a_record("ns1.example.com", [192, 0, 2, 53], 172_800));
    cache.cache_records(vec![ns]);

    let response = cache
        .query_closest_delegation(&CacheRequest::new(
            "deep.sub.example.com",
            RecordType::A,
        ))
        .expect("delegation expected");
    assert_eq!(response.authority[0].name, "example.com");
    assert_eq!(response.additional[0].name, "ns1.example.com");
}

#[test]
fn test_dnssec_disabled_answer_falls_back_to_delegation() {
    let cache = manager();

    let disabled = CachedRecord::new(
        DnsRecord::new(
            "www.example.com",
            RecordType::A,
            RecordClass::IN,
            3600,
            RData::A(Ipv4Addr::new(192, 0, 2, 1)),
        )
        .with_dnssec_status(DnssecStatus::Disabled),
    );
    cache.cache_records(vec![disabled]);
    cache.cache_records(vec![ns_record("com", "a.gtld-servers.net")]);

    // Plain query gets the answer
    let response = cache
        .query(
            &CacheRequest::new("www.example.com", RecordType::A),
            false,
            true,
        )
        .expect("plain answer");
    assert_eq!(response.answer.len(), 1);

    // DNSSEC-OK query falls through to the delegation
    let response = cache
        .query(
            &CacheRequest::new("www.example.com", RecordType::A).with_dnssec_ok(),
            false,
            true,
        )
        .expect("referral expected");
    assert!(response.answer.is_empty());
    assert_eq!(response.authority[0].rtype, RecordType::NS);
}

#[test]
fn test_rrsigs_interspersed_for_dnssec_queries() {
    let cache = manager();

    let mut record = CachedRecord::new(
        DnsRecord::new(
            "signed.test",
            RecordType::A,
            RecordClass::IN,
            3600,
            RData::A(Ipv4Addr::new(192, 0, 2, 7)),
        )
        .with_dnssec_status(DnssecStatus::Secure),
    );
    record.info.rrsigs.push(CachedRecord::new(DnsRecord::new(
        "signed.test",
        RecordType::RRSIG,
        RecordClass::IN,
        3600,
        RData::Rrsig {
            type_covered: RecordType::A,
            algorithm: 13,
            labels: 2,
            original_ttl: 3600,
            expiration: 0,
            inception: 0,
            key_tag: 1234,
            signer: "test".to_string(),
            signature: vec![0xAA],
        },
    )));
    cache.cache_records(vec![record]);

    let response = cache
        .query(
            &CacheRequest::new("signed.test", RecordType::A).with_dnssec_ok(),
            false,
            false,
        )
        .expect("signed answer");
    assert_eq!(response.answer.len(), 2);
    assert_eq!(response.answer[1].rtype, RecordType::RRSIG);
    assert!(response.authentic_data);

    // Without DNSSEC-OK the signature stays out
    let response = cache
        .query(&CacheRequest::new("signed.test", RecordType::A), false, false)
        .expect("plain answer");
    assert_eq!(response.answer.len(), 1);
}

#[test]
fn test_wildcard_signature_adds_nsec_proof() {
    let cache = manager();

    let mut record = CachedRecord::new(
        DnsRecord::new(
            "host.wild.test",
            RecordType::A,
            RecordClass::IN,
            3600,
            RData::A(Ipv4Addr::new(192, 0, 2, 8)),
        )
        .with_dnssec_status(DnssecStatus::Secure),
    );
    // Labels field 2 < 3 owner labels: wildcard expansion
    record.info.rrsigs.push(CachedRecord::new(DnsRecord::new(
        "host.wild.test",
        RecordType::RRSIG,
        RecordClass::IN,
        3600,
        RData::Rrsig {
            type_covered: RecordType::A,
            algorithm: 13,
            labels: 2,
            original_ttl: 3600,
            expiration: 0,
            inception: 0,
            key_tag: 1234,
            signer: "wild.test".to_string(),
            signature: vec![0xBB],
        },
    )));
    record.info.nsecs.push(CachedRecord::new(DnsRecord::new(
        "wild.test",
        RecordType::NSEC,
        RecordClass::IN,
        3600,
        RData::Nsec {
            next: "zz.wild.test".to_string(),
            types: vec![RecordType::A, RecordType::RRSIG],
        },
    )));
    cache.cache_records(vec![record]);

    let response = cache
        .query(
            &CacheRequest::new("host.wild.test", RecordType::A).with_dnssec_ok(),
            false,
            false,
        )
        .expect("wildcard answer");
    assert!(response
        .authority
        .iter()
        .any(|record| record.rtype == RecordType::NSEC));
}

#[test]
fn test_mx_additional_section() {
    let cache = manager();
    cache.cache_records(vec![CachedRecord::new(DnsRecord::new(
        "example.com",
        RecordType::MX,
        RecordClass::IN,
        3600,
        RData::Mx {
            preference: 10,
            exchange: "mail.example.com".to_string(),
        },
    ))]);
    cache.cache_records(vec![a_record("mail.example.com", [192, 0, 2, 25], 3600)]);

    let response = cache
        .query(&CacheRequest::new("example.com", RecordType::MX), false, false)
        .expect("MX answer");
    assert_eq!(response.answer.len(), 1);
    assert_eq!(response.additional.len(), 1);
    assert_eq!(response.additional[0].name, "mail.example.com");
}

#[test]
fn test_https_alias_mode_chain() {
    let cache = manager();
    cache.cache_records(vec![CachedRecord::new(DnsRecord::new(
        "example.com",
        RecordType::HTTPS,
        RecordClass::IN,
        3600,
        RData::Https {
            priority: 0,
            target: "svc.example.net".to_string(),
            params: Vec::new(),
        },
    ))]);
    cache.cache_records(vec![CachedRecord::new(DnsRecord::new(
        "svc.example.net",
        RecordType::HTTPS,
        RecordClass::IN,
        3600,
        RData::Https {
            priority: 1,
            target: "".to_string(), // ServiceMode, "." means the owner
            params: Vec::new(),
        },
    ))]);
    cache.cache_records(vec![a_record("svc.example.net", [192, 0, 2, 80], 3600)]);

    let response = cache
        .query(
            &CacheRequest::new("example.com", RecordType::HTTPS),
            false,
            false,
        )
        .expect("HTTPS answer");
    assert_eq!(response.answer.len(), 1);
    // The alias chain lands on svc.example.net and pulls its addresses
    assert!(response
        .additional
        .iter()
        .any(|record| record.rtype == RecordType::HTTPS && record.name == "svc.example.net"));
    assert!(response
        .additional
        .iter()
        .any(|record| record.rtype == RecordType::A && record.name == "svc.example.net"));
}

#[test]
fn test_ecs_scoped_answers() {
    let cache = manager();

    let mut scoped = a_record("geo.test", [10, 10, 10, 10], 3600);
    scoped.info.ecs_scope = Some(mimir::cache::EcsScope::new("10.0.0.0".parse().unwrap(), 8));
    cache.cache_records(vec![scoped]);
    cache.cache_records(vec![a_record("geo.test", [99, 99, 99, 99], 3600)]);

    // Query from inside the scope
    let request = CacheRequest::new("geo.test", RecordType::A)
        .with_client_subnet(ClientSubnet::new("10.1.2.3".parse().unwrap(), 24));
    let response = cache.query(&request, false, false).expect("scoped answer");
    assert_eq!(response.answer[0].rdata, RData::A(Ipv4Addr::new(10, 10, 10, 10)));

    // The response carries an ECS option echoing the request with the
    // record's scope prefix
    let ecs = response
        .options
        .iter()
        .find(|option| option.code == EdnsOptionCode::ClientSubnet as u16)
        .and_then(ClientSubnet::from_option)
        .expect("ECS option expected");
    assert_eq!(ecs.source_prefix, 24);
    assert_eq!(ecs.scope_prefix, 8);

    // Query from outside the scope gets the global answer
    let request = CacheRequest::new("geo.test", RecordType::A)
        .with_client_subnet(ClientSubnet::new("172.16.0.1".parse().unwrap(), 24));
    let response = cache.query(&request, false, false).expect("global answer");
    assert_eq!(response.answer[0].rdata, RData::A(Ipv4Addr::new(99, 99, 99, 99)));

    // Queries without ECS never see scoped data
    let response = cache
        .query(&CacheRequest::new("geo.test", RecordType::A), false, false)
        .expect("global answer");
    assert_eq!(response.answer[0].rdata, RData::A(Ipv4Addr::new(99, 99, 99, 99)));
}

#[test]
fn test_delete_edns_client_subnet_data() {
    let cache = manager();

    let mut scoped = a_record("geo.test", [10, 10, 10, 10], 3600);
    scoped.info.ecs_scope = Some(mimir::cache::EcsScope::new("10.0.0.0".parse().unwrap(), 8));
    cache.cache_records(vec![scoped]);
    cache.cache_records(vec![a_record("geo.test", [99, 99, 99, 99], 3600)]);
    assert_eq!(cache.total_entries(), 2);

    cache.delete_edns_client_subnet_data();
    assert_eq!(cache.total_entries(), 1);

    let request = CacheRequest::new("geo.test", RecordType::A)
        .with_client_subnet(ClientSubnet::new("10.1.2.3".parse().unwrap(), 24));
    let response = cache.query(&request, false, false).expect("global answer");
    assert_eq!(response.answer[0].rdata, RData::A(Ipv4Addr::new(99, 99, 99, 99)));
}

#[test]
fn test_flush_and_delete_zone() {
    let cache = manager();
    cache.cache_records(vec![a_record("a.example.com", [1, 1, 1, 1], 3600)]);
    cache.cache_records(vec![a_record("b.example.com", [2, 2, 2, 2], 3600)]);
    cache.cache_records(vec![a_record("other.test", [3, 3, 3, 3], 3600)]);
    assert_eq!(cache.total_entries(), 3);

    let removed = cache.delete_zone("example.com");
    assert_eq!(removed, 2);
    assert_eq!(cache.total_entries(), 1);

    cache.flush();
    assert_eq!(cache.total_entries(), 0);
    assert!(cache
        .query(&CacheRequest::new("other.test", RecordType::A), false, false)
        .is_none());
}

#[test]
fn test_list_sub_domains() {
    let cache = manager();
    cache.cache_records(vec![a_record("a.example.com", [1, 1, 1, 1], 3600)]);
    cache.cache_records(vec![a_record("b.example.com", [2, 2, 2, 2], 3600)]);

    let mut sub_domains = Vec::new();
    cache.list_sub_domains("example.com", &mut sub_domains);
    sub_domains.sort();
    assert_eq!(sub_domains, vec!["a.example.com", "b.example.com"]);
}

#[test]
fn test_total_entries_never_negative() {
    let cache = manager();
    cache.cache_records(vec![a_record("a.test", [1, 1, 1, 1], 3600)]);

    cache.delete_zone("a.test");
    cache.delete_zone("a.test"); // second delete finds nothing
    cache.flush();
    cache.remove_expired_records();

    assert!(cache.total_entries() >= 0);
    assert_eq!(cache.total_entries(), 0);
}

#[test]
fn test_negative_maximum_entries_rejected() {
    let cache = manager();
    assert!(cache.set_maximum_entries(-1).is_err());
    assert!(cache.set_maximum_entries(0).is_ok());
    assert!(cache.set_maximum_entries(100).is_ok());
    assert_eq!(cache.maximum_entries(), 100);
}

#[test]
fn test_cname_chase_is_bounded() {
    let cache = manager();

    // A 40-deep chain; the chase must stop after MAX_CNAME_HOPS records
    let mut records = Vec::new();
    for index in 0..40 {
        records.push(cname_record(
            &format!("h{}.chain.test", index),
            &format!("h{}.chain.test", index + 1),
            300,
        ));
    }
    cache.cache_records(records);

    let response = cache
        .query(
            &CacheRequest::new("h0.chain.test", RecordType::A),
            false,
            false,
        )
        .expect("truncated chain expected");
    assert!(response.answer.len() <= 17); // initial answer + 16 hops
    assert!(response.answer.len() > 1);
}

#[test]
fn test_newest_records_win_per_scope() {
    let cache = manager();
    cache.cache_records(vec![a_record("w.test", [1, 1, 1, 1], 3600)]);
    cache.cache_records(vec![a_record("w.test", [2, 2, 2, 2], 3600)]);
    assert_eq!(cache.total_entries(), 1);

    let response = cache
        .query(&CacheRequest::new("w.test", RecordType::A), false, false)
        .expect("answer expected");
    assert_eq!(response.answer[0].rdata, RData::A(Ipv4Addr::new(2, 2, 2, 2)));
}
