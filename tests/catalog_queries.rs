//! Catalog-level tests: wire-format queries answered through `Catalog::handle_request()`.

mod common;

use common::*;
use hickory_proto::op::ResponseCode;
use hickory_proto::rr::{RData, RecordType};
use mesos_dns::records::Records;
use mesos_dns::state::DnsState;

const S3_TOKEN: &str = "cjak5i";

#[tokio::test]
async fn a_query_returns_task_addresses() {
    let catalog = test_catalog(fixture_state());
    let msg = execute_query(&catalog, "web.marathon.mesos.", RecordType::A, 1).await;

    assert_ip_response(&msg, &["172.17.0.2", "10.0.2.4"]);
    assert!(msg.authoritative());
}

#[tokio::test]
async fn a_query_is_case_insensitive() {
    let catalog = test_catalog(fixture_state());
    let msg = execute_query(&catalog, "Leader.MESOS.", RecordType::A, 2).await;

    assert_ip_response(&msg, &["10.0.0.1"]);
}

#[tokio::test]
async fn aaaa_query_returns_only_ipv6() {
    let catalog = test_catalog(fixture_state());
    let msg = execute_query(&catalog, "multi.marathon.mesos.", RecordType::AAAA, 3).await;

    assert_ip_response(&msg, &["fd01::5"]);
}

#[tokio::test]
async fn a_query_on_multi_homed_task_skips_ipv6() {
    let catalog = test_catalog(fixture_state());
    let msg = execute_query(&catalog, "multi.marathon.mesos.", RecordType::A, 4).await;

    assert_ip_response(&msg, &["172.17.0.5"]);
}

#[tokio::test]
async fn srv_query_returns_targets_and_ports() {
    let catalog = test_catalog(fixture_state());
    let msg = execute_query(&catalog, "_web._tcp.marathon.mesos.", RecordType::SRV, 5).await;

    assert_response_code(&msg, ResponseCode::NoError);
    let mut actual = extract_srv(&msg);
    actual.sort();
    let mut expected = vec![
        format!("web-{}-0.marathon.slave.mesos.:31000", S3_TOKEN),
        format!("web-{}-0.marathon.slave.mesos.:31001", S3_TOKEN),
        "web-p2coh7-1.marathon.slave.mesos.:31002".to_string(),
    ];
    expected.sort();
    assert_eq!(actual, expected);

    for record in msg.answers() {
        if let RData::SRV(srv) = record.data() {
            assert_eq!(srv.priority(), 0);
            assert_eq!(srv.weight(), 0);
        }
    }
}

#[tokio::test]
async fn srv_query_for_framework() {
    let catalog = test_catalog(fixture_state());
    let msg = execute_query(
        &catalog,
        "_framework._tcp.marathon.mesos.",
        RecordType::SRV,
        6,
    )
    .await;

    assert_response_code(&msg, ResponseCode::NoError);
    assert_eq!(extract_srv(&msg), ["marathon.mesos.:25501"]);
}

#[tokio::test]
async fn soa_query_at_apex() {
    let catalog = test_catalog(fixture_state());
    let msg = execute_query(&catalog, "mesos.", RecordType::SOA, 7).await;

    assert_response_code(&msg, ResponseCode::NoError);
    let soa = msg
        .answers()
        .iter()
        .find_map(|r| match r.data() {
            RData::SOA(soa) => Some(soa.clone()),
            _ => None,
        })
        .expect("SOA answer");
    assert_eq!(soa.mname().to_string(), "mesos-dns.mesos.");
    assert_eq!(soa.rname().to_string(), "root.mesos-dns.mesos.");
    assert_eq!(soa.serial(), 1);
}

#[tokio::test]
async fn ns_query_at_apex() {
    let catalog = test_catalog(fixture_state());
    let msg = execute_query(&catalog, "mesos.", RecordType::NS, 8).await;

    assert_response_code(&msg, ResponseCode::NoError);
    let ns: Vec<String> = msg
        .answers()
        .iter()
        .filter_map(|r| match r.data() {
            RData::NS(ns) => Some(ns.0.to_string()),
            _ => None,
        })
        .collect();
    assert_eq!(ns, ["mesos-dns.mesos."]);
}

#[tokio::test]
async fn unknown_name_returns_nxdomain() {
    let catalog = test_catalog(fixture_state());
    let msg = execute_query(&catalog, "unknown.marathon.mesos.", RecordType::A, 9).await;

    assert_response_code(&msg, ResponseCode::NXDomain);
    assert!(msg.answers().is_empty());
}

#[tokio::test]
async fn known_name_without_type_is_empty_noerror() {
    let catalog = test_catalog(fixture_state());
    let msg = execute_query(&catalog, "leader.mesos.", RecordType::AAAA, 10).await;

    assert_response_code(&msg, ResponseCode::NoError);
    assert!(msg.answers().is_empty());
}

#[tokio::test]
async fn stopped_task_is_nxdomain() {
    let catalog = test_catalog(fixture_state());
    let msg = execute_query(&catalog, "worker.marathon.mesos.", RecordType::A, 11).await;

    assert_response_code(&msg, ResponseCode::NXDomain);
}

#[tokio::test]
async fn state_not_ready_returns_no_answers() {
    let catalog = test_catalog(DnsState::new());
    let msg = execute_query(&catalog, "leader.mesos.", RecordType::A, 12).await;

    // The authority fails the lookup; Hickory's catalog does not map every
    // lookup error to SERVFAIL, so only the absence of answers is checked.
    assert!(
        extract_ips(&msg).is_empty(),
        "expected no address records when state is not ready"
    );
}

#[tokio::test]
async fn replaced_generation_is_served() {
    let state = fixture_state();
    let catalog = test_catalog(state.clone());

    let mut records = Records::new();
    records.insert_a("leader.mesos.", "10.0.0.9");
    state.replace(records);

    let msg = execute_query(&catalog, "leader.mesos.", RecordType::A, 13).await;
    assert_ip_response(&msg, &["10.0.0.9"]);

    let msg = execute_query(&catalog, "web.marathon.mesos.", RecordType::A, 14).await;
    assert_response_code(&msg, ResponseCode::NXDomain);
}
