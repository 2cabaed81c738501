//! Shared test infrastructure for catalog and loopback tests.

#![allow(dead_code)]

use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use hickory_proto::op::{Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::{DNSClass, Name, RData, RecordType};
use hickory_proto::serialize::binary::{BinDecodable, BinDecoder, BinEncoder};
use hickory_server::authority::{Catalog, MessageRequest, MessageResponse};
use hickory_server::proto::rr::Record;
use hickory_server::proto::xfer::Protocol;
use hickory_server::server::{Request, RequestHandler, ResponseHandler, ResponseInfo};

use mesos_dns::config::{Config, DnsConfig, MesosConfig};
use mesos_dns::generator::{generate, GeneratorOptions};
use mesos_dns::records::Records;
use mesos_dns::server::build_catalog;
use mesos_dns::snapshot::{IpSource, State};
use mesos_dns::state::DnsState;

// --- Constants ---

pub const DOMAIN: &str = "mesos";

// --- TestResponseHandler ---

/// Captures the serialized DNS response for inspection in tests.
///
/// Implements `ResponseHandler` so it can be passed to `Catalog::handle_request()`.
/// The response is serialized via `MessageResponse::destructive_emit()` and stored
/// as raw wire-format bytes, which can then be parsed with `Message::from_vec()`.
#[derive(Clone)]
pub struct TestResponseHandler {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl TestResponseHandler {
    pub fn new() -> Self {
        Self {
            buf: Arc::new(Mutex::new(Vec::with_capacity(512))),
        }
    }

    /// Parse the captured wire bytes into a `Message` for assertions.
    pub fn into_message(self) -> Message {
        let buf = self.buf.lock().unwrap();
        assert!(!buf.is_empty(), "no response was captured");
        Message::from_vec(&buf).expect("failed to parse captured DNS response")
    }
}

#[async_trait]
impl ResponseHandler for TestResponseHandler {
    async fn send_response<'a>(
        &mut self,
        response: MessageResponse<
            '_,
            'a,
            impl Iterator<Item = &'a Record> + Send + 'a,
            impl Iterator<Item = &'a Record> + Send + 'a,
            impl Iterator<Item = &'a Record> + Send + 'a,
            impl Iterator<Item = &'a Record> + Send + 'a,
        >,
    ) -> io::Result<ResponseInfo> {
        let mut buf = self.buf.lock().unwrap();
        buf.clear();
        let mut encoder = BinEncoder::new(&mut *buf);
        encoder.set_max_size(u16::MAX);
        let info = response
            .destructive_emit(&mut encoder)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        Ok(info)
    }
}

// --- Config builders ---

pub fn test_config() -> Config {
    Config {
        dns: DnsConfig {
            listen_addr: "127.0.0.1:5353".parse().unwrap(),
            domain: DOMAIN.to_string(),
            ..Default::default()
        },
        mesos: MesosConfig {
            masters: vec!["10.0.0.1:5050".to_string()],
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn generator_options(sources: &[IpSource]) -> GeneratorOptions {
    GeneratorOptions {
        domain: DOMAIN.to_string(),
        ip_sources: sources.to_vec(),
        ..Default::default()
    }
}

// --- Fixtures ---

/// Load and decode `tests/fixtures/<name>`.
pub fn load_fixture(name: &str) -> State {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    let body = std::fs::read(&path)
        .unwrap_or_else(|e| panic!("failed to read fixture {}: {}", path.display(), e));
    State::from_json(&body).expect("fixture should decode")
}

/// Records generated from the bundled `state.json` fixture.
pub fn fixture_records(sources: &[IpSource]) -> Records {
    generate(&load_fixture("state.json"), &generator_options(sources)).expect("generation failed")
}

/// A ready state holding the fixture's records.
pub fn fixture_state() -> DnsState {
    let state = DnsState::new();
    state.replace(fixture_records(&[IpSource::Netinfo, IpSource::Mesos, IpSource::Host]));
    state
}

// --- Query/Request construction ---

/// Build wire-format bytes for a DNS query.
pub fn build_query_bytes(name: &str, record_type: RecordType, id: u16) -> Vec<u8> {
    let mut msg = Message::new();
    msg.set_id(id);
    msg.set_message_type(MessageType::Query);
    msg.set_op_code(OpCode::Query);
    msg.set_recursion_desired(true);
    let mut query = Query::new();
    query.set_name(Name::from_ascii(name).unwrap());
    query.set_query_type(record_type);
    query.set_query_class(DNSClass::IN);
    msg.add_query(query);
    msg.to_vec().unwrap()
}

/// Parse wire bytes into a MessageRequest.
pub fn parse_message_request(bytes: &[u8]) -> MessageRequest {
    let mut decoder = BinDecoder::new(bytes);
    MessageRequest::read(&mut decoder).expect("failed to parse MessageRequest")
}

/// Build a full `Request` from a fixed client address.
pub fn build_request(name: &str, record_type: RecordType, id: u16) -> Request {
    let bytes = build_query_bytes(name, record_type, id);
    let msg = parse_message_request(&bytes);
    let src: SocketAddr = "10.1.1.1:12345".parse().unwrap();
    Request::new(msg, src, Protocol::Udp)
}

/// Build a Catalog over `state` with the test configuration.
pub fn test_catalog(state: DnsState) -> Catalog {
    build_catalog(&test_config(), state).expect("failed to build catalog")
}

// --- Response helpers ---

/// Execute a query through the catalog and return the parsed response.
pub async fn execute_query(
    catalog: &Catalog,
    name: &str,
    record_type: RecordType,
    id: u16,
) -> Message {
    let request = build_request(name, record_type, id);
    let handler = TestResponseHandler::new();
    catalog.handle_request(&request, handler.clone()).await;
    handler.into_message()
}

/// Extract A and AAAA addresses from a response, in answer order.
pub fn extract_ips(msg: &Message) -> Vec<IpAddr> {
    msg.answers()
        .iter()
        .filter_map(|r| match r.data() {
            RData::A(a) => Some(IpAddr::V4(Ipv4Addr::from(*a))),
            RData::AAAA(aaaa) => Some(IpAddr::V6(Ipv6Addr::from(*aaaa))),
            _ => None,
        })
        .collect()
}

/// Extract SRV answers as `target:port` strings.
pub fn extract_srv(msg: &Message) -> Vec<String> {
    msg.answers()
        .iter()
        .filter_map(|r| match r.data() {
            RData::SRV(srv) => Some(format!("{}:{}", srv.target(), srv.port())),
            _ => None,
        })
        .collect()
}

/// Assert response code.
pub fn assert_response_code(msg: &Message, expected: ResponseCode) {
    assert_eq!(
        msg.response_code(),
        expected,
        "expected {:?}, got {:?}",
        expected,
        msg.response_code()
    );
}

/// Assert response is successful with exactly the expected addresses.
pub fn assert_ip_response(msg: &Message, expected: &[&str]) {
    assert_response_code(msg, ResponseCode::NoError);
    let mut actual = extract_ips(msg);
    actual.sort();
    let mut expected: Vec<IpAddr> = expected.iter().map(|ip| ip.parse().unwrap()).collect();
    expected.sort();
    assert_eq!(
        actual, expected,
        "address records mismatch.\nactual:   {:?}\nexpected: {:?}",
        actual, expected
    );
}
