//! Custom Hickory DNS authority backed by generated Mesos records.

use async_trait::async_trait;
use hickory_proto::op::ResponseCode;
use hickory_proto::rr::rdata::{A, AAAA, NS, SOA, SRV};
use hickory_proto::rr::{DNSClass, LowerName, Name, RData, Record, RecordSet, RecordType};
use hickory_server::authority::{
    Authority, LookupControlFlow, LookupError, LookupOptions, LookupRecords, MessageRequest,
    UpdateResult, ZoneType,
};
use hickory_server::server::RequestInfo;
use std::io;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::config::DnsConfig;
use crate::error::DnsError;
use crate::generator::normalize_domain;
use crate::metrics::{self, QueryResult, Timer};
use crate::records::Records;
use crate::state::DnsState;

/// Split an SRV target `host:port` into a name and a port.
fn parse_srv_target(target: &str) -> Option<(Name, u16)> {
    let (host, port) = target.rsplit_once(':')?;
    let port = port.parse().ok()?;
    let name = Name::from_ascii(host).ok()?;
    Some((name, port))
}

/// Parse `name` as a fully qualified name.
fn fqdn(name: &str) -> Result<Name, hickory_proto::ProtoError> {
    let mut name = Name::from_ascii(name)?;
    name.set_fqdn(true);
    Ok(name)
}

/// Authority for the Mesos domain, answering from the current generation.
pub struct MesosAuthority {
    origin: LowerName,
    mname: Name,
    rname: Name,
    state: DnsState,
    config: Arc<DnsConfig>,
}

impl MesosAuthority {
    /// Create a new authority for the given configuration and state.
    pub fn new(config: DnsConfig, state: DnsState) -> Result<Self, DnsError> {
        let domain = normalize_domain(&config.domain)?;
        let origin = fqdn(&domain)?;
        let mname = fqdn(&config.mname())?;
        let rname = fqdn(&config.rname())?;

        Ok(Self {
            origin: origin.into(),
            mname,
            rname,
            state,
            config: Arc::new(config),
        })
    }

    fn record(&self, name: &Name, rdata: RData) -> Record {
        let mut record = Record::from_rdata(name.clone(), self.config.ttl, rdata);
        record.set_dns_class(DNSClass::IN);
        record
    }

    /// Build A or AAAA records from the address targets of `key`.
    fn build_address_records(
        &self,
        name: Name,
        rtype: RecordType,
        records: &Records,
        key: &str,
    ) -> RecordSet {
        let mut record_set = RecordSet::new(name.clone(), rtype, 0);

        let ips = records
            .a
            .lookup(key)
            .iter()
            .filter_map(|target| target.parse::<IpAddr>().ok());
        for ip in ips {
            let rdata = match (rtype, ip) {
                (RecordType::A, IpAddr::V4(v4)) => RData::A(A::from(v4)),
                (RecordType::AAAA, IpAddr::V6(v6)) => RData::AAAA(AAAA::from(v6)),
                _ => continue,
            };
            record_set.insert(self.record(&name, rdata), 0);
        }

        record_set
    }

    /// Build SRV records for `key`. Targets that do not split into a valid
    /// name and port are skipped.
    fn build_srv_records(&self, name: Name, records: &Records, key: &str) -> RecordSet {
        let mut record_set = RecordSet::new(name.clone(), RecordType::SRV, 0);

        for target in records.srv.lookup(key) {
            let Some((host, port)) = parse_srv_target(target) else {
                debug!(name = %key, target = %target, "skipping malformed SRV target");
                continue;
            };
            let rdata = RData::SRV(SRV::new(0, 0, port, host));
            record_set.insert(self.record(&name, rdata), 0);
        }

        record_set
    }

    /// Build the SOA record for this zone.
    fn build_soa_record(&self) -> RecordSet {
        let soa = SOA::new(
            self.mname.clone(),
            self.rname.clone(),
            self.state.serial(),
            self.config.soa.refresh as i32,
            self.config.soa.retry as i32,
            self.config.soa.expire as i32,
            self.config.soa.minimum,
        );

        let name = Name::from(self.origin.clone());
        let mut record_set = RecordSet::new(name.clone(), RecordType::SOA, 0);
        record_set.insert(self.record(&name, RData::SOA(soa)), 0);

        record_set
    }

    /// Build an NS record for this zone.
    fn build_ns_record(&self) -> RecordSet {
        let name = Name::from(self.origin.clone());

        let mut record_set = RecordSet::new(name.clone(), RecordType::NS, 0);
        record_set.insert(self.record(&name, RData::NS(NS(self.mname.clone()))), 0);

        record_set
    }

    fn answer(
        &self,
        record_set: RecordSet,
        rtype_str: &str,
        lookup_options: LookupOptions,
        timer: &Timer,
    ) -> LookupControlFlow<LookupRecords> {
        if record_set.is_empty() {
            metrics::record_query(rtype_str, QueryResult::NoData, timer.elapsed());
            return LookupControlFlow::Break(Err(LookupError::NameExists));
        }

        metrics::record_answers_returned(rtype_str, record_set.records_without_rrsigs().count());
        metrics::record_query(rtype_str, QueryResult::Success, timer.elapsed());
        LookupControlFlow::Break(Ok(LookupRecords::new(
            lookup_options,
            Arc::new(record_set),
        )))
    }
}

#[async_trait]
impl Authority for MesosAuthority {
    type Lookup = LookupRecords;

    fn zone_type(&self) -> ZoneType {
        ZoneType::Primary
    }

    fn is_axfr_allowed(&self) -> bool {
        false
    }

    fn origin(&self) -> &LowerName {
        &self.origin
    }

    async fn lookup(
        &self,
        name: &LowerName,
        rtype: RecordType,
        lookup_options: LookupOptions,
    ) -> LookupControlFlow<Self::Lookup> {
        let timer = Timer::start();
        let rtype_str = rtype.to_string();

        if !self.state.is_ready() {
            debug!("DNS state not ready, failing lookup");
            metrics::record_query(&rtype_str, QueryResult::NotReady, timer.elapsed());
            return LookupControlFlow::Break(Err(LookupError::from(io::Error::new(
                io::ErrorKind::NotConnected,
                DnsError::NotReady,
            ))));
        }

        // Generated names are lowercase and fully qualified.
        let key = format!("{}.", name.to_string().trim_end_matches('.'));
        let is_apex = *name == self.origin;
        let records = self.state.snapshot();

        trace!(name = %key, rtype = ?rtype, "DNS lookup");

        if !is_apex && !records.has_name(&key) {
            debug!(name = %key, rtype = ?rtype, "lookup: no such name");
            metrics::record_query(&rtype_str, QueryResult::NxDomain, timer.elapsed());
            return LookupControlFlow::Break(Err(LookupError::ResponseCode(
                ResponseCode::NXDomain,
            )));
        }

        let dns_name = Name::from(name.clone());
        let record_set = match rtype {
            RecordType::A | RecordType::AAAA => {
                self.build_address_records(dns_name, rtype, &records, &key)
            }
            RecordType::SRV => self.build_srv_records(dns_name, &records, &key),
            RecordType::SOA if is_apex => self.build_soa_record(),
            RecordType::NS if is_apex => self.build_ns_record(),
            _ => RecordSet::new(dns_name, rtype, 0),
        };

        debug!(name = %key, rtype = ?rtype, count = record_set.records_without_rrsigs().count(), "lookup");
        self.answer(record_set, &rtype_str, lookup_options, &timer)
    }

    async fn search(
        &self,
        request_info: RequestInfo<'_>,
        lookup_options: LookupOptions,
    ) -> LookupControlFlow<Self::Lookup> {
        self.lookup(
            request_info.query.name(),
            request_info.query.query_type(),
            lookup_options,
        )
        .await
    }

    async fn get_nsec_records(
        &self,
        _name: &LowerName,
        _lookup_options: LookupOptions,
    ) -> LookupControlFlow<Self::Lookup> {
        // DNSSEC not supported
        LookupControlFlow::Break(Err(LookupError::ResponseCode(ResponseCode::NoError)))
    }

    async fn update(&self, _update: &MessageRequest) -> UpdateResult<bool> {
        // Dynamic updates not supported
        Err(ResponseCode::NotImp)
    }
}
