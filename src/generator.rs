//! Translation of Mesos master state into DNS records.
//!
//! Names produced for domain `mesos`:
//!
//! ```text
//! leader.mesos.                          A    leading master
//! master.mesos. / masterN.mesos.         A    all masters / one per master
//! _leader._tcp.mesos.                    SRV  leader.mesos.:<port>
//! slave.mesos. / <id>.slave.mesos.       A    agents
//! _slave._tcp.mesos.                     SRV  slave.mesos.:<port>
//! <fw>.mesos.                            A    framework scheduler
//! _framework._tcp.<fw>.mesos.            SRV  <fw>.mesos.:<port>
//! <task>.<fw>.mesos.                     A    task addresses (preferred source)
//! <task>.<fw>.slave.mesos.               A    agent addresses of the task
//! <task>-<hash>-<n>.<fw>[.slave].mesos.  A    one task instance
//! _<task>._tcp.<fw>[.slave].mesos.       SRV  <task>-<hash>-<n>...:<port>
//! ```
//!
//! Every cycle builds a fresh [`Records`] from scratch.

use std::collections::HashMap;
use std::net::IpAddr;

use hickory_proto::rr::Name;
use tracing::{debug, trace};

use crate::config::Config;
use crate::error::DnsError;
use crate::hash::HashAlgorithm;
use crate::labels::{domain_frag, LabelSpec, RFC1123_MAX_LEN, SEP};
use crate::records::Records;
use crate::snapshot::{Framework, IpSource, Pid, State, Task};

/// Inputs of one generation cycle besides the master state.
#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    /// Root domain, e.g. `mesos`.
    pub domain: String,
    /// Label of this name server under the root domain.
    pub ns_name: String,
    /// Address this server answers on; unspecified means no self record.
    pub listener: IpAddr,
    /// Fallback masters, `host:port`.
    pub masters: Vec<String>,
    /// Preferred task address sources, in order.
    pub ip_sources: Vec<IpSource>,
    /// Label sanitizer profile.
    pub label_spec: LabelSpec,
    /// Disambiguation token algorithm.
    pub hash: HashAlgorithm,
}

impl GeneratorOptions {
    /// Derive generator options from the loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            domain: config.dns.domain.clone(),
            ns_name: config.dns.ns_name.clone(),
            listener: config.dns.listen_addr.ip(),
            masters: config.mesos.masters.clone(),
            ip_sources: config.dns.ip_sources.clone(),
            label_spec: LabelSpec::from_enforce_rfc952(config.dns.enforce_rfc952),
            hash: config.dns.hash,
        }
    }
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            domain: "mesos".to_string(),
            ns_name: "mesos-dns".to_string(),
            listener: IpAddr::from([0, 0, 0, 0]),
            masters: Vec::new(),
            ip_sources: vec![IpSource::Netinfo, IpSource::Mesos, IpSource::Host],
            label_spec: LabelSpec::default(),
            hash: HashAlgorithm::default(),
        }
    }
}

/// Lowercase `domain`, strip surrounding dots and check it is a valid name.
pub fn normalize_domain(domain: &str) -> Result<String, DnsError> {
    let domain = domain.trim().trim_matches('.').to_ascii_lowercase();
    if domain.is_empty() {
        return Err(DnsError::Config("domain must not be empty".to_string()));
    }
    Name::from_ascii(&domain)?;
    Ok(domain)
}

/// Build the complete record set for `state`.
pub fn generate(state: &State, opts: &GeneratorOptions) -> Result<Records, DnsError> {
    let domain = normalize_domain(&opts.domain)?;
    let mut generator = RecordGenerator::new(&domain, opts);

    generator.slave_records(state);
    generator.framework_records(state);
    master_records(&domain, &opts.masters, &state.leader, &mut generator.records);
    generator.task_records(state);
    generator.listener_record();

    let records = generator.records;
    debug!(
        a_names = records.a.len(),
        srv_names = records.srv.len(),
        "generated records"
    );
    Ok(records)
}

/// Split `host:port`, accepting bracketed IPv6 hosts.
fn split_host_port(addr: &str) -> Option<(&str, &str)> {
    let (host, port) = addr.rsplit_once(':')?;
    let host = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    if host.is_empty() || port.is_empty() {
        return None;
    }
    Some((host, port))
}

/// Emit leader and master records for `domain` into `records`.
///
/// A malformed leader descriptor produces no records at all. Otherwise
/// `master.<domain>.` collects every distinct master host, leader first, and
/// `master<N>.<domain>.` indexes the deduplicated fallback list with the
/// leader appended when it was not listed.
pub fn master_records(domain: &str, masters: &[String], leader: &str, records: &mut Records) {
    let Some(pid) = Pid::parse(leader) else {
        debug!(leader, "no valid leader descriptor, skipping master records");
        return;
    };

    let tail = format!(".{}.", domain);
    let leader_name = format!("leader{}", tail);
    let master_name = format!("master{}", tail);

    records.insert_a(&leader_name, pid.host);
    records.insert_a(&master_name, pid.host);

    let leader_target = format!("{}:{}", leader_name, pid.port);
    records.insert_srv(&format!("_leader._tcp{}", tail), &leader_target);
    records.insert_srv(&format!("_leader._udp{}", tail), &leader_target);

    let leader_addr = pid.address();
    let mut unique: Vec<&str> = Vec::with_capacity(masters.len() + 1);
    for master in masters {
        if split_host_port(master).is_none() {
            debug!(master = %master, "ignoring malformed master address");
            continue;
        }
        if !unique.contains(&master.as_str()) {
            unique.push(master);
        }
    }
    if !unique.contains(&leader_addr.as_str()) {
        unique.push(&leader_addr);
    }

    for (i, addr) in unique.iter().enumerate() {
        if let Some((host, _)) = split_host_port(addr) {
            records.insert_a(&master_name, host);
            records.insert_a(&format!("master{}{}", i, tail), host);
        }
    }
}

/// Per-cycle generator state.
struct RecordGenerator<'a> {
    opts: &'a GeneratorOptions,
    /// `.<domain>.`
    tail: String,
    records: Records,
    /// agent id -> agent host address
    slave_ips: HashMap<String, String>,
    /// (framework, task) -> next ordinal
    ordinals: HashMap<(String, String), usize>,
}

impl<'a> RecordGenerator<'a> {
    fn new(domain: &str, opts: &'a GeneratorOptions) -> Self {
        Self {
            opts,
            tail: format!(".{}.", domain),
            records: Records::new(),
            slave_ips: HashMap::new(),
            ordinals: HashMap::new(),
        }
    }

    fn label(&self, name: &str) -> String {
        self.opts.label_spec.label(name)
    }

    fn frag(&self, name: &str) -> String {
        domain_frag(name, SEP, self.opts.label_spec)
    }

    fn slave_records(&mut self, state: &State) {
        let slave_name = format!("slave{}", self.tail);
        let slave_srv = format!("_slave._tcp{}", self.tail);

        for slave in &state.slaves {
            let Some(pid) = Pid::parse(&slave.pid) else {
                debug!(slave_id = %slave.id, pid = %slave.pid, "skipping agent with malformed pid");
                continue;
            };
            if pid.host.parse::<IpAddr>().is_err() {
                debug!(slave_id = %slave.id, host = %pid.host, "skipping agent without IP address");
                continue;
            }

            let id_frag = self.frag(&slave.id);
            if !id_frag.is_empty() {
                self.records
                    .insert_a(&format!("{}.slave{}", id_frag, self.tail), pid.host);
            }
            self.records.insert_a(&slave_name, pid.host);
            self.records
                .insert_srv(&slave_srv, &format!("{}:{}", slave_name, pid.port));

            self.slave_ips.insert(slave.id.clone(), pid.host.to_string());
        }
    }

    fn framework_records(&mut self, state: &State) {
        for framework in &state.frameworks {
            let fname = self.frag(&framework.name);
            if fname.is_empty() {
                continue;
            }
            let (host, port) = framework.host_port();
            if host.parse::<IpAddr>().is_err() {
                trace!(framework = %framework.name, host = %host, "framework host is not an IP");
                continue;
            }

            let name = format!("{}{}", fname, self.tail);
            self.records.insert_a(&name, &host);
            if let Some(port) = port {
                self.records
                    .insert_srv(&format!("_framework._tcp.{}", name), &format!("{}:{}", name, port));
            }
        }
    }

    fn task_records(&mut self, state: &State) {
        for framework in &state.frameworks {
            let fname = self.frag(&framework.name);
            if fname.is_empty() {
                debug!(framework = %framework.name, "framework name sanitizes to nothing, skipping tasks");
                continue;
            }
            for task in framework.tasks.iter().filter(|t| t.is_running()) {
                let Some(slave_ip) = self.slave_ips.get(&task.slave_id).cloned() else {
                    debug!(task_id = %task.id, slave_id = %task.slave_id, "task on unknown agent");
                    continue;
                };
                self.task_record(framework, &fname, task, &slave_ip);
            }
        }
    }

    /// Next ordinal for tasks sharing `(fname, tname)` in this cycle.
    fn next_ordinal(&mut self, fname: &str, tname: &str) -> usize {
        let counter = self
            .ordinals
            .entry((fname.to_string(), tname.to_string()))
            .or_insert(0);
        let ordinal = *counter;
        *counter += 1;
        ordinal
    }

    /// `<tname>-<token>-<ordinal>`, shortened to stay a legal label.
    fn canonical_label(&mut self, fname: &str, tname: &str, slave_id: &str) -> String {
        let ordinal = self.next_ordinal(fname, tname);
        let suffix = format!("-{}-{}", self.opts.hash.short_hash(slave_id), ordinal);
        let room = RFC1123_MAX_LEN.saturating_sub(suffix.len());
        let base = &tname[..tname.len().min(room)];
        format!("{}{}", base.trim_end_matches('-'), suffix)
    }

    fn task_record(&mut self, framework: &Framework, fname: &str, task: &Task, slave_ip: &str) {
        let name = task
            .discovery
            .as_ref()
            .and_then(|d| d.name.as_deref())
            .filter(|n| !n.is_empty())
            .unwrap_or(&task.name);
        let tname = self.label(name);
        if tname.is_empty() {
            debug!(task_id = %task.id, framework = %framework.name, "task name sanitizes to nothing");
            return;
        }

        let canonical = format!("{}.{}", self.canonical_label(fname, &tname, &task.slave_id), fname);
        let arec = format!("{}.{}", tname, fname);
        let tail = self.tail.clone();
        let slave_tail = format!(".slave{}", tail);

        for ip in task.ips(&self.opts.ip_sources, slave_ip) {
            self.records.insert_a(&format!("{}{}", arec, tail), &ip);
            self.records.insert_a(&format!("{}{}", canonical, tail), &ip);
        }
        self.records.insert_a(&format!("{}{}", arec, slave_tail), slave_ip);
        self.records.insert_a(&format!("{}{}", canonical, slave_tail), slave_ip);

        let tcp = format!("_{}._tcp.{}", tname, fname);
        let udp = format!("_{}._udp.{}", tname, fname);
        let slave_host = format!("{}{}", canonical, slave_tail);

        match task.ports() {
            Ok(ports) => {
                for port in ports {
                    let target = format!("{}:{}", slave_host, port);
                    if !task.has_discovery_info() {
                        self.records.insert_srv(&format!("{}{}", tcp, tail), &target);
                        self.records.insert_srv(&format!("{}{}", udp, tail), &target);
                    }
                    self.records.insert_srv(&format!("{}{}", tcp, slave_tail), &target);
                    self.records.insert_srv(&format!("{}{}", udp, slave_tail), &target);
                }
            }
            Err(e) => {
                debug!(task_id = %task.id, error = %e, "skipping task resource ports");
            }
        }

        let Some(discovery) = task.discovery.as_ref() else {
            return;
        };
        for port in &discovery.ports.ports {
            let Ok(number) = u16::try_from(port.number) else {
                debug!(task_id = %task.id, port = port.number, "discovery port out of range");
                continue;
            };
            let target = format!("{}{}:{}", canonical, tail, number);
            let proto = port
                .protocol
                .as_deref()
                .map(|p| self.label(p))
                .unwrap_or_default();
            if proto.is_empty() {
                self.records.insert_srv(&format!("{}{}", tcp, tail), &target);
                self.records.insert_srv(&format!("{}{}", udp, tail), &target);
            } else {
                let srv = format!("_{}._{}.{}{}", tname, proto, fname, tail);
                self.records.insert_srv(&srv, &target);
            }
        }
    }

    /// Address record for this name server.
    fn listener_record(&mut self) {
        if self.opts.listener.is_unspecified() {
            trace!("listener is unspecified, no self record");
            return;
        }
        let ns = self.frag(&self.opts.ns_name);
        if ns.is_empty() {
            return;
        }
        let name = format!("{}{}", ns, self.tail);
        self.records.insert_a(&name, &self.opts.listener.to_string());
    }
}
