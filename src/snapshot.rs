//! Mesos master state snapshot.
//!
//! Only the fields the record generator consumes are modelled; everything
//! else in `/master/state.json` is ignored.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::net::IpAddr;
use tracing::debug;

use crate::error::DnsError;

/// Task state that makes a task discoverable.
pub const TASK_RUNNING: &str = "TASK_RUNNING";

const MESOS_IP_LABEL: &str = "MesosContainerizer.NetworkSettings.IPAddress";
const DOCKER_IP_LABEL: &str = "Docker.NetworkSettings.IPAddress";

/// Full master state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct State {
    /// Leader descriptor, `master@host:port`.
    #[serde(default)]
    pub leader: String,
    /// Registered frameworks and their tasks.
    #[serde(default, deserialize_with = "lenient_vec")]
    pub frameworks: Vec<Framework>,
    /// Registered agents.
    #[serde(default, deserialize_with = "lenient_vec")]
    pub slaves: Vec<Slave>,
}

impl State {
    /// Decode a snapshot from the JSON body served by a master.
    pub fn from_json(body: &[u8]) -> Result<Self, DnsError> {
        Ok(serde_json::from_slice(body)?)
    }
}

/// Decode a JSON array entry by entry, dropping entries that do not decode
/// as `T`. The array itself must still be well formed.
fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let values = Vec::<serde_json::Value>::deserialize(deserializer)?;
    Ok(values
        .into_iter()
        .filter_map(|value| match serde_json::from_value(value) {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!(
                    entry = std::any::type_name::<T>(),
                    error = %e,
                    "skipping malformed state entry"
                );
                None
            }
        })
        .collect())
}

/// A Mesos agent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Slave {
    /// Agent id.
    pub id: String,
    /// Agent hostname as reported by the agent.
    #[serde(default)]
    pub hostname: String,
    /// Agent PID, `slave(1)@host:port`.
    #[serde(default)]
    pub pid: String,
}

/// A framework registered with the master.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Framework {
    /// Framework name.
    pub name: String,
    /// Scheduler hostname.
    #[serde(default)]
    pub hostname: String,
    /// Scheduler PID, `scheduler-uuid@host:port`.
    #[serde(default)]
    pub pid: String,
    /// Tasks launched by this framework.
    #[serde(default, deserialize_with = "lenient_vec")]
    pub tasks: Vec<Task>,
}

impl Framework {
    /// Host and optional port the framework advertises.
    ///
    /// The PID wins when it parses, otherwise the bare hostname is used.
    pub fn host_port(&self) -> (String, Option<String>) {
        match Pid::parse(&self.pid) {
            Some(pid) => (pid.host.to_string(), Some(pid.port.to_string())),
            None => (self.hostname.clone(), None),
        }
    }
}

/// A task launched by a framework.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Task {
    /// Task id, unique within the cluster.
    pub id: String,
    /// Task name.
    pub name: String,
    /// Agent the task runs on.
    #[serde(default)]
    pub slave_id: String,
    /// Current task state, e.g. `TASK_RUNNING`.
    #[serde(default)]
    pub state: String,
    /// Allocated resources.
    #[serde(default)]
    pub resources: Resources,
    /// Status updates, in any order.
    #[serde(default)]
    pub statuses: Vec<Status>,
    /// Service discovery information set by the framework.
    #[serde(default)]
    pub discovery: Option<DiscoveryInfo>,
}

/// Address origin for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpSource {
    /// The agent's host address.
    Host,
    /// Address injected by the Mesos containerizer.
    Mesos,
    /// Address assigned by Docker.
    Docker,
    /// Addresses from the container's network infos.
    Netinfo,
}

impl Task {
    /// True if the task should be published.
    pub fn is_running(&self) -> bool {
        self.state == TASK_RUNNING
    }

    /// True if the framework attached discovery information.
    pub fn has_discovery_info(&self) -> bool {
        self.discovery.is_some()
    }

    /// Latest `TASK_RUNNING` status by timestamp.
    fn running_status(&self) -> Option<&Status> {
        self.statuses
            .iter()
            .filter(|s| s.state == TASK_RUNNING)
            .fold(None, |best: Option<&Status>, s| match best {
                Some(b) if b.timestamp >= s.timestamp => Some(b),
                _ => Some(s),
            })
    }

    /// Addresses of this task from the first source in `sources` that yields
    /// any. `host_ip` is the address of the agent the task runs on.
    pub fn ips(&self, sources: &[IpSource], host_ip: &str) -> Vec<String> {
        sources
            .iter()
            .map(|source| self.ips_from(*source, host_ip))
            .find(|ips| !ips.is_empty())
            .unwrap_or_default()
    }

    fn ips_from(&self, source: IpSource, host_ip: &str) -> Vec<String> {
        match source {
            IpSource::Host => {
                if host_ip.is_empty() {
                    Vec::new()
                } else {
                    vec![host_ip.to_string()]
                }
            }
            IpSource::Mesos => self.label_ips(MESOS_IP_LABEL),
            IpSource::Docker => self.label_ips(DOCKER_IP_LABEL),
            IpSource::Netinfo => self
                .running_status()
                .map(Status::network_ips)
                .unwrap_or_default(),
        }
    }

    fn label_ips(&self, key: &str) -> Vec<String> {
        self.running_status()
            .into_iter()
            .flat_map(|s| s.labels.iter())
            .filter(|l| l.key == key)
            .map(|l| l.value.trim())
            .filter(|v| v.parse::<IpAddr>().is_ok())
            .map(str::to_string)
            .collect()
    }

    /// Ports allocated to the task through its `ports` resource.
    pub fn ports(&self) -> Result<Vec<u16>, DnsError> {
        match self.resources.ports.as_deref() {
            Some(ranges) => parse_port_ranges(ranges),
            None => Ok(Vec::new()),
        }
    }
}

/// Task resources.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Resources {
    /// Port ranges in Mesos notation, e.g. `[31000-31001, 31005-31005]`.
    #[serde(default)]
    pub ports: Option<String>,
}

/// A task status update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Status {
    /// Task state at the time of the update.
    pub state: String,
    /// Seconds since the epoch.
    #[serde(default)]
    pub timestamp: f64,
    /// Executor supplied labels.
    #[serde(default)]
    pub labels: Vec<Label>,
    /// Container status with network information.
    #[serde(default)]
    pub container_status: Option<ContainerStatus>,
}

impl Status {
    fn network_ips(&self) -> Vec<String> {
        let mut ips = Vec::new();
        let infos = self
            .container_status
            .iter()
            .flat_map(|c| c.network_infos.iter());
        for info in infos {
            let candidates = info
                .ip_address
                .iter()
                .chain(info.ip_addresses.iter().filter_map(|a| a.ip_address.as_ref()));
            for ip in candidates {
                if ip.parse::<IpAddr>().is_ok() && !ips.contains(ip) {
                    ips.push(ip.clone());
                }
            }
        }
        ips
    }
}

/// A key/value label.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Label {
    /// Label key.
    pub key: String,
    /// Label value.
    #[serde(default)]
    pub value: String,
}

/// Container status attached to a task status.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContainerStatus {
    /// Networks the container joined.
    #[serde(default)]
    pub network_infos: Vec<NetworkInfo>,
}

/// One container network.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkInfo {
    /// Legacy single address field.
    #[serde(default)]
    pub ip_address: Option<String>,
    /// Addresses on this network.
    #[serde(default)]
    pub ip_addresses: Vec<IpAddressEntry>,
}

/// Entry of `NetworkInfo::ip_addresses`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IpAddressEntry {
    /// The address.
    #[serde(default)]
    pub ip_address: Option<String>,
}

/// Discovery information attached by a framework.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoveryInfo {
    /// Service name overriding the task name.
    #[serde(default)]
    pub name: Option<String>,
    /// Published ports.
    #[serde(default)]
    pub ports: DiscoveryPorts,
}

/// Wrapper matching the Mesos JSON nesting (`ports.ports`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoveryPorts {
    /// Published ports.
    #[serde(default, deserialize_with = "lenient_vec")]
    pub ports: Vec<DiscoveryPort>,
}

/// A published discovery port.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoveryPort {
    /// Port number as published; values outside `u16` are dropped when
    /// records are generated.
    pub number: u32,
    /// Optional port name.
    #[serde(default)]
    pub name: Option<String>,
    /// Transport protocol, e.g. `tcp`.
    #[serde(default)]
    pub protocol: Option<String>,
}

/// Parsed `<id>@<host>:<port>` descriptor.
///
/// Used for the leader descriptor and for agent and scheduler PIDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pid<'a> {
    /// Opaque id before the `@`.
    pub id: &'a str,
    /// Host part.
    pub host: &'a str,
    /// Port part.
    pub port: &'a str,
}

impl<'a> Pid<'a> {
    /// Parse a descriptor. Requires exactly one `@`, exactly one `:` after it,
    /// and non-empty host and port.
    pub fn parse(s: &'a str) -> Option<Self> {
        let mut at = s.split('@');
        let (id, addr) = (at.next()?, at.next()?);
        if at.next().is_some() {
            return None;
        }
        let mut colon = addr.split(':');
        let (host, port) = (colon.next()?, colon.next()?);
        if colon.next().is_some() || host.is_empty() || port.is_empty() {
            return None;
        }
        Some(Self { id, host, port })
    }

    /// `host:port`.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Parse Mesos port range notation: `[a-b, c-d]`.
pub fn parse_port_ranges(ranges: &str) -> Result<Vec<u16>, DnsError> {
    let inner = ranges.trim();
    let inner = inner
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| DnsError::InvalidPorts(ranges.to_string()))?;

    let mut ports = Vec::new();
    for range in inner.split(',').map(str::trim).filter(|r| !r.is_empty()) {
        let (lo, hi) = range
            .split_once('-')
            .ok_or_else(|| DnsError::InvalidPorts(ranges.to_string()))?;
        let lo: u16 = lo
            .trim()
            .parse()
            .map_err(|_| DnsError::InvalidPorts(ranges.to_string()))?;
        let hi: u16 = hi
            .trim()
            .parse()
            .map_err(|_| DnsError::InvalidPorts(ranges.to_string()))?;
        if lo > hi {
            return Err(DnsError::InvalidPorts(ranges.to_string()));
        }
        ports.extend(lo..=hi);
    }
    Ok(ports)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(state: &str, timestamp: f64, labels: &[(&str, &str)]) -> Status {
        Status {
            state: state.to_string(),
            timestamp,
            labels: labels
                .iter()
                .map(|(k, v)| Label {
                    key: k.to_string(),
                    value: v.to_string(),
                })
                .collect(),
            container_status: None,
        }
    }

    #[test]
    fn test_pid_parse() {
        let pid = Pid::parse("master@144.76.157.37:5050").unwrap();
        assert_eq!(pid.id, "master");
        assert_eq!(pid.host, "144.76.157.37");
        assert_eq!(pid.port, "5050");
        assert_eq!(pid.address(), "144.76.157.37:5050");
    }

    #[test]
    fn test_pid_parse_rejects_malformed() {
        for bad in ["", "@", "1@", "@2", "3@4", "a@b@c:1", "a@b:1:2", "a@:1", "a@b:"] {
            assert!(Pid::parse(bad).is_none(), "{:?} should not parse", bad);
        }
    }

    #[test]
    fn test_pid_allows_empty_id() {
        let pid = Pid::parse("@6:7").unwrap();
        assert_eq!(pid.id, "");
        assert_eq!(pid.host, "6");
    }

    #[test]
    fn test_parse_port_ranges() {
        assert_eq!(parse_port_ranges("[31364-31365]").unwrap(), vec![31364, 31365]);
        assert_eq!(
            parse_port_ranges("[80-80, 443-443]").unwrap(),
            vec![80, 443]
        );
        assert_eq!(parse_port_ranges("[]").unwrap(), Vec::<u16>::new());
    }

    #[test]
    fn test_parse_port_ranges_rejects_garbage() {
        for bad in ["31364-31365", "[a-b]", "[5-1]", "[80]", "[70000-70001]"] {
            assert!(parse_port_ranges(bad).is_err(), "{:?} should fail", bad);
        }
    }

    #[test]
    fn test_task_ips_follow_source_preference() {
        let task = Task {
            id: "t1".into(),
            name: "web".into(),
            state: TASK_RUNNING.into(),
            statuses: vec![status(
                TASK_RUNNING,
                1.0,
                &[(DOCKER_IP_LABEL, "10.3.0.1")],
            )],
            ..Default::default()
        };

        assert_eq!(
            task.ips(&[IpSource::Docker, IpSource::Host], "1.2.3.4"),
            vec!["10.3.0.1"]
        );
        assert_eq!(
            task.ips(&[IpSource::Mesos, IpSource::Host], "1.2.3.4"),
            vec!["1.2.3.4"]
        );
        assert!(task.ips(&[IpSource::Mesos], "1.2.3.4").is_empty());
    }

    #[test]
    fn test_task_ips_use_latest_running_status() {
        let task = Task {
            state: TASK_RUNNING.into(),
            statuses: vec![
                status(TASK_RUNNING, 2.0, &[(DOCKER_IP_LABEL, "10.0.0.2")]),
                status(TASK_RUNNING, 1.0, &[(DOCKER_IP_LABEL, "10.0.0.1")]),
                status("TASK_STAGING", 3.0, &[(DOCKER_IP_LABEL, "10.0.0.3")]),
            ],
            ..Default::default()
        };
        assert_eq!(task.ips(&[IpSource::Docker], ""), vec!["10.0.0.2"]);
    }

    #[test]
    fn test_netinfo_collects_every_address() {
        let json = r#"{
            "id": "t", "name": "n", "state": "TASK_RUNNING",
            "statuses": [{
                "state": "TASK_RUNNING", "timestamp": 1.0,
                "container_status": {"network_infos": [
                    {"ip_addresses": [{"ip_address": "10.0.0.1"}, {"ip_address": "fd00::1"}]},
                    {"ip_address": "10.0.0.1"},
                    {"ip_address": "not-an-ip"}
                ]}
            }]
        }"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(
            task.ips(&[IpSource::Netinfo], "1.1.1.1"),
            vec!["10.0.0.1", "fd00::1"]
        );
    }

    #[test]
    fn test_framework_host_port() {
        let f = Framework {
            name: "marathon".into(),
            hostname: "host.example".into(),
            pid: "scheduler-1@1.2.3.11:25501".into(),
            tasks: vec![],
        };
        assert_eq!(f.host_port(), ("1.2.3.11".to_string(), Some("25501".to_string())));

        let f = Framework {
            pid: String::new(),
            ..f
        };
        assert_eq!(f.host_port(), ("host.example".to_string(), None));
    }

    #[test]
    fn test_state_from_json_rejects_garbage() {
        assert!(State::from_json(b"not json").is_err());
        assert!(State::from_json(br#"{"frameworks": 3}"#).is_err());
    }

    #[test]
    fn test_state_from_json_drops_malformed_entries() {
        let state = State::from_json(
            br#"{
                "slaves": [{"id": "s1", "pid": "slave(1)@10.0.0.1:5051"}, {"pid": 7}],
                "frameworks": [
                    {"name": "marathon", "tasks": [
                        {"id": "a.1", "name": "a", "state": "TASK_RUNNING"},
                        {"id": "b.1", "state": "TASK_RUNNING"},
                        {"id": "c.1", "name": "c", "state": "TASK_RUNNING",
                         "discovery": {"ports": {"ports": [{"number": 70000}, {"protocol": "tcp"}]}}}
                    ]},
                    {"tasks": []}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(state.slaves.len(), 1);
        assert_eq!(state.frameworks.len(), 1);
        let tasks = &state.frameworks[0].tasks;
        assert_eq!(
            tasks.iter().map(|t| t.id.as_str()).collect::<Vec<_>>(),
            ["a.1", "c.1"]
        );
        let ports = &tasks[1].discovery.as_ref().unwrap().ports.ports;
        assert_eq!(ports.len(), 1);
        assert_eq!(ports[0].number, 70000);
    }

    #[test]
    fn test_state_from_json_ignores_unknown_fields() {
        let state = State::from_json(br#"{"leader": "m@1.2.3.4:5050", "version": "1.0"}"#).unwrap();
        assert_eq!(state.leader, "m@1.2.3.4:5050");
        assert!(state.frameworks.is_empty());
    }
}
