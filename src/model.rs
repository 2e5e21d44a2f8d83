//! The data model: Observations (immutable, per-source reports) and Device
//! Records (the canonical, merged entities the Correlator owns).

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::net::ipv6::Ipv6Kind;

/// Tags the source that produced an Observation or contributed to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Source {
    Arp,
    Ndp,
    PortScan,
    PacketCapture,
    Mdns,
    Ssdp,
    NetBios,
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Source::Arp => "arp",
            Source::Ndp => "ndp",
            Source::PortScan => "portscan",
            Source::PacketCapture => "capture",
            Source::Mdns => "mdns",
            Source::Ssdp => "ssdp",
            Source::NetBios => "netbios",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ipv6Address {
    pub address: String,
    pub kind: Ipv6Kind,
    pub scope_interface: Option<String>,
}

impl Ipv6Address {
    pub fn new(raw: &str) -> Self {
        let (stripped, zone) = crate::net::ipv6::strip_zone(raw);
        Self {
            address: stripped.to_string(),
            kind: crate::net::ipv6::classify(raw),
            scope_interface: zone.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Protocol {
    Tcp,
    Udp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub port: u16,
    pub protocol: Protocol,
    pub service_name: String,
    pub version: String,
}

/// A single, immutable report from one discovery source at one instant.
#[derive(Debug, Clone, Default)]
pub struct Observation {
    pub source: Option<Source>,
    pub timestamp: i64,
    pub mac: Option<String>,
    pub ipv4: Option<String>,
    pub ipv6: Vec<Ipv6Address>,
    pub hostname: Option<String>,
    pub fqdn: Option<String>,
    pub workgroup: Option<String>,
    pub manufacturer_hint: Option<String>,
    pub os_hint: Option<String>,
    pub ports: Vec<u16>,
    pub services: Vec<ServiceDescriptor>,
    pub service_types: Vec<String>,
}

impl Observation {
    pub fn new(source: Source, timestamp: i64) -> Self {
        Self {
            source: Some(source),
            timestamp,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OsFamily {
    Windows,
    MacOs,
    Ios,
    Android,
    Linux,
    Bsd,
    Embedded,
}

impl std::fmt::Display for OsFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OsFamily::Windows => "Windows",
            OsFamily::MacOs => "macOS",
            OsFamily::Ios => "iOS",
            OsFamily::Android => "Android",
            OsFamily::Linux => "Linux",
            OsFamily::Bsd => "BSD",
            OsFamily::Embedded => "Embedded",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UsageCategory {
    RouterGateway,
    Switch,
    AccessPoint,
    Server,
    Computer,
    Laptop,
    Mobile,
    Iot,
    SmartHome,
    Printer,
    TvMedia,
    Gaming,
    Storage,
    Camera,
}

impl std::fmt::Display for UsageCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            UsageCategory::RouterGateway => "Router/Gateway",
            UsageCategory::Switch => "Switch",
            UsageCategory::AccessPoint => "Access Point",
            UsageCategory::Server => "Server",
            UsageCategory::Computer => "Computer/Workstation",
            UsageCategory::Laptop => "Laptop",
            UsageCategory::Mobile => "Mobile",
            UsageCategory::Iot => "IoT",
            UsageCategory::SmartHome => "Smart Home",
            UsageCategory::Printer => "Printer/Scanner",
            UsageCategory::TvMedia => "TV/Media",
            UsageCategory::Gaming => "Gaming",
            UsageCategory::Storage => "Storage/NAS",
            UsageCategory::Camera => "Camera",
        };
        write!(f, "{s}")
    }
}

/// A stable handle into the Correlator's arena. Opaque outside this crate;
/// never reused once a record is absorbed by another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceHandle(pub usize);

/// The canonical, merged entity maintained by the Correlator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub mac: Option<String>,
    pub ipv4: Option<String>,
    pub ipv6: Vec<Ipv6Address>,
    pub hostname: Option<String>,
    pub fqdn: Option<String>,
    pub workgroup: Option<String>,
    pub manufacturer: Option<String>,
    /// Raw OS string as reported by a driver (e.g. an nmap `OS details:`
    /// line), kept separately from the derived `os_family`/`os_version` so
    /// the classifier can re-run its cascade against the original text.
    pub os_hint: Option<String>,
    pub os_family: Option<OsFamily>,
    pub os_version: Option<String>,
    pub model: Option<String>,
    pub usage: Option<UsageCategory>,
    pub ports: BTreeSet<u16>,
    pub services: Vec<ServiceDescriptor>,
    /// Raw service-type tags contributed by mDNS/SSDP observations (e.g.
    /// `_ipp._tcp`, `urn:schemas-upnp-org:device:MediaRenderer:1`). Kept
    /// alongside `services` because these tags carry usage-classification
    /// signal that no port number captures.
    pub service_type_tags: HashSet<String>,
    pub sources: HashSet<Source>,
    pub discovered_via: HashSet<Source>,
    pub first_seen: i64,
    pub last_seen: i64,
    pub confidence: u8,
}

impl DeviceRecord {
    /// True when at least one stitching identifier is present; a record
    /// failing this must never be stored.
    pub fn has_identifier(&self) -> bool {
        self.mac.is_some() || self.ipv4.is_some() || !self.ipv6.is_empty()
    }

    pub fn is_dual_stack(&self) -> bool {
        self.ipv4.is_some() && !self.ipv6.is_empty()
    }
}
