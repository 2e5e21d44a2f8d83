//! The configuration surface this crate defines. Populated by an external
//! CLI/config-file layer (out of scope here); this crate only deserialises
//! and consumes it.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::model::Source;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanLevel {
    Quick,
    Standard,
    Thorough,
}

impl ScanLevel {
    /// Parse a level name, recognising the "fast" alias for `quick`.
    pub fn parse(name: &str) -> Option<ScanLevel> {
        match name.to_ascii_lowercase().as_str() {
            "quick" | "fast" => Some(ScanLevel::Quick),
            "standard" => Some(ScanLevel::Standard),
            "thorough" => Some(ScanLevel::Thorough),
            _ => None,
        }
    }

    pub fn ports(&self) -> &'static [u16] {
        match self {
            ScanLevel::Quick => &[22, 80, 443],
            ScanLevel::Standard => &[
                21, 22, 23, 25, 53, 80, 110, 139, 143, 443, 445, 587, 993, 995, 3306, 3389, 5432,
                5900, 8080, 8443,
            ],
            ScanLevel::Thorough => crate::drivers::portscan::TOP_1000_PORTS,
        }
    }

    pub fn host_timeout_secs(&self) -> u64 {
        match self {
            ScanLevel::Quick => 10,
            ScanLevel::Standard => 30,
            ScanLevel::Thorough => 90,
        }
    }

    pub fn phase_deadline_secs(&self) -> u64 {
        match self {
            ScanLevel::Quick => 5,
            ScanLevel::Standard => 30,
            ScanLevel::Thorough => 90,
        }
    }

    pub fn os_detection(&self) -> bool {
        !matches!(self, ScanLevel::Quick)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    pub target_cidr: Option<String>,
    pub interface: Option<String>,
    pub passive_only: bool,
    pub watch: bool,
    pub scan_level: ScanLevel,
    pub per_host_timeout_secs: Option<u64>,
    pub ipv6_enabled: bool,
    pub enabled_sources: HashSet<Source>,
    pub concurrent_host_scans: usize,
    pub session_timeout_secs: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        let mut enabled = HashSet::new();
        enabled.insert(Source::Arp);
        enabled.insert(Source::Ndp);
        enabled.insert(Source::Mdns);
        enabled.insert(Source::Ssdp);
        enabled.insert(Source::NetBios);
        enabled.insert(Source::PacketCapture);
        enabled.insert(Source::PortScan);

        Self {
            target_cidr: None,
            interface: None,
            passive_only: false,
            watch: false,
            scan_level: ScanLevel::Standard,
            per_host_timeout_secs: None,
            ipv6_enabled: true,
            enabled_sources: enabled,
            concurrent_host_scans: 15,
            session_timeout_secs: 120,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fast_as_quick_alias() {
        assert_eq!(ScanLevel::parse("fast"), Some(ScanLevel::Quick));
        assert_eq!(ScanLevel::parse("QUICK"), Some(ScanLevel::Quick));
    }

    #[test]
    fn rejects_unknown_level() {
        assert_eq!(ScanLevel::parse("ludicrous"), None);
    }

    #[test]
    fn default_config_enables_all_non_invasive_sources() {
        let cfg = ScanConfig::default();
        assert!(cfg.enabled_sources.contains(&Source::Arp));
        assert!(cfg.enabled_sources.contains(&Source::Ssdp));
        assert!(!cfg.passive_only);
    }

    #[test]
    fn quick_level_skips_os_detection() {
        assert!(!ScanLevel::Quick.os_detection());
        assert!(ScanLevel::Standard.os_detection());
    }
}
