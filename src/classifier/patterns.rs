//! Embedded rule tables consulted by the OS and usage classifiers. Plain
//! substring/prefix matching, in the style of the rest of this crate's
//! pattern tables — no regex dependency.

use crate::model::{OsFamily, UsageCategory};

/// Hostname/OS-string substrings that identify an OS family, tried in
/// cascade order against the explicit OS string (confidence 90) and, on a
/// second pass, against the hostname (confidence 60).
pub const OS_FAMILY_PATTERNS: &[(OsFamily, &[&str])] = &[
    (OsFamily::Ios, &["iphone", "ipad", "ios "]),
    (OsFamily::Android, &["android"]),
    (OsFamily::MacOs, &["mac os", "macos", "os x", "darwin"]),
    (
        OsFamily::Windows,
        &["windows", "microsoft windows", "win32", "win64"],
    ),
    (
        OsFamily::Bsd,
        &["freebsd", "openbsd", "netbsd", "bsd"],
    ),
    (
        OsFamily::Linux,
        &["linux", "ubuntu", "debian", "fedora", "centos", "raspbian"],
    ),
    (
        OsFamily::Embedded,
        &["embedded", "rtos", "vxworks", "busybox"],
    ),
];

/// Hostname substrings used by the second cascade step (confidence 60).
/// Distinct from `OS_FAMILY_PATTERNS` because hostnames use different
/// shorthand than OS-detection strings (e.g. "macbook", "pc").
pub const HOSTNAME_OS_PATTERNS: &[(OsFamily, &[&str])] = &[
    (OsFamily::Ios, &["iphone", "ipad"]),
    (OsFamily::Android, &["android"]),
    (OsFamily::MacOs, &["macbook", "imac", "mac-mini", "mac"]),
    (OsFamily::Windows, &["windows", "win-", "-pc", "desktop-"]),
    (
        OsFamily::Linux,
        &["ubuntu", "debian", "linux", "raspberrypi", "raspbian"],
    ),
];

/// Manufacturer substrings (matched case-insensitively against the
/// resolved OUI vendor string) used by the fourth cascade step
/// (confidence 40).
pub const MANUFACTURER_OS_PATTERNS: &[(OsFamily, &[&str])] = &[
    (OsFamily::Ios, &["apple"]),
    (OsFamily::Linux, &["raspberry pi"]),
    (OsFamily::Windows, &["microsoft"]),
];

/// Anchors searched for (case-insensitively) when extracting an OS version
/// substring from an explicit OS string. The captured text is whatever
/// version-shaped token immediately follows the anchor.
pub const VERSION_ANCHORS: &[&str] = &[
    "windows server",
    "windows",
    "mac os x",
    "macos",
    "ios",
    "android",
    "ubuntu",
    "debian",
];

/// A single usage-category rule set: vendor substrings, hostname
/// substrings, indicator ports (each present port scores), and port
/// combinations that award a flat bonus when all members are present.
pub struct UsageRule {
    pub category: UsageCategory,
    pub vendor_patterns: &'static [&'static str],
    pub hostname_patterns: &'static [&'static str],
    pub service_type_patterns: &'static [&'static str],
    pub indicator_ports: &'static [u16],
    pub port_combo_bonuses: &'static [(&'static [u16], u8)],
    pub os_family_bonus: &'static [(OsFamily, u8)],
}

pub const USAGE_RULES: &[UsageRule] = &[
    UsageRule {
        category: UsageCategory::RouterGateway,
        vendor_patterns: &[
            "netgear", "tp-link", "linksys", "asus", "ubiquiti", "mikrotik", "d-link",
        ],
        hostname_patterns: &["router", "gateway", "gw-", "fritz", "openwrt", "pfsense"],
        service_type_patterns: &["urn:schemas-upnp-org:device:internetgatewaydevice"],
        indicator_ports: &[53, 67],
        port_combo_bonuses: &[(&[80, 443], 1)],
        os_family_bonus: &[],
    },
    UsageRule {
        category: UsageCategory::Switch,
        vendor_patterns: &["cisco", "netgear", "tp-link", "aruba"],
        hostname_patterns: &["switch", "sw-"],
        service_type_patterns: &[],
        indicator_ports: &[161],
        port_combo_bonuses: &[],
        os_family_bonus: &[],
    },
    UsageRule {
        category: UsageCategory::AccessPoint,
        vendor_patterns: &["ubiquiti", "aruba", "ruckus", "tp-link"],
        hostname_patterns: &["access-point", "unifi", "ap-"],
        service_type_patterns: &[],
        indicator_ports: &[161],
        port_combo_bonuses: &[],
        os_family_bonus: &[],
    },
    UsageRule {
        category: UsageCategory::Server,
        vendor_patterns: &["dell", "hewlett packard enterprise", "supermicro"],
        hostname_patterns: &["server", "srv-", "-srv"],
        service_type_patterns: &[],
        indicator_ports: &[22],
        port_combo_bonuses: &[(&[80, 443], 3), (&[3306, 5432], 2)],
        os_family_bonus: &[(OsFamily::Linux, 2)],
    },
    UsageRule {
        category: UsageCategory::Computer,
        vendor_patterns: &["dell", "hewlett-packard", "lenovo", "intel"],
        hostname_patterns: &["desktop", "workstation", "-pc"],
        service_type_patterns: &[],
        indicator_ports: &[],
        port_combo_bonuses: &[(&[3389, 445], 3)],
        os_family_bonus: &[(OsFamily::Windows, 4), (OsFamily::MacOs, 2)],
    },
    UsageRule {
        category: UsageCategory::Laptop,
        vendor_patterns: &["dell", "lenovo", "hewlett-packard", "apple"],
        hostname_patterns: &["macbook", "thinkpad", "laptop", "-xps"],
        service_type_patterns: &[],
        indicator_ports: &[],
        port_combo_bonuses: &[],
        os_family_bonus: &[],
    },
    UsageRule {
        category: UsageCategory::Mobile,
        vendor_patterns: &["apple", "samsung electronics", "google"],
        hostname_patterns: &["iphone", "ipad", "galaxy", "pixel"],
        service_type_patterns: &["_companion-link._tcp", "_apple-mobdev2._tcp"],
        indicator_ports: &[],
        port_combo_bonuses: &[],
        os_family_bonus: &[(OsFamily::Ios, 6), (OsFamily::Android, 6)],
    },
    UsageRule {
        category: UsageCategory::Iot,
        vendor_patterns: &["espressif", "tuya"],
        hostname_patterns: &["esp-", "esp32", "iot-", "sensor-"],
        service_type_patterns: &[],
        indicator_ports: &[8883],
        port_combo_bonuses: &[],
        os_family_bonus: &[(OsFamily::Embedded, 5)],
    },
    UsageRule {
        category: UsageCategory::SmartHome,
        vendor_patterns: &["philips", "sonos", "amazon technologies", "nest labs", "ecobee"],
        hostname_patterns: &["echo-", "alexa", "hue-bridge", "sonos-", "nest-", "smartthings"],
        service_type_patterns: &["_homekit._tcp", "_hap._tcp", "_smartthings._tcp"],
        indicator_ports: &[],
        port_combo_bonuses: &[],
        os_family_bonus: &[],
    },
    UsageRule {
        category: UsageCategory::Printer,
        vendor_patterns: &["hewlett-packard", "canon", "epson", "brother", "lexmark"],
        hostname_patterns: &["printer", "hp-laserjet", "canon-", "epson-", "brother-", "npi"],
        service_type_patterns: &["_ipp._tcp", "_pdl-datastream._tcp", "_printer._tcp"],
        indicator_ports: &[9100, 631, 515],
        port_combo_bonuses: &[],
        os_family_bonus: &[],
    },
    UsageRule {
        category: UsageCategory::TvMedia,
        vendor_patterns: &["samsung electronics", "lg electronics", "vizio", "roku", "sony", "tcl"],
        hostname_patterns: &["roku-", "chromecast", "appletv", "firetv", "samsung-tv", "the-frame"],
        service_type_patterns: &["_googlecast._tcp", "_airplay._tcp", "_raop._tcp", "_roku._tcp"],
        indicator_ports: &[8008, 8009, 7000, 7001, 8001, 8002, 3000, 3001, 6466, 6467],
        port_combo_bonuses: &[],
        os_family_bonus: &[],
    },
    UsageRule {
        category: UsageCategory::Gaming,
        vendor_patterns: &["sony interactive entertainment", "microsoft", "nintendo"],
        hostname_patterns: &["xbox", "playstation", "nintendo-switch", "steamdeck"],
        service_type_patterns: &[],
        indicator_ports: &[3074],
        port_combo_bonuses: &[],
        os_family_bonus: &[],
    },
    UsageRule {
        category: UsageCategory::Storage,
        vendor_patterns: &["synology", "qnap", "western digital", "seagate"],
        hostname_patterns: &["nas-", "synology", "qnap"],
        service_type_patterns: &["_afpovertcp._tcp", "_smb._tcp"],
        indicator_ports: &[2049, 548],
        port_combo_bonuses: &[],
        os_family_bonus: &[],
    },
    UsageRule {
        category: UsageCategory::Camera,
        vendor_patterns: &["hikvision", "dahua", "axis communications", "arlo", "reolink", "ring"],
        hostname_patterns: &["cam-", "camera", "doorbell", "ipcam"],
        service_type_patterns: &[],
        indicator_ports: &[554],
        port_combo_bonuses: &[],
        os_family_bonus: &[],
    },
];

/// Case-insensitive substring match.
pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rules_cover_every_usage_category() {
        let covered: std::collections::HashSet<_> =
            USAGE_RULES.iter().map(|r| r.category).collect();
        for category in [
            UsageCategory::RouterGateway,
            UsageCategory::Switch,
            UsageCategory::AccessPoint,
            UsageCategory::Server,
            UsageCategory::Computer,
            UsageCategory::Laptop,
            UsageCategory::Mobile,
            UsageCategory::Iot,
            UsageCategory::SmartHome,
            UsageCategory::Printer,
            UsageCategory::TvMedia,
            UsageCategory::Gaming,
            UsageCategory::Storage,
            UsageCategory::Camera,
        ] {
            assert!(covered.contains(&category), "missing rule for {category:?}");
        }
    }

    #[test]
    fn contains_ci_ignores_case() {
        assert!(contains_ci("Samsung Electronics", "samsung"));
        assert!(!contains_ci("Samsung Electronics", "vizio"));
    }
}
