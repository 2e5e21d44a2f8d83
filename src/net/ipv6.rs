//! IPv6 address classification, zone-id stripping, and EUI-64 MAC recovery.

use std::net::Ipv6Addr;

use super::mac::normalize_mac;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Ipv6Kind {
    LinkLocal,
    UniqueLocal,
    Global,
    Multicast,
    Loopback,
    Unknown,
}

/// Strip a `%zone` suffix, returning (address, zone).
pub fn strip_zone(addr: &str) -> (&str, Option<&str>) {
    match addr.split_once('%') {
        Some((a, zone)) => (a, Some(zone)),
        None => (addr, None),
    }
}

/// Classify a textual IPv6 address (zone already stripped, or not — this
/// strips it itself) by its leading bits.
pub fn classify(addr: &str) -> Ipv6Kind {
    let (stripped, _) = strip_zone(addr);
    let Ok(parsed) = stripped.parse::<Ipv6Addr>() else {
        return Ipv6Kind::Unknown;
    };
    if parsed.is_loopback() {
        return Ipv6Kind::Loopback;
    }
    let segments = parsed.segments();
    let first = segments[0];
    if first & 0xff00 == 0xff00 {
        Ipv6Kind::Multicast
    } else if first & 0xffc0 == 0xfe80 {
        Ipv6Kind::LinkLocal
    } else if first & 0xfe00 == 0xfc00 {
        Ipv6Kind::UniqueLocal
    } else if (0x2000..=0x3fff).contains(&first) {
        Ipv6Kind::Global
    } else {
        Ipv6Kind::Unknown
    }
}

/// Two textual addresses are the same IPv6 entry once zone identifiers are
/// stripped and both parse to the same address.
pub fn same_address(a: &str, b: &str) -> bool {
    let (a, _) = strip_zone(a);
    let (b, _) = strip_zone(b);
    match (a.parse::<Ipv6Addr>(), b.parse::<Ipv6Addr>()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Recover the original 48-bit MAC from a modified-EUI-64 interface
/// identifier, if the address's low 64 bits carry the `ff:fe` marker.
pub fn extract_mac_from_eui64(addr: &str) -> Option<String> {
    let (stripped, _) = strip_zone(addr);
    let parsed: Ipv6Addr = stripped.parse().ok()?;
    let segs = parsed.segments();
    // Low 64 bits: segs[4..8]. Marker ff:fe sits in the middle.
    if segs[5] & 0x00ff != 0x00ff || segs[6] & 0xff00 != 0xfe00 {
        return None;
    }
    let b = [
        (segs[4] >> 8) as u8,
        (segs[4] & 0xff) as u8,
        (segs[5] >> 8) as u8,
        (segs[6] & 0xff) as u8,
        (segs[7] >> 8) as u8,
        (segs[7] & 0xff) as u8,
    ];
    // Universal/local bit was flipped when the EUI-64 was derived; flip back.
    let first = b[0] ^ 0x02;
    let mac = format!(
        "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
        first, b[1], b[2], b[3], b[4], b[5]
    );
    normalize_mac(&mac)
}
