//! Pure parser for the platform neighbour-table tools (`ip neigh show`,
//! `arp -a`, `ndp -an`). Total and never panics: a malformed or partial
//! line is simply skipped, never an error.

use crate::net::mac::normalize_mac;

/// One parsed neighbour-table row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighbourEntry {
    pub ip: String,
    pub mac: String,
    pub interface: Option<String>,
    pub reachable: bool,
}

/// Parses the full stdout of a neighbour-table tool, returning every row
/// that yielded a usable IP and MAC. Accepts both Linux `ip neigh` style
/// (`10.0.0.1 dev eth0 lladdr aa:bb:cc:dd:ee:ff REACHABLE`) and classic
/// `arp -a` style (`? (10.0.0.1) at aa:bb:cc:dd:ee:ff [ether] on eth0`).
pub fn parse(output: &str) -> Vec<NeighbourEntry> {
    output.lines().filter_map(parse_line).collect()
}

fn parse_line(line: &str) -> Option<NeighbourEntry> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if line.starts_with('?') || line.contains(" at ") {
        parse_arp_style(line)
    } else {
        parse_ip_neigh_style(line)
    }
}

/// `ip neigh` / `ndp -an` style: first whitespace-separated token is the
/// address, followed by `dev <iface>`, `lladdr <mac>`, and a bare
/// reachability-state keyword in uppercase.
fn parse_ip_neigh_style(line: &str) -> Option<NeighbourEntry> {
    let mut tokens = line.split_whitespace();
    let ip = tokens.next()?.trim_end_matches('%').to_string();
    if ip.is_empty() {
        return None;
    }

    let mut interface = None;
    let mut mac = None;
    let mut reachable = false;

    let rest: Vec<&str> = tokens.collect();
    let mut i = 0;
    while i < rest.len() {
        match rest[i] {
            "dev" => {
                interface = rest.get(i + 1).map(|s| s.to_string());
                i += 2;
            }
            "lladdr" => {
                mac = rest.get(i + 1).and_then(|s| normalize_mac(s));
                i += 2;
            }
            "REACHABLE" | "STALE" | "DELAY" | "PERMANENT" | "NOARP" => {
                reachable = matches!(rest[i], "REACHABLE" | "PERMANENT" | "NOARP" | "STALE");
                i += 1;
            }
            "FAILED" | "INCOMPLETE" => {
                reachable = false;
                i += 1;
            }
            _ => i += 1,
        }
    }

    let mac = mac?;
    Some(NeighbourEntry {
        ip,
        mac,
        interface,
        reachable,
    })
}

/// `arp -a` style: `hostname (ip) at mac [ether] on iface`.
fn parse_arp_style(line: &str) -> Option<NeighbourEntry> {
    let open = line.find('(')?;
    let close = line[open..].find(')')? + open;
    let ip = line[open + 1..close].to_string();
    if ip.is_empty() {
        return None;
    }

    let after = &line[close + 1..];
    let at_idx = after.find(" at ")?;
    let after_at = after[at_idx + 4..].trim_start();
    let mac_token = after_at.split_whitespace().next()?;
    if mac_token.eq_ignore_ascii_case("incomplete") {
        return None;
    }
    let mac = normalize_mac(mac_token)?;

    let interface = after_at
        .split_whitespace()
        .collect::<Vec<_>>()
        .windows(2)
        .find(|w| w[0] == "on")
        .map(|w| w[1].to_string());

    Some(NeighbourEntry {
        ip,
        mac,
        interface,
        reachable: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_linux_ip_neigh_reachable_entry() {
        let out = "10.0.0.1 dev eth0 lladdr aa:bb:cc:dd:ee:ff REACHABLE\n";
        let entries = parse(out);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].ip, "10.0.0.1");
        assert_eq!(entries[0].mac, "AA:BB:CC:DD:EE:FF");
        assert_eq!(entries[0].interface.as_deref(), Some("eth0"));
        assert!(entries[0].reachable);
    }

    #[test]
    fn parses_ipv6_ndp_entry_with_zone_suffix() {
        let out = "fe80::1%eth0 dev eth0 lladdr 00:11:22:33:44:55 STALE\n";
        let entries = parse(out);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].ip, "fe80::1");
    }

    #[test]
    fn parses_classic_arp_a_style() {
        let out = "? (192.168.1.1) at b8:27:eb:11:22:33 [ether] on eth0\n";
        let entries = parse(out);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].mac, "B8:27:EB:11:22:33");
        assert_eq!(entries[0].interface.as_deref(), Some("eth0"));
    }

    #[test]
    fn skips_incomplete_arp_entries() {
        let out = "? (192.168.1.2) at <incomplete> on eth0\n";
        assert!(parse(out).is_empty());
    }

    #[test]
    fn skips_failed_neighbour_state_without_panicking() {
        let out = "10.0.0.5 dev eth0 FAILED\n";
        assert!(parse(out).is_empty());
    }

    #[test]
    fn ignores_blank_and_garbage_lines() {
        let out = "\n   \nnot a neighbour line at all\n";
        assert!(parse(out).is_empty());
    }

    #[test]
    fn never_panics_on_arbitrary_bytes_reinterpreted_as_utf8_lossy() {
        let raw: &[u8] = &[0xff, 0xfe, b'\n', b'(', b')'];
        let text = String::from_utf8_lossy(raw);
        let _ = parse(&text);
    }
}
