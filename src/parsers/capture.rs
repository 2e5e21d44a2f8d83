//! Pure parser for tcpdump-style verbose (`-v -e`) text output. Classifies
//! each complete line as DHCPv4, DHCPv6, ICMPv6 neighbour discovery,
//! NetBIOS name service, or a generic IPv4/IPv6 frame, recovering whatever
//! MAC/IP/hostname fields the line carries. Partial lines (split across
//! reads) are buffered until a trailing newline arrives; nothing here ever
//! panics on malformed bytes.

use std::net::{Ipv4Addr, Ipv6Addr};

use crate::net::ipv6::{classify, Ipv6Kind};
use crate::net::mac::{is_broadcast_mac, is_multicast_mac, normalize_mac};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureKind {
    Dhcp4Request,
    Dhcp6Request,
    NdpNeighbor,
    NetBiosNameQuery,
    GenericFrame,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CaptureRecord {
    pub kind: Option<CaptureKind>,
    pub mac: Option<String>,
    pub ipv4: Option<String>,
    pub ipv6: Vec<String>,
    pub hostname: Option<String>,
    pub fqdn: Option<String>,
    pub vendor_class: Option<String>,
    pub dst_mac: Option<String>,
    pub dst_ipv4: Option<String>,
    pub dst_ipv6: Option<String>,
}

/// Line-buffering incremental parser. A driver reading a subprocess's
/// stdout in arbitrary-sized chunks feeds them to [`push_chunk`] and
/// drains complete records with [`drain`].
#[derive(Debug, Default)]
pub struct CaptureStream {
    partial: String,
    ready: Vec<CaptureRecord>,
}

impl CaptureStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends raw bytes (already UTF-8-lossy-decoded by the caller) and
    /// parses every complete line found so far.
    pub fn push_chunk(&mut self, chunk: &str) {
        self.partial.push_str(chunk);
        while let Some(idx) = self.partial.find('\n') {
            let line: String = self.partial.drain(..=idx).collect();
            if let Some(record) = parse_line(line.trim_end()) {
                self.ready.push(record);
            }
        }
    }

    /// Drains every record parsed so far, leaving any unterminated partial
    /// line buffered for the next chunk.
    pub fn drain(&mut self) -> Vec<CaptureRecord> {
        std::mem::take(&mut self.ready)
    }
}

pub fn parse_line(line: &str) -> Option<CaptureRecord> {
    if line.is_empty() {
        return None;
    }
    if line.contains("BOOTP/DHCP, Request") || line.contains("BOOTP/DHCP, Reply") {
        parse_dhcp4(line)
    } else if line.contains("dhcp6 request") || line.contains("dhcp6 reply") {
        parse_dhcp6(line)
    } else if line.contains("ICMP6, neighbor advertisement")
        || line.contains("ICMP6, neighbor solicitation")
    {
        parse_ndp(line)
    } else if line.contains("NBT UDP PACKET") {
        parse_netbios(line)
    } else if line.contains(", ethertype IPv4,") || line.contains(", ethertype IPv6,") {
        parse_generic_frame(line)
    } else {
        None
    }
}

/// `... BOOTP/DHCP, Request from aa:bb:cc:dd:ee:ff, length 300, option
/// (Hostname) "my-host", option (Vendor-Class) "MSFT 5.0", option
/// (Requested-IP) 192.168.1.50` (client request), or `... BOOTP/DHCP,
/// Reply, length 300, option (Client-MAC) aa:bb:cc:dd:ee:ff, option
/// (Your-IP) 192.168.1.50` (server reply carrying the assigned address).
fn parse_dhcp4(line: &str) -> Option<CaptureRecord> {
    let mac = extract_after(line, "Request from ")
        .or_else(|| extract_after(line, "(Client-MAC) "))
        .and_then(|s| {
            let token = s.split(|c: char| c == ',' || c.is_whitespace()).next()?;
            normalize_mac(token)
        });
    let hostname = extract_quoted_after(line, "(Hostname) ");
    let vendor_class = extract_quoted_after(line, "(Vendor-Class) ");
    let ipv4 = extract_token_after(line, "(Your-IP) ")
        .or_else(|| extract_token_after(line, "(Requested-IP) "))
        .filter(|s| s.parse::<Ipv4Addr>().is_ok());

    Some(CaptureRecord {
        kind: Some(CaptureKind::Dhcp4Request),
        mac,
        ipv4,
        hostname,
        vendor_class,
        ..Default::default()
    })
}

/// `... dhcp6 request ... option (Client-MAC) aa:bb:cc:dd:ee:ff, option
/// (FQDN) "host.example.com", option (IA-Address) 2001:db8::10, option
/// (IA-Address) fe80::1` — link-local addresses are filtered out, keeping
/// only globally or locally routable ones.
fn parse_dhcp6(line: &str) -> Option<CaptureRecord> {
    let mac = extract_after(line, "(Client-MAC) ").and_then(|s| {
        let token = s.split(|c: char| c == ',' || c.is_whitespace()).next()?;
        normalize_mac(token)
    });
    let fqdn = extract_quoted_after(line, "(FQDN) ");
    let ipv6 = extract_all_tokens_after(line, "(IA-Address) ")
        .into_iter()
        .filter(|addr| addr.parse::<Ipv6Addr>().is_ok())
        .filter(|addr| classify(addr) != Ipv6Kind::LinkLocal)
        .collect();

    Some(CaptureRecord {
        kind: Some(CaptureKind::Dhcp6Request),
        mac,
        fqdn,
        ipv6,
        ..Default::default()
    })
}

/// `IP6 fe80::1 > ff02::1: ICMP6, neighbor advertisement, tgt is
/// 2001:db8::1, length 32, option (Source-Link-Address) aa:bb:cc:dd:ee:ff`
/// — extracts the source address, the advertised/solicited target, and
/// the link-layer address option when present.
fn parse_ndp(line: &str) -> Option<CaptureRecord> {
    let src = line
        .strip_prefix("IP6 ")
        .and_then(|rest| rest.split_whitespace().next())
        .map(|s| s.to_string());

    let target = extract_token_after(line, "tgt is ")
        .or_else(|| extract_token_after(line, "who has "))
        .filter(|s| s.parse::<Ipv6Addr>().is_ok());
    let mac = extract_token_after(line, "(Source-Link-Address) ")
        .and_then(|s| normalize_mac(&s));

    let mut ipv6: Vec<String> = Vec::new();
    if let Some(src) = src {
        ipv6.push(src);
    }
    if let Some(target) = target {
        if !ipv6.contains(&target) {
            ipv6.push(target);
        }
    }

    Some(CaptureRecord {
        kind: Some(CaptureKind::NdpNeighbor),
        mac,
        ipv6,
        ..Default::default()
    })
}

/// `<src-mac> > <dst-mac>, ethertype IPv4, length 92: 192.168.1.20.137 >
/// 192.168.1.255.137: NBT UDP PACKET(137): QUERY; POSITIVE; NetBIOS Name:
/// DESKTOP-ABC` — extracts the computer name, the querying host's IPv4
/// address, and (when the `-e` ethernet header is present) its MAC, so the
/// learned hostname can be folded into the MAC-keyed side-table like a
/// DHCP-learnt one.
fn parse_netbios(line: &str) -> Option<CaptureRecord> {
    let hostname = extract_token_after(line, "NetBIOS Name: ")
        .map(|s| s.trim_end_matches(';').to_string());

    let mac_arrow = line.find(" > ");
    let ip_arrow = line.rfind(" > ");
    let mac = match (mac_arrow, ip_arrow) {
        (Some(m), Some(i)) if m != i => {
            line[..m].split_whitespace().last().and_then(normalize_mac)
        }
        _ => None,
    };
    let ipv4 = ip_arrow
        .and_then(|idx| line[..idx].split_whitespace().last())
        .map(strip_port)
        .filter(|s| s.parse::<Ipv4Addr>().is_ok());

    Some(CaptureRecord {
        kind: Some(CaptureKind::NetBiosNameQuery),
        mac,
        hostname,
        ipv4,
        ..Default::default()
    })
}

/// `<src-mac> > <dst-mac>, ethertype IPv4, length 60: <src-ip>.<port> >
/// <dst-ip>.<port>: UDP, length 18` (tcpdump `-e -v` framing). Yields (src
/// MAC, src IP, dst MAC, dst IP); the dst fields are suppressed when the
/// destination is broadcast or multicast, since that carries no
/// device-identifying signal.
fn parse_generic_frame(line: &str) -> Option<CaptureRecord> {
    let is_v6 = line.contains(", ethertype IPv6,");

    let mac_arrow = line.find(" > ")?;
    let ip_arrow = line.rfind(" > ")?;
    if mac_arrow == ip_arrow {
        return None;
    }

    let src_mac = line[..mac_arrow].split_whitespace().last()?;
    let after_mac_arrow = &line[mac_arrow + 3..];
    let dst_mac = after_mac_arrow.split(',').next()?.trim();

    let src_endpoint = line[..ip_arrow].split_whitespace().last()?;
    let after_ip_arrow = &line[ip_arrow + 3..];
    // Split on ": " (colon-space), not a bare colon, since an IPv6
    // endpoint's address portion is full of colons that aren't separators.
    let dst_endpoint = match after_ip_arrow.find(": ") {
        Some(idx) => &after_ip_arrow[..idx],
        None => after_ip_arrow.trim_end_matches(':'),
    };
    let dst_endpoint = dst_endpoint.trim();

    let src_mac = normalize_mac(src_mac)?;
    let dst_mac = normalize_mac(dst_mac);

    let src_addr = strip_port(src_endpoint);
    let dst_addr = strip_port(dst_endpoint);

    let mut record = CaptureRecord {
        kind: Some(CaptureKind::GenericFrame),
        mac: Some(src_mac),
        ..Default::default()
    };

    let dst_suppressed = dst_mac
        .as_deref()
        .is_some_and(|m| is_broadcast_mac(m) || is_multicast_mac(m))
        || is_suppressed_address(&dst_addr, is_v6);

    if is_v6 {
        if src_addr.parse::<Ipv6Addr>().is_err() {
            return None;
        }
        record.ipv6 = vec![src_addr];
        if !dst_suppressed && dst_addr.parse::<Ipv6Addr>().is_ok() {
            record.dst_ipv6 = Some(dst_addr);
        }
    } else {
        if src_addr.parse::<Ipv4Addr>().is_err() {
            return None;
        }
        record.ipv4 = Some(src_addr);
        if !dst_suppressed && dst_addr.parse::<Ipv4Addr>().is_ok() {
            record.dst_ipv4 = Some(dst_addr);
        }
    }

    if !dst_suppressed {
        record.dst_mac = dst_mac;
    }

    Some(record)
}

fn is_suppressed_address(addr: &str, is_v6: bool) -> bool {
    if is_v6 {
        addr.parse::<Ipv6Addr>()
            .is_ok_and(|a| classify(&a.to_string()) == Ipv6Kind::Multicast)
    } else {
        addr.parse::<Ipv4Addr>()
            .is_ok_and(|a| a.is_broadcast() || a.is_multicast())
    }
}

/// Strips a trailing `.<port>` from a tcpdump endpoint token (e.g.
/// `192.168.1.10.54321` → `192.168.1.10`, `fe80::1.5353` → `fe80::1`).
/// tcpdump always appends the port this way regardless of address family.
fn strip_port(endpoint: &str) -> String {
    match endpoint.rsplit_once('.') {
        Some((addr, port)) if !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()) => {
            addr.to_string()
        }
        _ => endpoint.to_string(),
    }
}

fn extract_after<'a>(line: &'a str, anchor: &str) -> Option<&'a str> {
    let idx = line.find(anchor)?;
    Some(&line[idx + anchor.len()..])
}

fn extract_quoted_after(line: &str, anchor: &str) -> Option<String> {
    let rest = extract_after(line, anchor)?;
    let rest = rest.strip_prefix('"')?;
    let end = rest.find('"')?;
    Some(rest[..end].to_string())
}

/// Extracts the single whitespace/comma-delimited token following `anchor`.
fn extract_token_after(line: &str, anchor: &str) -> Option<String> {
    let rest = extract_after(line, anchor)?;
    let token = rest.split(|c: char| c == ',' || c.is_whitespace()).next()?;
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Extracts every token following a (possibly repeated) `anchor` in the
/// line, in order of appearance.
fn extract_all_tokens_after(line: &str, anchor: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut rest = line;
    while let Some(idx) = rest.find(anchor) {
        rest = &rest[idx + anchor.len()..];
        let Some(token) = rest.split(|c: char| c == ',' || c.is_whitespace()).next() else {
            break;
        };
        if !token.is_empty() {
            tokens.push(token.to_string());
        }
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dhcp4_request_with_mac_hostname_vendor_and_requested_ip() {
        let line = r#"12:00:00.000000 IP 0.0.0.0.68 > 255.255.255.255.67: BOOTP/DHCP, Request from aa:bb:cc:dd:ee:ff, length 300, option (Hostname) "my-laptop", option (Vendor-Class) "MSFT 5.0", option (Requested-IP) 192.168.1.50"#;
        let record = parse_line(line).unwrap();
        assert_eq!(record.kind, Some(CaptureKind::Dhcp4Request));
        assert_eq!(record.mac.as_deref(), Some("AA:BB:CC:DD:EE:FF"));
        assert_eq!(record.hostname.as_deref(), Some("my-laptop"));
        assert_eq!(record.vendor_class.as_deref(), Some("MSFT 5.0"));
        assert_eq!(record.ipv4.as_deref(), Some("192.168.1.50"));
    }

    #[test]
    fn parses_dhcp4_reply_with_assigned_ip() {
        let line = "12:00:00.0 IP 192.168.1.1.67 > 192.168.1.50.68: BOOTP/DHCP, Reply, length 300, option (Client-MAC) aa:bb:cc:dd:ee:ff, option (Your-IP) 192.168.1.50";
        let record = parse_line(line).unwrap();
        assert_eq!(record.kind, Some(CaptureKind::Dhcp4Request));
        assert_eq!(record.mac.as_deref(), Some("AA:BB:CC:DD:EE:FF"));
        assert_eq!(record.ipv4.as_deref(), Some("192.168.1.50"));
    }

    #[test]
    fn parses_dhcp6_request_extracting_fqdn_and_non_link_local_addresses() {
        let line = r#"12:00:00.0 IP6 fe80::1.546 > ff02::1:2.547: dhcp6 request, option (Client-MAC) aa:bb:cc:dd:ee:ff, option (FQDN) "host.example.com", option (IA-Address) 2001:db8::10, option (IA-Address) fe80::1"#;
        let record = parse_line(line).unwrap();
        assert_eq!(record.kind, Some(CaptureKind::Dhcp6Request));
        assert_eq!(record.mac.as_deref(), Some("AA:BB:CC:DD:EE:FF"));
        assert_eq!(record.fqdn.as_deref(), Some("host.example.com"));
        assert_eq!(record.ipv6, vec!["2001:db8::10".to_string()]);
    }

    #[test]
    fn parses_ndp_neighbor_advertisement_source_target_and_mac() {
        let line = "12:00:00.0 IP6 fe80::1 > ff02::1: ICMP6, neighbor advertisement, tgt is 2001:db8::1, length 32, option (Source-Link-Address) aa:bb:cc:dd:ee:ff";
        let record = parse_line(line).unwrap();
        assert_eq!(record.kind, Some(CaptureKind::NdpNeighbor));
        assert_eq!(record.mac.as_deref(), Some("AA:BB:CC:DD:EE:FF"));
        assert!(record.ipv6.contains(&"fe80::1".to_string()));
        assert!(record.ipv6.contains(&"2001:db8::1".to_string()));
    }

    #[test]
    fn parses_ndp_neighbor_solicitation() {
        let line = "12:00:00.0 IP6 fe80::2 > ff02::1:ff00:1: ICMP6, neighbor solicitation, who has 2001:db8::1, length 32";
        let record = parse_line(line).unwrap();
        assert_eq!(record.kind, Some(CaptureKind::NdpNeighbor));
        assert!(record.ipv6.contains(&"fe80::2".to_string()));
        assert!(record.ipv6.contains(&"2001:db8::1".to_string()));
    }

    #[test]
    fn parses_netbios_name_query_extracting_computer_name_ip_and_mac() {
        let line = "12:00:00.0 aa:bb:cc:dd:ee:ff > ff:ff:ff:ff:ff:ff, ethertype IPv4, length 92: 192.168.1.20.137 > 192.168.1.255.137: NBT UDP PACKET(137): QUERY; POSITIVE; NetBIOS Name: DESKTOP-ABC;";
        let record = parse_line(line).unwrap();
        assert_eq!(record.kind, Some(CaptureKind::NetBiosNameQuery));
        assert_eq!(record.hostname.as_deref(), Some("DESKTOP-ABC"));
        assert_eq!(record.ipv4.as_deref(), Some("192.168.1.20"));
        assert_eq!(record.mac.as_deref(), Some("AA:BB:CC:DD:EE:FF"));
    }

    #[test]
    fn parses_generic_ipv4_frame_with_src_and_dst() {
        let line = "12:00:00.0 aa:bb:cc:dd:ee:ff > 11:22:33:44:55:66, ethertype IPv4, length 60: 192.168.1.10.54321 > 192.168.1.20.80: Flags [S], length 0";
        let record = parse_line(line).unwrap();
        assert_eq!(record.kind, Some(CaptureKind::GenericFrame));
        assert_eq!(record.mac.as_deref(), Some("AA:BB:CC:DD:EE:FF"));
        assert_eq!(record.ipv4.as_deref(), Some("192.168.1.10"));
        assert_eq!(record.dst_mac.as_deref(), Some("11:22:33:44:55:66"));
        assert_eq!(record.dst_ipv4.as_deref(), Some("192.168.1.20"));
    }

    #[test]
    fn generic_frame_suppresses_broadcast_destination() {
        let line = "12:00:00.0 aa:bb:cc:dd:ee:ff > ff:ff:ff:ff:ff:ff, ethertype IPv4, length 60: 192.168.1.10.68 > 255.255.255.255.67: UDP, length 18";
        let record = parse_line(line).unwrap();
        assert_eq!(record.mac.as_deref(), Some("AA:BB:CC:DD:EE:FF"));
        assert_eq!(record.ipv4.as_deref(), Some("192.168.1.10"));
        assert!(record.dst_mac.is_none());
        assert!(record.dst_ipv4.is_none());
    }

    #[test]
    fn generic_frame_suppresses_multicast_ipv6_destination() {
        let line = "12:00:00.0 aa:bb:cc:dd:ee:ff > 33:33:00:00:00:fb, ethertype IPv6, length 60: fe80::1.5353 > ff02::fb.5353: UDP, length 18";
        let record = parse_line(line).unwrap();
        assert_eq!(record.ipv6, vec!["fe80::1".to_string()]);
        assert!(record.dst_ipv6.is_none());
    }

    #[test]
    fn unrecognised_line_yields_no_record() {
        assert!(parse_line("some unrelated line of output").is_none());
    }

    #[test]
    fn stream_buffers_partial_lines_across_chunks() {
        let mut stream = CaptureStream::new();
        stream.push_chunk("12:00:00.0 IP6 fe80::1 > ff02::1: ICMP6, neighbor adverti");
        assert!(stream.drain().is_empty());
        stream.push_chunk("sement, tgt is 2001:db8::1, length 32\n");
        let records = stream.drain();
        assert_eq!(records.len(), 1);
        assert!(records[0].ipv6.contains(&"fe80::1".to_string()));
    }

    #[test]
    fn never_panics_on_empty_or_whitespace_chunks() {
        let mut stream = CaptureStream::new();
        stream.push_chunk("\n\n   \n");
        assert!(stream.drain().is_empty());
    }
}
