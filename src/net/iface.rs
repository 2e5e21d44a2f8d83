//! Network interface enumeration and primary-interface selection.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use pnet::datalink;

use super::cidr::Cidr;
use super::ipv6::Ipv6Kind;

#[derive(Debug, Clone)]
pub struct Interface {
    pub name: String,
    pub ipv4: Option<Cidr>,
    pub ipv6: Vec<Ipv6Addr>,
}

fn is_rfc1918(ip: Ipv4Addr) -> bool {
    let o = ip.octets();
    o[0] == 10
        || (o[0] == 172 && (16..=31).contains(&o[1]))
        || (o[0] == 192 && o[1] == 168)
}

/// Enumerate non-loopback interfaces, each with its (first) IPv4+CIDR and
/// its non-multicast, non-loopback IPv6 addresses.
pub fn enumerate() -> Vec<Interface> {
    datalink::interfaces()
        .into_iter()
        .filter(|iface| iface.is_up() && !iface.is_loopback())
        .map(|iface| {
            let mut ipv4 = None;
            let mut ipv6 = Vec::new();
            for ip_network in &iface.ips {
                match ip_network.ip() {
                    IpAddr::V4(addr) if ipv4.is_none() => {
                        ipv4 = Cidr::parse(&format!("{}/{}", addr, ip_network.prefix()));
                    }
                    IpAddr::V6(addr) => {
                        let kind = super::ipv6::classify(&addr.to_string());
                        if !matches!(kind, Ipv6Kind::Multicast | Ipv6Kind::Loopback) {
                            ipv6.push(addr);
                        }
                    }
                    _ => {}
                }
            }
            Interface {
                name: iface.name.clone(),
                ipv4,
                ipv6,
            }
        })
        .collect()
}

/// Select the primary interface: prefers one whose IPv4 falls in an RFC1918
/// range; ties broken by enumeration order.
pub fn select_primary(interfaces: &[Interface]) -> Option<&Interface> {
    interfaces
        .iter()
        .find(|iface| iface.ipv4.is_some_and(|c| is_rfc1918(c.address)))
        .or_else(|| interfaces.iter().find(|iface| iface.ipv4.is_some()))
        .or_else(|| interfaces.first())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_rfc1918_ranges() {
        assert!(is_rfc1918("10.0.0.1".parse().unwrap()));
        assert!(is_rfc1918("172.16.0.1".parse().unwrap()));
        assert!(is_rfc1918("192.168.1.1".parse().unwrap()));
        assert!(!is_rfc1918("8.8.8.8".parse().unwrap()));
        assert!(!is_rfc1918("172.32.0.1".parse().unwrap()));
    }

    #[test]
    fn selects_first_rfc1918_interface() {
        let interfaces = vec![
            Interface {
                name: "eth0".into(),
                ipv4: Cidr::parse("8.8.8.8/24"),
                ipv6: vec![],
            },
            Interface {
                name: "eth1".into(),
                ipv4: Cidr::parse("192.168.1.5/24"),
                ipv6: vec![],
            },
        ];
        let primary = select_primary(&interfaces).unwrap();
        assert_eq!(primary.name, "eth1");
    }

    #[test]
    fn enumerate_does_not_panic() {
        // Environment-dependent; just assert it runs to completion.
        let _ = enumerate();
    }
}
