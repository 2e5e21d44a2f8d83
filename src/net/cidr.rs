//! CIDR arithmetic over IPv4 `/N` networks.

use std::net::Ipv4Addr;

/// A parsed `A.B.C.D/N` network, `0 <= N <= 32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cidr {
    pub address: Ipv4Addr,
    pub prefix: u8,
}

impl Cidr {
    pub fn parse(s: &str) -> Option<Cidr> {
        let (addr, prefix) = s.split_once('/')?;
        let address: Ipv4Addr = addr.parse().ok()?;
        let prefix: u8 = prefix.parse().ok()?;
        if prefix > 32 {
            return None;
        }
        Some(Cidr { address, prefix })
    }

    fn mask(&self) -> u32 {
        if self.prefix == 0 {
            0
        } else {
            u32::MAX << (32 - self.prefix)
        }
    }

    pub fn network(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(self.address) & self.mask())
    }

    pub fn broadcast(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(self.address) | !self.mask())
    }

    /// Number of usable host addresses, clamped to 0 for /31 and /32.
    pub fn host_count(&self) -> u32 {
        if self.prefix >= 31 {
            0
        } else {
            (1u32 << (32 - self.prefix)) - 2
        }
    }

    pub fn first_host(&self) -> Option<Ipv4Addr> {
        if self.host_count() == 0 {
            return None;
        }
        Some(Ipv4Addr::from(u32::from(self.network()) + 1))
    }

    pub fn last_host(&self) -> Option<Ipv4Addr> {
        if self.host_count() == 0 {
            return None;
        }
        Some(Ipv4Addr::from(u32::from(self.broadcast()) - 1))
    }

    /// Every host address in the network, in ascending order. Empty for
    /// /31 and /32.
    pub fn hosts(&self) -> impl Iterator<Item = Ipv4Addr> + use<> {
        let (start, count) = match self.first_host() {
            Some(first) => (u32::from(first), self.host_count()),
            None => (0, 0),
        };
        (0..count).map(move |i| Ipv4Addr::from(start + i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn computes_network_and_broadcast() {
        let cidr = Cidr::parse("192.168.1.130/24").unwrap();
        assert_eq!(cidr.network(), "192.168.1.0".parse::<Ipv4Addr>().unwrap());
        assert_eq!(
            cidr.broadcast(),
            "192.168.1.255".parse::<Ipv4Addr>().unwrap()
        );
    }

    #[test]
    fn host_count_clamped_for_31_and_32() {
        assert_eq!(Cidr::parse("10.0.0.0/31").unwrap().host_count(), 0);
        assert_eq!(Cidr::parse("10.0.0.0/32").unwrap().host_count(), 0);
    }

    #[test]
    fn first_last_host_consistent_with_count() {
        let cidr = Cidr::parse("10.0.0.0/29").unwrap();
        let first = u32::from(cidr.first_host().unwrap());
        let last = u32::from(cidr.last_host().unwrap());
        assert_eq!(first + cidr.host_count() - 1, last);
    }

    #[test]
    fn rejects_invalid_prefix() {
        assert!(Cidr::parse("10.0.0.0/33").is_none());
        assert!(Cidr::parse("not-an-ip/24").is_none());
    }

    #[test]
    fn network_low_bits_are_zero() {
        let cidr = Cidr::parse("10.1.2.200/22").unwrap();
        let net = u32::from(cidr.network());
        assert_eq!(net & ((1u32 << (32 - 22)) - 1), 0);
    }

    proptest::proptest! {
        /// Re-deriving the network address from itself is a no-op: the
        /// network address is already the fixed point of the mask.
        #[test]
        fn network_address_is_idempotent(addr in proptest::prelude::any::<u32>(), prefix in 0u8..=32) {
            let cidr = Cidr { address: Ipv4Addr::from(addr), prefix };
            let network_cidr = Cidr { address: cidr.network(), prefix };
            proptest::prop_assert_eq!(cidr.network(), network_cidr.network());
        }

        /// The network and broadcast addresses always bound every host
        /// address this network can produce.
        #[test]
        fn hosts_fall_within_network_and_broadcast(addr in proptest::prelude::any::<u32>(), prefix in 0u8..=30) {
            let cidr = Cidr { address: Ipv4Addr::from(addr), prefix };
            let network = u32::from(cidr.network());
            let broadcast = u32::from(cidr.broadcast());
            for host in cidr.hosts() {
                let host = u32::from(host);
                proptest::prop_assert!(host > network && host < broadcast);
            }
        }

        /// Formatting a CIDR back out and reparsing it yields the same
        /// network/prefix pair, independent of which host bits were set.
        #[test]
        fn parse_format_round_trips_network_and_prefix(addr in proptest::prelude::any::<u32>(), prefix in 0u8..=32) {
            let cidr = Cidr { address: Ipv4Addr::from(addr), prefix };
            let text = format!("{}/{}", cidr.address, cidr.prefix);
            let reparsed = Cidr::parse(&text).unwrap();
            proptest::prop_assert_eq!(cidr.network(), reparsed.network());
            proptest::prop_assert_eq!(cidr.prefix, reparsed.prefix);
        }
    }
}
