//! MAC → vendor lookup over the embedded OUI table, with a per-session
//! full-MAC cache to amortise repeated resolutions.

use std::collections::HashMap;
use std::sync::RwLock;

use super::table::OUI_TABLE;
use crate::net::mac::{is_locally_administered, is_multicast_mac, normalize_mac, oui_prefix};

pub struct OuiResolver {
    cache: RwLock<HashMap<String, Option<&'static str>>>,
}

impl Default for OuiResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl OuiResolver {
    pub fn new() -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve a MAC address (any accepted input form) to a vendor string.
    /// Pure given the embedded table: same input always yields the same
    /// output, independent of call order.
    pub fn resolve(&self, mac: &str) -> Option<&'static str> {
        let normalized = normalize_mac(mac)?;

        if let Some(hit) = self.cache.read().unwrap().get(&normalized) {
            return *hit;
        }

        let prefix = oui_prefix(&normalized)?;
        let vendor = OUI_TABLE
            .iter()
            .find(|(p, _)| *p == prefix)
            .map(|(_, vendor)| *vendor);

        self.cache.write().unwrap().insert(normalized, vendor);
        vendor
    }

    pub fn is_locally_administered(mac: &str) -> bool {
        normalize_mac(mac).is_some_and(|m| is_locally_administered(&m))
    }

    pub fn is_multicast(mac: &str) -> bool {
        normalize_mac(mac).is_some_and(|m| is_multicast_mac(&m))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_prefix() {
        let resolver = OuiResolver::new();
        assert_eq!(resolver.resolve("00:1A:11:AA:BB:CC"), Some("Google"));
    }

    #[test]
    fn resolves_regardless_of_input_form() {
        let resolver = OuiResolver::new();
        assert_eq!(resolver.resolve("001A11AABBCC"), Some("Google"));
        assert_eq!(resolver.resolve("00-1a-11-aa-bb-cc"), Some("Google"));
    }

    #[test]
    fn unknown_prefix_resolves_to_none() {
        let resolver = OuiResolver::new();
        assert_eq!(resolver.resolve("FF:FF:00:00:00:01"), None);
    }

    #[test]
    fn malformed_mac_resolves_to_none() {
        let resolver = OuiResolver::new();
        assert_eq!(resolver.resolve("not-a-mac"), None);
    }

    #[test]
    fn lookup_is_deterministic_across_repeated_calls() {
        let resolver = OuiResolver::new();
        let first = resolver.resolve("B8:27:EB:11:22:33");
        let second = resolver.resolve("B8:27:EB:11:22:33");
        assert_eq!(first, second);
        assert_eq!(first, Some("Raspberry Pi Foundation"));
    }

    #[test]
    fn flags_locally_administered_and_multicast() {
        assert!(OuiResolver::is_locally_administered("02:00:00:00:00:00"));
        assert!(OuiResolver::is_multicast("01:00:5E:00:00:01"));
        assert!(!OuiResolver::is_locally_administered("00:1A:11:AA:BB:CC"));
    }

    proptest::proptest! {
        /// Resolution is a pure function of the address bytes: two
        /// resolvers, or the same resolver called twice, always agree.
        #[test]
        fn resolution_is_deterministic_for_any_address(bytes in proptest::prelude::any::<[u8; 6]>()) {
            let mac = format!(
                "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
                bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5]
            );
            let resolver = OuiResolver::new();
            let first = resolver.resolve(&mac);
            let second = resolver.resolve(&mac);
            proptest::prop_assert_eq!(first, second);

            let other_resolver = OuiResolver::new();
            proptest::prop_assert_eq!(first, other_resolver.resolve(&mac));
        }
    }
}
