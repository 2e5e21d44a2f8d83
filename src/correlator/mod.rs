//! The Correlator: single-owner device store. Ingests Observations from
//! every Source Driver and maintains the canonical set of Device Records,
//! keyed by MAC, IPv4, and IPv6 address with MAC > IPv4 > IPv6 survivor
//! priority whenever two records turn out to describe the same device.

pub mod arena;

use std::collections::HashMap;

use crate::classifier;
use crate::model::{DeviceHandle, DeviceRecord, Observation, Protocol, ServiceDescriptor};
use crate::oui::OuiResolver;
use arena::Arena;

#[derive(Default)]
pub struct Correlator {
    arena: Arena,
    by_mac: HashMap<String, DeviceHandle>,
    by_ipv4: HashMap<String, DeviceHandle>,
    by_ipv6: HashMap<String, DeviceHandle>,
    /// Session-lifetime MAC-vendor cache; one resolver per Correlator so
    /// repeated lookups across merges are amortised.
    oui: OuiResolver,
}

/// Priority used both for initial keying and for deciding which of two
/// unified records survives a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum KeyPriority {
    Ipv6,
    Ipv4,
    Mac,
}

impl Correlator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingests one Observation, creating, updating, or unifying records as
    /// needed. Returns the handle of the record that absorbed it plus
    /// whether the record was newly created (vs. updated/merged), or `None`
    /// if the Observation carries no identifier at all (MAC, IPv4, or
    /// IPv6) and therefore cannot stitch to, or start, any record.
    pub fn on_observation(&mut self, obs: Observation) -> Option<(DeviceHandle, bool)> {
        let candidate_handles = self.lookup_candidates(&obs);

        let handle = match candidate_handles.first() {
            Some(&handle) => {
                let handle = self.unify_remaining(handle, &candidate_handles[1..]);
                self.merge_into(handle, &obs);
                handle
            }
            None => {
                if obs.mac.is_none() && obs.ipv4.is_none() && obs.ipv6.is_empty() {
                    return None;
                }
                self.create_record(&obs)
            }
        };

        self.reindex(handle);
        if let Some(record) = self.arena.get_mut(handle) {
            classifier::enrich(record, &self.oui);
        }

        let created = candidate_handles.is_empty();
        Some((handle, created))
    }

    /// Finds every existing handle touched by this Observation's
    /// identifiers, most-preferred first (MAC, then IPv4, then each IPv6).
    fn lookup_candidates(&self, obs: &Observation) -> Vec<DeviceHandle> {
        let mut handles = Vec::new();
        if let Some(mac) = &obs.mac {
            if let Some(&h) = self.by_mac.get(mac) {
                handles.push(h);
            }
        }
        if let Some(ipv4) = &obs.ipv4 {
            if let Some(&h) = self.by_ipv4.get(ipv4) {
                if !handles.contains(&h) {
                    handles.push(h);
                }
            }
        }
        for ipv6 in &obs.ipv6 {
            if let Some(&h) = self.by_ipv6.get(&ipv6.address) {
                if !handles.contains(&h) {
                    handles.push(h);
                }
            }
        }
        handles
    }

    fn create_record(&mut self, obs: &Observation) -> DeviceHandle {
        let mut record = DeviceRecord {
            first_seen: obs.timestamp,
            last_seen: obs.timestamp,
            ..Default::default()
        };
        apply_observation(&mut record, obs);
        self.arena.insert(record)
    }

    fn merge_into(&mut self, handle: DeviceHandle, obs: &Observation) {
        if let Some(record) = self.arena.get_mut(handle) {
            apply_observation(record, obs);
        }
    }

    /// Collapses every handle in `others` into `primary` (or into whichever
    /// survives a prior collapse), choosing the actual survivor by
    /// identifier priority at each step, and rewrites every index entry
    /// that pointed at an absorbed handle. Returns the handle that survives
    /// after all of `others` have been folded in — callers must operate on
    /// this returned handle, not on `primary`, since `primary` itself may
    /// be the one retired.
    fn unify_remaining(&mut self, primary: DeviceHandle, others: &[DeviceHandle]) -> DeviceHandle {
        let mut survivor = primary;
        for &other in others {
            if other == survivor {
                continue;
            }
            survivor = self.unify_pair(survivor, other);
        }
        survivor
    }

    fn unify_pair(&mut self, a: DeviceHandle, b: DeviceHandle) -> DeviceHandle {
        let (survivor, absorbed) = match (self.arena.get(a), self.arena.get(b)) {
            (Some(ra), Some(rb)) => {
                if priority(rb) > priority(ra) {
                    (b, a)
                } else {
                    (a, b)
                }
            }
            _ => return a,
        };

        if let Some(absorbed_record) = self.arena.retire(absorbed) {
            if let Some(survivor_record) = self.arena.get_mut(survivor) {
                merge_records(survivor_record, &absorbed_record);
            }
            self.rewrite_index(absorbed, survivor);
        }
        survivor
    }

    fn rewrite_index(&mut self, from: DeviceHandle, to: DeviceHandle) {
        for h in self.by_mac.values_mut() {
            if *h == from {
                *h = to;
            }
        }
        for h in self.by_ipv4.values_mut() {
            if *h == from {
                *h = to;
            }
        }
        for h in self.by_ipv6.values_mut() {
            if *h == from {
                *h = to;
            }
        }
    }

    /// Ensures every identifier currently on the record at `handle` points
    /// at it in all three indexes (a merge may have introduced a newly
    /// learnt MAC/IP that wasn't indexed yet).
    fn reindex(&mut self, handle: DeviceHandle) {
        let Some(record) = self.arena.get(handle) else {
            return;
        };
        if let Some(mac) = record.mac.clone() {
            self.by_mac.insert(mac, handle);
        }
        if let Some(ipv4) = record.ipv4.clone() {
            self.by_ipv4.insert(ipv4, handle);
        }
        for ipv6 in record.ipv6.clone() {
            self.by_ipv6.insert(ipv6.address, handle);
        }
    }

    pub fn get_record(&self, handle: DeviceHandle) -> Option<DeviceRecord> {
        self.arena.get(handle).cloned()
    }

    pub fn get_devices(&self) -> Vec<DeviceRecord> {
        self.arena.iter().map(|(_, r)| r.clone()).collect()
    }

    pub fn get_by_mac(&self, mac: &str) -> Option<DeviceRecord> {
        self.by_mac
            .get(mac)
            .and_then(|&h| self.arena.get(h))
            .cloned()
    }

    pub fn get_by_ip(&self, ip: &str) -> Option<DeviceRecord> {
        self.by_ipv4
            .get(ip)
            .or_else(|| self.by_ipv6.get(ip))
            .and_then(|&h| self.arena.get(h))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn clear(&mut self) {
        self.arena.clear();
        self.by_mac.clear();
        self.by_ipv4.clear();
        self.by_ipv6.clear();
    }
}

fn priority(record: &DeviceRecord) -> KeyPriority {
    if record.mac.is_some() {
        KeyPriority::Mac
    } else if record.ipv4.is_some() {
        KeyPriority::Ipv4
    } else {
        KeyPriority::Ipv6
    }
}

/// Applies the merge rules for a single incoming Observation onto an
/// existing (or freshly-created) record.
fn apply_observation(record: &mut DeviceRecord, obs: &Observation) {
    if record.mac.is_none() {
        record.mac = obs.mac.clone();
    }
    if record.ipv4.is_none() {
        record.ipv4 = obs.ipv4.clone();
    }
    for addr in &obs.ipv6 {
        if !record.ipv6.iter().any(|a| a.address == addr.address) {
            record.ipv6.push(addr.clone());
        }
    }
    if record.hostname.is_none() {
        record.hostname = obs.hostname.clone();
    }
    if record.fqdn.is_none() {
        record.fqdn = obs.fqdn.clone();
    }
    if record.workgroup.is_none() {
        record.workgroup = obs.workgroup.clone();
    }
    if record.manufacturer.is_none() {
        record.manufacturer = obs.manufacturer_hint.clone();
    }
    if record.os_hint.is_none() {
        record.os_hint = obs.os_hint.clone();
    }

    // `ports` must always equal the union of `services.port`; fold
    // any bare port the Observation carries with no matching service entry
    // into a placeholder service first, then derive `ports` from
    // `services` rather than trust a producer to keep the two in lockstep.
    for &port in &obs.ports {
        if !record.services.iter().any(|s| s.port == port) {
            record.services.push(ServiceDescriptor {
                port,
                protocol: Protocol::Tcp,
                service_name: String::new(),
                version: String::new(),
            });
        }
    }
    for incoming in &obs.services {
        merge_service(record, incoming);
    }
    record.ports = record.services.iter().map(|s| s.port).collect();

    record.service_type_tags.extend(obs.service_types.iter().cloned());

    if let Some(source) = obs.source {
        record.sources.insert(source);
        record.discovered_via.insert(source);
    }

    record.last_seen = record.last_seen.max(obs.timestamp);
}

fn merge_service(record: &mut DeviceRecord, incoming: &ServiceDescriptor) {
    if let Some(existing) = record
        .services
        .iter_mut()
        .find(|s| s.port == incoming.port && s.protocol == incoming.protocol)
    {
        if incoming.version.len() > existing.version.len() {
            existing.version = incoming.version.clone();
        }
        if existing.service_name.is_empty() {
            existing.service_name = incoming.service_name.clone();
        }
    } else {
        record.services.push(incoming.clone());
    }
}

/// Field-by-field merge of an absorbed record into its surviving sibling,
/// reusing the same scalar/union rules an Observation would trigger.
fn merge_records(survivor: &mut DeviceRecord, absorbed: &DeviceRecord) {
    if survivor.mac.is_none() {
        survivor.mac = absorbed.mac.clone();
    }
    if survivor.ipv4.is_none() {
        survivor.ipv4 = absorbed.ipv4.clone();
    }
    for addr in &absorbed.ipv6 {
        if !survivor.ipv6.iter().any(|a| a.address == addr.address) {
            survivor.ipv6.push(addr.clone());
        }
    }
    if survivor.hostname.is_none() {
        survivor.hostname = absorbed.hostname.clone();
    }
    if survivor.fqdn.is_none() {
        survivor.fqdn = absorbed.fqdn.clone();
    }
    if survivor.workgroup.is_none() {
        survivor.workgroup = absorbed.workgroup.clone();
    }
    if survivor.manufacturer.is_none() {
        survivor.manufacturer = absorbed.manufacturer.clone();
    }
    if survivor.os_hint.is_none() {
        survivor.os_hint = absorbed.os_hint.clone();
    }
    if survivor.os_family.is_none() {
        survivor.os_family = absorbed.os_family;
    }
    if survivor.os_version.is_none() {
        survivor.os_version = absorbed.os_version.clone();
    }
    if survivor.model.is_none() {
        survivor.model = absorbed.model.clone();
    }
    if survivor.usage.is_none() {
        survivor.usage = absorbed.usage;
    }
    for &port in &absorbed.ports {
        if !survivor.services.iter().any(|s| s.port == port) {
            survivor.services.push(ServiceDescriptor {
                port,
                protocol: Protocol::Tcp,
                service_name: String::new(),
                version: String::new(),
            });
        }
    }
    for incoming in &absorbed.services {
        merge_service(survivor, incoming);
    }
    survivor.ports = survivor.services.iter().map(|s| s.port).collect();
    survivor
        .service_type_tags
        .extend(absorbed.service_type_tags.iter().cloned());
    survivor.sources.extend(absorbed.sources.iter().copied());
    survivor
        .discovered_via
        .extend(absorbed.discovered_via.iter().copied());
    survivor.first_seen = survivor.first_seen.min(absorbed.first_seen);
    survivor.last_seen = survivor.last_seen.max(absorbed.last_seen);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Ipv6Address, Source};

    fn obs_with_mac(mac: &str, ts: i64) -> Observation {
        let mut o = Observation::new(Source::Arp, ts);
        o.mac = Some(mac.to_string());
        o
    }

    #[test]
    fn first_observation_creates_a_new_record() {
        let mut correlator = Correlator::new();
        let (_, created) = correlator.on_observation(obs_with_mac("AA:BB:CC:DD:EE:FF", 100)).unwrap();
        assert!(created);
        assert_eq!(correlator.len(), 1);
    }

    #[test]
    fn repeated_mac_observation_merges_not_creates() {
        let mut correlator = Correlator::new();
        correlator.on_observation(obs_with_mac("AA:BB:CC:DD:EE:FF", 100));
        let (_, created) = correlator.on_observation(obs_with_mac("AA:BB:CC:DD:EE:FF", 200)).unwrap();
        assert!(!created);
        assert_eq!(correlator.len(), 1);
        let record = correlator.get_by_mac("AA:BB:CC:DD:EE:FF").unwrap();
        assert_eq!(record.last_seen, 200);
        assert_eq!(record.first_seen, 100);
    }

    #[test]
    fn late_mac_observation_unifies_ipv4_only_and_ipv6_only_records() {
        let mut correlator = Correlator::new();

        let mut ipv4_obs = Observation::new(Source::PortScan, 100);
        ipv4_obs.ipv4 = Some("192.168.1.10".to_string());
        correlator.on_observation(ipv4_obs);

        let mut ipv6_obs = Observation::new(Source::Ndp, 110);
        ipv6_obs.ipv6 = vec![Ipv6Address::new("fe80::1")];
        correlator.on_observation(ipv6_obs);

        assert_eq!(correlator.len(), 2);

        let mut stitch_obs = Observation::new(Source::Arp, 120);
        stitch_obs.mac = Some("AA:BB:CC:DD:EE:FF".to_string());
        stitch_obs.ipv4 = Some("192.168.1.10".to_string());
        correlator.on_observation(stitch_obs);

        let mut stitch_obs2 = Observation::new(Source::Ndp, 130);
        stitch_obs2.mac = Some("AA:BB:CC:DD:EE:FF".to_string());
        stitch_obs2.ipv6 = vec![Ipv6Address::new("fe80::1")];
        correlator.on_observation(stitch_obs2);

        assert_eq!(correlator.len(), 1);
        let record = correlator.get_by_mac("AA:BB:CC:DD:EE:FF").unwrap();
        assert_eq!(record.ipv4.as_deref(), Some("192.168.1.10"));
        assert_eq!(record.ipv6.len(), 1);
        assert!(record.is_dual_stack());
    }

    #[test]
    fn mac_priority_survives_over_ipv4_only_record_on_unification() {
        let mut correlator = Correlator::new();

        let mut mac_obs = Observation::new(Source::Arp, 100);
        mac_obs.mac = Some("AA:BB:CC:DD:EE:FF".to_string());
        mac_obs.hostname = Some("known-host".to_string());
        let (mac_handle, _) = correlator.on_observation(mac_obs).unwrap();

        let mut ipv4_obs = Observation::new(Source::PortScan, 110);
        ipv4_obs.ipv4 = Some("10.0.0.5".to_string());
        correlator.on_observation(ipv4_obs);

        let mut combined = Observation::new(Source::Arp, 120);
        combined.mac = Some("AA:BB:CC:DD:EE:FF".to_string());
        combined.ipv4 = Some("10.0.0.5".to_string());
        let (final_handle, _) = correlator.on_observation(combined).unwrap();

        assert_eq!(final_handle, mac_handle);
        let record = correlator.get_by_mac("AA:BB:CC:DD:EE:FF").unwrap();
        assert_eq!(record.hostname.as_deref(), Some("known-host"));
        assert_eq!(record.ipv4.as_deref(), Some("10.0.0.5"));
    }

    /// The highest-priority matching record can be reached through a
    /// lower-priority identifier in the incoming Observation (here, the
    /// first candidate handle is the IPv4-keyed record but the MAC-keyed
    /// record must survive unification). The Observation's own fields
    /// must land on whichever record actually survives, not on the handle
    /// that was probed first.
    #[test]
    fn observation_fields_land_on_the_handle_that_survives_unification() {
        let mut correlator = Correlator::new();

        let mut mac_obs = Observation::new(Source::Arp, 100);
        mac_obs.mac = Some("AA:BB:CC:DD:EE:FF".to_string());
        mac_obs.ipv6 = vec![Ipv6Address::new("fe80::1")];
        correlator.on_observation(mac_obs);

        let mut ipv4_obs = Observation::new(Source::PortScan, 110);
        ipv4_obs.ipv4 = Some("192.168.1.10".to_string());
        correlator.on_observation(ipv4_obs);

        assert_eq!(correlator.len(), 2);

        // No MAC on this Observation: candidate lookup finds the IPv4
        // record first (via `ipv4`) and the MAC record second (via
        // `ipv6`). `unify_pair` must make the MAC record the survivor, and
        // `hostname` must land there, not be dropped on the retired
        // IPv4-only handle.
        let mut stitch = Observation::new(Source::Mdns, 120);
        stitch.ipv4 = Some("192.168.1.10".to_string());
        stitch.ipv6 = vec![Ipv6Address::new("fe80::1")];
        stitch.hostname = Some("newname".to_string());
        let (handle, created) = correlator.on_observation(stitch).unwrap();

        assert!(!created);
        assert_eq!(correlator.len(), 1);
        let record = correlator.get_record(handle).unwrap();
        assert_eq!(record.mac.as_deref(), Some("AA:BB:CC:DD:EE:FF"));
        assert_eq!(record.ipv4.as_deref(), Some("192.168.1.10"));
        assert_eq!(record.hostname.as_deref(), Some("newname"));
    }

    #[test]
    fn ports_union_across_observations() {
        let mut correlator = Correlator::new();
        let mut first = obs_with_mac("AA:BB:CC:DD:EE:FF", 100);
        first.ports = vec![22, 80];
        correlator.on_observation(first);

        let mut second = obs_with_mac("AA:BB:CC:DD:EE:FF", 200);
        second.ports = vec![80, 443];
        correlator.on_observation(second);

        let record = correlator.get_by_mac("AA:BB:CC:DD:EE:FF").unwrap();
        assert_eq!(record.ports.len(), 3);
    }

    #[test]
    fn ports_always_equal_the_union_of_service_ports() {
        let mut correlator = Correlator::new();

        // A bare port with no accompanying service descriptor still must
        // show up as a (placeholder) service, since `ports` is derived
        // from `services`, not tracked independently.
        let mut bare = obs_with_mac("AA:BB:CC:DD:EE:FF", 100);
        bare.ports = vec![22];
        correlator.on_observation(bare);

        let mut with_service = obs_with_mac("AA:BB:CC:DD:EE:FF", 200);
        with_service.services = vec![ServiceDescriptor {
            port: 443,
            protocol: crate::model::Protocol::Tcp,
            service_name: "https".to_string(),
            version: String::new(),
        }];
        correlator.on_observation(with_service);

        let record = correlator.get_by_mac("AA:BB:CC:DD:EE:FF").unwrap();
        let service_ports: std::collections::BTreeSet<u16> =
            record.services.iter().map(|s| s.port).collect();
        assert_eq!(record.ports, service_ports);
        assert!(record.ports.contains(&22));
        assert!(record.ports.contains(&443));
    }

    #[test]
    fn identifier_less_observation_is_dropped() {
        let mut correlator = Correlator::new();
        let mut obs = Observation::new(Source::NetBios, 100);
        obs.hostname = Some("orphan".to_string());
        let result = correlator.on_observation(obs);
        assert!(result.is_none());
        assert!(correlator.is_empty());
    }

    #[test]
    fn oui_enrichment_fills_manufacturer_when_observation_carries_none() {
        let mut correlator = Correlator::new();
        correlator.on_observation(obs_with_mac("00:1A:11:AA:BB:CC", 100));
        let record = correlator.get_by_mac("00:1A:11:AA:BB:CC").unwrap();
        assert_eq!(record.manufacturer.as_deref(), Some("Google"));
        // MAC (20) + manufacturer (10).
        assert_eq!(record.confidence, 30);
    }

    #[test]
    fn clear_resets_the_store() {
        let mut correlator = Correlator::new();
        correlator.on_observation(obs_with_mac("AA:BB:CC:DD:EE:FF", 100));
        correlator.clear();
        assert!(correlator.is_empty());
        assert!(correlator.get_by_mac("AA:BB:CC:DD:EE:FF").is_none());
    }

    #[test]
    fn enrichment_runs_after_each_merge() {
        let mut correlator = Correlator::new();
        let mut obs = obs_with_mac("AA:BB:CC:DD:EE:FF", 100);
        obs.service_types = vec!["_ipp._tcp.local.".to_string()];
        correlator.on_observation(obs);
        let record = correlator.get_by_mac("AA:BB:CC:DD:EE:FF").unwrap();
        assert_eq!(record.usage, Some(crate::model::UsageCategory::Printer));
    }

    proptest::proptest! {
        /// Applying the exact same observation twice never creates a second
        /// record and never changes the resulting field values, since every
        /// merge rule is either first-non-empty-wins or a set union.
        #[test]
        fn merging_an_observation_with_itself_is_idempotent(
            mac_byte in proptest::prelude::any::<u8>(),
            ports in proptest::collection::vec(proptest::prelude::any::<u16>(), 0..8),
        ) {
            let mac = format!("AA:BB:CC:DD:EE:{:02X}", mac_byte);
            let mut correlator = Correlator::new();

            let mut obs = obs_with_mac(&mac, 100);
            obs.ports = ports.clone();
            correlator.on_observation(obs.clone());
            let once = correlator.get_by_mac(&mac).unwrap();

            correlator.on_observation(obs);
            let twice = correlator.get_by_mac(&mac).unwrap();

            proptest::prop_assert_eq!(correlator.len(), 1);
            proptest::prop_assert_eq!(once.ports, twice.ports);
            proptest::prop_assert_eq!(once.mac, twice.mac);
        }

        /// A later observation can only add identifiers, ports, and
        /// services to a record, never remove ones a prior observation
        /// already contributed.
        #[test]
        fn later_observations_only_grow_a_records_ports(
            mac_byte in proptest::prelude::any::<u8>(),
            first_ports in proptest::collection::vec(proptest::prelude::any::<u16>(), 0..8),
            second_ports in proptest::collection::vec(proptest::prelude::any::<u16>(), 0..8),
        ) {
            let mac = format!("AA:BB:CC:DD:EE:{:02X}", mac_byte);
            let mut correlator = Correlator::new();

            let mut first = obs_with_mac(&mac, 100);
            first.ports = first_ports.clone();
            correlator.on_observation(first);
            let after_first: std::collections::BTreeSet<u16> =
                correlator.get_by_mac(&mac).unwrap().ports;

            let mut second = obs_with_mac(&mac, 200);
            second.ports = second_ports;
            correlator.on_observation(second);
            let after_second = correlator.get_by_mac(&mac).unwrap().ports;

            proptest::prop_assert!(after_first.is_subset(&after_second));
        }
    }
}
