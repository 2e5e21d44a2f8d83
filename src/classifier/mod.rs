//! Post-merge enrichment: OS-family detection, usage-category scoring, and
//! composite confidence, applied to a [`DeviceRecord`] after every merge.

pub mod confidence;
pub mod os;
pub mod patterns;
pub mod usage;

use crate::model::DeviceRecord;
use crate::oui::OuiResolver;

/// Recomputes `manufacturer`, `os_family`, `os_version`, `usage`, and
/// `confidence` on a record from its current fields. Called by the
/// Correlator after every ingestion or merge; never overwrites `model`,
/// which only a driver observation can supply.
pub fn enrich(record: &mut DeviceRecord, oui: &OuiResolver) {
    if record.manufacturer.is_none() {
        if let Some(mac) = record.mac.as_deref() {
            if let Some(vendor) = oui.resolve(mac) {
                record.manufacturer = Some(vendor.to_string());
            }
        }
    }

    let service_types: Vec<String> = record.service_type_tags.iter().cloned().collect();
    let ports: Vec<u16> = record.ports.iter().copied().collect();

    if record.os_family.is_none() {
        if let Some(guess) = os::detect(
            record.os_hint.as_deref(),
            record.hostname.as_deref(),
            &ports,
            record.manufacturer.as_deref(),
        ) {
            record.os_family = Some(guess.family);
            record.os_version = guess.version;
        }
    }

    if let Some(guess) = usage::classify(
        record.manufacturer.as_deref(),
        record.hostname.as_deref(),
        &service_types,
        &ports,
        record.os_family,
    ) {
        record.usage = Some(guess.category);
    }

    record.confidence = confidence::score(record);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Source;
    use std::collections::HashSet;

    #[test]
    fn enrich_classifies_printer_from_service_type_and_raises_confidence() {
        let mut record = DeviceRecord {
            mac: Some("AA:BB:CC:DD:EE:FF".to_string()),
            ipv4: Some("192.168.1.20".to_string()),
            service_type_tags: HashSet::from(["_ipp._tcp.local.".to_string()]),
            sources: HashSet::from([Source::Mdns]),
            ..Default::default()
        };
        enrich(&mut record, &OuiResolver::new());
        assert_eq!(record.usage, Some(crate::model::UsageCategory::Printer));
        assert!(record.confidence >= 35);
    }

    #[test]
    fn enrich_never_overwrites_an_existing_os_guess() {
        let mut record = DeviceRecord {
            os_family: Some(crate::model::OsFamily::Bsd),
            os_version: Some("pinned".to_string()),
            hostname: Some("some-windows-host".to_string()),
            ..Default::default()
        };
        enrich(&mut record, &OuiResolver::new());
        assert_eq!(record.os_family, Some(crate::model::OsFamily::Bsd));
        assert_eq!(record.os_version.as_deref(), Some("pinned"));
    }

    #[test]
    fn enrich_derives_manufacturer_from_oui_when_unset() {
        let mut record = DeviceRecord {
            mac: Some("00:1A:11:AA:BB:CC".to_string()),
            ..Default::default()
        };
        enrich(&mut record, &OuiResolver::new());
        assert_eq!(record.manufacturer.as_deref(), Some("Google"));
    }

    #[test]
    fn enrich_never_overwrites_a_manufacturer_hint_with_oui() {
        let mut record = DeviceRecord {
            mac: Some("00:1A:11:AA:BB:CC".to_string()),
            manufacturer: Some("explicit-hint".to_string()),
            ..Default::default()
        };
        enrich(&mut record, &OuiResolver::new());
        assert_eq!(record.manufacturer.as_deref(), Some("explicit-hint"));
    }
}
