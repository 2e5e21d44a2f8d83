//! MAC address normalisation and bit predicates.

/// Normalise a MAC address written with `:`, `-`, or no separators, expanding
/// abbreviated octets (single hex digit) by left-padding with zero.
///
/// Returns `None` if the canonical form would not be exactly 17 characters
/// (i.e. the input did not carry six octets).
pub fn normalize_mac(raw: &str) -> Option<String> {
    let octets: Vec<&str> = if raw.contains(':') {
        raw.split(':').collect()
    } else if raw.contains('-') {
        raw.split('-').collect()
    } else if raw.len() == 12 && raw.chars().all(|c| c.is_ascii_hexdigit()) {
        raw.as_bytes()
            .chunks(2)
            .map(|c| std::str::from_utf8(c).unwrap())
            .collect()
    } else {
        return None;
    };

    if octets.len() != 6 {
        return None;
    }

    let mut padded = Vec::with_capacity(6);
    for octet in &octets {
        if octet.len() > 2 || octet.is_empty() || !octet.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        padded.push(format!("{:0>2}", octet.to_uppercase()));
    }

    let canonical = padded.join(":");
    if canonical.len() == 17 {
        Some(canonical)
    } else {
        None
    }
}

/// Parse the first octet of a normalised (colon-separated, uppercase) MAC.
fn first_octet(mac: &str) -> Option<u8> {
    u8::from_str_radix(mac.get(0..2)?, 16).ok()
}

/// Locally-administered address: bit `0x02` set in the first octet.
pub fn is_locally_administered(mac: &str) -> bool {
    first_octet(mac).is_some_and(|b| b & 0x02 != 0)
}

/// Multicast MAC: bit `0x01` set in the first octet.
pub fn is_multicast_mac(mac: &str) -> bool {
    first_octet(mac).is_some_and(|b| b & 0x01 != 0)
}

/// The broadcast MAC, `FF:FF:FF:FF:FF:FF`.
pub const BROADCAST_MAC: &str = "FF:FF:FF:FF:FF:FF";

pub fn is_broadcast_mac(mac: &str) -> bool {
    mac.eq_ignore_ascii_case(BROADCAST_MAC)
}

/// Extract the three-octet OUI prefix (six uppercase hex chars, no separators)
/// from a normalised MAC.
pub fn oui_prefix(mac: &str) -> Option<String> {
    if mac.len() != 17 {
        return None;
    }
    Some(format!(
        "{}{}{}",
        mac.get(0..2)?,
        mac.get(3..5)?,
        mac.get(6..8)?
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_colon_separated() {
        assert_eq!(
            normalize_mac("0:0:5e:0:1:f"),
            Some("00:00:5E:00:01:0F".to_string())
        );
    }

    #[test]
    fn normalizes_dash_separated() {
        assert_eq!(
            normalize_mac("aa-bb-cc-dd-ee-ff"),
            Some("AA:BB:CC:DD:EE:FF".to_string())
        );
    }

    #[test]
    fn normalizes_unseparated() {
        assert_eq!(
            normalize_mac("AABBCCDDEEFF"),
            Some("AA:BB:CC:DD:EE:FF".to_string())
        );
    }

    #[test]
    fn rejects_wrong_octet_count() {
        assert_eq!(normalize_mac("aa:bb:cc"), None);
        assert_eq!(normalize_mac(""), None);
    }

    #[test]
    fn rejects_non_hex() {
        assert_eq!(normalize_mac("zz:bb:cc:dd:ee:ff"), None);
    }

    #[test]
    fn detects_locally_administered() {
        assert!(is_locally_administered("02:00:00:00:00:00"));
        assert!(!is_locally_administered("00:1A:11:AA:BB:CC"));
    }

    #[test]
    fn detects_multicast() {
        assert!(is_multicast_mac("01:00:5E:00:00:01"));
        assert!(!is_multicast_mac("00:1A:11:AA:BB:CC"));
    }

    #[test]
    fn detects_broadcast() {
        assert!(is_broadcast_mac("ff:ff:ff:ff:ff:ff"));
        assert!(!is_broadcast_mac("00:1A:11:AA:BB:CC"));
    }

    #[test]
    fn extracts_oui_prefix() {
        assert_eq!(
            oui_prefix("00:1A:11:AA:BB:CC"),
            Some("001A11".to_string())
        );
    }
}
