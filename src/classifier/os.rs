//! OS-family detection cascade. Four steps tried in descending-confidence
//! order; the first to match wins. Never panics — absence of signal simply
//! yields `None`.

use crate::classifier::patterns::{
    contains_ci, HOSTNAME_OS_PATTERNS, MANUFACTURER_OS_PATTERNS, OS_FAMILY_PATTERNS,
    VERSION_ANCHORS,
};
use crate::model::OsFamily;

/// Result of the cascade: the guessed family, a confidence score, and the
/// version substring if one could be extracted from the explicit OS string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsGuess {
    pub family: OsFamily,
    pub confidence: u8,
    pub version: Option<String>,
}

/// Runs the four-step cascade:
///   1. Explicit OS string match (confidence 90)
///   2. Hostname pattern match (confidence 60)
///   3. Open-port heuristic (confidence 50)
///   4. Manufacturer-derived guess (confidence 40)
///
/// `os_hint` is whatever free-text OS string a driver observed (e.g. an
/// nmap `OS details:` line or an SSDP/mDNS TXT value); `manufacturer` is the
/// resolved OUI vendor name.
pub fn detect(
    os_hint: Option<&str>,
    hostname: Option<&str>,
    ports: &[u16],
    manufacturer: Option<&str>,
) -> Option<OsGuess> {
    if let Some(hint) = os_hint {
        for (family, patterns) in OS_FAMILY_PATTERNS {
            if patterns.iter().any(|p| contains_ci(hint, p)) {
                return Some(OsGuess {
                    family: *family,
                    confidence: 90,
                    version: extract_version(hint),
                });
            }
        }
    }

    if let Some(name) = hostname {
        for (family, patterns) in HOSTNAME_OS_PATTERNS {
            if patterns.iter().any(|p| contains_ci(name, p)) {
                return Some(OsGuess {
                    family: *family,
                    confidence: 60,
                    version: None,
                });
            }
        }
    }

    if let Some(family) = guess_family_from_ports(ports) {
        return Some(OsGuess {
            family,
            confidence: 50,
            version: None,
        });
    }

    if let Some(vendor) = manufacturer {
        for (family, patterns) in MANUFACTURER_OS_PATTERNS {
            if patterns.iter().any(|p| contains_ci(vendor, p)) {
                return Some(OsGuess {
                    family: *family,
                    confidence: 40,
                    version: None,
                });
            }
        }
    }

    None
}

/// A Windows box commonly exposes 3389 (RDP) or 445+139 (SMB) together; a
/// Unix-like box commonly exposes 22 (SSH) without those. This is a weak
/// signal, used only after the stronger string-based checks have failed.
fn guess_family_from_ports(ports: &[u16]) -> Option<OsFamily> {
    let has = |p: u16| ports.contains(&p);
    if has(3389) || (has(445) && has(139)) {
        Some(OsFamily::Windows)
    } else if has(22) && !has(3389) {
        Some(OsFamily::Linux)
    } else {
        None
    }
}

/// Pulls the token immediately following a recognised OS-name anchor out of
/// a free-text OS string, e.g. `"Linux 5.15"` -> `Some("5.15")`,
/// `"Windows 10 Pro"` -> `Some("10")`. Returns `None` when no anchor
/// matches or no trailing token follows it.
fn extract_version(hint: &str) -> Option<String> {
    let lower = hint.to_lowercase();
    let mut best: Option<(usize, &str)> = None;
    for anchor in VERSION_ANCHORS {
        if let Some(idx) = lower.find(anchor) {
            match best {
                Some((best_len, _)) if anchor.len() <= best_len => {}
                _ => best = Some((anchor.len(), anchor)),
            }
        }
    }
    let (_, anchor) = best?;
    let idx = lower.find(anchor)?;
    let rest = hint[idx + anchor.len()..].trim_start();
    let token: String = rest
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '.' || *c == '_' || *c == '-')
        .collect();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_os_string_wins_at_highest_confidence() {
        let guess = detect(Some("Linux 5.15.0-58-generic"), None, &[], None).unwrap();
        assert_eq!(guess.family, OsFamily::Linux);
        assert_eq!(guess.confidence, 90);
        assert_eq!(guess.version.as_deref(), Some("5.15.0-58-generic"));
    }

    #[test]
    fn hostname_pattern_used_when_no_os_hint() {
        let guess = detect(None, Some("johns-macbook-pro"), &[], None).unwrap();
        assert_eq!(guess.family, OsFamily::MacOs);
        assert_eq!(guess.confidence, 60);
    }

    #[test]
    fn port_heuristic_used_as_fallback() {
        let guess = detect(None, None, &[3389, 445], None).unwrap();
        assert_eq!(guess.family, OsFamily::Windows);
        assert_eq!(guess.confidence, 50);
    }

    #[test]
    fn manufacturer_used_as_last_resort() {
        let guess = detect(None, None, &[], Some("Apple, Inc.")).unwrap();
        assert_eq!(guess.family, OsFamily::Ios);
        assert_eq!(guess.confidence, 40);
    }

    #[test]
    fn no_signal_yields_none() {
        assert!(detect(None, None, &[], None).is_none());
    }

    #[test]
    fn version_extraction_handles_windows_style_strings() {
        assert_eq!(
            extract_version("Microsoft Windows 10 Pro"),
            Some("10".to_string())
        );
    }
}
