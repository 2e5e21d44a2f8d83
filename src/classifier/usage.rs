//! Usage-category classification: a weighted-scoring pass over all rule
//! sets in [`patterns::USAGE_RULES`], producing the best-scoring category
//! together with a derived confidence value.

use crate::classifier::patterns::{contains_ci, USAGE_RULES};
use crate::model::{OsFamily, UsageCategory};

/// Per-signal weights (spec-mandated): a vendor match outweighs a hostname
/// match, which outweighs any single port match; port combinations and
/// OS-family agreement contribute smaller, additive bonuses.
const VENDOR_WEIGHT: u32 = 5;
const HOSTNAME_WEIGHT: u32 = 4;
const SERVICE_TYPE_WEIGHT: u32 = 4;
const PORT_WEIGHT: u32 = 2;

/// Result of the usage-classification pass. `usage` is only meaningful
/// when `confidence > 30`, matching the Correlator's enrichment rule; the
/// raw `score` is exposed for testing and future tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageGuess {
    pub category: UsageCategory,
    pub confidence: u8,
    score: u32,
}

/// Scores every usage rule against the supplied signals and returns the
/// highest-scoring category. Ties are broken by declaration order in
/// `USAGE_RULES` (first rule wins).
pub fn classify(
    manufacturer: Option<&str>,
    hostname: Option<&str>,
    service_types: &[String],
    ports: &[u16],
    os_family: Option<OsFamily>,
) -> Option<UsageGuess> {
    let mut best: Option<(u32, UsageCategory)> = None;

    for rule in USAGE_RULES {
        let mut score = 0u32;

        if let Some(vendor) = manufacturer {
            if rule
                .vendor_patterns
                .iter()
                .any(|p| contains_ci(vendor, p))
            {
                score += VENDOR_WEIGHT;
            }
        }

        if let Some(name) = hostname {
            if rule
                .hostname_patterns
                .iter()
                .any(|p| contains_ci(name, p))
            {
                score += HOSTNAME_WEIGHT;
            }
        }

        if service_types
            .iter()
            .any(|tag| rule.service_type_patterns.iter().any(|p| contains_ci(tag, p)))
        {
            score += SERVICE_TYPE_WEIGHT;
        }

        let port_hits = rule
            .indicator_ports
            .iter()
            .filter(|p| ports.contains(p))
            .count() as u32;
        score += port_hits * PORT_WEIGHT;

        for (combo, bonus) in rule.port_combo_bonuses {
            if combo.iter().all(|p| ports.contains(p)) {
                score += *bonus as u32;
            }
        }

        if let Some(family) = os_family {
            for (bonus_family, bonus) in rule.os_family_bonus {
                if *bonus_family == family {
                    score += *bonus as u32;
                }
            }
        }

        if score == 0 {
            continue;
        }

        match &best {
            Some((best_score, _)) if *best_score >= score => {}
            _ => best = Some((score, rule.category)),
        }
    }

    let (score, category) = best?;
    let confidence = score.saturating_mul(10).min(100) as u8;
    if confidence <= 30 {
        return None;
    }
    Some(UsageGuess {
        category,
        confidence,
        score,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn printer_detected_from_mdns_service_type_alone() {
        let guess = classify(
            None,
            None,
            &["_ipp._tcp.local.".to_string()],
            &[],
            None,
        )
        .unwrap();
        assert_eq!(guess.category, UsageCategory::Printer);
    }

    #[test]
    fn vendor_and_hostname_agreement_increases_confidence_over_vendor_alone() {
        let vendor_only = classify(Some("Netgear"), None, &[], &[], None).unwrap();
        let vendor_and_host =
            classify(Some("Netgear"), Some("gateway-office"), &[], &[], None).unwrap();
        assert!(vendor_and_host.confidence > vendor_only.confidence);
    }

    #[test]
    fn weak_single_port_signal_stays_below_threshold() {
        assert!(classify(None, None, &[], &[161], None).is_none());
    }

    #[test]
    fn no_signal_produces_no_guess() {
        assert!(classify(None, None, &[], &[], None).is_none());
    }

    #[test]
    fn windows_smb_rdp_combo_favors_computer_category() {
        let guess = classify(None, None, &[], &[3389, 445], Some(OsFamily::Windows)).unwrap();
        assert_eq!(guess.category, UsageCategory::Computer);
    }
}
