use std::collections::BTreeSet;

use crate::error::{Result, SelectorError};
use crate::selector::{NamedSelectors, Selector};

// ---------------------------------------------------------------------------
// Phenotype rule building – baseline + overrides → ordered rule set
// ---------------------------------------------------------------------------

/// Merge a baseline phenotype list with optional per-phenotype overrides
/// into the final ordered rule set.
///
/// Every override key must name a baseline phenotype. The result lists the
/// overridden phenotypes first, in override order, then the remaining
/// baseline names in baseline order, each mapped to the identity selector
/// (its own name). Callers build report-row and UI orderings from this, so
/// the ordering is part of the contract.
pub fn build_rules(
    baseline: &[String],
    overrides: Option<&[(String, Selector)]>,
) -> Result<NamedSelectors> {
    let overrides = overrides.unwrap_or(&[]);

    let mut seen: BTreeSet<&str> = BTreeSet::new();
    for (name, _) in overrides {
        if name.is_empty() {
            return Err(SelectorError::UnnamedOverride);
        }
        if !seen.insert(name.as_str()) {
            return Err(SelectorError::DuplicateName(name.clone()));
        }
    }

    let unknown: Vec<String> = overrides
        .iter()
        .map(|(name, _)| name)
        .filter(|name| !baseline.iter().any(|b| b == *name))
        .cloned()
        .collect();
    if !unknown.is_empty() {
        return Err(SelectorError::UnknownOverrides(unknown));
    }

    let mut rules: NamedSelectors = Vec::with_capacity(baseline.len());
    for (name, selector) in overrides {
        rules.push((name.clone(), selector.clone()));
    }
    for name in baseline {
        if !seen.contains(name.as_str()) {
            rules.push((name.clone(), Selector::Name(name.clone())));
        }
    }

    log::debug!(
        "built rule set for {} phenotypes ({} overridden)",
        rules.len(),
        overrides.len()
    );
    Ok(rules)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn baseline() -> Vec<String> {
        ["CD8", "CD68", "tumor"].map(String::from).to_vec()
    }

    #[test]
    fn no_overrides_yields_identity_rules_in_baseline_order() {
        let rules = build_rules(&baseline(), None).unwrap();
        assert_eq!(
            rules,
            vec![
                ("CD8".to_string(), Selector::name("CD8")),
                ("CD68".to_string(), Selector::name("CD68")),
                ("tumor".to_string(), Selector::name("tumor")),
            ]
        );
    }

    #[test]
    fn empty_overrides_equal_no_overrides() {
        assert_eq!(
            build_rules(&baseline(), Some(&[])).unwrap(),
            build_rules(&baseline(), None).unwrap()
        );
    }

    #[test]
    fn overridden_phenotypes_come_first_in_override_order() {
        let tumor = Selector::any_of(["tumor PDL1+", "tumor PDL1-"]);
        let overrides = vec![("tumor".to_string(), tumor.clone())];
        let rules = build_rules(&baseline(), Some(&overrides)).unwrap();
        assert_eq!(
            rules,
            vec![
                ("tumor".to_string(), tumor),
                ("CD8".to_string(), Selector::name("CD8")),
                ("CD68".to_string(), Selector::name("CD68")),
            ]
        );
    }

    #[test]
    fn unknown_override_names_are_fatal_and_enumerated() {
        let overrides = vec![("CD4".to_string(), Selector::name("CD4"))];
        let err = build_rules(&baseline(), Some(&overrides)).unwrap_err();
        assert_eq!(err, SelectorError::UnknownOverrides(vec!["CD4".to_string()]));
        assert!(err.to_string().contains("CD4"));
    }

    #[test]
    fn empty_override_key_means_the_mapping_is_not_named() {
        let overrides = vec![(String::new(), Selector::name("tumor"))];
        let err = build_rules(&baseline(), Some(&overrides)).unwrap_err();
        assert_eq!(err, SelectorError::UnnamedOverride);
    }

    #[test]
    fn duplicate_override_keys_are_rejected() {
        let overrides = vec![
            ("tumor".to_string(), Selector::name("tumor")),
            ("tumor".to_string(), Selector::name("tumor")),
        ];
        let err = build_rules(&baseline(), Some(&overrides)).unwrap_err();
        assert_eq!(err, SelectorError::DuplicateName("tumor".to_string()));
    }
}
