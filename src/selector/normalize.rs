use std::collections::BTreeSet;

use crate::error::{Result, SelectorError};
use crate::selector::{NamedSelectors, Selector};

// ---------------------------------------------------------------------------
// Derived display names
// ---------------------------------------------------------------------------

/// Derive the display name for a selector.
///
/// Naming mirrors the logical combination so the label documents the
/// semantics: name-set members join with `|` (OR), composite parts join
/// with `&` (AND), and an expression uses its canonical text.
pub fn selector_name(selector: &Selector) -> String {
    match selector {
        Selector::All => "all".to_string(),
        Selector::Name(name) => name.clone(),
        Selector::AnyOf(names) => names.join("|"),
        Selector::AllOf(elements) => {
            let mut parts = Vec::new();
            for element in elements {
                name_parts(element, &mut parts);
            }
            parts.join("&")
        }
        Selector::Expr(expression) => expression.canonical(),
    }
}

/// Name parts a selector contributes inside a composite. A name-set
/// contributes each member on its own, so a composite wrapping
/// `[a, b, c]` is labelled `a&b&c`, not `a|b|c`.
fn name_parts(selector: &Selector, out: &mut Vec<String>) {
    match selector {
        Selector::AnyOf(names) => out.extend(names.iter().cloned()),
        other => out.push(selector_name(other)),
    }
}

// ---------------------------------------------------------------------------
// Normalization – terms → ordered (name, selector) mapping
// ---------------------------------------------------------------------------

/// Normalize a plain ordered collection of selector terms, deriving every
/// display name.
pub fn normalize(terms: &[Selector]) -> Result<NamedSelectors> {
    let named: Vec<(Option<String>, Selector)> =
        terms.iter().map(|t| (None, t.clone())).collect();
    normalize_named(&named)
}

/// Normalize a name-carrying collection of selector terms. A supplied name
/// passes through unchanged; `None` falls back to the derived name.
pub fn normalize_named(terms: &[(Option<String>, Selector)]) -> Result<NamedSelectors> {
    if terms.is_empty() {
        return Err(SelectorError::NoTerms);
    }

    let mut mapping = Vec::with_capacity(terms.len());
    let mut seen: BTreeSet<String> = BTreeSet::new();
    for (supplied, selector) in terms {
        let name = match supplied {
            Some(name) => name.clone(),
            None => selector_name(selector),
        };
        if !seen.insert(name.clone()) {
            return Err(SelectorError::DuplicateName(name));
        }
        mapping.push((name, selector.clone()));
    }
    Ok(mapping)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::expr::Expression;

    #[test]
    fn plain_name_keeps_its_own_label() {
        let mapping = normalize(&[Selector::name("cd8")]).unwrap();
        assert_eq!(mapping, vec![("cd8".to_string(), Selector::name("cd8"))]);
    }

    #[test]
    fn expression_uses_canonical_text() {
        let expr = Selector::Expr(Expression::parse("~Expr==1").unwrap());
        let mapping = normalize(&[expr.clone()]).unwrap();
        assert_eq!(mapping, vec![("Expr == 1".to_string(), expr)]);
    }

    #[test]
    fn name_set_joins_with_pipe() {
        let set = Selector::any_of(["a", "b", "c"]);
        let mapping = normalize(&[set.clone()]).unwrap();
        assert_eq!(mapping, vec![("a|b|c".to_string(), set)]);
    }

    #[test]
    fn composite_flattens_name_sets_and_joins_with_ampersand() {
        let composite = Selector::AllOf(vec![Selector::any_of(["a", "b", "c"])]);
        let mapping = normalize(&[composite.clone()]).unwrap();
        assert_eq!(mapping, vec![("a&b&c".to_string(), composite)]);
    }

    #[test]
    fn composite_of_name_and_expression() {
        let composite = Selector::AllOf(vec![
            Selector::name("tumor"),
            Selector::Expr(Expression::parse("~PDL1 > 0.25").unwrap()),
        ]);
        assert_eq!(selector_name(&composite), "tumor&PDL1 > 0.25");
    }

    #[test]
    fn empty_input_is_rejected() {
        assert_eq!(normalize(&[]).unwrap_err(), SelectorError::NoTerms);
        assert_eq!(normalize_named(&[]).unwrap_err(), SelectorError::NoTerms);
    }

    #[test]
    fn supplied_names_pass_through_unchanged() {
        let terms = vec![
            (Some("killer T".to_string()), Selector::name("cd8")),
            (None, Selector::name("tumor")),
        ];
        let mapping = normalize_named(&terms).unwrap();
        assert_eq!(mapping[0].0, "killer T");
        assert_eq!(mapping[1].0, "tumor");
    }

    #[test]
    fn duplicate_names_are_rejected_not_merged() {
        let err = normalize(&[Selector::name("cd8"), Selector::name("cd8")]).unwrap_err();
        assert_eq!(err, SelectorError::DuplicateName("cd8".to_string()));

        let err = normalize_named(&[
            (Some("x".to_string()), Selector::name("cd8")),
            (Some("x".to_string()), Selector::name("tumor")),
        ])
        .unwrap_err();
        assert_eq!(err, SelectorError::DuplicateName("x".to_string()));
    }
}
