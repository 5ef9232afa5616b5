use std::fmt;

use anyhow::{Context, Result};
use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::selector::expr::Expression;
use crate::selector::Selector;

// ---------------------------------------------------------------------------
// Selector definitions – JSON shapes
// ---------------------------------------------------------------------------

/// Accepted JSON shapes for a selector definition:
///
/// ```json
/// null                          // wildcard: every row
/// "cd8"                         // single phenotype name
/// "~PDL1 > 0.25"                // threshold expression (leading ~)
/// ["a", "b", "c"]               // name-set, ORed
/// ["tumor", "~PDL1 > 0.25"]     // composite, ANDed
/// [["a", "b", "c"]]             // composite wrapping a name-set
/// ```
///
/// A flat array of plain names is a name-set; any other array is a
/// composite of its recursively parsed elements.
impl<'de> Deserialize<'de> for Selector {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(SelectorVisitor)
    }
}

struct SelectorVisitor;

impl<'de> Visitor<'de> for SelectorVisitor {
    type Value = Selector;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("null, a phenotype name, a `~` expression, or a list of selectors")
    }

    fn visit_unit<E>(self) -> std::result::Result<Selector, E>
    where
        E: de::Error,
    {
        Ok(Selector::All)
    }

    fn visit_str<E>(self, s: &str) -> std::result::Result<Selector, E>
    where
        E: de::Error,
    {
        if s.trim_start().starts_with('~') {
            Expression::parse(s).map(Selector::Expr).map_err(E::custom)
        } else if s.is_empty() {
            Err(E::custom("phenotype name must not be empty"))
        } else {
            Ok(Selector::Name(s.to_string()))
        }
    }

    fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Selector, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut elements: Vec<Selector> = Vec::new();
        while let Some(element) = seq.next_element::<Selector>()? {
            elements.push(element);
        }
        if elements.is_empty() {
            return Err(de::Error::custom("selector list must contain at least one term"));
        }

        let plain_names: Option<Vec<String>> = elements
            .iter()
            .map(|e| match e {
                Selector::Name(name) => Some(name.clone()),
                _ => None,
            })
            .collect();

        Ok(match plain_names {
            // A single-name array is just that name.
            Some(mut names) if names.len() == 1 => Selector::Name(names.remove(0)),
            Some(names) => Selector::AnyOf(names),
            None => Selector::AllOf(elements),
        })
    }
}

// ---------------------------------------------------------------------------
// Phenotype overrides – must be a named mapping
// ---------------------------------------------------------------------------

/// User-supplied phenotype overrides, parsed from a JSON object with key
/// order preserved. Any other JSON shape (in particular an array) is
/// rejected: overrides must be a named mapping.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RuleOverrides(pub Vec<(String, Selector)>);

impl RuleOverrides {
    pub fn as_slice(&self) -> &[(String, Selector)] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for RuleOverrides {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(OverridesVisitor)
    }
}

struct OverridesVisitor;

impl<'de> Visitor<'de> for OverridesVisitor {
    type Value = RuleOverrides;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a named mapping of phenotype name to selector")
    }

    fn visit_unit<E>(self) -> std::result::Result<RuleOverrides, E>
    where
        E: de::Error,
    {
        Ok(RuleOverrides::default())
    }

    fn visit_map<A>(self, mut map: A) -> std::result::Result<RuleOverrides, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut overrides = Vec::new();
        while let Some((name, selector)) = map.next_entry::<String, Selector>()? {
            if name.is_empty() {
                return Err(de::Error::custom("phenotype overrides must be a named mapping"));
            }
            overrides.push((name, selector));
        }
        Ok(RuleOverrides(overrides))
    }

    fn visit_seq<A>(self, _seq: A) -> std::result::Result<RuleOverrides, A::Error>
    where
        A: SeqAccess<'de>,
    {
        Err(de::Error::custom("phenotype overrides must be a named mapping"))
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Parse a single selector definition from JSON text.
pub fn selector_from_str(text: &str) -> Result<Selector> {
    serde_json::from_str(text).with_context(|| format!("parsing selector definition {text:?}"))
}

/// Parse a selector definition from an already-loaded JSON value.
pub fn selector_from_value(value: &JsonValue) -> Result<Selector> {
    Selector::deserialize(value)
        .with_context(|| format!("parsing selector definition {value}"))
}

/// Parse an ordered list of selector terms from JSON text. A bare scalar is
/// rejected: standalone terms must be wrapped in a list of length one.
pub fn selectors_from_str(text: &str) -> Result<Vec<Selector>> {
    serde_json::from_str(text).with_context(|| format!("parsing selector list {text:?}"))
}

/// Parse phenotype overrides from JSON text. Key order is preserved as
/// written, which downstream ordering contracts depend on.
pub fn overrides_from_str(text: &str) -> Result<RuleOverrides> {
    serde_json::from_str(text).with_context(|| format!("parsing phenotype overrides {text:?}"))
}
