/// Selection engine: selector terms, evaluation, naming, and rule building.
///
/// Architecture:
/// ```text
///   phenotype list + overrides
///            │
///            ▼
///      ┌──────────┐
///      │  rules    │  merge baseline + overrides → ordered rule set
///      └──────────┘
///            │
///            ▼
///      ┌──────────┐      ┌────────────┐
///      │   eval    │◄─────│ normalize  │  derive display names
///      └──────────┘      └────────────┘
///            │
///            ▼
///      per-row boolean sequence
/// ```
pub mod eval;
pub mod expr;
pub mod normalize;
pub mod rules;

use crate::selector::expr::Expression;

// ---------------------------------------------------------------------------
// Selector – a declarative row-selection term
// ---------------------------------------------------------------------------

/// A declarative term identifying which table rows to keep.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    /// Matches every row unconditionally.
    All,
    /// A single phenotype name, matched against the table's phenotype
    /// encoding.
    Name(String),
    /// A set of phenotype names, ORed together.
    AnyOf(Vec<String>),
    /// An ordered list of sub-selectors, ANDed together.
    AllOf(Vec<Selector>),
    /// A boolean threshold expression over row columns.
    Expr(Expression),
}

impl Selector {
    /// Convenience constructor for a [`Selector::Name`].
    pub fn name(n: impl Into<String>) -> Self {
        Selector::Name(n.into())
    }

    /// Convenience constructor for a [`Selector::AnyOf`].
    pub fn any_of<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Selector::AnyOf(names.into_iter().map(Into::into).collect())
    }
}

/// Ordered mapping from display name to selector. Keys are unique within
/// one mapping; insertion order is meaningful and preserved.
pub type NamedSelectors = Vec<(String, Selector)>;
