use thiserror::Error;

/// Result type for selector operations.
pub type Result<T> = std::result::Result<T, SelectorError>;

/// Errors raised by the selection engine.
///
/// Per-row missing data is never an error: a `Null` or absent value simply
/// fails to match. Everything here is structural: a bad selector or rule
/// definition that the caller has to fix.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SelectorError {
    /// An expression references a column the table does not have. The
    /// message carries the selector's original text so the offending
    /// definition can be located.
    #[error("unknown column {column:?} in selector {selector_text:?}")]
    UnknownColumn {
        column: String,
        selector_text: String,
    },

    /// A phenotype name has no matching `Phenotype <name>` column in a
    /// per-phenotype-column table.
    #[error("unknown phenotype {name:?}: table has no {column:?} column")]
    UnknownPhenotype { name: String, column: String },

    /// The table carries neither phenotype encoding.
    #[error("table has no `Phenotype` column and no `Phenotype <name>` columns")]
    NoPhenotypeColumns,

    /// Malformed expression source text.
    #[error("malformed selector expression {text:?}: {reason}")]
    BadExpression { text: String, reason: String },

    /// A name-set or composite selector with no members.
    #[error("empty {kind} selector")]
    EmptySelector { kind: &'static str },

    /// Normalization called on an empty collection of terms.
    #[error("selector list must contain at least one term")]
    NoTerms,

    /// The same display name was derived or supplied twice.
    #[error("duplicate selector name {0:?}")]
    DuplicateName(String),

    /// Phenotype overrides given as an unnamed collection (or with an
    /// empty-string key).
    #[error("phenotype overrides must be a named mapping")]
    UnnamedOverride,

    /// Override keys that do not appear in the baseline phenotype list.
    #[error("unknown phenotype override name(s): {}", .0.join(", "))]
    UnknownOverrides(Vec<String>),
}
