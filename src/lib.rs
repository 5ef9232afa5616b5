//! Phenotype selection engine for per-cell measurement tables.
//!
//! Rows are selected by declarative criteria: a phenotype name, a set of
//! names (OR), a list of sub-selectors (AND), or a threshold expression
//! over measurement columns. A project's phenotype list plus optional
//! user overrides resolves into an ordered rule set that downstream
//! consumers (report tables, spatial statistics, plots) feed back through
//! the evaluator, one phenotype at a time.
//!
//! ```text
//!   baseline phenotypes + JSON overrides
//!             │
//!             ▼
//!        ┌──────────┐
//!        │  config   │  parse definitions → Selector / RuleOverrides
//!        └──────────┘
//!             │
//!             ▼
//!        ┌──────────┐
//!        │  rules    │  merge into ordered rule set
//!        └──────────┘
//!             │
//!             ▼
//!        ┌──────────┐     ┌────────────┐
//!        │  eval     │◄────│ normalize  │  display names for legends
//!        └──────────┘     └────────────┘
//!             │
//!             ▼
//!        Vec<bool> per selector, one entry per table row
//! ```
//!
//! The engine never touches the filesystem: tables arrive constructed
//! ([`CellTable`]), and selector/override definitions arrive as JSON text
//! or values the caller already loaded.

pub mod config;
pub mod error;
pub mod model;
pub mod selector;

pub use config::{
    overrides_from_str, selector_from_str, selector_from_value, selectors_from_str, RuleOverrides,
};
pub use error::{Result, SelectorError};
pub use model::{CellRow, CellTable, CellValue};
pub use selector::eval::{evaluate, evaluate_all};
pub use selector::expr::Expression;
pub use selector::normalize::{normalize, normalize_named, selector_name};
pub use selector::rules::build_rules;
pub use selector::{NamedSelectors, Selector};

#[cfg(test)]
mod tests {
    use super::*;

    /// Full pipeline: JSON overrides → rule set → evaluation per phenotype.
    #[test]
    fn rules_from_json_select_rows_end_to_end() {
        let rows: Vec<CellRow> = [
            ("tumor", 0.4),
            ("tumor", 0.1),
            ("cd8", 0.9),
            ("cd68", 0.0),
        ]
        .iter()
        .map(|(phenotype, pdl1)| {
            [
                ("Phenotype".to_string(), CellValue::from(*phenotype)),
                ("PDL1".to_string(), CellValue::from(*pdl1)),
            ]
            .into_iter()
            .collect()
        })
        .collect();
        let table = CellTable::from_rows(rows);

        let baseline: Vec<String> = ["tumor", "cd8", "cd68"].map(String::from).to_vec();
        let overrides = overrides_from_str("{\"tumor\": [\"tumor\", \"~PDL1 > 0.25\"]}").unwrap();
        let rules = build_rules(&baseline, Some(overrides.as_slice())).unwrap();

        let names: Vec<&str> = rules.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["tumor", "cd8", "cd68"]);

        let hits: Vec<Vec<bool>> = rules
            .iter()
            .map(|(_, selector)| evaluate(&table, selector).unwrap())
            .collect();
        assert_eq!(hits[0], vec![true, false, false, false]); // tumor & PDL1 > 0.25
        assert_eq!(hits[1], vec![false, false, true, false]); // cd8
        assert_eq!(hits[2], vec![false, false, false, true]); // cd68
    }

    /// Display names for a mixed selector list, as a report legend would
    /// request them.
    #[test]
    fn normalized_names_label_a_report_legend() {
        let terms = selectors_from_str(
            "[\"cd8\", [\"cd8\", \"cd68\"], [[\"cd8\", \"cd68\"]], \"~PDL1 > 0.25\"]",
        )
        .unwrap();
        let mapping = normalize(&terms).unwrap();
        let names: Vec<&str> = mapping.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["cd8", "cd8|cd68", "cd8&cd68", "PDL1 > 0.25"]);
    }
}
