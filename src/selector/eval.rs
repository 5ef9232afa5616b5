use crate::error::{Result, SelectorError};
use crate::model::CellTable;
use crate::selector::Selector;

// ---------------------------------------------------------------------------
// Phenotype encoding – classified once per evaluation
// ---------------------------------------------------------------------------

/// How the table encodes phenotype calls. Exactly one convention applies to
/// a given table; a column named exactly `Phenotype` wins if both patterns
/// are present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PhenotypeEncoding {
    /// One shared `Phenotype` column holding the phenotype name per row.
    SingleColumn,
    /// One `Phenotype <name>` column per phenotype, holding `<name>+`,
    /// `<name>-`, or null.
    PerPhenotype,
}

const PHENOTYPE_COLUMN: &str = "Phenotype";
const PHENOTYPE_PREFIX: &str = "Phenotype ";

fn classify(table: &CellTable) -> Option<PhenotypeEncoding> {
    if table.has_column(PHENOTYPE_COLUMN) {
        Some(PhenotypeEncoding::SingleColumn)
    } else if table
        .column_names
        .iter()
        .any(|c| c.starts_with(PHENOTYPE_PREFIX))
    {
        Some(PhenotypeEncoding::PerPhenotype)
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Evaluator
// ---------------------------------------------------------------------------

/// Evaluate a selector against a table, producing one boolean per row.
///
/// Missing values never match and never propagate: the output is strictly
/// boolean. Structural problems (unknown columns, unknown phenotypes,
/// malformed definitions) fail the whole call instead of degrading to an
/// empty selection.
pub fn evaluate(table: &CellTable, selector: &Selector) -> Result<Vec<bool>> {
    let encoding = classify(table);
    log::debug!(
        "evaluating selector over {} rows ({:?} phenotype encoding)",
        table.len(),
        encoding
    );
    eval_term(table, encoding, selector)
}

/// Evaluate a list of selectors as one composite (logical AND), the unified
/// "selector or list of selectors" entry point. An empty list is the
/// explicit no-selector case and keeps every row.
pub fn evaluate_all(table: &CellTable, selectors: &[Selector]) -> Result<Vec<bool>> {
    if selectors.is_empty() {
        return Ok(vec![true; table.len()]);
    }
    let encoding = classify(table);
    let mut combined = vec![true; table.len()];
    for selector in selectors {
        let term = eval_term(table, encoding, selector)?;
        for (acc, hit) in combined.iter_mut().zip(term) {
            *acc = *acc && hit;
        }
    }
    Ok(combined)
}

fn eval_term(
    table: &CellTable,
    encoding: Option<PhenotypeEncoding>,
    selector: &Selector,
) -> Result<Vec<bool>> {
    match selector {
        Selector::All => Ok(vec![true; table.len()]),
        Selector::Name(name) => eval_name(table, encoding, name),
        Selector::AnyOf(names) => {
            if names.is_empty() {
                return Err(SelectorError::EmptySelector { kind: "name-set" });
            }
            let mut combined = vec![false; table.len()];
            for name in names {
                let term = eval_name(table, encoding, name)?;
                for (acc, hit) in combined.iter_mut().zip(term) {
                    *acc = *acc || hit;
                }
            }
            Ok(combined)
        }
        Selector::AllOf(elements) => {
            if elements.is_empty() {
                return Err(SelectorError::EmptySelector { kind: "composite" });
            }
            let mut combined = vec![true; table.len()];
            for element in elements {
                let term = eval_term(table, encoding, element)?;
                for (acc, hit) in combined.iter_mut().zip(term) {
                    *acc = *acc && hit;
                }
            }
            Ok(combined)
        }
        Selector::Expr(expression) => {
            expression.validate_columns(table)?;
            Ok(table
                .rows
                .iter()
                .map(|row| expression.matches_row(row))
                .collect())
        }
    }
}

/// Match a single phenotype name under the table's encoding.
fn eval_name(
    table: &CellTable,
    encoding: Option<PhenotypeEncoding>,
    name: &str,
) -> Result<Vec<bool>> {
    match encoding {
        None => Err(SelectorError::NoPhenotypeColumns),
        Some(PhenotypeEncoding::SingleColumn) => Ok(table
            .rows
            .iter()
            .map(|row| {
                row.get(PHENOTYPE_COLUMN)
                    .and_then(|v| v.as_str())
                    .map(|v| v == name)
                    .unwrap_or(false)
            })
            .collect()),
        Some(PhenotypeEncoding::PerPhenotype) => {
            // `CD8` and `CD8+` both request the positive call; `CD8-` the
            // negative one.
            let (base, sign) = match name.strip_suffix('-') {
                Some(base) => (base, '-'),
                None => (name.strip_suffix('+').unwrap_or(name), '+'),
            };
            let column = format!("{PHENOTYPE_PREFIX}{base}");
            if !table.has_column(&column) {
                return Err(SelectorError::UnknownPhenotype {
                    name: name.to_string(),
                    column,
                });
            }
            let target = format!("{base}{sign}");
            Ok(table
                .rows
                .iter()
                .map(|row| {
                    row.get(&column)
                        .and_then(|v| v.as_str())
                        .map(|v| v == target)
                        .unwrap_or(false)
                })
                .collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CellRow, CellValue};
    use crate::selector::expr::Expression;

    fn row(pairs: &[(&str, CellValue)]) -> CellRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    /// `Phenotype = [tumor, tumor, tumor, cd8, cd8, NA]`,
    /// `E2 = [1, 1, 2, 2, 1, NA]`.
    fn single_column_table() -> CellTable {
        let phenotypes = ["tumor", "tumor", "tumor", "cd8", "cd8"];
        let e2 = [1.0, 1.0, 2.0, 2.0, 1.0];
        let mut rows: Vec<CellRow> = phenotypes
            .iter()
            .zip(e2)
            .map(|(p, v)| row(&[("Phenotype", (*p).into()), ("E2", v.into())]))
            .collect();
        rows.push(row(&[
            ("Phenotype", CellValue::Null),
            ("E2", CellValue::Null),
        ]));
        CellTable::from_rows(rows)
    }

    /// Per-phenotype-column form: `Phenotype CD8` and `Phenotype CD68`.
    fn per_phenotype_table() -> CellTable {
        let calls = [("CD8+", "CD68-"), ("CD8-", "CD68+"), ("CD8+", "CD68+")];
        let mut rows: Vec<CellRow> = calls
            .iter()
            .map(|(cd8, cd68)| {
                row(&[
                    ("Phenotype CD8", (*cd8).into()),
                    ("Phenotype CD68", (*cd68).into()),
                ])
            })
            .collect();
        rows.push(row(&[
            ("Phenotype CD8", CellValue::Null),
            ("Phenotype CD68", CellValue::Null),
        ]));
        CellTable::from_rows(rows)
    }

    #[test]
    fn wildcard_keeps_every_row_in_both_encodings() {
        for table in [single_column_table(), per_phenotype_table()] {
            let hits = evaluate(&table, &Selector::All).unwrap();
            assert_eq!(hits, vec![true; table.len()]);
        }
    }

    #[test]
    fn empty_selector_list_keeps_every_row() {
        let table = single_column_table();
        assert_eq!(evaluate_all(&table, &[]).unwrap(), vec![true; 6]);
    }

    #[test]
    fn single_name_matches_exactly_and_null_never_matches() {
        let table = single_column_table();
        let hits = evaluate(&table, &Selector::name("cd8")).unwrap();
        assert_eq!(hits, vec![false, false, false, true, true, false]);

        // Case-sensitive.
        let hits = evaluate(&table, &Selector::name("CD8")).unwrap();
        assert_eq!(hits, vec![false; 6]);
    }

    #[test]
    fn name_set_is_rowwise_or_of_members() {
        let table = single_column_table();
        let both = evaluate(&table, &Selector::any_of(["tumor", "cd8"])).unwrap();
        let tumor = evaluate(&table, &Selector::name("tumor")).unwrap();
        let cd8 = evaluate(&table, &Selector::name("cd8")).unwrap();
        let expected: Vec<bool> = tumor.iter().zip(&cd8).map(|(a, b)| *a || *b).collect();
        assert_eq!(both, expected);
        assert_eq!(both, vec![true, true, true, true, true, false]);
    }

    #[test]
    fn composite_of_disjoint_phenotypes_is_all_false() {
        let table = single_column_table();
        let hits = evaluate_all(&table, &[Selector::name("tumor"), Selector::name("cd8")]).unwrap();
        assert_eq!(hits, vec![false; 6]);
    }

    #[test]
    fn composite_with_expression_is_order_independent() {
        let table = single_column_table();
        let expr = || Selector::Expr(Expression::parse("~E2 == 1").unwrap());
        let a = evaluate_all(&table, &[Selector::name("cd8"), expr()]).unwrap();
        let b = evaluate_all(&table, &[expr(), Selector::name("cd8")]).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, vec![false, false, false, false, true, false]);
    }

    #[test]
    fn nested_composite_matches_top_level_list() {
        let table = single_column_table();
        let nested = Selector::AllOf(vec![
            Selector::name("cd8"),
            Selector::Expr(Expression::parse("~E2 == 1").unwrap()),
        ]);
        let hits = evaluate(&table, &nested).unwrap();
        assert_eq!(hits, vec![false, false, false, false, true, false]);
    }

    #[test]
    fn expression_missing_values_are_false_not_errors() {
        let table = single_column_table();
        let hits = evaluate(
            &table,
            &Selector::Expr(Expression::parse("~E2 >= 1").unwrap()),
        )
        .unwrap();
        assert_eq!(hits.len(), 6);
        assert!(!hits[5]);
    }

    #[test]
    fn unknown_column_is_structural_and_echoes_source() {
        let table = single_column_table();
        let err = evaluate(
            &table,
            &Selector::Expr(Expression::parse("~Missing == 1").unwrap()),
        )
        .unwrap_err();
        assert!(err.to_string().contains("~Missing == 1"), "error: {err}");
    }

    #[test]
    fn per_phenotype_sign_handling() {
        let table = per_phenotype_table();

        // Sign-less name requests the positive call.
        let pos = evaluate(&table, &Selector::name("CD8")).unwrap();
        assert_eq!(pos, vec![true, false, true, false]);
        let explicit = evaluate(&table, &Selector::name("CD8+")).unwrap();
        assert_eq!(explicit, pos);

        let neg = evaluate(&table, &Selector::name("CD8-")).unwrap();
        assert_eq!(neg, vec![false, true, false, false]);

        let double = evaluate_all(
            &table,
            &[Selector::name("CD8+"), Selector::name("CD68+")],
        )
        .unwrap();
        assert_eq!(double, vec![false, false, true, false]);
    }

    #[test]
    fn unknown_phenotype_column_is_structural() {
        let table = per_phenotype_table();
        let err = evaluate(&table, &Selector::name("CD3")).unwrap_err();
        assert_eq!(
            err,
            SelectorError::UnknownPhenotype {
                name: "CD3".to_string(),
                column: "Phenotype CD3".to_string(),
            }
        );
    }

    #[test]
    fn table_without_phenotype_columns_rejects_name_selectors() {
        let table = CellTable::from_rows(vec![row(&[("E2", 1.0.into())])]);
        let err = evaluate(&table, &Selector::name("cd8")).unwrap_err();
        assert_eq!(err, SelectorError::NoPhenotypeColumns);

        // Wildcard and pure expressions still evaluate.
        assert_eq!(evaluate(&table, &Selector::All).unwrap(), vec![true]);
        let hits = evaluate(
            &table,
            &Selector::Expr(Expression::parse("E2 == 1").unwrap()),
        )
        .unwrap();
        assert_eq!(hits, vec![true]);
    }

    #[test]
    fn empty_name_set_and_composite_are_rejected() {
        let table = single_column_table();
        assert_eq!(
            evaluate(&table, &Selector::AnyOf(vec![])).unwrap_err(),
            SelectorError::EmptySelector { kind: "name-set" }
        );
        assert_eq!(
            evaluate(&table, &Selector::AllOf(vec![])).unwrap_err(),
            SelectorError::EmptySelector { kind: "composite" }
        );
    }
}
