use anyhow::Result;
use serde::Serialize;

use cellgate::{
    build_rules, evaluate, overrides_from_str, selector_name, CellRow, CellTable, CellValue,
};

/// Minimal deterministic PRNG (xorshift64*)
struct Rng(u64);

impl Rng {
    fn new(seed: u64) -> Self {
        Rng(seed.max(1))
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.0 = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }
}

/// Build a synthetic per-cell table: a `Phenotype` column drawn from a
/// weighted pool (with a few unclassified cells) and two measurement
/// columns.
fn generate_table(n_cells: usize, rng: &mut Rng) -> CellTable {
    let pool: [(&str, f64); 4] = [
        ("tumor", 0.45),
        ("cd8", 0.20),
        ("cd68", 0.15),
        ("other", 0.18),
    ];

    let mut rows: Vec<CellRow> = Vec::with_capacity(n_cells);
    for _ in 0..n_cells {
        let mut row = CellRow::new();

        let mut pick = rng.next_f64();
        let mut phenotype = CellValue::Null; // remainder: unclassified
        for (name, weight) in pool {
            if pick < weight {
                phenotype = CellValue::from(name);
                break;
            }
            pick -= weight;
        }
        row.insert("Phenotype".to_string(), phenotype);
        row.insert("PDL1".to_string(), CellValue::Float(rng.next_f64()));
        row.insert(
            "Nucleus Area".to_string(),
            CellValue::Float(20.0 + 60.0 * rng.next_f64()),
        );
        rows.push(row);
    }
    CellTable::from_rows(rows)
}

#[derive(Serialize)]
struct RuleCount {
    phenotype: String,
    selector: String,
    cells: usize,
}

#[derive(Serialize)]
struct Summary {
    total_cells: usize,
    rules: Vec<RuleCount>,
}

fn main() -> Result<()> {
    env_logger::init();

    let mut rng = Rng::new(42);
    let table = generate_table(1000, &mut rng);
    log::info!(
        "generated {} cells with columns {:?}",
        table.len(),
        table.column_names
    );

    let baseline: Vec<String> = ["tumor", "cd8", "cd68", "other"].map(String::from).to_vec();
    let overrides = overrides_from_str(
        r#"{"tumor": ["tumor", "~PDL1 > 0.25 & `Nucleus Area` > 30"]}"#,
    )?;
    let rules = build_rules(&baseline, Some(overrides.as_slice()))?;

    let mut counts = Vec::with_capacity(rules.len());
    for (phenotype, selector) in &rules {
        let hits = evaluate(&table, selector)?;
        counts.push(RuleCount {
            phenotype: phenotype.clone(),
            selector: selector_name(selector),
            cells: hits.iter().filter(|&&hit| hit).count(),
        });
    }

    let summary = Summary {
        total_cells: table.len(),
        rules: counts,
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
