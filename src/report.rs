// SORTSWEEP REPORT ASSEMBLER
// PROJECTS THE RESULTS TABLE INTO THE SHAPES WRITERS AND PLOTTERS CONSUME:
//   FLAT TABLE    ONE ROW PER ARRAY SIZE, ONE COLUMN PER VARIANT x DEGREE
//   BEST          FASTEST PRESENT MEASUREMENT PER ARRAY SIZE
//   BEST DEGREE   FASTEST DEGREE PER (VARIANT, ARRAY SIZE)
//
// ABSENT MEASUREMENTS ARE None HERE AND AN EMPTY CELL ON DISK. NEVER ZERO.
// ORDER IS DETERMINISTIC: SIZES ASCENDING, COLUMNS IN DECLARED ORDER.

use crate::config::SweepConfig;
use crate::metrics::MetricDeriver;
use crate::table::ResultsTable;

pub const EMPTY_CELL: &str = "";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Column {
    pub variant: String,
    pub degree: u32,
    pub label: String,
}

pub fn columns(config: &SweepConfig) -> Vec<Column> {
    config
        .variants
        .iter()
        .flat_map(|v| {
            v.sorted_degrees().into_iter().map(move |d| Column {
                variant: v.name.clone(),
                degree: d,
                label: v.column_label(d),
            })
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq)]
pub struct FlatRow {
    pub array_size: u64,
    pub cells: Vec<Option<f64>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FlatTable {
    pub columns: Vec<Column>,
    pub rows: Vec<FlatRow>,
}

impl FlatTable {
    pub fn build(config: &SweepConfig, table: &ResultsTable) -> Self {
        let columns = columns(config);
        let rows = config
            .sorted_sizes()
            .into_iter()
            .map(|size| FlatRow {
                array_size: size,
                cells: columns
                    .iter()
                    .map(|c| table.measurement(&c.variant, size, c.degree).map(|m| m.mean))
                    .collect(),
            })
            .collect();
        Self { columns, rows }
    }

    pub fn header(&self) -> Vec<String> {
        std::iter::once("array_size".to_string())
            .chain(self.columns.iter().map(|c| c.label.clone()))
            .collect()
    }

    // CELLS AS TEXT: TWO DECIMALS, EMPTY_CELL FOR ABSENT
    pub fn records(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|r| {
                std::iter::once(r.array_size.to_string())
                    .chain(r.cells.iter().map(|c| format_cell(*c)))
                    .collect()
            })
            .collect()
    }
}

pub fn format_cell(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}", v),
        None => EMPTY_CELL.to_string(),
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BestPerformer {
    pub array_size: u64,
    pub variant: String,
    pub degree: u32,
    pub mean_ms: f64,
    // AGAINST THE WINNER'S OWN FAMILY BASELINE
    pub speedup: Option<f64>,
}

/// Fastest present measurement at each array size. Ties go to the variant
/// declared first, then the lower degree. Sizes with nothing measured are
/// omitted.
pub fn best_performers(config: &SweepConfig, table: &ResultsTable) -> Vec<BestPerformer> {
    let deriver = MetricDeriver::new(config, table);
    let mut out = Vec::new();
    for size in config.sorted_sizes() {
        let mut best: Option<BestPerformer> = None;
        for v in &config.variants {
            for degree in v.sorted_degrees() {
                let Some(m) = table.measurement(&v.name, size, degree) else {
                    continue;
                };
                if best.as_ref().map_or(true, |b| m.mean < b.mean_ms) {
                    best = Some(BestPerformer {
                        array_size: size,
                        variant: v.name.clone(),
                        degree,
                        mean_ms: m.mean,
                        speedup: deriver.compare(v, size, degree).map(|c| c.speedup),
                    });
                }
            }
        }
        out.extend(best);
    }
    out
}

/// Fastest degree of each variant at each array size (variants in declared
/// order, sizes ascending within a variant).
pub fn best_degrees(config: &SweepConfig, table: &ResultsTable) -> Vec<BestPerformer> {
    let deriver = MetricDeriver::new(config, table);
    let mut out = Vec::new();
    for v in &config.variants {
        for size in config.sorted_sizes() {
            let mut best: Option<BestPerformer> = None;
            for degree in v.sorted_degrees() {
                let Some(m) = table.measurement(&v.name, size, degree) else {
                    continue;
                };
                if best.as_ref().map_or(true, |b| m.mean < b.mean_ms) {
                    best = Some(BestPerformer {
                        array_size: size,
                        variant: v.name.clone(),
                        degree,
                        mean_ms: m.mean,
                        speedup: deriver.compare(v, size, degree).map(|c| c.speedup),
                    });
                }
            }
            out.extend(best);
        }
    }
    out
}
