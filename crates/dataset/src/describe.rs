use std::collections::HashMap;

use crate::table::{Column, Table};

/// Descriptive statistics for one numeric column.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericSummary {
    pub column: String,
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

/// Frequency statistics for one non-numeric column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoricalSummary {
    pub column: String,
    pub count: usize,
    pub unique: usize,
    pub top: Option<String>,
    pub freq: usize,
}

/// Result of [`describe`]. Numeric columns win when any exist; otherwise every column
/// is summarized by frequency.
#[derive(Debug, Clone, PartialEq)]
pub enum Description {
    Numeric(Vec<NumericSummary>),
    Categorical(Vec<CategoricalSummary>),
}

const NUMERIC_ROWS: [&str; 8] = ["count", "mean", "std", "min", "25%", "50%", "75%", "max"];
const CATEGORICAL_ROWS: [&str; 4] = ["count", "unique", "top", "freq"];

#[must_use]
pub fn describe(table: &Table) -> Description {
    let numeric: Vec<NumericSummary> = table
        .columns()
        .iter()
        .filter(|column| column.dtype().is_numeric())
        .map(summarize_numeric)
        .collect();

    if numeric.is_empty() {
        Description::Categorical(table.columns().iter().map(summarize_categorical).collect())
    } else {
        Description::Numeric(numeric)
    }
}

impl Description {
    /// Renders statistics as a right-aligned grid with one column per dataset column.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Numeric(summaries) => {
                let headers = summaries.iter().map(|s| s.column.clone()).collect();
                let columns = summaries
                    .iter()
                    .map(|s| {
                        vec![
                            format_stat(s.count as f64),
                            format_stat(s.mean),
                            format_stat(s.std),
                            format_stat(s.min),
                            format_stat(s.q25),
                            format_stat(s.median),
                            format_stat(s.q75),
                            format_stat(s.max),
                        ]
                    })
                    .collect();
                render_grid(&NUMERIC_ROWS, headers, columns)
            }
            Self::Categorical(summaries) => {
                let headers = summaries.iter().map(|s| s.column.clone()).collect();
                let columns = summaries
                    .iter()
                    .map(|s| {
                        vec![
                            s.count.to_string(),
                            s.unique.to_string(),
                            s.top.clone().unwrap_or_else(|| "NaN".to_string()),
                            s.freq.to_string(),
                        ]
                    })
                    .collect();
                render_grid(&CATEGORICAL_ROWS, headers, columns)
            }
        }
    }
}

fn summarize_numeric(column: &Column) -> NumericSummary {
    let mut values = column.numeric_values();
    values.sort_by(f64::total_cmp);

    let count = values.len();
    let mean = if count == 0 {
        f64::NAN
    } else {
        values.iter().sum::<f64>() / count as f64
    };
    let std = if count < 2 {
        f64::NAN
    } else {
        let squared: f64 = values.iter().map(|value| (value - mean).powi(2)).sum();
        (squared / (count - 1) as f64).sqrt()
    };

    NumericSummary {
        column: column.name().to_string(),
        count,
        mean,
        std,
        min: values.first().copied().unwrap_or(f64::NAN),
        q25: quantile(&values, 0.25),
        median: quantile(&values, 0.5),
        q75: quantile(&values, 0.75),
        max: values.last().copied().unwrap_or(f64::NAN),
    }
}

fn summarize_categorical(column: &Column) -> CategoricalSummary {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut first_seen: Vec<String> = Vec::new();

    for value in column.values().iter().filter(|value| !value.is_missing()) {
        let key = value.to_string();
        let entry = counts.entry(key.clone()).or_insert(0);
        if *entry == 0 {
            first_seen.push(key);
        }
        *entry += 1;
    }

    // Ties resolve to the value seen first.
    let mut top: Option<(String, usize)> = None;
    for key in first_seen {
        let freq = counts[&key];
        if top.as_ref().map_or(true, |(_, best)| freq > *best) {
            top = Some((key, freq));
        }
    }

    CategoricalSummary {
        column: column.name().to_string(),
        count: column.non_missing_count(),
        unique: counts.len(),
        freq: top.as_ref().map_or(0, |(_, freq)| *freq),
        top: top.map(|(value, _)| value),
    }
}

/// Linear-interpolated quantile over already sorted values.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }

    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

fn format_stat(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else {
        format!("{value:.6}")
    }
}

pub(crate) fn render_grid(
    row_labels: &[&str],
    headers: Vec<String>,
    columns: Vec<Vec<String>>,
) -> String {
    let label_width = row_labels.iter().map(|label| label.len()).max().unwrap_or(0);
    let widths: Vec<usize> = headers
        .iter()
        .zip(&columns)
        .map(|(header, cells)| {
            cells
                .iter()
                .map(|cell| cell.chars().count())
                .chain(std::iter::once(header.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut lines = Vec::with_capacity(row_labels.len() + 1);
    let mut header_line = " ".repeat(label_width);
    for (header, width) in headers.iter().zip(&widths) {
        header_line.push_str(&format!("  {header:>width$}"));
    }
    lines.push(header_line);

    for (row, label) in row_labels.iter().enumerate() {
        let mut line = format!("{label:<label_width$}");
        for (cells, width) in columns.iter().zip(&widths) {
            let cell = cells.get(row).map(String::as_str).unwrap_or("");
            line.push_str(&format!("  {cell:>width$}"));
        }
        lines.push(line);
    }

    lines.join("\n")
}
