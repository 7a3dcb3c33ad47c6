use crate::describe::describe;
use crate::table::Table;

/// Plain-text structure notes for a table: shape, `describe()` statistics and dtypes.
#[must_use]
pub fn structure_summary(table: &Table) -> String {
    let (rows, columns) = table.shape();
    format!(
        "- Shape: {rows} rows x {columns} columns\n\
         - Description (output of .describe()):\n{}\n\
         - Columns with dtypes:\n{}",
        describe(table).render(),
        render_dtypes(table),
    )
}

/// Renders dtypes one column per line, names left-aligned and types right-aligned.
#[must_use]
pub fn render_dtypes(table: &Table) -> String {
    let dtypes = table.dtypes();
    let name_width = dtypes.iter().map(|(name, _)| name.chars().count()).max().unwrap_or(0);
    let type_width = dtypes
        .iter()
        .map(|(_, dtype)| dtype.as_str().len())
        .max()
        .unwrap_or(0);

    let mut lines: Vec<String> = dtypes
        .iter()
        .map(|(name, dtype)| format!("{name:<name_width$}  {:>type_width$}", dtype.as_str()))
        .collect();
    lines.push("dtype: object".to_string());
    lines.join("\n")
}
