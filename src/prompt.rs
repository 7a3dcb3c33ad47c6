use std::path::Path;

pub const FIGURES_DIR_SLOT: &str = "{figures_dir}";
pub const STRUCTURE_NOTES_SLOT: &str = "{structure_notes}";

/// Instructions handed to the agent ahead of the user's request.
pub const TASK_TEMPLATE: &str = "You are an expert full stack data analyst.
You are given a data file and the data structure below.
The data file is passed to you as the variable data_file, it is a dataframe, you can use it directly.
DO NOT try to load data_file, it is already a dataframe pre-loaded in your interpreter!
When plotting save the figures to the (already existing) folder '{figures_dir}': take care to clear
each figure before doing another plot.
When plotting make the plots as visually appealing as possible. Same with tables, charts, or anything else.

Use the data file to answer the question or perform a task below.

Structure of the data:
{structure_notes}

Question/Problem:
";

/// Fills the template slots and appends `request` when it is non-empty.
#[must_use]
pub fn build_prompt(
    template: &str,
    figures_dir: &Path,
    structure_notes: &str,
    request: &str,
) -> String {
    let figures_dir = format!("{}/", figures_dir.display());
    let mut prompt = template
        .replace(FIGURES_DIR_SLOT, &figures_dir)
        .replace(STRUCTURE_NOTES_SLOT, structure_notes);
    if !request.is_empty() {
        prompt.push_str(request);
    }
    prompt
}
