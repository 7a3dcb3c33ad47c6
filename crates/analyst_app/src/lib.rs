//! Terminal front end for the data analyst session loop.
//!
//! ## Provider bootstrap
//!
//! The agent is chosen with `DATA_ANALYST_PROVIDER`. The only built-in provider is
//! `mock`, a scripted agent that inspects the dataset and writes one figure; it is
//! also the default.
//!
//! ## Configuration
//!
//! Set `DATA_ANALYST_CONFIG_PATH` to a JSON file to override session settings:
//!
//! ```json
//! {
//!   "figures_dir": "./figures",
//!   "task_template": "...{figures_dir}...{structure_notes}..."
//! }
//! ```
//!
//! Both fields are optional, the template must keep the `{structure_notes}` slot,
//! and unknown fields are rejected. Without a file, `DATA_ANALYST_FIGURES_DIR`
//! overrides the figures directory. `--figures-dir` wins over both.
//!
//! Logs go to stderr and are filtered with `RUST_LOG` (default `warn`).

pub mod app;
pub mod providers;
pub mod render;
