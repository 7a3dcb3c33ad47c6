//! Tabular dataset loading for analysis sessions.
//!
//! A [`Table`] is the value bound into the agent's interpreter. Besides raw
//! cells it answers the three structure queries the session prompt needs:
//! shape, per-column dtype, and descriptive statistics.

mod describe;
mod error;
mod load;
mod summary;
mod table;

pub use describe::{describe, CategoricalSummary, Description, NumericSummary};
pub use error::DatasetError;
pub use load::{load_csv, read_csv};
pub use summary::{render_dtypes, structure_summary};
pub use table::{Column, DType, Table, Value, MISSING_TOKENS};
