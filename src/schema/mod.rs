pub mod ddl;
pub mod derive;
pub mod types;
pub mod write;

pub use derive::{derive_kinds, derive_plan, infer_cell};
pub use types::{Column, ColumnKind, RelationPlan, NUMERIC_PRECISION, NUMERIC_SCALE};
pub use write::{read_plan, write_plan};
