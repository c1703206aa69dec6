//! Data module - CSV loading, normalization and reshaping

mod loader;
mod processor;
mod record;

pub use loader::DataLoader;
pub use processor::{Crosstab, DataProcessor};
pub use record::{Report, ReportKind};
