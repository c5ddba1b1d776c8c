pub mod format;
pub mod rules;

pub use format::format_text;
pub use rules::{extract_fields, ExtractionRule, SparseRecord, NOT_FOUND};
