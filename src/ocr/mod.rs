// src/ocr/mod.rs

pub mod tesseract;

pub use tesseract::TesseractSource;

use anyhow::Result;
use std::path::Path;

use crate::config::CropBox;

/// Failure prefix some OCR frontends emit on stdout instead of text. Any
/// returned text carrying it is a collaborator failure and must never
/// reach formatting or extraction.
pub const ERROR_PREFIX: &str = "Error:";

pub fn is_error_text(text: &str) -> bool {
    text.trim_start().starts_with(ERROR_PREFIX)
}

/// Source of recognized text for a page image, and for labeled sub-regions
/// of it. The pipeline treats every error as data: the affected image or
/// region is skipped, the batch continues.
pub trait TextSource {
    /// Recognized text for the whole page.
    fn page_text(&self, image: &Path) -> Result<String>;

    /// Recognized text for one cropped sub-region of the page.
    fn region_text(&self, image: &Path, crop: &CropBox) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_error_prefixed_text() {
        assert!(is_error_text("Error: cannot open image"));
        assert!(is_error_text("  Error: boom"));
        assert!(!is_error_text("Date: 05.03.2024"));
        assert!(!is_error_text(""));
    }
}
