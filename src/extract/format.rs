// src/extract/format.rs

/// Clean raw OCR output into a canonical line-based blob: trim every line,
/// drop blank lines, then strip the `|` separator glyphs OCR injects
/// around table cells. Empty input yields an empty string; callers check
/// for that explicitly rather than treating it as an error.
pub fn format_text(raw: &str) -> String {
    let joined = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    joined.replace('|', "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_lines_and_drops_blanks() {
        let raw = "  Date: 05.03.2024  \n\n   \n\tSTA: 10:30\n";
        assert_eq!(format_text(raw), "Date: 05.03.2024\nSTA: 10:30");
    }

    #[test]
    fn strips_separator_glyphs() {
        let raw = "| Blocks In | 09:45 |";
        assert_eq!(format_text(raw), " Blocks In  09:45 ");
    }

    #[test]
    fn empty_input_is_empty_output() {
        assert_eq!(format_text(""), "");
        assert_eq!(format_text("  \n \n"), "");
    }
}
