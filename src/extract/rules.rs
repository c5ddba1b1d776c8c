// src/extract/rules.rs

use anyhow::{Context, Result};
use regex::Regex;
use std::collections::BTreeMap;

use crate::config::PatternRule;

/// Sentinel recorded when a rule found no match. Distinct from a genuine
/// empty value; replaced with the empty marker at commit time.
pub const NOT_FOUND: &str = "Not found";

/// One extraction pass over one source text produces a sparse field→value
/// mapping with exactly one entry per rule.
pub type SparseRecord = BTreeMap<String, String>;

/// A compiled extraction rule: field name plus a regex whose first capture
/// group is the field value.
#[derive(Debug, Clone)]
pub struct ExtractionRule {
    pub field: String,
    pub pattern: Regex,
}

impl ExtractionRule {
    /// Compile an ordered rule table, preserving order.
    pub fn compile(rules: &[PatternRule]) -> Result<Vec<ExtractionRule>> {
        rules
            .iter()
            .map(|rule| {
                let pattern = Regex::new(&rule.pattern)
                    .with_context(|| format!("compiling pattern for field `{}`", rule.field))?;
                Ok(ExtractionRule {
                    field: rule.field.clone(),
                    pattern,
                })
            })
            .collect()
    }

    /// First match of this rule's pattern anywhere in `text`. Returns the
    /// first capture group, or `None` when the pattern misses or the group
    /// did not participate (optional-capture patterns).
    pub fn extract(&self, text: &str) -> Option<String> {
        self.pattern
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }
}

/// Run the whole cascade against the same full text. Rules are evaluated
/// independently; a miss records the [`NOT_FOUND`] sentinel, so the output
/// always carries one entry per rule.
pub fn extract_fields(text: &str, rules: &[ExtractionRule]) -> SparseRecord {
    let mut record = SparseRecord::new();
    for rule in rules {
        let value = rule
            .extract(text)
            .unwrap_or_else(|| NOT_FOUND.to_string());
        record.insert(rule.field.clone(), value);
    }
    record
}
