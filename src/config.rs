// src/config.rs

use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;
use std::{fs, path::Path};

/// One entry of the ordered extraction cascade: a field name plus a regex
/// with a single capture group. Rules are independent of each other; order
/// is preserved from the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct PatternRule {
    pub field: String,
    pub pattern: String,
}

/// Pixel rectangle of a page sub-region. A `right` or `bottom` of 0 means
/// "to the image edge".
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CropBox {
    pub left: u32,
    pub top: u32,
    #[serde(default)]
    pub right: u32,
    #[serde(default)]
    pub bottom: u32,
}

/// How the OCR text of a cropped region turns into record fields.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RegionCapture {
    /// Run a pattern cascade over the region text.
    Patterns { fields: Vec<PatternRule> },
    /// The whole formatted region text becomes this one field.
    Verbatim { verbatim: String },
}

/// A labeled sub-region of the page fed through a separate OCR pass.
#[derive(Debug, Clone, Deserialize)]
pub struct RegionRule {
    pub label: String,
    pub crop: CropBox,
    #[serde(flatten)]
    pub capture: RegionCapture,
}

/// Classification of store columns into normalizer kinds. Columns not
/// listed anywhere pass through verbatim.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ColumnConfig {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub flight: Vec<String>,
    #[serde(default)]
    pub airport: Vec<String>,
    #[serde(default)]
    pub time: Vec<String>,
    #[serde(default)]
    pub identifier: Vec<String>,
    #[serde(default)]
    pub name: Vec<String>,
    #[serde(default)]
    pub aircraft: Option<String>,
}

/// Externally supplied configuration: the pattern table, region layout,
/// column classification and the OCR-noise token lists.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub patterns: Vec<PatternRule>,
    #[serde(default)]
    pub regions: Vec<RegionRule>,
    #[serde(default)]
    pub columns: ColumnConfig,
    /// Alphabetic tokens that are known OCR mis-extractions of a person
    /// name (column headers and the like); rejected even though they pass
    /// the alphabetic check.
    #[serde(default)]
    pub reject_names: Vec<String>,
    /// Literal tokens scrubbed out of the free-text aircraft-type column.
    #[serde(default)]
    pub aircraft_noise: Vec<String>,
    /// Station code stamped onto every record, if set.
    #[serde(default)]
    pub station: Option<String>,
}

impl Config {
    /// Load and validate a YAML rules file. Every pattern must compile;
    /// a broken rule is a config error, not a runtime surprise.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading rules file {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&text)
            .with_context(|| format!("parsing rules file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        for rule in self.all_pattern_rules() {
            Regex::new(&rule.pattern)
                .with_context(|| format!("invalid pattern for field `{}`", rule.field))?;
        }
        Ok(())
    }

    /// All pattern rules: the main cascade plus every region cascade.
    pub fn all_pattern_rules(&self) -> impl Iterator<Item = &PatternRule> {
        self.patterns.iter().chain(
            self.regions
                .iter()
                .filter_map(|r| match &r.capture {
                    RegionCapture::Patterns { fields } => Some(fields.iter()),
                    RegionCapture::Verbatim { .. } => None,
                })
                .flatten(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_region_captures() {
        let yaml = r#"
patterns:
  - { field: "Date", pattern: 'Date:\s*(\d{2}\.\d{2}\.\d{4})' }
regions:
  - label: arrival coordination
    crop: { left: 1195, top: 130, right: 1400, bottom: 200 }
    fields:
      - { field: "ARR PRN", pattern: '(\d{8})/' }
  - label: aircraft type
    crop: { left: 650, top: 150, right: 800, bottom: 190 }
    verbatim: "AC Type:"
columns:
  date: Date
  time: [STA, ETA]
reject_names: [Form, Data]
station: RUH
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        config.validate().unwrap();

        assert_eq!(config.patterns.len(), 1);
        assert_eq!(config.regions.len(), 2);
        assert!(matches!(
            config.regions[0].capture,
            RegionCapture::Patterns { .. }
        ));
        assert!(matches!(
            config.regions[1].capture,
            RegionCapture::Verbatim { .. }
        ));
        assert_eq!(config.regions[1].crop.right, 800);
        assert_eq!(config.columns.date.as_deref(), Some("Date"));
        assert_eq!(config.station.as_deref(), Some("RUH"));
    }

    #[test]
    fn rejects_broken_pattern() {
        let yaml = r#"
patterns:
  - { field: "Date", pattern: '([unclosed' }
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_err());
    }
}
