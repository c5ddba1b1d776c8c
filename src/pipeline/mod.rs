// src/pipeline/mod.rs

use anyhow::Result;
use std::path::Path;
use tracing::{error, instrument, warn};

use crate::config::{Config, CropBox, RegionCapture};
use crate::extract::{extract_fields, format_text, ExtractionRule, SparseRecord, NOT_FOUND};
use crate::ocr::{is_error_text, TextSource};

/// A region rule with its pattern cascade compiled.
struct CompiledRegion {
    label: String,
    crop: CropBox,
    capture: CompiledCapture,
}

enum CompiledCapture {
    Patterns(Vec<ExtractionRule>),
    Verbatim(String),
}

impl CompiledRegion {
    /// Field names this region contributes, used to fill misses.
    fn fields(&self) -> Vec<&str> {
        match &self.capture {
            CompiledCapture::Patterns(rules) => rules.iter().map(|r| r.field.as_str()).collect(),
            CompiledCapture::Verbatim(field) => vec![field.as_str()],
        }
    }
}

/// Per-image extraction pipeline: page OCR, formatting, the main pattern
/// cascade, then one OCR pass per configured sub-region. Strictly
/// sequential; callers feed it one image at a time in a stable order
/// because the downstream date normalization depends on row order.
pub struct Processor<'a, S: TextSource> {
    rules: Vec<ExtractionRule>,
    regions: Vec<CompiledRegion>,
    station: Option<String>,
    source: &'a S,
}

impl<'a, S: TextSource> Processor<'a, S> {
    pub fn new(config: &Config, source: &'a S) -> Result<Self> {
        let rules = ExtractionRule::compile(&config.patterns)?;
        let mut regions = Vec::with_capacity(config.regions.len());
        for region in &config.regions {
            let capture = match &region.capture {
                RegionCapture::Patterns { fields } => {
                    CompiledCapture::Patterns(ExtractionRule::compile(fields)?)
                }
                RegionCapture::Verbatim { verbatim } => {
                    CompiledCapture::Verbatim(verbatim.clone())
                }
            };
            regions.push(CompiledRegion {
                label: region.label.clone(),
                crop: region.crop,
                capture,
            });
        }
        Ok(Processor {
            rules,
            regions,
            station: config.station.clone(),
            source,
        })
    }

    /// Extract one sparse record from one page image. `Ok(None)` means the
    /// OCR collaborator failed for the whole page; the image is skipped
    /// and the batch goes on. Per-region failures only blank that
    /// region's fields.
    #[instrument(level = "info", skip(self, image), fields(image = %image.display()))]
    pub fn process_image(&self, image: &Path) -> Result<Option<SparseRecord>> {
        let raw = match self.source.page_text(image) {
            Ok(text) => text,
            Err(err) => {
                error!("page OCR failed: {err:#}");
                return Ok(None);
            }
        };
        if is_error_text(&raw) {
            error!("page OCR reported failure: {}", raw.trim());
            return Ok(None);
        }

        let formatted = format_text(&raw);
        if formatted.is_empty() {
            warn!("page produced no text; skipping image");
            return Ok(None);
        }

        let mut record = extract_fields(&formatted, &self.rules);

        for region in &self.regions {
            self.process_region(image, region, &mut record);
        }

        if let Some(station) = &self.station {
            record.insert("Station".to_string(), station.clone());
        }

        Ok(Some(record))
    }

    /// One OCR pass over a cropped sub-region. Any failure resolves to the
    /// not-found sentinel for every field the region owns.
    fn process_region(&self, image: &Path, region: &CompiledRegion, record: &mut SparseRecord) {
        let text = match self.source.region_text(image, &region.crop) {
            Ok(text) if !is_error_text(&text) => format_text(&text),
            Ok(text) => {
                warn!(region = %region.label, "region OCR reported failure: {}", text.trim());
                String::new()
            }
            Err(err) => {
                warn!(region = %region.label, "region OCR failed: {err:#}");
                String::new()
            }
        };

        if text.is_empty() {
            for field in region.fields() {
                record.insert(field.to_string(), NOT_FOUND.to_string());
            }
            return;
        }

        match &region.capture {
            CompiledCapture::Patterns(rules) => {
                record.extend(extract_fields(&text, rules));
            }
            CompiledCapture::Verbatim(field) => {
                record.insert(field.clone(), text);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use anyhow::anyhow;
    use std::collections::HashMap;
    use std::path::PathBuf;

    /// Canned text source: one page blob plus per-region blobs keyed by
    /// the region's `left` coordinate.
    struct FakeSource {
        page: Result<String, String>,
        regions: HashMap<u32, String>,
    }

    impl TextSource for FakeSource {
        fn page_text(&self, _image: &Path) -> Result<String> {
            self.page.clone().map_err(|e| anyhow!(e))
        }

        fn region_text(&self, _image: &Path, crop: &CropBox) -> Result<String> {
            self.regions
                .get(&crop.left)
                .cloned()
                .ok_or_else(|| anyhow!("no such region"))
        }
    }

    fn config() -> Config {
        let yaml = r#"
patterns:
  - { field: "Date", pattern: 'Date:\s*(\d{2}\.\d{2}\.\d{4})' }
  - { field: "STA", pattern: 'STA:\s*(\d{2}:\d{2})' }
regions:
  - label: arrival coordination
    crop: { left: 1195, top: 130, right: 1400, bottom: 200 }
    fields:
      - { field: "ARR PRN", pattern: '(\d{8})/' }
      - { field: "ARR NAME", pattern: '\d{8}/[A-Z]\.\s*([A-Za-z][A-Za-z\-\.\s]+)' }
  - label: aircraft type
    crop: { left: 650, top: 150, right: 800, bottom: 190 }
    verbatim: "AC Type:"
station: RUH
"#;
        serde_yaml::from_str(yaml).unwrap()
    }

    fn image() -> PathBuf {
        PathBuf::from("page_1.png")
    }

    #[test]
    fn merges_page_and_region_fields() {
        let source = FakeSource {
            page: Ok("Date: 05.03.2024\nSTA: 10:30".to_string()),
            regions: HashMap::from([
                (1195, "15029674/A. Alharbi".to_string()),
                (650, " A320 \n".to_string()),
            ]),
        };
        let processor = Processor::new(&config(), &source).unwrap();
        let record = processor.process_image(&image()).unwrap().unwrap();

        assert_eq!(record["Date"], "05.03.2024");
        assert_eq!(record["STA"], "10:30");
        assert_eq!(record["ARR PRN"], "15029674");
        assert_eq!(record["ARR NAME"], "Alharbi");
        assert_eq!(record["AC Type:"], "A320");
        assert_eq!(record["Station"], "RUH");
    }

    #[test]
    fn page_failure_skips_image_without_error() {
        let source = FakeSource {
            page: Err("ocr exploded".to_string()),
            regions: HashMap::new(),
        };
        let processor = Processor::new(&config(), &source).unwrap();
        assert!(processor.process_image(&image()).unwrap().is_none());
    }

    #[test]
    fn error_prefixed_page_text_never_reaches_extraction() {
        let source = FakeSource {
            page: Ok("Error: cannot open page".to_string()),
            regions: HashMap::new(),
        };
        let processor = Processor::new(&config(), &source).unwrap();
        assert!(processor.process_image(&image()).unwrap().is_none());
    }

    #[test]
    fn region_failure_blanks_only_that_region() {
        let source = FakeSource {
            page: Ok("Date: 05.03.2024".to_string()),
            regions: HashMap::from([(650, "A320".to_string())]),
        };
        let processor = Processor::new(&config(), &source).unwrap();
        let record = processor.process_image(&image()).unwrap().unwrap();

        assert_eq!(record["Date"], "05.03.2024");
        assert_eq!(record["ARR PRN"], NOT_FOUND);
        assert_eq!(record["ARR NAME"], NOT_FOUND);
        assert_eq!(record["AC Type:"], "A320");
    }

    #[test]
    fn end_to_end_record_lands_normalized_in_store() {
        use crate::normalize::NormalizePlan;
        use crate::store::RecordStore;
        use std::io::Write;
        use tempfile::NamedTempFile;

        let yaml = r#"
patterns:
  - { field: "Date", pattern: 'Date:\s*(\d{2}\.\d{2}\.\d{4})' }
  - { field: "STA", pattern: 'STA:\s*(\d{2}:\d{2})' }
  - { field: "ETA", pattern: 'ETA:\s*(\d{2}:\d{2})' }
columns:
  date: Date
  time: [STA, ETA]
station: RUH
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        let plan = NormalizePlan::from_config(&config).unwrap();

        let source = FakeSource {
            page: Ok("Date: 05.03.2024\nSTA: 10:30\nETA: 25:99".to_string()),
            regions: HashMap::new(),
        };
        let processor = Processor::new(&config, &source).unwrap();
        let record = processor.process_image(&image()).unwrap().unwrap();

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "Date,Station,STA,ETA").unwrap();
        file.flush().unwrap();
        let mut store = RecordStore::load(file.path()).unwrap();
        store.append(&record);
        store.commit(&plan).unwrap();

        assert_eq!(
            store.table.rows,
            vec![vec![
                "03/05/2024".to_string(),
                "RUH".to_string(),
                "10:30".to_string(),
                String::new(),
            ]]
        );
    }

    #[test]
    fn error_prefixed_region_text_counts_as_miss() {
        let source = FakeSource {
            page: Ok("Date: 05.03.2024".to_string()),
            regions: HashMap::from([
                (1195, "Error: crop out of bounds".to_string()),
                (650, "A320".to_string()),
            ]),
        };
        let processor = Processor::new(&config(), &source).unwrap();
        let record = processor.process_image(&image()).unwrap().unwrap();
        assert_eq!(record["ARR PRN"], NOT_FOUND);
    }
}
