// src/history/mod.rs

use anyhow::{Context, Result};
use chrono::Utc;
use csv::{ReaderBuilder, WriterBuilder};
use std::{
    collections::HashSet,
    fs::{self, OpenOptions},
    path::PathBuf,
};

/// Bookkeeping of which images have already been processed, backed by an
/// append-only CSV so a rerun skips work it has done before.
pub struct History {
    path: PathBuf,
}

impl History {
    /// Construct a History under `history_dir`, creating the directory if
    /// needed.
    pub fn new(history_dir: impl Into<PathBuf>) -> Result<Self> {
        let history_dir = history_dir.into();
        fs::create_dir_all(&history_dir)
            .with_context(|| format!("creating history directory {}", history_dir.display()))?;
        Ok(Self {
            path: history_dir.join("processed.csv"),
        })
    }

    /// Record that `image_name` has been processed, with the event time.
    pub fn record_processed(&self, image_name: &str) -> Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("opening history file {}", self.path.display()))?;
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        let at = Utc::now().to_rfc3339();
        writer
            .write_record([image_name, at.as_str()])
            .context("writing history record")?;
        writer.flush().context("flushing history file")?;
        Ok(())
    }

    /// All image names recorded so far. An absent file is an empty set.
    pub fn load_processed(&self) -> Result<HashSet<String>> {
        let mut set = HashSet::new();
        if !self.path.exists() {
            return Ok(set);
        }
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&self.path)
            .with_context(|| format!("opening history file {}", self.path.display()))?;
        for result in reader.records() {
            let record = result.context("reading history record")?;
            if let Some(name) = record.get(0) {
                set.insert(name.to_string());
            }
        }
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn records_survive_reload() {
        let dir = tempdir().unwrap();
        let history = History::new(dir.path()).unwrap();

        assert!(history.load_processed().unwrap().is_empty());

        history.record_processed("page_1.png").unwrap();
        history.record_processed("page_2.png").unwrap();

        let reloaded = History::new(dir.path()).unwrap();
        let processed = reloaded.load_processed().unwrap();
        assert_eq!(processed.len(), 2);
        assert!(processed.contains("page_1.png"));
        assert!(processed.contains("page_2.png"));
    }

    #[test]
    fn same_page_name_under_two_documents_stays_distinct() {
        let dir = tempdir().unwrap();
        let history = History::new(dir.path()).unwrap();

        history.record_processed("a.pdf/page_1.png").unwrap();

        let processed = history.load_processed().unwrap();
        assert!(processed.contains("a.pdf/page_1.png"));
        // The second document's first page has not been processed yet.
        assert!(!processed.contains("b.pdf/page_1.png"));
    }
}
