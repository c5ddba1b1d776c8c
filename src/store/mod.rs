// src/store/mod.rs

use anyhow::{bail, Context, Result};
use csv::{ReaderBuilder, WriterBuilder};
use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

use crate::extract::{SparseRecord, NOT_FOUND};
use crate::normalize::{field, NormalizePlan};

/// An in-memory flat table: header row plus string rows. Every row always
/// has exactly one cell per header; absent values are empty strings.
#[derive(Debug, Clone)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    fn column(&self, idx: usize) -> Vec<String> {
        self.rows.iter().map(|row| row[idx].clone()).collect()
    }

    fn set_column(&mut self, idx: usize, cells: Vec<String>) {
        for (row, cell) in self.rows.iter_mut().zip(cells) {
            row[idx] = cell;
        }
    }

    /// Rewrite one named column in place with `f`, which receives the full
    /// column in row order. Missing columns are a warning, not an error:
    /// the persisted schema owns the column set.
    fn rewrite_column<F>(&mut self, name: &str, f: F)
    where
        F: FnOnce(&mut [String]),
    {
        match self.column_index(name) {
            Some(idx) => {
                let mut cells = self.column(idx);
                f(&mut cells);
                self.set_column(idx, cells);
            }
            None => warn!(column = name, "store schema is missing configured column; skipping"),
        }
    }
}

/// The persistent record store: a pre-existing CSV whose header row is the
/// fixed schema. Loaded in full, mutated in memory, rewritten atomically.
/// Single-writer by design; there is no locking beyond that discipline.
pub struct RecordStore {
    path: PathBuf,
    pub table: Table,
}

impl RecordStore {
    /// Load the store from an existing CSV. The schema is the file's
    /// header row; the store is loaded, never created, so a missing or
    /// headerless file is an error.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut reader = ReaderBuilder::new()
            .flexible(true)
            .from_path(&path)
            .with_context(|| format!("opening store {}", path.display()))?;

        let headers: Vec<String> = reader
            .headers()
            .with_context(|| format!("reading store header {}", path.display()))?
            .iter()
            .map(|h| h.to_string())
            .collect();
        if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
            bail!("store {} has no schema header row", path.display());
        }

        let mut rows = Vec::new();
        for (idx, result) in reader.records().enumerate() {
            let record = result
                .with_context(|| format!("CSV parse error in store at record {}", idx))?;
            let mut row: Vec<String> = record.iter().map(|c| c.to_string()).collect();
            // Ragged historical rows are padded/truncated to the schema.
            row.resize(headers.len(), String::new());
            rows.push(row);
        }

        info!(
            rows = rows.len(),
            columns = headers.len(),
            "loaded store {}",
            path.display()
        );
        Ok(RecordStore {
            path,
            table: Table { headers, rows },
        })
    }

    /// Align a sparse record to the schema and append one row: fields the
    /// schema does not know are dropped, schema columns the record lacks
    /// are filled with the empty marker. No normalization happens here.
    pub fn append(&mut self, record: &SparseRecord) {
        let row: Vec<String> = self
            .table
            .headers
            .iter()
            .map(|column| record.get(column).cloned().unwrap_or_default())
            .collect();
        self.table.rows.push(row);
    }

    /// One batch normalize-and-persist pass per run: per-kind normalizers
    /// over every classified column (the date fold needs the full column in
    /// row order; the stateless kinds are idempotent), sentinel
    /// replacement, the cosmetic scrubs, dedupe keeping the first
    /// occurrence, then an atomic rewrite of the backing file.
    pub fn commit(&mut self, plan: &NormalizePlan) -> Result<()> {
        for (column, kind) in &plan.kinds {
            let kind = *kind;
            self.table
                .rewrite_column(column, |cells| plan.apply(kind, cells));
        }

        for row in &mut self.table.rows {
            for cell in row.iter_mut() {
                if cell == NOT_FOUND {
                    cell.clear();
                }
            }
        }

        if let (Some(column), Some(noise)) = (&plan.aircraft_column, &plan.aircraft_noise) {
            self.table.rewrite_column(column, |cells| {
                for cell in cells.iter_mut() {
                    *cell = field::scrub_aircraft(cell, noise);
                }
            });
        }

        for column in &plan.name_columns {
            self.table.rewrite_column(column, |cells| {
                for cell in cells.iter_mut() {
                    *cell = field::scrub_name(cell);
                }
            });
        }

        let before = self.table.rows.len();
        let mut seen: HashSet<Vec<String>> = HashSet::with_capacity(before);
        self.table.rows.retain(|row| seen.insert(row.clone()));
        debug!(
            dropped = before - self.table.rows.len(),
            kept = self.table.rows.len(),
            "dedupe pass"
        );

        self.persist()
    }

    /// Write the whole table to a temp file next to the store, then rename
    /// it over the original so readers never observe a partial write.
    fn persist(&self) -> Result<()> {
        let tmp_path = self.path.with_extension("csv.tmp");
        {
            let mut writer = WriterBuilder::new()
                .from_path(&tmp_path)
                .with_context(|| format!("creating temp store {}", tmp_path.display()))?;
            writer
                .write_record(&self.table.headers)
                .context("writing store header")?;
            for row in &self.table.rows {
                writer.write_record(row).context("writing store row")?;
            }
            writer.flush().context("flushing store")?;
        }
        fs::rename(&tmp_path, &self.path).with_context(|| {
            format!(
                "renaming {} to {}",
                tmp_path.display(),
                self.path.display()
            )
        })?;
        info!(rows = self.table.rows.len(), "persisted {}", self.path.display());
        Ok(())
    }
}
