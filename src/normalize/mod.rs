// src/normalize/mod.rs

pub mod date;
pub mod field;

use anyhow::Result;
use regex::Regex;
use std::collections::HashSet;

use crate::config::Config;

/// Semantic type of a store column, deciding which normalizer runs over it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    FlightCode,
    AirportCode,
    TimeOfDay,
    Identifier8,
    PersonName,
    Date,
}

/// The per-column normalization plan derived from config: which columns get
/// which normalizer, plus the post-process scrubs.
#[derive(Debug, Clone)]
pub struct NormalizePlan {
    /// Ordered (column, kind) assignments.
    pub kinds: Vec<(String, ColumnKind)>,
    pub name_columns: Vec<String>,
    pub reject_names: HashSet<String>,
    pub aircraft_column: Option<String>,
    pub aircraft_noise: Option<Regex>,
}

impl NormalizePlan {
    pub fn from_config(config: &Config) -> Result<Self> {
        let columns = &config.columns;
        let mut kinds = Vec::new();

        // Each kind touches only its own columns, so ordering among kinds
        // is immaterial; the date fold's order dependency is across rows,
        // not columns.
        for column in &columns.flight {
            kinds.push((column.clone(), ColumnKind::FlightCode));
        }
        for column in &columns.airport {
            kinds.push((column.clone(), ColumnKind::AirportCode));
        }
        for column in &columns.time {
            kinds.push((column.clone(), ColumnKind::TimeOfDay));
        }
        for column in &columns.identifier {
            kinds.push((column.clone(), ColumnKind::Identifier8));
        }
        for column in &columns.name {
            kinds.push((column.clone(), ColumnKind::PersonName));
        }
        if let Some(date) = &columns.date {
            kinds.push((date.clone(), ColumnKind::Date));
        }

        Ok(NormalizePlan {
            kinds,
            name_columns: columns.name.clone(),
            reject_names: config.reject_names.iter().cloned().collect(),
            aircraft_column: columns.aircraft.clone(),
            aircraft_noise: field::compile_noise(&config.aircraft_noise),
        })
    }

    /// Run one kind's normalizer over a full column. Stateless kinds are
    /// idempotent per cell; the date kind is a fold over the whole column
    /// and must always see every row in order.
    pub fn apply(&self, kind: ColumnKind, cells: &mut [String]) {
        match kind {
            ColumnKind::Date => date::carry_forward_dates(cells),
            ColumnKind::FlightCode => map_cells(cells, field::clean_flight_code),
            ColumnKind::AirportCode => map_cells(cells, field::clean_airport_code),
            ColumnKind::TimeOfDay => map_cells(cells, field::clean_clock_time),
            ColumnKind::Identifier8 => map_cells(cells, field::extract_identifier),
            ColumnKind::PersonName => {
                map_cells(cells, |raw| field::clean_person_name(raw, &self.reject_names))
            }
        }
    }
}

/// Rewrite each cell with a total normalizer; invalid cells become the
/// empty marker.
fn map_cells<F>(cells: &mut [String], normalize: F)
where
    F: Fn(&str) -> Option<String>,
{
    for cell in cells.iter_mut() {
        *cell = normalize(cell.as_str()).unwrap_or_default();
    }
}
