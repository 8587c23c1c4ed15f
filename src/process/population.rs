// src/process/population.rs

use std::collections::HashMap;

use tracing::{debug, info, instrument};

use crate::error::PopulationError;
use crate::process::utils::split_fields;

/// Field indices in `state,state_name,geo_id,population,pop_density`.
const REGION_FIELD: usize = 1;
const POPULATION_FIELD: usize = 3;

/// Region code → population. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PopulationTable {
    by_region: HashMap<String, u64>,
}

impl PopulationTable {
    /// Build the table from raw lines (header already dropped).
    ///
    /// Duplicate region codes overwrite earlier entries. The first
    /// malformed line aborts the build.
    #[instrument(level = "info", skip(lines), fields(lines = lines.len()))]
    pub fn from_lines<S: AsRef<str>>(lines: &[S]) -> Result<Self, PopulationError> {
        let mut by_region = HashMap::with_capacity(lines.len());

        for (idx, line) in lines.iter().enumerate() {
            let line = line.as_ref();
            if line.trim().is_empty() {
                continue;
            }
            let (region, population) = parse_line(line).map_err(|reason| PopulationError {
                line_no: idx + 1,
                line: line.to_string(),
                reason,
            })?;
            if let Some(prev) = by_region.insert(region.to_string(), population) {
                debug!(region, prev, population, "population overwritten");
            }
        }

        info!("population data parsed ({} regions)", by_region.len());
        Ok(Self { by_region })
    }

    pub fn get(&self, region: &str) -> Option<u64> {
        self.by_region.get(region).copied()
    }

    pub fn len(&self) -> usize {
        self.by_region.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_region.is_empty()
    }
}

impl FromIterator<(String, u64)> for PopulationTable {
    fn from_iter<I: IntoIterator<Item = (String, u64)>>(iter: I) -> Self {
        Self {
            by_region: iter.into_iter().collect(),
        }
    }
}

fn parse_line(line: &str) -> Result<(&str, u64), String> {
    let fields = split_fields(line);
    if fields.len() <= POPULATION_FIELD {
        return Err(format!(
            "expected at least {} fields, found {}",
            POPULATION_FIELD + 1,
            fields.len()
        ));
    }
    let region = fields[REGION_FIELD];
    if region.is_empty() {
        return Err("empty region code".to_string());
    }
    let raw = fields[POPULATION_FIELD];
    match raw.parse::<u64>() {
        Ok(0) => Err("population must be positive".to_string()),
        Ok(n) => Ok((region, n)),
        Err(e) => Err(format!("invalid population {:?}: {}", raw, e)),
    }
}
