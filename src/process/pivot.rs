// src/process/pivot.rs

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    fmt,
};

use chrono::NaiveDate;
use tracing::{info, instrument, warn};

use crate::process::{cases::CaseRecord, date_parser::DateFormat, population::PopulationTable};

/// Per-capita values are cases per this many inhabitants.
pub const PER_MILLION: f64 = 1_000_000.0;

/// Written for a (date, region) cell no record contributed to.
pub const FILL_VALUE: &str = "0";

pub const DATE_COLUMN: &str = "date";

/// Whether case counts are normalised by population.
#[derive(Debug, Clone, Copy)]
pub enum PivotMode<'a> {
    RawCounts,
    PerCapita(&'a PopulationTable),
}

impl<'a> PivotMode<'a> {
    pub fn from_population(population: Option<&'a PopulationTable>) -> Self {
        population.map_or(PivotMode::RawCounts, PivotMode::PerCapita)
    }
}

/// A single matrix value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell {
    Count(i64),
    PerMillion(f64),
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Count(n) => write!(f, "{}", n),
            Cell::PerMillion(v) => f.write_str(&format_half_up(*v)),
        }
    }
}

/// Two decimals, rounding half away from zero on the shortest decimal
/// form of `v`: `0.125` → `0.13`, `0.615` → `0.62`.
pub fn format_half_up(v: f64) -> String {
    if !v.is_finite() {
        return format!("{:.2}", v);
    }
    let shortest = format!("{}", v.abs());
    let (int_part, frac_part) = shortest.split_once('.').unwrap_or((shortest.as_str(), ""));

    let mut digits: Vec<u8> = int_part.bytes().collect();
    let kept: Vec<u8> = frac_part.bytes().chain(std::iter::repeat(b'0')).take(2).collect();
    digits.extend_from_slice(&kept);

    if frac_part.as_bytes().get(2).is_some_and(|d| *d >= b'5') {
        // carry through the kept digits
        let mut i = digits.len();
        loop {
            if i == 0 {
                digits.insert(0, b'1');
                break;
            }
            i -= 1;
            if digits[i] == b'9' {
                digits[i] = b'0';
            } else {
                digits[i] += 1;
                break;
            }
        }
    }

    let split = digits.len() - 2;
    let mut out = String::with_capacity(digits.len() + 2);
    if v.is_sign_negative() {
        out.push('-');
    }
    out.push_str(std::str::from_utf8(&digits[..split]).unwrap_or("0"));
    out.push('.');
    out.push_str(std::str::from_utf8(&digits[split..]).unwrap_or("00"));
    out
}

/// What happened to a record handed to [`MatrixBuilder::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    Inserted,
    /// An earlier record for the same (date, region) was replaced.
    Overwrote,
    /// Per-capita mode and the region has no population entry.
    UnknownPopulation,
}

/// Counters collected while building one table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PivotStats {
    pub accepted: usize,
    pub rejected: usize,
    pub overwritten: usize,
    /// Sorted, deduplicated.
    pub skipped_regions: Vec<String>,
}

/// Sparse date × region accumulator. Owned by one pass, consumed by
/// [`MatrixBuilder::finish`].
#[derive(Debug)]
pub struct MatrixBuilder<'a> {
    mode: PivotMode<'a>,
    matrix: BTreeMap<NaiveDate, HashMap<String, Cell>>,
    regions: BTreeSet<String>,
    skipped_regions: BTreeSet<String>,
    accepted: usize,
    overwritten: usize,
}

impl<'a> MatrixBuilder<'a> {
    pub fn new(mode: PivotMode<'a>) -> Self {
        Self {
            mode,
            matrix: BTreeMap::new(),
            regions: BTreeSet::new(),
            skipped_regions: BTreeSet::new(),
            accepted: 0,
            overwritten: 0,
        }
    }

    pub fn insert(&mut self, record: CaseRecord) -> Insertion {
        let CaseRecord {
            date,
            region,
            cases,
        } = record;

        let cell = match self.mode {
            PivotMode::RawCounts => Cell::Count(cases),
            PivotMode::PerCapita(population) => match population.get(&region) {
                Some(pop) => Cell::PerMillion(PER_MILLION * cases as f64 / pop as f64),
                None => {
                    self.skipped_regions.insert(region);
                    return Insertion::UnknownPopulation;
                }
            },
        };

        self.accepted += 1;
        if !self.regions.contains(&region) {
            self.regions.insert(region.clone());
        }

        match self.matrix.entry(date).or_default().insert(region, cell) {
            Some(_) => {
                self.overwritten += 1;
                Insertion::Overwrote
            }
            None => Insertion::Inserted,
        }
    }

    /// Emit the dense wide table: sorted region columns, chronological rows.
    pub fn finish(self, date_format: DateFormat) -> (WideTable, PivotStats) {
        let columns: Vec<String> = self.regions.into_iter().collect();

        let mut lines = Vec::with_capacity(self.matrix.len() + 1);
        lines.push(
            std::iter::once(DATE_COLUMN)
                .chain(columns.iter().map(String::as_str))
                .collect::<Vec<_>>()
                .join(","),
        );

        for (date, cells) in &self.matrix {
            let mut line = date_format.format(*date);
            for region in &columns {
                line.push(',');
                match cells.get(region) {
                    Some(cell) => line.push_str(&cell.to_string()),
                    None => line.push_str(FILL_VALUE),
                }
            }
            lines.push(line);
        }

        let stats = PivotStats {
            accepted: self.accepted,
            rejected: 0,
            overwritten: self.overwritten,
            skipped_regions: self.skipped_regions.into_iter().collect(),
        };
        (WideTable { columns, lines }, stats)
    }
}

/// Parse every case line, accumulate, and emit the wide table.
///
/// Malformed lines are logged and skipped; they never stop the pass.
#[instrument(level = "info", skip(lines, mode), fields(lines = lines.len()))]
pub fn pivot_case_lines<S: AsRef<str>>(
    lines: &[S],
    mode: PivotMode<'_>,
    date_format: DateFormat,
) -> (WideTable, PivotStats) {
    let mut builder = MatrixBuilder::new(mode);
    let mut rejected = 0;

    for line in lines {
        let line = line.as_ref();
        if line.trim().is_empty() {
            continue;
        }
        match CaseRecord::parse(line) {
            Ok(record) => {
                let (date, region) = (record.date, record.region.clone());
                if builder.insert(record) == Insertion::Overwrote {
                    warn!(%date, region = %region, "duplicate date/region, earlier value overwritten");
                }
            }
            Err(err) => {
                rejected += 1;
                warn!(line, error = %err, "skipped invalid line");
            }
        }
    }

    let (table, mut stats) = builder.finish(date_format);
    stats.rejected = rejected;

    info!("case data parsed ({} days)", table.row_count());
    if !stats.skipped_regions.is_empty() {
        info!(
            "regions skipped because no population data was found: {}",
            stats.skipped_regions.join(", ")
        );
    }
    (table, stats)
}

/// The finished `date × region` table, header line first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WideTable {
    columns: Vec<String>,
    lines: Vec<String>,
}

impl WideTable {
    /// Region columns, in output order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn header(&self) -> &str {
        &self.lines[0]
    }

    pub fn rows(&self) -> &[String] {
        &self.lines[1..]
    }

    pub fn row_count(&self) -> usize {
        self.lines.len() - 1
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

impl fmt::Display for WideTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}
