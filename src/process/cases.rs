// src/process/cases.rs

use chrono::NaiveDate;

use crate::error::RecordError;
use crate::process::{date_parser::parse_iso_date, utils::split_fields};

// date,state,confirmed_cumulative,new_cases,...
const DATE_FIELD: usize = 0;
const REGION_FIELD: usize = 1;
const CASES_FIELD: usize = 3;

/// One accepted row of the long-format case data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseRecord {
    pub date: NaiveDate,
    pub region: String,
    pub cases: i64,
}

impl CaseRecord {
    /// Parse a raw line like `2020-01-21,WA,53,1,0`.
    ///
    /// Negative counts are kept as-is; only non-numeric counts fail.
    pub fn parse(line: &str) -> Result<Self, RecordError> {
        let fields = split_fields(line);
        if fields.len() <= CASES_FIELD {
            return Err(RecordError::TooFewFields {
                expected: CASES_FIELD + 1,
                found: fields.len(),
            });
        }

        let raw_date = fields[DATE_FIELD];
        let date =
            parse_iso_date(raw_date).ok_or_else(|| RecordError::InvalidDate(raw_date.into()))?;

        let raw_cases = fields[CASES_FIELD];
        let cases = raw_cases
            .parse::<i64>()
            .map_err(|_| RecordError::InvalidCount(raw_cases.into()))?;

        Ok(Self {
            date,
            region: fields[REGION_FIELD].to_string(),
            cases,
        })
    }
}
