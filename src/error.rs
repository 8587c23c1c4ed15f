// src/error.rs

use std::{io, path::PathBuf};

use thiserror::Error;

/// A source location could not be read.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("GET {url} failed")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("reading {path:?} failed")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A population line that cannot be turned into a table entry.
/// Fatal: the whole run stops on the first one.
#[derive(Debug, Error)]
#[error("malformed population record at line {line_no}: {reason} ({line:?})")]
pub struct PopulationError {
    pub line_no: usize,
    pub line: String,
    pub reason: String,
}

/// Why a single case line was rejected. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("expected at least {expected} fields, found {found}")]
    TooFewFields { expected: usize, found: usize },
    #[error("invalid date {0:?}, expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("invalid case count {0:?}")]
    InvalidCount(String),
}

/// The destination could not be created, truncated or written.
#[derive(Debug, Error)]
#[error("writing table to {path:?} failed")]
pub struct WriteError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config {path:?} failed")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("parsing YAML config {path:?} failed")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("missing required option `{0}`")]
    Missing(&'static str),
    #[error("invalid value {value:?} for option `{key}`")]
    Invalid { key: &'static str, value: String },
}
