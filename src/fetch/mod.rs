// src/fetch/mod.rs

use std::{fmt, path::PathBuf};

use reqwest::Client;
use tracing::{debug, info, instrument};
use url::Url;

use crate::error::FetchError;

/// Where a dataset lives: an `http(s)` URL or a local file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Remote(Url),
    Local(PathBuf),
}

impl Location {
    /// `http(s)://` becomes `Remote`, `file://` and anything that is not a
    /// URL become `Local`.
    pub fn parse(raw: &str) -> Self {
        match Url::parse(raw) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Location::Remote(url),
            Ok(url) if url.scheme() == "file" => match url.to_file_path() {
                Ok(path) => Location::Local(path),
                Err(()) => Location::Local(PathBuf::from(raw)),
            },
            _ => Location::Local(PathBuf::from(raw)),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Remote(url) => write!(f, "{}", url),
            Location::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

async fn get_text_core(client: &Client, url: &Url) -> Result<String, FetchError> {
    debug!("Fetching text from {}", url);
    let http = |source: reqwest::Error| FetchError::Http {
        url: url.to_string(),
        source,
    };
    client
        .get(url.clone())
        .send()
        .await
        .map_err(http)?
        .error_for_status()
        .map_err(http)?
        .text()
        .await
        .map_err(http)
}

/// Fetch the whole text behind `location` and split it into lines,
/// optionally discarding the first one (a header).
#[instrument(level = "info", skip(client), fields(location = %location))]
pub async fn fetch_lines(
    client: &Client,
    location: &Location,
    drop_first_line: bool,
) -> Result<Vec<String>, FetchError> {
    info!("obtaining raw data from {}", location);
    let text = match location {
        Location::Remote(url) => get_text_core(client, url).await?,
        Location::Local(path) => {
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| FetchError::Io {
                    path: path.clone(),
                    source,
                })?
        }
    };

    let lines = split_lines(&text, drop_first_line);
    info!("raw data obtained ({} lines)", lines.len());
    Ok(lines)
}

/// `str::lines` semantics: `\n` or `\r\n`, no trailing empty line.
pub fn split_lines(text: &str, drop_first_line: bool) -> Vec<String> {
    text.lines()
        .skip(usize::from(drop_first_line))
        .map(str::to_owned)
        .collect()
}
