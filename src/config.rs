// src/config.rs

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::error::ConfigError;
use crate::process::date_parser::DateFormat;

pub const DEFAULT_CONFIG_FILE: &str = "casepivot.yaml";
pub const CONFIG_ENV: &str = "CASEPIVOT_CONFIG";

/// Run configuration, read once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Case-count source (URL or path).
    #[serde(alias = "csvSource")]
    pub covid_input: String,
    /// Population source. Absent means raw counts.
    #[serde(default)]
    pub population_input: Option<String>,
    /// Destination of the wide table.
    pub output: PathBuf,
    #[serde(default)]
    pub date_format: DateFormat,
    #[serde(default = "default_true")]
    pub covid_header: bool,
    #[serde(default = "default_true")]
    pub population_header: bool,
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load from `path`: `.properties` files use `key=value` lines,
    /// everything else is YAML.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let is_properties = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("properties"));

        let config = if is_properties {
            Self::from_properties(&text)?
        } else {
            serde_yaml::from_str(&text).map_err(|source| ConfigError::Yaml {
                path: path.to_path_buf(),
                source,
            })?
        };
        config.validated()
    }

    /// Parse Java-style properties (`#`/`!` comments, `=` or `:` separators).
    pub fn from_properties(text: &str) -> Result<Self, ConfigError> {
        let props = parse_properties(text);
        let get = |key: &str| props.get(key).map(String::as_str);

        let covid_input = get("covidInput")
            .or_else(|| get("csvSource"))
            .ok_or(ConfigError::Missing("covidInput"))?;
        let output = get("output").ok_or(ConfigError::Missing("output"))?;

        let date_format = match get("dateFormat") {
            Some(raw) => raw.parse::<DateFormat>().map_err(|_| ConfigError::Invalid {
                key: "dateFormat",
                value: raw.to_string(),
            })?,
            None => DateFormat::default(),
        };

        Ok(Self {
            covid_input: covid_input.to_string(),
            population_input: get("populationInput").map(str::to_string),
            output: PathBuf::from(output),
            date_format,
            covid_header: parse_flag("covidHeader", get("covidHeader"))?,
            population_header: parse_flag("populationHeader", get("populationHeader"))?,
        })
    }

    /// Reject blank required options; a blank population source means none.
    fn validated(mut self) -> Result<Self, ConfigError> {
        if self.covid_input.trim().is_empty() {
            return Err(ConfigError::Missing("covidInput"));
        }
        if self.output.as_os_str().is_empty() {
            return Err(ConfigError::Missing("output"));
        }
        if self
            .population_input
            .as_deref()
            .is_some_and(|p| p.trim().is_empty())
        {
            self.population_input = None;
        }
        Ok(self)
    }

    /// Config path from the first CLI argument, then `$CASEPIVOT_CONFIG`,
    /// then [`DEFAULT_CONFIG_FILE`].
    pub fn resolve_path(arg: Option<String>) -> PathBuf {
        arg.or_else(|| std::env::var(CONFIG_ENV).ok())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }
}

fn parse_flag(key: &'static str, raw: Option<&str>) -> Result<bool, ConfigError> {
    match raw.map(|r| r.to_ascii_lowercase()) {
        None => Ok(true),
        Some(v) if v == "true" => Ok(true),
        Some(v) if v == "false" => Ok(false),
        Some(v) => Err(ConfigError::Invalid { key, value: v }),
    }
}

fn parse_properties(text: &str) -> HashMap<String, String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#') && !l.starts_with('!'))
        .filter_map(|l| {
            let idx = l.find(['=', ':'])?;
            Some((l[..idx].trim().to_string(), l[idx + 1..].trim().to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::tempdir;

    #[test]
    fn loads_yaml() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("casepivot.yaml");
        fs::write(
            &path,
            "covidInput: https://example.org/us-states.csv\n\
             populationInput: data/population.csv\n\
             output: out/graph.csv\n\
             dateFormat: dotted\n",
        )?;

        let config = Config::load(&path)?;
        assert_eq!(config.covid_input, "https://example.org/us-states.csv");
        assert_eq!(config.population_input.as_deref(), Some("data/population.csv"));
        assert_eq!(config.output, PathBuf::from("out/graph.csv"));
        assert_eq!(config.date_format, DateFormat::Dotted);
        assert!(config.covid_header);
        assert!(config.population_header);
        Ok(())
    }

    #[test]
    fn yaml_accepts_csv_source_alias_and_no_population() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.yml");
        fs::write(&path, "csvSource: cases.csv\noutput: graph.csv\ncovidHeader: false\n")?;

        let config = Config::load(&path)?;
        assert_eq!(config.covid_input, "cases.csv");
        assert_eq!(config.population_input, None);
        assert_eq!(config.date_format, DateFormat::Iso);
        assert!(!config.covid_header);
        Ok(())
    }

    #[test]
    fn loads_properties() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("application.properties");
        fs::write(
            &path,
            "# run settings\n\
             covidInput=https://example.org/us-states.csv\n\
             populationInput = https://example.org/population.csv\n\
             ! legacy comment\n\
             output: graph.csv\n",
        )?;

        let config = Config::load(&path)?;
        assert_eq!(config.covid_input, "https://example.org/us-states.csv");
        assert_eq!(
            config.population_input.as_deref(),
            Some("https://example.org/population.csv")
        );
        assert_eq!(config.output, PathBuf::from("graph.csv"));
        Ok(())
    }

    #[test]
    fn blank_population_means_raw_counts() -> Result<()> {
        let config = Config::from_properties("covidInput=a.csv\npopulationInput=\noutput=b.csv\n")?
            .validated()?;
        assert_eq!(config.population_input, None);
        Ok(())
    }

    #[test]
    fn missing_and_invalid_options() {
        assert!(matches!(
            Config::from_properties("output=b.csv"),
            Err(ConfigError::Missing("covidInput"))
        ));
        assert!(matches!(
            Config::from_properties("covidInput=a.csv"),
            Err(ConfigError::Missing("output"))
        ));
        assert!(matches!(
            Config::from_properties("covidInput=a.csv\noutput=b.csv\ndateFormat=us"),
            Err(ConfigError::Invalid {
                key: "dateFormat",
                ..
            })
        ));
        assert!(matches!(
            Config::from_properties("covidInput= \noutput=b.csv").and_then(Config::validated),
            Err(ConfigError::Missing("covidInput"))
        ));
    }

    #[test]
    fn explicit_argument_wins() {
        assert_eq!(
            Config::resolve_path(Some("custom.yaml".into())),
            PathBuf::from("custom.yaml")
        );
    }
}
