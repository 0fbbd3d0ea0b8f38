//! Run Configuration
//!
//! `EventConfig` is built once at startup and handed to the assembler by
//! reference. `Settings` holds the optional TOML overrides for the category
//! tables and status codes.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read settings file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid settings file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Event-wide values shared by the header, footer and every entrant form.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EventConfig {
    pub event_date: String,
    pub event_title: String,
    pub database: String,
    pub double_page: bool,
}

impl EventConfig {
    pub fn new(database: impl Into<String>, double_page: bool) -> Self {
        Self {
            database: database.into(),
            double_page,
            ..Self::default()
        }
    }
}

/// Route code to certificate class lookups.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryMapping {
    #[serde(default = "default_standard_table")]
    pub standard: BTreeMap<String, i64>,
    #[serde(default = "default_late_table")]
    pub late: BTreeMap<String, i64>,
}

fn default_standard_table() -> BTreeMap<String, i64> {
    [
        ("A-NC", 2),
        ("B-NAC", 1),
        ("C-SC", 4),
        ("D-SAC", 3),
        ("E-5C", 6),
        ("F-5AC", 7),
    ]
    .into_iter()
    .map(|(route, class)| (route.to_string(), class))
    .collect()
}

fn default_late_table() -> BTreeMap<String, i64> {
    [("A-NC", 9), ("B-NAC", 8), ("C-SC", 11), ("D-SAC", 10)]
        .into_iter()
        .map(|(route, class)| (route.to_string(), class))
        .collect()
}

impl Default for CategoryMapping {
    fn default() -> Self {
        Self {
            standard: default_standard_table(),
            late: default_late_table(),
        }
    }
}

impl CategoryMapping {
    /// Class for a route; 0 when the route is not in the table.
    pub fn standard_class(&self, route: &str) -> i64 {
        self.standard.get(route).copied().unwrap_or(0)
    }

    pub fn late_class(&self, route: &str) -> i64 {
        self.late.get(route).copied().unwrap_or(0)
    }

    /// Reverse lookup used for legacy databases, which only store the class.
    pub fn route_for_class(&self, class: i64) -> Option<&str> {
        self.standard
            .iter()
            .find(|(_, c)| **c == class)
            .map(|(route, _)| route.as_str())
    }
}

/// Entrant status values as stored by the current schema.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatusCodes {
    #[serde(default = "default_finisher")]
    pub finisher: i64,
    #[serde(default = "default_late_finisher")]
    pub late_finisher: i64,
}

fn default_finisher() -> i64 {
    8
}

fn default_late_finisher() -> i64 {
    9
}

impl Default for StatusCodes {
    fn default() -> Self {
        Self {
            finisher: default_finisher(),
            late_finisher: default_late_finisher(),
        }
    }
}

/// Optional overrides read from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub categories: CategoryMapping,
    #[serde(default)]
    pub status: StatusCodes,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format("%-d %B %Y").to_string()
}

fn parse_day(timestamp: &str) -> Option<NaiveDate> {
    let day = timestamp.split('T').next()?.trim();
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

/// Formats a `start;finish` pair of ISO-8601 timestamps for printing.
///
/// `17 June 2023`, `17/18 June 2023` or `30 June 2023 - 1 July 2023`.
/// Anything unparseable yields an empty string.
pub fn format_date_range(range: &str) -> String {
    let Some((start, finish)) = range.split_once(';') else {
        return String::new();
    };
    let (Some(start), Some(finish)) = (parse_day(start), parse_day(finish)) else {
        return String::new();
    };

    if start == finish {
        return format_date(start);
    }
    if start.format("%Y-%m").to_string() == finish.format("%Y-%m").to_string() {
        return format!("{}/{}", start.format("%-d"), format_date(finish));
    }
    format!("{} - {}", format_date(start), format_date(finish))
}
