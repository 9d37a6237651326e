//! Flat Kconfig `.config` reader.
//!
//! Only the resolved output of Kconfig is consumed: `CONFIG_<NAME>=<value>`
//! lines. A symbol counts as set when its value is exactly `y`.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;

use crate::error::{Error, Result};

/// Lines shorter than this cannot hold a `CONFIG_X=y` assignment.
const MIN_LINE_LEN: usize = 8;

/// Resolved Kconfig symbols.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Kconfig {
    values: IndexMap<String, String>,
}

impl Kconfig {
    /// Reads a `.config` file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Ok(Self::parse(&text))
    }

    /// Parses `.config` text. Comments and short lines are ignored.
    pub fn parse(text: &str) -> Self {
        let values = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.starts_with('#') && line.len() >= MIN_LINE_LEN)
            .filter_map(|line| line.split_once('='))
            .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
            .collect();
        Self { values }
    }

    /// Raw value of a symbol, with or without its `CONFIG_` prefix.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .or_else(|| self.values.get(&format!("CONFIG_{key}")))
            .map(String::as_str)
    }

    /// Returns true when the symbol's value is `y`.
    pub fn is_set(&self, key: &str) -> bool {
        self.get(key) == Some("y")
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Kconfig {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
