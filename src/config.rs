/*
MIT License

Copyright (c) 2026 Raja Lehtihet and Wael El Oraiby

Permission is hereby granted, free of charge, to any person obtaining a copy
of this software and associated documentation files (the "Software"), to deal
in the Software without restriction, including without limitation the rights
to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all
copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
SOFTWARE.
*/

//! Engine configuration.
//!
//! Loaded from TOML; every key is optional:
//!
//! ```toml
//! cache_compiled_units = true
//! parallel_batches = true
//! max_threads = 4
//! source_label = "<formula>"
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Calculation engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Reuse compiled units across calculations of the same source text.
    pub cache_compiled_units: bool,
    /// Run batch calculations on the rayon thread pool.
    pub parallel_batches: bool,
    /// Size of a dedicated batch pool; the global pool when unset.
    pub max_threads: Option<usize>,
    /// Label shown in compile diagnostics.
    pub source_label: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_compiled_units: true,
            parallel_batches: true,
            max_threads: None,
            source_label: "<formula>".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_config_uses_defaults() {
        assert_eq!(EngineConfig::from_toml_str("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn partial_config_overrides_keys() {
        let config = EngineConfig::from_toml_str("parallel_batches = false\nmax_threads = 2\n").unwrap();
        assert!(!config.parallel_batches);
        assert!(config.cache_compiled_units);
        assert_eq!(config.max_threads, Some(2));
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "source_label = \"bolt.cs\"").unwrap();
        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.source_label, "bolt.cs");
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = EngineConfig::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn invalid_types_are_rejected() {
        assert!(matches!(
            EngineConfig::from_toml_str("max_threads = \"many\""),
            Err(ConfigError::Toml(_))
        ));
    }
}
