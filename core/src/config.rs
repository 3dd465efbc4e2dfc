//! Runtime configuration.
//!
//! Sources, lowest precedence first: built-in defaults, an optional YAML file
//! (`config.yaml` in the working directory unless overridden), then `MNEMO_*`
//! environment variables.

use crate::scorer::Bm25Params;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";
pub const DEFAULT_DB_PATH: &str = "./mnemo.db";
const ENV_PREFIX: &str = "MNEMO_";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub db_path: PathBuf,
    /// Directory for index snapshots; the index is rebuilt from the store when unset.
    pub snapshot_path: Option<PathBuf>,
    pub bm25: Bm25Params,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            snapshot_path: None,
            bm25: Bm25Params::default(),
        }
    }
}

impl Config {
    /// Load from `config.yaml` (if present) and the process environment.
    pub fn load() -> Result<Self> {
        Self::load_from(None, std::env::vars())
    }

    /// `file` of `None` means the optional default `config.yaml`; an explicit file must exist.
    pub fn load_from<I>(file: Option<&Path>, vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut cfg = match file {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?,
            None => Self::default(),
        };
        cfg.apply_env(vars)?;
        cfg.bm25.validate()?;
        Ok(cfg)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).with_context(|| format!("reading config file {}", path.display()))?;
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&raw).with_context(|| format!("parsing config file {}", path.display()))
    }

    fn apply_env<I>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            let Some(name) = key.strip_prefix(ENV_PREFIX) else { continue };
            match name.to_ascii_lowercase().as_str() {
                "db_path" => self.db_path = PathBuf::from(value),
                "snapshot_path" => {
                    self.snapshot_path = if value.is_empty() { None } else { Some(PathBuf::from(value)) }
                }
                "bm25_k1" => self.bm25.k1 = value.parse().with_context(|| format!("invalid {key}={value}"))?,
                "bm25_b" => self.bm25.b = value.parse().with_context(|| format!("invalid {key}={value}"))?,
                _ => tracing::debug!(key = %key, "ignoring unknown environment variable"),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn defaults_without_file_or_env() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("empty.yaml");
        fs::write(&file, "").unwrap();
        let cfg = Config::load_from(Some(file.as_path()), vars(&[])).unwrap();
        assert_eq!(cfg.db_path, PathBuf::from("./mnemo.db"));
        assert_eq!(cfg.bm25, Bm25Params::default());
        assert!(cfg.snapshot_path.is_none());
    }

    #[test]
    fn env_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "db_path: /var/lib/mnemo.db\nbm25:\n  k1: 2.0").unwrap();
        let cfg = Config::load_from(
            Some(file.path()),
            vars(&[("MNEMO_DB_PATH", "/tmp/test.db"), ("MNEMO_BM25_B", "0.5"), ("HOME", "/root")]),
        )
        .unwrap();
        assert_eq!(cfg.db_path, PathBuf::from("/tmp/test.db"));
        assert_eq!(cfg.bm25.k1, 2.0);
        assert_eq!(cfg.bm25.b, 0.5);
    }

    #[test]
    fn rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("c.yaml");
        fs::write(&file, "bm25:\n  b: 3.0\n").unwrap();
        assert!(Config::load_from(Some(file.as_path()), vars(&[])).is_err());
        fs::write(&file, "").unwrap();
        assert!(Config::load_from(Some(file.as_path()), vars(&[("MNEMO_BM25_K1", "fast")])).is_err());
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load_from(Some(dir.path().join("nope.yaml").as_path()), vars(&[])).is_err());
    }
}
