// Configuration - where the database and the CSV exports live
//
// Defaults match the file names the ledger has always used. Each location can
// be overridden from a JSON file and then from environment variables.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

pub const DEFAULT_DATABASE: &str = "MovimientosYCtaCte.db";
pub const DEFAULT_ACCOUNTS_CSV: &str = "CuentasCorrientes.csv";
pub const DEFAULT_MOVEMENTS_CSV: &str = "Movimientos.csv";

pub const ENV_CONFIG: &str = "CTACTE_CONFIG";
pub const ENV_DATABASE: &str = "CTACTE_DB";
pub const ENV_ACCOUNTS_CSV: &str = "CTACTE_ACCOUNTS_CSV";
pub const ENV_MOVEMENTS_CSV: &str = "CTACTE_MOVEMENTS_CSV";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite file holding the accounts and movements tables
    pub database_path: PathBuf,

    /// Destination of the accounts export
    pub accounts_csv: PathBuf,

    /// Destination of the movements export
    pub movements_csv: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_path: PathBuf::from(DEFAULT_DATABASE),
            accounts_csv: PathBuf::from(DEFAULT_ACCOUNTS_CSV),
            movements_csv: PathBuf::from(DEFAULT_MOVEMENTS_CSV),
        }
    }
}

impl Config {
    /// Load a JSON config file. Keys that are absent keep their defaults.
    pub fn load(path: &Path) -> Result<Config> {
        let raw = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&raw)?;
        Ok(config)
    }

    /// Defaults (or the `CTACTE_CONFIG` file) with env overrides applied.
    pub fn from_env() -> Result<Config> {
        let base = match env::var_os(ENV_CONFIG) {
            Some(path) => Config::load(Path::new(&path))?,
            None => Config::default(),
        };
        Ok(base.with_overrides(|key| env::var_os(key).map(PathBuf::from)))
    }

    /// Apply overrides from any key lookup (env vars in production).
    pub fn with_overrides<F>(mut self, lookup: F) -> Config
    where
        F: Fn(&str) -> Option<PathBuf>,
    {
        if let Some(path) = lookup(ENV_DATABASE) {
            self.database_path = path;
        }
        if let Some(path) = lookup(ENV_ACCOUNTS_CSV) {
            self.accounts_csv = path;
        }
        if let Some(path) = lookup(ENV_MOVEMENTS_CSV) {
            self.movements_csv = path;
        }
        self
    }
}
