use std::{env, path::PathBuf};

use log::LevelFilter;

const DATA_DIR_VAR: &str = "FITFUSION_DATA_DIR";
const DEBUG_VAR: &str = "FITFUSION_DEBUG";
const IN_MEMORY_VAR: &str = "FITFUSION_IN_MEMORY";

const DEFAULT_DATA_DIR: &str = ".fitfusion";
const DB_FILE_NAME: &str = "fitfusion.sqlite3";

/// Process-level settings read once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub data_dir: PathBuf,
    pub debug: bool,
    pub in_memory: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            debug: false,
            in_memory: false,
        }
    }
}

impl RuntimeConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            data_dir: lookup(DATA_DIR_VAR)
                .filter(|value| !value.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            debug: lookup(DEBUG_VAR).is_some_and(|value| is_truthy(&value)),
            in_memory: lookup(IN_MEMORY_VAR).is_some_and(|value| is_truthy(&value)),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        if self.debug {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE_NAME)
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
