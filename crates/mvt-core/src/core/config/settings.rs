use std::collections::HashMap;
use std::env;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalOptions {
    pub quiet: bool,
    pub verbose: u8,
    pub trace: bool,
    pub json: bool,
    pub no_color: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    pub(crate) fn capture() -> Self {
        Self {
            vars: env::vars().collect(),
        }
    }

    pub(crate) fn var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Unset means `default`; `0/false/no/off` and the empty string mean false.
    pub(crate) fn flag(&self, key: &str, default: bool) -> bool {
        match self.var(key) {
            Some(value) => {
                let lowered = value.to_ascii_lowercase();
                !matches!(lowered.as_str(), "0" | "false" | "no" | "off" | "")
            }
            None => default,
        }
    }

    #[cfg(test)]
    pub(crate) fn testing(pairs: &[(&str, &str)]) -> Self {
        let vars = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Self { vars }
    }
}

pub const DEFAULT_PYTHON3: &str = "python3";
pub const DEFAULT_PYTHON2: &str = "python2";
pub const DEFAULT_TARGET_PYTHON: &str = "3.8";
pub const DEFAULT_TEMP_DIR: &str = ".mvt-temp";
/// Interpreter version the marker environment uses for `*2` folders.
pub const PYTHON2_MARKER_VERSION: &str = "2.7";

#[derive(Debug, Clone)]
pub struct Config {
    pub(crate) python: PythonConfig,
    pub(crate) install: InstallConfig,
}

impl Config {
    /// Builds a configuration snapshot from the current process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_snapshot(&EnvSnapshot::capture())
    }

    pub(crate) fn from_snapshot(snapshot: &EnvSnapshot) -> Self {
        let non_empty = |key: &str, default: &str| {
            snapshot
                .var(key)
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .unwrap_or(default)
                .to_string()
        };
        Self {
            python: PythonConfig {
                python3: non_empty("MVT_PYTHON", DEFAULT_PYTHON3),
                python2: non_empty("MVT_PYTHON2", DEFAULT_PYTHON2),
                target_version: non_empty("MVT_TARGET_PYTHON", DEFAULT_TARGET_PYTHON),
            },
            install: InstallConfig {
                temp_dir: non_empty("MVT_TEMP_DIR", DEFAULT_TEMP_DIR),
                keep_temp: snapshot.flag("MVT_KEEP_TEMP", false),
            },
        }
    }

    #[must_use]
    pub fn python(&self) -> &PythonConfig {
        &self.python
    }

    #[must_use]
    pub fn install(&self) -> &InstallConfig {
        &self.install
    }
}

#[derive(Debug, Clone)]
pub struct PythonConfig {
    pub python3: String,
    pub python2: String,
    pub target_version: String,
}

impl PythonConfig {
    /// Interpreter that installs into `folder`; `*2` folders get Python 2.
    #[must_use]
    pub fn interpreter_for(&self, folder: &str) -> &str {
        if folder.ends_with('2') {
            &self.python2
        } else {
            &self.python3
        }
    }

    #[must_use]
    pub fn marker_version_for(&self, folder: &str) -> &str {
        if folder.ends_with('2') {
            PYTHON2_MARKER_VERSION
        } else {
            &self.target_version
        }
    }
}

#[derive(Debug, Clone)]
pub struct InstallConfig {
    pub temp_dir: String,
    pub keep_temp: bool,
}
