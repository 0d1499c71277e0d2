use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use mvt_domain::marker_environment;
use pep508_rs::MarkerEnvironment;

use crate::core::config::{Config, EnvSnapshot, GlobalOptions};
use crate::core::runtime::effects::{self, Effects, SharedEffects};
use crate::core::runtime::CommandGroup;

#[derive(Clone, Copy, Debug)]
pub struct CommandInfo {
    pub group: CommandGroup,
    pub name: &'static str,
}

impl CommandInfo {
    #[must_use]
    pub const fn new(group: CommandGroup, name: &'static str) -> Self {
        Self { group, name }
    }
}

pub struct CommandContext<'a> {
    pub global: &'a GlobalOptions,
    config: Config,
    cwd: PathBuf,
    effects: SharedEffects,
}

impl<'a> CommandContext<'a> {
    /// Creates a context rooted at the process working directory.
    ///
    /// # Errors
    /// Returns an error if the working directory cannot be determined.
    pub fn new(global: &'a GlobalOptions, effects: SharedEffects) -> Result<Self> {
        let cwd = std::env::current_dir().context("unable to determine working directory")?;
        Ok(Self::with_root(global, effects, cwd))
    }

    /// Creates a context whose relative paths resolve against `cwd`.
    pub fn with_root(global: &'a GlobalOptions, effects: SharedEffects, cwd: PathBuf) -> Self {
        Self::from_parts(global, effects, &EnvSnapshot::capture(), cwd)
    }

    pub(crate) fn from_parts(
        global: &'a GlobalOptions,
        effects: SharedEffects,
        env: &EnvSnapshot,
        cwd: PathBuf,
    ) -> Self {
        Self {
            global,
            config: Config::from_snapshot(env),
            cwd,
            effects,
        }
    }

    pub fn effects(&self) -> &dyn Effects {
        self.effects.as_ref()
    }

    pub fn fs(&self) -> &dyn effects::FileSystem {
        self.effects.fs()
    }

    pub fn installer(&self) -> &dyn effects::Installer {
        self.effects.installer()
    }

    pub fn discovery(&self) -> &dyn effects::DependencyDiscovery {
        self.effects.discovery()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Resolves a user-supplied path against the working directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        }
    }

    /// One marker environment per distinct Python major among `folders`.
    ///
    /// # Errors
    /// Returns an error if a configured target version is not PEP 440.
    pub fn marker_environments(&self, folders: &[String]) -> Result<Vec<MarkerEnvironment>> {
        let mut versions: Vec<&str> = folders
            .iter()
            .map(|folder| self.config.python().marker_version_for(folder))
            .collect();
        versions.sort_unstable();
        versions.dedup();
        versions.into_iter().map(marker_environment).collect()
    }
}
