use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::core::install::{
    requires_dist, InstallFailed, InstallRequest, InstalledDistribution, PipInstaller,
};

pub trait Installer: Send + Sync {
    /// Installs one distribution into `request.vendor_dir`.
    fn install(&self, request: &InstallRequest) -> Result<InstalledDistribution, InstallFailed>;
}

pub trait DependencyDiscovery: Send + Sync {
    /// Declared dependencies of an installed distribution, as PEP 508 strings.
    fn dependencies(&self, installed: &InstalledDistribution) -> Result<Vec<String>>;
}

pub trait FileSystem: Send + Sync {
    fn read_to_string(&self, path: &Path) -> Result<String>;
    fn write(&self, path: &Path, contents: &[u8]) -> Result<()>;
    fn create_dir_all(&self, path: &Path) -> Result<()>;
    fn remove_file(&self, path: &Path) -> Result<()>;
    fn remove_dir_all(&self, path: &Path) -> Result<()>;
    fn exists(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;
    fn list_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;
}

pub trait Effects: Send + Sync {
    fn installer(&self) -> &dyn Installer;
    fn discovery(&self) -> &dyn DependencyDiscovery;
    fn fs(&self) -> &dyn FileSystem;
}

pub struct SystemEffects {
    installer: Arc<PipInstaller>,
    discovery: Arc<MetadataDiscovery>,
    fs: Arc<SystemFileSystem>,
}

impl SystemEffects {
    #[must_use]
    pub fn new() -> Self {
        Self {
            installer: Arc::new(PipInstaller),
            discovery: Arc::new(MetadataDiscovery),
            fs: Arc::new(SystemFileSystem),
        }
    }
}

impl Default for SystemEffects {
    fn default() -> Self {
        Self::new()
    }
}

impl Effects for SystemEffects {
    fn installer(&self) -> &dyn Installer {
        self.installer.as_ref()
    }

    fn discovery(&self) -> &dyn DependencyDiscovery {
        self.discovery.as_ref()
    }

    fn fs(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }
}

/// Serves dependencies from the `Requires-Dist` entries captured at install.
struct MetadataDiscovery;

impl DependencyDiscovery for MetadataDiscovery {
    fn dependencies(&self, installed: &InstalledDistribution) -> Result<Vec<String>> {
        Ok(requires_dist(installed))
    }
}

pub(crate) struct SystemFileSystem;

impl FileSystem for SystemFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        std::fs::write(path, contents).with_context(|| format!("writing {}", path.display()))
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        std::fs::create_dir_all(path).with_context(|| format!("creating {}", path.display()))
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        std::fs::remove_file(path).with_context(|| format!("removing file {}", path.display()))
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        std::fs::remove_dir_all(path).with_context(|| format!("removing dir {}", path.display()))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let entries =
            std::fs::read_dir(path).with_context(|| format!("reading dir {}", path.display()))?;
        let mut paths = entries
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<Vec<_>>>()
            .with_context(|| format!("reading dir {}", path.display()))?;
        paths.sort();
        Ok(paths)
    }
}

pub type SharedEffects = Arc<dyn Effects>;
