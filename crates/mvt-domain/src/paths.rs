//! Where a record's modules live on disk.

use std::path::{Component, Path, PathBuf};

use crate::library::VendoredLibrary;

/// Every `root/folder/module` path that stays inside its folder, in
/// folder-then-module order. Modules escaping the folder (`../x`) are
/// skipped with a warning.
pub fn package_module_paths(lib: &VendoredLibrary, root: &Path) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    for folder in &lib.folder {
        let target = lexical_normalize(&root.join(folder));
        for module in &lib.modules {
            let path = lexical_normalize(&target.join(module));
            if path != target && path.starts_with(&target) {
                paths.push(path);
            } else {
                tracing::warn!(
                    module = %module,
                    folder = %folder,
                    "module path escapes its folder, skipping"
                );
            }
        }
    }
    paths
}

/// Lexical normalization: drops `.` and folds `..` without touching the disk.
pub fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleCheck {
    pub module: String,
    pub paths: Vec<PathBuf>,
}

/// Relative path (inside a folder) a module name is expected at: dotted
/// names become directories, a trailing `.py` stays on the file name.
pub fn module_relative_path(module: &str) -> PathBuf {
    let (stem, suffix) = match module.strip_suffix(".py") {
        Some(stem) => (stem, ".py"),
        None => (module, ""),
    };
    let mut parts: Vec<String> = stem.split('.').map(ToString::to_string).collect();
    if let Some(last) = parts.last_mut() {
        last.push_str(suffix);
    }
    parts.iter().collect()
}

/// The paths each module must exist at, one per folder.
pub fn module_check_paths(lib: &VendoredLibrary, root: &Path) -> Vec<ModuleCheck> {
    lib.modules
        .iter()
        .map(|module| {
            let relative = module_relative_path(module);
            ModuleCheck {
                module: module.clone(),
                paths: lib
                    .folder
                    .iter()
                    .map(|folder| root.join(folder).join(&relative))
                    .collect(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::fixtures::*;

    #[test]
    fn module_paths_cover_every_folder() {
        let root = Path::new("/repo");
        let paths = package_module_paths(&beautifulsoup4(), root);
        assert_eq!(
            paths,
            vec![PathBuf::from("/repo/ext2/bs4"), PathBuf::from("/repo/ext3/bs4")]
        );
    }

    #[test]
    fn escaping_modules_are_skipped() {
        let mut lib = configobj();
        lib.modules = vec!["../setup.py".into(), "ok/../validate.py".into(), ".".into()];
        let paths = package_module_paths(&lib, Path::new("/repo"));
        assert_eq!(paths, vec![PathBuf::from("/repo/ext/validate.py")]);
    }

    #[test]
    fn relative_paths_follow_dotted_names() {
        assert_eq!(module_relative_path("six.py"), PathBuf::from("six.py"));
        assert_eq!(module_relative_path("a.b.py"), PathBuf::from("a/b.py"));
        assert_eq!(
            module_relative_path("backports.module"),
            PathBuf::from("backports/module")
        );
        assert_eq!(
            module_relative_path("backports/configparser"),
            PathBuf::from("backports/configparser")
        );
    }

    #[test]
    fn check_paths_per_folder() {
        let checks = module_check_paths(&beautifulsoup4(), Path::new("root"));
        assert_eq!(checks.len(), 1);
        assert_eq!(checks[0].module, "bs4");
        assert_eq!(
            checks[0].paths,
            vec![PathBuf::from("root/ext2/bs4"), PathBuf::from("root/ext3/bs4")]
        );
    }
}
