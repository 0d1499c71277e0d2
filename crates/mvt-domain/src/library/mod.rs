mod list;
mod usage;

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

pub use list::{ListError, VendoredList};
pub use usage::{
    EntryKind, UsageError, UsageState, UsedBy, UsedByModule, HOST_PROJECT, UNUSED_TOKEN,
    UPDATE_ME_TOKEN,
};

static GITHUB_SLUG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)github\.com/(?P<slug>[^/]+/[^/]+)/").expect("github slug pattern")
});

/// One decoded manifest row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendoredLibrary {
    pub folder: Vec<String>,
    pub name: String,
    #[serde(default)]
    pub extras: Vec<String>,
    pub version: Option<String>,
    #[serde(default)]
    pub modules: Vec<String>,
    #[serde(default)]
    pub git: bool,
    #[serde(default)]
    pub branch: Option<String>,
    pub url: Option<String>,
    #[serde(default)]
    pub usage: UsedBy,
    #[serde(default)]
    pub notes: Vec<String>,
}

impl VendoredLibrary {
    /// Creates a record whose only module is the package name itself.
    pub fn new(name: impl Into<String>, folder: Vec<String>) -> Self {
        let name = name.into();
        Self {
            folder,
            modules: vec![name.clone()],
            name,
            extras: Vec::new(),
            version: None,
            git: false,
            branch: None,
            url: None,
            usage: UsedBy::new(),
            notes: Vec::new(),
        }
    }

    pub fn key(&self) -> String {
        self.name.to_lowercase()
    }

    /// Restores the non-empty module list after decoding partial input.
    pub(crate) fn normalize(&mut self) {
        if self.modules.is_empty() {
            self.modules.push(self.name.clone());
        }
    }

    /// Name plus bracketed extras, e.g. `beautifulsoup4[html5lib]`.
    pub fn package(&self) -> String {
        if self.extras.is_empty() {
            self.name.clone()
        } else {
            format!("{}[{}]", self.name, self.extras.join(","))
        }
    }

    pub fn targets_python2(&self) -> bool {
        self.folder.iter().any(|f| f.ends_with('2'))
    }

    pub fn targets_python3(&self) -> bool {
        self.folder.iter().any(|f| f.ends_with('3'))
    }

    /// Install marker suffix, present only for single-major installs.
    pub fn markers(&self) -> String {
        match (self.targets_python2(), self.targets_python3()) {
            (true, false) => " ; python_version == '2.*'".to_string(),
            (false, true) => " ; python_version == '3.*'".to_string(),
            _ => String::new(),
        }
    }

    pub fn main_module(&self) -> &str {
        self.modules.first().map_or(self.name.as_str(), String::as_str)
    }

    pub fn is_main_module_file(&self) -> bool {
        self.main_module().ends_with(".py")
    }

    pub fn main_module_matches_package_name(&self) -> bool {
        self.main_module() == self.name
    }

    /// False without an origin URL or when it points at a single blob.
    pub fn updatable(&self) -> bool {
        self.url.as_deref().is_some_and(|url| !url.contains("/blob/"))
    }

    fn github_slug(&self) -> Option<&str> {
        let url = self.url.as_deref()?;
        GITHUB_SLUG
            .captures(url)
            .and_then(|caps| caps.name("slug"))
            .map(|m| m.as_str())
    }

    /// Pinned pip requirement reproducing this exact install.
    pub fn as_requirement(&self) -> Option<String> {
        if !self.updatable() {
            return None;
        }
        let version = self.version.as_deref()?;
        let package = self.package();
        let markers = self.markers();
        if !self.git {
            return Some(format!("{package}=={version}{markers}"));
        }
        match self.github_slug() {
            Some(slug) => Some(format!(
                "{package} @ https://codeload.github.com/{slug}/tar.gz/{version}{markers}"
            )),
            None => self
                .url
                .as_deref()
                .map(|url| format!("{package} @ {url}{markers}")),
        }
    }

    /// Requirement that fetches the newest release (or branch head).
    pub fn as_update_requirement(&self) -> Option<String> {
        if !self.updatable() {
            return None;
        }
        let package = self.package();
        if !self.git {
            return Some(package);
        }
        match self.github_slug() {
            Some(slug) => {
                let commit_ish = self.branch.as_deref().unwrap_or("HEAD");
                Some(format!(
                    "{package} @ https://github.com/{slug}/archive/{commit_ish}.tar.gz"
                ))
            }
            None => self.url.as_deref().map(|url| format!("{package} @ {url}")),
        }
    }

    pub fn used_by(&self, name: &str) -> bool {
        self.usage.contains(name)
    }
}

impl fmt::Display for VendoredLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    fn lib(name: &str, folder: &[&str]) -> VendoredLibrary {
        VendoredLibrary::new(name, folder.iter().map(ToString::to_string).collect())
    }

    pub(crate) fn adba() -> VendoredLibrary {
        let mut lib = lib("adba", &["ext"]);
        lib.version = Some("6efeff3a6bdcb6d45a4a79f424939ade2930e5f0".into());
        lib.git = true;
        lib.url = Some(
            "https://github.com/pymedusa/adba/tree/6efeff3a6bdcb6d45a4a79f424939ade2930e5f0"
                .into(),
        );
        lib.usage = UsedBy::from_names(["medusa"]).unwrap();
        lib
    }

    pub(crate) fn appdirs() -> VendoredLibrary {
        let mut lib = lib("appdirs", &["ext"]);
        lib.version = Some("1.4.3".into());
        lib.modules = vec!["appdirs.py".into()];
        lib.url = Some("https://pypi.org/project/appdirs/1.4.3/".into());
        lib.usage.add("simpleanidb", "").unwrap();
        lib.usage.add("subliminal", "(cli only)").unwrap();
        lib
    }

    pub(crate) fn bleach() -> VendoredLibrary {
        let mut lib = lib("bleach", &["ext"]);
        lib.version = Some("2".into());
        lib.url = Some("https://pypi.org/project/bleach/2/".into());
        lib.usage = UsedBy::from_names(["medusa"]).unwrap();
        lib
    }

    pub(crate) fn backports_abc() -> VendoredLibrary {
        let mut lib = lib("backports_abc", &["ext2"]);
        lib.version = Some("0.5".into());
        lib.modules = vec!["backports_abc.py".into()];
        lib.url = Some("https://pypi.org/project/backports_abc/0.5/".into());
        lib.usage = UsedBy::from_names(["tornado"]).unwrap();
        lib
    }

    pub(crate) fn beautifulsoup4() -> VendoredLibrary {
        let mut lib = lib("beautifulsoup4", &["ext2", "ext3"]);
        lib.extras = vec!["html5lib".into()];
        lib.version = Some("4.9.1".into());
        lib.modules = vec!["bs4".into()];
        lib.url = Some("https://pypi.org/project/beautifulsoup4/4.9.1/".into());
        lib.usage = UsedBy::from_names(["medusa", "subliminal"]).unwrap();
        lib
    }

    pub(crate) fn cachecontrol() -> VendoredLibrary {
        let mut lib = lib("CacheControl", &["ext"]);
        lib.version = Some("0.12.6".into());
        lib.modules = vec!["cachecontrol".into()];
        lib.url = Some("https://pypi.org/project/CacheControl/0.12.6/".into());
        lib.usage = UsedBy::from_names(["medusa"]).unwrap();
        lib
    }

    pub(crate) fn html5lib() -> VendoredLibrary {
        let mut lib = lib("html5lib", &["ext"]);
        lib.version = Some("1.1".into());
        lib.url = Some("https://pypi.org/project/html5lib/1.1/".into());
        lib.usage.add("medusa", "(via `beautifulsoup4`)").unwrap();
        lib.usage.add("beautifulsoup4", "").unwrap();
        lib
    }

    pub(crate) fn subliminal() -> VendoredLibrary {
        let mut lib = lib("subliminal", &["ext"]);
        lib.version = Some("76525cc2f6545aeeccf620ca46d40c2f0aa53c6d".into());
        lib.git = true;
        lib.branch = Some("develop".into());
        lib.url = Some(
            "https://github.com/Diaoul/subliminal/tree/76525cc2f6545aeeccf620ca46d40c2f0aa53c6d"
                .into(),
        );
        lib.usage = UsedBy::from_names(["medusa"]).unwrap();
        lib
    }

    pub(crate) fn pytimeparse() -> VendoredLibrary {
        let mut lib = lib("pytimeparse", &["ext"]);
        lib.version = Some("8f2832597235c6ec98c44de4dab3274927f67e29".into());
        lib.git = true;
        lib.url = Some(
            "https://github.com/pymedusa/pytimeparse/tree/8f2832597235c6ec98c44de4dab3274927f67e29"
                .into(),
        );
        lib.usage = UsedBy::from_names(["medusa"]).unwrap();
        lib
    }

    pub(crate) fn configobj() -> VendoredLibrary {
        let mut lib = lib("configobj", &["ext"]);
        lib.version = Some("5.0.6".into());
        lib.modules = vec!["configobj.py".into(), "validate.py".into(), "_version.py".into()];
        lib.url = Some("https://pypi.org/project/configobj/5.0.6/".into());
        lib.usage = UsedBy::from_names(["medusa"]).unwrap();
        lib
    }

    pub(crate) fn ttl_cache() -> VendoredLibrary {
        let mut lib = lib("ttl-cache", &["ext"]);
        lib.version = Some("1.6".into());
        lib.modules = vec!["ttl_cache.py".into()];
        lib.url = Some("https://pypi.org/project/ttl-cache/1.6/".into());
        lib.usage = UsedBy::from_names(["medusa"]).unwrap();
        lib
    }

    pub(crate) fn not_a_package() -> VendoredLibrary {
        let mut lib = lib("zzz-not-a-package", &["ext"]);
        lib.modules = vec!["my_module".into()];
        lib
    }

    pub(crate) fn single_file_from_github() -> VendoredLibrary {
        let mut lib = lib("zzz-single-file-from-github", &["ext"]);
        lib.version = Some("abcdef0123456789abcdef0123456789abcdef01".into());
        lib.git = true;
        lib.modules = vec!["my_file.py".into()];
        lib.url = Some(
            "https://github.com/owner/repo/blob/abcdef0123456789abcdef0123456789abcdef01/path/to/my_file.py"
                .into(),
        );
        lib.usage.mark_needs_review();
        lib
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;

    #[test]
    fn git_record_pins_codeload_archive() {
        let lib = adba();
        assert_eq!(lib.package(), "adba");
        assert_eq!(lib.markers(), "");
        assert!(lib.updatable());
        assert_eq!(
            lib.as_requirement().as_deref(),
            Some("adba @ https://codeload.github.com/pymedusa/adba/tar.gz/6efeff3a6bdcb6d45a4a79f424939ade2930e5f0")
        );
        assert_eq!(
            lib.as_update_requirement().as_deref(),
            Some("adba @ https://github.com/pymedusa/adba/archive/HEAD.tar.gz")
        );
        assert!(lib.main_module_matches_package_name());
        assert!(!lib.is_main_module_file());
    }

    #[test]
    fn branch_is_used_for_update_requirement() {
        let lib = subliminal();
        assert_eq!(
            lib.as_update_requirement().as_deref(),
            Some("subliminal @ https://github.com/Diaoul/subliminal/archive/develop.tar.gz")
        );
    }

    #[test]
    fn released_single_file_record() {
        let lib = appdirs();
        assert_eq!(lib.as_requirement().as_deref(), Some("appdirs==1.4.3"));
        assert_eq!(lib.as_update_requirement().as_deref(), Some("appdirs"));
        assert_eq!(lib.main_module(), "appdirs.py");
        assert!(!lib.main_module_matches_package_name());
        assert!(lib.is_main_module_file());
        assert_eq!(lib.to_string(), "appdirs");
    }

    #[test]
    fn python2_only_folder_adds_markers() {
        let lib = backports_abc();
        assert_eq!(lib.markers(), " ; python_version == '2.*'");
        assert_eq!(
            lib.as_requirement().as_deref(),
            Some("backports_abc==0.5 ; python_version == '2.*'")
        );
        assert_eq!(lib.as_update_requirement().as_deref(), Some("backports_abc"));
    }

    #[test]
    fn both_majors_means_no_markers() {
        let lib = beautifulsoup4();
        assert_eq!(lib.package(), "beautifulsoup4[html5lib]");
        assert_eq!(lib.markers(), "");
        assert_eq!(
            lib.as_requirement().as_deref(),
            Some("beautifulsoup4[html5lib]==4.9.1")
        );
        assert_eq!(
            lib.as_update_requirement().as_deref(),
            Some("beautifulsoup4[html5lib]")
        );
    }

    #[test]
    fn records_without_reproducible_origin_are_not_updatable() {
        let broken = not_a_package();
        assert!(!broken.updatable());
        assert_eq!(broken.as_requirement(), None);
        assert_eq!(broken.as_update_requirement(), None);

        let blob = single_file_from_github();
        assert!(!blob.updatable());
        assert_eq!(blob.as_requirement(), None);
        assert_eq!(blob.as_update_requirement(), None);
    }

    #[test]
    fn json_defaults_modules_to_name() {
        let mut lib: super::VendoredLibrary = serde_json::from_value(serde_json::json!({
            "folder": ["ext"],
            "name": "six",
            "version": "1.15.0",
            "url": "https://pypi.org/project/six/1.15.0/",
            "usage": ["medusa"]
        }))
        .unwrap();
        lib.normalize();
        assert_eq!(lib.modules, vec!["six"]);
        assert!(lib.used_by("Medusa"));
    }
}
