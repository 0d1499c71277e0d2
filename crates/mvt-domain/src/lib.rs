#![deny(clippy::all, warnings)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]

pub mod library;
pub mod manifest;
pub mod paths;
pub mod reconcile;
pub mod requirements;

pub use library::{
    EntryKind, ListError, UsageError, UsageState, UsedBy, UsedByModule, VendoredLibrary,
    VendoredList, HOST_PROJECT, UNUSED_TOKEN, UPDATE_ME_TOKEN,
};
pub use manifest::{
    load_requirements, make_list_item, make_md, make_md_for, parse_line, sort_lines,
    LineParseError, LineResult, ManifestDocument, ManifestError, ParseSection, DEFAULT_TARGET,
};
pub use paths::{
    lexical_normalize, module_check_paths, module_relative_path, package_module_paths, ModuleCheck,
};
pub use reconcile::{
    canonical_name, folders_for_targets, marker_environment, merge_major_dependencies, reconcile,
    Advisory, DeclaredDependency, DependencyError, ReconcileReport, UsageChange,
};
pub use requirements::{render_requirements_json, render_requirements_txt, select_requirements};
