#![deny(clippy::all, warnings)]

mod core;

pub use crate::core::commands::{
    check_manifest, generate_requirements, make_manifest, parse_manifest, remove_package,
    sort_manifests, update_package, vendor_package, CheckRequest, GenRequest, MakeRequest,
    PackageSpec, ParseRequest, RemoveRequest, SortRequest, UpdateRequest, VendorRequest,
    DEFAULT_EXT_README, DEFAULT_LIB_README, DEFAULT_REQUIREMENTS_JSON, DEFAULT_REQUIREMENTS_TXT,
};
pub use crate::core::config::context::{CommandContext, CommandInfo};
pub use crate::core::config::{
    Config, GlobalOptions, InstallConfig, PythonConfig, DEFAULT_PYTHON2, DEFAULT_PYTHON3,
    DEFAULT_TARGET_PYTHON, DEFAULT_TEMP_DIR, PYTHON2_MARKER_VERSION,
};
pub use crate::core::install::{
    parse_direct_url, parse_metadata, pip_requirement, top_level_modules, CoreMetadata,
    DirectUrl, InstallFailed, InstallRequest, InstalledDistribution, PipInstaller, VcsInfo,
};
pub use crate::core::runtime::effects::{
    DependencyDiscovery, Effects, FileSystem, Installer, SharedEffects, SystemEffects,
};
pub use crate::core::runtime::process::{run_command, RunOutput};
pub use crate::core::runtime::{format_status_message, to_json_response, CommandGroup, MVT_VERSION};
pub use crate::core::tooling::outcome::{CommandStatus, ExecutionOutcome};
