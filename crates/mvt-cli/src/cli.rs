use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use mvt_core::{DEFAULT_EXT_README, DEFAULT_REQUIREMENTS_JSON, DEFAULT_REQUIREMENTS_TXT};

pub const MVT_HELP_TEMPLATE: &str =
    "{before-help}\nUsage:\n    {usage}\n\nGlobal options:\n{options}\n";

pub const MVT_BEFORE_HELP: &str = concat!(
    "mvt ",
    env!("CARGO_PKG_VERSION"),
    " – Vendored library manifest tools\n\n",
    "\x1b[1;36mLibraries\x1b[0m\n",
    "  vendor           Install a package into a vendor folder and record it.\n",
    "  remove           Delete a vendored package and drop its record.\n",
    "  update           Re-vendor a recorded package from its origin.\n\n",
    "\x1b[1;36mManifests\x1b[0m\n",
    "  gen              Write requirements.txt (or .json) from a manifest.\n",
    "  parse            Report the packages and bad rows of a manifest.\n",
    "  check            Verify that every recorded module exists on disk.\n",
    "  sort             Sort ext/readme.md and lib/readme.md by package name.\n",
    "  make             Render a manifest from requirements.json.\n",
);

#[derive(Parser, Debug)]
#[command(
    name = "mvt",
    author,
    version,
    propagate_version = false,
    disable_help_subcommand = true,
    before_help = MVT_BEFORE_HELP,
    help_template = MVT_HELP_TEMPLATE
)]
#[allow(clippy::struct_excessive_bools)]
pub struct MvtCli {
    #[arg(
        short,
        long,
        help = "Suppress human output (errors still print to stderr)",
        global = true
    )]
    pub quiet: bool,
    #[arg(
        short,
        long,
        action = ArgAction::Count,
        help = "Increase logging (-vv reaches trace)",
        global = true
    )]
    pub verbose: u8,
    #[arg(long, help = "Force trace logging regardless of -v/-q", global = true)]
    pub trace: bool,
    #[arg(
        long,
        help = "Emit {status,message,details} JSON envelopes",
        global = true
    )]
    pub json: bool,
    #[arg(long, help = "Disable colored human output", global = true)]
    pub no_color: bool,
    #[command(subcommand)]
    pub command: CommandGroupCli,
}

#[derive(Subcommand, Debug)]
pub enum CommandGroupCli {
    #[command(about = "Vendor a package into the folder its manifest describes.")]
    Vendor(VendorArgs),
    #[command(about = "Remove a vendored package, its modules and its record.")]
    Remove(RemoveArgs),
    #[command(about = "Re-vendor a recorded package from its release or git branch.")]
    Update(UpdateArgs),
    #[command(about = "Generate a requirements file from a manifest.")]
    Gen(GenArgs),
    #[command(about = "Parse a manifest and report every package and bad row.")]
    Parse(FileArgs),
    #[command(about = "Check that the modules of every record exist on disk.")]
    Check(FileArgs),
    #[command(about = "Sort the vendor manifests by package name.")]
    Sort,
    #[command(about = "Render a manifest from a requirements JSON file.")]
    Make(MakeArgs),
}

#[derive(Args, Debug)]
pub struct ListfileArgs {
    #[arg(
        short = 'f',
        long = "listfile",
        value_name = "LISTFILE",
        default_value = DEFAULT_EXT_README,
        help = "Manifest recording the vendored libraries"
    )]
    pub listfile: PathBuf,
}

#[derive(Args, Debug)]
pub struct VendorArgs {
    #[arg(value_name = "PACKAGE", help = "Requirement or URL (with #egg=name) to vendor")]
    pub package: String,
    #[arg(short = '2', long = "py2", help = "Install into the Python 2 folder")]
    pub py2: bool,
    #[arg(short = '3', long = "py3", help = "Install into the Python 3 folder")]
    pub py3: bool,
    #[arg(
        short = 'd',
        long = "dependent",
        value_name = "DEPENDENT",
        help = "Library that uses the package (repeatable)"
    )]
    pub dependents: Vec<String>,
    #[command(flatten)]
    pub list: ListfileArgs,
}

#[derive(Args, Debug)]
pub struct RemoveArgs {
    #[arg(value_name = "PACKAGE")]
    pub package: String,
    #[command(flatten)]
    pub list: ListfileArgs,
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    #[arg(value_name = "PACKAGE")]
    pub package: String,
    #[arg(long, help = "Print the vendor command instead of running it")]
    pub cmd: bool,
    #[command(flatten)]
    pub list: ListfileArgs,
}

#[derive(Args, Debug)]
pub struct GenArgs {
    #[arg(
        short = 'i',
        long = "infile",
        value_name = "IN",
        default_value = DEFAULT_EXT_README
    )]
    pub infile: PathBuf,
    #[arg(
        short = 'o',
        long = "outfile",
        value_name = "OUT",
        default_value = DEFAULT_REQUIREMENTS_TXT
    )]
    pub outfile: PathBuf,
    #[arg(
        short = 'a',
        long = "all-packages",
        help = "Include packages not used by the host project"
    )]
    pub all_packages: bool,
    // `--json` is taken by the global envelope flag.
    #[arg(
        short = 'j',
        long = "json-output",
        id = "json_output",
        help = "Write requirements.json instead of requirements.txt"
    )]
    pub json_output: bool,
}

#[derive(Args, Debug)]
pub struct FileArgs {
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
}

#[derive(Args, Debug)]
pub struct MakeArgs {
    #[arg(
        short = 'i',
        long = "infile",
        value_name = "IN",
        default_value = DEFAULT_REQUIREMENTS_JSON
    )]
    pub infile: PathBuf,
    #[arg(
        short = 'o',
        long = "outfile",
        value_name = "OUT",
        default_value = DEFAULT_EXT_README
    )]
    pub outfile: PathBuf,
}
