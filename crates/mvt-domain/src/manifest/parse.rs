use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::library::{UsedBy, VendoredLibrary};

pub(crate) const COLUMN_SEPARATOR: &str = " | ";
const NOTE_SEPARATOR: &str = "<br>";
const MODULE_PREFIXES: [&str; 3] = ["File: ", "Module: ", "Modules: "];

static PACKAGE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:\*\*|__)?`(?P<name>[\w.-]+)(?:\[(?P<extras>[\w.,-]+)\])?`(?:\*\*|__)?")
        .expect("package pattern")
});

static SINGLE_FILE_PACKAGE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^<code><b>(?P<name>[\w.-]+)</b>\.py</code>").expect("single file pattern")
});

static VERSION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)^(?:\w+/)?",
        r"\[(?:",
        r"(?:(?P<branch>.+?)@)?(?P<git>commit|[a-f0-9]+)",
        r"|(?P<version>.+?)",
        r")\]",
        r"\((?P<url>[\w.:/-]+)\)",
    ))
    .expect("version pattern")
});

static URL_COMMIT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)/([a-f0-9]{40})/?").expect("commit pattern"));

/// Which part of a row could not be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseSection {
    Columns,
    Folder,
    Package,
    Version,
    Url,
    Notes,
}

impl fmt::Display for ParseSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParseSection::Columns => "columns",
            ParseSection::Folder => "folder",
            ParseSection::Package => "package",
            ParseSection::Version => "version",
            ParseSection::Url => "url",
            ParseSection::Notes => "notes",
        };
        f.write_str(name)
    }
}

/// A manifest row that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineParseError {
    pub line: String,
    pub line_no: Option<usize>,
    pub section: ParseSection,
    pub part: Option<String>,
}

impl LineParseError {
    pub fn new(
        line: &str,
        line_no: Option<usize>,
        section: ParseSection,
        part: Option<&str>,
    ) -> Self {
        Self {
            line: line.to_string(),
            line_no,
            section,
            part: part.map(ToString::to_string),
        }
    }
}

impl fmt::Display for LineParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const WIDTH: usize = 36;
        let spacer = "=".repeat(WIDTH + 4);
        let (failed_header, line_header) = match self.line_no {
            Some(no) => (
                format!("Failed to parse {} on line {no}:", self.section),
                format!("Full line ({no}):"),
            ),
            None => (
                format!("Failed to parse {}:", self.section),
                "Full line:".to_string(),
            ),
        };
        writeln!(f, "{spacer}")?;
        writeln!(f, "| {failed_header:^WIDTH$} |")?;
        writeln!(f, "{spacer}")?;
        if let Some(part) = &self.part {
            writeln!(f, "{part}")?;
            writeln!(f, "{spacer}")?;
            writeln!(f, "| {line_header:^WIDTH$} |")?;
            writeln!(f, "{spacer}")?;
        }
        writeln!(f, "{}", self.line)?;
        write!(f, "{spacer}")
    }
}

impl std::error::Error for LineParseError {}

pub type LineResult = Result<VendoredLibrary, LineParseError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PackageCell {
    pub name: String,
    pub extras: Vec<String>,
    pub implied_module: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct VersionCell {
    pub version: Option<String>,
    pub url: Option<String>,
    pub git: bool,
    pub branch: Option<String>,
}

pub(crate) fn split_columns(line: &str) -> Option<[&str; 5]> {
    let columns: Vec<&str> = line.split(COLUMN_SEPARATOR).collect();
    <[&str; 5]>::try_from(columns).ok()
}

/// Folder names keep their own underscores; only a wrapping `**` or `__` pair is bold markup.
pub(crate) fn parse_folder(raw: &str) -> Option<Vec<String>> {
    let trimmed = raw.trim();
    let trimmed = ["**", "__"]
        .iter()
        .find_map(|mark| trimmed.strip_prefix(mark)?.strip_suffix(mark))
        .unwrap_or(trimmed)
        .trim();
    if trimmed.is_empty() {
        return None;
    }
    let folders: Vec<String> = trimmed.split_whitespace().map(ToString::to_string).collect();
    (folders.len() <= 2).then_some(folders)
}

pub(crate) fn parse_package(raw: &str) -> Option<PackageCell> {
    if let Some(caps) = PACKAGE_PATTERN.captures(raw) {
        let extras = caps
            .name("extras")
            .map(|m| m.as_str().split(',').map(ToString::to_string).collect())
            .unwrap_or_default();
        return Some(PackageCell {
            name: caps["name"].to_string(),
            extras,
            implied_module: None,
        });
    }
    let caps = SINGLE_FILE_PACKAGE_PATTERN.captures(raw)?;
    let name = caps["name"].to_string();
    Some(PackageCell {
        implied_module: Some(format!("{name}.py")),
        name,
        extras: Vec::new(),
    })
}

/// Decodes the version cell; commit-only cells recover the full hash from the URL.
pub(crate) fn parse_version(raw: &str) -> Result<VersionCell, ParseSection> {
    if raw == "-" {
        return Ok(VersionCell::default());
    }
    let caps = VERSION_PATTERN.captures(raw).ok_or(ParseSection::Version)?;
    let url = caps["url"].to_string();
    let branch = caps.name("branch").map(|m| m.as_str().to_string());
    let commit = commit_from_url(&url);
    let version = match caps.name("git").map(|m| m.as_str()) {
        // `[2](.../2/)` is a release that happens to look like a short hash.
        Some(token)
            if branch.is_none() && commit.is_none() && token.bytes().all(|b| b.is_ascii_digit()) =>
        {
            return Ok(VersionCell {
                version: Some(token.to_string()),
                git: false,
                branch: None,
                url: Some(url),
            });
        }
        Some(_) => Some(commit.ok_or(ParseSection::Url)?),
        None => caps.name("version").map(|m| m.as_str().to_string()),
    };
    Ok(VersionCell {
        git: caps.name("git").is_some(),
        version,
        branch,
        url: Some(url),
    })
}

pub(crate) fn commit_from_url(url: &str) -> Option<String> {
    URL_COMMIT_PATTERN
        .captures(url)
        .map(|caps| caps[1].to_string())
}

/// Splits the notes cell into free-text notes and an optional module list.
pub(crate) fn parse_notes(raw: &str) -> Option<(Vec<String>, Vec<String>)> {
    let mut notes = Vec::new();
    let mut modules = Vec::new();
    for segment in raw.split(NOTE_SEPARATOR) {
        if let Some(listed) = MODULE_PREFIXES
            .iter()
            .find_map(|prefix| segment.strip_prefix(prefix))
        {
            modules = listed
                .split(", ")
                .map(|m| m.trim_matches('`').to_string())
                .collect();
            if modules.iter().any(String::is_empty) {
                return None;
            }
            continue;
        }
        if segment == "-" {
            continue;
        }
        notes.push(segment.to_string());
    }
    Some((notes, modules))
}

/// Decodes one table row. `line_no` is the 1-based position in the document.
pub fn parse_line(line: &str, line_no: usize) -> LineResult {
    let line = line.trim_end_matches(['\r', '\n']);
    let fail = |section, part: Option<&str>| LineParseError::new(line, Some(line_no), section, part);

    let [raw_folder, raw_package, raw_version, raw_usage, raw_notes] =
        split_columns(line).ok_or_else(|| fail(ParseSection::Columns, None))?;

    let folder =
        parse_folder(raw_folder).ok_or_else(|| fail(ParseSection::Folder, Some(raw_folder)))?;
    let usage = UsedBy::parse(raw_usage);
    let package =
        parse_package(raw_package).ok_or_else(|| fail(ParseSection::Package, Some(raw_package)))?;
    let version = parse_version(raw_version).map_err(|section| match section {
        ParseSection::Url => {
            let url = VERSION_PATTERN
                .captures(raw_version)
                .map_or(raw_version, |caps| caps.name("url").map_or(raw_version, |m| m.as_str()));
            fail(ParseSection::Url, Some(url))
        }
        other => fail(other, Some(raw_version)),
    })?;
    let (notes, mut modules) =
        parse_notes(raw_notes).ok_or_else(|| fail(ParseSection::Notes, Some(raw_notes)))?;

    if modules.is_empty() {
        modules.push(
            package
                .implied_module
                .clone()
                .unwrap_or_else(|| package.name.clone()),
        );
    }

    Ok(VendoredLibrary {
        folder,
        name: package.name,
        extras: package.extras,
        version: version.version,
        modules,
        git: version.git,
        branch: version.branch,
        url: version.url,
        usage,
        notes,
    })
}
