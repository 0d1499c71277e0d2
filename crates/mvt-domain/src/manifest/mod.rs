//! The vendored-library table: a markdown document with three header lines,
//! one row per library and free-form trailing notes.

mod parse;
mod render;

use std::fs;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};

use crate::library::{ListError, VendoredLibrary, VendoredList};

pub use parse::{parse_line, LineParseError, LineResult, ParseSection};
pub use render::{make_list_item, make_md, make_md_for};

/// Folder used for titles when a list has no records to infer it from.
pub const DEFAULT_TARGET: &str = "ext";

const HEADER_LEN: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("{} row(s) could not be parsed", .0.len())]
    Rows(Vec<LineParseError>),
    #[error(transparent)]
    List(#[from] ListError),
}

/// A parsed manifest that remembers the text around the table.
#[derive(Debug, Clone, Default)]
pub struct ManifestDocument {
    header: Vec<String>,
    rows: Vec<LineResult>,
    footer: Vec<String>,
}

impl ManifestDocument {
    pub fn parse(text: &str) -> Self {
        let lines: Vec<&str> = text.lines().collect();
        let header = lines
            .iter()
            .take(HEADER_LEN)
            .map(|line| (*line).to_string())
            .collect();
        let mut rows = Vec::new();
        let mut footer = Vec::new();
        for (idx, line) in lines.iter().enumerate().skip(HEADER_LEN) {
            if is_table_end(line) {
                footer = lines[idx..].iter().map(|l| (*l).to_string()).collect();
                break;
            }
            rows.push(parse_line(line, idx + 1));
        }
        Self {
            header,
            rows,
            footer,
        }
    }

    /// Reads a manifest from disk; a missing file is an empty document.
    ///
    /// # Errors
    /// Returns an error when the file exists but cannot be read.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(text) => Ok(Self::parse(&text)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(err).with_context(|| format!("failed to read {}", path.display())),
        }
    }

    pub fn rows(&self) -> &[LineResult] {
        &self.rows
    }

    pub fn libraries(&self) -> impl Iterator<Item = &VendoredLibrary> {
        self.rows.iter().filter_map(|row| row.as_ref().ok())
    }

    pub fn errors(&self) -> impl Iterator<Item = &LineParseError> {
        self.rows.iter().filter_map(|row| row.as_ref().err())
    }

    pub fn has_table(&self) -> bool {
        self.header.len() == HEADER_LEN
    }

    /// Collects every row into a list, failing on the first bad row set.
    ///
    /// # Errors
    /// Returns [`ManifestError::Rows`] when any row failed to parse and
    /// [`ManifestError::List`] when two rows share a name.
    pub fn to_list(&self) -> Result<VendoredList, ManifestError> {
        let errors: Vec<LineParseError> = self.errors().cloned().collect();
        if !errors.is_empty() {
            return Err(ManifestError::Rows(errors));
        }
        let mut list = VendoredList::new();
        for lib in self.libraries() {
            list.add(lib.clone())?;
        }
        Ok(list)
    }

    /// Collects the rows that parsed, skipping bad ones.
    ///
    /// # Errors
    /// Returns [`ListError::DuplicateName`] when two rows share a name.
    pub fn to_list_lossy(&self) -> Result<VendoredList, ListError> {
        let mut list = VendoredList::new();
        for lib in self.libraries() {
            list.add(lib.clone())?;
        }
        Ok(list)
    }

    /// Serializes `list` inside this document's header and footer, falling
    /// back to the canonical boilerplate for documents without a table.
    pub fn render(&self, list: &VendoredList, folder: &str) -> String {
        if !self.has_table() {
            return make_md_for(list, folder);
        }
        let mut lines = self.header.clone();
        lines.extend(list.iter().map(make_list_item));
        lines.extend(self.footer.iter().cloned());
        lines.join("\n") + "\n"
    }
}

/// Loads the libraries of the manifest at `path` along with the rows that
/// failed to parse. A missing file yields an empty list.
///
/// # Errors
/// Returns an error when the file cannot be read or two rows share a name.
pub fn load_requirements(path: &Path) -> Result<(VendoredList, Vec<LineParseError>)> {
    let doc = ManifestDocument::load(path)?;
    let list = doc
        .to_list_lossy()
        .with_context(|| format!("invalid manifest {}", path.display()))?;
    Ok((list, doc.errors().cloned().collect()))
}

fn is_table_end(line: &str) -> bool {
    line.trim().is_empty()
}

/// Sorts the table rows by lower-cased package name, leaving the rest alone.
///
/// # Errors
/// Returns the first row whose columns or package cell cannot be decoded.
pub fn sort_lines(text: &str) -> Result<String, LineParseError> {
    let lines: Vec<&str> = text.split_inclusive('\n').collect();
    if lines.len() <= HEADER_LEN {
        return Ok(text.to_string());
    }
    let end = lines
        .iter()
        .enumerate()
        .skip(HEADER_LEN)
        .find(|(_, line)| is_table_end(line))
        .map_or(lines.len(), |(idx, _)| idx);

    let mut keyed = Vec::with_capacity(end - HEADER_LEN);
    for (idx, line) in lines[HEADER_LEN..end].iter().enumerate() {
        keyed.push((sort_key(line, HEADER_LEN + idx + 1)?, *line));
    }
    keyed.sort_by(|a, b| a.0.cmp(&b.0));

    let mut out = String::with_capacity(text.len());
    out.extend(lines[..HEADER_LEN].iter().copied());
    let mut body: Vec<String> = keyed.into_iter().map(|(_, line)| line.to_string()).collect();
    if end == lines.len() {
        // The last row may lack a newline; keep rows separated after sorting.
        for row in &mut body {
            if !row.ends_with('\n') {
                row.push('\n');
            }
        }
        if !text.ends_with('\n') {
            if let Some(last) = body.last_mut() {
                last.pop();
            }
        }
    }
    out.extend(body);
    out.extend(lines[end..].iter().copied());
    Ok(out)
}

fn sort_key(line: &str, line_no: usize) -> Result<String, LineParseError> {
    let trimmed = line.trim();
    let columns = parse::split_columns(trimmed)
        .ok_or_else(|| LineParseError::new(trimmed, Some(line_no), ParseSection::Columns, None))?;
    let package = parse::parse_package(columns[1]).ok_or_else(|| {
        LineParseError::new(trimmed, Some(line_no), ParseSection::Package, Some(columns[1]))
    })?;
    Ok(package.name.to_lowercase())
}
