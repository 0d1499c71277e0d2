use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};

/// Name of the project the libraries are vendored into.
pub const HOST_PROJECT: &str = "medusa";

/// Placeholder rendered when nothing is known to use a library.
pub const UNUSED_TOKEN: &str = "<UNUSED>";

/// Placeholder member asking a human to classify the usage.
pub const UPDATE_ME_TOKEN: &str = "<UPDATE-ME>";

/// Entries containing this token are low-confidence guesses and sort last.
const UNKNOWN_TOKEN: &str = "unknown";

static ENTRY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\*\*|__)?`(?P<name>[^`]+)`(?:\*\*|__)?(?:\s+(?P<extra>.*))?$")
        .expect("usage entry pattern")
});

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum UsageError {
    #[error("`{0}` is already listed as a user")]
    Duplicate(String),
    #[error("`{0}` is not listed as a user")]
    Missing(String),
}

/// What a usage entry stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EntryKind {
    HostProject,
    Consumer,
    /// Manual-classification placeholder (`<UPDATE-ME>`).
    NeedsReview,
    /// Low-confidence guess, named with `unknown`.
    Guess,
}

impl EntryKind {
    fn of(name: &str) -> Self {
        let key = name.to_lowercase();
        if key == HOST_PROJECT {
            Self::HostProject
        } else if name == UPDATE_ME_TOKEN {
            Self::NeedsReview
        } else if key.contains(UNKNOWN_TOKEN) {
            Self::Guess
        } else {
            Self::Consumer
        }
    }

    /// Host first, guesses last, everything else in between.
    fn rank(self) -> u8 {
        match self {
            Self::HostProject => 0,
            Self::Consumer | Self::NeedsReview => 1,
            Self::Guess => 2,
        }
    }
}

/// One library (or the host project) that depends on a vendored library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsedByModule {
    pub name: String,
    pub extra: String,
    kind: EntryKind,
}

impl UsedByModule {
    pub fn new(name: impl Into<String>, extra: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            kind: EntryKind::of(&name),
            name,
            extra: extra.into(),
        }
    }

    pub fn key(&self) -> String {
        self.name.to_lowercase()
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn is_host_project(&self) -> bool {
        self.kind == EntryKind::HostProject
    }

    pub fn is_placeholder(&self) -> bool {
        self.kind == EntryKind::NeedsReview
    }
}

impl fmt::Display for UsedByModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_host_project() {
            write!(f, "**`{}`**", self.name)?;
        } else {
            write!(f, "`{}`", self.name)?;
        }
        if !self.extra.is_empty() {
            write!(f, " {}", self.extra)?;
        }
        Ok(())
    }
}

/// Coarse state of a usage graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageState {
    /// Nothing is known to depend on the library.
    Unused,
    /// Only the manual-classification placeholder is present.
    NeedsReview,
    /// At least one real consumer is recorded.
    Used,
}

/// The "used by" column of a manifest row.
///
/// Entries are stored by lower-cased name; the display order is computed on
/// every read: the host project first, `unknown` guesses last and everything
/// else alphabetically in between.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsedBy {
    entries: HashMap<String, UsedByModule>,
}

impl UsedBy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes a manifest cell such as ``**`medusa`** (via `bs4`), `tornado` ``.
    pub fn parse(cell: &str) -> Self {
        let mut usage = Self::new();
        for token in split_entries(cell) {
            let entry = match ENTRY_PATTERN.captures(token) {
                Some(caps) => UsedByModule::new(
                    &caps["name"],
                    caps.name("extra").map_or("", |m| m.as_str().trim()),
                ),
                None => UsedByModule::new(token.trim_matches(|c| c == '`' || c == '*'), ""),
            };
            if entry.name.is_empty() {
                continue;
            }
            if usage.insert(entry).is_err() {
                tracing::debug!(cell, "ignoring repeated usage entry");
            }
        }
        usage
    }

    pub fn from_names<I, S>(names: I) -> Result<Self, UsageError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut usage = Self::new();
        for name in names {
            usage.add(name, "")?;
        }
        Ok(usage)
    }

    /// # Errors
    /// Returns [`UsageError::Duplicate`] when the name is already present.
    pub fn add(&mut self, name: impl Into<String>, extra: impl Into<String>) -> Result<(), UsageError> {
        self.insert(UsedByModule::new(name, extra))
    }

    /// `<UNUSED>` is only ever the display of an empty graph, so it is dropped.
    fn insert(&mut self, entry: UsedByModule) -> Result<(), UsageError> {
        if entry.name.eq_ignore_ascii_case(UNUSED_TOKEN) {
            tracing::debug!("ignoring the unused placeholder as a usage entry");
            return Ok(());
        }
        let key = entry.key();
        if self.entries.contains_key(&key) {
            return Err(UsageError::Duplicate(entry.name));
        }
        self.entries.insert(key, entry);
        Ok(())
    }

    /// # Errors
    /// Returns [`UsageError::Missing`] when the name is not present.
    pub fn remove(&mut self, name: &str) -> Result<UsedByModule, UsageError> {
        self.entries
            .remove(&name.to_lowercase())
            .ok_or_else(|| UsageError::Missing(name.to_string()))
    }

    pub fn remove_ignore_missing(&mut self, name: &str) -> Option<UsedByModule> {
        self.entries.remove(&name.to_lowercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&name.to_lowercase())
    }

    pub fn get(&self, name: &str) -> Option<&UsedByModule> {
        self.entries.get(&name.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn state(&self) -> UsageState {
        if self.entries.is_empty() {
            UsageState::Unused
        } else if self.entries.values().all(UsedByModule::is_placeholder) {
            UsageState::NeedsReview
        } else {
            UsageState::Used
        }
    }

    /// Stores the manual-classification placeholder as a member.
    pub fn mark_needs_review(&mut self) {
        let _ = self.add(UPDATE_ME_TOKEN, "");
    }

    pub fn clear_placeholder(&mut self) -> bool {
        self.remove_ignore_missing(UPDATE_ME_TOKEN).is_some()
    }

    /// Entries in display order.
    pub fn ordered(&self) -> Vec<&UsedByModule> {
        let mut entries: Vec<&UsedByModule> = self.entries.values().collect();
        entries.sort_by(|a, b| {
            a.kind
                .rank()
                .cmp(&b.kind.rank())
                .then_with(|| a.key().cmp(&b.key()))
        });
        entries
    }

    /// Lower-cased names in display order.
    pub fn keys(&self) -> Vec<String> {
        self.ordered().into_iter().map(UsedByModule::key).collect()
    }
}

/// Splits a usage cell on `", "` outside of parentheses, so
/// ``(via `a`, `b`)`` stays attached to its entry.
fn split_entries(cell: &str) -> Vec<&str> {
    let cell = cell.trim();
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let bytes = cell.as_bytes();
    let mut idx = 0;
    while idx < bytes.len() {
        match bytes[idx] {
            b'(' => depth += 1,
            b')' => depth = depth.saturating_sub(1),
            b',' if depth == 0 && bytes.get(idx + 1) == Some(&b' ') => {
                parts.push(cell[start..idx].trim());
                start = idx + 2;
                idx += 1;
            }
            _ => {}
        }
        idx += 1;
    }
    parts.push(cell[start..].trim());
    parts.retain(|part| !part.is_empty());
    parts
}

impl fmt::Display for UsedBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.entries.is_empty() {
            return write!(f, "`{UNUSED_TOKEN}`");
        }
        let rendered: Vec<String> = self.ordered().iter().map(ToString::to_string).collect();
        f.write_str(&rendered.join(", "))
    }
}

impl Serialize for UsedBy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let ordered = self.ordered();
        let mut seq = serializer.serialize_seq(Some(ordered.len()))?;
        for entry in ordered {
            if entry.extra.is_empty() {
                seq.serialize_element(&entry.name)?;
            } else {
                seq.serialize_element(&[&entry.name, &entry.extra])?;
            }
        }
        seq.end()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Name(String),
    Pair(String, String),
}

impl<'de> Deserialize<'de> for UsedBy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct UsageVisitor;

        impl<'de> Visitor<'de> for UsageVisitor {
            type Value = UsedBy;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a list of names or [name, extra] pairs")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<UsedBy, A::Error> {
                let mut usage = UsedBy::new();
                while let Some(raw) = seq.next_element::<RawEntry>()? {
                    let (name, extra) = match raw {
                        RawEntry::Name(name) => (name, String::new()),
                        RawEntry::Pair(name, extra) => (name, extra),
                    };
                    usage.add(name, extra).map_err(de::Error::custom)?;
                }
                Ok(usage)
            }
        }

        deserializer.deserialize_seq(UsageVisitor)
    }
}
