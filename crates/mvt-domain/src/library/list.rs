use std::collections::BTreeMap;

use super::VendoredLibrary;

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ListError {
    #[error("library `{0}` is already listed")]
    DuplicateName(String),
    #[error("library `{0}` is not listed")]
    MissingName(String),
}

/// Vendored libraries keyed by lower-cased name, iterated alphabetically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VendoredList {
    items: BTreeMap<String, VendoredLibrary>,
}

impl VendoredList {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    /// Fails on malformed JSON or when two records share a name.
    pub fn from_json(value: serde_json::Value) -> anyhow::Result<Self> {
        let records: Vec<VendoredLibrary> = serde_json::from_value(value)?;
        let mut list = Self::new();
        for mut record in records {
            record.normalize();
            list.add(record)?;
        }
        Ok(list)
    }

    /// # Errors
    /// Fails when a record cannot be serialized.
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self.iter().collect::<Vec<_>>())
    }

    /// # Errors
    /// Returns [`ListError::DuplicateName`] when a record with the same
    /// case-insensitive name exists.
    pub fn add(&mut self, library: VendoredLibrary) -> Result<(), ListError> {
        let key = library.key();
        if self.items.contains_key(&key) {
            return Err(ListError::DuplicateName(library.name));
        }
        self.items.insert(key, library);
        Ok(())
    }

    /// Inserts or overwrites the record with the same name.
    pub fn replace(&mut self, library: VendoredLibrary) -> Option<VendoredLibrary> {
        self.items.insert(library.key(), library)
    }

    /// # Errors
    /// Returns [`ListError::MissingName`] when no record has that name.
    pub fn remove(&mut self, name: &str) -> Result<VendoredLibrary, ListError> {
        self.items
            .remove(&name.to_lowercase())
            .ok_or_else(|| ListError::MissingName(name.to_string()))
    }

    pub fn remove_ignore_missing(&mut self, name: &str) -> Option<VendoredLibrary> {
        self.items.remove(&name.to_lowercase())
    }

    pub fn get(&self, name: &str) -> Option<&VendoredLibrary> {
        self.items.get(&name.to_lowercase())
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut VendoredLibrary> {
        self.items.get_mut(&name.to_lowercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.items.contains_key(&name.to_lowercase())
    }

    /// Snapshot of keys, for loops that mutate records while walking the list.
    pub fn names(&self) -> Vec<String> {
        self.items.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &VendoredLibrary> {
        self.items.values()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The install target shared by every record, without its `2`/`3` suffix.
    pub fn folder(&self) -> Option<String> {
        let mut stems = self
            .items
            .values()
            .flat_map(|lib| lib.folder.iter())
            .map(|folder| folder.trim_end_matches(['2', '3']));
        let first = stems.next()?;
        let common = stems.fold(first.to_string(), |acc, stem| common_prefix(&acc, stem));
        if common.is_empty() {
            None
        } else {
            Some(common)
        }
    }
}

fn common_prefix(a: &str, b: &str) -> String {
    a.chars()
        .zip(b.chars())
        .take_while(|(x, y)| x == y)
        .map(|(x, _)| x)
        .collect()
}

impl<'a> IntoIterator for &'a VendoredList {
    type Item = &'a VendoredLibrary;
    type IntoIter = std::collections::btree_map::Values<'a, String, VendoredLibrary>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.values()
    }
}
