use std::collections::HashMap;
use std::collections::hash_map::Entry;

use super::structures::ZipFileEntry;

/// Hash index from entry name to its position in the central directory.
///
/// Two maps are built up front so that neither lookup mode folds every stored
/// name per query. Case folding is ASCII-only. When names collide (exact
/// duplicates, or names differing only by case in the folded map) the first
/// entry in directory order wins.
#[derive(Debug, Default)]
pub struct NameIndex {
    exact: HashMap<String, usize>,
    folded: HashMap<String, usize>,
}

impl NameIndex {
    pub fn build(entries: &[ZipFileEntry]) -> Self {
        let mut exact = HashMap::with_capacity(entries.len());
        let mut folded = HashMap::with_capacity(entries.len());

        for (i, entry) in entries.iter().enumerate() {
            if let Entry::Vacant(slot) = exact.entry(entry.file_name.clone()) {
                slot.insert(i);
            }
            if let Entry::Vacant(slot) = folded.entry(entry.file_name.to_ascii_lowercase()) {
                slot.insert(i);
            }
        }

        Self { exact, folded }
    }

    pub fn lookup(&self, name: &str, case_sensitive: bool) -> Option<usize> {
        if case_sensitive {
            self.exact.get(name).copied()
        } else {
            self.folded.get(&name.to_ascii_lowercase()).copied()
        }
    }

    /// Indexed names, in hash order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.exact.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.exact.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty()
    }
}
