use super::index::NameIndex;
use super::structures::ZipFileEntry;

/// Name queries over a parsed central directory.
///
/// With an index, name lookups are hash lookups and listings come out in hash
/// order. Without one, every query walks the entries in directory order.
/// Prefix queries always walk the entries.
#[derive(Clone, Copy)]
pub struct EntryResolver<'a> {
    entries: &'a [ZipFileEntry],
    index: Option<&'a NameIndex>,
}

impl<'a> EntryResolver<'a> {
    pub fn new(entries: &'a [ZipFileEntry], index: Option<&'a NameIndex>) -> Self {
        Self { entries, index }
    }

    pub fn list_names(&self) -> Vec<String> {
        match self.index {
            Some(index) => index.names().map(str::to_owned).collect(),
            None => self.entries.iter().map(|e| e.file_name.clone()).collect(),
        }
    }

    pub fn first_name(&self) -> Option<String> {
        self.entries.first().map(|e| e.file_name.clone())
    }

    pub fn exists(&self, name: &str, case_sensitive: bool) -> bool {
        self.position(name, case_sensitive).is_some()
    }

    pub fn find(&self, name: &str, case_sensitive: bool) -> Option<&'a ZipFileEntry> {
        self.position(name, case_sensitive)
            .map(|i| &self.entries[i])
    }

    /// Names starting with `prefix`, including the prefix's own directory
    /// entry when the archive has one.
    pub fn subpaths(&self, prefix: &str) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| e.file_name.starts_with(prefix))
            .map(|e| e.file_name.clone())
            .collect()
    }

    fn position(&self, name: &str, case_sensitive: bool) -> Option<usize> {
        if let Some(index) = self.index {
            return index.lookup(name, case_sensitive);
        }
        if case_sensitive {
            self.entries.iter().position(|e| e.file_name == name)
        } else {
            self.entries
                .iter()
                .position(|e| e.file_name.eq_ignore_ascii_case(name))
        }
    }
}
