use std::collections::{BTreeSet, HashMap};

/// Case-fold `path` and turn backslashes into forward slashes.
///
/// Editors and the runtime disagree on drive-letter casing and separators, so
/// every breakpoint lookup goes through this form.
pub fn normalize_path(path: &str) -> String {
    path.chars()
        .map(|c| if c == '\\' { '/' } else { c })
        .flat_map(char::to_lowercase)
        .collect()
}

/// Memoizes [`normalize_path`] per distinct raw section name.
///
/// The line hook runs before every executed line and sees the same handful of
/// section names over and over.
#[derive(Debug, Default)]
pub struct PathNormalizer {
    cache: HashMap<String, String>,
}

impl PathNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn normalize(&mut self, raw: &str) -> &str {
        if !self.cache.contains_key(raw) {
            self.cache.insert(raw.to_string(), normalize_path(raw));
        }
        self.cache.get(raw).map(String::as_str).unwrap_or_default()
    }

    pub fn cached_paths(&self) -> usize {
        self.cache.len()
    }
}

/// Active line breakpoints keyed by normalized source path.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BreakpointStore {
    files: HashMap<String, BTreeSet<u32>>,
}

impl BreakpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the breakpoint lines of `path` with `lines`.
    pub fn set_lines(&mut self, path: &str, lines: impl IntoIterator<Item = u32>) {
        let lines: BTreeSet<u32> = lines.into_iter().collect();
        let key = normalize_path(path);
        if lines.is_empty() {
            self.files.remove(&key);
        } else {
            self.files.insert(key, lines);
        }
    }

    /// `normalized_path` must already be in [`normalize_path`] form.
    pub fn contains(&self, normalized_path: &str, line: u32) -> bool {
        self.files
            .get(normalized_path)
            .is_some_and(|lines| lines.contains(&line))
    }

    pub fn lines(&self, path: &str) -> Option<&BTreeSet<u32>> {
        self.files.get(&normalize_path(path))
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}
