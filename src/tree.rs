//! The statistics tree: files and directories built from flat, normalized
//! paths, with per-language line counts summed bottom-up.

use std::collections::BTreeMap;

use crate::stats::CodeStats;

/// Language name that means "no language filter".
pub const ALL_LANGUAGES: &str = "All";

// ---------------------------------------------------------------------------
// Entry
// ---------------------------------------------------------------------------

/// One node of the tree, either a file or a directory.
#[derive(Clone, Debug)]
pub struct Entry {
    pub path: String,
    pub is_dir: bool,
    pub stats_by_language: BTreeMap<String, CodeStats>,
    pub total_stats: CodeStats,
    pub children: Vec<Entry>,
}

impl Entry {
    pub fn new_dir(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_dir: true,
            stats_by_language: BTreeMap::new(),
            total_stats: CodeStats::default(),
            children: Vec::new(),
        }
    }

    pub fn new_file(path: impl Into<String>, stats: BTreeMap<String, CodeStats>) -> Self {
        let total_stats = stats.values().sum();
        Self {
            path: path.into(),
            is_dir: false,
            stats_by_language: stats,
            total_stats,
            children: Vec::new(),
        }
    }

    /// Last path segment. The root (or any path without a separator) is its
    /// own name.
    pub fn name(&self) -> &str {
        let trimmed = self.path.trim_end_matches('/');
        match trimmed.rsplit_once('/') {
            Some((_, name)) if !name.is_empty() => name,
            _ => trimmed,
        }
    }

    /// Lower-cased extension without the leading dot, or "" when there is none.
    pub fn extension(&self) -> String {
        let name = self.name();
        match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => ext.to_lowercase(),
            _ => String::new(),
        }
    }

    pub fn child_position(&self, name: &str) -> Option<usize> {
        self.children.iter().position(|c| c.name() == name)
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Stats restricted to one language; `None` or [`ALL_LANGUAGES`] yields
    /// the aggregate.
    pub fn stats_for(&self, language: Option<&str>) -> CodeStats {
        match language {
            None | Some(ALL_LANGUAGES) | Some("") => self.total_stats,
            Some(lang) => self
                .stats_by_language
                .get(lang)
                .copied()
                .unwrap_or_default(),
        }
    }

    /// Sorted language names present in this entry.
    pub fn languages(&self) -> Vec<String> {
        self.stats_by_language.keys().cloned().collect()
    }

    /// Order children by total lines, largest first. Equal totals keep their
    /// current relative order.
    pub fn sort_children(&mut self) {
        self.children
            .sort_by(|a, b| b.total_stats.total().cmp(&a.total_stats.total()));
    }

    /// Recompute a directory's stats from its children, recursing into child
    /// directories first. Files are left untouched.
    pub fn aggregate(&mut self) {
        if !self.is_dir {
            return;
        }

        self.total_stats = CodeStats::default();
        self.stats_by_language.clear();

        for child in &mut self.children {
            if child.is_dir {
                child.aggregate();
            }

            self.total_stats += child.total_stats;
            for (lang, stats) in &child.stats_by_language {
                *self.stats_by_language.entry(lang.clone()).or_default() += *stats;
            }
        }
    }

    /// Child directory `name`, created if missing. A file already holding the
    /// name is replaced: directories win name clashes.
    fn child_dir_mut(&mut self, name: &str) -> &mut Entry {
        let existing = self.children.iter().position(|c| c.name() == name);
        let path = join_path(&self.path, name);

        let idx = match existing {
            Some(idx) if self.children[idx].is_dir => idx,
            Some(idx) => {
                tracing::warn!(path = %path, "file shadowed by a directory, dropping it");
                self.children[idx] = Entry::new_dir(path);
                idx
            }
            None => {
                self.children.push(Entry::new_dir(path));
                self.children.len() - 1
            }
        };
        &mut self.children[idx]
    }

    fn add_file(&mut self, name: &str, stats: BTreeMap<String, CodeStats>) {
        if let Some(existing) = self.children.iter_mut().find(|c| c.name() == name) {
            if existing.is_dir {
                tracing::warn!(
                    path = %existing.path,
                    "file collides with a directory, dropping it"
                );
                return;
            }
            for (lang, s) in stats {
                *existing.stats_by_language.entry(lang).or_default() += s;
            }
            existing.total_stats = existing.stats_by_language.values().sum();
            return;
        }

        let path = join_path(&self.path, name);
        self.children.push(Entry::new_file(path, stats));
    }
}

/// Join a parent path and a segment with `/`. A `.` or empty parent yields the
/// bare segment so that children of `.` stay plain relative paths.
pub fn join_path(parent: &str, segment: &str) -> String {
    match parent {
        "" | "." => segment.to_string(),
        p if p.ends_with('/') => format!("{}{}", p, segment),
        p => format!("{}/{}", p, segment),
    }
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct Tree {
    root: Entry,
}

impl Tree {
    pub fn new(root_path: impl Into<String>) -> Self {
        Self {
            root: Entry::new_dir(root_path),
        }
    }

    /// Build a tree from `path -> language -> stats` records and aggregate it.
    pub fn from_file_stats(
        root_path: impl Into<String>,
        files: BTreeMap<String, BTreeMap<String, CodeStats>>,
    ) -> Self {
        let mut tree = Tree::new(root_path);
        for (path, stats) in files {
            tree.insert(&path, stats);
        }
        tree.aggregate();
        tree
    }

    pub fn root(&self) -> &Entry {
        &self.root
    }

    /// Insert one file at a normalized, `/`-separated path relative to the
    /// root. Missing intermediate directories are created on the way down.
    pub fn insert(&mut self, path: &str, stats: BTreeMap<String, CodeStats>) {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let Some((file_name, dirs)) = segments.split_last() else {
            return;
        };

        let mut node = &mut self.root;
        for dir in dirs {
            node = node.child_dir_mut(dir);
        }
        node.add_file(file_name, stats);
    }

    /// Sum file stats up through every directory. Safe to call repeatedly.
    pub fn aggregate(&mut self) {
        self.root.aggregate();
    }

    /// Resolve an index path (child positions from the root).
    pub fn get(&self, location: &[usize]) -> Option<&Entry> {
        let mut node = &self.root;
        for &idx in location {
            node = node.children.get(idx)?;
        }
        Some(node)
    }

    pub fn get_mut(&mut self, location: &[usize]) -> Option<&mut Entry> {
        let mut node = &mut self.root;
        for &idx in location {
            node = node.children.get_mut(idx)?;
        }
        Some(node)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
