use crate::tree::{Entry, Tree};

/// A saved view: where we were and which row was selected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub location: Vec<usize>,
    pub cursor: usize,
}

/// Walks the statistics tree one directory at a time.
///
/// Entries are addressed by index path from the root. Only the current
/// directory's children are ever re-sorted, so the index paths held by the
/// ancestor stack stay valid for the whole session.
pub struct Navigator {
    tree: Tree,
    location: Vec<usize>,
    stack: Vec<Frame>,
    cursor: usize,
}

impl Navigator {
    pub fn new(tree: Tree) -> Self {
        Self {
            tree,
            location: Vec::new(),
            stack: Vec::new(),
            cursor: 0,
        }
    }

    /// The directory currently in view.
    pub fn current(&self) -> &Entry {
        // `location` only ever holds paths produced by `descend`.
        self.tree.get(&self.location).unwrap_or_else(|| self.tree.root())
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn set_cursor(&mut self, cursor: usize) {
        self.cursor = cursor;
    }

    /// Number of directories above the current one.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Re-order the current directory's children by total lines.
    pub fn sort_current(&mut self) {
        if let Some(entry) = self.tree.get_mut(&self.location) {
            entry.sort_children();
        }
    }

    /// Enter the child directory called `name`, remembering where we came from.
    /// Returns `false` and changes nothing if there is no such directory.
    pub fn descend(&mut self, name: &str, cursor: usize) -> bool {
        if name.is_empty() {
            return false;
        }

        let current = self.current();
        let Some(idx) = current.child_position(name) else {
            return false;
        };
        if !current.children[idx].is_dir {
            return false;
        }

        self.stack.push(Frame {
            location: self.location.clone(),
            cursor,
        });
        self.location.push(idx);
        self.cursor = 0;

        tracing::debug!(path = %self.current().path, depth = self.depth(), "descended");
        true
    }

    /// Return to the previous directory and its cursor. No-op at the root.
    pub fn ascend(&mut self) -> bool {
        let Some(frame) = self.stack.pop() else {
            return false;
        };

        self.location = frame.location;
        self.cursor = frame.cursor;

        tracing::debug!(path = %self.current().path, depth = self.depth(), "ascended");
        true
    }

    /// Total lines of the current directory for percentage math, never below 1.
    pub fn parent_total_lines(&self, language: Option<&str>) -> u64 {
        self.current().stats_for(language).total().max(1)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use proptest::prelude::*;

    use super::*;
    use crate::stats::CodeStats;

    fn stats(lang: &str, code: u64) -> BTreeMap<String, CodeStats> {
        BTreeMap::from([(lang.to_string(), CodeStats::new(code, 0, 0))])
    }

    fn navigator() -> Navigator {
        let mut files = BTreeMap::new();
        files.insert("src/core/engine.rs".to_string(), stats("Rust", 100));
        files.insert("src/main.rs".to_string(), stats("Rust", 20));
        files.insert("docs/guide.md".to_string(), stats("Markdown", 30));
        files.insert("Cargo.toml".to_string(), stats("TOML", 5));
        let mut nav = Navigator::new(Tree::from_file_stats(".", files));
        nav.sort_current();
        nav
    }

    fn snapshot(nav: &Navigator) -> (Vec<usize>, usize, String) {
        (
            nav.location.clone(),
            nav.cursor(),
            nav.current().path.clone(),
        )
    }

    #[test]
    fn test_descend_then_ascend_restores_state() {
        let mut nav = navigator();
        nav.set_cursor(2);
        let before = snapshot(&nav);

        assert!(nav.descend("src", 2));
        assert_eq!(nav.current().path, "src");
        assert_eq!(nav.cursor(), 0);
        assert_eq!(nav.depth(), 1);

        assert!(nav.ascend());
        assert_eq!(snapshot(&nav), before);
    }

    #[test]
    fn test_nested_round_trips_with_sorting() {
        let mut nav = navigator();
        let root_state = snapshot(&nav);

        assert!(nav.descend("src", 1));
        nav.sort_current();
        nav.set_cursor(1);
        let src_state = snapshot(&nav);

        assert!(nav.descend("core", 1));
        nav.sort_current();
        assert_eq!(nav.current().path, "src/core");

        assert!(nav.ascend());
        assert_eq!(snapshot(&nav), src_state);
        assert!(nav.ascend());
        assert_eq!(snapshot(&nav), root_state);
    }

    #[test]
    fn test_descend_guards() {
        let mut nav = navigator();
        nav.set_cursor(3);
        let before = snapshot(&nav);

        assert!(!nav.descend("", 3));
        assert!(!nav.descend("missing", 3));
        assert!(!nav.descend("Cargo.toml", 3));

        assert_eq!(snapshot(&nav), before);
        assert_eq!(nav.depth(), 0);
    }

    #[test]
    fn test_ascend_at_root_is_noop() {
        let mut nav = navigator();
        nav.set_cursor(1);
        let before = snapshot(&nav);
        assert!(!nav.ascend());
        assert_eq!(snapshot(&nav), before);
    }

    #[test]
    fn test_parent_total_lines() {
        let mut nav = navigator();
        assert_eq!(nav.parent_total_lines(None), 155);
        assert_eq!(nav.parent_total_lines(Some("Rust")), 120);
        assert_eq!(nav.parent_total_lines(Some("Go")), 1);

        assert!(nav.descend("docs", 0));
        assert_eq!(nav.parent_total_lines(Some("Rust")), 1);
    }

    #[test]
    fn test_empty_tree_floor() {
        let nav = Navigator::new(Tree::new("."));
        assert_eq!(nav.parent_total_lines(None), 1);
    }

    #[derive(Clone, Debug)]
    enum Step {
        Descend(usize, usize),
        Ascend,
        SetCursor(usize),
        Sort,
    }

    fn step_strategy() -> impl Strategy<Value = Step> {
        prop_oneof![
            3 => (0usize..6, 0usize..10).prop_map(|(child, cursor)| Step::Descend(child, cursor)),
            2 => Just(Step::Ascend),
            1 => (0usize..10).prop_map(Step::SetCursor),
            1 => Just(Step::Sort),
        ]
    }

    fn tree_strategy() -> impl Strategy<Value = Tree> {
        let file = (1u64..500).prop_map(|code| stats("Rust", code));
        prop::collection::btree_map("[a-c]{1,2}(/[a-c]{1,2}){0,4}", file, 1..30)
            .prop_map(|files| Tree::from_file_stats(".", files))
    }

    proptest! {
        #[test]
        fn proptest_every_ascend_restores_the_matching_descend(
            tree in tree_strategy(),
            steps in prop::collection::vec(step_strategy(), 1..60),
        ) {
            let mut nav = Navigator::new(tree);
            let mut saved: Vec<(Vec<usize>, usize, String)> = Vec::new();

            for step in steps {
                match step {
                    Step::Descend(child, cursor) => {
                        let before = snapshot(&nav);
                        let count = nav.current().children.len();
                        let name = match count {
                            0 => String::new(),
                            n => nav.current().children[child % n].name().to_string(),
                        };
                        nav.set_cursor(cursor);
                        let restored = (before.0.clone(), cursor, before.2.clone());
                        if nav.descend(&name, cursor) {
                            saved.push(restored);
                            prop_assert_eq!(nav.cursor(), 0);
                        } else {
                            prop_assert_eq!(snapshot(&nav), restored);
                        }
                    }
                    Step::Ascend => {
                        let moved = nav.ascend();
                        match saved.pop() {
                            Some(expected) => {
                                prop_assert!(moved);
                                prop_assert_eq!(snapshot(&nav), expected);
                            }
                            None => prop_assert!(!moved),
                        }
                    }
                    Step::SetCursor(cursor) => nav.set_cursor(cursor),
                    Step::Sort => nav.sort_current(),
                }
                prop_assert_eq!(nav.depth(), saved.len());
            }
        }
    }
}
