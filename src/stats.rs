use std::iter::Sum;
use std::ops::{Add, AddAssign};

use serde::Deserialize;

/// Line counts for one language in one file (or summed over many).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct CodeStats {
    pub code: u64,
    pub comments: u64,
    pub blanks: u64,
}

impl CodeStats {
    pub fn new(code: u64, comments: u64, blanks: u64) -> Self {
        Self {
            code,
            comments,
            blanks,
        }
    }

    pub fn total(&self) -> u64 {
        self.code + self.comments + self.blanks
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl Add for CodeStats {
    type Output = CodeStats;

    fn add(self, other: CodeStats) -> CodeStats {
        CodeStats {
            code: self.code + other.code,
            comments: self.comments + other.comments,
            blanks: self.blanks + other.blanks,
        }
    }
}

impl AddAssign for CodeStats {
    fn add_assign(&mut self, other: CodeStats) {
        *self = *self + other;
    }
}

impl Sum for CodeStats {
    fn sum<I: Iterator<Item = CodeStats>>(iter: I) -> Self {
        iter.fold(CodeStats::default(), Add::add)
    }
}

impl<'a> Sum<&'a CodeStats> for CodeStats {
    fn sum<I: Iterator<Item = &'a CodeStats>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total() {
        assert_eq!(CodeStats::new(10, 2, 1).total(), 13);
        assert_eq!(CodeStats::default().total(), 0);
        assert!(CodeStats::default().is_empty());
    }

    #[test]
    fn test_add_and_sum() {
        let mut acc = CodeStats::new(1, 2, 3);
        acc += CodeStats::new(10, 20, 30);
        assert_eq!(acc, CodeStats::new(11, 22, 33));

        let all = [CodeStats::new(1, 0, 0), CodeStats::new(0, 1, 0), CodeStats::new(0, 0, 1)];
        let summed: CodeStats = all.iter().sum();
        assert_eq!(summed, CodeStats::new(1, 1, 1));
    }

    #[test]
    fn test_deserialize_ignores_unknown_fields() {
        let stats: CodeStats =
            serde_json::from_str(r#"{"code":5,"comments":1,"blanks":2,"blobs":{}}"#).unwrap();
        assert_eq!(stats, CodeStats::new(5, 1, 2));
    }
}
