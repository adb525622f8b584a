//! Ingestion boundary: obtain tokei's JSON report, accept either of its two
//! top-level shapes, and flatten it into normalized per-file statistics.

use std::collections::BTreeMap;
use std::io::{ErrorKind, Read};
use std::path::{Path, MAIN_SEPARATOR};
use std::process::Command;

use serde::Deserialize;

use crate::error::{IngestError, Result};
use crate::stats::CodeStats;

/// tokei's own grand total; superseded by the tree's aggregation.
pub const TOTAL_SENTINEL: &str = "Total";

/// Per-language summary. The three counts are required so that a nested
/// report never parses as a flat one.
#[derive(Deserialize, Debug, Clone)]
pub struct LanguageSummary {
    pub code: u64,
    pub comments: u64,
    pub blanks: u64,
    #[serde(default)]
    pub reports: Vec<FileReport>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct FileReport {
    pub name: String,
    pub stats: CodeStats,
}

pub type LanguageReport = BTreeMap<String, LanguageSummary>;

/// Flat per-file records: `path -> language -> stats`.
pub type FileStats = BTreeMap<String, BTreeMap<String, CodeStats>>;

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Run `<program> --output json <path>` and parse its output.
pub fn run_tokei(program: &str, path: &Path) -> Result<LanguageReport> {
    tracing::info!(program, path = %path.display(), "running line counter");

    let output = Command::new(program)
        .arg("--output")
        .arg("json")
        .arg(path)
        .output()
        .map_err(|e| match e.kind() {
            ErrorKind::NotFound => IngestError::ToolNotFound {
                program: program.to_string(),
            },
            _ => IngestError::Io(e),
        })?;

    if !output.status.success() {
        return Err(IngestError::ToolFailed {
            program: program.to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    parse_report(&output.stdout)
}

/// Read a complete JSON report from any reader (stdin or a file).
pub fn read_report(mut reader: impl Read) -> Result<LanguageReport> {
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;
    parse_report(&data)
}

/// Parse either a flat `language -> summary` map or one level of nesting
/// around it (`{"<dir>": {language -> summary}}`).
pub fn parse_report(data: &[u8]) -> Result<LanguageReport> {
    if data.iter().all(u8::is_ascii_whitespace) {
        return Err(IngestError::EmptyInput);
    }

    let direct_err = match serde_json::from_slice::<LanguageReport>(data) {
        Ok(report) => return Ok(report),
        Err(e) => e,
    };

    match serde_json::from_slice::<BTreeMap<String, LanguageReport>>(data) {
        Ok(nested) => nested
            .into_values()
            .next()
            .ok_or_else(|| IngestError::UnrecognizedFormat(direct_err.to_string())),
        Err(_) => Err(IngestError::UnrecognizedFormat(direct_err.to_string())),
    }
}

// ---------------------------------------------------------------------------
// Path normalization
// ---------------------------------------------------------------------------

/// Make a reported file name relative to the analysis root, `/`-separated,
/// with no leading `/` or `./`.
///
/// `root` is the absolute analysis root; it is only stripped when it matches
/// whole path components.
pub fn normalize_path(raw: &str, root: Option<&str>) -> String {
    let mut path = to_forward_slashes(raw);

    if let Some(root) = root {
        let root = to_forward_slashes(root);
        let root = root.trim_end_matches('/');
        if !root.is_empty() {
            if let Some(rest) = path.strip_prefix(root) {
                if rest.is_empty() || rest.starts_with('/') {
                    path = rest.to_string();
                }
            }
        }
    }

    let mut rel = path.as_str();
    loop {
        let next = rel.trim_start_matches('/');
        let next = next.strip_prefix("./").unwrap_or(next);
        if next == rel {
            break;
        }
        rel = next;
    }
    rel.to_string()
}

fn to_forward_slashes(path: &str) -> String {
    if MAIN_SEPARATOR == '/' {
        path.to_string()
    } else {
        path.replace(MAIN_SEPARATOR, "/")
    }
}

/// Flatten a report into per-file stats, skipping the grand-total entry.
pub fn collect_file_stats(report: &LanguageReport, root: Option<&str>) -> FileStats {
    let mut files = FileStats::new();

    for (lang, summary) in report {
        if lang == TOTAL_SENTINEL {
            continue;
        }
        for file in &summary.reports {
            let path = normalize_path(&file.name, root);
            *files
                .entry(path)
                .or_default()
                .entry(lang.clone())
                .or_default() += file.stats;
        }
    }

    tracing::info!(
        files = files.len(),
        languages = report.len().saturating_sub(usize::from(report.contains_key(TOTAL_SENTINEL))),
        "collected file statistics"
    );
    files
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    const FLAT: &str = r#"{
        "Go": {
            "blanks": 1, "code": 15, "comments": 2, "inaccurate": false,
            "reports": [
                {"name": "./src/a.go", "stats": {"blanks": 1, "code": 10, "comments": 2, "blobs": {}}},
                {"name": "./src/b.go", "stats": {"blanks": 0, "code": 5, "comments": 0, "blobs": {}}}
            ],
            "children": {}
        },
        "Markdown": {
            "blanks": 1, "code": 3, "comments": 0,
            "reports": [{"name": "./README.md", "stats": {"blanks": 1, "code": 3, "comments": 0}}]
        },
        "Total": {
            "blanks": 2, "code": 18, "comments": 2,
            "reports": [{"name": "./ghost.txt", "stats": {"blanks": 0, "code": 99, "comments": 0}}]
        }
    }"#;

    #[test]
    fn test_parse_flat_report() {
        let report = parse_report(FLAT.as_bytes()).unwrap();
        assert_eq!(report.len(), 3);
        assert_eq!(report["Go"].reports.len(), 2);
        assert_eq!(report["Go"].reports[0].stats, CodeStats::new(10, 2, 1));
    }

    #[test]
    fn test_parse_nested_report() {
        let nested = format!(r#"{{"my-project": {}}}"#, FLAT);
        let report = parse_report(nested.as_bytes()).unwrap();
        assert!(report.contains_key("Markdown"));
        assert_eq!(report["Markdown"].reports[0].name, "./README.md");
    }

    #[test]
    fn test_parse_rejects_deeper_nesting_and_garbage() {
        let double = format!(r#"{{"a": {{"b": {}}}}}"#, FLAT);
        assert!(matches!(
            parse_report(double.as_bytes()),
            Err(IngestError::UnrecognizedFormat(_))
        ));
        assert!(matches!(
            parse_report(b"[1, 2, 3]"),
            Err(IngestError::UnrecognizedFormat(_))
        ));
        assert!(matches!(parse_report(b"  \n"), Err(IngestError::EmptyInput)));
    }

    #[test]
    fn test_read_report_from_reader() {
        let report = read_report(FLAT.as_bytes()).unwrap();
        assert_eq!(report.len(), 3);
    }

    #[test]
    fn test_collect_skips_total_and_normalizes() {
        let report = parse_report(FLAT.as_bytes()).unwrap();
        let files = collect_file_stats(&report, None);

        let paths: Vec<&str> = files.keys().map(String::as_str).collect();
        assert_eq!(paths, vec!["README.md", "src/a.go", "src/b.go"]);
        assert_eq!(files["src/a.go"]["Go"], CodeStats::new(10, 2, 1));
    }

    #[test]
    fn test_collect_merges_languages_per_file() {
        let json = r#"{
            "HTML": {"blanks": 0, "code": 10, "comments": 0,
                     "reports": [{"name": "/abs/proj/index.html", "stats": {"blanks": 0, "code": 10, "comments": 0}}]},
            "CSS":  {"blanks": 0, "code": 4, "comments": 0,
                     "reports": [{"name": "/abs/proj/index.html", "stats": {"blanks": 0, "code": 4, "comments": 0}}]}
        }"#;
        let report = parse_report(json.as_bytes()).unwrap();
        let files = collect_file_stats(&report, Some("/abs/proj"));

        assert_eq!(files.len(), 1);
        assert_eq!(files["index.html"].len(), 2);
    }

    #[test]
    fn test_normalize_strips_root_and_prefixes() {
        assert_eq!(normalize_path("/abs/proj/src/main.rs", Some("/abs/proj")), "src/main.rs");
        assert_eq!(normalize_path("/abs/proj/src/main.rs", Some("/abs/proj/")), "src/main.rs");
        assert_eq!(normalize_path("./src/main.rs", Some("/abs/proj")), "src/main.rs");
        assert_eq!(normalize_path("././lib.rs", None), "lib.rs");
        assert_eq!(normalize_path("/etc/hosts", None), "etc/hosts");
    }

    #[test]
    fn test_normalize_only_strips_whole_components() {
        assert_eq!(
            normalize_path("/abs/project2/a.rs", Some("/abs/project")),
            "abs/project2/a.rs"
        );
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for path in ["src/main.rs", "README.md", "a/b/c/d.go", "dir.with.dots/x"] {
            assert_eq!(normalize_path(path, None), path);
            assert_eq!(normalize_path(path, Some("/abs/proj")), path);
            let once = normalize_path(&format!("./{}", path), Some("/abs/proj"));
            assert_eq!(normalize_path(&once, Some("/abs/proj")), once);
        }
    }

    fn relative_path() -> impl Strategy<Value = String> {
        prop::collection::vec("[a-zA-Z0-9_][a-zA-Z0-9_.-]{0,8}", 1..6)
            .prop_map(|segments| segments.join("/"))
    }

    proptest! {
        #[test]
        fn proptest_relative_paths_pass_through(path in relative_path()) {
            prop_assert_eq!(normalize_path(&path, None), path.clone());
            prop_assert_eq!(normalize_path(&path, Some("/abs/proj")), path.clone());
            prop_assert_eq!(normalize_path(&format!("./{}", path), None), path.clone());
            let absolute = format!("/abs/proj/{}", path);
            prop_assert_eq!(normalize_path(&absolute, Some("/abs/proj")), path);
        }
    }
}
