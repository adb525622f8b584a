use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Files larger than this are described instead of loaded.
pub const MAX_PREVIEW_SIZE: u64 = 10 * 1024 * 1024;

/// Extensions treated as binary without reading the file.
const BINARY_EXTENSIONS: &[&str] = &[
    "exe", "dll", "so", "dylib", "bin", "obj", "o", "jpg", "jpeg", "png", "gif", "bmp", "ico",
    "svg", "mp3", "mp4", "avi", "mov", "wav", "flac", "zip", "tar", "gz", "rar", "7z", "pdf",
    "doc", "docx", "xls", "xlsx", "ppt", "pptx",
];

/// What the preview box shows: the file's text, or a message in its place.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PreviewContent {
    Text(String),
    Notice(String),
}

impl PreviewContent {
    pub fn as_str(&self) -> &str {
        match self {
            PreviewContent::Text(s) | PreviewContent::Notice(s) => s,
        }
    }
}

fn has_binary_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| BINARY_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn read_text(path: &Path) -> Result<PreviewContent> {
    let metadata =
        fs::metadata(path).with_context(|| format!("cannot access {}", path.display()))?;

    if metadata.len() > MAX_PREVIEW_SIZE {
        return Ok(PreviewContent::Notice(format!(
            "File too large to preview ({:.2} MB > 10 MB)",
            metadata.len() as f64 / (1024.0 * 1024.0)
        )));
    }

    if has_binary_extension(path) {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        return Ok(PreviewContent::Notice(format!(
            "Binary file detected: .{}\nFile size: {:.2} KB\nUse appropriate tools to view this file.",
            ext,
            metadata.len() as f64 / 1024.0
        )));
    }

    let bytes = fs::read(path).with_context(|| format!("cannot read {}", path.display()))?;
    if bytes.contains(&0) {
        return Ok(PreviewContent::Notice(format!(
            "Binary file detected\nFile size: {:.2} KB\nUse appropriate tools to view this file.",
            bytes.len() as f64 / 1024.0
        )));
    }

    Ok(PreviewContent::Text(String::from_utf8_lossy(&bytes).into_owned()))
}

/// Load a file for preview. Failures become a [`PreviewContent::Notice`].
pub fn load_content(path: &Path) -> PreviewContent {
    read_text(path).unwrap_or_else(|e| {
        tracing::warn!(path = %path.display(), error = %e, "preview failed");
        PreviewContent::Notice(format!("Error reading file: {:#}", e))
    })
}

// ---------------------------------------------------------------------------
// FilePreview
// ---------------------------------------------------------------------------

/// A scrollable, read-only view of one file.
pub struct FilePreview {
    pub path: PathBuf,
    pub content: PreviewContent,
    line_count: usize,
    scroll: usize,
}

impl FilePreview {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let content = load_content(&path);
        let line_count = content.as_str().lines().count().max(1);
        Self {
            path,
            content,
            line_count,
            scroll: 0,
        }
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    pub fn scroll(&self) -> usize {
        self.scroll
    }

    pub fn line_count(&self) -> usize {
        self.line_count
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll = (self.scroll + lines).min(self.line_count.saturating_sub(1));
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll = self.scroll.saturating_sub(lines);
    }

    pub fn scroll_to_top(&mut self) {
        self.scroll = 0;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll = self.line_count.saturating_sub(1);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_loads_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.rs");
        fs::write(&path, "fn main() {}\n// done\n").unwrap();

        let preview = FilePreview::open(&path);
        assert_eq!(
            preview.content,
            PreviewContent::Text("fn main() {}\n// done\n".to_string())
        );
        assert_eq!(preview.line_count(), 2);
        assert_eq!(preview.file_name(), "main.rs");
    }

    #[test]
    fn test_missing_file_is_a_notice() {
        let dir = tempfile::tempdir().unwrap();
        let content = load_content(&dir.path().join("nope.txt"));
        match content {
            PreviewContent::Notice(msg) => assert!(msg.starts_with("Error reading file")),
            other => panic!("expected notice, got {:?}", other),
        }
    }

    #[test]
    fn test_binary_extension_is_a_notice() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logo.png");
        fs::write(&path, "not really a png").unwrap();

        match load_content(&path) {
            PreviewContent::Notice(msg) => assert!(msg.contains("Binary file detected: .png")),
            other => panic!("expected notice, got {:?}", other),
        }
    }

    #[test]
    fn test_nul_bytes_are_a_notice() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"abc\0def").unwrap();

        match load_content(file.path()) {
            PreviewContent::Notice(msg) => assert!(msg.starts_with("Binary file detected\n")),
            other => panic!("expected notice, got {:?}", other),
        }
    }

    #[test]
    fn test_scrolling_is_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lines.txt");
        fs::write(&path, "1\n2\n3\n4\n5\n").unwrap();

        let mut preview = FilePreview::open(&path);
        preview.scroll_down(3);
        assert_eq!(preview.scroll(), 3);
        preview.scroll_down(100);
        assert_eq!(preview.scroll(), 4);
        preview.scroll_up(10);
        assert_eq!(preview.scroll(), 0);
        preview.scroll_to_bottom();
        assert_eq!(preview.scroll(), 4);
        preview.scroll_to_top();
        assert_eq!(preview.scroll(), 0);
    }
}
