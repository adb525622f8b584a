use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::tree::Entry;

const ELLIPSIS: &str = "...";

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

/// Return an emoji representing the entry based on its kind and extension.
pub fn entry_icon(entry: &Entry) -> &'static str {
    if entry.is_dir {
        return if entry.has_children() {
            "\u{1F4C2}" // 📂
        } else {
            "\u{1F4C1}" // 📁
        };
    }

    match entry.extension().as_str() {
        "go" | "py" | "js" | "ts" | "java" | "cpp" | "c" | "cs" | "rb" | "rs" | "sh" | "php" => {
            "\u{1F4BB}" // 💻
        }
        "jpg" | "jpeg" | "png" | "gif" | "bmp" | "webp" | "tiff" => "\u{1F5BC}", // 🖼
        "mp4" | "mkv" | "avi" | "mov" | "webm" | "m4v" | "wmv" => "\u{1F39E}",   // 🎞
        "json" | "csv" | "xml" | "env" | "yml" | "yaml" | "ini" | "toml" => "\u{1F527}", // 🔧
        "jks" | "pub" | "key" | "p12" | "ppk" => "\u{1F511}",                    // 🔑
        "zip" | "rar" | "7z" | "tar" | "gz" => "\u{1F5C3}",                      // 🗃
        "mp3" | "wav" | "flac" | "ogg" => "\u{1F3B5}",                           // 🎵
        "exe" | "bin" | "dll" | "app" => "\u{1F4E6}",                            // 📦
        "doc" | "docx" => "\u{1F4DD}",                                           // 📝
        "xls" | "xlsx" => "\u{1F4CA}",                                           // 📊
        "ppt" | "pptx" => "\u{1F4C8}",                                           // 📈
        "html" | "css" => "\u{1F310}",                                           // 🌐
        "pdf" => "\u{1F4D5}",                                                    // 📕
        "md" => "\u{1F4DC}",                                                     // 📜
        "log" => "\u{1F4D7}",                                                    // 📗
        "iso" => "\u{1F4C0}",                                                    // 📀
        _ => "\u{1F4C4}",                                                        // 📄
    }
}

/// Cut `text` to at most `max_width` display columns, ending in "..." when
/// anything was removed.
pub fn truncate_with_ellipsis(text: &str, max_width: usize) -> String {
    let ellipsis_width = ELLIPSIS.len();
    if max_width <= ellipsis_width {
        return ELLIPSIS.to_string();
    }
    if UnicodeWidthStr::width(text) <= max_width {
        return text.to_string();
    }

    let budget = max_width - ellipsis_width;
    let mut used = 0;
    let mut out = String::new();
    for ch in text.chars() {
        let w = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        out.push(ch);
    }
    out.push_str(ELLIPSIS);
    out
}

/// Share of `part` in `whole`, as "12.34 %".
pub fn format_percent(part: u64, whole: u64) -> String {
    let percent = if whole > 0 {
        part as f64 / whole as f64 * 100.0
    } else {
        0.0
    };
    format!("{:.2} %", percent)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
