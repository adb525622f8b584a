use clap::Parser;
use std::path::PathBuf;

/// Browse code statistics for a directory tree in the terminal
#[derive(Parser, Debug)]
#[command(name = "linetree")]
#[command(version)]
#[command(about = "Browse code statistics for a directory tree in the terminal")]
#[command(after_help = "Pipe mode:   tokei -o json . | linetree\nDirect mode: linetree /path/to/project (requires tokei on PATH)")]
pub struct Cli {
    /// Directory to analyze
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Line counter executable to run in direct mode
    #[arg(long = "tokei", default_value = "tokei")]
    pub tokei: String,

    /// Read tokei JSON from a file instead of running tokei ('-' for stdin)
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Editor used to open files (defaults to $EDITOR, then vim)
    #[arg(short = 'e', long = "editor")]
    pub editor: Option<String>,

    /// Write logs to this file (filter with LINETREE_LOG, default "info")
    #[arg(long = "log-file")]
    pub log_file: Option<PathBuf>,
}

/// Editor command: the flag, then `$EDITOR`, then `vim`.
pub fn resolve_editor(flag: Option<&str>, env_value: Option<String>) -> String {
    flag.map(str::to_string)
        .or(env_value.filter(|e| !e.trim().is_empty()))
        .unwrap_or_else(|| "vim".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["linetree"]);
        assert_eq!(cli.path, PathBuf::from("."));
        assert_eq!(cli.tokei, "tokei");
        assert!(cli.input.is_none());
        assert!(cli.editor.is_none());
        assert!(cli.log_file.is_none());
    }

    #[test]
    fn test_flags() {
        let cli = Cli::parse_from([
            "linetree",
            "src",
            "--tokei",
            "/opt/tokei",
            "-i",
            "-",
            "--editor",
            "nano",
            "--log-file",
            "run.log",
        ]);
        assert_eq!(cli.path, PathBuf::from("src"));
        assert_eq!(cli.tokei, "/opt/tokei");
        assert_eq!(cli.input, Some(PathBuf::from("-")));
        assert_eq!(cli.editor.as_deref(), Some("nano"));
        assert_eq!(cli.log_file, Some(PathBuf::from("run.log")));
    }

    #[test]
    fn test_resolve_editor() {
        assert_eq!(resolve_editor(Some("nano"), Some("emacs".into())), "nano");
        assert_eq!(resolve_editor(None, Some("emacs".into())), "emacs");
        assert_eq!(resolve_editor(None, Some("  ".into())), "vim");
        assert_eq!(resolve_editor(None, None), "vim");
    }
}
