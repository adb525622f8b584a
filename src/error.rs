//! Startup error taxonomy and reporting of unexpected runtime faults.

use std::backtrace::Backtrace;
use std::sync::Mutex;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, IngestError>;

const TOKEI_HINT: &str = "Install tokei (https://github.com/XAMPPRocky/tokei) and make sure it is on your PATH,\n\
                          or use pipe mode: tokei -o json . | linetree";

/// Failures while obtaining the line-count report. All are fatal at startup.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("command '{program}' not found.\n{hint}", hint = TOKEI_HINT)]
    ToolNotFound { program: String },

    #[error("'{program}' failed ({status}).\nStandard error output:\n{stderr}")]
    ToolFailed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("input is empty; pipe tokei's JSON output in, e.g. tokei -o json . | linetree")]
    EmptyInput,

    #[error("failed to parse tokei JSON output, unrecognized format: {0}")]
    UnrecognizedFormat(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Runtime faults
// ---------------------------------------------------------------------------

/// A panic captured by the hook: its message and the trimmed backtrace.
#[derive(Clone, Debug)]
pub struct Fault {
    pub message: String,
    pub trace: String,
}

static LAST_FAULT: Mutex<Option<Fault>> = Mutex::new(None);

/// Replace the default panic output (which would scribble over the TUI) with
/// a hook that records the fault for the control loop to report.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let message = match info.payload().downcast_ref::<&str>() {
            Some(s) => s.to_string(),
            None => match info.payload().downcast_ref::<String>() {
                Some(s) => s.clone(),
                None => "unknown panic".to_string(),
            },
        };
        let message = match info.location() {
            Some(loc) => format!("{} (at {}:{})", message, loc.file(), loc.line()),
            None => message,
        };
        let trace = trim_trace(&Backtrace::force_capture().to_string());

        tracing::error!(%message, "runtime fault");
        if let Ok(mut slot) = LAST_FAULT.lock() {
            *slot = Some(Fault { message, trace });
        }
    }));
}

/// Take the most recent fault recorded by the panic hook.
pub fn take_fault() -> Option<Fault> {
    LAST_FAULT.lock().ok().and_then(|mut slot| slot.take())
}

const TRACE_START_MARKERS: &[&str] = &[
    "rust_begin_unwind",
    "core::panicking",
    "std::panicking",
    "core::result::unwrap_failed",
    "core::option::expect_failed",
    "linetree::error::install_panic_hook",
    "std::backtrace::Backtrace",
];

const TRACE_STOP_MARKERS: &[&str] = &[
    "std::panic::catch_unwind",
    "std::rt::lang_start",
    "__rust_begin_short_backtrace",
];

fn frame_starts(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed
        .split_once(':')
        .is_some_and(|(idx, _)| !idx.is_empty() && idx.chars().all(|c| c.is_ascii_digit()))
}

/// Keep only the frames between the fault site and the runtime scaffolding.
///
/// Frames up to and including the last panic-machinery frame are dropped, as
/// is everything from the first `catch_unwind`/`lang_start` frame onwards.
pub fn trim_trace(trace: &str) -> String {
    // Group "  N: symbol" lines with their "at file:line" continuation lines.
    let mut frames: Vec<Vec<&str>> = Vec::new();
    for line in trace.lines() {
        if frame_starts(line) || frames.is_empty() {
            frames.push(vec![line]);
        } else if let Some(last) = frames.last_mut() {
            last.push(line);
        }
    }

    let start = frames
        .iter()
        .rposition(|f| TRACE_START_MARKERS.iter().any(|m| f[0].contains(m)))
        .map(|i| i + 1)
        .unwrap_or(0);
    let end = frames
        .iter()
        .skip(start)
        .position(|f| TRACE_STOP_MARKERS.iter().any(|m| f[0].contains(m)))
        .map(|i| start + i)
        .unwrap_or(frames.len());

    let kept: Vec<&str> = frames[start..end].iter().flatten().copied().collect();
    let joined = kept.join("\n");
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        "no stack trace data".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Human-readable report printed after the terminal has been restored.
pub fn fault_report(fault: &Fault) -> String {
    format!(
        "Something went terribly wrong...\n\n\
         An unexpected error occurred while running the program.\n\n\
         Error message:\n  {}\n\n\
         Stack trace:\n{}\n",
        fault.message, fault.trace
    )
}
