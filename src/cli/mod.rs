pub mod generate;
pub mod list;

use std::path::Path;
use std::process;

use minihost::{render_diagnostics, CaptureLog, Diagnostic};

/// Load a capture log, or render the failure and exit.
pub fn load_log(path: &Path) -> CaptureLog {
    match CaptureLog::load(path) {
        Ok(log) => log,
        Err(diag) => {
            // A parse failure still has the text; re-read it for the report.
            let source = std::fs::read_to_string(path).unwrap_or_default();
            report(&[diag], path, &source);
            process::exit(1);
        }
    }
}

/// Render diagnostics against the capture log they came from.
pub fn report(diagnostics: &[Diagnostic], log_path: &Path, source: &str) {
    render_diagnostics(diagnostics, &log_path.display().to_string(), source);
}
