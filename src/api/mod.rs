use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::capture::{CaptureLog, CaptureRecord};
use crate::config::ReplayConfig;
use crate::diagnostic::{Diagnostic, ErrorKind};
use crate::span::Span;


/// Translate one validated record into C source text.
pub fn translate_record(record: &CaptureRecord, config: &ReplayConfig) -> String {
    crate::emit::translate(record, config)
}

/// What happened to one selected record during a generation run.
#[derive(Debug)]
pub struct RecordOutcome {
    /// Index of the record in the capture log.
    pub log_index: usize,
    /// Zero-based position within this run; names the output file.
    pub position: usize,
    /// Path of the written program, or why the record was skipped.
    pub result: Result<PathBuf, Diagnostic>,
    /// Non-fatal findings, such as input files missing on this host.
    pub warnings: Vec<Diagnostic>,
}

#[derive(Debug, Default)]
pub struct GenerationReport {
    pub outcomes: Vec<RecordOutcome>,
}

impl GenerationReport {
    pub fn written(&self) -> impl Iterator<Item = &Path> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok().map(PathBuf::as_path))
    }

    pub fn failures(&self) -> impl Iterator<Item = &Diagnostic> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().err())
    }

    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// Generate replay programs for the selected records of `log`.
///
/// An out-of-range `index` fails before anything is written. A record that
/// fails validation is skipped and reported; the others are still written,
/// each under its run position.
pub fn generate(
    log: &CaptureLog,
    index: Option<usize>,
    config: &ReplayConfig,
) -> Result<GenerationReport, Diagnostic> {
    let selected = log.select(index)?;
    if !selected.is_empty() {
        fs::create_dir_all(&config.output_dir).map_err(|e| {
            Diagnostic::io(format!(
                "cannot create output directory '{}': {}",
                config.output_dir.display(),
                e
            ))
        })?;
    }

    let mut report = GenerationReport::default();
    for (position, (log_index, entry)) in selected.into_iter().enumerate() {
        let outcome = match CaptureRecord::from_entry(entry, log.base_dir()) {
            Ok(record) => RecordOutcome {
                log_index,
                position,
                warnings: missing_inputs(&record, config),
                result: write_program(&record, config, position),
            },
            Err(diag) => RecordOutcome {
                log_index,
                position,
                warnings: Vec::new(),
                result: Err(discard_stale(
                    &config.output_path(position),
                    diag.with_note(format!("record {} was not generated", log_index)),
                )),
            },
        };
        report.outcomes.push(outcome);
    }
    Ok(report)
}

/// Load a capture log from disk and generate from it.
pub fn generate_from_path(
    log_path: &Path,
    index: Option<usize>,
    config: &ReplayConfig,
) -> Result<GenerationReport, Diagnostic> {
    let log = CaptureLog::load(log_path)?;
    generate(&log, index, config)
}

/// Validate every record of `log` without writing anything.
pub fn check_records(log: &CaptureLog) -> Vec<(usize, Result<CaptureRecord, Diagnostic>)> {
    log.entries
        .iter()
        .enumerate()
        .map(|(i, entry)| (i, CaptureRecord::from_entry(entry, log.base_dir())))
        .collect()
}

/// One-line summary: `#i entry=<name> global=[..] local=[..] args=<n>`.
pub fn describe_record(index: usize, record: &CaptureRecord) -> String {
    let local = match &record.local_size {
        Some(local) => bracketed(local),
        None => "auto".to_string(),
    };
    format!(
        "#{} entry={} global={} local={} args={}",
        index,
        record.entry_point,
        bracketed(&record.global_size),
        local,
        record.arguments.len()
    )
}

fn bracketed(values: &[u64]) -> String {
    let parts: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    format!("[{}]", parts.join(","))
}

fn write_program(
    record: &CaptureRecord,
    config: &ReplayConfig,
    position: usize,
) -> Result<PathBuf, Diagnostic> {
    let source = translate_record(record, config);
    let path = config.output_path(position);
    let tmp = path.with_extension("c.tmp");
    match fs::write(&tmp, source).and_then(|()| fs::rename(&tmp, &path)) {
        Ok(()) => Ok(path),
        Err(e) => {
            let _ = fs::remove_file(&tmp);
            let diag = Diagnostic::io(format!("cannot write '{}': {}", path.display(), e));
            Err(discard_stale(&path, diag))
        }
    }
}

/// Remove the output an earlier run wrote at `path`; the record behind it
/// was not generated this time.
fn discard_stale(path: &Path, diag: Diagnostic) -> Diagnostic {
    match fs::remove_file(path) {
        Ok(()) => diag,
        Err(e) if e.kind() == io::ErrorKind::NotFound => diag,
        Err(e) => diag.with_note(format!(
            "stale output '{}' could not be removed: {}",
            path.display(),
            e
        )),
    }
}

fn missing_inputs(record: &CaptureRecord, config: &ReplayConfig) -> Vec<Diagnostic> {
    let skip_kernel = config.device.kernel_path_from_argv();
    record
        .input_files()
        .into_iter()
        .enumerate()
        .filter(|(i, _)| !(skip_kernel && *i == 0))
        .filter(|(_, path)| !path.exists())
        .map(|(_, path)| {
            Diagnostic::warning(
                ErrorKind::Io,
                format!("input file '{}' does not exist on this host", path.display()),
                Span::dummy(),
            )
            .with_note("the generated program reads it at run time".to_string())
        })
        .collect()
}
