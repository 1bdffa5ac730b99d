//! Capture log loading and record selection.
//!
//! The log is a JSON array of dispatch entries written by the capture
//! library. Parsing is all-or-nothing: a log that is not a well-formed
//! array of entry objects yields a single ParseError and no entries.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::value::RawValue;

use crate::diagnostic::{Diagnostic, ErrorKind};
use crate::span::Span;

/// One dispatch as written in the log, before validation.
///
/// Every field is optional here so that a missing field surfaces as a
/// FormatError for that record instead of failing the whole log.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct LogEntry {
    pub language: Option<String>,
    pub kernel_file: Option<String>,
    pub entry_point: Option<String>,
    pub global_size: Option<Vec<u64>>,
    pub local_size: Option<Vec<u64>>,
    pub global_offset: Option<Vec<u64>>,
    pub compiler_flags: Option<String>,
    #[serde(default)]
    pub host_api_calls: Vec<HostCall>,
    #[serde(default)]
    pub kernel_arguments: Vec<RawArgument>,
    /// Location of this entry in the log text.
    #[serde(skip)]
    pub span: Span,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawArgument {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub value: Option<String>,
    pub size: Option<u64>,
    pub flags: Option<RawFlags>,
    pub data: Option<RawData>,
}

/// Older logs write a single flag string, newer ones a token list.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawFlags {
    One(String),
    Many(Vec<String>),
}

/// Buffer contents: a data file path, or the bytes themselves.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawData {
    Path(String),
    Bytes(Vec<u8>),
}

/// Host call site the capture attributed the dispatch to.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct HostCall {
    #[serde(default)]
    pub function_name: String,
    #[serde(default)]
    pub compilation_unit: String,
    #[serde(default)]
    pub line_number: u64,
}

/// A parsed capture log.
#[derive(Clone, Debug)]
pub struct CaptureLog {
    pub path: PathBuf,
    pub source: String,
    pub entries: Vec<LogEntry>,
}

impl CaptureLog {
    /// Read and parse a log file.
    pub fn load(path: &Path) -> Result<Self, Diagnostic> {
        let source = std::fs::read_to_string(path).map_err(|e| {
            Diagnostic::io(format!("cannot read capture log '{}': {}", path.display(), e))
        })?;
        Self::parse(path, source)
    }

    /// Parse log text that was read from `path`.
    pub fn parse(path: &Path, source: String) -> Result<Self, Diagnostic> {
        let entries = parse_entries(&source)?;
        Ok(Self {
            path: path.to_path_buf(),
            source,
            entries,
        })
    }

    /// Directory that relative kernel and data paths are resolved against.
    pub fn base_dir(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new(""))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Select the entries to generate, paired with their log index.
    ///
    /// `None` selects every entry in file order; `Some(i)` selects exactly
    /// entry `i` or fails with an IndexError.
    pub fn select(&self, index: Option<usize>) -> Result<Vec<(usize, &LogEntry)>, Diagnostic> {
        match index {
            None => Ok(self.entries.iter().enumerate().collect()),
            Some(i) => match self.entries.get(i) {
                Some(entry) => Ok(vec![(i, entry)]),
                None => Err(Diagnostic::error(
                    ErrorKind::Index,
                    format!(
                        "record index {} is out of range; '{}' has {} record{}",
                        i,
                        self.path.display(),
                        self.entries.len(),
                        if self.entries.len() == 1 { "" } else { "s" }
                    ),
                    Span::dummy(),
                )),
            },
        }
    }
}

fn parse_entries(source: &str) -> Result<Vec<LogEntry>, Diagnostic> {
    let raw: Vec<&RawValue> = serde_json::from_str(source).map_err(|e| {
        json_error(&e, Span::at_line_col(source, e.line(), e.column()))
            .with_note("a capture log is a JSON array of dispatch records".to_string())
    })?;

    raw.into_iter()
        .enumerate()
        .map(|(i, value)| {
            let text = value.get();
            let entry_span = Span::of_subslice(source, text);
            let mut entry: LogEntry = serde_json::from_str(text).map_err(|e| {
                let at = Span::at_line_col(text, e.line(), e.column()).offset_by(entry_span);
                json_error(&e, at).with_note(format!("in record {}", i))
            })?;
            entry.span = entry_span;
            Ok(entry)
        })
        .collect()
}

fn json_error(e: &serde_json::Error, span: Span) -> Diagnostic {
    // serde_json appends its own position; the span already carries it.
    let text = e.to_string();
    let message = match text.rfind(" at line ") {
        Some(pos) => text[..pos].to_string(),
        None => text,
    };
    Diagnostic::parse(message, span)
}
