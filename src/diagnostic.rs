use std::fmt;

use crate::span::Span;

/// A translator diagnostic (error or warning) tied to the capture log.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: ErrorKind,
    pub message: String,
    pub span: Span,
    pub notes: Vec<String>,
    pub help: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// What went wrong at generation time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The log is not a well-formed sequence of capture records.
    Parse,
    /// The selected record index is out of range.
    Index,
    /// A record is malformed or incomplete.
    Format,
    /// A file could not be read or written.
    Io,
}

impl ErrorKind {
    pub fn label(self) -> &'static str {
        match self {
            ErrorKind::Parse => "parse error",
            ErrorKind::Index => "index error",
            ErrorKind::Format => "format error",
            ErrorKind::Io => "I/O error",
        }
    }
}

impl Diagnostic {
    pub fn error(kind: ErrorKind, message: String, span: Span) -> Self {
        Self {
            severity: Severity::Error,
            kind,
            message,
            span,
            notes: Vec::new(),
            help: None,
        }
    }

    pub fn warning(kind: ErrorKind, message: String, span: Span) -> Self {
        Self {
            severity: Severity::Warning,
            kind,
            message,
            span,
            notes: Vec::new(),
            help: None,
        }
    }

    pub fn parse(message: String, span: Span) -> Self {
        Self::error(ErrorKind::Parse, message, span)
    }

    pub fn format(message: String, span: Span) -> Self {
        Self::error(ErrorKind::Format, message, span)
    }

    pub fn io(message: String) -> Self {
        Self::error(ErrorKind::Io, message, Span::dummy())
    }

    pub fn with_note(mut self, note: String) -> Self {
        self.notes.push(note);
        self
    }

    pub fn with_help(mut self, help: String) -> Self {
        self.help = Some(help);
        self
    }

    /// Render the diagnostic to stderr using ariadne.
    ///
    /// Diagnostics without a location (I/O, index) print as a single line.
    pub fn render(&self, filename: &str, source: &str) {
        use ariadne::{Color, Label, Report, ReportKind, Source};

        if self.span.is_dummy() || source.is_empty() {
            eprintln!("{}", self);
            for note in &self.notes {
                eprintln!("  note: {}", note);
            }
            if let Some(help) = &self.help {
                eprintln!("  help: {}", help);
            }
            return;
        }

        let kind = match self.severity {
            Severity::Error => ReportKind::Error,
            Severity::Warning => ReportKind::Warning,
        };

        let color = match self.severity {
            Severity::Error => Color::Red,
            Severity::Warning => Color::Yellow,
        };

        let message = format!("{}: {}", self.kind.label(), self.message);
        let mut report = Report::build(kind, filename, self.span.start as usize)
            .with_message(&message)
            .with_label(
                Label::new((filename, self.span.range()))
                    .with_message(&self.message)
                    .with_color(color),
            );

        for note in &self.notes {
            report = report.with_note(note);
        }

        if let Some(help) = &self.help {
            report = report.with_help(help);
        }

        if report
            .finish()
            .eprint((filename, Source::from(source)))
            .is_err()
        {
            eprintln!("{}", self);
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {}: {}", prefix, self.kind.label(), self.message)
    }
}

impl std::error::Error for Diagnostic {}

/// Render a list of diagnostics.
pub fn render_diagnostics(diagnostics: &[Diagnostic], filename: &str, source: &str) {
    for diag in diagnostics {
        diag.render(filename, source);
    }
}
