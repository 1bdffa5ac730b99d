/// Line-oriented C source buffer with indentation tracking.
#[derive(Debug, Default)]
pub struct SourceWriter {
    lines: Vec<String>,
    indent: usize,
}

impl SourceWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one line at the current indentation.
    pub fn line(&mut self, text: impl AsRef<str>) {
        let text = text.as_ref();
        if text.is_empty() {
            self.lines.push(String::new());
        } else {
            self.lines.push(format!("{}{}", "  ".repeat(self.indent), text));
        }
    }

    pub fn blank(&mut self) {
        self.lines.push(String::new());
    }

    /// Append a multi-line block verbatim, ignoring the current indent.
    pub fn raw(&mut self, block: &str) {
        for line in block.lines() {
            self.lines.push(line.to_string());
        }
    }

    /// Blank line followed by a `//` comment introducing a step.
    pub fn section(&mut self, title: impl AsRef<str>) {
        self.blank();
        self.comment(title);
    }

    pub fn comment(&mut self, text: impl AsRef<str>) {
        self.line(format!("// {}", c_comment_text(text.as_ref())));
    }

    pub fn indent(&mut self) {
        self.indent += 1;
    }

    pub fn dedent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }

    /// `if (cl_error_check(err, "...")) exit(1);` after an API call.
    pub fn check_err(&mut self, what: &str) {
        self.line(format!("if (cl_error_check(err, {}))", c_string(what)));
        self.indent();
        self.line("exit(1);");
        self.dedent();
    }

    /// `fprintf(stderr, ...); exit(1);` guarded by `condition`.
    pub fn fail_if(&mut self, condition: &str, fprintf_args: &str) {
        self.line(format!("if ({}) {{", condition));
        self.indent();
        self.line(format!("fprintf(stderr, {});", fprintf_args));
        self.line("exit(1);");
        self.dedent();
        self.line("}");
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn finish(self) -> String {
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }
}

/// Quote `s` as a C string literal.
pub fn c_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            // Keep `??x` trigraphs and `%` in format strings literal.
            '?' => out.push_str("\\?"),
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                out.push_str(&format!("\\{:03o}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Quote `s` for use as a printf format string: `%` is doubled.
pub fn c_format_string(s: &str) -> String {
    c_string(&s.replace('%', "%%"))
}

/// Text safe inside a single-line `//` comment.
fn c_comment_text(s: &str) -> String {
    s.replace(['\n', '\r'], " ").replace('\\', "/")
}
