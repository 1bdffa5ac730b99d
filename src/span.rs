/// A byte range inside the capture log text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn dummy() -> Self {
        Self::default()
    }

    /// Span covering `text`, which must be a sub-slice of `source`.
    pub fn of_subslice(source: &str, text: &str) -> Self {
        let base = source.as_ptr() as usize;
        let start = (text.as_ptr() as usize).saturating_sub(base);
        Self::new(start as u32, (start + text.len()) as u32)
    }

    /// Point span at a 1-based line/column as reported by `serde_json`.
    pub fn at_line_col(source: &str, line: usize, column: usize) -> Self {
        let mut offset = 0usize;
        for (i, l) in source.split_inclusive('\n').enumerate() {
            if i + 1 == line {
                offset += column.saturating_sub(1).min(l.len());
                let offset = offset as u32;
                return Self::new(offset, offset.saturating_add(1));
            }
            offset += l.len();
        }
        let end = source.len() as u32;
        Self::new(end, end)
    }

    /// Shift a span measured inside a sub-document to the enclosing text.
    pub fn offset_by(self, base: Span) -> Self {
        Self::new(self.start + base.start, self.end + base.start)
    }

    pub fn range(&self) -> std::ops::Range<usize> {
        self.start as usize..self.end as usize
    }

    pub fn is_dummy(&self) -> bool {
        self.start == 0 && self.end == 0
    }
}
