use std::ops::Range;

use pulldown_cmark::{Event, Options, Parser, Tag};

/// Read access to the host's text. Lines are addressed by index and exclude
/// their trailing newline; offsets are byte offsets into the whole text.
pub trait Document {
    fn line_count(&self) -> usize;

    fn line(&self, index: usize) -> &str;

    /// Byte offset of the first character of line `index`.
    fn line_offset(&self, index: usize) -> usize;

    /// Index of the line holding byte `offset`. Offsets past the end map to
    /// the last line.
    fn line_at(&self, offset: usize) -> usize;

    /// True when the host's styling marks the line as part of a literal or
    /// quoted block, where table-shaped text must be left alone.
    fn is_literal(&self, _index: usize) -> bool {
        false
    }

    fn line_end(&self, index: usize) -> usize {
        self.line_offset(index) + self.line(index).len()
    }
}

pub struct TextDocument {
    text: String,
    line_starts: Vec<usize>,
    literal: Vec<bool>,
}

impl TextDocument {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let line_starts = line_starts(&text);
        let literal = vec![false; line_starts.len()];
        Self {
            text,
            line_starts,
            literal,
        }
    }

    /// Fenced and indented code blocks are literal.
    pub fn markdown(text: impl Into<String>) -> Self {
        let mut doc = Self::new(text);
        let mut blocks = Vec::new();
        let parser = Parser::new_ext(&doc.text, Options::ENABLE_TABLES).into_offset_iter();
        for (event, range) in parser {
            if let Event::Start(Tag::CodeBlock(_)) = event {
                blocks.push(range);
            }
        }
        for block in blocks {
            doc.mark_literal(block);
        }
        doc
    }

    /// `#+begin_…` / `#+end_…` blocks are literal, delimiters included.
    pub fn org(text: impl Into<String>) -> Self {
        let mut doc = Self::new(text);
        let mut inside = false;
        for idx in 0..doc.line_count() {
            let lowered = doc.line(idx).trim_start().to_ascii_lowercase();
            if lowered.starts_with("#+begin_") {
                inside = true;
            }
            doc.literal[idx] = inside;
            if lowered.starts_with("#+end_") {
                inside = false;
            }
        }
        doc
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    fn mark_literal(&mut self, range: Range<usize>) {
        if range.is_empty() {
            return;
        }
        let first = self.line_at(range.start);
        let last = self.line_at(range.end.saturating_sub(1));
        for flag in &mut self.literal[first..=last] {
            *flag = true;
        }
    }
}

impl Document for TextDocument {
    fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    fn line(&self, index: usize) -> &str {
        let start = self.line_starts[index];
        let end = self
            .line_starts
            .get(index + 1)
            .map(|next| next - 1)
            .unwrap_or(self.text.len());
        self.text[start..end].trim_end_matches('\r')
    }

    fn line_offset(&self, index: usize) -> usize {
        self.line_starts[index]
    }

    fn line_at(&self, offset: usize) -> usize {
        match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx.saturating_sub(1),
        }
    }

    fn is_literal(&self, index: usize) -> bool {
        self.literal.get(index).copied().unwrap_or(false)
    }
}

fn line_starts(text: &str) -> Vec<usize> {
    let mut starts = vec![0];
    starts.extend(
        text.char_indices()
            .filter(|(_, ch)| *ch == '\n')
            .map(|(idx, _)| idx + 1),
    );
    starts
}
