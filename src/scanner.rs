use std::ops::{Range, RangeInclusive};

use crate::{
    charset::Charset,
    config::{AlignConfig, PipeDialect},
    document::Document,
};

pub const PIPE: char = '|';

/// Table dialect, fixed once when the table is located.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TableKind {
    /// Pipe table whose separator row carries `:` alignment markers.
    Markdown,
    /// Pipe table with `+` junctions; alignment is voted per column.
    Org,
    /// Box-drawn table in the given charset.
    Boxed(Charset),
}

impl TableKind {
    /// The glyph separating cells on a data row.
    pub fn bar(&self) -> char {
        match self {
            TableKind::Markdown | TableKind::Org => PIPE,
            TableKind::Boxed(charset) => charset.bar,
        }
    }

    pub fn is_boxed(&self) -> bool {
        matches!(self, TableKind::Boxed(_))
    }

    pub fn classify_row(&self, line: &str) -> RowClass {
        let Some((idx, first)) = first_glyph(line) else {
            return RowClass::Other;
        };
        match self {
            TableKind::Markdown | TableKind::Org => {
                if first != PIPE {
                    return RowClass::Other;
                }
                if is_pipe_separator(&line[idx + PIPE.len_utf8()..]) {
                    RowClass::Separator
                } else {
                    RowClass::Data
                }
            }
            TableKind::Boxed(charset) => {
                if first == charset.bar {
                    RowClass::Data
                } else if charset.is_rule_edge(first) {
                    RowClass::Separator
                } else {
                    RowClass::Other
                }
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RowClass {
    Data,
    Separator,
    /// Blank gap lines and lines the dialect cannot draw; left untouched.
    Other,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableRange {
    pub first_line: usize,
    pub last_line: usize,
    /// Byte offset of the first line's start.
    pub start: usize,
    /// Byte offset of the last line's end, newline excluded.
    pub end: usize,
    pub kind: TableKind,
}

impl TableRange {
    pub fn lines(&self) -> RangeInclusive<usize> {
        self.first_line..=self.last_line
    }

    pub fn bytes(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn size(&self) -> usize {
        self.end - self.start
    }
}

/// Leading blanks skipped, the first glyph and its byte index.
pub fn first_glyph(line: &str) -> Option<(usize, char)> {
    line.char_indices().find(|(_, ch)| !is_blank(*ch))
}

pub fn is_blank(ch: char) -> bool {
    ch == ' ' || ch == '\t'
}

fn is_pipe_separator(rest: &str) -> bool {
    let opens_with_rule = rest
        .trim_start_matches(is_blank)
        .starts_with(|ch| ch == '-' || ch == ':');
    opens_with_rule
        && rest
            .chars()
            .all(|ch| matches!(ch, '-' | ':' | '|' | '+') || is_blank(ch))
}

pub fn is_table_line(doc: &dyn Document, index: usize, config: &AlignConfig) -> bool {
    if index >= doc.line_count() || doc.is_literal(index) {
        return false;
    }
    match first_glyph(doc.line(index)) {
        Some((_, ch)) => ch == PIPE || config.charsets.opens_line(ch),
        None => false,
    }
}

fn is_blank_line(doc: &dyn Document, index: usize) -> bool {
    index < doc.line_count() && doc.line(index).chars().all(char::is_whitespace)
}

pub fn locate_table(
    doc: &dyn Document,
    position: usize,
    config: &AlignConfig,
) -> Option<TableRange> {
    if doc.line_count() == 0 {
        return None;
    }
    locate_table_at_line(doc, doc.line_at(position), config)
}

pub fn locate_table_at_line(
    doc: &dyn Document,
    line: usize,
    config: &AlignConfig,
) -> Option<TableRange> {
    if !is_table_line(doc, line, config) {
        return None;
    }
    let mut first_line = block_top(doc, line, config);
    // Bridge one blank line upward when the block above it is a box table.
    while first_line >= 2
        && is_blank_line(doc, first_line - 1)
        && is_table_line(doc, first_line - 2, config)
    {
        let above = block_top(doc, first_line - 2, config);
        if !classify_kind(doc, above, first_line - 2, config).is_boxed() {
            break;
        }
        first_line = above;
    }
    let mut last_line = line;
    while is_table_line(doc, last_line + 1, config) {
        last_line += 1;
    }

    let kind = classify_kind(doc, first_line, last_line, config);
    if kind.is_boxed() {
        // One blank line inside a box table does not end it; two do.
        loop {
            if is_table_line(doc, last_line + 1, config) {
                last_line += 1;
            } else if is_blank_line(doc, last_line + 1)
                && is_table_line(doc, last_line + 2, config)
            {
                last_line += 2;
            } else {
                break;
            }
        }
    }

    Some(TableRange {
        first_line,
        last_line,
        start: doc.line_offset(first_line),
        end: doc.line_end(last_line),
        kind,
    })
}

/// First line of the gapless run of table lines holding `line`.
fn block_top(doc: &dyn Document, line: usize, config: &AlignConfig) -> usize {
    let mut top = line;
    while top > 0 && is_table_line(doc, top - 1, config) {
        top -= 1;
    }
    top
}

fn classify_kind(
    doc: &dyn Document,
    first_line: usize,
    last_line: usize,
    config: &AlignConfig,
) -> TableKind {
    if let Some(charset) = config.charsets.classify_top_rule(doc.line(first_line)) {
        return TableKind::Boxed(charset.clone());
    }
    match config.pipe_dialect {
        PipeDialect::Markdown => TableKind::Markdown,
        PipeDialect::Org => TableKind::Org,
        PipeDialect::Auto => {
            let org_junction = (first_line..=last_line).any(|idx| {
                let line = doc.line(idx);
                TableKind::Markdown.classify_row(line) == RowClass::Separator && line.contains('+')
            });
            if org_junction {
                TableKind::Org
            } else {
                TableKind::Markdown
            }
        }
    }
}
