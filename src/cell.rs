use crate::{
    error::{AlignError, Result},
    scanner::{first_glyph, is_blank},
};

/// Byte offsets of one cell within its line.
///
/// `cell_begin..cell_end` is everything between two delimiters.
/// `content_begin..content_end` is the content with padding stripped, except
/// that one blank is kept on a side whose padding was wider than one blank.
/// An empty cell has `content_begin >= content_end`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellBounds {
    pub cell_begin: usize,
    pub content_begin: usize,
    pub content_end: usize,
    pub cell_end: usize,
}

impl CellBounds {
    pub fn is_empty(&self) -> bool {
        self.content_begin >= self.content_end
    }

    /// Content touches both delimiters.
    pub fn is_unpadded(&self) -> bool {
        !self.is_empty() && self.cell_begin == self.content_begin && self.content_end == self.cell_end
    }

    pub fn content<'a>(&self, line: &'a str) -> &'a str {
        if self.is_empty() {
            ""
        } else {
            &line[self.content_begin..self.content_end]
        }
    }

    pub fn text<'a>(&self, line: &'a str) -> &'a str {
        &line[self.cell_begin..self.cell_end]
    }

    /// The delimiter closing this cell.
    pub fn delimiter(&self, line: &str) -> Option<char> {
        line[self.cell_end..].chars().next()
    }

    /// Offset just past the closing delimiter.
    pub fn next_begin(&self, line: &str) -> usize {
        self.cell_end + self.delimiter(line).map(char::len_utf8).unwrap_or(0)
    }
}

/// Parses the cell opening at `cell_begin` and closed by the next glyph in
/// `delimiters`.
pub fn parse_cell(
    line: &str,
    line_index: usize,
    cell_begin: usize,
    delimiters: &[char],
) -> Result<CellBounds> {
    let cell_end = line[cell_begin..]
        .find(|ch| delimiters.contains(&ch))
        .map(|pos| cell_begin + pos)
        .ok_or_else(|| AlignError::MalformedCell {
            line: line_index,
            column: cell_begin,
            delimiter: delimiters.first().copied().unwrap_or('|'),
        })?;

    let inner = &line[cell_begin..cell_end];
    let strict_begin = cell_end - inner.trim_start_matches(is_blank).len();
    if strict_begin == cell_end {
        return Ok(CellBounds {
            cell_begin,
            content_begin: (cell_begin + 1).min(cell_end),
            content_end: cell_end.saturating_sub(1).max(cell_begin),
            cell_end,
        });
    }
    let strict_end = cell_begin + inner.trim_end_matches(is_blank).len();

    let content_begin = if strict_begin - cell_begin > 1 {
        strict_begin - 1
    } else {
        strict_begin
    };
    let content_end = if cell_end - strict_end > 1 {
        strict_end + 1
    } else {
        strict_end
    };
    Ok(CellBounds {
        cell_begin,
        content_begin,
        content_end,
        cell_end,
    })
}

/// Cells of a row, left to right. Stops after the first malformed cell.
pub struct Cells<'a> {
    line: &'a str,
    line_index: usize,
    pos: usize,
    delimiters: &'a [char],
    done: bool,
}

impl<'a> Cells<'a> {
    pub fn new(line: &'a str, line_index: usize, start: usize, delimiters: &'a [char]) -> Self {
        Self {
            line,
            line_index,
            pos: start,
            delimiters,
            done: false,
        }
    }
}

impl Iterator for Cells<'_> {
    type Item = Result<CellBounds>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let rest = &self.line[self.pos..];
        if rest.chars().all(is_blank) {
            self.done = true;
            return None;
        }
        match parse_cell(self.line, self.line_index, self.pos, self.delimiters) {
            Ok(cell) => {
                self.pos = cell.next_begin(self.line);
                Some(Ok(cell))
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

/// Cells after the row's opening glyph, whatever that glyph is.
pub fn row_cells<'a>(line: &'a str, line_index: usize, delimiters: &'a [char]) -> Cells<'a> {
    let start = first_glyph(line)
        .map(|(idx, ch)| idx + ch.len_utf8())
        .unwrap_or(line.len());
    Cells::new(line, line_index, start, delimiters)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(line: &str, begin: usize) -> CellBounds {
        parse_cell(line, 0, begin, &['|']).expect("cell")
    }

    #[test]
    fn single_padding_is_stripped() {
        let line = "| abc |";
        let bounds = cell(line, 1);
        assert_eq!(bounds.cell_end, 6);
        assert_eq!(bounds.content(line), "abc");
        assert!(!bounds.is_unpadded());
    }

    #[test]
    fn extra_padding_keeps_one_blank() {
        let line = "|   abc  |";
        let bounds = cell(line, 1);
        assert_eq!(bounds.content(line), " abc ");
        let line = "|  abc |";
        assert_eq!(cell(line, 1).content(line), " abc");
    }

    #[test]
    fn empty_cells_collapse() {
        let line = "|    |";
        let bounds = cell(line, 1);
        assert!(bounds.is_empty());
        assert_eq!((bounds.content_begin, bounds.content_end), (2, 4));
        assert_eq!(bounds.content(line), "");

        let bounds = cell("| |", 1);
        assert!(bounds.is_empty());
        assert_eq!((bounds.content_begin, bounds.content_end), (2, 1));

        let bounds = cell("||", 1);
        assert!(bounds.is_empty());
        assert_eq!((bounds.content_begin, bounds.content_end), (1, 1));
    }

    #[test]
    fn content_touching_delimiters_is_unpadded() {
        let line = "|abc|";
        let bounds = cell(line, 1);
        assert!(bounds.is_unpadded());
        assert_eq!(bounds.content(line), "abc");
    }

    #[test]
    fn missing_closing_delimiter_is_malformed() {
        let err = parse_cell("| abc ", 4, 1, &['|']).unwrap_err();
        assert_eq!(
            err,
            AlignError::MalformedCell {
                line: 4,
                column: 1,
                delimiter: '|'
            }
        );
    }

    #[test]
    fn row_cells_walk_every_cell() {
        let line = "  | a | 表 |  |";
        let cells: Vec<_> = row_cells(line, 0, &['|'])
            .collect::<Result<Vec<_>>>()
            .expect("cells");
        assert_eq!(cells.len(), 3);
        assert_eq!(cells[0].content(line), "a");
        assert_eq!(cells[1].content(line), "表");
        assert!(cells[2].is_empty());
    }

    #[test]
    fn row_cells_stop_at_unterminated_cell() {
        let results: Vec<_> = row_cells("| a | b", 0, &['|']).collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }

    #[test]
    fn mixed_delimiters_split_org_separators() {
        let line = "|---+----|";
        let cells: Vec<_> = row_cells(line, 0, &['|', '+'])
            .collect::<Result<Vec<_>>>()
            .expect("cells");
        assert_eq!(cells.len(), 2);
        assert_eq!(cells[0].delimiter(line), Some('+'));
        assert_eq!(cells[1].text(line), "----");
    }
}
