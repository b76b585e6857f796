use tracing::trace;

use crate::{
    cell::{row_cells, CellBounds},
    charset::Charset,
    config::AlignConfig,
    document::Document,
    error::Result,
    metrics::{GlyphMetrics, Px},
    scanner::{is_blank, RowClass, TableKind, TableRange},
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Alignment {
    #[default]
    Left,
    Right,
}

/// Per-column width and alignment of one table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnMetrics {
    /// Padded width of every column.
    pub widths: Vec<Px>,
    pub alignments: Vec<Alignment>,
}

impl ColumnMetrics {
    pub fn len(&self) -> usize {
        self.widths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widths.is_empty()
    }

    pub fn alignment(&self, column: usize) -> Alignment {
        self.alignments.get(column).copied().unwrap_or_default()
    }
}

pub fn compute_columns(
    doc: &dyn Document,
    table: &TableRange,
    metrics: &dyn GlyphMetrics,
    config: &AlignConfig,
) -> Result<ColumnMetrics> {
    let widths = column_widths(doc, table, metrics, config)?;
    let alignments = match &table.kind {
        TableKind::Markdown => marker_alignments(doc, table, widths.len())?,
        TableKind::Org => voted_alignments(doc, table, widths.len())?,
        TableKind::Boxed(_) => vec![Alignment::Left; widths.len()],
    };
    trace!(?widths, ?alignments, "column metrics");
    Ok(ColumnMetrics { widths, alignments })
}

/// Widest measured content per column plus the fixed padding. Empty cells
/// count as zero no matter how much blank space they span.
pub fn column_widths(
    doc: &dyn Document,
    table: &TableRange,
    metrics: &dyn GlyphMetrics,
    config: &AlignConfig,
) -> Result<Vec<Px>> {
    let mut widths: Vec<Px> = Vec::new();
    for_each_cell(doc, table, RowClass::Data, |line, column, cell| {
        let width = if cell.is_empty() {
            0
        } else {
            metrics.measure_width(cell.content(line))
        };
        if column >= widths.len() {
            widths.resize(column + 1, 0);
        }
        widths[column] = widths[column].max(width);
    })?;

    let rule_width = match &table.kind {
        TableKind::Boxed(_) => metrics.measure_glyph(Charset::unicode().top.rule),
        _ => 0,
    };
    for width in widths.iter_mut() {
        *width = round_up(*width + config.cell_padding, rule_width);
    }
    Ok(widths)
}

fn round_up(width: Px, unit: Px) -> Px {
    if unit == 0 {
        return width;
    }
    (width + unit - 1) / unit * unit
}

/// A column is right aligned when its cell on the first separator row ends
/// with `:` and does not start with one.
fn marker_alignments(
    doc: &dyn Document,
    table: &TableRange,
    columns: usize,
) -> Result<Vec<Alignment>> {
    let mut alignments = vec![Alignment::Left; columns];
    let Some(separator) = table
        .lines()
        .find(|&idx| table.kind.classify_row(doc.line(idx)) == RowClass::Separator)
    else {
        return Ok(alignments);
    };
    let line = doc.line(separator);
    let delimiters = [table.kind.bar()];
    for (column, cell) in row_cells(line, separator, &delimiters).enumerate() {
        let marker = cell?.text(line).trim_matches(is_blank);
        if column < columns && marker.ends_with(':') && !marker.starts_with(':') {
            alignments[column] = Alignment::Right;
        }
    }
    Ok(alignments)
}

/// Majority vote over every data cell of each column: a cell votes right
/// when one blank before the closing delimiter follows its content and one
/// blank after the opening delimiter does not lead it; every other cell,
/// empty ones included, votes left. Ties go right.
fn voted_alignments(
    doc: &dyn Document,
    table: &TableRange,
    columns: usize,
) -> Result<Vec<Alignment>> {
    let mut votes = vec![(0usize, 0usize); columns];
    for_each_cell(doc, table, RowClass::Data, |line, column, cell| {
        let Some(vote) = votes.get_mut(column) else {
            return;
        };
        let text = cell.text(line);
        if !single_blank_then_glyph(text.chars())
            && single_blank_then_glyph(text.chars().rev())
        {
            vote.1 += 1;
        } else {
            vote.0 += 1;
        }
    })?;
    Ok(votes
        .into_iter()
        .map(|(left, right)| {
            if right >= left {
                Alignment::Right
            } else {
                Alignment::Left
            }
        })
        .collect())
}

fn single_blank_then_glyph(mut chars: impl Iterator<Item = char>) -> bool {
    chars.next().is_some_and(is_blank) && chars.next().is_some_and(|ch| !is_blank(ch))
}

fn for_each_cell(
    doc: &dyn Document,
    table: &TableRange,
    class: RowClass,
    mut visit: impl FnMut(&str, usize, &CellBounds),
) -> Result<()> {
    let delimiters = [table.kind.bar()];
    for idx in table.lines() {
        let line = doc.line(idx);
        if table.kind.classify_row(line) != class {
            continue;
        }
        for (column, cell) in row_cells(line, idx, &delimiters).enumerate() {
            visit(line, column, &cell?);
        }
    }
    Ok(())
}
