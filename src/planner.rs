use tracing::trace;

use crate::{
    annotation::{Annotation, Plan},
    cell::{row_cells, CellBounds},
    charset::{Charset, RulePosition},
    columns::{compute_columns, Alignment, ColumnMetrics},
    config::AlignConfig,
    document::Document,
    error::Result,
    metrics::{GlyphMetrics, Px},
    scanner::{first_glyph, RowClass, TableKind, TableRange, PIPE},
};

/// Plans the annotations that lay out `table`. Nothing is applied here, so a
/// failure leaves no trace behind.
pub fn plan_table(
    doc: &dyn Document,
    metrics: &dyn GlyphMetrics,
    config: &AlignConfig,
    table: &TableRange,
) -> Result<Plan> {
    let columns = compute_columns(doc, table, metrics, config)?;
    let mut planner = Planner::new(doc, metrics, config, table, columns);

    let separators: Vec<usize> = table
        .lines()
        .filter(|&idx| table.kind.classify_row(doc.line(idx)) == RowClass::Separator)
        .collect();
    for idx in table.lines() {
        match table.kind.classify_row(doc.line(idx)) {
            RowClass::Data => planner.plan_data_row(idx)?,
            RowClass::Separator => {
                let position = if separators.first() == Some(&idx) {
                    RulePosition::Top
                } else if separators.last() == Some(&idx) {
                    RulePosition::Bottom
                } else {
                    RulePosition::Middle
                };
                planner.plan_separator_row(idx, position)?;
            }
            RowClass::Other => {}
        }
    }

    let mut annotations = planner.annotations;
    annotations.sort_by_key(|annotation| (annotation.range.start, annotation.range.end));
    trace!(count = annotations.len(), "planned table");
    Ok(Plan {
        range: table.bytes(),
        annotations,
    })
}

struct Planner<'a> {
    doc: &'a dyn Document,
    metrics: &'a dyn GlyphMetrics,
    config: &'a AlignConfig,
    kind: &'a TableKind,
    columns: ColumnMetrics,
    /// Glyphs box tables are redrawn with.
    refined: Charset,
    space: Px,
    bar_width: Px,
    annotations: Vec<Annotation>,
}

impl<'a> Planner<'a> {
    fn new(
        doc: &'a dyn Document,
        metrics: &'a dyn GlyphMetrics,
        config: &'a AlignConfig,
        table: &'a TableRange,
        columns: ColumnMetrics,
    ) -> Self {
        let refined = Charset::unicode();
        let bar_width = match &table.kind {
            TableKind::Boxed(_) => metrics.measure_glyph(refined.bar),
            TableKind::Markdown | TableKind::Org => metrics.measure_glyph(PIPE),
        };
        Self {
            doc,
            metrics,
            config,
            kind: &table.kind,
            columns,
            refined,
            space: metrics.measure_glyph(' '),
            bar_width,
            annotations: Vec::new(),
        }
    }

    /// Pixels between two delimiters. Pipe cells keep one leading space unit
    /// on top of the column width; box cells are exactly as wide as their
    /// rule segment.
    fn cell_span(&self, width: Px) -> Px {
        if self.kind.is_boxed() {
            width
        } else {
            width + self.space
        }
    }

    fn plan_data_row(&mut self, idx: usize) -> Result<()> {
        let doc = self.doc;
        let line = doc.line(idx);
        let offset = doc.line_offset(idx);
        let Some((open, _)) = first_glyph(line) else {
            return Ok(());
        };
        let delimiters = [self.kind.bar()];

        self.mark_delimiter(line, offset, open);
        let mut x = self.metrics.measure_width(&line[..open]) + self.bar_width;
        for (column, cell) in row_cells(line, idx, &delimiters).enumerate() {
            let cell = cell?;
            let Some(&width) = self.columns.widths.get(column) else {
                break;
            };
            let span = self.cell_span(width);
            self.plan_cell(line, offset, &cell, x, span, self.columns.alignment(column));
            self.mark_delimiter(line, offset, cell.cell_end);
            x += span + self.bar_width;
        }
        Ok(())
    }

    /// Pads one data cell so it spans `span` pixels from `x`.
    fn plan_cell(
        &mut self,
        line: &str,
        offset: usize,
        cell: &CellBounds,
        x: Px,
        span: Px,
        alignment: Alignment,
    ) {
        let at = |pos: usize| offset + pos;
        let (cell_begin, content_begin) = (cell.cell_begin, cell.content_begin);
        let (content_end, cell_end) = (cell.content_end, cell.cell_end);

        if cell.is_empty() {
            let keep = (cell_begin + 1).min(cell_end);
            let kept = self.metrics.measure_width(&line[cell_begin..keep]);
            self.push(Annotation::space(
                at(keep)..at(cell_end),
                x + span,
                span.saturating_sub(kept),
            ));
            return;
        }

        let content = self.metrics.measure_width(cell.content(line));
        if cell.is_unpadded() {
            let fill = span.saturating_sub(content);
            let annotation = match alignment {
                Alignment::Left => {
                    Annotation::space(at(cell_end)..at(cell_end), x + span, fill)
                }
                Alignment::Right => {
                    Annotation::space(at(cell_begin)..at(cell_begin), x + fill, fill)
                }
            };
            self.push(annotation);
            return;
        }

        match alignment {
            Alignment::Left => {
                let lead = if content_begin - cell_begin > 1 {
                    self.push(Annotation::space(
                        at(cell_begin)..at(content_begin),
                        x + self.space,
                        self.space,
                    ));
                    self.space
                } else {
                    self.metrics.measure_width(&line[cell_begin..content_begin])
                };
                let fill = span.saturating_sub(lead + content);
                self.push(Annotation::space(
                    at(content_end)..at(cell_end),
                    x + span,
                    fill,
                ));
            }
            Alignment::Right => {
                let trail = if cell_end - content_end > 1 {
                    self.push(Annotation::space(
                        at(content_end)..at(cell_end),
                        x + span,
                        self.space,
                    ));
                    self.space
                } else {
                    self.metrics.measure_width(&line[content_end..cell_end])
                };
                let fill = span.saturating_sub(trail + content);
                self.push(Annotation::space(
                    at(cell_begin)..at(content_begin),
                    x + fill,
                    fill,
                ));
            }
        }
    }

    /// Box bars are redrawn in the refined charset; pipe bars optionally
    /// become full-height rules.
    fn mark_delimiter(&mut self, line: &str, offset: usize, pos: usize) {
        let Some(ch) = line[pos..].chars().next() else {
            return;
        };
        let range = offset + pos..offset + pos + ch.len_utf8();
        let kind = self.kind;
        match kind {
            TableKind::Boxed(_) => {
                if ch != self.refined.bar {
                    self.push(Annotation::glyphs(range, self.refined.bar.to_string()));
                }
            }
            TableKind::Markdown | TableKind::Org => {
                if self.config.full_height_bar {
                    self.push(Annotation::bar(range));
                }
            }
        }
    }

    fn plan_separator_row(&mut self, idx: usize, position: RulePosition) -> Result<()> {
        let kind = self.kind;
        match kind {
            TableKind::Markdown => self.plan_pipe_separator(idx, &[PIPE]),
            TableKind::Org => self.plan_pipe_separator(idx, &[PIPE, '+']),
            TableKind::Boxed(source) => {
                let delimiters = source.segment_delimiters();
                self.plan_box_separator(idx, position, &delimiters)
            }
        }
    }

    /// Each separator cell becomes a rule as wide as its column; `+`
    /// junctions are drawn as bars so they line up with the data rows.
    fn plan_pipe_separator(&mut self, idx: usize, delimiters: &[char]) -> Result<()> {
        let doc = self.doc;
        let line = doc.line(idx);
        let offset = doc.line_offset(idx);
        let Some((open, _)) = first_glyph(line) else {
            return Ok(());
        };

        self.mark_delimiter(line, offset, open);
        let mut x = self.metrics.measure_width(&line[..open]) + self.bar_width;
        for (column, cell) in row_cells(line, idx, delimiters).enumerate() {
            let cell = cell?;
            let Some(&width) = self.columns.widths.get(column) else {
                break;
            };
            let span = self.cell_span(width);
            self.push(Annotation::rule(
                offset + cell.cell_begin..offset + cell.cell_end,
                x + span,
                span,
            ));
            let junction = offset + cell.cell_end..offset + cell.next_begin(line);
            match cell.delimiter(line) {
                Some('+') if self.config.full_height_bar => self.push(Annotation::bar(junction)),
                Some('+') => self.push(Annotation::glyphs(junction, PIPE.to_string())),
                _ => self.mark_delimiter(line, offset, cell.cell_end),
            }
            x += span + self.bar_width;
        }
        Ok(())
    }

    /// Redraws a box rule in the refined charset, stretching every segment to
    /// its column width in whole rule glyphs.
    fn plan_box_separator(
        &mut self,
        idx: usize,
        position: RulePosition,
        delimiters: &[char],
    ) -> Result<()> {
        let doc = self.doc;
        let line = doc.line(idx);
        let offset = doc.line_offset(idx);
        let Some((open, open_ch)) = first_glyph(line) else {
            return Ok(());
        };
        let glyphs = *self.refined.rule_glyphs(position);
        let rule_width = self.metrics.measure_glyph(glyphs.rule);

        self.push(Annotation::glyphs(
            offset + open..offset + open + open_ch.len_utf8(),
            glyphs.left.to_string(),
        ));
        let cells = row_cells(line, idx, delimiters).collect::<Result<Vec<_>>>()?;
        for (column, cell) in cells.iter().enumerate() {
            let Some(&width) = self.columns.widths.get(column) else {
                break;
            };
            let count = if rule_width == 0 { 0 } else { width / rule_width };
            self.push(Annotation::glyphs(
                offset + cell.cell_begin..offset + cell.cell_end,
                glyphs.rule.to_string().repeat(count),
            ));
            let closing = if column + 1 == cells.len() {
                glyphs.right
            } else {
                glyphs.junction
            };
            let end = cell.next_begin(line);
            self.push(Annotation::glyphs(
                offset + cell.cell_end..offset + end,
                closing.to_string(),
            ));
        }
        Ok(())
    }

    fn push(&mut self, annotation: Annotation) {
        self.annotations.push(annotation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        annotation::{AnnotationKind, Fill, Tag},
        document::TextDocument,
        error::AlignError,
        metrics::testing::Mono,
        scanner::locate_table_at_line,
    };

    /// Narrow punctuation, wide letters, wider box glyphs, widest CJK.
    struct Proportional;

    impl GlyphMetrics for Proportional {
        fn measure_width(&self, text: &str) -> Px {
            text.chars()
                .map(|ch| match ch {
                    ' ' | '|' | '+' | '-' | ':' => 1,
                    '\u{2500}'..='\u{257f}' => 3,
                    ch if ch.is_ascii() => 2,
                    _ => 4,
                })
                .sum()
        }
    }

    fn plan_with(
        text: &str,
        metrics: &dyn GlyphMetrics,
        config: &AlignConfig,
    ) -> (TextDocument, Result<Plan>) {
        let doc = TextDocument::new(text);
        let table = locate_table_at_line(&doc, 0, config).expect("table");
        let plan = plan_table(&doc, metrics, config, &table);
        (doc, plan)
    }

    fn padded(padding: Px) -> AlignConfig {
        AlignConfig {
            cell_padding: padding,
            ..AlignConfig::default()
        }
    }

    fn space(annotation: &Annotation) -> (Px, Px) {
        match annotation.kind {
            AnnotationKind::Space {
                align_to, width, ..
            } => (align_to, width),
            _ => panic!("not a space: {annotation:?}"),
        }
    }

    fn glyphs_on_line(doc: &TextDocument, plan: &Plan, idx: usize) -> Vec<String> {
        let line = doc.line_offset(idx)..doc.line_end(idx);
        plan.annotations
            .iter()
            .filter(|a| line.contains(&a.range.start))
            .filter_map(|a| match &a.kind {
                AnnotationKind::Glyphs(glyphs) => Some(glyphs.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn two_column_table_pads_trailing_space() {
        let (doc, plan) = plan_with("| a | bb |\n| ccc | d |", &Mono, &padded(2));
        let plan = plan.expect("plan");
        assert_eq!(plan.range, 0..doc.len());
        let spaces: Vec<_> = plan.annotations.iter().map(space).collect();
        // Cell spans are six and five units: one space unit plus the width.
        assert_eq!(spaces, vec![(7, 4), (13, 2), (7, 2), (13, 3)]);
        let ranges: Vec<_> = plan.annotations.iter().map(|a| a.range.clone()).collect();
        assert_eq!(ranges, vec![3..4, 8..9, 16..17, 20..21]);
    }

    #[test]
    fn empty_cells_follow_the_wide_cell() {
        let (_, plan) = plan_with("| 表 |\n|        |", &Mono, &padded(2));
        let plan = plan.expect("plan");
        let spaces: Vec<_> = plan.annotations.iter().map(space).collect();
        assert_eq!(spaces, vec![(6, 2), (6, 4)]);
        // The empty cell keeps its first blank and hides the rest.
        assert_eq!(plan.annotations[1].range, 9..16);
    }

    #[test]
    fn right_aligned_content_ends_flush() {
        let text = "| a |\n|---:|\n| bbb |\n|  cc  |";
        let (doc, plan) = plan_with(text, &Mono, &padded(2));
        let plan = plan.expect("plan");
        for (idx, content) in [(0, "a"), (2, "bbb"), (3, " cc ")] {
            let cell_begin = doc.line_offset(idx) + 1;
            let lead = plan
                .annotations
                .iter()
                .find(|a| a.range.start == cell_begin)
                .expect("leading pad");
            let (align_to, _) = space(lead);
            assert_eq!(align_to + Mono.measure_width(content), 7, "row {idx}");
        }
    }

    #[test]
    fn wide_leading_padding_collapses_when_left_aligned() {
        let (_, plan) = plan_with("|    abc |", &Mono, &padded(2));
        let plan = plan.expect("plan");
        assert_eq!(plan.annotations.len(), 2);
        assert_eq!(plan.annotations[0].range, 1..4);
        assert_eq!(space(&plan.annotations[0]), (2, 1));
        // one collapsed unit and " abc" leave two units of the seven-unit span
        assert_eq!(space(&plan.annotations[1]), (8, 2));
    }

    #[test]
    fn unpadded_cells_get_an_insertion() {
        let (_, plan) = plan_with("|abc|\n| d |", &Mono, &padded(2));
        let plan = plan.expect("plan");
        let first = &plan.annotations[0];
        assert!(first.is_insertion());
        assert_eq!(first.range, 4..4);
        assert_eq!(space(first), (7, 3));
    }

    #[test]
    fn markdown_separator_becomes_rules() {
        let (_, plan) = plan_with("| a | b |\n|:--|--:|\n| c | d |", &Mono, &padded(2));
        let plan = plan.expect("plan");
        let rules: Vec<_> = plan
            .annotations
            .iter()
            .filter(|a| {
                matches!(
                    a.kind,
                    AnnotationKind::Space {
                        fill: Fill::Rule,
                        ..
                    }
                )
            })
            .map(|a| (a.range.clone(), space(a)))
            .collect();
        assert_eq!(rules, vec![(11..14, (5, 4)), (15..18, (10, 4))]);
    }

    #[test]
    fn org_junctions_are_drawn_as_bars() {
        let (doc, plan) = plan_with("| a | b |\n|---+---|\n| c | d |", &Mono, &padded(2));
        let plan = plan.expect("plan");
        assert_eq!(glyphs_on_line(&doc, &plan, 1), vec!["|".to_string()]);
        let junction = plan
            .annotations
            .iter()
            .find(|a| matches!(a.kind, AnnotationKind::Glyphs(_)))
            .expect("junction");
        assert_eq!(junction.range, 14..15);
    }

    #[test]
    fn full_height_bars_are_cosmetic() {
        let config = AlignConfig {
            full_height_bar: true,
            ..padded(2)
        };
        let (_, plan) = plan_with("| a | b |\n|---+---|", &Mono, &config);
        let plan = plan.expect("plan");
        let bars: Vec<_> = plan
            .annotations
            .iter()
            .filter(|a| a.kind == AnnotationKind::Bar)
            .collect();
        assert_eq!(bars.len(), 6);
        assert!(bars.iter().all(|a| a.tag == Tag::Cosmetic));
    }

    #[test]
    fn ascii_box_is_redrawn_in_unicode() {
        let text = "+--+--+--+\n| a| bb| 表|\n+--+--+--+\n| ccc| d| e|\n+--+--+--+";
        let (doc, plan) = plan_with(text, &Proportional, &padded(4));
        let plan = plan.expect("plan");
        // widths: 6+4 -> 12, 4+4 -> 9, 4+4 -> 9 in three-unit rule glyphs
        let expected = |left: &str, junction: &str, right: &str| {
            vec![
                left.to_string(),
                "────".to_string(),
                junction.to_string(),
                "───".to_string(),
                junction.to_string(),
                "───".to_string(),
                right.to_string(),
            ]
        };
        assert_eq!(glyphs_on_line(&doc, &plan, 0), expected("┌", "┬", "┐"));
        assert_eq!(glyphs_on_line(&doc, &plan, 2), expected("├", "┼", "┤"));
        assert_eq!(glyphs_on_line(&doc, &plan, 4), expected("└", "┴", "┘"));
        assert_eq!(glyphs_on_line(&doc, &plan, 1), vec!["│".to_string(); 4]);
        for glyphs in glyphs_on_line(&doc, &plan, 0) {
            assert_eq!(Proportional.measure_width(&glyphs) % 3, 0);
        }
    }

    #[test]
    fn box_data_cells_span_the_rule() {
        let text = "┌───┬──┐\n│ a │ b│\n└───┴──┘";
        let (_, plan) = plan_with(text, &Proportional, &padded(4));
        let plan = plan.expect("plan");
        let spaces: Vec<_> = plan
            .annotations
            .iter()
            .filter(|a| matches!(a.kind, AnnotationKind::Space { .. }))
            .map(space)
            .collect();
        // x starts after a three-unit bar and both columns are six units
        assert_eq!(spaces, vec![(9, 3), (18, 3)]);
    }

    #[test]
    fn malformed_row_aborts_the_plan() {
        let (_, plan) = plan_with("| a | b |\n| c | d", &Mono, &padded(2));
        assert!(matches!(
            plan.unwrap_err(),
            AlignError::MalformedCell { line: 1, .. }
        ));
    }
}
