use ratatui::{
    style::{Color, Style},
    text::{Line, Span},
};

use crate::{
    annotation::{Annotation, AnnotationKind, AnnotationLayer, Fill},
    document::Document,
    metrics::CellMetrics,
};

pub const RULE_FG: Color = Color::DarkGray;
pub const BAR_FG: Color = Color::Gray;

const RULE_GLYPH: &str = "─";
const BAR_GLYPH: &str = "│";

/// Composes line `idx` of `doc` with the layer's annotations into terminal
/// spans. The document text itself is never altered.
pub fn compose_line(
    doc: &dyn Document,
    idx: usize,
    layer: &AnnotationLayer,
    metrics: &CellMetrics,
) -> Line<'static> {
    let start = doc.line_offset(idx);
    let end = doc.line_end(idx);
    let annotations = layer
        .in_range(start..end)
        .filter(|annotation| annotation.range.start >= start && annotation.range.end <= end);
    overlay_line(doc.line(idx), start, annotations, metrics)
}

/// Draws `line`, whose first byte sits at `offset`, with each annotation's
/// range replaced by what the annotation paints. Insertions land before any
/// replacement starting at the same byte; overlapping ranges lose to the
/// earlier one.
pub fn overlay_line<'a>(
    line: &str,
    offset: usize,
    annotations: impl IntoIterator<Item = &'a Annotation>,
    metrics: &CellMetrics,
) -> Line<'static> {
    let mut annotations: Vec<&Annotation> = annotations.into_iter().collect();
    annotations.sort_by_key(|annotation| {
        (
            annotation.range.start,
            !annotation.is_insertion(),
            annotation.range.end,
        )
    });

    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut pos = 0usize;
    for annotation in annotations {
        let Some(from) = annotation.range.start.checked_sub(offset) else {
            continue;
        };
        let to = annotation.range.end - offset;
        if from < pos || to > line.len() {
            continue;
        }
        if from > pos {
            spans.push(Span::raw(line[pos..from].to_string()));
        }
        spans.push(paint(&annotation.kind, metrics));
        pos = to;
    }
    if pos < line.len() {
        spans.push(Span::raw(line[pos..].to_string()));
    }
    Line::from(spans)
}

fn paint(kind: &AnnotationKind, metrics: &CellMetrics) -> Span<'static> {
    match kind {
        AnnotationKind::Space { width, fill, .. } => {
            let columns = metrics.columns(*width);
            match fill {
                Fill::Blank => Span::raw(" ".repeat(columns)),
                Fill::Rule => {
                    Span::styled(RULE_GLYPH.repeat(columns), Style::default().fg(RULE_FG))
                }
            }
        }
        AnnotationKind::Glyphs(glyphs) => Span::styled(glyphs.clone(), Style::default().fg(RULE_FG)),
        AnnotationKind::Bar => Span::styled(BAR_GLYPH, Style::default().fg(BAR_FG)),
    }
}

/// Plain text of a composed line, styles dropped.
pub fn line_text(line: &Line<'_>) -> String {
    line.spans
        .iter()
        .map(|span| span.content.as_ref())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::AlignConfig, document::TextDocument, Aligner};

    fn aligned(text: &str, config: AlignConfig) -> Vec<String> {
        let doc = TextDocument::new(text);
        let metrics = CellMetrics::default();
        let mut layer = AnnotationLayer::new();
        let report = Aligner::new(config).align_region(&doc, &metrics, &mut layer, 0..doc.len());
        assert!(report.failures.is_empty());
        (0..doc.line_count())
            .map(|idx| line_text(&compose_line(&doc, idx, &layer, &metrics)))
            .collect()
    }

    #[test]
    fn pipe_table_lines_up_in_columns() {
        let lines = aligned(
            "| a | bb |\n|---|---|\n| ccc | d |",
            AlignConfig::default(),
        );
        assert_eq!(
            lines,
            vec![
                "| a    | bb  |",
                "|──────|─────|",
                "| ccc  | d   |",
            ]
        );
    }

    #[test]
    fn right_columns_are_flush() {
        let lines = aligned("| n |\n|--:|\n| 1 |\n| 100 |", AlignConfig::default());
        assert_eq!(lines[2], "|    1 |");
        assert_eq!(lines[3], "|  100 |");
    }

    #[test]
    fn wide_glyphs_keep_columns_straight() {
        let lines = aligned("| 表格 | x |\n| ab | y |", AlignConfig::default());
        assert_eq!(lines, vec!["| 表格  | x  |", "| ab    | y  |"]);
    }

    #[test]
    fn ascii_box_is_redrawn() {
        let lines = aligned(
            "+--+--+\n| a| bcd|\n+--+--+",
            AlignConfig::default(),
        );
        assert_eq!(
            lines,
            vec!["┌───┬─────┐", "│ a │ bcd │", "└───┴─────┘"]
        );
    }

    #[test]
    fn bars_replace_delimiters() {
        let config = AlignConfig {
            full_height_bar: true,
            ..AlignConfig::default()
        };
        let lines = aligned("| a |", config);
        assert_eq!(lines, vec!["│ a  │"]);
    }

    #[test]
    fn insertions_go_before_replacements() {
        let metrics = CellMetrics::default();
        let annotations = [
            Annotation::glyphs(5..6, "│"),
            Annotation::space(5..5, 0, 16),
        ];
        let line = overlay_line("ab|cd|", 0, annotations.iter(), &metrics);
        assert_eq!(line_text(&line), "ab|cd  │");
    }

    #[test]
    fn unannotated_lines_are_untouched() {
        let layer = AnnotationLayer::new();
        let doc = TextDocument::new("plain | text");
        let line = compose_line(&doc, 0, &layer, &CellMetrics::default());
        assert_eq!(line_text(&line), "plain | text");
    }
}
