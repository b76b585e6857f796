use std::{
    fs, io,
    path::{Path, PathBuf},
};

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Padding, Paragraph, Wrap},
    Frame,
};
use table_align::{
    render::compose_line, AlignConfig, Aligner, AnnotationLayer, CellMetrics, Document,
    TextDocument,
};
use tracing::debug;

const HSCROLL_STEP: usize = 4;

/// Reads `path` as markdown, or as org when the extension says so.
pub fn load_document(path: &Path) -> io::Result<TextDocument> {
    let text = fs::read_to_string(path)?;
    let is_org = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("org"));
    Ok(if is_org {
        TextDocument::org(text)
    } else {
        TextDocument::markdown(text)
    })
}

pub struct App {
    path: PathBuf,
    doc: TextDocument,
    layer: AnnotationLayer,
    aligner: Aligner,
    metrics: CellMetrics,
    aligned: bool,
    tables: TableCounts,
    scroll: usize,
    hscroll: usize,
    viewport_height: u16,
    status: Option<String>,
    show_help: bool,
}

#[derive(Default)]
struct TableCounts {
    aligned: usize,
    failed: usize,
}

impl App {
    pub fn load(path: &Path, config: AlignConfig) -> io::Result<Self> {
        let doc = load_document(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            doc,
            layer: AnnotationLayer::new(),
            aligner: Aligner::new(config),
            metrics: CellMetrics::default(),
            aligned: true,
            tables: TableCounts::default(),
            scroll: 0,
            hscroll: 0,
            viewport_height: 0,
            status: Some(String::from("Press ? for help, q to quit")),
            show_help: false,
        })
    }

    pub fn reload(&mut self) -> io::Result<()> {
        self.doc = load_document(&self.path)?;
        self.layer.clear_all();
        self.scroll = self.scroll.min(self.max_scroll());
        debug!(path = %self.path.display(), "reloaded");
        Ok(())
    }

    pub fn draw(&mut self, frame: &mut Frame<'_>) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(1)])
            .split(frame.size());

        let viewer_block = Block::default()
            .title(self.title_line())
            .borders(Borders::ALL)
            .padding(Padding::horizontal(1));

        let viewport = layout[0];
        let inner = viewer_block.inner(viewport);
        self.viewport_height = inner.height.max(1);
        self.scroll = self.scroll.min(self.max_scroll());

        let visible = self.visible_lines();
        if self.aligned {
            self.align_visible(visible.clone());
        }
        let content: Vec<Line<'static>> = visible
            .map(|idx| compose_line(&self.doc, idx, &self.layer, &self.metrics))
            .collect();

        let paragraph = Paragraph::new(content)
            .scroll((0, self.hscroll.min(u16::MAX as usize) as u16))
            .block(viewer_block);
        frame.render_widget(paragraph, viewport);

        let status = Paragraph::new(self.status_line()).wrap(Wrap { trim: true });
        frame.render_widget(status, layout[1]);

        if self.show_help {
            self.render_help(frame, frame.size());
        }
    }

    /// The viewport is the dirty region: every draw re-aligns what is shown.
    fn align_visible(&mut self, lines: std::ops::Range<usize>) {
        if lines.is_empty() {
            return;
        }
        let range = self.doc.line_offset(lines.start)..self.doc.line_end(lines.end - 1);
        let report = self
            .aligner
            .align_region(&self.doc, &self.metrics, &mut self.layer, range);
        self.tables = TableCounts {
            aligned: report.aligned,
            failed: report.failures.len(),
        };
        if let Some(err) = report.failures.first() {
            self.status = Some(format!("Table left unaligned: {err}"));
        }
    }

    pub fn toggle_alignment(&mut self) {
        self.aligned = !self.aligned;
        if self.aligned {
            self.set_status("Alignment on");
        } else {
            let removed = self
                .aligner
                .reset_region(&self.doc, &mut self.layer, 0..self.doc.len());
            self.tables = TableCounts::default();
            self.set_status(format!("Alignment off, {removed} annotations cleared"));
        }
    }

    pub fn toggle_bars(&mut self) {
        let config = self.aligner.config_mut();
        config.full_height_bar = !config.full_height_bar;
        let state = if config.full_height_bar { "on" } else { "off" };
        self.set_status(format!("Full-height bars {state}"));
    }

    pub fn scroll_up(&mut self, rows: usize) {
        if rows == 0 {
            return;
        }
        self.scroll = self.scroll.saturating_sub(rows);
    }

    pub fn scroll_down(&mut self, rows: usize) {
        if rows == 0 {
            return;
        }
        self.scroll = self.scroll.saturating_add(rows).min(self.max_scroll());
    }

    pub fn scroll_left(&mut self) {
        self.hscroll = self.hscroll.saturating_sub(HSCROLL_STEP);
    }

    pub fn scroll_right(&mut self) {
        self.hscroll = self.hscroll.saturating_add(HSCROLL_STEP);
    }

    pub fn page_up(&mut self) {
        self.scroll_up(self.viewport_height.max(1) as usize);
    }

    pub fn page_down(&mut self) {
        self.scroll_down(self.viewport_height.max(1) as usize);
    }

    pub fn scroll_to(&mut self, row: usize) {
        self.scroll = row.min(self.max_scroll());
    }

    pub fn scroll_to_end(&mut self) {
        self.scroll = self.max_scroll();
    }

    pub fn set_status<T: Into<String>>(&mut self, msg: T) {
        self.status = Some(msg.into());
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    pub fn is_help_open(&self) -> bool {
        self.show_help
    }

    fn max_scroll(&self) -> usize {
        self.doc
            .line_count()
            .saturating_sub(self.viewport_height as usize)
    }

    fn visible_lines(&self) -> std::ops::Range<usize> {
        let end = (self.scroll + self.viewport_height as usize).min(self.doc.line_count());
        self.scroll.min(end)..end
    }

    fn render_help(&self, frame: &mut Frame<'_>, area: Rect) {
        let popup = centered_rect(70, 70, area);
        frame.render_widget(Clear, popup);

        let block = Block::default()
            .title("Help (? / Esc to close)")
            .borders(Borders::ALL)
            .style(Style::default().bg(Color::Black));

        let header_style = Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD);
        let bullet = |text: &str| Line::from(format!("  • {text}"));

        let lines = vec![
            Line::from(Span::styled("Navigation", header_style)),
            bullet("j / k or arrow keys: line scroll"),
            bullet("h / l or left / right: horizontal scroll"),
            bullet("Space / n / PgDn: page down  |  p / PgUp: page up"),
            bullet("g or Home: top  |  G or End: bottom"),
            Line::from(""),
            Line::from(Span::styled("Tables", header_style)),
            bullet("a: toggle alignment (off clears the overlay)"),
            bullet("b: toggle full-height bars"),
            bullet("The source text is never changed; only its display is."),
            Line::from(""),
            Line::from(Span::styled("Other", header_style)),
            bullet("r: reload file  |  q or Ctrl+C: quit"),
            bullet("?: toggle this help overlay"),
        ];

        let paragraph = Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(block);
        frame.render_widget(paragraph, popup);
    }

    fn title_line(&self) -> Line<'static> {
        let mut spans = vec![
            Span::styled(
                format!("{}", self.path.display()),
                Style::default().fg(Color::Cyan),
            ),
            Span::raw(" "),
            Span::styled(
                format!("({} lines)", self.doc.line_count()),
                Style::default().fg(Color::Gray),
            ),
        ];
        if self.aligned {
            spans.push(Span::styled(
                format!(" {} tables aligned", self.tables.aligned),
                Style::default().fg(Color::Green),
            ));
        }
        if self.tables.failed > 0 {
            spans.push(Span::styled(
                format!(", {} failed", self.tables.failed),
                Style::default().fg(Color::Red),
            ));
        }
        Line::from(spans)
    }

    fn status_line(&self) -> Line<'static> {
        let mut spans = vec![Span::raw(
            "j/k: line  h/l: column  a: align  b: bars  r: reload  ?: help  q: quit",
        )];
        if let Some(status) = &self.status {
            spans.push(Span::raw("  -  "));
            spans.push(Span::styled(
                status.clone(),
                Style::default().fg(Color::Yellow),
            ));
        }
        Line::from(spans)
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
