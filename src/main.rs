mod app;

use std::{
    env, fs,
    io::{self, stdout, Write},
    path::{Path, PathBuf},
    sync::Mutex,
    time::Duration,
};

use app::{load_document, App};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    style::Color,
    text::Line,
    Terminal,
};
use table_align::{
    render::compose_line, scanner::is_table_line, AlignConfig, Aligner, AnnotationLayer,
    CellMetrics, Document, PipeDialect,
};
use tracing_subscriber::EnvFilter;

fn main() -> io::Result<()> {
    let args = parse_args().unwrap_or_else(|| {
        eprintln!("Usage: table-align [options] <file>   (see --help)");
        std::process::exit(2);
    });

    if let Some(log) = &args.log {
        init_logging(log)?;
    }

    if args.dump {
        return dump_file(&args.path, args.config);
    }

    let mut app = App::load(&args.path, args.config)?;

    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

struct Args {
    path: PathBuf,
    dump: bool,
    log: Option<PathBuf>,
    config: AlignConfig,
}

fn parse_args() -> Option<Args> {
    let mut dump = false;
    let mut log = None;
    let mut path = None;
    let mut config = AlignConfig::default();
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--help" | "-h" => {
                print_help();
                return None;
            }
            "--dump" => dump = true,
            "--bars" => config.full_height_bar = true,
            "--org" => config.pipe_dialect = PipeDialect::Org,
            "--markdown" => config.pipe_dialect = PipeDialect::Markdown,
            "--padding" => config.cell_padding = args.next()?.parse().ok()?,
            "--max-table-size" => config.max_table_size = args.next()?.parse().ok()?,
            "--log" => log = Some(PathBuf::from(args.next()?)),
            _ => path = Some(PathBuf::from(arg)),
        }
    }
    path.map(|path| Args {
        path,
        dump,
        log,
        config,
    })
}

fn print_help() {
    println!("table-align");
    println!("Usage: table-align [options] <file>\n");
    println!("Shows a markdown or org file with its tables visually aligned.");
    println!("The file is never modified.\n");
    println!("Options:");
    println!("  --dump                 Print the aligned file as ANSI text instead of launching the TUI");
    println!("  --padding <px>         Padding added to every column (default 16, 8 px per column)");
    println!("  --bars                 Draw cell delimiters as full-height bars");
    println!("  --org                  Treat pipe tables as org tables (voted alignment)");
    println!("  --markdown             Treat pipe tables as markdown tables (marker alignment)");
    println!("  --max-table-size <n>   Leave tables larger than n bytes unaligned (default 4000)");
    println!("  --log <file>           Write diagnostics to file, filtered by RUST_LOG");
    println!("  --help, -h             Show this help text");
}

fn init_logging(path: &Path) -> io::Result<()> {
    let file = fs::File::create(path)?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("table_align=debug"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn run(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|frame| app.draw(frame))?;

        if event::poll(Duration::from_millis(200))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if handle_key(app, key)? {
                    break;
                }
            }
        }
    }

    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) -> io::Result<bool> {
    if app.is_help_open() {
        match key.code {
            KeyCode::Char('?') | KeyCode::Esc => app.toggle_help(),
            _ => {}
        }
        return Ok(false);
    }
    match key.code {
        KeyCode::Char('q') => return Ok(true),
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return Ok(true),
        KeyCode::Up | KeyCode::Char('k') => app.scroll_up(1),
        KeyCode::Down | KeyCode::Char('j') => app.scroll_down(1),
        KeyCode::Left | KeyCode::Char('h') => app.scroll_left(),
        KeyCode::Right | KeyCode::Char('l') => app.scroll_right(),
        KeyCode::PageUp | KeyCode::Char('p') => app.page_up(),
        KeyCode::PageDown | KeyCode::Char('n') => app.page_down(),
        KeyCode::Char(' ') => app.page_down(),
        KeyCode::Home | KeyCode::Char('g') => app.scroll_to(0),
        KeyCode::End | KeyCode::Char('G') => app.scroll_to_end(),
        KeyCode::Char('a') => app.toggle_alignment(),
        KeyCode::Char('b') => app.toggle_bars(),
        KeyCode::Char('r') => match app.reload() {
            Ok(()) => app.set_status("Reloaded file"),
            Err(err) => app.set_status(format!("Reload failed: {err}")),
        },
        KeyCode::Char('?') => app.toggle_help(),
        _ => {}
    }

    Ok(false)
}

/// Aligns the whole file once and prints it. Prose is wrapped to the
/// terminal; table and literal lines are printed as they are.
fn dump_file(path: &Path, config: AlignConfig) -> io::Result<()> {
    let doc = load_document(path)?;
    let metrics = CellMetrics::default();
    let aligner = Aligner::new(config);
    let mut layer = AnnotationLayer::new();
    let report = aligner.align_region(&doc, &metrics, &mut layer, 0..doc.len());
    for err in &report.failures {
        eprintln!("table-align: table left unaligned: {err}");
    }

    let term_width = crossterm::terminal::size()
        .map(|(w, _)| w as usize)
        .unwrap_or(80)
        .max(1);
    let mut out = io::BufWriter::new(io::stdout());
    for idx in 0..doc.line_count() {
        if is_table_line(&doc, idx, aligner.config()) || doc.is_literal(idx) {
            let line = compose_line(&doc, idx, &layer, &metrics);
            write_line_content(&mut out, &line)?;
            writeln!(out)?;
            continue;
        }
        for row in textwrap::wrap(doc.line(idx), term_width) {
            writeln!(out, "{row}")?;
        }
    }
    out.flush()
}

const ANSI_RESET: &str = "\x1b[0m";

/// Composed lines style nothing but the foreground of their overlay spans.
fn write_line_content(out: &mut impl Write, line: &Line<'_>) -> io::Result<()> {
    for span in &line.spans {
        match span.style.fg.and_then(fg_code) {
            Some(code) => write!(out, "\x1b[{}m{}{}", code, span.content, ANSI_RESET)?,
            None => write!(out, "{}", span.content)?,
        }
    }
    Ok(())
}

fn fg_code(color: Color) -> Option<String> {
    let code = match color {
        Color::Gray => "37".to_string(),
        Color::DarkGray => "90".to_string(),
        Color::Indexed(idx) => format!("38;5;{idx}"),
        Color::Rgb(r, g, b) => format!("38;2;{r};{g};{b}"),
        _ => return None,
    };
    Some(code)
}
