//! Ratatui rendering for linetree.
//!
//! Purely presentational: reads the [`App`] and draws into a `Frame`. The only
//! state it touches is the table's scroll state.

use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row as TableRow, Table, Wrap};
use ratatui::Frame;
use unicode_width::UnicodeWidthStr;

use crate::app::{App, Mode, LANGUAGES_WIDTH};
use crate::chart::{chart_lines, ASPECT_FIX};
use crate::filter::NAME_FILTER;
use crate::preview::PreviewContent;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const MIN_NAME_WIDTH: u16 = 20;
const ICON_WIDTH: u16 = 3;
const COUNT_WIDTH: u16 = 10;
const PERCENT_WIDTH: u16 = 12;

const ACCENT: Color = Color::Rgb(0x7D, 0x56, 0xF4);
const HEADER_STYLE: Style = Style::new().fg(Color::DarkGray).add_modifier(Modifier::BOLD);
const KEY_STYLE: Style = Style::new().fg(Color::Gray);
const DESC_STYLE: Style = Style::new().fg(Color::DarkGray);

const SHORT_HELP: &[(&str, &str)] = &[
    ("↑/k", "up"),
    ("↓/j", "down"),
    ("enter", "open"),
    ("backspace", "back"),
    ("/", "search"),
    ("tab", "language"),
    ("?", "more"),
    ("q", "quit"),
];

const FULL_HELP: &[&[(&str, &str)]] = &[
    &[("↑/k", "up"), ("↓/j", "down"), ("g/home", "top"), ("G/end", "bottom")],
    &[("enter", "open"), ("backspace", "back"), ("e", "edit file"), ("esc", "clear filters")],
    &[("/", "search"), ("tab", "cycle language"), ("ctrl+l", "select languages"), ("ctrl+w", "chart")],
    &[("?", "less"), ("q", "quit"), ("ctrl+c", "force quit")],
];

// ---------------------------------------------------------------------------
// Layout helpers
// ---------------------------------------------------------------------------

/// A rect of `percent` of `area` in each direction, at least `min_w`×`min_h`
/// (but never larger than `area`), centered.
pub fn centered_rect(percent: u16, min_w: u16, min_h: u16, area: Rect) -> Rect {
    let scale = |len: u16| (u32::from(len) * u32::from(percent) / 100) as u16;
    let width = scale(area.width).max(min_w).min(area.width);
    let height = scale(area.height).max(min_h).min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn overlay_block(title: String, color: Color) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .title(Span::styled(
            title,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ))
}

fn help_spans(bindings: &[(&str, &str)]) -> Vec<Span<'static>> {
    let mut spans = vec![Span::raw(" ")];
    for (i, (key, desc)) in bindings.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" • ", DESC_STYLE));
        }
        spans.push(Span::styled(key.to_string(), KEY_STYLE));
        spans.push(Span::styled(format!(" {}", desc), DESC_STYLE));
    }
    spans
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

fn name_width(app: &App) -> u16 {
    let widest = app
        .rows
        .iter()
        .map(|r| UnicodeWidthStr::width(r.name.as_str()))
        .max()
        .unwrap_or(0);
    (widest as u16).saturating_add(1).max(MIN_NAME_WIDTH)
}

fn right(text: String) -> Cell<'static> {
    Cell::from(Line::from(text).alignment(Alignment::Right))
}

fn render_table(frame: &mut Frame, area: Rect, app: &mut App) {
    let header = TableRow::new(vec![
        Cell::from(""),
        Cell::from("Name"),
        Cell::from("Languages"),
        right("Code".to_string()),
        right("Comments".to_string()),
        right("Blanks".to_string()),
        right("Total".to_string()),
        right("% of Parent".to_string()),
    ])
    .style(HEADER_STYLE)
    .bottom_margin(1);

    let rows: Vec<TableRow> = app
        .rows
        .iter()
        .map(|row| {
            let name_style = if row.is_dir {
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };
            TableRow::new(vec![
                Cell::from(row.icon),
                Cell::from(Span::styled(row.name.clone(), name_style)),
                Cell::from(Span::styled(row.languages.clone(), DESC_STYLE)),
                right(row.stats.code.to_string()),
                right(row.stats.comments.to_string()),
                right(row.stats.blanks.to_string()),
                right(row.stats.total().to_string()),
                right(row.percent.clone()),
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(ICON_WIDTH),
        Constraint::Length(name_width(app)),
        Constraint::Length(LANGUAGES_WIDTH as u16),
        Constraint::Length(COUNT_WIDTH),
        Constraint::Length(COUNT_WIDTH),
        Constraint::Length(COUNT_WIDTH),
        Constraint::Length(COUNT_WIDTH),
        Constraint::Length(PERCENT_WIDTH),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .column_spacing(1)
        .row_highlight_style(
            Style::default()
                .fg(Color::White)
                .bg(ACCENT)
                .add_modifier(Modifier::BOLD),
        );

    frame.render_stateful_widget(table, area, &mut app.table_state);
}

// ---------------------------------------------------------------------------
// Status, help and search bars
// ---------------------------------------------------------------------------

fn status_line(app: &App) -> Line<'static> {
    let label = |text: &str| {
        Span::styled(
            format!(" {} ", text),
            Style::default()
                .fg(Color::Black)
                .bg(Color::Gray)
                .add_modifier(Modifier::BOLD),
        )
    };
    let value =
        |text: String| Span::styled(format!(" {} ", text), Style::default().fg(Color::White));

    let stats = app.current_stats();
    Line::from(vec![
        Span::styled(
            format!(" linetree v{} ", env!("CARGO_PKG_VERSION")),
            Style::default()
                .fg(Color::White)
                .bg(ACCENT)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        label("PATH"),
        value(app.nav.current().path.clone()),
        label("LANG FILTER"),
        value(app.scope().label()),
        label("CODE"),
        value(stats.code.to_string()),
        label("TOTAL"),
        value(stats.total().to_string()),
    ])
}

fn help_lines(app: &App) -> Vec<Line<'static>> {
    if app.full_help {
        FULL_HELP.iter().map(|group| Line::from(help_spans(group))).collect()
    } else {
        vec![Line::from(help_spans(SHORT_HELP))]
    }
}

fn search_line(app: &App) -> Line<'static> {
    let query = app.filters.view(NAME_FILTER).unwrap_or_default();
    let mut spans = vec![
        Span::styled(
            " / ",
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!(" {}", query), Style::default().fg(Color::White)),
    ];
    if app.mode == Mode::Input {
        spans.push(Span::styled(
            "_",
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::SLOW_BLINK),
        ));
        spans.push(Span::styled(
            "  (enter to open, esc to cancel)",
            DESC_STYLE,
        ));
    }
    Line::from(spans)
}

// ---------------------------------------------------------------------------
// Overlays
// ---------------------------------------------------------------------------

fn render_chart(frame: &mut Frame, app: &App) {
    let area = centered_rect(80, 40, 12, frame.area());
    frame.render_widget(Clear, area);

    let block = overlay_block(
        format!(" Languages in {} ", app.nav.current().path),
        Color::Cyan,
    );
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let (total, sectors) = app.chart_data();
    if total <= 0.0 {
        frame.render_widget(
            Paragraph::new("No lines to chart").alignment(Alignment::Center),
            inner,
        );
        return;
    }

    let half = (inner.width / 2) as f64;
    let radius = (half / 2.0 - 1.0)
        .min((inner.height as f64 / 2.0 - 1.0) * ASPECT_FIX)
        .max(1.0);
    let lines = chart_lines(
        inner.width as usize,
        inner.height as usize,
        radius,
        total,
        sectors,
    );
    frame.render_widget(Paragraph::new(Text::from(lines)), inner);
}

fn render_language_select(frame: &mut Frame, app: &App) {
    let height = (app.languages.len() as u16).saturating_add(4);
    let area = centered_rect(40, 36, height.min(frame.area().height), frame.area());
    frame.render_widget(Clear, area);

    let mut lines: Vec<Line<'static>> = app
        .languages
        .iter()
        .enumerate()
        .map(|(i, lang)| {
            let mark = if app.selected_languages.contains(lang) {
                "[x]"
            } else {
                "[ ]"
            };
            let style = if i == app.select_index {
                Style::default().fg(Color::White).bg(ACCENT)
            } else {
                Style::default().fg(Color::White)
            };
            Line::from(Span::styled(format!(" {} {}", mark, lang), style))
        })
        .collect();
    if lines.is_empty() {
        lines.push(Line::from(Span::styled(" no languages here", DESC_STYLE)));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(help_spans(&[
        ("space", "toggle"),
        ("enter", "apply"),
        ("esc", "close"),
    ])));

    let skip = app
        .select_index
        .saturating_sub(area.height.saturating_sub(4) as usize);
    let paragraph = Paragraph::new(Text::from(lines))
        .block(overlay_block(" Select languages ".to_string(), ACCENT))
        .scroll((skip as u16, 0));
    frame.render_widget(paragraph, area);
}

fn render_preview(frame: &mut Frame, app: &App) {
    let Some(preview) = app.preview.as_ref() else {
        return;
    };
    let area = centered_rect(80, 50, 15, frame.area());
    frame.render_widget(Clear, area);

    let block = overlay_block(format!(" {} ", preview.file_name()), Color::Cyan).title_bottom(
        Line::from(Span::styled(
            format!(" {}/{} ", preview.scroll() + 1, preview.line_count()),
            DESC_STYLE,
        ))
        .alignment(Alignment::Right),
    );
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let (text, style) = match &preview.content {
        PreviewContent::Text(s) => (s.as_str(), Style::default().fg(Color::White)),
        PreviewContent::Notice(s) => (s.as_str(), Style::default().fg(Color::Yellow)),
    };
    let lines: Vec<Line> = text
        .lines()
        .skip(preview.scroll())
        .take(inner.height as usize)
        .map(|l| Line::from(Span::styled(l.replace('\t', "    "), style)))
        .collect();
    frame.render_widget(Paragraph::new(Text::from(lines)), inner);
}

fn render_error(frame: &mut Frame, message: &str) {
    let area = centered_rect(60, 40, 7, frame.area());
    frame.render_widget(Clear, area);

    let block = overlay_block(" Error ".to_string(), Color::Red).title_bottom(
        Line::from(Span::styled(" press any key ", DESC_STYLE)).alignment(Alignment::Right),
    );
    let paragraph = Paragraph::new(message.to_string())
        .style(Style::default().fg(Color::Red))
        .wrap(Wrap { trim: false })
        .block(block);
    frame.render_widget(paragraph, area);
}

// ---------------------------------------------------------------------------
// Main render entry point
// ---------------------------------------------------------------------------

/// Draw the whole screen for the current app state.
pub fn render_ui(frame: &mut Frame, app: &mut App) {
    let help = help_lines(app);
    let search_height: u16 = if app.filters.is_enabled(NAME_FILTER) { 1 } else { 0 };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),                     // table
            Constraint::Length(1),                  // status bar
            Constraint::Length(help.len() as u16),  // help
            Constraint::Length(search_height),      // search bar
        ])
        .split(frame.area());

    render_table(frame, chunks[0], app);
    frame.render_widget(Paragraph::new(status_line(app)), chunks[1]);
    frame.render_widget(Paragraph::new(Text::from(help)), chunks[2]);
    if search_height > 0 {
        frame.render_widget(Paragraph::new(search_line(app)), chunks[3]);
    }

    if app.show_chart {
        render_chart(frame, app);
    }
    match app.mode {
        Mode::SelectLanguages => render_language_select(frame, app),
        Mode::Preview => render_preview(frame, app),
        Mode::Ready | Mode::Input => {}
    }
    if let Some(message) = &app.error {
        render_error(frame, message);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    use super::*;
    use crate::app::AppEvent;
    use crate::navigator::Navigator;
    use crate::stats::CodeStats;
    use crate::tree::Tree;

    fn app() -> App {
        let mut files = BTreeMap::new();
        let mut go = BTreeMap::new();
        go.insert("Go".to_string(), CodeStats::new(10, 2, 1));
        files.insert("src/a.go".to_string(), go);
        let mut go = BTreeMap::new();
        go.insert("Go".to_string(), CodeStats::new(5, 0, 0));
        files.insert("src/b.go".to_string(), go);
        let mut md = BTreeMap::new();
        md.insert("Markdown".to_string(), CodeStats::new(3, 0, 1));
        files.insert("README.md".to_string(), md);
        App::new(Navigator::new(Tree::from_file_stats(".", files)), "true".to_string())
    }

    fn draw(app: &mut App, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|frame| render_ui(frame, app)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        let mut out = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                out.push_str(buffer[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    fn key(app: &mut App, code: KeyCode, modifiers: KeyModifiers) {
        app.update(AppEvent::Key(KeyEvent::new(code, modifiers)));
    }

    #[test]
    fn test_centered_rect_respects_minimum_and_bounds() {
        let area = Rect::new(0, 0, 100, 40);
        assert_eq!(centered_rect(80, 50, 15, area), Rect::new(10, 4, 80, 32));

        let small = Rect::new(0, 0, 40, 10);
        assert_eq!(centered_rect(80, 50, 15, small), Rect::new(0, 0, 40, 10));

        let narrow = Rect::new(0, 0, 60, 40);
        assert_eq!(centered_rect(50, 50, 15, narrow).width, 50);
    }

    #[test]
    fn test_renders_table_and_status() {
        let mut app = app();
        let screen = draw(&mut app, 120, 20);

        assert!(screen.contains("Name"));
        assert!(screen.contains("% of Parent"));
        assert!(screen.contains("src"));
        assert!(screen.contains("README.md"));
        assert!(screen.contains("81.82 %"));
        assert!(screen.contains("LANG FILTER"));
        assert!(screen.contains("TOTAL"));
        assert!(screen.contains(" 22 "));
        assert!(screen.contains("q quit"));
    }

    #[test]
    fn test_search_bar_appears_with_name_filter() {
        let mut app = app();
        assert!(!draw(&mut app, 120, 20).contains("esc to cancel"));

        key(&mut app, KeyCode::Char('/'), KeyModifiers::NONE);
        key(&mut app, KeyCode::Char('r'), KeyModifiers::NONE);
        let screen = draw(&mut app, 120, 20);
        assert!(screen.contains(" / "));
        assert!(screen.contains("esc to cancel"));
        assert!(screen.contains("README.md"));
    }

    #[test]
    fn test_full_help_toggles() {
        let mut app = app();
        key(&mut app, KeyCode::Char('?'), KeyModifiers::NONE);
        let screen = draw(&mut app, 120, 20);
        assert!(screen.contains("select languages"));
        assert!(screen.contains("force quit"));
    }

    #[test]
    fn test_chart_overlay_lists_languages() {
        let mut app = app();
        key(&mut app, KeyCode::Char('w'), KeyModifiers::CONTROL);
        let screen = draw(&mut app, 100, 30);
        assert!(screen.contains("Languages in ."));
        assert!(screen.contains("Go"));
        assert!(screen.contains("Markdown"));
        assert!(screen.contains('█'));
    }

    #[test]
    fn test_language_select_overlay() {
        let mut app = app();
        key(&mut app, KeyCode::Char('l'), KeyModifiers::CONTROL);
        key(&mut app, KeyCode::Char(' '), KeyModifiers::NONE);
        let screen = draw(&mut app, 100, 30);
        assert!(screen.contains("Select languages"));
        assert!(screen.contains("[x] Go"));
        assert!(screen.contains("[ ] Markdown"));
    }

    #[test]
    fn test_error_overlay() {
        let mut app = app();
        app.update(AppEvent::EditorFinished(Err("editor 'nope' exited".to_string())));
        let screen = draw(&mut app, 100, 30);
        assert!(screen.contains("Error"));
        assert!(screen.contains("editor 'nope' exited"));
        assert!(screen.contains("press any key"));
    }

    #[test]
    fn test_preview_overlay_shows_notice_for_missing_file() {
        let mut app = app();
        key(&mut app, KeyCode::End, KeyModifiers::NONE);
        key(&mut app, KeyCode::Enter, KeyModifiers::NONE);
        assert_eq!(app.mode, Mode::Preview);

        let dir = tempfile::tempdir().unwrap();
        app.preview = Some(crate::preview::FilePreview::open(dir.path().join("gone.md")));
        let screen = draw(&mut app, 100, 30);
        assert!(screen.contains("gone.md"));
        assert!(screen.contains("Error reading file"));
        assert!(screen.contains("1/1"));
    }

    #[test]
    fn test_tiny_terminal_does_not_panic() {
        let mut app = app();
        key(&mut app, KeyCode::Char('w'), KeyModifiers::CONTROL);
        draw(&mut app, 10, 4);
        key(&mut app, KeyCode::Char('l'), KeyModifiers::CONTROL);
        draw(&mut app, 10, 4);
    }
}
