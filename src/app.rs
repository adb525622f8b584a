use std::collections::BTreeSet;
use std::io::{stdout, Stdout};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::process::Command as Process;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::widgets::TableState;
use ratatui::Terminal;

use crate::chart::RawSector;
use crate::error;
use crate::filter::{FilterInput, FilterPipeline, LanguageFilter, NameFilter, NAME_FILTER};
use crate::format::{entry_icon, format_percent, truncate_with_ellipsis};
use crate::navigator::Navigator;
use crate::preview::FilePreview;
use crate::renderer;
use crate::stats::CodeStats;
use crate::tree::{Entry, ALL_LANGUAGES};

/// Width the Languages column is truncated to.
pub const LANGUAGES_WIDTH: usize = 24;

// ---------------------------------------------------------------------------
// Modes, events, commands
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Ready,
    Input,
    Preview,
    SelectLanguages,
}

/// Everything the control loop feeds into [`App::update`].
#[derive(Clone, Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Resize(u16, u16),
    EditorFinished(std::result::Result<(), String>),
}

/// Work the control loop must do outside the app state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    OpenEditor(PathBuf),
}

/// Which languages the table's numbers are restricted to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LanguageScope {
    All,
    Single(String),
    /// Percentages use the selected languages' sum as the base, not the
    /// directory aggregate, so the visible rows add up to 100 %.
    Multi(Vec<String>),
}

impl LanguageScope {
    pub fn label(&self) -> String {
        match self {
            LanguageScope::All => ALL_LANGUAGES.to_string(),
            LanguageScope::Single(lang) => lang.clone(),
            LanguageScope::Multi(langs) => langs.join(", "),
        }
    }

    pub fn languages(&self) -> Vec<String> {
        match self {
            LanguageScope::All => Vec::new(),
            LanguageScope::Single(lang) => vec![lang.clone()],
            LanguageScope::Multi(langs) => langs.clone(),
        }
    }

    pub fn stats_of(&self, entry: &Entry) -> CodeStats {
        match self {
            LanguageScope::All => entry.total_stats,
            LanguageScope::Single(lang) => entry.stats_for(Some(lang)),
            LanguageScope::Multi(langs) => langs.iter().map(|l| entry.stats_for(Some(l))).sum(),
        }
    }
}

/// One table row, precomputed from a child of the current directory.
#[derive(Clone, Debug)]
pub struct Row {
    pub icon: &'static str,
    pub name: String,
    pub path: String,
    pub is_dir: bool,
    pub languages: String,
    pub stats: CodeStats,
    pub percent: String,
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

/// Main application state and run loop.
pub struct App {
    pub nav: Navigator,
    pub filters: FilterPipeline,
    pub mode: Mode,
    pub rows: Vec<Row>,
    pub table_state: TableState,
    pub languages: Vec<String>,
    pub single_language: Option<String>,
    pub selected_languages: BTreeSet<String>,
    pub select_index: usize,
    pub show_chart: bool,
    pub full_help: bool,
    pub preview: Option<FilePreview>,
    pub error: Option<String>,
    pub editor: String,
    pub width: u16,
    pub height: u16,
    pub running: bool,
}

impl App {
    pub fn new(nav: Navigator, editor: String) -> Self {
        let filters = FilterPipeline::new()
            .with(NameFilter::new())
            .with(LanguageFilter::new());

        let mut app = Self {
            nav,
            filters,
            mode: Mode::Ready,
            rows: Vec::new(),
            table_state: TableState::default(),
            languages: Vec::new(),
            single_language: None,
            selected_languages: BTreeSet::new(),
            select_index: 0,
            show_chart: false,
            full_help: false,
            preview: None,
            error: None,
            editor,
            width: 80,
            height: 24,
            running: true,
        };
        app.refresh_rows();
        app
    }

    // ------------------------------------------------------------------
    // Derived view data
    // ------------------------------------------------------------------

    pub fn scope(&self) -> LanguageScope {
        if !self.selected_languages.is_empty() {
            LanguageScope::Multi(self.selected_languages.iter().cloned().collect())
        } else if let Some(lang) = &self.single_language {
            LanguageScope::Single(lang.clone())
        } else {
            LanguageScope::All
        }
    }

    /// Stats of the current directory under the active scope.
    pub fn current_stats(&self) -> CodeStats {
        self.scope().stats_of(self.nav.current())
    }

    pub fn selected_row(&self) -> Option<&Row> {
        self.rows.get(self.nav.cursor())
    }

    /// Input for the proportional chart: every language with lines in the
    /// current directory.
    pub fn chart_data(&self) -> (f64, Vec<RawSector>) {
        let sectors: Vec<RawSector> = self
            .nav
            .current()
            .stats_by_language
            .iter()
            .filter(|(_, s)| s.total() > 0)
            .map(|(lang, s)| RawSector::new(lang.clone(), s.total() as f64))
            .collect();
        let total = sectors.iter().map(|s| s.value).sum();
        (total, sectors)
    }

    fn update_languages(&mut self) {
        let current = self.nav.current();
        let mut langs: BTreeSet<String> = current.stats_by_language.keys().cloned().collect();
        for child in &current.children {
            langs.extend(child.stats_by_language.keys().cloned());
        }
        self.languages = langs.into_iter().collect();
        self.select_index = self
            .select_index
            .min(self.languages.len().saturating_sub(1));
    }

    /// Re-sort the current directory and rebuild the visible rows.
    pub fn refresh_rows(&mut self) {
        self.update_languages();
        self.nav.sort_current();

        let scope = self.scope();
        self.filters
            .update(&FilterInput::SelectLanguages(scope.languages()));

        let parent_total = match &scope {
            LanguageScope::All => self.nav.parent_total_lines(None),
            LanguageScope::Single(lang) => self.nav.parent_total_lines(Some(lang)),
            // Base is the selected languages only.
            LanguageScope::Multi(_) => scope.stats_of(self.nav.current()).total().max(1),
        };

        let current = self.nav.current();
        let rows: Vec<Row> = current
            .children
            .iter()
            .filter(|child| self.filters.valid(child))
            .filter_map(|child| {
                let stats = scope.stats_of(child);
                if scope != LanguageScope::All && stats.is_empty() {
                    return None;
                }
                let languages = match &scope {
                    LanguageScope::All => child.languages().join(", "),
                    _ => scope.label(),
                };
                Some(Row {
                    icon: entry_icon(child),
                    name: child.name().to_string(),
                    path: child.path.clone(),
                    is_dir: child.is_dir,
                    languages: truncate_with_ellipsis(&languages, LANGUAGES_WIDTH),
                    stats,
                    percent: format_percent(stats.total(), parent_total),
                })
            })
            .collect();
        self.rows = rows;

        if self.rows.is_empty() {
            self.table_state.select(None);
        } else {
            let cursor = self.nav.cursor().min(self.rows.len() - 1);
            self.nav.set_cursor(cursor);
            self.table_state.select(Some(cursor));
        }
    }

    fn move_cursor_to(&mut self, index: usize) {
        if self.rows.is_empty() {
            return;
        }
        let index = index.min(self.rows.len() - 1);
        self.nav.set_cursor(index);
        self.table_state.select(Some(index));
    }

    fn move_cursor_by(&mut self, delta: isize) {
        let target = self.nav.cursor().saturating_add_signed(delta);
        self.move_cursor_to(target);
    }

    fn page(&self) -> usize {
        (self.height as usize / 2).max(1)
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    fn open_selected(&mut self) {
        let Some(row) = self.selected_row().cloned() else {
            return;
        };
        if row.is_dir {
            if self.nav.descend(&row.name, self.nav.cursor()) {
                self.refresh_rows();
            }
        } else {
            self.preview = Some(FilePreview::open(&row.path));
            self.mode = Mode::Preview;
        }
    }

    fn go_up(&mut self) {
        if self.nav.ascend() {
            self.refresh_rows();
        }
    }

    fn cycle_language(&mut self) {
        if self.languages.is_empty() {
            return;
        }
        self.single_language = match &self.single_language {
            None => self.languages.first().cloned(),
            Some(current) => match self.languages.iter().position(|l| l == current) {
                Some(i) => self.languages.get(i + 1).cloned(),
                None => self.languages.first().cloned(),
            },
        };
        self.refresh_rows();
    }

    fn enter_search(&mut self) {
        self.mode = Mode::Input;
        if !self.filters.is_enabled(NAME_FILTER) {
            self.filters.toggle(NAME_FILTER);
        }
        self.filters.update(&FilterInput::Clear);
        self.refresh_rows();
    }

    fn exit_search(&mut self) {
        self.mode = Mode::Ready;
        if self.filters.is_enabled(NAME_FILTER) {
            self.filters.toggle(NAME_FILTER);
        }
        self.refresh_rows();
    }

    fn clear_filters(&mut self) {
        self.filters.reset();
        self.single_language = None;
        self.selected_languages.clear();
        self.refresh_rows();
    }

    // ------------------------------------------------------------------
    // Event handling
    // ------------------------------------------------------------------

    /// Process one event to completion.
    pub fn update(&mut self, event: AppEvent) -> Option<Command> {
        match event {
            AppEvent::Resize(width, height) => {
                self.width = width;
                self.height = height;
                None
            }
            AppEvent::EditorFinished(Ok(())) => {
                tracing::info!("editor finished");
                None
            }
            AppEvent::EditorFinished(Err(message)) => {
                tracing::warn!(%message, "editor failed");
                self.error = Some(message);
                None
            }
            AppEvent::Key(key) => self.handle_key(key),
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Option<Command> {
        if key.kind != KeyEventKind::Press {
            return None;
        }

        // Ctrl+C always quits.
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.running = false;
            return None;
        }

        // Any key dismisses an error message.
        if self.error.take().is_some() {
            return None;
        }

        match self.mode {
            Mode::Preview => self.handle_preview_key(key),
            Mode::SelectLanguages => self.handle_select_key(key),
            Mode::Input => self.handle_input_key(key),
            Mode::Ready => return self.handle_ready_key(key),
        }
        None
    }

    fn handle_preview_key(&mut self, key: KeyEvent) {
        let page = self.page();
        let Some(preview) = self.preview.as_mut() else {
            self.mode = Mode::Ready;
            return;
        };
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                self.preview = None;
                self.mode = Mode::Ready;
            }
            KeyCode::Char('j') | KeyCode::Down => preview.scroll_down(1),
            KeyCode::Char('k') | KeyCode::Up => preview.scroll_up(1),
            KeyCode::PageDown => preview.scroll_down(page),
            KeyCode::PageUp => preview.scroll_up(page),
            KeyCode::Char('g') | KeyCode::Home => preview.scroll_to_top(),
            KeyCode::Char('G') | KeyCode::End => preview.scroll_to_bottom(),
            _ => {}
        }
    }

    fn handle_select_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.mode = Mode::Ready,
            KeyCode::Char('l') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.mode = Mode::Ready
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.select_index = self.select_index.saturating_sub(1);
            }
            KeyCode::Char('j') | KeyCode::Down => {
                if self.select_index + 1 < self.languages.len() {
                    self.select_index += 1;
                }
            }
            KeyCode::Char(' ') => {
                if let Some(lang) = self.languages.get(self.select_index).cloned() {
                    if !self.selected_languages.remove(&lang) {
                        self.selected_languages.insert(lang);
                    }
                }
            }
            KeyCode::Enter => {
                self.mode = Mode::Ready;
                self.refresh_rows();
            }
            _ => {}
        }
    }

    fn handle_input_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.exit_search(),
            KeyCode::Enter => {
                let name = self.selected_row().map(|r| r.name.clone());
                self.exit_search();
                if let Some(name) = name {
                    if self.nav.descend(&name, 0) {
                        self.refresh_rows();
                    }
                }
            }
            KeyCode::Up => self.move_cursor_by(-1),
            KeyCode::Down => self.move_cursor_by(1),
            KeyCode::Backspace => {
                self.filters.update(&FilterInput::Backspace);
                self.refresh_rows();
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.filters.update(&FilterInput::Char(c));
                self.nav.set_cursor(0);
                self.refresh_rows();
            }
            _ => {}
        }
    }

    fn handle_ready_key(&mut self, key: KeyEvent) -> Option<Command> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => self.running = false,
            KeyCode::Char('w') if ctrl => self.show_chart = !self.show_chart,
            KeyCode::Char('l') if ctrl => {
                self.mode = Mode::SelectLanguages;
                self.select_index = 0;
            }
            KeyCode::Char('/') => self.enter_search(),
            KeyCode::Char('?') => self.full_help = !self.full_help,
            KeyCode::Tab => self.cycle_language(),
            KeyCode::Esc => self.clear_filters(),
            KeyCode::Enter => self.open_selected(),
            KeyCode::Backspace => self.go_up(),
            KeyCode::Char('e') => {
                if let Some(row) = self.selected_row().filter(|r| !r.is_dir) {
                    return Some(Command::OpenEditor(PathBuf::from(&row.path)));
                }
            }
            KeyCode::Char('j') | KeyCode::Down => self.move_cursor_by(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_cursor_by(-1),
            KeyCode::PageDown => self.move_cursor_by(self.page() as isize),
            KeyCode::PageUp => self.move_cursor_by(-(self.page() as isize)),
            KeyCode::Char('d') if ctrl => self.move_cursor_by(self.page() as isize),
            KeyCode::Char('u') if ctrl => self.move_cursor_by(-(self.page() as isize)),
            KeyCode::Char('g') | KeyCode::Home => self.move_cursor_to(0),
            KeyCode::Char('G') | KeyCode::End => self.move_cursor_to(usize::MAX),
            _ => {}
        }
        None
    }

    /// Run `update` with panics contained: a fault becomes an inline error
    /// and the session continues.
    pub fn dispatch(&mut self, event: AppEvent) -> Option<Command> {
        match panic::catch_unwind(AssertUnwindSafe(|| self.update(event))) {
            Ok(command) => command,
            Err(_) => {
                let message = match error::take_fault() {
                    Some(fault) => format!("{}\n\n{}", fault.message, fault.trace),
                    None => "unexpected internal error".to_string(),
                };
                self.mode = Mode::Ready;
                self.preview = None;
                self.error = Some(message);
                None
            }
        }
    }

    // ------------------------------------------------------------------
    // Control loop
    // ------------------------------------------------------------------

    /// Run the main TUI event loop.
    pub fn run(&mut self) -> Result<()> {
        // 1. Set up the terminal.
        enable_raw_mode()?;
        let mut out = stdout();
        execute!(out, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(out);
        let mut terminal = Terminal::new(backend)?;

        // 2. Main loop.
        let result = self.event_loop(&mut terminal);

        // 3. Cleanup: restore the terminal even when the loop failed.
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let size = terminal.size()?;
        self.update(AppEvent::Resize(size.width, size.height));

        while self.running {
            terminal.draw(|frame| renderer::render_ui(frame, self))?;

            if !event::poll(Duration::from_millis(250))? {
                continue;
            }
            let app_event = match event::read()? {
                Event::Key(key) => AppEvent::Key(key),
                Event::Resize(width, height) => AppEvent::Resize(width, height),
                _ => continue,
            };

            if let Some(Command::OpenEditor(path)) = self.dispatch(app_event) {
                let result = edit_file(terminal, &self.editor, &path);
                self.dispatch(AppEvent::EditorFinished(result));
            }
        }
        Ok(())
    }
}

/// Best-effort terminal restore after a fault escaped the control loop.
pub fn reset_terminal() {
    let _ = disable_raw_mode();
    let _ = execute!(stdout(), LeaveAlternateScreen);
}

/// Hand the terminal to the editor, wait for it, then take the terminal back.
fn edit_file(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    editor: &str,
    path: &Path,
) -> std::result::Result<(), String> {
    let mut parts = editor.split_whitespace();
    let Some(program) = parts.next() else {
        return Err("no editor configured".to_string());
    };

    tracing::info!(editor, path = %path.display(), "opening editor");

    let suspend =
        disable_raw_mode().and_then(|_| execute!(terminal.backend_mut(), LeaveAlternateScreen));
    if let Err(e) = suspend {
        return Err(format!("failed to release terminal: {}", e));
    }

    let status = Process::new(program).args(parts).arg(path).status();

    let resume = enable_raw_mode()
        .and_then(|_| execute!(terminal.backend_mut(), EnterAlternateScreen))
        .and_then(|_| terminal.clear());
    if let Err(e) = resume {
        return Err(format!("failed to restore terminal: {}", e));
    }

    match status {
        Ok(s) if s.success() => Ok(()),
        Ok(s) => Err(format!("editor '{}' exited with {}", editor, s)),
        Err(e) => Err(format!("failed to launch editor '{}': {}", program, e)),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
