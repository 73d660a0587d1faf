use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{
        self, Clear, ClearType, DisableLineWrap, EnableLineWrap, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Local};
use tracing::{info, warn};

use crate::config::Config;
use crate::files::{FileEvent, FileService};
use crate::highlight::{Highlighter, TokenKind};
use crate::session::Session;

// What a confirmed prompt does with the typed path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Open,
    Save,
}

impl PromptKind {
    fn label(self) -> &'static str {
        match self {
            PromptKind::Open => "Open",
            PromptKind::Save => "Save as",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Edit,
    Prompt(PromptKind),
}

/// Result of handling one key: keep running or leave the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

// Terminal front-end: owns the session and draws it
pub struct Editor {
    session: Session,
    config: Config,
    files: FileService,
    highlighter: Option<Highlighter>,

    terminal_height: u16,
    terminal_width: u16,
    dirty: bool, // Whether screen needs redrawing

    mode: Mode,
    prompt_buffer: String,
    message: Option<(String, DateTime<Local>)>,
    // Set after a Ctrl-Q with unsaved changes; a second Ctrl-Q quits
    quit_armed: bool,
}

impl Editor {
    pub fn new(config: Config, session: Session, files: FileService) -> io::Result<Self> {
        let (width, height) = terminal::size()?;
        Ok(Self::with_size(config, session, files, width, height))
    }

    /// Build an editor for a fixed screen size without touching the terminal.
    pub fn with_size(
        config: Config,
        session: Session,
        files: FileService,
        width: u16,
        height: u16,
    ) -> Self {
        let highlighter = Highlighter::from_config(&config.highlight);
        Editor {
            session,
            config,
            files,
            highlighter,
            terminal_height: height,
            terminal_width: width,
            dirty: true,
            mode: Mode::Edit,
            prompt_buffer: String::new(),
            message: None,
            quit_armed: false,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_ref().map(|(text, _)| text.as_str())
    }

    pub fn set_message(&mut self, text: impl Into<String>) {
        self.message = Some((text.into(), Local::now()));
        self.dirty = true;
    }

    pub fn run(&mut self) -> io::Result<()> {
        self.enter_raw_mode()?;
        // Leave raw mode even if the loop fails, so the shell stays usable
        let result = self.event_loop();
        self.leave_raw_mode()?;
        result
    }

    fn event_loop(&mut self) -> io::Result<()> {
        loop {
            self.render()?;

            // Finished open/save requests come back here
            while let Some(file_event) = self.files.try_next() {
                self.apply_file_event(file_event);
            }

            // Poll for events with 16ms timeout (roughly 60 FPS)
            if event::poll(Duration::from_millis(16))? {
                match event::read()? {
                    Event::Key(key_event) if key_event.kind == KeyEventKind::Press => {
                        if self.handle_key_event(key_event) == Flow::Quit {
                            break;
                        }
                    }
                    Event::Resize(width, height) => self.resize(width, height),
                    _ => {}
                }
            }
        }
        info!("editor closed");
        Ok(())
    }

    fn enter_raw_mode(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            io::stdout(),
            EnterAlternateScreen,
            DisableLineWrap,
            Hide,
            Clear(ClearType::All)
        )?;
        self.dirty = true;
        Ok(())
    }

    fn leave_raw_mode(&mut self) -> io::Result<()> {
        execute!(io::stdout(), Show, EnableLineWrap, LeaveAlternateScreen)?;
        terminal::disable_raw_mode()?;
        Ok(())
    }

    pub fn resize(&mut self, width: u16, height: u16) {
        if width != self.terminal_width || height != self.terminal_height {
            self.terminal_width = width;
            self.terminal_height = height;
            self.dirty = true;
        }
    }

    // Rows left for text once the two status lines are drawn
    fn text_rows(&self) -> usize {
        self.terminal_height.saturating_sub(2) as usize
    }

    pub fn handle_key_event(&mut self, key_event: KeyEvent) -> Flow {
        self.dirty = true;
        match self.mode {
            Mode::Edit => self.handle_edit_mode(key_event),
            Mode::Prompt(kind) => {
                self.handle_prompt_mode(kind, key_event);
                Flow::Continue
            }
        }
    }

    fn handle_edit_mode(&mut self, key_event: KeyEvent) -> Flow {
        let ctrl = key_event.modifiers.contains(KeyModifiers::CONTROL);
        let is_quit = ctrl && key_event.code == KeyCode::Char('q');
        if !is_quit {
            self.quit_armed = false;
        }

        if ctrl {
            match key_event.code {
                KeyCode::Char('q') => return self.request_quit(),
                KeyCode::Char('n') => {
                    self.session.new_document();
                    self.set_message("New document");
                }
                KeyCode::Char('o') => self.start_prompt(PromptKind::Open),
                KeyCode::Char('s') => self.start_prompt(PromptKind::Save),
                KeyCode::Char('z') => {
                    if !self.session.undo() {
                        self.set_message("Nothing to undo");
                    }
                }
                KeyCode::Char('y') => {
                    if !self.session.redo() {
                        self.set_message("Nothing to redo");
                    }
                }
                _ => {}
            }
            return Flow::Continue;
        }

        let page = self.text_rows();
        let doc = self.session.document_mut();
        match key_event.code {
            KeyCode::Left => doc.move_left(),
            KeyCode::Right => doc.move_right(),
            KeyCode::Up => doc.move_up(),
            KeyCode::Down => doc.move_down(),
            KeyCode::Home => doc.move_home(),
            KeyCode::End => doc.move_end(),
            KeyCode::PageUp => doc.page_up(page),
            KeyCode::PageDown => doc.page_down(page),
            KeyCode::Backspace => doc.backspace(),
            KeyCode::Delete => doc.delete(),
            KeyCode::Enter => doc.insert_newline(),
            KeyCode::Tab => doc.insert_tab(),
            KeyCode::Char(c) => {
                if !key_event.modifiers.contains(KeyModifiers::ALT) {
                    doc.insert_char(c);
                }
            }
            _ => {}
        }

        // Every committed change reaches the history before the next key
        self.session.dispatch_edits();
        Flow::Continue
    }

    fn request_quit(&mut self) -> Flow {
        if self.session.is_modified() && !self.quit_armed {
            self.quit_armed = true;
            self.set_message("Unsaved changes. Press Ctrl-Q again to quit");
            Flow::Continue
        } else {
            Flow::Quit
        }
    }

    fn start_prompt(&mut self, kind: PromptKind) {
        self.prompt_buffer = match kind {
            PromptKind::Open => String::new(),
            PromptKind::Save => match self.session.path() {
                Some(path) => path.to_string_lossy().to_string(),
                None => self.config.default_file_name.clone(),
            },
        };
        self.mode = Mode::Prompt(kind);
    }

    fn handle_prompt_mode(&mut self, kind: PromptKind, key_event: KeyEvent) {
        match key_event.code {
            KeyCode::Esc => {
                self.mode = Mode::Edit;
                self.prompt_buffer.clear();
                self.set_message(format!("{} cancelled", kind.label()));
            }
            KeyCode::Enter => {
                let input = std::mem::take(&mut self.prompt_buffer);
                self.mode = Mode::Edit;
                if input.trim().is_empty() {
                    self.set_message("No file name given");
                    return;
                }
                let path = match kind {
                    PromptKind::Open => self.config.resolve_path(&input),
                    PromptKind::Save => self.save_target(&input),
                };
                match kind {
                    PromptKind::Open => {
                        self.set_message(format!("Opening {}...", path.display()));
                        self.files.open(path);
                    }
                    PromptKind::Save => {
                        self.set_message(format!("Saving {}...", path.display()));
                        self.files.save(path, self.session.text());
                    }
                }
            }
            KeyCode::Backspace => {
                self.prompt_buffer.pop();
            }
            KeyCode::Char(c) => {
                if !key_event.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) {
                    self.prompt_buffer.push(c);
                }
            }
            _ => {}
        }
    }

    // Keeping the prefilled path writes back to the bound file as-is
    fn save_target(&self, input: &str) -> PathBuf {
        match self.session.path() {
            Some(path) if path.as_os_str() == input.trim() => path.to_path_buf(),
            _ => self.config.resolve_path(input),
        }
    }

    pub fn apply_file_event(&mut self, file_event: FileEvent) {
        match file_event {
            FileEvent::Opened { path, result } => match result {
                Ok(text) => {
                    let name = path.display().to_string();
                    self.session.load(path, text);
                    self.set_message(format!("Opened {name}"));
                }
                Err(e) => {
                    warn!(error = %e, "open failed");
                    self.set_message(format!("Open failed: {e}"));
                }
            },
            FileEvent::Saved { path, text, result } => match result {
                Ok(bytes) => {
                    let name = path.display().to_string();
                    self.session.mark_saved(path, text);
                    self.set_message(format!("Saved {name} ({bytes} bytes)"));
                }
                Err(e) => {
                    warn!(error = %e, "save failed");
                    self.set_message(format!("Save failed: {e}"));
                }
            },
        }
    }

    fn render(&mut self) -> io::Result<()> {
        if !self.dirty {
            return Ok(());
        }

        let visible_height = self.text_rows();
        let visible_width = self.terminal_width as usize;
        self.session
            .document_mut()
            .scroll_to_cursor(visible_width, visible_height);

        let mut stdout = io::stdout();
        execute!(stdout, Hide)?;

        let doc = self.session.document();
        let (offset_x, offset_y) = doc.offset();
        for y in 0..visible_height {
            execute!(stdout, MoveTo(0, y as u16), Clear(ClearType::CurrentLine))?;

            match doc.line(y + offset_y).zip(doc.cells(y + offset_y)) {
                Some((line, cells)) => {
                    let visible_end = (offset_x + visible_width).min(cells.len());
                    if offset_x < cells.len() {
                        self.draw_line(&mut stdout, line, &cells[offset_x..visible_end])?;
                    }
                }
                None => {
                    execute!(
                        stdout,
                        SetForegroundColor(Color::DarkGrey),
                        Print("~"),
                        ResetColor
                    )?;
                }
            }
        }

        self.render_status_bar(&mut stdout)?;

        let (screen_x, screen_y) = self.screen_cursor();
        execute!(stdout, MoveTo(screen_x, screen_y), Show)?;

        stdout.flush()?;
        self.dirty = false;
        Ok(())
    }

    // Terminal position of the cursor, kept on screen however long the
    // prompt or line gets
    fn screen_cursor(&self) -> (u16, u16) {
        let doc = self.session.document();
        let (offset_x, offset_y) = doc.offset();
        let (x, y) = match self.mode {
            Mode::Edit => (
                doc.cursor_column().saturating_sub(offset_x),
                doc.cursor().1.saturating_sub(offset_y),
            ),
            Mode::Prompt(kind) => (
                kind.label().len() + 2 + self.prompt_buffer.chars().count(),
                self.text_rows() + 1,
            ),
        };
        let max_x = self.terminal_width.saturating_sub(1) as usize;
        let max_y = self.terminal_height.saturating_sub(1) as usize;
        (x.min(max_x) as u16, y.min(max_y) as u16)
    }

    // Prints the given screen cells, colouring runs of the same token kind
    fn draw_line(
        &self,
        stdout: &mut io::Stdout,
        line: &[char],
        cells: &[(usize, char)],
    ) -> io::Result<()> {
        let Some(highlighter) = &self.highlighter else {
            let text: String = cells.iter().map(|&(_, c)| c).collect();
            return execute!(stdout, Print(text));
        };

        let full: String = line.iter().collect();
        let kinds = highlighter.classify(&full);
        let mut run_start = 0;
        while run_start < cells.len() {
            let kind = kinds[cells[run_start].0];
            let mut run_end = run_start + 1;
            while run_end < cells.len() && kinds[cells[run_end].0] == kind {
                run_end += 1;
            }
            let text: String = cells[run_start..run_end].iter().map(|&(_, c)| c).collect();
            print_token(stdout, kind, text)?;
            run_start = run_end;
        }
        Ok(())
    }

    fn status_line(&self) -> String {
        let name = match self.session.path() {
            Some(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string()),
            None => "[untitled]".to_string(),
        };
        let modified = if self.session.is_modified() { "*" } else { "" };
        let history = self.session.history();
        format!(
            " {}{} | {} | undo {} · redo {}",
            name,
            modified,
            self.session.stats(),
            history.undo_depth(),
            history.redo_depth()
        )
    }

    fn render_status_bar(&self, stdout: &mut io::Stdout) -> io::Result<()> {
        let y = self.terminal_height.saturating_sub(2);
        let width = self.terminal_width as usize;

        execute!(
            stdout,
            MoveTo(0, y),
            Clear(ClearType::CurrentLine),
            MoveTo(0, y + 1),
            Clear(ClearType::CurrentLine)
        )?;

        let status: String = self.status_line().chars().take(width).collect();
        execute!(
            stdout,
            MoveTo(0, y),
            SetForegroundColor(Color::Black),
            SetBackgroundColor(Color::Grey),
            Print(format!("{status:<width$}")),
            ResetColor
        )?;

        let bottom = match self.mode {
            Mode::Prompt(kind) => format!("{}: {}", kind.label(), self.prompt_buffer),
            Mode::Edit => match &self.message {
                Some((text, at)) => format!("[{}] {}", at.format("%H:%M:%S"), text),
                None => "^N new  ^O open  ^S save  ^Z undo  ^Y redo  ^Q quit".to_string(),
            },
        };
        let bottom: String = bottom.chars().take(width).collect();
        execute!(stdout, MoveTo(0, y + 1), Print(bottom))?;

        Ok(())
    }
}

fn print_token(stdout: &mut io::Stdout, kind: Option<TokenKind>, text: String) -> io::Result<()> {
    match kind {
        Some(kind) => execute!(
            stdout,
            SetForegroundColor(kind.color()),
            Print(text),
            ResetColor
        ),
        None => execute!(stdout, Print(text)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn editor(rt: &tokio::runtime::Runtime, dir: &std::path::Path) -> Editor {
        let session = Session::new(4, None);
        editor_with(rt, dir, session)
    }

    fn editor_with(rt: &tokio::runtime::Runtime, dir: &std::path::Path, session: Session) -> Editor {
        let config = Config {
            documents_dir: dir.to_string_lossy().to_string(),
            ..Config::default()
        };
        let files = FileService::new(rt.handle().clone());
        Editor::with_size(config, session, files, 80, 24)
    }

    fn type_str(editor: &mut Editor, s: &str) {
        for c in s.chars() {
            editor.handle_key_event(key(KeyCode::Char(c)));
        }
    }

    fn wait_for_file_event(rt: &tokio::runtime::Runtime, editor: &mut Editor) {
        let event = rt
            .block_on(editor.files.next())
            .expect("file service closed");
        editor.apply_file_event(event);
    }

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap()
    }

    #[test]
    fn ctrl_z_and_ctrl_y_walk_history() {
        let rt = runtime();
        let dir = tempfile::tempdir().unwrap();
        let mut ed = editor(&rt, dir.path());

        type_str(&mut ed, "abc");
        ed.handle_key_event(ctrl('z'));
        assert_eq!(ed.session().text(), "ab");
        ed.handle_key_event(ctrl('z'));
        assert_eq!(ed.session().text(), "a");
        ed.handle_key_event(ctrl('y'));
        assert_eq!(ed.session().text(), "ab");
    }

    #[test]
    fn ctrl_z_on_empty_history_reports() {
        let rt = runtime();
        let dir = tempfile::tempdir().unwrap();
        let mut ed = editor(&rt, dir.path());

        ed.handle_key_event(ctrl('z'));
        assert_eq!(ed.message(), Some("Nothing to undo"));
        assert_eq!(ed.session().text(), "");
    }

    #[test]
    fn ctrl_n_clears_and_is_undoable() {
        let rt = runtime();
        let dir = tempfile::tempdir().unwrap();
        let mut ed = editor(&rt, dir.path());

        type_str(&mut ed, "draft");
        ed.handle_key_event(ctrl('n'));
        assert_eq!(ed.session().text(), "");
        ed.handle_key_event(ctrl('z'));
        assert_eq!(ed.session().text(), "draft");
    }

    #[test]
    fn save_prompt_defaults_to_untitled_and_writes() {
        let rt = runtime();
        let dir = tempfile::tempdir().unwrap();
        let mut ed = editor(&rt, dir.path());

        type_str(&mut ed, "val x = 1");
        ed.handle_key_event(ctrl('s'));
        assert_eq!(ed.mode(), Mode::Prompt(PromptKind::Save));
        assert_eq!(ed.prompt_buffer, "untitled.txt");
        ed.handle_key_event(key(KeyCode::Enter));
        assert_eq!(ed.mode(), Mode::Edit);

        wait_for_file_event(&rt, &mut ed);
        let saved = std::fs::read_to_string(dir.path().join("untitled.txt")).unwrap();
        assert_eq!(saved, "val x = 1");
        assert!(!ed.session().is_modified());
        assert_eq!(ed.session().path(), Some(dir.path().join("untitled.txt").as_path()));
    }

    #[test]
    fn open_prompt_loads_file_into_history() {
        let rt = runtime();
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("main.kt"), "fun main() {}").unwrap();
        let mut ed = editor(&rt, dir.path());

        type_str(&mut ed, "old");
        ed.handle_key_event(ctrl('o'));
        type_str(&mut ed, "main.kt");
        ed.handle_key_event(key(KeyCode::Enter));
        wait_for_file_event(&rt, &mut ed);

        assert_eq!(ed.session().text(), "fun main() {}");
        ed.handle_key_event(ctrl('z'));
        assert_eq!(ed.session().text(), "old");
    }

    #[test]
    fn open_missing_file_keeps_document() {
        let rt = runtime();
        let dir = tempfile::tempdir().unwrap();
        let mut ed = editor(&rt, dir.path());

        type_str(&mut ed, "keep");
        ed.handle_key_event(ctrl('o'));
        type_str(&mut ed, "missing.txt");
        ed.handle_key_event(key(KeyCode::Enter));
        wait_for_file_event(&rt, &mut ed);

        assert_eq!(ed.session().text(), "keep");
        assert!(ed.message().unwrap().starts_with("Open failed"));
    }

    #[test]
    fn escape_cancels_prompt() {
        let rt = runtime();
        let dir = tempfile::tempdir().unwrap();
        let mut ed = editor(&rt, dir.path());

        ed.handle_key_event(ctrl('o'));
        type_str(&mut ed, "x");
        ed.handle_key_event(key(KeyCode::Esc));
        assert_eq!(ed.mode(), Mode::Edit);
        assert_eq!(ed.session().text(), "");
    }

    #[test]
    fn quit_with_unsaved_changes_needs_confirmation() {
        let rt = runtime();
        let dir = tempfile::tempdir().unwrap();
        let mut ed = editor(&rt, dir.path());

        assert_eq!(ed.handle_key_event(ctrl('q')), Flow::Quit);

        let mut ed = editor(&rt, dir.path());
        type_str(&mut ed, "x");
        assert_eq!(ed.handle_key_event(ctrl('q')), Flow::Continue);
        assert_eq!(ed.handle_key_event(ctrl('q')), Flow::Quit);
    }

    #[test]
    fn status_line_shows_counts_and_depths() {
        let rt = runtime();
        let dir = tempfile::tempdir().unwrap();
        let mut ed = editor(&rt, dir.path());

        type_str(&mut ed, "hi yo");
        ed.handle_key_event(ctrl('z'));
        let status = ed.status_line();
        assert!(status.contains("[untitled]*"));
        assert!(status.contains("Words: 2 | Characters: 4"));
        assert!(status.contains("undo 4 · redo 1"));
    }

    #[test]
    fn save_prompt_keeps_relative_session_path() {
        let rt = runtime();
        let dir = tempfile::tempdir().unwrap();
        let session = Session::with_text("orig", Some("notes.txt".into()), 4, None);
        let mut ed = editor_with(&rt, dir.path(), session);

        type_str(&mut ed, "!");
        ed.handle_key_event(ctrl('s'));
        assert_eq!(ed.prompt_buffer, "notes.txt");
        assert_eq!(ed.save_target(&ed.prompt_buffer), PathBuf::from("notes.txt"));
        assert_eq!(
            ed.save_target("other.txt"),
            dir.path().join("other.txt")
        );
    }

    #[test]
    fn save_writes_back_to_bound_file_outside_documents_dir() {
        let rt = runtime();
        let docs = tempfile::tempdir().unwrap();
        let elsewhere = tempfile::tempdir().unwrap();
        let bound = elsewhere.path().join("notes.txt");
        std::fs::write(&bound, "orig").unwrap();
        let session = Session::with_text("orig", Some(bound.clone()), 4, None);
        let mut ed = editor_with(&rt, docs.path(), session);

        type_str(&mut ed, "!");
        ed.handle_key_event(ctrl('s'));
        ed.handle_key_event(key(KeyCode::Enter));
        wait_for_file_event(&rt, &mut ed);

        assert_eq!(std::fs::read_to_string(&bound).unwrap(), "orig!");
        assert_eq!(ed.session().path(), Some(bound.as_path()));
        assert!(!docs.path().join("notes.txt").exists());
    }

    #[test]
    fn cursor_stays_on_screen_for_long_prompt() {
        let rt = runtime();
        let dir = tempfile::tempdir().unwrap();
        let mut ed = editor(&rt, dir.path());

        ed.handle_key_event(ctrl('o'));
        type_str(&mut ed, &"x".repeat(200));
        assert_eq!(ed.screen_cursor(), (79, 23));
    }

    #[test]
    fn cursor_column_accounts_for_tabs() {
        let rt = runtime();
        let dir = tempfile::tempdir().unwrap();
        let session = Session::with_text("\tab", None, 4, None);
        let mut ed = editor_with(&rt, dir.path(), session);

        ed.session.document_mut().scroll_to_cursor(80, 22);
        assert_eq!(ed.screen_cursor(), (6, 0));
    }
}
