mod ui;
mod widgets;

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use crate::config::Config;
use crate::db::Database;
use crate::error::{retry_once, Error, Result};
use crate::models::{Card, CardFilter, Stats, SubtopicSummary};
use crate::scoring;
use crate::session::SessionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Library,
    Study,
    Overview,
}

impl View {
    fn next(&self) -> Self {
        match self {
            View::Library => View::Study,
            View::Study => View::Overview,
            View::Overview => View::Library,
        }
    }

    fn prev(&self) -> Self {
        match self {
            View::Library => View::Overview,
            View::Study => View::Library,
            View::Overview => View::Study,
        }
    }
}

pub struct StatefulList<T> {
    pub items: Vec<T>,
    pub selected: Option<usize>,
}

impl<T> StatefulList<T> {
    fn with_items(items: Vec<T>) -> Self {
        let selected = if items.is_empty() { None } else { Some(0) };
        Self { items, selected }
    }

    fn next(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.selected {
            Some(i) if i + 1 < self.items.len() => i + 1,
            _ => 0,
        };
        self.selected = Some(i);
    }

    fn previous(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.selected {
            Some(0) | None => self.items.len() - 1,
            Some(i) => i - 1,
        };
        self.selected = Some(i);
    }

    fn first(&mut self) {
        if !self.items.is_empty() {
            self.selected = Some(0);
        }
    }

    fn last(&mut self) {
        if !self.items.is_empty() {
            self.selected = Some(self.items.len() - 1);
        }
    }

    fn selected_item(&self) -> Option<&T> {
        self.selected.and_then(|i| self.items.get(i))
    }
}

pub struct App {
    db: Database,
    pub view: View,
    pub session: SessionState,
    pub library: StatefulList<SubtopicSummary>,
    pub overview: StatefulList<Card>,
    /// Card on screen in the Study view; `None` when the filter matches nothing.
    pub current: Option<Card>,
    pub stats: Stats,
    pub status: Option<String>,
    pub should_quit: bool,
}

impl App {
    pub fn new(db: Database, config: &Config) -> Result<Self> {
        let session = SessionState::new(config.study.default_topic, config.study.default_filter);
        Self::with_session(db, session)
    }

    pub fn with_session(db: Database, session: SessionState) -> Result<Self> {
        let library = db.library()?;
        let stats = db.stats()?;

        let mut app = Self {
            db,
            view: View::Library,
            session,
            library: StatefulList::with_items(library),
            overview: StatefulList::with_items(Vec::new()),
            current: None,
            stats,
            status: None,
            should_quit: false,
        };

        // Start the cursor on the configured default topic when it has cards
        let topic = app.session.active_topic();
        if let Some(i) = app.library.items.iter().position(|s| s.topic == topic) {
            app.library.selected = Some(i);
        }
        Ok(app)
    }

    pub fn refresh_data(&mut self) -> Result<()> {
        let selected = self.library.selected;
        self.library = StatefulList::with_items(self.db.library()?);
        if let Some(i) = selected.filter(|i| *i < self.library.items.len()) {
            self.library.selected = Some(i);
        }
        self.stats = self.db.stats()?;
        self.refresh_overview()?;
        self.refresh_card()
    }

    fn refresh_overview(&mut self) -> Result<()> {
        let cards = match self.session.active_subtopic() {
            Some(subtopic) => self.db.query(&CardFilter::subtopic(
                self.session.active_topic(),
                subtopic.to_string(),
            ))?,
            None => Vec::new(),
        };
        let selected = self.overview.selected;
        self.overview = StatefulList::with_items(cards);
        if let Some(i) = selected.filter(|i| *i < self.overview.items.len()) {
            self.overview.selected = Some(i);
        }
        Ok(())
    }

    /// Re-reads the card under the cursor. An empty filter result is a normal
    /// state, not an error.
    fn refresh_card(&mut self) -> Result<()> {
        if self.session.active_subtopic().is_none() {
            self.current = None;
            return Ok(());
        }
        self.current = match self.session.current_card(&self.db) {
            Ok(card) => Some(card),
            Err(Error::EmptySelection) => None,
            Err(e) => return Err(e),
        };
        Ok(())
    }

    fn open_subtopic(&mut self) -> Result<()> {
        let Some(summary) = self.library.selected_item() else {
            return Ok(());
        };
        let (topic, subtopic) = (summary.topic, summary.subtopic.clone());
        self.session.select_subtopic(topic, &subtopic);
        self.overview.selected = None;
        self.refresh_overview()?;
        self.refresh_card()?;
        self.view = View::Study;
        Ok(())
    }

    fn answer(&mut self, correct: bool) -> Result<()> {
        let Some(card) = self.current.clone() else {
            return Ok(());
        };
        let (db, session) = (&self.db, &mut self.session);
        if correct {
            retry_once(|| scoring::mark_correct(db, session, &card))?;
        } else {
            retry_once(|| scoring::mark_incorrect(db, session, &card))?;
        }
        self.refresh_data()
    }

    fn toggle_bookmark(&mut self) -> Result<()> {
        let card = match self.view {
            View::Overview => self.overview.selected_item().cloned(),
            _ => self.current.clone(),
        };
        let Some(card) = card else {
            return Ok(());
        };
        let bookmarked = retry_once(|| scoring::toggle_bookmark(&self.db, &card))?;
        self.status = Some(if bookmarked {
            "Bookmarked".to_string()
        } else {
            "Bookmark removed".to_string()
        });
        self.refresh_data()
    }

    fn reset_subtopic(&mut self) -> Result<()> {
        let Some(subtopic) = self.session.active_subtopic().map(str::to_string) else {
            return Ok(());
        };
        let topic = self.session.active_topic();
        let reset = retry_once(|| self.db.reset_counters(topic, &subtopic))?;
        self.status = Some(format!("Reset stats for {} cards", reset));
        self.refresh_data()
    }

    fn handle_study_key(&mut self, key: KeyCode) -> Result<()> {
        match key {
            KeyCode::Char(' ') | KeyCode::Enter if self.current.is_some() => {
                scoring::reveal_answer(&mut self.session)
            }
            KeyCode::Char('y') => self.answer(true)?,
            KeyCode::Char('n') => self.answer(false)?,
            KeyCode::Char('s') => {
                // Nothing on screen means nothing to move past
                if let Some(card) = self.current.clone() {
                    scoring::skip(&mut self.session, &card);
                    self.refresh_card()?;
                }
            }
            KeyCode::Char('b') => self.toggle_bookmark()?,
            KeyCode::Char('f') => {
                let mode = self.session.filter_mode().next();
                self.session.set_filter_mode(mode);
                self.refresh_card()?;
            }
            KeyCode::Char('R') => self.reset_subtopic()?,
            _ => {}
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyCode, modifiers: KeyModifiers) -> Result<()> {
        self.status = None;

        match key {
            KeyCode::Char('q') => self.should_quit = true,

            KeyCode::Char('r') if modifiers.contains(KeyModifiers::CONTROL) => {
                self.refresh_data()?;
            }

            KeyCode::Esc | KeyCode::Char('h') | KeyCode::Left if self.view != View::Library => {
                self.view = self.view.prev();
            }

            KeyCode::Tab => self.view = self.view.next(),
            KeyCode::BackTab => self.view = self.view.prev(),

            _ => match self.view {
                View::Library => match key {
                    KeyCode::Char('j') | KeyCode::Down => self.library.next(),
                    KeyCode::Char('k') | KeyCode::Up => self.library.previous(),
                    KeyCode::Char('g') => self.library.first(),
                    KeyCode::Char('G') => self.library.last(),
                    KeyCode::Char('l') | KeyCode::Right | KeyCode::Enter => {
                        self.open_subtopic()?
                    }
                    _ => {}
                },
                View::Study => self.handle_study_key(key)?,
                View::Overview => match key {
                    KeyCode::Char('j') | KeyCode::Down => self.overview.next(),
                    KeyCode::Char('k') | KeyCode::Up => self.overview.previous(),
                    KeyCode::Char('g') => self.overview.first(),
                    KeyCode::Char('G') => self.overview.last(),
                    KeyCode::Char('b') => self.toggle_bookmark()?,
                    KeyCode::Char('R') => self.reset_subtopic()?,
                    _ => {}
                },
            },
        }
        Ok(())
    }
}

pub fn run(db: Database, config: &Config) -> std::result::Result<(), Box<dyn std::error::Error>> {
    // Build state before touching the terminal so store errors print normally
    let mut app = App::new(db, config)?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                // Store failures are shown in the status line; the session is
                // left as it was before the key press.
                if let Err(e) = app.handle_key(key.code, key.modifiers) {
                    log::warn!("action failed: {}", e);
                    app.status = Some(e.to_string());
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
