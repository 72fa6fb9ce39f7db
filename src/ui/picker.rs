use crate::host::CANCELLED;
use crate::ui::theme::Theme;
use crate::util::truncate;
use anyhow::Result;
use crossterm::{
    cursor::Show,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use std::io;

const PAGE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerAction {
    Continue,
    Pick(usize),
    Cancel,
}

/// Single-choice list over the report lines.
pub struct Picker {
    title: String,
    items: Vec<String>,
    state: ListState,
}

impl Picker {
    pub fn new(title: impl Into<String>, items: Vec<String>) -> Self {
        let mut state = ListState::default();
        if !items.is_empty() {
            state.select(Some(0));
        }
        Self {
            title: title.into(),
            items,
            state,
        }
    }

    pub fn selected(&self) -> Option<usize> {
        self.state.selected()
    }

    fn move_by(&mut self, delta: isize) {
        if self.items.is_empty() {
            return;
        }
        let last = self.items.len() - 1;
        let current = self.state.selected().unwrap_or(0);
        let next = current.saturating_add_signed(delta).min(last);
        self.state.select(Some(next));
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> PickerAction {
        if key.kind != KeyEventKind::Press {
            return PickerAction::Continue;
        }
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                PickerAction::Cancel
            }
            KeyCode::Esc | KeyCode::Char('q') => PickerAction::Cancel,
            KeyCode::Enter => match self.selected() {
                Some(idx) => PickerAction::Pick(idx),
                None => PickerAction::Cancel,
            },
            KeyCode::Down | KeyCode::Char('j') => {
                self.move_by(1);
                PickerAction::Continue
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.move_by(-1);
                PickerAction::Continue
            }
            KeyCode::PageDown => {
                self.move_by(PAGE as isize);
                PickerAction::Continue
            }
            KeyCode::PageUp => {
                self.move_by(-(PAGE as isize));
                PickerAction::Continue
            }
            KeyCode::Home | KeyCode::Char('g') => {
                self.move_by(isize::MIN);
                PickerAction::Continue
            }
            KeyCode::End | KeyCode::Char('G') => {
                self.move_by(isize::MAX);
                PickerAction::Continue
            }
            _ => PickerAction::Continue,
        }
    }

    pub fn render(&mut self, frame: &mut Frame) {
        let area = frame.area();
        frame.render_widget(Block::default().style(Theme::bg()), area);

        let [list_area, hint_area] =
            Layout::vertical([Constraint::Min(3), Constraint::Length(1)]).areas(area);

        // borders + highlight symbol
        let width = usize::from(list_area.width).saturating_sub(4);
        let items: Vec<ListItem> = self
            .items
            .iter()
            .map(|item| ListItem::new(truncate(item, width)).style(Theme::text()))
            .collect();

        let list = List::new(items)
            .block(
                Block::default()
                    .title(format!(" {} ({}) ", self.title, self.items.len()))
                    .title_style(Theme::title())
                    .borders(Borders::ALL)
                    .border_style(Theme::border()),
            )
            .highlight_style(Theme::selected())
            .highlight_symbol("> ");
        frame.render_stateful_widget(list, list_area, &mut self.state);

        let hint = Paragraph::new(" ↑/↓ move · enter open · esc cancel").style(Theme::text_muted());
        frame.render_widget(hint, hint_area);
    }
}

/// Show `items` full-screen and block until the user picks or cancels.
/// Returns the picked index or [`CANCELLED`].
pub fn run_picker(title: &str, items: Vec<String>) -> Result<isize> {
    if items.is_empty() {
        return Ok(CANCELLED);
    }

    enable_raw_mode()?;
    let result = picker_session(title, items);

    // Restore terminal, also when setup failed halfway
    let restored = restore_terminal(&mut io::stdout());
    let picked = result?;
    restored?;
    Ok(picked)
}

fn picker_session(title: &str, items: Vec<String>) -> Result<isize> {
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let mut picker = Picker::new(title, items);
    picker_loop(&mut terminal, &mut picker)
}

fn restore_terminal<W: io::Write>(out: &mut W) -> io::Result<()> {
    let raw = disable_raw_mode();
    execute!(out, LeaveAlternateScreen, Show)?;
    raw
}

fn picker_loop<B: Backend>(terminal: &mut Terminal<B>, picker: &mut Picker) -> Result<isize> {
    loop {
        terminal.draw(|f| picker.render(f))?;

        if let Event::Key(key) = event::read()? {
            match picker.handle_key(key) {
                PickerAction::Continue => {}
                PickerAction::Pick(idx) => return Ok(isize::try_from(idx).unwrap_or(CANCELLED)),
                PickerAction::Cancel => return Ok(CANCELLED),
            }
        }
    }
}
