use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use gitfleet_core::Repository;
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    prelude::Stylize,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame, Terminal,
};
use std::collections::BTreeSet;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Filter,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerState {
    Picking,
    Confirmed,
    Cancelled,
}

/// Multi-select list of repositories for `gh-clone`.
///
/// Normal mode: `j`/`k` or arrows move, space toggles, `a` toggles every
/// visible entry, `/` starts filtering, enter confirms, `q`/esc cancels.
/// Filter mode: typed text narrows the list, enter or esc goes back.
pub struct RepoPicker {
    pub items: Vec<Repository>,
    pub query: String,
    pub mode: Mode,
    /// Position within the visible (filtered) list.
    pub cursor: usize,
    /// Indices into `items`.
    pub selected: BTreeSet<usize>,
    pub state: PickerState,
    scroll_offset: usize,
}

impl RepoPicker {
    pub fn new(items: Vec<Repository>) -> RepoPicker {
        RepoPicker {
            items,
            query: String::new(),
            mode: Mode::Normal,
            cursor: 0,
            selected: BTreeSet::new(),
            state: PickerState::Picking,
            scroll_offset: 0,
        }
    }

    /// Indices of items matching the query, case-insensitively.
    pub fn visible(&self) -> Vec<usize> {
        let query = self.query.to_lowercase();
        self.items
            .iter()
            .enumerate()
            .filter(|(_, repo)| query.is_empty() || repo.full_name().to_lowercase().contains(&query))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn move_down(&mut self) {
        if self.cursor + 1 < self.visible().len() {
            self.cursor += 1;
        }
    }

    pub fn move_up(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn toggle(&mut self) {
        if let Some(&index) = self.visible().get(self.cursor) {
            if !self.selected.remove(&index) {
                self.selected.insert(index);
            }
        }
    }

    pub fn toggle_all_visible(&mut self) {
        let visible = self.visible();
        if visible.iter().all(|i| self.selected.contains(i)) {
            for i in &visible {
                self.selected.remove(i);
            }
        } else {
            self.selected.extend(visible);
        }
    }

    fn set_query(&mut self, query: String) {
        self.query = query;
        self.cursor = self.cursor.min(self.visible().len().saturating_sub(1));
        self.scroll_offset = 0;
    }

    /// The picked repositories; with nothing toggled, the entry under the cursor.
    pub fn selection(&self) -> Vec<Repository> {
        if self.selected.is_empty() {
            return self
                .visible()
                .get(self.cursor)
                .map(|&i| vec![self.items[i].clone()])
                .unwrap_or_default();
        }
        self.selected.iter().map(|&i| self.items[i].clone()).collect()
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            info!("Ctrl+C pressed, cancelling");
            self.state = PickerState::Cancelled;
            return;
        }

        match self.mode {
            Mode::Filter => match key.code {
                KeyCode::Enter | KeyCode::Esc => self.mode = Mode::Normal,
                KeyCode::Backspace => {
                    let mut query = self.query.clone();
                    query.pop();
                    self.set_query(query);
                }
                KeyCode::Char(c) => {
                    let query = format!("{}{c}", self.query);
                    self.set_query(query);
                }
                KeyCode::Down => self.move_down(),
                KeyCode::Up => self.move_up(),
                _ => {}
            },
            Mode::Normal => match key.code {
                KeyCode::Char('j') | KeyCode::Down => self.move_down(),
                KeyCode::Char('k') | KeyCode::Up => self.move_up(),
                KeyCode::Char(' ') => self.toggle(),
                KeyCode::Char('a') => self.toggle_all_visible(),
                KeyCode::Char('/') => self.mode = Mode::Filter,
                KeyCode::Enter => self.state = PickerState::Confirmed,
                KeyCode::Char('q') | KeyCode::Esc => {
                    info!("Picker cancelled by user");
                    self.state = PickerState::Cancelled;
                }
                _ => {}
            },
        }
    }

    /// Drive the picker until the user confirms or cancels.
    ///
    /// Returns `None` on cancel.
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<Option<Vec<Repository>>> {
        loop {
            terminal.draw(|f| self.ui(f))?;

            if let Event::Key(key) = event::read()? {
                self.handle_key(key);
            }

            match self.state {
                PickerState::Picking => {}
                PickerState::Confirmed => return Ok(Some(self.selection())),
                PickerState::Cancelled => return Ok(None),
            }
        }
    }

    pub fn ui(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Filter
                Constraint::Min(1),    // List
                Constraint::Length(3), // Footer
            ])
            .split(f.area());

        let filter_style = match self.mode {
            Mode::Filter => Style::default().fg(Color::Yellow),
            Mode::Normal => Style::default().fg(Color::Cyan),
        };
        let filter = Paragraph::new(format!("/{}", self.query))
            .block(Block::default().borders(Borders::ALL).title("Filter"))
            .style(filter_style);
        f.render_widget(filter, chunks[0]);

        let visible = self.visible();
        let available_height = chunks[1].height.saturating_sub(2) as usize;
        if self.cursor < self.scroll_offset {
            self.scroll_offset = self.cursor;
        } else if available_height > 0 && self.cursor >= self.scroll_offset + available_height {
            self.scroll_offset = self.cursor + 1 - available_height;
        }

        let lines: Vec<Line> = if visible.is_empty() {
            vec![Line::from("No repositories match.")]
        } else {
            visible
                .iter()
                .enumerate()
                .skip(self.scroll_offset)
                .take(available_height.max(1))
                .map(|(pos, &index)| {
                    let mark = if self.selected.contains(&index) { "[x]" } else { "[ ]" };
                    let text = format!("{mark} {}", self.items[index].full_name());
                    if pos == self.cursor {
                        Line::from(Span::styled(
                            text,
                            Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD),
                        ))
                    } else {
                        Line::from(text)
                    }
                })
                .collect()
        };

        let title = format!("Repositories ({} selected / {} shown)", self.selected.len(), visible.len());
        let list = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title(title))
            .style(Style::default().fg(Color::White));
        f.render_widget(list, chunks[1]);

        let footer = Paragraph::new(Line::from(vec![
            "j,k".fg(Color::Yellow).add_modifier(Modifier::BOLD),
            " move, ".into(),
            "space".fg(Color::Yellow).add_modifier(Modifier::BOLD),
            " toggle, ".into(),
            "/".fg(Color::Yellow).add_modifier(Modifier::BOLD),
            " filter, ".into(),
            "enter".fg(Color::Yellow).add_modifier(Modifier::BOLD),
            " clone, ".into(),
            "q".fg(Color::Yellow).add_modifier(Modifier::BOLD),
            " cancel".into(),
        ]))
        .block(Block::default().borders(Borders::ALL))
        .style(Style::default().fg(Color::Gray));
        f.render_widget(footer, chunks[2]);
    }
}
