//! Preset management screens: list, create, edit.

use crossterm::event::KeyCode;
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

use pedalera_config::{PresetManager, PresetStatus};

/// Where a key press moved the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Stay,
    Main,
    List,
    Create,
    Edit(String),
}

fn highlight_style() -> Style {
    Style::default()
        .bg(Color::DarkGray)
        .add_modifier(Modifier::BOLD)
}

// ---------------------------------------------------------------------------
// Preset list
// ---------------------------------------------------------------------------

pub struct PresetListScreen {
    statuses: Vec<PresetStatus>,
    active: String,
    cursor: usize,
    list_state: ListState,
}

impl PresetListScreen {
    pub fn new(presets: &PresetManager) -> Self {
        let mut list_state = ListState::default();
        list_state.select(Some(0));
        Self {
            statuses: presets.get_all_presets_status(),
            active: presets.get_active_preset_name(),
            cursor: 0,
            list_state,
        }
    }

    pub fn handle_key(&mut self, key: KeyCode, presets: &PresetManager) -> Transition {
        match key {
            KeyCode::Up | KeyCode::Char('k') => {
                self.cursor = self.cursor.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.cursor + 1 < self.statuses.len() {
                    self.cursor += 1;
                }
            }
            KeyCode::Enter => {
                if let Some(selected) = self.statuses.get(self.cursor) {
                    if let Err(error) = presets.set_active_preset(&selected.name) {
                        tracing::warn!(%error, "failed to activate preset");
                    }
                    return Transition::Main;
                }
            }
            KeyCode::Char('n') => return Transition::Create,
            KeyCode::Char('e') => {
                if let Some(selected) = self.statuses.get(self.cursor) {
                    return Transition::Edit(selected.name.clone());
                }
            }
            KeyCode::Char('x') => {
                let name = self.statuses.get(self.cursor).map(|s| s.name.clone());
                if let Some(name) = name {
                    if let Err(error) = presets.delete_preset(&name) {
                        tracing::warn!(%error, "failed to delete preset");
                    }
                    self.statuses = presets.get_all_presets_status();
                    self.active = presets.get_active_preset_name();
                    if self.cursor >= self.statuses.len() && self.cursor > 0 {
                        self.cursor -= 1;
                    }
                }
            }
            KeyCode::Esc => return Transition::Main,
            _ => {}
        }
        self.list_state.select(Some(self.cursor));
        Transition::Stay
    }

    pub fn render(&mut self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(5), Constraint::Length(6)])
            .split(area);

        let items: Vec<ListItem> = if self.statuses.is_empty() {
            vec![ListItem::new("No presets found. Press [n] to create one.")]
        } else {
            self.statuses
                .iter()
                .map(|status| {
                    let active = if status.name == self.active { " *" } else { "" };
                    let missing = if status.missing_count > 0 {
                        format!(" ({} missing)", status.missing_count)
                    } else {
                        String::new()
                    };
                    let text = format!(
                        "{}{} [{} effects]{}",
                        status.name,
                        active,
                        status.effect_chain.len(),
                        missing
                    );
                    let style = if status.missing_count > 0 {
                        Style::default().fg(Color::Yellow)
                    } else {
                        Style::default()
                    };
                    ListItem::new(text).style(style)
                })
                .collect()
        };

        let list = List::new(items)
            .block(Block::default().title(" Presets ").borders(Borders::ALL))
            .highlight_style(highlight_style())
            .highlight_symbol("> ");
        frame.render_stateful_widget(list, chunks[0], &mut self.list_state);

        let mut detail = String::new();
        if let Some(selected) = self.statuses.get(self.cursor)
            && selected.missing_count > 0
        {
            detail.push_str(&format!("Missing effects in '{}':\n", selected.name));
            for name in &selected.missing_effects {
                detail.push_str(&format!("  - {name}\n"));
            }
        }
        detail.push_str("\n[enter] Select  [n] New  [e] Edit  [x] Delete  [esc] Back");

        let help = Paragraph::new(detail)
            .block(Block::default().borders(Borders::ALL))
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(help, chunks[1]);
    }
}

// ---------------------------------------------------------------------------
// Preset create
// ---------------------------------------------------------------------------

pub struct PresetCreateScreen {
    name: String,
    available: Vec<String>,
    selected: Vec<bool>,
    cursor: usize,
    focus_on_name: bool,
    list_state: ListState,
}

impl PresetCreateScreen {
    pub fn new(presets: &PresetManager) -> Self {
        let available = presets.get_available_effects();
        let selected = vec![false; available.len()];
        let mut list_state = ListState::default();
        list_state.select(Some(0));
        Self {
            name: String::new(),
            available,
            selected,
            cursor: 0,
            focus_on_name: true,
            list_state,
        }
    }

    pub fn handle_key(&mut self, key: KeyCode, presets: &PresetManager) -> Transition {
        if self.focus_on_name {
            match key {
                KeyCode::Enter | KeyCode::Tab => {
                    if !self.name.is_empty() {
                        self.focus_on_name = false;
                    }
                }
                KeyCode::Backspace => {
                    self.name.pop();
                }
                KeyCode::Esc => return Transition::List,
                KeyCode::Char(c) => self.name.push(c),
                _ => {}
            }
            return Transition::Stay;
        }

        match key {
            KeyCode::Up | KeyCode::Char('k') => {
                self.cursor = self.cursor.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.cursor + 1 < self.available.len() {
                    self.cursor += 1;
                }
            }
            KeyCode::Char(' ') | KeyCode::Enter => {
                if let Some(flag) = self.selected.get_mut(self.cursor) {
                    *flag = !*flag;
                }
            }
            KeyCode::Tab => self.focus_on_name = true,
            KeyCode::Char('s') => {
                if !self.name.is_empty() {
                    let chain: Vec<String> = self
                        .available
                        .iter()
                        .zip(&self.selected)
                        .filter(|(_, picked)| **picked)
                        .map(|(name, _)| name.clone())
                        .collect();

                    match presets.create_preset(&self.name, chain) {
                        Ok(()) => {
                            if let Err(error) = presets.set_active_preset(&self.name) {
                                tracing::warn!(%error, "failed to activate new preset");
                            }
                        }
                        Err(error) => tracing::warn!(%error, "failed to create preset"),
                    }
                }
                return Transition::List;
            }
            KeyCode::Esc => return Transition::List,
            _ => {}
        }
        self.list_state.select(Some(self.cursor));
        Transition::Stay
    }

    pub fn render(&mut self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(5),
                Constraint::Length(3),
            ])
            .split(area);

        let name_style = if self.focus_on_name {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };
        let caret = if self.focus_on_name { "_" } else { "" };
        let name = Paragraph::new(format!("{}{caret}", self.name)).block(
            Block::default()
                .title(" New Preset Name ")
                .borders(Borders::ALL)
                .border_style(name_style),
        );
        frame.render_widget(name, chunks[0]);

        let items: Vec<ListItem> = if self.available.is_empty() {
            vec![ListItem::new(
                "No effects available. Add .fx files to your effects directory.",
            )]
        } else {
            self.available
                .iter()
                .zip(&self.selected)
                .map(|(name, picked)| {
                    let check = if *picked { "[x]" } else { "[ ]" };
                    ListItem::new(format!("{check} {name}"))
                })
                .collect()
        };

        let list_style = if self.focus_on_name {
            Style::default()
        } else {
            Style::default().fg(Color::Yellow)
        };
        let list = List::new(items)
            .block(
                Block::default()
                    .title(" Select Effects ")
                    .borders(Borders::ALL)
                    .border_style(list_style),
            )
            .highlight_style(highlight_style())
            .highlight_symbol("> ");
        frame.render_stateful_widget(list, chunks[1], &mut self.list_state);

        let help = Paragraph::new("[tab] Switch focus  [space] Toggle  [s] Save  [esc] Cancel")
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(help, chunks[2]);
    }
}

// ---------------------------------------------------------------------------
// Preset edit
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EditMode {
    Chain,
    Add,
}

pub struct PresetEditScreen {
    preset_name: String,
    chain: Vec<String>,
    available: Vec<String>,
    cursor: usize,
    mode: EditMode,
    add_cursor: usize,
    chain_state: ListState,
    add_state: ListState,
}

impl PresetEditScreen {
    pub fn new(presets: &PresetManager, preset_name: String) -> Self {
        let chain = presets
            .get_preset(&preset_name)
            .map(|p| p.effect_chain)
            .unwrap_or_default();
        let mut chain_state = ListState::default();
        chain_state.select(Some(0));
        let mut add_state = ListState::default();
        add_state.select(Some(0));

        Self {
            preset_name,
            chain,
            available: presets.get_available_effects(),
            cursor: 0,
            mode: EditMode::Chain,
            add_cursor: 0,
            chain_state,
            add_state,
        }
    }

    pub fn handle_key(&mut self, key: KeyCode, presets: &PresetManager) -> Transition {
        match self.mode {
            EditMode::Chain => match key {
                KeyCode::Up | KeyCode::Char('k') => {
                    self.cursor = self.cursor.saturating_sub(1);
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    if self.cursor + 1 < self.chain.len() {
                        self.cursor += 1;
                    }
                }
                KeyCode::Char('K') => {
                    if self.cursor > 0 && !self.chain.is_empty() {
                        self.chain.swap(self.cursor, self.cursor - 1);
                        self.cursor -= 1;
                    }
                }
                KeyCode::Char('J') => {
                    if self.cursor + 1 < self.chain.len() {
                        self.chain.swap(self.cursor, self.cursor + 1);
                        self.cursor += 1;
                    }
                }
                KeyCode::Char('x') | KeyCode::Backspace => {
                    if self.cursor < self.chain.len() {
                        self.chain.remove(self.cursor);
                        if self.cursor >= self.chain.len() && self.cursor > 0 {
                            self.cursor -= 1;
                        }
                    }
                }
                KeyCode::Char('a') => {
                    self.mode = EditMode::Add;
                    self.add_cursor = 0;
                }
                KeyCode::Char('s') => {
                    if let Err(error) =
                        presets.update_preset_chain(&self.preset_name, self.chain.clone())
                    {
                        tracing::warn!(%error, "failed to save preset");
                    }
                    return Transition::List;
                }
                KeyCode::Esc => return Transition::List,
                _ => {}
            },
            EditMode::Add => match key {
                KeyCode::Up | KeyCode::Char('k') => {
                    self.add_cursor = self.add_cursor.saturating_sub(1);
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    if self.add_cursor + 1 < self.available.len() {
                        self.add_cursor += 1;
                    }
                }
                KeyCode::Enter | KeyCode::Char(' ') => {
                    if let Some(effect) = self.available.get(self.add_cursor) {
                        self.chain.push(effect.clone());
                        self.mode = EditMode::Chain;
                        self.cursor = self.chain.len() - 1;
                    }
                }
                KeyCode::Esc => self.mode = EditMode::Chain,
                _ => {}
            },
        }
        self.chain_state.select(Some(self.cursor));
        self.add_state.select(Some(self.add_cursor));
        Transition::Stay
    }

    pub fn render(&mut self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(5), Constraint::Length(3)])
            .split(area);

        match self.mode {
            EditMode::Chain => {
                let items: Vec<ListItem> = if self.chain.is_empty() {
                    vec![ListItem::new("(empty chain - press [a] to add effects)")]
                } else {
                    self.chain
                        .iter()
                        .enumerate()
                        .map(|(i, name)| ListItem::new(format!("{}. {name}", i + 1)))
                        .collect()
                };
                let title = format!(" Edit Preset: {} (IN -> OUT) ", self.preset_name);
                let list = List::new(items)
                    .block(Block::default().title(title).borders(Borders::ALL))
                    .highlight_style(highlight_style())
                    .highlight_symbol("> ");
                frame.render_stateful_widget(list, chunks[0], &mut self.chain_state);

                let help = Paragraph::new(
                    "[j/k] Navigate  [J/K] Reorder  [a] Add  [x] Delete  [s] Save  [esc] Cancel",
                )
                .style(Style::default().fg(Color::DarkGray))
                .block(Block::default().borders(Borders::ALL));
                frame.render_widget(help, chunks[1]);
            }
            EditMode::Add => {
                let items: Vec<ListItem> = if self.available.is_empty() {
                    vec![ListItem::new("(no effects available)")]
                } else {
                    self.available
                        .iter()
                        .map(|name| ListItem::new(name.as_str()))
                        .collect()
                };
                let list = List::new(items)
                    .block(
                        Block::default()
                            .title(" Select effect to add ")
                            .borders(Borders::ALL),
                    )
                    .highlight_style(highlight_style())
                    .highlight_symbol("> ");
                frame.render_stateful_widget(list, chunks[0], &mut self.add_state);

                let help = Paragraph::new("[enter] Add  [esc] Cancel")
                    .style(Style::default().fg(Color::DarkGray))
                    .block(Block::default().borders(Borders::ALL));
                frame.render_widget(help, chunks[1]);
            }
        }
    }
}
