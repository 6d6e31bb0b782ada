//! The rig's terminal interface.
//!
//! One 20 ms event loop drives everything: key dispatch, the rhythm strip
//! refresh, and draining the quantized-onset queue into the onset lamp and
//! hit markers.

mod rhythm_viz;
mod screens;

use std::io::stdout;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::{
    ExecutableCommand,
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Paragraph},
};
use rtrb::Consumer;

use pedalera_config::PresetManager;
use pedalera_effects::Chain;
use pedalera_io::AudioEngine;
use pedalera_rhythm::QuantizedOnset;

use rhythm_viz::RhythmViz;
use screens::{PresetCreateScreen, PresetEditScreen, PresetListScreen, Transition};

const TICK_INTERVAL: Duration = Duration::from_millis(20);
const LAMP_DECAY: Duration = Duration::from_millis(100);

enum Screen {
    Main,
    PresetList(PresetListScreen),
    PresetCreate(PresetCreateScreen),
    PresetEdit(PresetEditScreen),
}

struct App {
    chain: Arc<Chain>,
    engine: Arc<AudioEngine>,
    presets: Arc<PresetManager>,
    quantized: Consumer<QuantizedOnset>,
    screen: Screen,
    viz: RhythmViz,
    lamp_until: Option<Instant>,
    last_onset_energy: f32,
    should_quit: bool,
}

impl App {
    fn new(
        chain: Arc<Chain>,
        engine: Arc<AudioEngine>,
        presets: Arc<PresetManager>,
        quantized: Consumer<QuantizedOnset>,
    ) -> Self {
        let rhythm = engine.rhythm();
        let viz = RhythmViz::new(rhythm.bpm(), rhythm.subdivision());

        Self {
            chain,
            engine,
            presets,
            quantized,
            screen: Screen::Main,
            viz,
            lamp_until: None,
            last_onset_energy: 0.0,
            should_quit: false,
        }
    }

    /// Periodic update: rhythm strip, onset lamp, quantized-onset drain.
    fn tick(&mut self) {
        while let Ok(onset) = self.quantized.pop() {
            self.lamp_until = Some(Instant::now() + LAMP_DECAY);
            self.last_onset_energy = onset.original_event.energy;
            let beat = self.viz.beat_in_display();
            self.viz.add_hit_marker(beat, onset.slot_index.max(0) as usize);
        }

        if let Some(until) = self.lamp_until
            && Instant::now() >= until
        {
            self.lamp_until = None;
        }

        let rhythm = self.engine.rhythm();
        self.viz.update(
            rhythm.bpm(),
            rhythm.subdivision(),
            rhythm.beat_phase(),
            rhythm.beat_count(),
        );
    }

    fn handle_key(&mut self, key: KeyCode, modifiers: KeyModifiers) {
        if modifiers.contains(KeyModifiers::CONTROL) && key == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }

        if matches!(self.screen, Screen::Main) {
            self.handle_main_key(key);
            return;
        }

        let transition = match &mut self.screen {
            Screen::Main => Transition::Stay,
            Screen::PresetList(screen) => screen.handle_key(key, &self.presets),
            Screen::PresetCreate(screen) => screen.handle_key(key, &self.presets),
            Screen::PresetEdit(screen) => screen.handle_key(key, &self.presets),
        };

        match transition {
            Transition::Stay => {}
            Transition::Main => self.screen = Screen::Main,
            Transition::List => {
                self.screen = Screen::PresetList(PresetListScreen::new(&self.presets));
            }
            Transition::Create => {
                self.screen = Screen::PresetCreate(PresetCreateScreen::new(&self.presets));
            }
            Transition::Edit(name) => {
                self.screen =
                    Screen::PresetEdit(PresetEditScreen::new(&self.presets, name));
            }
        }
    }

    fn handle_main_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('d') => {
                if self.toggle_effects() {
                    self.screen =
                        Screen::PresetCreate(PresetCreateScreen::new(&self.presets));
                }
            }
            KeyCode::Char('r') => match self.chain.reload() {
                Ok(()) => tracing::info!(
                    has_effects = self.chain.has_active_effects(),
                    "effects reloaded"
                ),
                Err(error) => tracing::error!(%error, "failed to reload effects"),
            },
            KeyCode::Char('p') => {
                self.screen = Screen::PresetList(PresetListScreen::new(&self.presets));
            }
            KeyCode::Char('i') => {
                self.engine.next_input_device();
            }
            KeyCode::Char('o') => {
                self.engine.next_output_device();
            }
            KeyCode::Char('t') => {
                self.engine.rhythm().register_tap(Instant::now());
                self.viz.bpm = self.engine.rhythm().bpm();
            }
            KeyCode::Char('.') | KeyCode::Char('>') => {
                self.engine.rhythm().adjust_bpm(1.0);
            }
            KeyCode::Char(',') | KeyCode::Char('<') => {
                self.engine.rhythm().adjust_bpm(-1.0);
            }
            KeyCode::Char(']') | KeyCode::Char('}') => {
                self.engine.rhythm().next_subdivision();
            }
            KeyCode::Char('[') | KeyCode::Char('{') => {
                self.engine.rhythm().prev_subdivision();
            }
            _ => {}
        }
    }

    /// Toggle the chain, creating a default preset when enabling a rig
    /// that has none. Returns true when the create screen should open.
    fn toggle_effects(&mut self) -> bool {
        let was_enabled = self.chain.is_enabled();

        if !was_enabled {
            if !self.presets.has_presets() {
                let created = match self.presets.ensure_active_preset() {
                    Ok(created) => created,
                    Err(error) => {
                        tracing::error!(%error, "failed to create default preset");
                        false
                    }
                };
                self.chain.toggle();
                tracing::info!("effects enabled, created default preset");
                return created;
            }

            if let Some(status) = self.presets.get_active_preset_status()
                && status.missing_count > 0
            {
                tracing::warn!(
                    missing = status.missing_count,
                    "active preset has missing effects"
                );
            }
        }

        let enabled = self.chain.toggle();
        tracing::info!(enabled, "effects toggled");
        false
    }

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        self.viz.set_width(area.width);

        match &mut self.screen {
            Screen::Main => draw_main(
                frame,
                &self.chain,
                &self.engine,
                &self.presets,
                &self.viz,
                self.lamp_until.is_some(),
                self.last_onset_energy,
            ),
            Screen::PresetList(screen) => screen.render(frame, area),
            Screen::PresetCreate(screen) => screen.render(frame, area),
            Screen::PresetEdit(screen) => screen.render(frame, area),
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn draw_main(
    frame: &mut Frame,
    chain: &Chain,
    engine: &AudioEngine,
    presets: &PresetManager,
    viz: &RhythmViz,
    lamp_on: bool,
    onset_energy: f32,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5),
            Constraint::Min(8),
            Constraint::Length(5),
            Constraint::Length(6),
        ])
        .split(frame.area());

    draw_rig_header(frame, chunks[0], chain.is_enabled(), lamp_on, onset_energy);
    draw_status(frame, chunks[1], chain, engine, presets);
    draw_rhythm(frame, chunks[2], viz);
    draw_help(frame, chunks[3]);
}

fn draw_rig_header(frame: &mut Frame, area: Rect, enabled: bool, lamp_on: bool, energy: f32) {
    let state = if enabled { "ON    " } else { "BYPASS" };
    let lamp = if lamp_on {
        format!("(*) {energy:.2}")
    } else {
        "( )     ".to_string()
    };
    let art = format!(
        ".--------------------------------.\n|  PEDALERA   [{state}]  {lamp}  |\n'--------------------------------'"
    );

    let style = if enabled {
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    frame.render_widget(Paragraph::new(art).style(style), area);
}

fn draw_status(
    frame: &mut Frame,
    area: Rect,
    chain: &Chain,
    engine: &AudioEngine,
    presets: &PresetManager,
) {
    let mut text = String::new();

    match presets.get_active_preset() {
        Some(preset) => {
            text.push_str(&format!("Preset: {}", preset.name));
            if let Some(status) = presets.get_active_preset_status()
                && status.missing_count > 0
            {
                text.push_str(&format!(" ({} effects missing!)", status.missing_count));
            }
            text.push('\n');
        }
        None => text.push_str("Preset: (none - press [p] to create)\n"),
    }

    let effects = chain.active_chain_info();
    if effects.is_empty() {
        text.push_str("Effects Chain: (empty - add effects in preset menu)\n");
    } else {
        let parts: Vec<String> = effects.iter().map(|e| format!("[{}]", e.name)).collect();
        text.push_str(&format!("Effects Chain:\n  IN -> {} -> OUT\n", parts.join(" -> ")));
    }

    text.push_str(&format!(
        "\nDevices:\n  IN:  {}\n  OUT: {}",
        engine.current_input_device(),
        engine.current_output_device()
    ));

    let status = Paragraph::new(text).block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, area);
}

fn draw_rhythm(frame: &mut Frame, area: Rect, viz: &RhythmViz) {
    let text = viz.lines().join("\n");
    frame.render_widget(
        Paragraph::new(text).style(Style::default().fg(Color::Cyan)),
        area,
    );
}

fn draw_help(frame: &mut Frame, area: Rect) {
    let help = "\
[d] Toggle Effects   [t] Tap Tempo
[r] Reload Effects   [,/.] BPM -/+
[p] Presets Menu     [[/]] Subdivision
[i/o] Input/Output   [q] Quit";
    frame.render_widget(
        Paragraph::new(help)
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().title(" Hotkeys ").borders(Borders::ALL)),
        area,
    );
}

/// Run the TUI until the user quits.
pub fn run(
    chain: Arc<Chain>,
    engine: Arc<AudioEngine>,
    presets: Arc<PresetManager>,
    quantized: Consumer<QuantizedOnset>,
) -> anyhow::Result<()> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout());
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(chain, engine, presets, quantized);
    let result = run_loop(&mut terminal, &mut app);

    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> anyhow::Result<()> {
    loop {
        terminal.draw(|frame| app.draw(frame))?;

        if event::poll(TICK_INTERVAL)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            app.handle_key(key.code, key.modifiers);
        }

        app.tick();

        if app.should_quit {
            return Ok(());
        }
    }
}
