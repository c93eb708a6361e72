use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use learning_grid_core::{
    GridPosition, ResourceId,
    autopilot::{Autopilot, AutopilotStep},
    catalog::{default_catalog, parse_catalog},
    config::EngineConfig,
    planner::StepPolicy,
    scoring::ScoringPolicy,
    session::Session,
};
use ratatui::{
    crossterm::{
        self,
        event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    },
    prelude::*,
};
use std::{
    fs::File,
    io::{self, Stdout},
    path::PathBuf,
    sync::Mutex,
    time::{Duration, Instant},
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod ui;

#[derive(Parser, Debug)]
#[command(version, about = "Walk a learner across a grid of study resources", long_about = None)]
struct Args {
    /// Resource catalog to load (built-in catalog if omitted)
    #[arg(short, long, value_name = "CATALOG_FILE")]
    catalog: Option<PathBuf>,

    /// TOML engine configuration
    #[arg(long, value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Override the target scoring policy
    #[arg(long, value_enum)]
    scoring: Option<ScoringArg>,

    /// Override the path stepping policy
    #[arg(long, value_enum)]
    stepping: Option<SteppingArg>,

    /// Seed for route colours and confidences
    #[arg(long)]
    seed: Option<u64>,

    /// Write logs to this file (the terminal is taken by the UI)
    #[arg(long, value_name = "LOG_FILE")]
    log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ScoringArg {
    Ratio,
    LinearPenalty,
}

impl From<ScoringArg> for ScoringPolicy {
    fn from(arg: ScoringArg) -> Self {
        match arg {
            ScoringArg::Ratio => ScoringPolicy::Ratio,
            ScoringArg::LinearPenalty => ScoringPolicy::LinearPenalty,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SteppingArg {
    DominantAxis,
    FixedPriority,
}

impl From<SteppingArg> for StepPolicy {
    fn from(arg: SteppingArg) -> Self {
        match arg {
            SteppingArg::DominantAxis => StepPolicy::DominantAxis,
            SteppingArg::FixedPriority => StepPolicy::FixedPriority,
        }
    }
}

/// Text being typed for a reflection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Summary(String),
    Reflection { summary: String, text: String },
}

pub struct App {
    /// The engine session.
    pub session: Session,
    pub autopilot: Autopilot,
    /// Whether the autopilot walks the agent on each tick.
    pub simulation_running: bool,
    /// Cell under the cursor.
    pub cursor: GridPosition,
    pub input: InputMode,
    /// Last message shown in the status line.
    pub status: String,
    should_quit: bool,
}

impl App {
    fn new(session: Session) -> Self {
        let cursor = session.agent().position();
        App {
            session,
            autopilot: Autopilot::new(),
            simulation_running: false,
            cursor,
            input: InputMode::Normal,
            status: "Ready".to_string(),
            should_quit: false,
        }
    }

    /// Handles one step of the simulation.
    fn tick(&mut self) {
        if !self.simulation_running {
            return;
        }
        match self.autopilot.tick(&mut self.session) {
            Ok(AutopilotStep::Visited { id, .. }) => {
                self.status = format!("Autopilot visited {}", self.title_of(&id));
            }
            Ok(AutopilotStep::Moved(_)) => {}
            Ok(AutopilotStep::Exhausted) => {
                self.simulation_running = false;
                self.status = "Every resource has been visited".to_string();
            }
            Err(e) => {
                error!("autopilot failed: {e}");
                self.simulation_running = false;
                self.status = format!("Autopilot stopped: {e}");
            }
        }
    }

    /// Applies a finished summary, if any.
    fn poll_summary(&mut self) {
        match self.session.poll_summary() {
            Some(Ok(())) => self.status = "Summary updated".to_string(),
            Some(Err(e)) => {
                warn!("summary failed: {e}");
                self.status = format!("Summary failed: {e}");
            }
            None => {}
        }
    }

    fn title_of(&self, id: &ResourceId) -> String {
        self.session
            .catalog()
            .get(id)
            .map_or_else(|| id.to_string(), |r| r.title.clone())
    }

    fn handle_key(&mut self, code: KeyCode) {
        match std::mem::replace(&mut self.input, InputMode::Normal) {
            InputMode::Normal => self.handle_command(code),
            InputMode::Summary(mut summary) => match code {
                KeyCode::Esc => self.status = "Reflection discarded".to_string(),
                KeyCode::Enter => {
                    self.input = InputMode::Reflection {
                        summary,
                        text: String::new(),
                    }
                }
                KeyCode::Backspace => {
                    summary.pop();
                    self.input = InputMode::Summary(summary);
                }
                KeyCode::Char(c) => {
                    summary.push(c);
                    self.input = InputMode::Summary(summary);
                }
                _ => self.input = InputMode::Summary(summary),
            },
            InputMode::Reflection { summary, mut text } => match code {
                KeyCode::Esc => self.status = "Reflection discarded".to_string(),
                KeyCode::Enter => match self.session.submit_reflection(&summary, &text) {
                    Ok(_) => self.status = "Analysing reflection...".to_string(),
                    Err(e) => self.status = e.to_string(),
                },
                KeyCode::Backspace => {
                    text.pop();
                    self.input = InputMode::Reflection { summary, text };
                }
                KeyCode::Char(c) => {
                    text.push(c);
                    self.input = InputMode::Reflection { summary, text };
                }
                _ => self.input = InputMode::Reflection { summary, text },
            },
        }
    }

    fn handle_command(&mut self, code: KeyCode) {
        let bounds = self.session.config().bounds();
        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.quit(),
            KeyCode::Left => self.cursor = bounds.offset(self.cursor, -1, 0),
            KeyCode::Right => self.cursor = bounds.offset(self.cursor, 1, 0),
            KeyCode::Up => self.cursor = bounds.offset(self.cursor, 0, -1),
            KeyCode::Down => self.cursor = bounds.offset(self.cursor, 0, 1),
            KeyCode::Enter => self.click_cell(),
            KeyCode::Char('s') => self.toggle_simulation(),
            KeyCode::Char('r') => {
                self.session.request_summary();
                self.status = "Generating summary...".to_string();
            }
            KeyCode::Char('p') => self.cycle_route(),
            KeyCode::Char('n') => self.input = InputMode::Summary(String::new()),
            _ => {}
        }
    }

    fn click_cell(&mut self) {
        let clicked = self.session.resource_at(self.cursor).map(|r| r.id.clone());
        let result = match clicked {
            Some(id) => self.session.click_resource(&id).map(|first| {
                if first {
                    format!("Studied {}", self.title_of(&id))
                } else {
                    format!("{} was already studied", self.title_of(&id))
                }
            }),
            None => self
                .session
                .move_agent(self.cursor)
                .map(|()| format!("Moved to {}", self.cursor)),
        };
        self.status = result.unwrap_or_else(|e| e.to_string());
    }

    fn toggle_simulation(&mut self) {
        if self.simulation_running {
            self.simulation_running = false;
            self.autopilot.clear();
            self.status = "Simulation paused".to_string();
            return;
        }
        match self.autopilot.engage(&mut self.session) {
            Ok(()) => {
                info!(steps = self.autopilot.remaining(), "simulation started");
                self.simulation_running = true;
                self.status = "Simulation running".to_string();
            }
            Err(e) => self.status = format!("Cannot start simulation: {e}"),
        }
    }

    /// Shows the route after the currently active one.
    fn cycle_route(&mut self) {
        let ids: Vec<String> = self.session.routes().iter().map(|p| p.id.clone()).collect();
        if ids.is_empty() {
            self.status = "No routes yet".to_string();
            return;
        }
        let next = self
            .session
            .routes()
            .iter()
            .position(|p| p.is_active)
            .map_or(0, |i| (i + 1) % ids.len());
        match self.session.show_route(&ids[next]) {
            Ok(()) => self.status = format!("Showing {}", ids[next]),
            Err(e) => self.status = e.to_string(),
        }
    }

    /// Sets the quit flag.
    fn quit(&mut self) {
        self.should_quit = true;
    }
}

fn init_logging(log_file: Option<&PathBuf>) -> Result<()> {
    let Some(path) = log_file else {
        return Ok(());
    };
    let file = File::create(path)
        .with_context(|| format!("Failed to create log file {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn load_config(args: &Args) -> Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(scoring) = args.scoring {
        config.scoring = scoring.into();
    }
    if let Some(stepping) = args.stepping {
        config.stepping = stepping.into();
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    Ok(config)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();
    init_logging(args.log_file.as_ref())?;

    let config = load_config(&args)?;
    let resources = match &args.catalog {
        Some(path) => {
            if !path.exists() {
                return Err(anyhow::anyhow!(
                    "Catalog file does not exist: {}",
                    path.display()
                ));
            }
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read catalog {}", path.display()))?;
            parse_catalog(&text)?
        }
        None => default_catalog(),
    };
    let session = Session::new(config, resources)?;

    // Set up the terminal
    let mut terminal = setup_terminal()?;

    let mut app = App::new(session);
    let outcome = run_app(&mut terminal, &mut app).await;

    // Restore the terminal even if the loop failed
    restore_terminal(&mut terminal)?;

    outcome
}

/// Configures the terminal for TUI interaction.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    let mut stdout = io::stdout();
    enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(Into::into)
}

/// Restores the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

/// Runs the main loop of the TUI application.
///
/// Input is polled without blocking and the loop yields to the runtime
/// between frames, so background summary requests keep making progress.
async fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    let tick_rate = Duration::from_millis(250);
    let frame_rate = Duration::from_millis(30);
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        while crossterm::event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key.code);
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            app.tick();
            last_tick = Instant::now();
        }
        app.poll_summary();

        if app.should_quit {
            break;
        }
        tokio::time::sleep(frame_rate).await;
    }
    Ok(())
}
