use std::{
    io::{self, IsTerminal},
    path::{Path, PathBuf},
    thread,
    time::Instant,
};

use anyhow::{Context, Result};
use chrono::{DateTime, Local, TimeDelta};
use clap::{Parser, Subcommand};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colored::Colorize;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use log::{debug, warn};
use prettytable::{color, format, Attr, Cell, Row, Table};

use countdown::{
    alarm::{AlarmSound, Speaker},
    clock::SystemClock,
    config::{self, Config},
    countdown::{Countdown, Phase},
    hooks::Hook,
    params::LaunchParams,
    presenter::{AlarmOptions, TerminalPresenter},
    restart,
    scheduler::IntervalScheduler,
    session,
    store::FileStore,
    time::TimeDeltaExt,
    Snapshot,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
    /// Config file to use. [default: ${XDG_CONFIG_DIR}/countdown/config.toml]
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(flatten)]
    verbose: Verbosity<WarnLevel>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the countdown in this terminal
    ///
    /// While running, press `p` or space to pause or resume, `r` to restart
    /// the full duration, and `q`, Esc or Ctrl-C to quit.
    Run {
        /// Length of the countdown in minutes. The sign is ignored.
        #[arg(short, long, allow_hyphen_values = true)]
        minutes: Option<String>,
        /// Description of the task you're counting down for
        #[arg(short, long)]
        task: Option<String>,
        /// URL or query string carrying `minutes` and `task` parameters
        #[arg(short, long)]
        url: Option<String>,
        /// Don't ring the terminal bell when the countdown finishes
        #[arg(long, default_value_t = false)]
        no_bell: bool,
        /// Don't play the alarm sound when the countdown finishes
        #[arg(long, default_value_t = false)]
        no_sound: bool,
    },
    /// Show the persisted countdown
    Status {
        /// Print the status as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Restart the persisted countdown from now
    Reset,
    /// Delete all state and configuration files
    Purge,
}

/// Keys pressed while the countdown runs
#[derive(Debug, Eq, PartialEq)]
enum Input {
    TogglePause,
    Reset,
    Quit,
}

fn command_for(key: KeyEvent) -> Option<Input> {
    if key.kind != KeyEventKind::Press {
        return None;
    }

    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Input::Quit),
        KeyCode::Char('p') | KeyCode::Char(' ') => Some(Input::TogglePause),
        KeyCode::Char('r') => Some(Input::Reset),
        KeyCode::Char('q') | KeyCode::Esc => Some(Input::Quit),
        _ => None,
    }
}

type TerminalCountdown = Countdown<FileStore, SystemClock, IntervalScheduler, TerminalPresenter>;

/// Keeps the terminal in raw mode until dropped
struct RawMode;

impl RawMode {
    fn enable() -> Result<Self> {
        enable_raw_mode().with_context(|| "Unable to switch the terminal to raw mode")?;

        Ok(Self)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        if let Err(e) = disable_raw_mode() {
            warn!("Unable to restore the terminal: {}", e);
        }
    }
}

fn run_hook(presenter: &TerminalPresenter, hook: Hook) {
    if let Err(e) = presenter.run_hook(hook) {
        warn!("{:#}", e);
    }
}

/// Drive the countdown from single key presses
fn interactive(countdown: &mut TerminalCountdown) -> Result<()> {
    let _raw = RawMode::enable()?;

    loop {
        let key_ready = match countdown.scheduler().next_due() {
            Some(due) => event::poll(due.saturating_duration_since(Instant::now()))
                .with_context(|| "Unable to poll the terminal for input")?,
            None => true,
        };

        if key_ready {
            let event = event::read().with_context(|| "Unable to read terminal input")?;

            if let Event::Key(key) = event {
                match command_for(key) {
                    Some(Input::TogglePause) => {
                        let hook = match countdown.toggle_pause() {
                            Phase::Paused => Some(Hook::Paused),
                            Phase::Running => Some(Hook::Resumed),
                            Phase::Finished => None,
                        };

                        if let Some(hook) = hook {
                            run_hook(countdown.presenter(), hook);
                        }
                    }
                    Some(Input::Reset) => match countdown.reset() {
                        Ok(()) => run_hook(countdown.presenter(), Hook::Reset),
                        Err(e) => warn!("Unable to restart countdown: {:#}", e),
                    },
                    Some(Input::Quit) => break,
                    None => {}
                }
            }
        }

        if let Some(handle) = countdown.scheduler_mut().take_due(Instant::now()) {
            countdown.tick(handle);
        }
    }

    Ok(())
}

/// Tick until the countdown finishes, without reading input
fn unattended(countdown: &mut TerminalCountdown) {
    debug!("Input is not a terminal, running until finished");

    while let Some(due) = countdown.scheduler().next_due() {
        thread::sleep(due.saturating_duration_since(Instant::now()));

        if let Some(handle) = countdown.scheduler_mut().take_due(Instant::now()) {
            countdown.tick(handle);
        }
    }
}

fn run(config: &Config, params: LaunchParams, bell: bool, sound: bool) -> Result<()> {
    let clock = SystemClock;
    let mut store = FileStore::open(&config.state_file_path)?;
    debug!("Using state file {}", store.path().display());

    let session = session::resolve(&params, &mut store, &clock, &config.defaults())?;

    let alarm = AlarmOptions {
        bell,
        speaker: sound.then(|| Speaker::new(AlarmSound::from_file(config.alarm_file.clone()))),
        hooks_directory: config.hooks_directory.clone(),
        alarm_url: config.alarm_url.clone(),
    };
    let presenter = TerminalPresenter::stdout(alarm, &session);

    let mut countdown = Countdown::mount(session, store, clock, IntervalScheduler::new(), presenter)?;

    let result = if io::stdin().is_terminal() {
        interactive(&mut countdown)
    } else {
        unattended(&mut countdown);
        Ok(())
    };

    countdown.presenter_mut().finish_line();
    countdown.unmount();

    result
}

fn format_timestamp(ts: i64) -> String {
    DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.with_timezone(&Local).format("%d %b %R").to_string())
        .unwrap_or_else(|| ts.to_string())
}

fn print_status(config: &Config, json: bool) -> Result<()> {
    let store = FileStore::open(&config.state_file_path)?;
    let snapshot = Snapshot::read(&store, &SystemClock);

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    if snapshot.minutes.is_none() {
        println!("No countdown yet");
        println!();
        println!("{}", "(use \"countdown run\" to start one)".dimmed());
        return Ok(());
    }

    let task = snapshot
        .task
        .clone()
        .unwrap_or_else(|| config.default_task.clone());
    let duration = snapshot
        .minutes
        .map(|m| TimeDelta::minutes(i64::from(m)).to_human())
        .unwrap_or_else(|| "-".to_string());
    let started = snapshot
        .started_at
        .map(format_timestamp)
        .unwrap_or_else(|| "-".to_string());
    let remaining = snapshot
        .remaining
        .map(countdown::time::clock)
        .unwrap_or_else(|| "-".to_string());
    let (status, status_color) = if snapshot.finished() {
        ("Finished", color::RED)
    } else if snapshot.remaining.is_some() {
        ("Running", color::MAGENTA)
    } else {
        ("Not started", color::WHITE)
    };

    let mut table = Table::new();

    table.add_row(Row::new(vec![
        Cell::new("Task").with_style(Attr::Bold),
        Cell::new(&task).with_style(Attr::ForegroundColor(color::YELLOW)),
    ]));
    table.add_row(Row::new(vec![
        Cell::new("Duration").with_style(Attr::Bold),
        Cell::new(&duration).with_style(Attr::ForegroundColor(color::CYAN)),
    ]));
    table.add_row(Row::new(vec![
        Cell::new("Started").with_style(Attr::Bold),
        Cell::new(&started).with_style(Attr::ForegroundColor(color::BLUE)),
    ]));
    table.add_row(Row::new(vec![
        Cell::new("Remaining").with_style(Attr::Bold),
        Cell::new(&remaining),
    ]));
    table.add_row(Row::new(vec![
        Cell::new("Status").with_style(Attr::Bold),
        Cell::new(status)
            .with_style(Attr::Bold)
            .with_style(Attr::ForegroundColor(status_color)),
    ]));

    table.set_format(*format::consts::FORMAT_CLEAN);
    table.printstd();

    println!();
    println!("{}", "(use \"countdown reset\" to restart this countdown)".dimmed());

    Ok(())
}

fn reset(config: &Config) -> Result<()> {
    let mut store = FileStore::open(&config.state_file_path)?;
    let started_at = restart(&mut store, &SystemClock)?;

    println!("Countdown restarted at {}", format_timestamp(started_at).cyan());

    Ok(())
}

fn purge(config: &Config, config_path: &Path) -> Result<()> {
    if config.state_file_path.exists() {
        println!(
            "Removing state file at {}",
            config.state_file_path.display().to_string().cyan()
        );
        std::fs::remove_file(&config.state_file_path)?;
    }

    if config_path.exists() {
        println!(
            "Removing config file at {}",
            config_path.display().to_string().cyan()
        );
        std::fs::remove_file(config_path)?;
    }

    Ok(())
}

fn main() -> Result<()> {
    human_panic::setup_panic!();

    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(args.verbose.log_level_filter())
        .init();

    let config_path = match args.config {
        Some(conf_path) => conf_path,
        None => config::default_config_path()?,
    };

    let config = if matches!(args.command, Command::Purge) {
        Config::load(&config_path)?.unwrap_or_default()
    } else {
        Config::init(&config_path)?
    };

    match args.command {
        Command::Run {
            minutes,
            task,
            url,
            no_bell,
            no_sound,
        } => {
            let mut params = LaunchParams { minutes, task };
            if let Some(url) = url {
                params = params.or(LaunchParams::from_url(&url)?);
            }

            run(&config, params, config.bell && !no_bell, config.sound && !no_sound)?;
        }
        Command::Status { json } => print_status(&config, json)?,
        Command::Reset => reset(&config)?,
        Command::Purge => purge(&config, &config_path)?,
    }

    Ok(())
}
