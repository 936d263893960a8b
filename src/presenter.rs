//! Where the countdown shows itself
//!
//! A [`Presenter`] owns the three side channels of a running countdown: the
//! window title, the clock display and the alarm.

use std::{
    io::{self, Stdout, Write},
    path::PathBuf,
};

use anyhow::{Context, Result};
use colored::Colorize;
use crossterm::{
    cursor::MoveToColumn,
    execute, queue,
    style::Print,
    terminal::{Clear, ClearType, SetTitle},
};
use log::debug;

use crate::{
    alarm::Speaker,
    countdown::Phase,
    hooks::{Hook, HookContext, RunningHook},
    session::Session,
};

/// A snapshot of the countdown to draw
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Frame<'a> {
    pub task: &'a str,
    pub clock: String,
    pub phase: Phase,
}

pub trait Presenter {
    /// Replace the window title
    fn set_title(&mut self, title: &str);

    /// Draw the current state of the countdown
    fn render(&mut self, frame: &Frame<'_>);

    /// Sound the end-of-timer alarm
    ///
    /// Errors are reported to the caller, which must not let them stop the
    /// countdown.
    fn play_alarm(&mut self) -> Result<()>;
}

impl<P: Presenter + ?Sized> Presenter for &mut P {
    fn set_title(&mut self, title: &str) {
        (**self).set_title(title)
    }

    fn render(&mut self, frame: &Frame<'_>) {
        (**self).render(frame)
    }

    fn play_alarm(&mut self) -> Result<()> {
        (**self).play_alarm()
    }
}

/// How a finished countdown makes itself heard
pub struct AlarmOptions {
    /// Ring the terminal bell
    pub bell: bool,
    /// Play a sound, unless disabled
    pub speaker: Option<Speaker>,
    /// Where the `finished` hook is looked up
    pub hooks_directory: PathBuf,
    /// Handed to hooks as `COUNTDOWN_ALARM_URL`
    pub alarm_url: String,
}

/// Draws the countdown on a single terminal line
///
/// The alarm rings the terminal bell, plays the configured sound and runs
/// the `finished` hook, which receives the alarm URL.
pub struct TerminalPresenter<W: Write = Stdout> {
    out: W,
    alarm: AlarmOptions,
    minutes: u32,
    task: String,
}

impl TerminalPresenter<Stdout> {
    pub fn stdout(alarm: AlarmOptions, session: &Session) -> Self {
        Self::new(io::stdout(), alarm, session)
    }
}

impl<W: Write> TerminalPresenter<W> {
    pub fn new(out: W, alarm: AlarmOptions, session: &Session) -> Self {
        Self {
            out,
            alarm,
            minutes: session.minutes,
            task: session.task.clone(),
        }
    }

    /// Start a hook with this session's environment
    pub fn run_hook(&self, hook: Hook) -> Result<Option<RunningHook>> {
        let context = HookContext {
            task: &self.task,
            minutes: self.minutes,
            alarm_url: &self.alarm.alarm_url,
        };

        hook.run(&self.alarm.hooks_directory, &context)
    }

    /// Leave the clock line intact and move to a fresh line
    pub fn finish_line(&mut self) {
        let _ = self.out.write_all(b"\r\n").and_then(|_| self.out.flush());
    }

    fn ring_bell(&mut self) -> Result<()> {
        self.out
            .write_all(b"\x07")
            .and_then(|_| self.out.flush())
            .with_context(|| "Unable to ring terminal bell")
    }
}

impl<W: Write> Presenter for TerminalPresenter<W> {
    fn set_title(&mut self, title: &str) {
        if let Err(e) = execute!(self.out, SetTitle(title)) {
            debug!("Unable to set terminal title: {}", e);
        }
    }

    fn render(&mut self, frame: &Frame<'_>) {
        let clock = match frame.phase {
            Phase::Running => frame.clock.as_str().bold().cyan(),
            Phase::Paused => frame.clock.as_str().bold().yellow(),
            Phase::Finished => frame.clock.as_str().bold().red(),
        };

        let status = match frame.phase {
            Phase::Running => "".normal(),
            Phase::Paused => "paused (p to resume)".dimmed(),
            Phase::Finished => "Finished! (r to restart, q to quit)".red(),
        };

        let line = format!("{}  {}  {}", frame.task.yellow(), clock, status);

        let drawn = queue!(
            self.out,
            MoveToColumn(0),
            Clear(ClearType::CurrentLine),
            Print(line)
        )
        .and_then(|_| self.out.flush());

        if let Err(e) = drawn {
            debug!("Unable to draw countdown: {}", e);
        }
    }

    /// Every alarm channel is tried, even after one of them fails
    fn play_alarm(&mut self) -> Result<()> {
        let bell = if self.alarm.bell {
            self.ring_bell()
        } else {
            Ok(())
        };

        let sound = match &mut self.alarm.speaker {
            Some(speaker) => speaker.play(),
            None => Ok(()),
        };

        let hook = self.run_hook(Hook::Finished).map(|running| {
            if running.is_none() {
                debug!("No finished hook for alarm {}", self.alarm.alarm_url);
            }
        });

        bell.and(sound).and(hook)
    }
}

/// Remembers everything it is asked to show
#[derive(Clone, Debug, Default)]
pub struct RecordingPresenter {
    pub titles: Vec<String>,
    pub clocks: Vec<String>,
    pub alarms: usize,
    /// When set, every alarm fails with this message
    pub alarm_error: Option<String>,
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(&self) -> Option<&str> {
        self.titles.last().map(String::as_str)
    }

    pub fn clock(&self) -> Option<&str> {
        self.clocks.last().map(String::as_str)
    }
}

impl Presenter for RecordingPresenter {
    fn set_title(&mut self, title: &str) {
        self.titles.push(title.to_string());
    }

    fn render(&mut self, frame: &Frame<'_>) {
        self.clocks.push(frame.clock.clone());
    }

    fn play_alarm(&mut self) -> Result<()> {
        self.alarms += 1;

        match &self.alarm_error {
            Some(message) => anyhow::bail!("{}", message),
            None => Ok(()),
        }
    }
}
