//! Decide what to count down from
//!
//! At startup the launch parameters, the persisted state and the built-in
//! defaults are merged into a single [`Session`]. Launch parameters win over
//! persisted state, which wins over the defaults. Whenever the duration or
//! the task changes, the persisted start timestamp is removed so that the
//! countdown starts over.

use anyhow::Result;
use log::{debug, info, warn};

use crate::{
    clock::Clock,
    params::{parse_int, parse_minutes, LaunchParams},
    store::{Key, Store},
};

/// Duration used when nothing else supplies one, in minutes
pub const DEFAULT_MINUTES: u32 = 30;

/// Label used when nothing else supplies one
pub const DEFAULT_TASK: &str = "Countdown Timer";

/// Fallback values for a session
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Defaults {
    pub minutes: u32,
    pub task: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            minutes: DEFAULT_MINUTES,
            task: DEFAULT_TASK.to_string(),
        }
    }
}

/// The effective duration and label of a countdown
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Session {
    /// Always positive
    pub minutes: u32,
    pub task: String,
}

impl Session {
    /// Length of the countdown in seconds
    pub fn seconds(&self) -> u64 {
        u64::from(self.minutes) * 60
    }
}

/// Merge launch parameters, persisted state and defaults into a session
///
/// All persisted writes happen here: the chosen duration and a launch-supplied
/// task are saved, and the start timestamp is removed or renewed as needed.
pub fn resolve<S, C>(
    params: &LaunchParams,
    store: &mut S,
    clock: &C,
    defaults: &Defaults,
) -> Result<Session>
where
    S: Store + ?Sized,
    C: Clock + ?Sized,
{
    let now = clock.now();
    let stored_minutes = store.get(Key::Minutes);
    let stored_task = store.get(Key::Task);

    let task_changed = match (&params.task, &stored_task) {
        (Some(task), Some(stored)) => task != stored,
        (Some(_), None) => true,
        (None, _) => false,
    };

    let mut restart = task_changed;

    let minutes = if let Some(raw) = &params.minutes {
        let minutes = parse_minutes(raw).unwrap_or_else(|| {
            warn!("Ignoring invalid duration {:?}, using {} minutes", raw, defaults.minutes);
            defaults.minutes
        });

        let persisted = stored_minutes.as_deref().and_then(parse_minutes);
        if persisted != Some(minutes) {
            info!("Duration changed to {} minutes", minutes);
            restart = true;
        }

        if stored_minutes.as_deref() != Some(minutes.to_string().as_str()) {
            store.set(Key::Minutes, &minutes.to_string())?;
        }

        minutes
    } else if let Some(raw) = &stored_minutes {
        match parse_minutes(raw) {
            Some(minutes) => minutes,
            None => {
                warn!("Persisted duration {:?} is invalid, using {} minutes", raw, defaults.minutes);
                store.set(Key::Minutes, &defaults.minutes.to_string())?;
                restart = true;

                defaults.minutes
            }
        }
    } else {
        debug!("No persisted duration, using {} minutes", defaults.minutes);
        store.set(Key::Minutes, &defaults.minutes.to_string())?;

        defaults.minutes
    };

    let task = if let Some(task) = &params.task {
        if task_changed {
            info!("Task changed to {:?}", task);
            store.set(Key::Task, task)?;
        }

        task.clone()
    } else {
        stored_task.unwrap_or_else(|| defaults.task.clone())
    };

    if restart {
        debug!("Clearing persisted start time");
        store.remove(Key::StartTime)?;
    } else if let Some(raw) = store.get(Key::StartTime) {
        match parse_int(&raw) {
            Some(started_at) if started_at > now => {
                warn!("Persisted start time {} is in the future, restarting", started_at);
                store.set(Key::StartTime, &now.to_string())?;
            }
            Some(started_at) if now.saturating_sub(started_at) >= i64::from(minutes) * 60 => {
                info!("Previous countdown has elapsed, starting a new period");
                store.set(Key::StartTime, &now.to_string())?;
            }
            Some(_) => {}
            None => {
                warn!("Persisted start time {:?} is invalid, clearing it", raw);
                store.remove(Key::StartTime)?;
            }
        }
    }

    Ok(Session { minutes, task })
}
