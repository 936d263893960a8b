//! A resumable countdown timer
//!
//! The duration and task label come from launch parameters or from state
//! persisted by an earlier run, see [`session::resolve`]. The live clock is
//! a [`countdown::Countdown`], which is driven by a [`scheduler::Scheduler`]
//! and shows itself through a [`presenter::Presenter`].

use anyhow::Result;
use serde::Serialize;

use clock::Clock;
use countdown::remaining_seconds;
use params::{parse_int, parse_minutes};
use store::{Key, Store};

pub mod alarm;
pub mod clock;
pub mod config;
pub mod countdown;
pub mod hooks;
pub mod params;
pub mod presenter;
pub mod scheduler;
pub mod session;
pub mod store;
pub mod time;

/// The persisted state of the countdown, as of some moment
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Snapshot {
    pub minutes: Option<u32>,
    pub task: Option<String>,
    pub started_at: Option<i64>,
    /// Seconds left, when both the duration and start time are known
    pub remaining: Option<u64>,
}

impl Snapshot {
    /// Read the persisted state without changing it
    pub fn read<S, C>(store: &S, clock: &C) -> Self
    where
        S: Store + ?Sized,
        C: Clock + ?Sized,
    {
        let minutes = store.get(Key::Minutes).as_deref().and_then(parse_minutes);
        let started_at = store.get(Key::StartTime).as_deref().and_then(parse_int);
        let remaining = match (minutes, started_at) {
            (Some(minutes), Some(started_at)) => Some(remaining_seconds(
                u64::from(minutes) * 60,
                started_at,
                clock.now(),
            )),
            _ => None,
        };

        Self {
            minutes,
            task: store.get(Key::Task),
            started_at,
            remaining,
        }
    }

    pub fn finished(&self) -> bool {
        self.remaining == Some(0)
    }
}

/// Start the persisted countdown over from now
pub fn restart<S, C>(store: &mut S, clock: &C) -> Result<i64>
where
    S: Store + ?Sized,
    C: Clock + ?Sized,
{
    let now = clock.now();
    store.set(Key::StartTime, &now.to_string())?;

    Ok(now)
}
