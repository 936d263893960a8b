//! Recurring tick scheduling
//!
//! The countdown never sleeps on its own. It asks a [`Scheduler`] for a
//! recurring tick and gets back a [`TickHandle`]; cancelling that handle is
//! how pausing, resetting, finishing and unmounting release the tick.

use std::{
    cell::RefCell,
    rc::Rc,
    time::{Duration, Instant},
};

use log::trace;

/// Identifies one scheduled recurring tick
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct TickHandle(u64);

/// Something that can deliver recurring ticks
pub trait Scheduler {
    /// Start delivering a tick every `period`
    fn schedule_tick(&mut self, period: Duration) -> TickHandle;

    /// Stop delivering ticks for `handle`. Unknown handles are ignored.
    fn cancel(&mut self, handle: TickHandle);
}

impl<K: Scheduler + ?Sized> Scheduler for &mut K {
    fn schedule_tick(&mut self, period: Duration) -> TickHandle {
        (**self).schedule_tick(period)
    }

    fn cancel(&mut self, handle: TickHandle) {
        (**self).cancel(handle)
    }
}

#[derive(Debug)]
struct Interval {
    handle: TickHandle,
    period: Duration,
    due: Instant,
}

/// Schedules ticks against the monotonic clock
///
/// Nothing fires by itself: an event loop asks for [`next_due`] to know how
/// long to wait, then calls [`take_due`] to collect the tick. Ticks missed
/// while the process was not running are dropped, not replayed.
///
/// [`next_due`]: IntervalScheduler::next_due
/// [`take_due`]: IntervalScheduler::take_due
#[derive(Debug, Default)]
pub struct IntervalScheduler {
    next_id: u64,
    intervals: Vec<Interval>,
}

impl IntervalScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// The earliest moment any tick is due
    pub fn next_due(&self) -> Option<Instant> {
        self.intervals.iter().map(|i| i.due).min()
    }

    /// Collect the earliest tick that is due at `now`, if any
    pub fn take_due(&mut self, now: Instant) -> Option<TickHandle> {
        let interval = self
            .intervals
            .iter_mut()
            .filter(|i| i.due <= now)
            .min_by_key(|i| i.due)?;

        interval.due += interval.period;
        if interval.due <= now {
            interval.due = now + interval.period;
        }

        trace!("Tick {:?} fired", interval.handle);

        Some(interval.handle)
    }

    fn schedule_at(&mut self, period: Duration, now: Instant) -> TickHandle {
        self.next_id += 1;
        let handle = TickHandle(self.next_id);

        self.intervals.push(Interval {
            handle,
            period,
            due: now + period,
        });

        handle
    }
}

impl Scheduler for IntervalScheduler {
    fn schedule_tick(&mut self, period: Duration) -> TickHandle {
        self.schedule_at(period, Instant::now())
    }

    fn cancel(&mut self, handle: TickHandle) {
        self.intervals.retain(|i| i.handle != handle);
    }
}

#[derive(Debug, Default)]
struct ManualState {
    next_id: u64,
    armed: Vec<(TickHandle, Duration)>,
    scheduled: usize,
    cancelled: usize,
}

/// A scheduler whose ticks are fired by hand
///
/// Clones share state, so a copy kept aside can observe the scheduler after
/// it has been handed to a countdown.
#[derive(Clone, Debug, Default)]
pub struct ManualScheduler {
    state: Rc<RefCell<ManualState>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handles that are currently scheduled, oldest first
    pub fn armed(&self) -> Vec<TickHandle> {
        self.state.borrow().armed.iter().map(|(h, _)| *h).collect()
    }

    /// The most recently scheduled handle that is still armed
    pub fn current(&self) -> Option<TickHandle> {
        self.state.borrow().armed.last().map(|(h, _)| *h)
    }

    pub fn period(&self, handle: TickHandle) -> Option<Duration> {
        self.state
            .borrow()
            .armed
            .iter()
            .find(|(h, _)| *h == handle)
            .map(|(_, p)| *p)
    }

    /// Number of ticks scheduled so far
    pub fn scheduled(&self) -> usize {
        self.state.borrow().scheduled
    }

    /// Number of armed ticks cancelled so far
    pub fn cancelled(&self) -> usize {
        self.state.borrow().cancelled
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_tick(&mut self, period: Duration) -> TickHandle {
        let mut state = self.state.borrow_mut();
        state.next_id += 1;
        state.scheduled += 1;

        let handle = TickHandle(state.next_id);
        state.armed.push((handle, period));

        handle
    }

    fn cancel(&mut self, handle: TickHandle) {
        let mut state = self.state.borrow_mut();
        let before = state.armed.len();
        state.armed.retain(|(h, _)| *h != handle);

        if state.armed.len() != before {
            state.cancelled += 1;
        }
    }
}
