//! The live countdown
//!
//! A [`Countdown`] is mounted once a [`Session`] has been resolved. It works
//! out how much time is left from the persisted start timestamp, then counts
//! down one second per tick. Pausing stops the tick and freezes the clock;
//! resuming continues from the frozen value without looking at the wall
//! clock again.

use std::time::Duration;

use anyhow::Result;
use log::{debug, info, trace, warn};
use serde::Serialize;

use crate::{
    clock::Clock,
    params::parse_int,
    presenter::{Frame, Presenter},
    scheduler::{Scheduler, TickHandle},
    session::Session,
    store::{Key, Store},
    time,
};

/// How often the countdown ticks
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// What the countdown is doing
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
pub enum Phase {
    Running,
    Paused,
    Finished,
}

/// Seconds left of a countdown started at `started_at`, as of `now`
///
/// A start time in the future counts as no time elapsed.
pub fn remaining_seconds(total: u64, started_at: i64, now: i64) -> u64 {
    let elapsed = now.saturating_sub(started_at).max(0) as u64;

    total.saturating_sub(elapsed)
}

pub struct Countdown<S: Store, C: Clock, K: Scheduler, P: Presenter> {
    session: Session,
    remaining: u64,
    phase: Phase,
    tick: Option<TickHandle>,
    store: S,
    clock: C,
    scheduler: K,
    presenter: P,
}

impl<S: Store, C: Clock, K: Scheduler, P: Presenter> Countdown<S, C, K, P> {
    /// Start counting down
    ///
    /// The persisted start timestamp is created if there is none. If the
    /// countdown has already run out the alarm sounds straight away.
    pub fn mount(
        session: Session,
        mut store: S,
        clock: C,
        scheduler: K,
        presenter: P,
    ) -> Result<Self> {
        let now = clock.now();

        let started_at = match store.get(Key::StartTime).as_deref().and_then(parse_int) {
            Some(started_at) => started_at,
            None => {
                debug!("No start time persisted, starting now");
                store.set(Key::StartTime, &now.to_string())?;
                now
            }
        };

        let remaining = remaining_seconds(session.seconds(), started_at, now);

        info!(
            "Counting down {} of {} minutes for {:?}",
            time::clock(remaining),
            session.minutes,
            session.task
        );

        let mut countdown = Self {
            session,
            remaining,
            phase: Phase::Running,
            tick: None,
            store,
            clock,
            scheduler,
            presenter,
        };

        if countdown.remaining > 0 {
            countdown.arm();
            countdown.show_clock();
        } else {
            countdown.finish();
        }

        Ok(countdown)
    }

    /// Handle a tick delivered by the scheduler
    ///
    /// Ticks for a handle that has been cancelled, or delivered while not
    /// running, are ignored.
    pub fn tick(&mut self, handle: TickHandle) -> Phase {
        if self.phase != Phase::Running || self.tick != Some(handle) {
            trace!("Ignoring stale tick {:?}", handle);
            return self.phase;
        }

        self.remaining = self.remaining.saturating_sub(1);

        if self.remaining == 0 {
            self.finish();
        } else {
            self.show_clock();
        }

        self.phase
    }

    /// Start the full duration over from now
    pub fn reset(&mut self) -> Result<()> {
        let now = self.clock.now();
        self.store.set(Key::StartTime, &now.to_string())?;

        info!("Restarting countdown of {} minutes", self.session.minutes);

        self.disarm();
        self.remaining = self.session.seconds();
        self.phase = Phase::Running;

        if self.remaining > 0 {
            self.arm();
            self.show_clock();
        } else {
            self.finish();
        }

        Ok(())
    }

    /// Pause a running countdown, or resume a paused one
    ///
    /// A finished countdown stays finished.
    pub fn toggle_pause(&mut self) -> Phase {
        match self.phase {
            Phase::Running => {
                self.disarm();
                self.phase = Phase::Paused;
                debug!("Paused at {}", self.format_remaining());
                self.render();
            }
            Phase::Paused => {
                self.phase = Phase::Running;
                self.arm();
                debug!("Resumed at {}", self.format_remaining());
                self.render();
            }
            Phase::Finished => {
                debug!("Ignoring pause toggle on a finished countdown");
            }
        }

        self.phase
    }

    /// Stop the countdown and release its tick
    pub fn unmount(self) {
        debug!("Unmounting countdown at {}", self.format_remaining());
    }

    /// The remaining time as `MM:SS`
    pub fn format_remaining(&self) -> String {
        time::clock(self.remaining)
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The tick the countdown is currently listening for
    pub fn tick_handle(&self) -> Option<TickHandle> {
        self.tick
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn scheduler(&self) -> &K {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut K {
        &mut self.scheduler
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }

    fn arm(&mut self) {
        self.disarm();
        self.tick = Some(self.scheduler.schedule_tick(TICK_PERIOD));
    }

    fn disarm(&mut self) {
        if let Some(handle) = self.tick.take() {
            self.scheduler.cancel(handle);
        }
    }

    fn finish(&mut self) {
        self.disarm();
        self.remaining = 0;
        self.phase = Phase::Finished;

        info!("Countdown finished for {:?}", self.session.task);

        self.presenter
            .set_title(&format!("Finished! | {}", self.session.task));
        self.render();

        if let Err(e) = self.presenter.play_alarm() {
            warn!("Unable to play alarm: {:#}", e);
        }
    }

    fn show_clock(&mut self) {
        let title = format!("{} | {}", self.format_remaining(), self.session.task);
        self.presenter.set_title(&title);
        self.render();
    }

    fn render(&mut self) {
        let frame = Frame {
            task: &self.session.task,
            clock: time::clock(self.remaining),
            phase: self.phase,
        };

        self.presenter.render(&frame);
    }
}

impl<S: Store, C: Clock, K: Scheduler, P: Presenter> Drop for Countdown<S, C, K, P> {
    fn drop(&mut self) {
        self.disarm();
    }
}

#[cfg(test)]
mod test {
    use super::{remaining_seconds, Countdown, Phase, TICK_PERIOD};
    use crate::{
        clock::FixedClock,
        params::LaunchParams,
        presenter::RecordingPresenter,
        scheduler::ManualScheduler,
        session::{resolve, Defaults, Session},
        store::{Key, MemoryStore, Store},
    };

    const NOW: i64 = 1_711_562_400;

    type TestCountdown<'a> = Countdown<MemoryStore, &'a FixedClock, ManualScheduler, RecordingPresenter>;

    fn session(minutes: u32) -> Session {
        Session {
            minutes,
            task: "Write docs".to_string(),
        }
    }

    fn mount<'a>(
        session: Session,
        store: MemoryStore,
        clock: &'a FixedClock,
        scheduler: &ManualScheduler,
    ) -> TestCountdown<'a> {
        Countdown::mount(session, store, clock, scheduler.clone(), RecordingPresenter::new()).unwrap()
    }

    fn run_out(countdown: &mut TestCountdown<'_>, scheduler: &ManualScheduler) -> u64 {
        let mut ticks = 0;

        while let Some(handle) = scheduler.current() {
            countdown.tick(handle);
            ticks += 1;
        }

        ticks
    }

    #[test]
    fn default_first_run_shows_thirty_minutes() {
        let clock = FixedClock::new(NOW);
        let scheduler = ManualScheduler::new();
        let mut store = MemoryStore::new();

        let session = resolve(&LaunchParams::default(), &mut store, &clock, &Defaults::default()).unwrap();
        let countdown = mount(session, store, &clock, &scheduler);

        assert_eq!(countdown.session().minutes, 30);
        assert_eq!(countdown.session().task, "Countdown Timer");
        assert_eq!(countdown.format_remaining(), "30:00");
        assert_eq!(countdown.phase(), Phase::Running);
        assert_eq!(countdown.store().get(Key::StartTime), Some(NOW.to_string()));
        assert_eq!(countdown.presenter().title(), Some("30:00 | Countdown Timer"));
        assert_eq!(scheduler.period(scheduler.current().unwrap()), Some(TICK_PERIOD));
    }

    #[test]
    fn finishes_exactly_once_after_every_tick() {
        for minutes in 0..=3 {
            let clock = FixedClock::new(NOW);
            let scheduler = ManualScheduler::new();
            let mut countdown = mount(session(minutes), MemoryStore::new(), &clock, &scheduler);

            let first_handle = countdown.tick_handle();
            let ticks = run_out(&mut countdown, &scheduler);

            assert_eq!(ticks, u64::from(minutes) * 60);
            assert_eq!(countdown.phase(), Phase::Finished);
            assert_eq!(countdown.presenter().alarms, 1);

            if let Some(handle) = first_handle {
                countdown.tick(handle);
            }

            assert_eq!(countdown.presenter().alarms, 1);
            assert_eq!(countdown.format_remaining(), "00:00");
            assert_eq!(countdown.presenter().title(), Some("Finished! | Write docs"));
        }
    }

    #[test]
    fn resumes_from_persisted_start_time() {
        let clock = FixedClock::new(NOW);
        let scheduler = ManualScheduler::new();
        let mut store = MemoryStore::new();
        store.set(Key::StartTime, &(NOW - 90).to_string()).unwrap();

        let countdown = mount(session(10), store, &clock, &scheduler);

        assert_eq!(countdown.remaining(), 510);
        assert_eq!(countdown.format_remaining(), "08:30");
        assert_eq!(countdown.store().get(Key::StartTime), Some((NOW - 90).to_string()));
    }

    #[test]
    fn malformed_start_time_starts_now() {
        let clock = FixedClock::new(NOW);
        let scheduler = ManualScheduler::new();
        let mut store = MemoryStore::new();
        store.set(Key::StartTime, "garbage").unwrap();

        let countdown = mount(session(10), store, &clock, &scheduler);

        assert_eq!(countdown.store().get(Key::StartTime), Some(NOW.to_string()));
        assert_eq!(countdown.format_remaining(), "10:00");
        assert_eq!(countdown.phase(), Phase::Running);
    }

    #[test]
    fn elapsed_countdown_finishes_on_mount() {
        let clock = FixedClock::new(NOW);
        let scheduler = ManualScheduler::new();
        let mut store = MemoryStore::new();
        store.set(Key::StartTime, &(NOW - 700).to_string()).unwrap();

        let countdown = mount(session(10), store, &clock, &scheduler);

        assert_eq!(countdown.phase(), Phase::Finished);
        assert_eq!(countdown.remaining(), 0);
        assert_eq!(countdown.presenter().alarms, 1);
        assert!(scheduler.armed().is_empty());
    }

    #[test]
    fn tick_updates_title() {
        let clock = FixedClock::new(NOW);
        let scheduler = ManualScheduler::new();
        let mut countdown = mount(session(30), MemoryStore::new(), &clock, &scheduler);

        countdown.tick(scheduler.current().unwrap());

        assert_eq!(countdown.remaining(), 30 * 60 - 1);
        assert_eq!(countdown.presenter().title(), Some("29:59 | Write docs"));
        assert_eq!(countdown.presenter().clock(), Some("29:59"));
    }

    #[test]
    fn paused_countdown_does_not_tick() {
        let clock = FixedClock::new(NOW);
        let scheduler = ManualScheduler::new();
        let mut countdown = mount(session(1), MemoryStore::new(), &clock, &scheduler);

        let handle = scheduler.current().unwrap();
        countdown.tick(handle);
        countdown.tick(handle);

        assert_eq!(countdown.toggle_pause(), Phase::Paused);
        assert!(scheduler.armed().is_empty());

        clock.advance(600);
        for _ in 0..5 {
            assert_eq!(countdown.tick(handle), Phase::Paused);
        }

        assert_eq!(countdown.format_remaining(), "00:58");
        assert_eq!(countdown.format_remaining(), "00:58");

        assert_eq!(countdown.toggle_pause(), Phase::Running);
        let resumed = scheduler.current().unwrap();
        assert_ne!(resumed, handle);

        countdown.tick(handle);
        assert_eq!(countdown.remaining(), 58);

        countdown.tick(resumed);
        assert_eq!(countdown.remaining(), 57);
    }

    #[test]
    fn finished_countdown_cannot_be_resumed() {
        let clock = FixedClock::new(NOW);
        let scheduler = ManualScheduler::new();
        let mut countdown = mount(session(0), MemoryStore::new(), &clock, &scheduler);

        assert_eq!(countdown.toggle_pause(), Phase::Finished);
        assert_eq!(countdown.toggle_pause(), Phase::Finished);
        assert!(scheduler.armed().is_empty());
        assert_eq!(countdown.presenter().alarms, 1);
    }

    #[test]
    fn reset_restarts_full_duration() {
        let clock = FixedClock::new(NOW);
        let scheduler = ManualScheduler::new();
        let mut countdown = mount(session(1), MemoryStore::new(), &clock, &scheduler);

        let before = scheduler.current().unwrap();
        for _ in 0..10 {
            countdown.tick(before);
        }

        clock.advance(10);
        countdown.reset().unwrap();

        assert_eq!(countdown.format_remaining(), "01:00");
        assert_eq!(countdown.phase(), Phase::Running);
        assert_eq!(countdown.store().get(Key::StartTime), Some((NOW + 10).to_string()));
        assert_eq!(scheduler.armed().len(), 1);

        countdown.tick(before);
        assert_eq!(countdown.remaining(), 60);
    }

    #[test]
    fn reset_resumes_a_paused_countdown() {
        let clock = FixedClock::new(NOW);
        let scheduler = ManualScheduler::new();
        let mut countdown = mount(session(1), MemoryStore::new(), &clock, &scheduler);

        countdown.toggle_pause();
        countdown.reset().unwrap();

        assert_eq!(countdown.phase(), Phase::Running);
        assert_eq!(scheduler.armed().len(), 1);
    }

    #[test]
    fn each_finish_plays_the_alarm_once() {
        let clock = FixedClock::new(NOW);
        let scheduler = ManualScheduler::new();
        let mut countdown = mount(session(1), MemoryStore::new(), &clock, &scheduler);

        run_out(&mut countdown, &scheduler);
        countdown.reset().unwrap();
        let ticks = run_out(&mut countdown, &scheduler);

        assert_eq!(ticks, 60);
        assert_eq!(countdown.presenter().alarms, 2);
    }

    #[test]
    fn failing_alarm_is_ignored() {
        let clock = FixedClock::new(NOW);
        let scheduler = ManualScheduler::new();
        let presenter = RecordingPresenter {
            alarm_error: Some("autoplay blocked".to_string()),
            ..RecordingPresenter::default()
        };
        let mut countdown =
            Countdown::mount(session(1), MemoryStore::new(), &clock, scheduler.clone(), presenter).unwrap();

        let ticks = run_out(&mut countdown, &scheduler);

        assert_eq!(ticks, 60);
        assert_eq!(countdown.phase(), Phase::Finished);
        assert_eq!(countdown.presenter().alarms, 1);

        countdown.reset().unwrap();
        assert_eq!(countdown.phase(), Phase::Running);
    }

    #[test]
    fn dropping_cancels_tick() {
        let clock = FixedClock::new(NOW);
        let scheduler = ManualScheduler::new();
        let countdown = mount(session(5), MemoryStore::new(), &clock, &scheduler);

        assert_eq!(scheduler.armed().len(), 1);

        countdown.unmount();

        assert!(scheduler.armed().is_empty());
        assert_eq!(scheduler.cancelled(), 1);
    }

    #[test]
    fn remaining_is_never_negative() {
        assert_eq!(remaining_seconds(600, NOW, NOW), 600);
        assert_eq!(remaining_seconds(600, NOW - 100, NOW), 500);
        assert_eq!(remaining_seconds(600, NOW - 6000, NOW), 0);
        assert_eq!(remaining_seconds(600, NOW + 100, NOW), 600);
    }
}
