//! Timer-driven run loop.
//!
//! The clock toggles a phase signal every half period. Each falling edge
//! steps the shared [`Machine`] once unless it is paused, then the observer
//! receives the phase and a state snapshot. The loop ends on its own once
//! the machine halts or runs off the end of its program.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, warn};

use crate::z16::errors::Z16Error;
use crate::z16::exec::{ExecutionState, Machine};
use crate::z16::syscall::SyscallHost;

/// Frequency the clock runs at when none is configured.
pub const DEFAULT_FREQUENCY_HZ: f64 = 2.0;

pub type SharedMachine<H> = Arc<Mutex<Machine<H>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    High,
    Low,
}

impl Phase {
    pub fn flip(self) -> Phase {
        match self {
            Phase::High => Phase::Low,
            Phase::Low => Phase::High,
        }
    }

    pub fn level(self) -> u8 {
        match self {
            Phase::High => 1,
            Phase::Low => 0,
        }
    }
}

/// What the observer sees once per half period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub phase: Phase,
    pub state: ExecutionState,
}

fn half_period(frequency_hz: f64) -> Result<Duration, Z16Error> {
    if !frequency_hz.is_finite() || frequency_hz <= 0.0 {
        return Err(Z16Error::InvalidFrequency(frequency_hz));
    }
    match Duration::try_from_secs_f64(0.5 / frequency_hz) {
        Ok(d) if !d.is_zero() => Ok(d),
        _ => Err(Z16Error::InvalidFrequency(frequency_hz)),
    }
}

fn lock<H: SyscallHost>(machine: &SharedMachine<H>) -> Result<MutexGuard<'_, Machine<H>>, Z16Error> {
    machine.lock().map_err(|_| Z16Error::Poisoned)
}

/// Handle to a running clock task. Dropping it aborts the task; [`Clock::stop`]
/// shuts it down and waits for it.
pub struct Clock<H: SyscallHost + 'static> {
    machine: SharedMachine<H>,
    cancel: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl<H: SyscallHost + 'static> Clock<H> {
    /// Spawns the clock on the current tokio runtime.
    pub fn start<F>(machine: SharedMachine<H>, frequency_hz: f64, on_tick: F) -> Result<Self, Z16Error>
    where
        F: FnMut(Tick) + Send + 'static,
    {
        Self::start_limited(machine, frequency_hz, None, on_tick)
    }

    /// Like [`Clock::start`], but after `max_steps` executed instructions the
    /// machine is paused in the same critical section and the clock ends.
    pub fn start_limited<F>(
        machine: SharedMachine<H>,
        frequency_hz: f64,
        max_steps: Option<usize>,
        mut on_tick: F,
    ) -> Result<Self, Z16Error>
    where
        F: FnMut(Tick) + Send + 'static,
    {
        let half = half_period(frequency_hz)?;
        let (cancel, mut cancelled) = watch::channel(false);
        let shared = machine.clone();
        debug!(frequency_hz, ?half, "clock start");

        let task = tokio::spawn(async move {
            let mut interval = time::interval(half);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // the first tick completes immediately
            interval.tick().await;

            let mut phase = Phase::High;
            let mut executed = 0usize;
            loop {
                tokio::select! {
                    biased;
                    _ = cancelled.changed() => break,
                    _ = interval.tick() => {}
                }
                phase = phase.flip();

                let (tick, done) = {
                    let Ok(mut m) = lock(&shared) else {
                        warn!("machine lock poisoned, clock stopping");
                        break;
                    };
                    let mut limited = false;
                    if phase == Phase::Low && !m.is_paused() && m.step() {
                        executed += 1;
                        if max_steps.is_some_and(|max| executed >= max) {
                            debug!(executed, "step limit reached");
                            m.pause();
                            limited = true;
                        }
                    }
                    let state = m.state();
                    (Tick { phase, state }, limited || state.halted || state.pc >= m.program().len())
                };
                on_tick(tick);
                if done {
                    debug!(pc = tick.state.pc, halted = tick.state.halted, "clock finished");
                    break;
                }
            }
        });

        Ok(Self { machine, cancel, task: Some(task) })
    }

    pub fn machine(&self) -> &SharedMachine<H> {
        &self.machine
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub fn pause(&self) -> Result<(), Z16Error> {
        lock(&self.machine)?.pause();
        Ok(())
    }

    pub fn resume(&self) -> Result<(), Z16Error> {
        lock(&self.machine)?.resume();
        Ok(())
    }

    /// Flips the paused flag and returns the new value.
    pub fn toggle_pause(&self) -> Result<bool, Z16Error> {
        Ok(lock(&self.machine)?.toggle_pause())
    }

    /// Moves PC by `delta` words while paused; ignored while running.
    pub fn step(&self, delta: isize) -> Result<ExecutionState, Z16Error> {
        let mut m = lock(&self.machine)?;
        if m.is_paused() {
            m.seek(delta);
        }
        Ok(m.state())
    }

    pub fn state(&self) -> Result<ExecutionState, Z16Error> {
        Ok(lock(&self.machine)?.state())
    }

    /// Waits for the clock to finish on its own.
    pub async fn join(&mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("clock task failed: {e}");
            }
        }
    }

    /// Cancels the timer and waits for the task. No tick is delivered after
    /// this returns. Calling it again does nothing.
    pub async fn stop(&mut self) {
        let _ = self.cancel.send(true);
        if self.task.is_some() {
            self.join().await;
            debug!("clock stopped");
        }
    }
}

impl<H: SyscallHost + 'static> Drop for Clock<H> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
