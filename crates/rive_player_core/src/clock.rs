//! Frame clock
//!
//! Drives a player at a fixed target rate. Each tick applies pending scene
//! mutations, advances the scene by the real time elapsed since the previous
//! tick, then requests a repaint.
//!
//! In [`ClockMode::Foreground`] the host calls [`FrameClock::tick`] from its
//! own render loop. In [`ClockMode::Background`] a dedicated thread ticks;
//! it holds only a weak reference to its target and exits once the target is
//! gone or the clock is stopped.

use crate::error::{PlayerError, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Default target frame rate
pub const DEFAULT_FPS: u32 = 120;

/// Highest accepted target frame rate; one tick per millisecond
pub const MAX_FPS: u32 = 1000;

/// Where ticks come from
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockMode {
    /// The host ticks from its render loop
    #[default]
    Foreground,
    /// A dedicated thread ticks
    Background,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClockState {
    Stopped,
    Running,
}

/// What a frame clock drives
pub trait TickTarget: Send + Sync {
    /// Apply every pending scene mutation
    fn apply_pending(&self);

    /// Advance the live scene by `elapsed`
    fn advance(&self, elapsed: Duration);

    /// Ask the host for a repaint
    fn request_repaint(&self);
}

/// Interval between ticks at `fps`
pub fn frame_interval(fps: u32) -> Duration {
    Duration::from_micros(1_000_000 / u64::from(fps.max(1)))
}

/// Fixed-rate driver of a [`TickTarget`]
pub struct FrameClock {
    mode: ClockMode,
    target_fps: u32,
    last_tick: Arc<Mutex<Option<Instant>>>,
    stop_flag: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
    running: bool,
}

impl FrameClock {
    pub fn new(mode: ClockMode, target_fps: u32) -> Result<Self> {
        if target_fps == 0 || target_fps > MAX_FPS {
            return Err(PlayerError::invalid_configuration(format!(
                "target frame rate must be between 1 and {}, got {}",
                MAX_FPS, target_fps
            )));
        }
        Ok(Self {
            mode,
            target_fps,
            last_tick: Arc::new(Mutex::new(None)),
            stop_flag: Arc::new(AtomicBool::new(false)),
            thread_handle: None,
            running: false,
        })
    }

    pub fn mode(&self) -> ClockMode {
        self.mode
    }

    pub fn target_fps(&self) -> u32 {
        self.target_fps
    }

    pub fn frame_interval(&self) -> Duration {
        frame_interval(self.target_fps)
    }

    pub fn state(&self) -> ClockState {
        if self.running {
            ClockState::Running
        } else {
            ClockState::Stopped
        }
    }

    /// Start ticking `target`
    ///
    /// In background mode this spawns the clock thread. In foreground mode
    /// it only marks the clock running; the host then calls
    /// [`tick`](Self::tick) once per [`frame_interval`](Self::frame_interval).
    pub fn start(&mut self, target: Weak<dyn TickTarget>) -> Result<()> {
        if self.running {
            return Ok(());
        }

        if self.mode == ClockMode::Background {
            self.stop_flag.store(false, Ordering::Relaxed);
            let stop_flag = Arc::clone(&self.stop_flag);
            let last_tick = Arc::clone(&self.last_tick);
            let frame_duration = self.frame_interval();

            let handle = thread::Builder::new()
                .name("rive-frame-clock".into())
                .spawn(move || {
                    tracing::debug!("Frame clock thread started ({:?} per frame)", frame_duration);
                    while !stop_flag.load(Ordering::Relaxed) {
                        let start = Instant::now();

                        let Some(target) = target.upgrade() else {
                            break;
                        };
                        run_tick(&*target, &last_tick, start);
                        drop(target);

                        // Sleep for remaining frame time
                        let elapsed = start.elapsed();
                        if elapsed < frame_duration {
                            thread::sleep(frame_duration - elapsed);
                        }
                    }
                    tracing::debug!("Frame clock thread stopped");
                })
                .map_err(|e| PlayerError::Spawn(format!("frame clock thread: {}", e)))?;
            self.thread_handle = Some(handle);
        }

        self.running = true;
        Ok(())
    }

    /// Run one tick against `target`, timed from now
    pub fn tick(&self, target: &dyn TickTarget) {
        self.tick_at(target, Instant::now());
    }

    /// Run one tick against `target` as if it happened at `now`
    ///
    /// The first tick after start advances by zero.
    pub fn tick_at(&self, target: &dyn TickTarget, now: Instant) {
        run_tick(target, &self.last_tick, now);
    }

    /// A handle that ticks with this clock's timing, usable without
    /// borrowing the clock
    pub fn ticker(&self) -> FrameTicker {
        FrameTicker {
            last_tick: Arc::clone(&self.last_tick),
        }
    }

    /// Stop ticking; the next start measures elapsed time afresh
    pub fn stop(&mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        if let Some(handle) = self.thread_handle.take() {
            // The clock thread can drop the last player reference, which
            // stops the clock from that very thread.
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
        *self.last_tick.lock() = None;
        self.running = false;
    }
}

impl Drop for FrameClock {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for FrameClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameClock")
            .field("mode", &self.mode)
            .field("target_fps", &self.target_fps)
            .field("state", &self.state())
            .finish()
    }
}

/// Foreground tick handle sharing a [`FrameClock`]'s elapsed-time state
#[derive(Clone, Debug)]
pub struct FrameTicker {
    last_tick: Arc<Mutex<Option<Instant>>>,
}

impl FrameTicker {
    pub fn tick_at(&self, target: &dyn TickTarget, now: Instant) {
        run_tick(target, &self.last_tick, now);
    }
}

fn run_tick(target: &dyn TickTarget, last_tick: &Mutex<Option<Instant>>, now: Instant) {
    target.apply_pending();

    let elapsed = {
        let mut last = last_tick.lock();
        let elapsed = last
            .map(|prev| now.saturating_duration_since(prev))
            .unwrap_or_default();
        *last = Some(now);
        elapsed
    };
    target.advance(elapsed);

    target.request_repaint();
}
