//! Fixed-cadence driver for a [`SharedSession`].
//!
//! A worker thread waits on a `crossbeam_channel::tick` timer. That channel
//! holds at most one pending tick, so a slow tick makes the next one drop
//! instead of queueing. Each tick locks the session once, so pause, resume
//! and reset from other threads land between ticks, never inside one.
//! Snapshots go out through a single-slot channel holding only the newest.

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use log::{debug, info, warn};

use crate::error::EngineError;
use crate::session::{lock, SessionSnapshot, SessionState, SharedSession};

/// Media position as seen by the engine.
pub trait PlaybackClock: Send {
    /// Current playback time in seconds, if the player can report one.
    fn position(&self) -> Option<f64>;
    /// True once the reference track has played to the end.
    fn ended(&self) -> bool;
}

pub struct Sampler {
    shutdown_tx: Sender<()>,
    snapshots: Receiver<SessionSnapshot>,
    thread_handle: Option<JoinHandle<()>>,
}

impl Sampler {
    /// Start sampling at the session's configured interval.
    pub fn spawn(
        session: SharedSession,
        audio: Receiver<Vec<f64>>,
        clock: Box<dyn PlaybackClock>,
    ) -> Self {
        let interval = lock(&session).config().sampling_interval();
        Self::spawn_with_interval(session, audio, clock, interval)
    }

    pub fn spawn_with_interval(
        session: SharedSession,
        audio: Receiver<Vec<f64>>,
        clock: Box<dyn PlaybackClock>,
        interval: Duration,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);
        let (snapshot_tx, snapshot_rx) = crossbeam_channel::bounded::<SessionSnapshot>(1);
        let stale = snapshot_rx.clone();
        let ticker = crossbeam_channel::tick(interval);
        // Carry on from the previous driver's clock, if any.
        let base = lock(&session).last_tick_at().unwrap_or_default();
        let epoch = Instant::now();

        let thread_handle = thread::spawn(move || {
            info!("sampler started at {:?} intervals", interval);
            loop {
                crossbeam_channel::select! {
                    recv(ticker) -> _ => {
                        if let Some(snapshot) = run_tick(&session, &audio, clock.as_ref(), base + epoch.elapsed()) {
                            // Replace whatever the renderer has not picked up yet.
                            let _ = stale.try_recv();
                            let _ = snapshot_tx.try_send(snapshot);
                        }
                    },
                    recv(shutdown_rx) -> _ => break,
                }
            }
            info!("sampler stopped");
        });

        Sampler {
            shutdown_tx,
            snapshots: snapshot_rx,
            thread_handle: Some(thread_handle),
        }
    }

    /// Newest snapshot published since the last call, if any.
    pub fn latest(&self) -> Option<SessionSnapshot> {
        self.snapshots.try_iter().last()
    }

    /// Stop the cadence. Once this returns no further tick touches the session.
    pub fn stop(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            let _ = self.shutdown_tx.try_send(());
            if handle.join().is_err() {
                warn!("sampler thread panicked");
            }
        }
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_tick(
    session: &SharedSession,
    audio: &Receiver<Vec<f64>>,
    clock: &dyn PlaybackClock,
    now: Duration,
) -> Option<SessionSnapshot> {
    // Always drain so stale audio from a pause is never scored later.
    let buffer = audio.try_iter().last();

    let mut session = lock(session);
    if session.state() != SessionState::Playing {
        return None;
    }

    if clock.ended() {
        return match session.finish() {
            Ok(_) => Some(session.snapshot()),
            Err(e) => {
                warn!("could not finish session: {}", e);
                None
            }
        };
    }

    match session.tick(buffer.as_deref(), clock.position(), now) {
        Ok(snapshot) => Some(snapshot),
        Err(EngineError::InputUnavailable(reason)) => {
            debug!("skipped tick: {}", reason);
            None
        }
        Err(e) => {
            debug!("tick rejected: {}", e);
            None
        }
    }
}
