//! Bounded-staleness polling.
//!
//! The store never pushes; a session that does not write converges on other
//! sessions' writes by re-reading on a fixed period. [`Poller`] is the
//! cooperative-loop form of that contract: it re-runs a read every interval on
//! its own thread and forwards the value whenever it changes.

use std::io;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant, SystemTime};

use crossbeam::channel::{Receiver, Sender, bounded, tick, unbounded};

/// Reference refresh cadence.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// A value observed by a poll tick.
#[derive(Clone, Debug, PartialEq)]
pub struct PollEvent<T> {
    pub value: T,
    pub observed_at: SystemTime,
}

#[derive(Clone, Copy, Debug)]
pub struct Poller {
    interval: Duration,
}

impl Default for Poller {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

impl Poller {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(MIN_INTERVAL),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run `read` immediately and then once per interval on a background
    /// thread. The first value is always emitted; later ones only on change.
    pub fn spawn<T, F>(&self, read: F) -> io::Result<PollHandle<T>>
    where
        T: PartialEq + Clone + Send + 'static,
        F: FnMut() -> T + Send + 'static,
    {
        let (events_tx, events_rx) = unbounded();
        let (stop_tx, stop_rx) = bounded::<()>(0);
        let interval = self.interval;
        let thread = thread::Builder::new()
            .name("tally-poll".into())
            .spawn(move || poll_loop(interval, read, events_tx, stop_rx))?;
        Ok(PollHandle {
            events: events_rx,
            stop: Some(stop_tx),
            thread: Some(thread),
        })
    }

    /// Re-read until `done` holds or `timeout` elapses, sleeping one interval
    /// between reads. Returns the satisfying value.
    pub fn poll_until<T>(
        &self,
        mut read: impl FnMut() -> T,
        mut done: impl FnMut(&T) -> bool,
        timeout: Duration,
    ) -> Option<T> {
        let deadline = Instant::now() + timeout;
        loop {
            let value = read();
            if done(&value) {
                return Some(value);
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            thread::sleep(self.interval.min(deadline - now));
        }
    }
}

fn poll_loop<T, F>(interval: Duration, mut read: F, events: Sender<PollEvent<T>>, stop: Receiver<()>)
where
    T: PartialEq + Clone,
    F: FnMut() -> T,
{
    let ticker = tick(interval);
    let mut last: Option<T> = None;
    loop {
        let value = read();
        if last.as_ref() != Some(&value) {
            last = Some(value.clone());
            let event = PollEvent {
                value,
                observed_at: SystemTime::now(),
            };
            if events.send(event).is_err() {
                break;
            }
        }

        crossbeam::select! {
            recv(stop) -> _ => break,
            recv(ticker) -> _ => {}
        }
    }
    tracing::trace!("poll loop stopped");
}

/// Running poll loop. Dropping the handle stops and joins it.
#[derive(Debug)]
pub struct PollHandle<T> {
    events: Receiver<PollEvent<T>>,
    stop: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl<T> PollHandle<T> {
    pub fn events(&self) -> &Receiver<PollEvent<T>> {
        &self.events
    }

    /// Stop the loop; returns once the poll thread has exited.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // Dropping the sender disconnects `stop`, which wakes the select.
        self.stop.take();
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            tracing::warn!("poll thread panicked");
        }
    }
}

impl<T> Drop for PollHandle<T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
