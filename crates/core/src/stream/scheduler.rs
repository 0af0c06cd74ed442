use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::{FrameStream, Tick};
use crate::error::{Result, RtspError};

/// Periodic frame delivery on a dedicated thread.
///
/// Ticks fire at a fixed rate starting immediately. The first tick that
/// finds the frame limit reached ends the thread.
///
/// The stop channel is the cancellation token: dropping the sender wakes
/// the thread, which exits before its next tick. [`stop`](Self::stop)
/// drops the sender and joins, so once it returns no further datagram can
/// be sent, even if a tick was mid-send when it was called.
pub struct FrameScheduler {
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<FrameStream>>,
}

impl FrameScheduler {
    /// Move `stream` onto a new thread and start ticking every `period`.
    pub fn start(stream: FrameStream, period: Duration) -> Result<Self> {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let handle = thread::Builder::new()
            .name("frame-scheduler".to_string())
            .spawn(move || run(stream, period, stop_rx))?;

        Ok(Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        })
    }

    /// Whether the thread has exited on its own (frame limit reached).
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(|h| h.is_finished())
    }

    /// Stop ticking and hand the stream back.
    ///
    /// Blocks until the scheduler thread has exited. Returns `Ok(None)` if
    /// already stopped.
    pub fn stop(&mut self) -> Result<Option<FrameStream>> {
        drop(self.stop_tx.take());

        match self.handle.take() {
            Some(handle) => handle
                .join()
                .map(Some)
                .map_err(|_| RtspError::Io(std::io::Error::other("frame scheduler panicked"))),
            None => Ok(None),
        }
    }
}

impl Drop for FrameScheduler {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            tracing::error!(error = %e, "frame scheduler did not stop cleanly");
        }
    }
}

fn run(mut stream: FrameStream, period: Duration, stop_rx: mpsc::Receiver<()>) -> FrameStream {
    tracing::debug!(dest = %stream.dest(), ?period, "frame scheduler started");

    let mut next = Instant::now();
    loop {
        let wait = next.saturating_duration_since(Instant::now());
        match stop_rx.recv_timeout(wait) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }

        if stream.tick() == Tick::Finished {
            break;
        }

        next += period;
        let now = Instant::now();
        if now > next + period {
            // Fell more than a period behind; drop the backlog instead of bursting.
            next = now;
        }
    }

    tracing::debug!(frames = stream.frame_number(), "frame scheduler stopped");
    stream
}
