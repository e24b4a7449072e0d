//! Line framer
//!
//! Turns the byte stream of an open link into newline-delimited frames. The
//! framer runs on its own thread because serial reads block; every event it
//! produces is tagged with the link generation so the coordinator can ignore
//! stragglers from a link that has since been closed.
//!
//! The event channel is bounded. Frames that do not fit are dropped and
//! counted; `Closed` and `Failed` are retried until they fit or the framer
//! is stopped.

use crate::error::{MoniError, Result};
use crossbeam_channel::{SendTimeoutError, Sender, TrySendError};
use std::io::{ErrorKind, Read};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Size of a single read from the port
const READ_CHUNK: usize = 1024;

/// Capacity of the link event channel between framer and coordinator
pub const LINK_EVENT_CAPACITY: usize = 4_096;

/// Wait between retries of an end-of-stream event on a full channel
const CONTROL_RETRY: Duration = Duration::from_millis(20);

/// Event produced by a framer thread
#[derive(Debug, Clone, PartialEq)]
pub struct LinkEvent {
    /// Generation of the link that produced this event
    pub generation: u64,
    pub kind: LinkEventKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LinkEventKind {
    /// One complete line, without its terminator
    Frame(String),
    /// The stream ended
    Closed,
    /// Reading failed
    Failed(String),
}

/// Splits incoming bytes into lines
#[derive(Debug)]
pub struct LineSplitter {
    buffer: Vec<u8>,
    max_line: usize,
    overflowed: bool,
}

impl LineSplitter {
    pub fn new(max_line: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(max_line),
            max_line,
            overflowed: false,
        }
    }

    /// Feed bytes and collect every line they complete
    ///
    /// Lines longer than `max_line` are dropped whole.
    pub fn push(&mut self, bytes: &[u8], out: &mut Vec<String>) {
        for &byte in bytes {
            if byte == b'\n' {
                if self.overflowed {
                    tracing::debug!("Dropped over-long line");
                } else {
                    out.push(String::from_utf8_lossy(&self.buffer).into_owned());
                }
                self.buffer.clear();
                self.overflowed = false;
            } else if self.buffer.len() >= self.max_line {
                self.overflowed = true;
            } else {
                self.buffer.push(byte);
            }
        }
    }
}

/// Handle to a running framer thread
pub struct FramerHandle {
    stop: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
    thread: Option<JoinHandle<()>>,
}

impl FramerHandle {
    /// Signal the thread and wait for it to exit
    ///
    /// Returns once the current read has timed out, so the wait is bounded by
    /// the link's read timeout.
    pub fn stop(&mut self) -> Result<()> {
        self.stop.store(true, Ordering::SeqCst);
        match self.thread.take() {
            Some(thread) => thread
                .join()
                .map_err(|_| MoniError::Channel("Framer thread panicked".to_string())),
            None => Ok(()),
        }
    }

    /// Frames dropped because the event channel was full
    pub fn dropped_frames(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for FramerHandle {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

/// Start a framer thread reading from `reader`
pub fn spawn_framer(
    mut reader: Box<dyn Read + Send>,
    generation: u64,
    tx: Sender<LinkEvent>,
    max_line: usize,
) -> Result<FramerHandle> {
    let stop = Arc::new(AtomicBool::new(false));
    let dropped = Arc::new(AtomicU64::new(0));
    let thread_stop = stop.clone();
    let thread_dropped = dropped.clone();

    let thread = std::thread::Builder::new()
        .name(format!("framer-{}", generation))
        .spawn(move || {
            let mut splitter = LineSplitter::new(max_line);
            let mut chunk = [0u8; READ_CHUNK];
            let mut lines = Vec::new();

            // false once the coordinator is gone
            let send_frame = |line: String| {
                match tx.try_send(LinkEvent {
                    generation,
                    kind: LinkEventKind::Frame(line),
                }) {
                    Ok(()) => true,
                    Err(TrySendError::Full(_)) => {
                        let total = thread_dropped.fetch_add(1, Ordering::Relaxed) + 1;
                        if total.is_power_of_two() {
                            tracing::warn!(
                                "Framer {}: event channel full, {} frames dropped",
                                generation,
                                total
                            );
                        }
                        true
                    }
                    Err(TrySendError::Disconnected(_)) => false,
                }
            };
            let send_control = |kind: LinkEventKind| {
                let mut event = LinkEvent { generation, kind };
                while !thread_stop.load(Ordering::SeqCst) {
                    match tx.send_timeout(event, CONTROL_RETRY) {
                        Ok(()) | Err(SendTimeoutError::Disconnected(_)) => return,
                        Err(SendTimeoutError::Timeout(back)) => event = back,
                    }
                }
            };

            tracing::debug!("Framer {} started", generation);
            while !thread_stop.load(Ordering::SeqCst) {
                match reader.read(&mut chunk) {
                    Ok(0) => {
                        send_control(LinkEventKind::Closed);
                        break;
                    }
                    Ok(n) => {
                        splitter.push(&chunk[..n], &mut lines);
                        if !lines.drain(..).all(send_frame) {
                            break;
                        }
                    }
                    Err(e)
                        if matches!(
                            e.kind(),
                            ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                        ) => {}
                    Err(e) => {
                        send_control(LinkEventKind::Failed(e.to_string()));
                        break;
                    }
                }
            }
            tracing::debug!("Framer {} stopped", generation);
        })?;

    Ok(FramerHandle {
        stop,
        dropped,
        thread: Some(thread),
    })
}
