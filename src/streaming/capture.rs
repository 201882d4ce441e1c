//! Bounded handoff between a capture source and the session

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

use crate::audio::AudioFrame;
use crate::error::RaopError;
use crate::session::RaopSession;
use crate::types::BackpressurePolicy;

#[derive(Debug, Default)]
struct Inner {
    frames: VecDeque<AudioFrame>,
    closed: bool,
}

/// Bounded frame queue with an explicit backpressure policy
///
/// Any number of producers may `push`; one consumer `pop`s. After
/// [`close`](Self::close) pushes fail and `pop` drains what is left, then
/// returns `None`.
#[derive(Debug)]
pub struct CaptureQueue {
    inner: Mutex<Inner>,
    capacity: usize,
    policy: BackpressurePolicy,
    items: Notify,
    space: Notify,
    dropped: AtomicU64,
}

impl CaptureQueue {
    /// Create a queue holding at most `capacity` frames (at least 1)
    #[must_use]
    pub fn new(capacity: usize, policy: BackpressurePolicy) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(Inner {
                frames: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            capacity,
            policy,
            items: Notify::new(),
            space: Notify::new(),
            dropped: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue one 1408-byte PCM chunk
    ///
    /// With `DropOldest` a full queue evicts its oldest frame; with `Block`
    /// this waits for the consumer.
    ///
    /// # Errors
    /// Returns `InvalidFrame` for a chunk of the wrong size and
    /// `InvalidState` once the queue is closed.
    pub async fn push(&self, pcm: impl Into<bytes::Bytes>) -> Result<(), RaopError> {
        let frame = AudioFrame::new(pcm)?;

        loop {
            let space = self.space.notified();
            tokio::pin!(space);
            space.as_mut().enable();

            {
                let mut inner = self.lock();
                if inner.closed {
                    return Err(RaopError::invalid_state("capture queue is closed", "closed"));
                }
                if inner.frames.len() < self.capacity {
                    inner.frames.push_back(frame);
                    drop(inner);
                    self.items.notify_one();
                    return Ok(());
                }
                if self.policy == BackpressurePolicy::DropOldest {
                    inner.frames.pop_front();
                    inner.frames.push_back(frame);
                    drop(inner);
                    let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                    tracing::trace!(total, "capture queue full, oldest frame dropped");
                    self.items.notify_one();
                    return Ok(());
                }
            }

            space.await;
        }
    }

    /// Take the next frame, waiting if the queue is empty
    ///
    /// Returns `None` once the queue is closed and drained.
    pub async fn pop(&self) -> Option<AudioFrame> {
        loop {
            let items = self.items.notified();
            tokio::pin!(items);
            items.as_mut().enable();

            {
                let mut inner = self.lock();
                if let Some(frame) = inner.frames.pop_front() {
                    drop(inner);
                    self.space.notify_one();
                    return Some(frame);
                }
                if inner.closed {
                    return None;
                }
            }

            items.await;
        }
    }

    /// Stop accepting frames and wake every waiter
    pub fn close(&self) {
        self.lock().closed = true;
        self.items.notify_waiters();
        self.space.notify_waiters();
    }

    /// Whether [`close`](Self::close) was called
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Frames currently queued
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().frames.len()
    }

    /// Whether no frame is queued
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().frames.is_empty()
    }

    /// Maximum number of queued frames
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Frames evicted by `DropOldest`
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Forward queued frames to `session` until the queue is closed and drained
///
/// Evictions since the last frame are added to the session's dropped count.
/// Returns the number of frames handed to the session.
///
/// # Errors
/// Returns `InvalidState` if the session stops streaming while frames are
/// still arriving.
pub async fn pump(session: &mut RaopSession, queue: &CaptureQueue) -> Result<u64, RaopError> {
    let mut forwarded = 0u64;
    let mut evictions_seen = 0u64;

    while let Some(frame) = queue.pop().await {
        let evicted = queue.dropped();
        if evicted > evictions_seen {
            session.record_dropped(evicted - evictions_seen);
            evictions_seen = evicted;
        }
        session.send_frame(frame.as_bytes()).await?;
        forwarded += 1;
    }

    let evicted = queue.dropped();
    if evicted > evictions_seen {
        session.record_dropped(evicted - evictions_seen);
    }
    tracing::debug!(forwarded, dropped = evicted, "capture pump finished");
    Ok(forwarded)
}
