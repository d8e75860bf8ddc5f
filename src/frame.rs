//! Deferred "next frame" callbacks and input coalescing.
//!
//! Pointer-move bursts must produce at most one layout-affecting update per
//! frame. A [`FrameCoalescer`] keeps the latest input and the token of the one
//! pending frame; a [`FrameScheduler`] runs the frame callback later.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

/// Handle of a requested frame callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameToken(pub u64);

/// Runs a callback once on a later tick of the event loop.
pub trait FrameScheduler {
    fn request_frame(&self, callback: Box<dyn FnOnce()>) -> FrameToken;

    /// Cancel a pending callback. Unknown or already-run tokens are ignored.
    fn cancel_frame(&self, token: FrameToken);
}

#[derive(Default)]
struct ManualQueue {
    next_token: u64,
    pending: Vec<(FrameToken, Box<dyn FnOnce()>)>,
}

/// Scheduler that only runs callbacks when told to.
///
/// For headless hosts and tests. Clones share one queue.
#[derive(Clone, Default)]
pub struct ManualFrameScheduler {
    queue: Rc<RefCell<ManualQueue>>,
}

impl ManualFrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending_count(&self) -> usize {
        self.queue.borrow().pending.len()
    }

    /// Run every callback queued so far and return how many ran.
    ///
    /// Callbacks requested while running wait for the next call.
    pub fn run_frame(&self) -> usize {
        let due = std::mem::take(&mut self.queue.borrow_mut().pending);
        let count = due.len();
        for (_, callback) in due {
            callback();
        }
        count
    }
}

impl FrameScheduler for ManualFrameScheduler {
    fn request_frame(&self, callback: Box<dyn FnOnce()>) -> FrameToken {
        let mut queue = self.queue.borrow_mut();
        queue.next_token += 1;
        let token = FrameToken(queue.next_token);
        queue.pending.push((token, callback));
        token
    }

    fn cancel_frame(&self, token: FrameToken) {
        self.queue
            .borrow_mut()
            .pending
            .retain(|(pending, _)| *pending != token);
    }
}

/// Scheduler backed by single-shot [`slint::Timer`]s on the UI event loop.
#[derive(Clone)]
pub struct SlintFrameScheduler {
    interval: Duration,
    next_token: Rc<Cell<u64>>,
    timers: Rc<RefCell<HashMap<FrameToken, slint::Timer>>>,
}

impl SlintFrameScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_token: Rc::new(Cell::new(0)),
            timers: Rc::new(RefCell::new(HashMap::new())),
        }
    }
}

impl FrameScheduler for SlintFrameScheduler {
    fn request_frame(&self, callback: Box<dyn FnOnce()>) -> FrameToken {
        let token = FrameToken(self.next_token.get() + 1);
        self.next_token.set(token.0);

        let mut timers = self.timers.borrow_mut();
        timers.retain(|_, timer| timer.running());

        let timer = slint::Timer::default();
        let mut callback = Some(callback);
        timer.start(slint::TimerMode::SingleShot, self.interval, move || {
            if let Some(callback) = callback.take() {
                callback();
            }
        });
        timers.insert(token, timer);
        token
    }

    fn cancel_frame(&self, token: FrameToken) {
        if let Some(timer) = self.timers.borrow_mut().remove(&token) {
            timer.stop();
        }
    }
}

/// Latest input plus the pending frame that will consume it.
#[derive(Debug)]
pub struct FrameCoalescer<T> {
    latest: Option<T>,
    pending: Option<FrameToken>,
}

impl<T> Default for FrameCoalescer<T> {
    fn default() -> Self {
        Self {
            latest: None,
            pending: None,
        }
    }
}

impl<T> FrameCoalescer<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `input`. Returns `true` when no frame is pending and the caller
    /// must request one.
    pub fn push(&mut self, input: T) -> bool {
        self.latest = Some(input);
        if self.pending.is_some() {
            tracing::debug!("Frame already pending; input coalesced");
            return false;
        }
        true
    }

    pub fn set_pending(&mut self, token: FrameToken) {
        self.pending = Some(token);
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn latest(&self) -> Option<&T> {
        self.latest.as_ref()
    }

    /// Called from the frame callback: clear the pending token and hand out
    /// the latest input.
    pub fn take(&mut self) -> Option<T> {
        self.pending = None;
        self.latest.take()
    }

    /// Forget the input and return the token the caller must cancel.
    pub fn cancel(&mut self) -> Option<FrameToken> {
        self.latest = None;
        self.pending.take()
    }
}
