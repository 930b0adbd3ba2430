//! Frame hosts
//!
//! The scheduler never owns a render loop. It asks a [`FrameHost`] for a
//! frame callback and the embedder calls
//! [`AnimationScheduler::on_frame`](crate::AnimationScheduler::on_frame) with
//! the token it was given.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Identifies one requested frame callback
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameToken(pub u64);

/// Source of frame callbacks and time
pub trait FrameHost {
    /// Ask for one frame callback
    fn request_frame(&mut self) -> FrameToken;

    /// Withdraw a previously requested callback
    fn cancel_frame(&mut self, token: FrameToken);

    /// Monotonic time in seconds
    fn now(&self) -> f64;
}

#[derive(Debug, Default)]
struct ManualClock {
    now: f64,
    next_token: u64,
    pending: Option<FrameToken>,
    requests: u64,
    cancels: u64,
}

/// Host driven by hand, for tests and headless runs
///
/// Clones share the same clock, so a test can keep one handle while the
/// scheduler owns another.
#[derive(Clone, Debug, Default)]
pub struct ManualFrameHost {
    clock: Rc<RefCell<ManualClock>>,
}

impl ManualFrameHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Host whose clock starts at `now`
    pub fn starting_at(now: f64) -> Self {
        let host = Self::new();
        host.set_time(now);
        host
    }

    pub fn set_time(&self, now: f64) {
        self.clock.borrow_mut().now = now;
    }

    /// Move the clock forward by `dt` seconds
    pub fn advance(&self, dt: f64) {
        self.clock.borrow_mut().now += dt;
    }

    /// The outstanding frame request, if any
    pub fn pending(&self) -> Option<FrameToken> {
        self.clock.borrow().pending
    }

    /// Number of frames requested so far
    pub fn request_count(&self) -> u64 {
        self.clock.borrow().requests
    }

    /// Number of frame requests withdrawn so far
    pub fn cancel_count(&self) -> u64 {
        self.clock.borrow().cancels
    }
}

impl FrameHost for ManualFrameHost {
    fn request_frame(&mut self) -> FrameToken {
        let mut clock = self.clock.borrow_mut();
        clock.next_token += 1;
        clock.requests += 1;
        let token = FrameToken(clock.next_token);
        clock.pending = Some(token);
        token
    }

    fn cancel_frame(&mut self, token: FrameToken) {
        let mut clock = self.clock.borrow_mut();
        if clock.pending == Some(token) {
            clock.pending = None;
            clock.cancels += 1;
        }
    }

    fn now(&self) -> f64 {
        self.clock.borrow().now
    }
}

/// Host backed by the system clock
///
/// Tokens are handed out in order; the embedder sleeps for
/// [`frame_interval`](Self::frame_interval) between frames.
#[derive(Debug)]
pub struct SystemFrameHost {
    origin: Instant,
    next_token: u64,
    target_fps: u32,
}

impl SystemFrameHost {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            next_token: 0,
            target_fps: 60,
        }
    }

    pub fn set_target_fps(&mut self, fps: u32) {
        self.target_fps = fps.max(1);
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.target_fps as f64)
    }
}

impl Default for SystemFrameHost {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameHost for SystemFrameHost {
    fn request_frame(&mut self) -> FrameToken {
        self.next_token += 1;
        FrameToken(self.next_token)
    }

    fn cancel_frame(&mut self, token: FrameToken) {
        tracing::trace!("Frame request {} withdrawn", token.0);
    }

    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_host_shares_clock() {
        let handle = ManualFrameHost::starting_at(1.0);
        let mut host = handle.clone();

        handle.advance(0.5);
        assert_eq!(host.now(), 1.5);

        let first = host.request_frame();
        let second = host.request_frame();
        assert_ne!(first, second);
        assert_eq!(handle.pending(), Some(second));
        assert_eq!(handle.request_count(), 2);

        host.cancel_frame(first);
        assert_eq!(handle.cancel_count(), 0);
        host.cancel_frame(second);
        assert_eq!(handle.pending(), None);
        assert_eq!(handle.cancel_count(), 1);
    }

    #[test]
    fn test_system_host_interval() {
        let mut host = SystemFrameHost::new();
        host.set_target_fps(120);
        assert_eq!(host.frame_interval(), Duration::from_secs_f64(1.0 / 120.0));
        assert!(host.now() >= 0.0);
    }
}
