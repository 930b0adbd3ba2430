//! Motor Animation Engine
//!
//! Frame-driven animation of named numeric properties.
//!
//! # Features
//!
//! - **Easing**: Penner-style curves, cubic beziers, and parameterized families
//! - **Physics**: Velocity Verlet simulation with forces, boundaries, and end conditions
//! - **Closed Forms**: Analytic damped oscillators for settle-in motion
//! - **Interruptible**: A new request supersedes the running one and inherits its velocity
//! - **User Input**: Direct tracking or spring-smoothed chasing of live input
//!
//! # Example
//!
//! ```rust
//! use motor_animation::{AnimationOwner, AnimationScheduler, EaseTo, ManualFrameHost, StateBag};
//!
//! struct Dot;
//!
//! impl AnimationOwner for Dot {
//!     fn initial_state(&mut self) -> StateBag {
//!         [("x", 0.0)].into_iter().collect()
//!     }
//!
//!     fn perform_animation(&mut self, state: &StateBag) {
//!         let _ = state.get("x");
//!     }
//! }
//!
//! let host = ManualFrameHost::new();
//! let mut scheduler = AnimationScheduler::with_host(host.clone());
//! let dot = scheduler.add_owner(Dot);
//!
//! scheduler.ease_to(dot, "x", EaseTo::new(100.0).duration(0.5)).unwrap();
//! host.advance(0.5);
//! scheduler.run_pending_frame();
//!
//! assert_eq!(scheduler.value(dot, "x"), Some(100.0));
//! assert!(!scheduler.is_running());
//! ```

pub mod channel;
pub mod config;
pub mod easing;
pub mod error;
pub mod forces;
pub mod host;
pub mod owner;
pub mod registry;
pub mod request;
pub mod scheduler;
pub mod simulation;
pub mod trajectory;

pub use channel::{AnimationEnd, Channel, ChannelState, Driver, FrameStep, InputMode};
pub use config::SchedulerConfig;
pub use easing::{EaseMode, Easing};
pub use error::{AnimationError, Result};
pub use forces::{Force, PhysicalModel};
pub use host::{FrameHost, FrameToken, ManualFrameHost, SystemFrameHost};
pub use owner::{AnimationOwner, OwnerId, StateBag};
pub use registry::{CancelMode, ChannelRegistry};
pub use request::{
    AnimationRequest, Curve, DirectInput, EaseTo, EndValue, Fade, IndirectInput, SimulateToHalt,
};
pub use scheduler::AnimationScheduler;
pub use simulation::{Constraint, ElasticBoundary, EndCondition, Simulation};
pub use trajectory::{DampedOscillator, DampingRegime, Trajectory};
