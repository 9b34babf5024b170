//! hgw-scheduler — batch-timing scheduler for hack/grow/weaken workers.
//!
//! Drives a target server to minimum security and maximum money by
//! launching waves of weaken and grow workers across every host we control,
//! timed so each wave completes at a single shared ETA.
//!
//! # Architecture
//!
//! ```text
//! Optimizer (convergence loop, one Campaign per target)
//!   ├── capacity   — free slots per host, descending
//!   ├── eta        — wave ETA and per-process start delay
//!   ├── allocator  — 1:9 weaken/grow split, host-by-host assignment
//!   ├── dispatcher — best-effort launches into a Wave
//!   └── Environment (trait) — hosts, durations, launches, liveness, sleep
//! ```
//!
//! [`sim::SimulatedNetwork`] implements [`Environment`] on a virtual clock
//! for dry runs and tests.

pub mod allocator;
pub mod capacity;
pub mod dispatcher;
pub mod env;
pub mod error;
pub mod eta;
pub mod optimizer;
pub mod sim;
pub mod wave;

pub use allocator::{Allocation, Assignment, FillOrder, ThreadSplit};
pub use capacity::{CapacitySnapshot, HostSlots};
pub use env::Environment;
pub use error::{SchedulerError, SchedulerResult};
pub use optimizer::{Campaign, Optimizer, RunMode};
pub use sim::SimulatedNetwork;
pub use wave::{ProcessHandle, Wave, WaveState};
