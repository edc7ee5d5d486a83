//! Foundational types for thermand.
//!
//! This crate provides the identifier, error-code, and time-source types
//! shared by every layer of the thermand (adaptive thermal management
//! daemon) architecture.
//!
//! # Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      SDK Layer                              │
//! │  (stable surface for out-of-tree processes)                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  thermand-types   : EntityId, ErrorCode, Clock  ◄── HERE    │
//! │  thermand-state   : Device, State, StateMap                 │
//! │  thermand-process : Process trait, Pipeline, System         │
//! └─────────────────────────────────────────────────────────────┘
//!                               ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Runtime Layer                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  thermand-runtime : runners, config, built-in processes     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Identifier Design
//!
//! All identifiers are UUID-based. Hardware-backed entities (devices
//! discovered on a machine) use deterministic UUID v5 so they keep the
//! same identity across daemon restarts; everything else uses random
//! UUID v4.
//!
//! # Time Design
//!
//! All timestamps and intervals in thermand are monotonic nanoseconds.
//! Code reads the current time through [`time::now_ns`], which consults
//! a thread-local [`time::Clock`] installed by whichever runner drives
//! the calling thread. A simulated clock installed there makes hours of
//! thermal behaviour testable in milliseconds, with no changes to the
//! code under test.

mod error;
mod id;
pub mod time;

pub use error::{assert_error_code, assert_error_codes, ErrorCode};
pub use id::EntityId;
