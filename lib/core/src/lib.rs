//! Core identifiers and utilities for flowcanvas.
//!
//! This crate provides the foundational types shared by the workflow model and
//! the editor engine: typed ids, injectable clocks and id generators, and the
//! rootcause-based `Result` alias.

pub mod clock;
pub mod error;
pub mod id;

pub use clock::{Clock, FixedClock, IdGenerator, SequentialIdGenerator, SystemClock, UlidGenerator};
pub use error::Result;
pub use id::{ActionId, ParseIdError, WorkflowId};
