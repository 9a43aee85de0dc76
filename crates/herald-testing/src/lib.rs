//! Testing utilities for Herald events.
//!
//! - [`fixtures`]: a small network-status context family and an event factory
//! - [`Recorder`]: captures the contexts a listener received
//! - [`assert_outcomes`]: compares a report's outcomes in registration order

pub mod fixtures;

mod assertions;
mod recorder;

pub use assertions::{assert_outcomes, outcomes_of};
pub use recorder::Recorder;
