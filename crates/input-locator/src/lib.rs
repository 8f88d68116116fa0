//! Input detection - find the text input a control should attach to
//!
//! This crate implements the two detection paths:
//! - Profile path: ordered selector list resolved against the usability predicate
//! - Heuristic path: weighted size/position/semantic scoring over input-like elements
//! - `InputLocator` combining both, profile first

pub mod heuristic;
pub mod locator;
pub mod resolver;
pub mod types;

pub use heuristic::*;
pub use locator::*;
pub use resolver::*;
pub use types::*;
