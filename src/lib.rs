//! 5/3/1 strength program engine.
//!
//! Generates prescribed sessions from a lifter's training maxes, folds
//! finished sessions back into the profile, and moves training maxes between
//! cycles.

pub mod achievements;
pub mod completion;
pub mod domain;
pub mod error;
pub mod formulas;
pub mod generator;
pub mod history;
pub mod profile;
pub mod progression;
pub mod report;
pub mod schedule;
pub mod server;
pub mod store;
pub mod watcher;
