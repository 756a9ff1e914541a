//! Error types for the capture → spectrum → render pipeline.
//!
//! Transient presentation errors (surface out of date) never show up here: they are
//! reported as `Acquire::OutOfDate` / `Present::OutOfDate` values and handled by a
//! surface rebuild inside the render loop. Everything in [`Error`] ends the session.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while running the visualizer
#[derive(Debug, Error)]
pub enum Error {
    /// Rejected configuration value
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Audio device could not be opened or started
    #[error("audio device error: {0}")]
    Audio(String),

    /// The graphics backend could not create a required object
    #[error("graphics resource creation failed: {0}")]
    Resource(String),

    /// Surface rebuild kept failing, including retries at the last good size
    #[error("surface recreation failed after {attempts} attempts: {last}")]
    RecreateExhausted { attempts: u32, last: String },

    /// An invariant of the pipeline was broken (a logic defect, never retried)
    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolViolation),

    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        source: std::io::Error,
    },

    #[error("{0} thread panicked")]
    ThreadPanicked(&'static str),
}

/// Broken pipeline invariants
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolViolation {
    #[error("in-flight guard of frame slot {slot} not signaled within {waited:?}")]
    GuardTimeout { slot: usize, waited: Duration },

    #[error("no presentable surface image within {waited:?}")]
    AcquireTimeout { waited: Duration },

    #[error("row of {actual} points pushed into a history of {expected}-point rows")]
    RowLength { expected: usize, actual: usize },

    #[error("frame recorded or presented without an acquired surface image")]
    NoAcquiredImage,
}

pub type Result<T> = std::result::Result<T, Error>;
