//! Common utilities for the chess club crates
//!
//! This crate provides the shared notation converters (squares, files,
//! ranks and pieces to and from text) used by the chess kernel
//! and the club server.

pub mod converters;

// Re-export commonly used items
pub use converters::*;
