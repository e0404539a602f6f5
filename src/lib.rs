//! ccscan - closed caption extraction hooks for media library scans
//!
//! Decides, per video file found during a library scan, whether the
//! `ccextractor` tool should run against it, and hands the command back to
//! the host that executes it.

pub mod cli;
pub mod config;
pub mod error;
pub mod extractor;
pub mod filters;
pub mod hooks;
pub mod lockfile;
pub mod probe;
pub mod progress;
pub mod runner;
