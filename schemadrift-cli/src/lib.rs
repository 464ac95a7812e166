//! schemadrift CLI - compare two database schemas from the command line.
//!
//! This crate provides the `schemadrift` binary: argument parsing,
//! connection file handling, the dialect registry and styled output.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
pub mod registry;
