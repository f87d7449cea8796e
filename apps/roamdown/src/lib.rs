//! # roamdown
//!
//! Library side of the roamdown binary: command-line interface and
//! configuration layering around `roamdown-core`.

pub mod cli;
pub mod config;
