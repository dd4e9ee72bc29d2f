//! # Albumin
//!
//! The command-line front end over `albumin-core`: configuration, the
//! `exiftool` and `git annex calckey` collaborators, and the CLI itself.

pub mod adapters;
pub mod cli;
pub mod config;
