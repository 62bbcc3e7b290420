// src/exec/mod.rs

//! Process execution layer.
//!
//! Transform tasks stay in-process; only the optional `[tools]` commands
//! from the theme config spawn OS processes, through [`command`].

pub mod command;

pub use command::{CommandOutput, expand_command, run_with_stdin};
