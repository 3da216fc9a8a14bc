//! CLI module for ever-thinker - command-line interface and subcommands.

pub mod commands;

pub use commands::Cli;
