//! Flow CLI
//!
//! Flavor-aware build, run, asset generation and release commands for
//! Flutter projects. The binary is a thin shell over this library.

pub mod cli;
pub mod commands;
pub mod output;
