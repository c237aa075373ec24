//! # Scanweave CLI Library
//!
//! Command-line front end for importing scan files into network graphs.
//! State is kept in a JSON snapshot so successive imports accumulate.

pub mod commands;

pub use commands::*;
