//! Command-line interface for the `symbridge` binary

pub mod args;

pub use args::{Args, OutputFormat};
