//! Hybrid recipe search over local LLM runtimes in a strictly linted crate.

// No unsafe code outside the isolated sqlite-vec loader, no style drift.
#![deny(unsafe_code)]
#![deny(non_camel_case_types)]
#![deny(non_snake_case)]
#![deny(non_upper_case_globals)]
#![deny(nonstandard_style)]
#![deny(unused_must_use)]
#![deny(overflowing_literals)]
#![forbid(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
// Clippy discipline; panicking shortcuts stay out of non-test code.
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::panic)]
#![warn(clippy::print_stdout)]
#![warn(clippy::todo)]
#![warn(clippy::unimplemented)]
#![allow(clippy::module_name_repetitions)]

/// Hybrid search pipeline (parsing, retrieval, fusion, judging, caching).
pub mod search;
