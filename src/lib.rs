//! detangle: minimize the visual tangle between several trees over a shared
//! set of leaves by rotating their internal nodes.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
