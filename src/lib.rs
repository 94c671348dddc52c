//! brdash library
//!
//! Exposes the bounded fetch pipeline, the domain clients and the CLI
//! definitions for use by the binary and the integration tests.

pub mod cli;
pub mod data;
pub mod fetch;
pub mod forecast;
