//! Shared chainfold model types.
//!
//! Pure data and naming code used by both the engine and the CLI: the
//! column-linkage DSL document, the batch artifact naming scheme, and the
//! prover's load-info manifest.

#![warn(clippy::pedantic)]

pub mod dsl;
pub mod manifest;
pub mod naming;
