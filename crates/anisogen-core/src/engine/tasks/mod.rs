//! The stages of one generation.
//!
//! Each submodule is a single stage with a `run` entry point taking explicit
//! inputs and returning explicit outputs; the generational driver in
//! [`crate::workflows::search`] wires them together.

pub mod assembly;
pub mod donor_index;
pub mod evaluation;
pub mod mutation;
pub mod selection;
