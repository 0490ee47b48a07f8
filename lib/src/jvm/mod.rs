//! Minimal model of JVM method bodies
//!
//! Only as much of the JVM as the stack repair needs is modelled here: labels, a symbolic
//! instruction set, the pseudo-instructions the repair emits, exception tables, and a textual
//! listing format for reading and writing method bodies.

pub mod code;
mod errors;
pub mod model;
mod names;

pub use errors::*;
pub use names::*;
