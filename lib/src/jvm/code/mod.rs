//! Method body representation
//!
//! ### Structure
//!
//! A method body is an [`InstructionStream`]: an ordered sequence of [`Node`]s, where a node is
//! either a real [`Instruction`], a [`SynLabel`] marking a position, or a [`PseudoInsn`] that
//! only exists for the benefit of later compiler passes. Alongside the stream sits the exception
//! table, a list of [`ExceptionHandler`] entries naming positions by label.
//!
//! Labels are plain handles: they carry no data, and two labels are the same only if they were
//! produced by the same call to [`LabelGenerator::fresh_label`].
//!
//! ### Listings
//!
//! For debugging and testing, method bodies can be read from and rendered to a line-oriented
//! text format (see [`parse_listing`] and [`render_listing`]).

mod code;
mod exception_table;
mod instructions;
mod label;
mod listing;
mod stream;

pub use code::*;
pub use exception_table::*;
pub use instructions::*;
pub use label::*;
pub use listing::*;
pub use stream::*;
