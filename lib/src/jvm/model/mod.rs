//! Semantic representations of what the backend hands to the repair pass

mod method;

pub use method::*;
