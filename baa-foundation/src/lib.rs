//! Foundational types for the Baa compiler front end.

pub mod arabic;
pub mod errors;
pub mod span;
