//! Domain layer types and invariants.

pub mod advisory;
pub mod filter;
pub mod normalize;
pub mod timestamp;
