//! Role self-activation flow.

pub mod conflict;
pub mod flow;
pub mod outcome;
pub mod submit;

pub use flow::{Flow, WindDown};
pub use outcome::Outcome;
