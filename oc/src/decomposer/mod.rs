//! Expression decomposition
//!
//! Turns raw expression text into an ordered list of binary operations.
//! `*` and `/` are collapsed first, then `+` and `-` are extracted in a
//! second left-to-right pass. Chains the two passes cannot express are
//! rejected rather than silently truncated.

mod error;
mod parser;
mod token;

pub use error::ParseError;
pub use parser::decompose;
pub use token::{Token, tokenize};
