//! Stack machine executing generated instruction listings
//!
//! - [`machine`]: the [`Machine`] loop and instruction semantics
//! - [`value`]: tagged runtime values
//! - [`heap`]: cell blocks for arrays and the string heap
//! - [`terminal`]: captured output
//! - [`errors`]: runtime errors
//!
//! # Memory Model
//!
//! Globals are a growable vector of slots written by `storeg`. Arrays live
//! in heap blocks created by `allocn` and are reached through
//! [`Value::Addr`]. Strings are immutable and stored once in the string
//! heap; the stack only carries references.

pub mod errors;
pub mod heap;
pub mod machine;
pub mod terminal;
pub mod value;

pub use errors::VmError;
pub use machine::Machine;
pub use terminal::Terminal;
pub use value::Value;
