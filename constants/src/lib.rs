#![doc = include_str!("../README.md")]
#![deny(missing_docs, reason = "all constants should document what they are")]

mod macros;

#[cfg(feature = "block")]
pub mod block;
#[cfg(feature = "hard_fork")]
pub mod hard_fork;
#[cfg(feature = "pruning")]
pub mod pruning;
