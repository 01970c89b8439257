#![forbid(unsafe_code)]
//! A persistent ordered map with rank indexing. See the map module for
//! details.

pub(crate) mod tree;
pub mod cursor;
pub mod error;
pub mod map;

#[cfg(test)]
mod tests;
