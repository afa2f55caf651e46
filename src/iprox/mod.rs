//! The IPROX export tree: parse-time normalization and the recursive
//! target-tag filter the scrapers are built on.

pub mod matcher;
pub mod node;

pub use matcher::{filter, Extracted};
pub use node::IproxNode;
