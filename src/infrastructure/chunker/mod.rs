//! Chunking strategy implementations

pub mod boundary;

pub use boundary::BoundaryChunker;
