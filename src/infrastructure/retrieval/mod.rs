//! Retrieval implementation

pub mod retriever;

pub use retriever::Retriever;
