//! Answer generation implementation

pub mod generator;

pub use generator::{AnswerGenerator, GeneratorConfig};
