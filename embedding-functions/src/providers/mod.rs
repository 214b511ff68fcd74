//! Bundled embedding providers.

pub mod echo;
pub mod ollama;
pub mod openai;
