//! Pluggable embedding functions for vector collections.
//!
//! This crate provides:
//! - [`DistanceMetric`]: the similarity spaces a collection can use
//! - [`EmbeddingFunction`]: the provider contract (create/update/generate/hydrate)
//! - bundled providers: echo (pass-through), OpenAI and Ollama
//! - [`EmbeddingFunctionRegistry`]: provider lookup and hydration by name
//!
//! Credentials are resolved through a [`SecretSource`] given to providers at
//! construction; the process environment is only ever read.

pub mod config;
pub mod errors;
pub mod function;
pub mod metric;
pub mod providers;
pub mod registry;
pub mod telemetry;

pub use config::function_config::EmbeddingFunctionConfig;
pub use config::provider_settings::ProviderSettings;
pub use config::secret_source::SecretSource;
pub use errors::EmbeddingError;
pub use function::{EmbeddedText, EmbeddingFunction, EmbeddingFuture};
pub use metric::DistanceMetric;
pub use providers::{
    echo::EchoEmbeddingFunction, ollama::OllamaEmbeddingFunction,
    openai::OpenAiEmbeddingFunction,
};
pub use registry::EmbeddingFunctionRegistry;
