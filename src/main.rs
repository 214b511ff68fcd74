use std::error::Error;
use std::sync::Arc;

use collection_store::{
    CollectionStore, CreateCollectionConfig, QueryCollectionConfig, QueryRequest, StoreConfig,
};
use colored::Colorize;
use embedding_functions::{EmbeddingFunctionRegistry, ProviderSettings, telemetry};
use serde_json::json;
use tracing::{Level, info, warn};
use tracing_subscriber::{
    Layer, filter, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

const COLLECTION: &str = "test";
const API_KEY_ENV_VAR: &str = "MY_OPENAI_API_KEY";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // A missing .env is fine; the process environment is used as is.
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(telemetry::env_filter_with_level("info", Level::INFO))
        .with(
            fmt::layer()
                .with_target(false)
                .with_filter(filter::filter_fn(|meta| {
                    !telemetry::is_library_target(meta.target())
                })),
        )
        .with(telemetry::layer())
        .try_init()?;

    let settings = ProviderSettings::from_env()?;
    let store_cfg = StoreConfig::from_env()?;
    let registry = Arc::new(EmbeddingFunctionRegistry::with_defaults(&settings)?);

    if std::env::var_os("OPENAI_KEY").is_some() && settings.secrets.lookup(API_KEY_ENV_VAR).is_none()
    {
        warn!(
            "OPENAI_KEY is set but {API_KEY_ENV_VAR} is not; the collection's embedding function reads {API_KEY_ENV_VAR}"
        );
    }

    let openai = registry.require("openai")?;
    let embedding_function = openai.create(json!({
        "model": "text-embedding-ada-002",
        "api_key_env_var": API_KEY_ENV_VAR,
    }));

    let store = CollectionStore::new(&store_cfg, registry)?;
    let config = CreateCollectionConfig::builder()
        .with_embedding_function(embedding_function)
        .with_hnsw(|h| h.with_ef_construction(100))
        .build()?;
    let collection = store.create_collection(COLLECTION, 3, config).await?;
    info!(
        "collection '{}' ready (metric={})",
        collection.name(),
        collection.metric()
    );

    let query_cfg = QueryCollectionConfig::builder()
        .with_hnsw(|h| h.with_ef_search(100))
        .build()?;
    let result = collection
        .query(
            QueryRequest::by_embeddings(vec![vec![0.1, 0.2, 0.3]])
                .with_n_results(10)
                .with_config(query_cfg),
        )
        .await?;

    for (i, hits) in result.hits.iter().enumerate() {
        println!("{} {} ({} hits)", "query".bold(), i, hits.len());
        for hit in hits {
            println!(
                "  {} {:.4} {}",
                hit.id.green(),
                hit.score,
                hit.document.as_deref().unwrap_or("-").dimmed()
            );
        }
    }

    Ok(())
}
