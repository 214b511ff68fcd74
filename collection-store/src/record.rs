//! Request and result models for collection ingestion and queries.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::collection_config::QueryCollectionConfig;
use crate::database::ScoredRecord;

/// Payload keys written for every point.
pub(crate) const PAYLOAD_ID: &str = "id";
pub(crate) const PAYLOAD_DOCUMENT: &str = "document";
pub(crate) const PAYLOAD_METADATA: &str = "metadata";

pub const DEFAULT_N_RESULTS: u64 = 10;

/// Records to add to a collection.
///
/// Every optional column, when present, must have one entry per id.
/// When `embeddings` is `None` the documents are embedded with the
/// collection's embedding function.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddRequest {
    pub ids: Vec<String>,
    #[serde(default)]
    pub documents: Option<Vec<String>>,
    #[serde(default)]
    pub metadatas: Option<Vec<Value>>,
    #[serde(default)]
    pub embeddings: Option<Vec<Vec<f32>>>,
}

impl AddRequest {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_documents<I, S>(mut self, documents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.documents = Some(documents.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_metadatas(mut self, metadatas: Vec<Value>) -> Self {
        self.metadatas = Some(metadatas);
        self
    }

    pub fn with_embeddings(mut self, embeddings: Vec<Vec<f32>>) -> Self {
        self.embeddings = Some(embeddings);
        self
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// What to search with.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryInput {
    /// Precomputed query vectors.
    Embeddings(Vec<Vec<f32>>),
    /// Query texts, embedded before searching.
    Texts(Vec<String>),
}

/// A query against one collection. One hit list is returned per input.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub input: QueryInput,
    pub n_results: u64,
    pub config: QueryCollectionConfig,
}

impl QueryRequest {
    pub fn by_embeddings(embeddings: Vec<Vec<f32>>) -> Self {
        Self {
            input: QueryInput::Embeddings(embeddings),
            n_results: DEFAULT_N_RESULTS,
            config: QueryCollectionConfig::default(),
        }
    }

    pub fn by_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            input: QueryInput::Texts(texts.into_iter().map(Into::into).collect()),
            n_results: DEFAULT_N_RESULTS,
            config: QueryCollectionConfig::default(),
        }
    }

    pub fn with_n_results(mut self, n_results: u64) -> Self {
        self.n_results = n_results;
        self
    }

    pub fn with_config(mut self, config: QueryCollectionConfig) -> Self {
        self.config = config;
        self
    }
}

/// One search hit, mapped back from the stored payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryHit {
    /// Caller-supplied id (not the internal point UUID).
    pub id: String,
    pub score: f32,
    pub document: Option<String>,
    pub metadata: Value,
}

impl From<ScoredRecord> for QueryHit {
    fn from(r: ScoredRecord) -> Self {
        let id = r
            .payload
            .get(PAYLOAD_ID)
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or(r.id);
        let document = r
            .payload
            .get(PAYLOAD_DOCUMENT)
            .and_then(Value::as_str)
            .map(str::to_string);
        let metadata = r
            .payload
            .get(PAYLOAD_METADATA)
            .cloned()
            .unwrap_or(Value::Null);
        Self {
            id,
            score: r.score,
            document,
            metadata,
        }
    }
}

/// Hits per query input, in input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub hits: Vec<Vec<QueryHit>>,
}

impl QueryResult {
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Best hit for the `i`-th query input.
    pub fn best(&self, i: usize) -> Option<&QueryHit> {
        self.hits.get(i).and_then(|h| h.first())
    }
}
