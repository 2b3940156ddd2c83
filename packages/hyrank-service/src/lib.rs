pub mod search;

mod error;

pub use error::{Error, Result};
pub use search::{QueryInput, SearchItem, SearchRequest, SearchResponse};

use std::{future::Future, pin::Pin, sync::Arc};

use hyrank_config::{Config, EmbeddingProviderConfig};
use hyrank_providers::embedding;
use hyrank_storage::{models::VectorMatch, qdrant::QdrantStore};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>>;
}

/// Nearest-neighbour lookup restricted to one namespace.
pub trait VectorStore
where
	Self: Send + Sync,
{
	fn query<'a>(
		&'a self,
		vector: &'a [f32],
		limit: u64,
		namespace: &'a str,
	) -> BoxFuture<'a, Result<Vec<VectorMatch>>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub vector_store: Arc<dyn VectorStore>,
}
impl Providers {
	pub fn new(embedding: Arc<dyn EmbeddingProvider>, vector_store: Arc<dyn VectorStore>) -> Self {
		Self { embedding, vector_store }
	}

	/// Builds the HTTP embedder and the Qdrant store from configuration.
	pub fn from_config(cfg: &Config) -> Result<Self> {
		let embedding = HttpEmbedding { client: hyrank_providers::http_client()? };
		let vector_store = QdrantStore::new(&cfg.storage.qdrant)?;

		Ok(Self::new(Arc::new(embedding), Arc::new(vector_store)))
	}
}

pub struct HyrankService {
	pub cfg: Config,
	pub providers: Providers,
}
impl HyrankService {
	pub fn new(cfg: Config) -> Result<Self> {
		let providers = Providers::from_config(&cfg)?;

		Ok(Self { cfg, providers })
	}

	pub fn with_providers(cfg: Config, providers: Providers) -> Self {
		Self { cfg, providers }
	}
}

struct HttpEmbedding {
	client: reqwest::Client,
}
impl EmbeddingProvider for HttpEmbedding {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		Box::pin(async move {
			embedding::embed(&self.client, cfg, texts).await.map_err(Error::from)
		})
	}
}

impl VectorStore for QdrantStore {
	fn query<'a>(
		&'a self,
		vector: &'a [f32],
		limit: u64,
		namespace: &'a str,
	) -> BoxFuture<'a, Result<Vec<VectorMatch>>> {
		Box::pin(async move {
			QdrantStore::query(self, vector.to_vec(), limit, namespace).await.map_err(Error::from)
		})
	}
}
