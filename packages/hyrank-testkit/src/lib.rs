//! Fixtures shared by the workspace's tests: a complete sample config and disposable Qdrant
//! collections.

mod error;

pub use error::{Error, Result};

use std::{env, thread, time::Duration};

use qdrant_client::{
	Payload, Qdrant,
	qdrant::{
		CreateCollectionBuilder, Distance, PointStruct, UpsertPointsBuilder, VectorParamsBuilder,
	},
};
use serde_json::Map;
use tokio::{runtime::Builder, time};
use uuid::Uuid;

use hyrank_config::{
	Config, EmbeddingProviderConfig, Providers, Qdrant as QdrantConfig, Ranking, Search, Service,
	Storage,
};

/// A point to seed into a [`TestCollection`].
pub struct TestPoint {
	pub id: u64,
	pub namespace: String,
	pub text: String,
	pub timestamp_ms: Option<i64>,
	pub vector: Vec<f32>,
}

/// A uniquely named Qdrant collection that is deleted on cleanup or drop.
pub struct TestCollection {
	url: String,
	name: String,
	cleaned: bool,
}
impl TestCollection {
	pub async fn new(url: &str, prefix: &str, vector_dim: u64) -> Result<Self> {
		let name = format!("{prefix}_{}", Uuid::new_v4().simple());
		let client = client(url)?;

		client
			.create_collection(
				CreateCollectionBuilder::new(name.clone())
					.vectors_config(VectorParamsBuilder::new(vector_dim, Distance::Cosine)),
			)
			.await?;

		Ok(Self { url: url.to_string(), name, cleaned: false })
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub async fn upsert(&self, points: Vec<TestPoint>) -> Result<()> {
		let client = client(&self.url)?;
		let mut structs = Vec::with_capacity(points.len());

		for point in points {
			let mut payload = serde_json::json!({
				"namespace": point.namespace,
				"text": point.text,
			});

			if let Some(ts) = point.timestamp_ms {
				payload["timestamp"] = serde_json::Value::from(ts);
			}

			let payload = Payload::try_from(payload)
				.map_err(|err| Error::Message(format!("Invalid test payload: {err}.")))?;

			structs.push(PointStruct::new(point.id, point.vector, payload));
		}

		client.upsert_points(UpsertPointsBuilder::new(self.name.clone(), structs).wait(true)).await?;

		Ok(())
	}

	pub async fn cleanup(mut self) -> Result<()> {
		delete_collection(&self.url, &self.name).await?;

		self.cleaned = true;

		Ok(())
	}
}
impl Drop for TestCollection {
	fn drop(&mut self) {
		if self.cleaned {
			return;
		}

		let url = self.url.clone();
		let name = self.name.clone();
		let cleanup_thread = thread::spawn(move || {
			let runtime = match Builder::new_current_thread().enable_all().build() {
				Ok(runtime) => runtime,
				Err(err) => {
					eprintln!("Test collection cleanup failed: {err}.");

					return;
				},
			};

			if let Err(err) = runtime.block_on(delete_collection(&url, &name)) {
				eprintln!("Test collection cleanup failed: {err}.");
			}
		});
		let _ = cleanup_thread.join();
	}
}

pub fn env_qdrant_url() -> Option<String> {
	env::var("HYRANK_QDRANT_URL").ok()
}

/// A valid config pointing at `qdrant_url`, with defaults for search and ranking.
pub fn sample_config(qdrant_url: &str, collection: &str, vector_dim: u32) -> Config {
	Config {
		service: Service { http_bind: "127.0.0.1:0".to_string(), log_level: "info".to_string() },
		storage: Storage {
			qdrant: QdrantConfig {
				url: qdrant_url.to_string(),
				collection: collection.to_string(),
				vector_dim,
				vector_name: None,
				api_key: None,
			},
		},
		providers: Providers {
			embedding: EmbeddingProviderConfig {
				provider_id: "test".to_string(),
				api_base: "http://127.0.0.1:1".to_string(),
				api_key: "test-key".to_string(),
				path: "/v1/embeddings".to_string(),
				model: "test".to_string(),
				dimensions: vector_dim,
				timeout_ms: 1_000,
				default_headers: Map::new(),
			},
		},
		search: Search::default(),
		ranking: Ranking::default(),
	}
}

fn client(url: &str) -> Result<Qdrant> {
	Ok(Qdrant::from_url(url).build()?)
}

async fn delete_collection(url: &str, name: &str) -> Result<()> {
	let client = client(url)?;

	time::timeout(Duration::from_secs(10), client.delete_collection(name.to_string()))
		.await
		.map_err(|_| Error::Message(format!("Timed out deleting Qdrant collection {name:?}.")))??;

	Ok(())
}
