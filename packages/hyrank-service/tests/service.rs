use std::{
	sync::{
		Arc, Mutex,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration,
};

use serde_json::{Map, json};
use time::{Duration as TimeDuration, OffsetDateTime};

use hyrank_config::{Config, EmbeddingProviderConfig};
use hyrank_domain::{LexicalNormalization, candidate::unix_millis};
use hyrank_service::{
	BoxFuture, EmbeddingProvider, Error, HyrankService, Providers, QueryInput, Result,
	SearchRequest, VectorStore,
};
use hyrank_storage::models::VectorMatch;

const DIM: u32 = 3;

struct StubEmbedding {
	vector: Vec<f32>,
	calls: AtomicUsize,
}
impl StubEmbedding {
	fn new() -> Self {
		Self { vector: vec![1.0, 0.0, 0.0], calls: AtomicUsize::new(0) }
	}
}
impl EmbeddingProvider for StubEmbedding {
	fn embed<'a>(
		&'a self,
		_: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		let vectors: Vec<Vec<f32>> = texts.iter().map(|_| self.vector.clone()).collect();

		Box::pin(async move { Ok(vectors) })
	}
}

struct FailingEmbedding;
impl EmbeddingProvider for FailingEmbedding {
	fn embed<'a>(
		&'a self,
		_: &'a EmbeddingProviderConfig,
		_: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		let result: Result<Vec<Vec<f32>>> =
			Err(Error::Provider { message: "embedder unavailable".to_string() });

		Box::pin(async move { result })
	}
}

struct WrongDimEmbedding;
impl EmbeddingProvider for WrongDimEmbedding {
	fn embed<'a>(
		&'a self,
		_: &'a EmbeddingProviderConfig,
		_: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		let vectors: Vec<Vec<f32>> = vec![vec![1.0, 0.0]];

		Box::pin(async move { Ok(vectors) })
	}
}

#[derive(Debug, Clone, PartialEq)]
struct StoreCall {
	vector: Vec<f32>,
	limit: u64,
	namespace: String,
}

#[derive(Default)]
struct StubStore {
	matches: Vec<VectorMatch>,
	delay: Option<Duration>,
	fail: bool,
	calls: Mutex<Vec<StoreCall>>,
}
impl StubStore {
	fn with_matches(matches: Vec<VectorMatch>) -> Self {
		Self { matches, ..Default::default() }
	}

	fn calls(&self) -> Vec<StoreCall> {
		self.calls.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}
}
impl VectorStore for StubStore {
	fn query<'a>(
		&'a self,
		vector: &'a [f32],
		limit: u64,
		namespace: &'a str,
	) -> BoxFuture<'a, Result<Vec<VectorMatch>>> {
		self.calls.lock().unwrap_or_else(|err| err.into_inner()).push(StoreCall {
			vector: vector.to_vec(),
			limit,
			namespace: namespace.to_string(),
		});

		Box::pin(async move {
			if let Some(delay) = self.delay {
				tokio::time::sleep(delay).await;
			}
			if self.fail {
				return Err(Error::VectorStore { message: "store unavailable".to_string() });
			}

			Ok(self.matches.clone())
		})
	}
}

fn config() -> Config {
	hyrank_testkit::sample_config("http://127.0.0.1:6334", "hyrank_service_test", DIM)
}

fn service(embedding: Arc<dyn EmbeddingProvider>, store: Arc<StubStore>) -> HyrankService {
	HyrankService::with_providers(config(), Providers::new(embedding, store))
}

fn hit(id: &str, score: f32, text: &str, timestamp: Option<OffsetDateTime>) -> VectorMatch {
	let mut metadata = Map::new();

	metadata.insert("text".to_string(), json!(text));
	metadata.insert("namespace".to_string(), json!("dept-a"));

	if let Some(ts) = timestamp {
		metadata.insert("timestamp".to_string(), json!(unix_millis(ts)));
	}

	VectorMatch { id: id.to_string(), score, values: Vec::new(), metadata }
}

fn request(query: &str) -> SearchRequest {
	SearchRequest {
		query: Some(QueryInput::Text(query.to_string())),
		namespace: Some("dept-a".to_string()),
		..Default::default()
	}
}

/// `a` is fresh and on-topic, `b` is two days old and on-topic, `c` is older than four weeks and
/// shares no terms with the query.
fn scenario_pool() -> Vec<VectorMatch> {
	let now = OffsetDateTime::now_utc();

	vec![
		hit("a", 0.90, "parking policy for visitors", None),
		hit("b", 0.85, "parking rules", Some(now - TimeDuration::days(2))),
		hit("c", 0.95, "cafeteria menu", Some(now - TimeDuration::days(60))),
	]
}

fn ids(response: &hyrank_service::SearchResponse) -> Vec<&str> {
	response.items.iter().map(|item| item.id.as_str()).collect()
}

#[tokio::test]
async fn direct_fusion_prefers_lexical_matches() {
	let store = Arc::new(StubStore::with_matches(scenario_pool()));
	let service = service(Arc::new(StubEmbedding::new()), store.clone());
	let response = service
		.search(SearchRequest {
			top_k: Some(2),
			use_recency_bias: Some(false),
			semantic_weight: Some(0.7),
			keyword_weight: Some(0.3),
			..request("parking")
		})
		.await
		.expect("Search failed.");

	assert_eq!(ids(&response), ["a", "b"]);
	assert!(response.items[0].score >= response.items[1].score);
	assert_eq!(response.items[0].metadata["text"], json!("parking policy for visitors"));
}

#[tokio::test]
async fn recency_bias_keeps_fresh_relevant_results_first() {
	let store = Arc::new(StubStore::with_matches(scenario_pool()));
	let service = service(Arc::new(StubEmbedding::new()), store);
	let response = service
		.search(SearchRequest { top_k: Some(2), use_recency_bias: Some(true), ..request("parking") })
		.await
		.expect("Search failed.");

	assert_eq!(ids(&response), ["a", "b"]);
	assert!((response.items[0].score - 1.2).abs() < 1e-6);
}

#[tokio::test]
async fn text_query_is_embedded_and_pool_is_oversampled() {
	let embedding = Arc::new(StubEmbedding::new());
	let store = Arc::new(StubStore::with_matches(scenario_pool()));
	let service = service(embedding.clone(), store.clone());

	service
		.search(SearchRequest { top_k: Some(3), ..request("parking") })
		.await
		.expect("Search failed.");

	assert_eq!(embedding.calls.load(Ordering::SeqCst), 1);
	assert_eq!(
		store.calls(),
		[StoreCall { vector: vec![1.0, 0.0, 0.0], limit: 12, namespace: "dept-a".to_string() }]
	);
}

#[tokio::test]
async fn vector_query_skips_the_embedder() {
	let embedding = Arc::new(StubEmbedding::new());
	let store = Arc::new(StubStore::with_matches(scenario_pool()));
	let service = service(embedding.clone(), store.clone());
	let response = service
		.search(SearchRequest {
			query: Some(QueryInput::Vector(vec![0.0, 1.0, 0.0])),
			use_recency_bias: Some(false),
			..request("unused")
		})
		.await
		.expect("Search failed.");

	assert_eq!(embedding.calls.load(Ordering::SeqCst), 0);
	assert_eq!(store.calls()[0].vector, [0.0, 1.0, 0.0]);
	// Every candidate gets the same lexical score, so semantic order decides.
	assert_eq!(ids(&response), ["c", "a", "b"]);
}

#[tokio::test]
async fn empty_pool_returns_no_items() {
	let store = Arc::new(StubStore::default());
	let service = service(Arc::new(StubEmbedding::new()), store);
	let response = service.search(request("parking")).await.expect("Search failed.");

	assert!(response.items.is_empty());
}

#[tokio::test]
async fn results_never_exceed_top_k() {
	let now = OffsetDateTime::now_utc();
	let pool = (0..20)
		.map(|i| {
			hit(
				&format!("doc-{i}"),
				i as f32 / 20.0,
				"parking notice",
				Some(now - TimeDuration::hours(i * 13)),
			)
		})
		.collect();
	let store = Arc::new(StubStore::with_matches(pool));
	let service = service(Arc::new(StubEmbedding::new()), store);

	for use_recency_bias in [true, false] {
		let response = service
			.search(SearchRequest {
				top_k: Some(4),
				use_recency_bias: Some(use_recency_bias),
				..request("parking")
			})
			.await
			.expect("Search failed.");

		assert_eq!(response.items.len(), 4);
		assert!(response.items.windows(2).all(|pair| pair[0].score >= pair[1].score));
	}
}

#[tokio::test]
async fn embedder_failure_aborts_before_the_store() {
	let store = Arc::new(StubStore::with_matches(scenario_pool()));
	let service = service(Arc::new(FailingEmbedding), store.clone());
	let err = service.search(request("parking")).await.expect_err("Expected failure.");

	assert!(matches!(err, Error::Provider { .. }), "Unexpected error: {err:?}.");
	assert!(store.calls().is_empty());
}

#[tokio::test]
async fn embedding_dimension_mismatch_is_a_provider_error() {
	let store = Arc::new(StubStore::with_matches(scenario_pool()));
	let service = service(Arc::new(WrongDimEmbedding), store.clone());
	let err = service.search(request("parking")).await.expect_err("Expected failure.");

	assert!(matches!(err, Error::Provider { .. }), "Unexpected error: {err:?}.");
	assert!(store.calls().is_empty());
}

#[tokio::test]
async fn store_failure_is_reported() {
	let store = Arc::new(StubStore { fail: true, ..Default::default() });
	let service = service(Arc::new(StubEmbedding::new()), store);
	let err = service.search(request("parking")).await.expect_err("Expected failure.");

	assert!(matches!(err, Error::VectorStore { .. }), "Unexpected error: {err:?}.");
}

#[tokio::test]
async fn slow_store_hits_the_deadline() {
	let store = Arc::new(StubStore {
		matches: scenario_pool(),
		delay: Some(Duration::from_secs(5)),
		..Default::default()
	});
	let service = service(Arc::new(StubEmbedding::new()), store);
	let err = service
		.search(SearchRequest { deadline_ms: Some(50), ..request("parking") })
		.await
		.expect_err("Expected deadline.");

	assert!(matches!(err, Error::DeadlineExceeded { .. }), "Unexpected error: {err:?}.");
}

#[tokio::test]
async fn invalid_request_is_rejected_without_dependency_calls() {
	let embedding = Arc::new(StubEmbedding::new());
	let store = Arc::new(StubStore::with_matches(scenario_pool()));
	let service = service(embedding.clone(), store.clone());
	let err = service
		.search(SearchRequest { namespace: None, ..request("parking") })
		.await
		.expect_err("Expected invalid request.");

	match err {
		Error::InvalidRequest { field, .. } => assert_eq!(field, "$.namespace"),
		other => panic!("Unexpected error: {other:?}."),
	}
	assert_eq!(embedding.calls.load(Ordering::SeqCst), 0);
	assert!(store.calls().is_empty());
}

#[tokio::test]
async fn max_normalization_scales_lexical_scores_to_one() {
	let store = Arc::new(StubStore::with_matches(scenario_pool()));
	let mut cfg = config();

	cfg.ranking.lexical.normalization = LexicalNormalization::Max;

	let service = HyrankService::with_providers(
		cfg,
		Providers::new(Arc::new(StubEmbedding::new()), store),
	);
	let response = service
		.search(SearchRequest {
			use_recency_bias: Some(false),
			explain: true,
			..request("parking")
		})
		.await
		.expect("Search failed.");
	let best_lexical = response
		.items
		.iter()
		.filter_map(|item| item.explain.as_ref())
		.map(|explain| explain.lexical_score)
		.fold(0.0_f32, f32::max);

	assert!((best_lexical - 1.0).abs() < 1e-6);
}
