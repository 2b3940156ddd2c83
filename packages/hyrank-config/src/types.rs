use serde::Deserialize;
use serde_json::{Map, Value};

use hyrank_domain::LexicalNormalization;

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub search: Search,
	#[serde(default)]
	pub ranking: Ranking,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	#[serde(default = "default_log_level")]
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub qdrant: Qdrant,
}

#[derive(Debug, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub collection: String,
	pub vector_dim: u32,
	/// Name of the dense vector when the collection uses named vectors.
	#[serde(default)]
	pub vector_name: Option<String>,
	#[serde(default)]
	pub api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Search {
	pub default_top_k: u32,
	pub max_top_k: u32,
	/// Candidates fetched from the vector store per requested result.
	pub oversample_factor: u32,
	/// Budget shared by the embedding call and the vector-store call.
	pub deadline_ms: u64,
	/// Lexical score assigned to every candidate when the query arrives as a raw vector.
	pub neutral_lexical_score: f32,
}
impl Default for Search {
	fn default() -> Self {
		Self {
			default_top_k: 5,
			max_top_k: 50,
			oversample_factor: 4,
			deadline_ms: 15_000,
			neutral_lexical_score: 0.5,
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Ranking {
	pub semantic_weight: f32,
	pub keyword_weight: f32,
	pub use_recency_bias: bool,
	pub lexical: RankingLexical,
}
impl Default for Ranking {
	fn default() -> Self {
		Self {
			semantic_weight: 0.7,
			keyword_weight: 0.3,
			use_recency_bias: true,
			lexical: RankingLexical::default(),
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RankingLexical {
	pub k1: f32,
	pub b: f32,
	/// `none` or `max`, case-insensitive. Anything else fails to parse.
	pub normalization: LexicalNormalization,
}
impl Default for RankingLexical {
	fn default() -> Self {
		Self { k1: 1.2, b: 0.75, normalization: LexicalNormalization::None }
	}
}

fn default_log_level() -> String {
	"info".to_string()
}
