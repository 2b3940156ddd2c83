use std::{collections::HashMap, future::Future, time::Duration};

use serde_json::{Map, Value};
use time::OffsetDateTime;
use tokio::time::{self as tokio_time, Instant};
use uuid::Uuid;

use crate::{Error, HyrankService, Result};
use hyrank_config::Config;
use hyrank_domain::{
	Candidate, FusionConfig, FusionWeights, RankedResult, ScoreBreakdown, ScoredCandidate,
	fusion,
	lexical::{self, Bm25Params, LexicalNormalization},
	recency,
};
use hyrank_storage::models::VectorMatch;

/// Either free text, which is embedded before retrieval, or a ready query vector.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum QueryInput {
	Text(String),
	Vector(Vec<f32>),
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct SearchRequest {
	pub query: Option<QueryInput>,
	#[serde(alias = "deptId")]
	pub namespace: Option<String>,
	#[serde(alias = "topK", alias = "resultCount")]
	pub top_k: Option<u32>,
	#[serde(alias = "useRecencyBias")]
	pub use_recency_bias: Option<bool>,
	#[serde(alias = "semanticWeight")]
	pub semantic_weight: Option<f32>,
	#[serde(alias = "keywordWeight")]
	pub keyword_weight: Option<f32>,
	#[serde(alias = "deadlineMs")]
	pub deadline_ms: Option<u64>,
	#[serde(default)]
	pub explain: bool,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SearchItem {
	pub id: String,
	pub score: f32,
	pub metadata: Map<String, Value>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub explain: Option<ScoreBreakdown>,
}
impl SearchItem {
	fn from_ranked(ranked: RankedResult, explain: bool) -> Self {
		Self {
			id: ranked.id,
			score: ranked.final_score,
			metadata: ranked.metadata,
			explain: explain.then_some(ranked.breakdown),
		}
	}
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SearchResponse {
	pub request_id: Uuid,
	pub items: Vec<SearchItem>,
}

#[derive(Debug, Clone)]
struct ResolvedSearch {
	query: QueryInput,
	namespace: String,
	fusion: FusionConfig,
	deadline: Duration,
	explain: bool,
}

impl HyrankService {
	pub async fn search(&self, req: SearchRequest) -> Result<SearchResponse> {
		let request_id = Uuid::new_v4();
		let resolved = resolve_request(&self.cfg, req)?;
		let deadline = Instant::now() + resolved.deadline;

		tracing::info!(
			%request_id,
			namespace = %resolved.namespace,
			top_k = resolved.fusion.top_k,
			use_recency_bias = resolved.fusion.use_recency_bias,
			"Search started."
		);

		let vector = self.query_vector(&resolved.query, deadline).await.inspect_err(|err| {
			tracing::warn!(%request_id, error = %err, "Query embedding failed.");
		})?;
		let limit = resolved.fusion.top_k as u64 * u64::from(self.cfg.search.oversample_factor);
		let matches = with_deadline(
			deadline,
			"Vector store query",
			self.providers.vector_store.query(&vector, limit, &resolved.namespace),
		)
		.await
		.inspect_err(|err| {
			tracing::warn!(%request_id, error = %err, "Vector store query failed.");
		})?;
		let candidate_count = matches.len();
		let items = rank_matches(&self.cfg, &resolved, matches, OffsetDateTime::now_utc());

		tracing::info!(
			%request_id,
			namespace = %resolved.namespace,
			candidate_count,
			result_count = items.len(),
			"Search finished."
		);

		Ok(SearchResponse { request_id, items })
	}

	async fn query_vector(&self, query: &QueryInput, deadline: Instant) -> Result<Vec<f32>> {
		let text = match query {
			QueryInput::Vector(vector) => return Ok(vector.clone()),
			QueryInput::Text(text) => text,
		};
		let texts = [text.clone()];
		let embedded = with_deadline(
			deadline,
			"Query embedding",
			self.providers.embedding.embed(&self.cfg.providers.embedding, &texts),
		)
		.await?;
		let Some(vector) = embedded.into_iter().next() else {
			return Err(Error::Provider {
				message: "Embedding provider returned no vectors.".to_string(),
			});
		};
		let expected = self.cfg.storage.qdrant.vector_dim as usize;

		if vector.len() != expected {
			return Err(Error::Provider {
				message: format!(
					"Embedding has {} dimensions; the vector store expects {expected}.",
					vector.len()
				),
			});
		}

		Ok(vector)
	}
}

async fn with_deadline<T, F>(deadline: Instant, stage: &str, fut: F) -> Result<T>
where
	F: Future<Output = Result<T>>,
{
	match tokio_time::timeout_at(deadline, fut).await {
		Ok(result) => result,
		Err(_) => Err(Error::DeadlineExceeded {
			message: format!("{stage} did not finish before the request deadline."),
		}),
	}
}

fn resolve_request(cfg: &Config, req: SearchRequest) -> Result<ResolvedSearch> {
	let query = match req.query {
		Some(QueryInput::Text(text)) if !text.trim().is_empty() => QueryInput::Text(text),
		Some(QueryInput::Vector(vector)) => {
			validate_query_vector(&vector, cfg.storage.qdrant.vector_dim)?;

			QueryInput::Vector(vector)
		},
		_ => return Err(Error::invalid("$.query", "query is required.")),
	};
	let namespace = match req.namespace.as_deref().map(str::trim) {
		Some(namespace) if !namespace.is_empty() => namespace.to_string(),
		_ => return Err(Error::invalid("$.namespace", "namespace is required.")),
	};
	let top_k = req.top_k.unwrap_or(cfg.search.default_top_k);

	if top_k == 0 || top_k > cfg.search.max_top_k {
		return Err(Error::invalid(
			"$.top_k",
			format!("top_k must be between 1 and {}.", cfg.search.max_top_k),
		));
	}

	let semantic = resolve_weight(
		"$.semantic_weight",
		req.semantic_weight,
		cfg.ranking.semantic_weight,
	)?;
	let keyword =
		resolve_weight("$.keyword_weight", req.keyword_weight, cfg.ranking.keyword_weight)?;
	let deadline_ms = req.deadline_ms.unwrap_or(cfg.search.deadline_ms);

	if deadline_ms == 0 {
		return Err(Error::invalid("$.deadline_ms", "deadline_ms must be greater than zero."));
	}

	Ok(ResolvedSearch {
		query,
		namespace,
		fusion: FusionConfig {
			weights: FusionWeights { semantic, keyword },
			use_recency_bias: req.use_recency_bias.unwrap_or(cfg.ranking.use_recency_bias),
			top_k: top_k as usize,
			lexical_normalization: cfg.ranking.lexical.normalization,
		},
		deadline: Duration::from_millis(deadline_ms),
		explain: req.explain,
	})
}

fn validate_query_vector(vector: &[f32], vector_dim: u32) -> Result<()> {
	if vector.is_empty() {
		return Err(Error::invalid("$.query", "query is required."));
	}
	if vector.len() != vector_dim as usize {
		return Err(Error::invalid(
			"$.query",
			format!("query vector must have {vector_dim} dimensions."),
		));
	}
	if vector.iter().any(|value| !value.is_finite()) {
		return Err(Error::invalid("$.query", "query vector must contain finite numbers."));
	}

	Ok(())
}

fn resolve_weight(field: &str, requested: Option<f32>, default: f32) -> Result<f32> {
	let weight = requested.unwrap_or(default);

	if !weight.is_finite() || weight < 0.0 {
		let name = field.trim_start_matches("$.");

		return Err(Error::invalid(field, format!("{name} must be a non-negative number.")));
	}

	Ok(weight)
}

fn rank_matches(
	cfg: &Config,
	resolved: &ResolvedSearch,
	matches: Vec<VectorMatch>,
	now: OffsetDateTime,
) -> Vec<SearchItem> {
	let candidates: Vec<Candidate> = matches.into_iter().map(candidate_from_match).collect();

	if candidates.is_empty() {
		return Vec::new();
	}

	let params = Bm25Params { k1: cfg.ranking.lexical.k1, b: cfg.ranking.lexical.b };
	let lexical_by_id = lexical_scores(
		&resolved.query,
		&candidates,
		params,
		resolved.fusion.lexical_normalization,
		cfg.search.neutral_lexical_score,
	);
	let scored: Vec<ScoredCandidate<'_>> = candidates
		.iter()
		.map(|candidate| ScoredCandidate {
			candidate,
			lexical_score: lexical_by_id.get(candidate.id.as_str()).copied().unwrap_or(0.0),
		})
		.collect();
	let FusionConfig { weights, use_recency_bias, top_k, .. } = resolved.fusion;
	let ranked = if use_recency_bias {
		tracing::debug!(candidates = scored.len(), top_k, "Ranking with recency bias.");

		recency::apply_recency_bias(&scored, top_k, now)
	} else {
		tracing::debug!(candidates = scored.len(), top_k, "Ranking by fused score.");

		fusion::rank_direct(&scored, weights, top_k)
	};

	ranked.into_iter().map(|result| SearchItem::from_ranked(result, resolved.explain)).collect()
}

fn candidate_from_match(hit: VectorMatch) -> Candidate {
	let text = match hit.text() {
		Some(text) => text.to_string(),
		None => {
			tracing::debug!(id = %hit.id, "Vector match has no text payload.");

			String::new()
		},
	};

	Candidate {
		id: hit.id,
		values: hit.values,
		text,
		metadata: hit.metadata,
		semantic_score: hit.score,
	}
}

/// Lexical score per candidate id. A vector query has no terms, so every candidate gets `neutral`.
fn lexical_scores<'a>(
	query: &QueryInput,
	candidates: &'a [Candidate],
	params: Bm25Params,
	normalization: LexicalNormalization,
	neutral: f32,
) -> HashMap<&'a str, f32> {
	let text = match query {
		QueryInput::Text(text) => text,
		QueryInput::Vector(_) =>
			return candidates.iter().map(|candidate| (candidate.id.as_str(), neutral)).collect(),
	};
	let documents: Vec<&str> = candidates.iter().map(|candidate| candidate.text.as_str()).collect();
	let mut matches = lexical::rank_batch(text, &documents, documents.len(), params);

	lexical::normalize(&mut matches, normalization);

	matches
		.into_iter()
		.map(|lexical| (candidates[lexical.index].id.as_str(), lexical.score))
		.collect()
}
