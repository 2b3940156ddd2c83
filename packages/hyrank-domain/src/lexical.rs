//! BM25 relevance between a query and the documents of one candidate pool.
//!
//! Statistics come from the pool itself, not from a corpus-wide index, so scores are only
//! comparable within a single request.

use serde::{Deserialize, Deserializer, de};

use crate::fusion::cmp_f32_desc;

pub const DEFAULT_K1: f32 = 1.2;
pub const DEFAULT_B: f32 = 0.75;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bm25Params {
	/// Term-frequency saturation.
	pub k1: f32,
	/// Document-length normalization strength, in `[0, 1]`.
	pub b: f32,
}
impl Default for Bm25Params {
	fn default() -> Self {
		Self { k1: DEFAULT_K1, b: DEFAULT_B }
	}
}

/// Rescaling applied to a pool's lexical scores before they are fused with semantic scores.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LexicalNormalization {
	/// Raw BM25 magnitudes.
	#[default]
	None,
	/// Divide by the pool maximum so the best match scores `1.0`.
	Max,
}
impl LexicalNormalization {
	/// Case-insensitive, surrounding whitespace ignored.
	pub fn parse(value: &str) -> Option<Self> {
		match value.trim().to_ascii_lowercase().as_str() {
			"none" => Some(Self::None),
			"max" => Some(Self::Max),
			_ => None,
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::None => "none",
			Self::Max => "max",
		}
	}
}

impl<'de> Deserialize<'de> for LexicalNormalization {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let raw = String::deserialize(deserializer)?;

		Self::parse(&raw).ok_or_else(|| {
			de::Error::custom(format!(
				"ranking.lexical.normalization must be one of none or max, got {raw:?}."
			))
		})
	}
}

/// BM25 score of the document at `index` in the ranked pool.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LexicalMatch {
	pub index: usize,
	pub score: f32,
}

pub fn tokenize(text: &str) -> Vec<String> {
	text.split_whitespace().map(str::to_lowercase).collect()
}

pub fn doc_length(text: &str) -> f32 {
	text.split_whitespace().count() as f32
}

pub fn average_doc_length<D>(documents: &[D]) -> f32
where
	D: AsRef<str>,
{
	if documents.is_empty() {
		return 0.0;
	}

	let total: f32 = documents.iter().map(|doc| doc_length(doc.as_ref())).sum();

	total / documents.len() as f32
}

/// Scores `document` against `query`.
///
/// `idf` is `ln((doc_length + 1) / (tf + 0.5))`, i.e. it is derived from the document itself.
/// Repeated query terms are counted once per occurrence. A pool with no tokens
/// (`avg_doc_length <= 0`) scores zero everywhere.
pub fn score(
	query: &str,
	document: &str,
	avg_doc_length: f32,
	doc_length: f32,
	params: Bm25Params,
) -> f32 {
	if !avg_doc_length.is_finite() || avg_doc_length <= 0.0 {
		return 0.0;
	}

	let query_terms = tokenize(query);

	if query_terms.is_empty() {
		return 0.0;
	}

	let doc_terms = tokenize(document);
	let length_norm = 1.0 - params.b + params.b * (doc_length / avg_doc_length);
	let mut total = 0.0_f32;

	for term in &query_terms {
		let tf = doc_terms.iter().filter(|token| *token == term).count() as f32;

		// Absent terms contribute zero; skipping also avoids 0/0 when k1 is zero.
		if tf == 0.0 {
			continue;
		}

		let idf = ((doc_length + 1.0) / (tf + 0.5)).ln();
		let numerator = tf * (params.k1 + 1.0);
		let denominator = tf + params.k1 * length_norm;

		total += idf * (numerator / denominator);
	}

	total
}

/// Scores every document of the pool and returns the best `top_k`, highest first.
///
/// Equal scores keep their input order.
pub fn rank_batch<D>(
	query: &str,
	documents: &[D],
	top_k: usize,
	params: Bm25Params,
) -> Vec<LexicalMatch>
where
	D: AsRef<str>,
{
	if documents.is_empty() || top_k == 0 {
		return Vec::new();
	}

	let avg_doc_length = average_doc_length(documents);
	let mut matches: Vec<LexicalMatch> = documents
		.iter()
		.enumerate()
		.map(|(index, doc)| {
			let doc = doc.as_ref();

			LexicalMatch { index, score: score(query, doc, avg_doc_length, doc_length(doc), params) }
		})
		.collect();

	matches.sort_by(|left, right| cmp_f32_desc(left.score, right.score));
	matches.truncate(top_k);

	matches
}

pub fn normalize(matches: &mut [LexicalMatch], mode: LexicalNormalization) {
	match mode {
		LexicalNormalization::None => {},
		LexicalNormalization::Max => {
			let max = matches
				.iter()
				.map(|lexical| lexical.score)
				.filter(|score| score.is_finite())
				.fold(0.0_f32, f32::max);

			if max > 0.0 {
				for lexical in matches {
					lexical.score /= max;
				}
			}
		},
	}
}
