use std::cmp::Ordering;

use crate::{
	candidate::{RankedResult, ScoreBreakdown, ScoredCandidate},
	lexical::LexicalNormalization,
};

/// Relative weights of the semantic and lexical signals.
///
/// The fused score is the raw weighted sum. Weights are never rescaled to sum to one; callers
/// that want a convex combination must pass weights that already sum to `1.0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FusionWeights {
	pub semantic: f32,
	pub keyword: f32,
}
impl FusionWeights {
	pub const EQUAL: Self = Self { semantic: 0.5, keyword: 0.5 };

	pub fn combine(self, semantic_score: f32, lexical_score: f32) -> f32 {
		combine(semantic_score, lexical_score, self.semantic, self.keyword)
	}
}
impl Default for FusionWeights {
	fn default() -> Self {
		Self::EQUAL
	}
}

/// Per-request ranking settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FusionConfig {
	pub weights: FusionWeights,
	pub use_recency_bias: bool,
	pub top_k: usize,
	pub lexical_normalization: LexicalNormalization,
}

pub fn combine(
	semantic_score: f32,
	lexical_score: f32,
	semantic_weight: f32,
	keyword_weight: f32,
) -> f32 {
	semantic_weight * semantic_score + keyword_weight * lexical_score
}

/// Ranks candidates by their fused score alone, without any recency adjustment.
pub fn rank_direct(
	candidates: &[ScoredCandidate<'_>],
	weights: FusionWeights,
	top_k: usize,
) -> Vec<RankedResult> {
	if candidates.is_empty() || top_k == 0 {
		return Vec::new();
	}

	let scored = candidates
		.iter()
		.enumerate()
		.map(|(index, scored)| {
			let semantic_score = scored.candidate.semantic_score;
			let hybrid_score = weights.combine(semantic_score, scored.lexical_score);
			let result = RankedResult {
				id: scored.candidate.id.clone(),
				final_score: hybrid_score,
				metadata: scored.candidate.metadata.clone(),
				breakdown: ScoreBreakdown {
					semantic_score,
					lexical_score: scored.lexical_score,
					hybrid_score,
					..Default::default()
				},
			};

			(index, result)
		})
		.collect();

	order_and_truncate(scored, top_k)
}

/// Sorts by final score descending, breaking ties by input position, and keeps `top_k`.
pub(crate) fn order_and_truncate(
	mut scored: Vec<(usize, RankedResult)>,
	top_k: usize,
) -> Vec<RankedResult> {
	scored.sort_by(|(left_idx, left), (right_idx, right)| {
		cmp_f32_desc(left.final_score, right.final_score).then_with(|| left_idx.cmp(right_idx))
	});
	scored.truncate(top_k);

	scored.into_iter().map(|(_, result)| result).collect()
}

/// Descending order for scores, with NaN sorted after every number.
pub fn cmp_f32_desc(a: f32, b: f32) -> Ordering {
	match (a.is_nan(), b.is_nan()) {
		(true, true) => Ordering::Equal,
		(true, false) => Ordering::Greater,
		(false, true) => Ordering::Less,
		(false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
	}
}
