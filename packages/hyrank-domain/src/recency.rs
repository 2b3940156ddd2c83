//! Recency buckets: candidates are grouped by age, normalized within their group, then scaled
//! by a fixed per-group weight.

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::{
	candidate::{RankedResult, ScoreBreakdown, ScoredCandidate},
	fusion::{self, FusionWeights},
};

const FOUR_WEEKS: Duration = Duration::weeks(4);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeBucket {
	RecentHour,
	RecentDay,
	RecentWeek,
	RecentFourWeeks,
	Older,
}
impl TimeBucket {
	/// Newest first.
	pub const ALL: [Self; 5] =
		[Self::RecentHour, Self::RecentDay, Self::RecentWeek, Self::RecentFourWeeks, Self::Older];

	pub fn weight(self) -> f32 {
		match self {
			Self::RecentHour => 1.2,
			Self::RecentDay => 1.0,
			Self::RecentWeek => 0.9,
			Self::RecentFourWeeks => 0.8,
			Self::Older => 0.7,
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::RecentHour => "RECENT_HOUR",
			Self::RecentDay => "RECENT_DAY",
			Self::RecentWeek => "RECENT_WEEK",
			Self::RecentFourWeeks => "RECENT_FOUR_WEEKS",
			Self::Older => "OLDER",
		}
	}

	/// Each bucket's bound is inclusive: exactly one hour old is still `RecentHour`.
	pub fn from_age(age: Duration) -> Self {
		if age <= Duration::HOUR {
			Self::RecentHour
		} else if age <= Duration::DAY {
			Self::RecentDay
		} else if age <= Duration::WEEK {
			Self::RecentWeek
		} else if age <= FOUR_WEEKS {
			Self::RecentFourWeeks
		} else {
			Self::Older
		}
	}

	/// A missing timestamp means the candidate is as new as `now`. Future timestamps clamp to
	/// age zero.
	pub fn classify(timestamp: Option<OffsetDateTime>, now: OffsetDateTime) -> Self {
		let age = timestamp.map(|ts| now - ts).unwrap_or(Duration::ZERO);

		Self::from_age(age.max(Duration::ZERO))
	}

	fn slot(self) -> usize {
		match self {
			Self::RecentHour => 0,
			Self::RecentDay => 1,
			Self::RecentWeek => 2,
			Self::RecentFourWeeks => 3,
			Self::Older => 4,
		}
	}
}

/// Min-max scales `scores` into `[0, 1]`.
///
/// When the scores span no range (all equal, or a single score) every entry becomes `1.0`.
pub fn normalize_min_max(scores: &[f32]) -> Vec<f32> {
	let min = scores.iter().copied().fold(f32::INFINITY, f32::min);
	let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
	let range = max - min;

	if range > 0.0 && range.is_finite() {
		scores.iter().map(|score| (score - min) / range).collect()
	} else {
		vec![1.0; scores.len()]
	}
}

/// Ranks candidates with a recency prior.
///
/// Hybrid scores use equal semantic and lexical weights. They are normalized inside each age
/// bucket before the bucket weight is applied, so the weight alone decides between buckets whose
/// members are otherwise on par.
pub fn apply_recency_bias(
	candidates: &[ScoredCandidate<'_>],
	top_k: usize,
	now: OffsetDateTime,
) -> Vec<RankedResult> {
	if candidates.is_empty() || top_k == 0 {
		return Vec::new();
	}

	let mut buckets: [Vec<usize>; 5] = Default::default();

	for (index, scored) in candidates.iter().enumerate() {
		let bucket = TimeBucket::classify(scored.candidate.timestamp(), now);

		buckets[bucket.slot()].push(index);
	}

	let mut weighted = Vec::with_capacity(candidates.len());

	for bucket in TimeBucket::ALL {
		let members = &buckets[bucket.slot()];

		if members.is_empty() {
			continue;
		}

		let hybrid: Vec<f32> = members
			.iter()
			.map(|&index| {
				let scored = &candidates[index];

				FusionWeights::EQUAL.combine(scored.candidate.semantic_score, scored.lexical_score)
			})
			.collect();
		let normalized = normalize_min_max(&hybrid);
		let weight = bucket.weight();

		for ((&index, hybrid_score), normalized_score) in members.iter().zip(hybrid).zip(normalized)
		{
			let scored = &candidates[index];
			let result = RankedResult {
				id: scored.candidate.id.clone(),
				final_score: normalized_score * weight,
				metadata: scored.candidate.metadata.clone(),
				breakdown: ScoreBreakdown {
					semantic_score: scored.candidate.semantic_score,
					lexical_score: scored.lexical_score,
					hybrid_score,
					normalized_score: Some(normalized_score),
					bucket: Some(bucket),
					bucket_weight: Some(weight),
				},
			};

			weighted.push((index, result));
		}
	}

	fusion::order_and_truncate(weighted, top_k)
}
