use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::recency::TimeBucket;

pub const TIMESTAMP_KEY: &str = "timestamp";

/// One retrieved chunk together with the similarity score the vector store assigned to it.
#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
	pub id: String,
	/// Stored vector, passed through untouched.
	pub values: Vec<f32>,
	pub text: String,
	pub metadata: Map<String, Value>,
	pub semantic_score: f32,
}
impl Candidate {
	pub fn timestamp(&self) -> Option<OffsetDateTime> {
		metadata_timestamp(&self.metadata)
	}
}

/// A candidate joined with the lexical score computed for the same request.
#[derive(Clone, Copy, Debug)]
pub struct ScoredCandidate<'a> {
	pub candidate: &'a Candidate,
	pub lexical_score: f32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
	pub semantic_score: f32,
	pub lexical_score: f32,
	pub hybrid_score: f32,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub normalized_score: Option<f32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub bucket: Option<TimeBucket>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub bucket_weight: Option<f32>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RankedResult {
	pub id: String,
	pub final_score: f32,
	pub metadata: Map<String, Value>,
	pub breakdown: ScoreBreakdown,
}

/// Reads `metadata.timestamp` as epoch milliseconds (number or numeric string) or RFC 3339.
///
/// Zero and unparsable values count as absent.
pub fn metadata_timestamp(metadata: &Map<String, Value>) -> Option<OffsetDateTime> {
	match metadata.get(TIMESTAMP_KEY)? {
		Value::Number(number) => number.as_f64().and_then(from_unix_millis),
		Value::String(text) => {
			let trimmed = text.trim();

			match trimmed.parse::<f64>() {
				Ok(millis) => from_unix_millis(millis),
				Err(_) => OffsetDateTime::parse(trimmed, &Rfc3339).ok(),
			}
		},
		_ => None,
	}
}

pub fn unix_millis(ts: OffsetDateTime) -> i64 {
	(ts.unix_timestamp_nanos() / 1_000_000) as i64
}

fn from_unix_millis(millis: f64) -> Option<OffsetDateTime> {
	if !millis.is_finite() || millis == 0.0 {
		return None;
	}

	OffsetDateTime::from_unix_timestamp_nanos((millis * 1_000_000.0) as i128).ok()
}

#[cfg(test)]
mod tests {
	use time::macros::datetime;

	use super::*;

	fn metadata(value: Value) -> Map<String, Value> {
		let mut map = Map::new();

		map.insert(TIMESTAMP_KEY.to_string(), value);

		map
	}

	#[test]
	fn reads_epoch_millis_number() {
		let ts = datetime!(2024-03-01 12:00 UTC);
		let parsed = metadata_timestamp(&metadata(Value::from(unix_millis(ts))));

		assert_eq!(parsed, Some(ts));
	}

	#[test]
	fn reads_numeric_string_and_rfc3339() {
		let ts = datetime!(2024-03-01 12:00 UTC);

		assert_eq!(
			metadata_timestamp(&metadata(Value::from(unix_millis(ts).to_string()))),
			Some(ts)
		);
		assert_eq!(
			metadata_timestamp(&metadata(Value::from("2024-03-01T12:00:00Z"))),
			Some(ts)
		);
	}

	#[test]
	fn zero_and_garbage_are_absent() {
		assert_eq!(metadata_timestamp(&metadata(Value::from(0))), None);
		assert_eq!(metadata_timestamp(&metadata(Value::from("yesterday"))), None);
		assert_eq!(metadata_timestamp(&metadata(Value::Bool(true))), None);
		assert_eq!(metadata_timestamp(&Map::new()), None);
	}
}
