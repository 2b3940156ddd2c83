use serde_json::{Map, Value};

use crate::qdrant::TEXT_KEY;

/// One nearest-neighbour hit, with its payload decoded to JSON.
#[derive(Clone, Debug, PartialEq)]
pub struct VectorMatch {
	pub id: String,
	pub score: f32,
	/// Stored vector of the point. Queries do not fetch vectors, so this is empty for Qdrant hits.
	pub values: Vec<f32>,
	pub metadata: Map<String, Value>,
}
impl VectorMatch {
	/// Chunk text stored under the `text` payload key, if it is a string.
	pub fn text(&self) -> Option<&str> {
		self.metadata.get(TEXT_KEY).and_then(Value::as_str)
	}
}
