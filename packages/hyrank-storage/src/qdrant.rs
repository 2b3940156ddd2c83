use std::collections::HashMap;

use qdrant_client::qdrant::{
	Condition, Filter, PointId, Query, QueryPointsBuilder, ScoredPoint, Value,
	point_id::PointIdOptions, value::Kind,
};
use serde_json::{Map, Number, Value as JsonValue};

use crate::{Result, models::VectorMatch};

/// Payload key that scopes a point to one tenant partition.
pub const NAMESPACE_KEY: &str = "namespace";
pub const TEXT_KEY: &str = "text";

pub struct QdrantStore {
	pub client: qdrant_client::Qdrant,
	pub collection: String,
	pub vector_name: Option<String>,
}
impl QdrantStore {
	pub fn new(cfg: &hyrank_config::Qdrant) -> Result<Self> {
		let client =
			qdrant_client::Qdrant::from_url(&cfg.url).api_key(cfg.api_key.clone()).build()?;

		Ok(Self { client, collection: cfg.collection.clone(), vector_name: cfg.vector_name.clone() })
	}

	/// Nearest neighbours of `vector` among the points of `namespace` only.
	pub async fn query(
		&self,
		vector: Vec<f32>,
		limit: u64,
		namespace: &str,
	) -> Result<Vec<VectorMatch>> {
		let mut search = QueryPointsBuilder::new(self.collection.clone())
			.query(Query::new_nearest(vector))
			.filter(namespace_filter(namespace))
			.with_payload(true)
			.limit(limit);

		if let Some(name) = self.vector_name.as_deref() {
			search = search.using(name);
		}

		let response = self.client.query(search).await?;

		Ok(response.result.into_iter().filter_map(decode_point).collect())
	}
}

pub fn namespace_filter(namespace: &str) -> Filter {
	Filter::all([Condition::matches(NAMESPACE_KEY, namespace.to_string())])
}

pub fn decode_point(point: ScoredPoint) -> Option<VectorMatch> {
	let Some(id) = point.id.as_ref().and_then(point_id_to_string) else {
		tracing::warn!("Vector match missing point id.");

		return None;
	};

	Some(VectorMatch {
		id,
		score: point.score,
		values: Vec::new(),
		metadata: payload_to_json(point.payload),
	})
}

pub fn point_id_to_string(point_id: &PointId) -> Option<String> {
	match &point_id.point_id_options {
		Some(PointIdOptions::Uuid(id)) => Some(id.clone()),
		Some(PointIdOptions::Num(id)) => Some(id.to_string()),
		None => None,
	}
}

pub fn payload_to_json(payload: HashMap<String, Value>) -> Map<String, JsonValue> {
	payload.into_iter().map(|(key, value)| (key, value_to_json(value))).collect()
}

pub fn value_to_json(value: Value) -> JsonValue {
	match value.kind {
		Some(Kind::BoolValue(value)) => JsonValue::Bool(value),
		Some(Kind::IntegerValue(value)) => JsonValue::from(value),
		Some(Kind::DoubleValue(value)) =>
			Number::from_f64(value).map(JsonValue::Number).unwrap_or(JsonValue::Null),
		Some(Kind::StringValue(value)) => JsonValue::String(value),
		Some(Kind::ListValue(list)) =>
			JsonValue::Array(list.values.into_iter().map(value_to_json).collect()),
		Some(Kind::StructValue(object)) => JsonValue::Object(payload_to_json(object.fields)),
		Some(Kind::NullValue(_)) | None => JsonValue::Null,
	}
}
