use libcordon::prelude::*;
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

/// Single search request.
///
/// `limit` and `min_match` fall back to the configured search defaults;
/// out-of-range values are clamped, not rejected. Unknown `source` or `type`
/// values are treated as absent filters.
#[derive(Clone, Debug, Default, Deserialize, Validate)]
pub struct SearchRequest {
  #[validate(length(min = 1, message = "name must not be blank"))]
  pub name: String,
  #[serde(default, deserialize_with = "lenient_source")]
  pub source: Option<SourceList>,
  #[serde(default, rename = "type", deserialize_with = "lenient_kind")]
  pub entity_type: Option<EntityKind>,
  #[serde(default)]
  pub alt_names: Vec<String>,
  pub limit: Option<usize>,
  pub min_match: Option<f64>,
  pub request_id: Option<String>,
  #[serde(default)]
  pub debug: bool,
  #[serde(default)]
  pub trace: bool,
  pub config_override: Option<ConfigOverride>,
}

fn lenient_source<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<SourceList>, D::Error> {
  let value = Option::<String>::deserialize(deserializer)?;

  Ok(value.and_then(|v| v.parse().ok()))
}

fn lenient_kind<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<EntityKind>, D::Error> {
  let value = Option::<String>::deserialize(deserializer)?;

  Ok(value.and_then(|v| v.parse().ok()))
}

#[derive(Clone, Debug, Serialize)]
pub struct SearchResponse {
  pub entities: Vec<EntityHit>,
  pub total_results: usize,
  pub request_id: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub trace: Option<TraceReport>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub report_url: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct EntityHit {
  pub id: String,
  pub name: String,
  #[serde(rename = "type")]
  pub entity_type: EntityKind,
  pub source: SourceList,
  pub score: f64,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub alt_names: Vec<String>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub programs: Vec<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub breakdown: Option<ScoreBreakdown>,
}

impl EntityHit {
  pub(crate) fn from_scored(hit: ScoredEntity) -> EntityHit {
    EntityHit {
      id: hit.entity.id.clone(),
      name: hit.entity.name.clone(),
      entity_type: hit.entity.kind(),
      source: hit.entity.source,
      score: hit.score,
      alt_names: hit.entity.alt_names.clone(),
      programs: hit.entity.sanctions_info.as_ref().map(|s| s.programs.clone()).unwrap_or_default(),
      breakdown: hit.breakdown,
    }
  }
}

/// Batch request: between one and a thousand items.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct BatchRequest {
  #[validate(length(min = 1, max = 1000, message = "batch must contain between 1 and 1000 items"))]
  pub items: Vec<BatchItemRequest>,
  pub min_match: Option<f64>,
  pub limit: Option<usize>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct BatchItemRequest {
  #[serde(default)]
  pub request_id: String,
  #[serde(default)]
  pub name: String,
  #[serde(default, deserialize_with = "lenient_kind")]
  pub entity_type: Option<EntityKind>,
  #[serde(default, deserialize_with = "lenient_source")]
  pub source: Option<SourceList>,
}

impl BatchItemRequest {
  pub(crate) fn into_item(self) -> BatchItem {
    BatchItem {
      request_id: self.request_id,
      name: self.name,
      kind: self.entity_type,
      source: self.source,
    }
  }
}

#[cfg(test)]
mod tests {
  use libcordon::prelude::{EntityKind, SourceList};
  use serde_json::json;

  use super::{BatchRequest, SearchRequest};

  #[test]
  fn unknown_enums_become_absent_filters() {
    let request: SearchRequest = serde_json::from_value(json!({
      "name": "Nicolas Maduro",
      "source": "NOT_A_LIST",
      "type": "ROBOT",
    }))
    .unwrap();

    assert_eq!(request.source, None);
    assert_eq!(request.entity_type, None);

    let request: SearchRequest = serde_json::from_value(json!({
      "name": "Nicolas Maduro",
      "source": "US_OFAC",
      "type": "person",
    }))
    .unwrap();

    assert_eq!(request.source, Some(SourceList::UsOfac));
    assert_eq!(request.entity_type, Some(EntityKind::Person));
  }

  #[test]
  fn overrides_nest_in_requests() {
    let request: SearchRequest = serde_json::from_value(json!({
      "name": "Nicolas Maduro",
      "config_override": {
        "weights": { "date_enabled": false },
        "search": { "min_match": 0.4 },
      },
    }))
    .unwrap();

    let overrides = request.config_override.unwrap();

    assert_eq!(overrides.weights.unwrap().date_enabled, Some(false));
    assert_eq!(overrides.search.unwrap().min_match, Some(0.4));
  }

  #[test]
  fn batch_request_parses_items() {
    let request: BatchRequest = serde_json::from_value(json!({
      "items": [
        { "request_id": "r1", "name": "Nicolas Maduro", "entity_type": "PERSON" },
        { "request_id": "r2", "name": "Test Corp", "source": "US_CSL" },
      ],
      "min_match": 0.6,
    }))
    .unwrap();

    assert_eq!(request.items.len(), 2);
    assert_eq!(request.items[0].entity_type, Some(EntityKind::Person));
    assert_eq!(request.items[1].source, Some(SourceList::UsCsl));
    assert_eq!(request.min_match, Some(0.6));
  }
}
