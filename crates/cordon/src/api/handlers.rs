use libcordon::prelude::*;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::{
  api::dto::{BatchRequest, EntityHit, SearchRequest, SearchResponse},
  errors::AppError,
};

/// Shape a search request into a core query, run it, and shape the response.
#[instrument(skip_all, fields(name = request.name))]
pub fn handle_search(cordon: &Cordon, request: SearchRequest, report_base_url: &str) -> Result<SearchResponse, AppError> {
  request.validate().map_err(|err| AppError::BadRequest(err.to_string()))?;

  let request_id = request.request_id.clone().unwrap_or_else(|| Uuid::new_v4().to_string());

  let query = SearchQuery::builder(&request.name)
    .maybe_kind(request.entity_type)
    .maybe_source(request.source)
    .alt_names(request.alt_names.clone())
    .build();

  let params = SearchParams {
    min_match: request.min_match,
    limit: request.limit,
    debug: request.debug,
    overrides: request.config_override.clone(),
  };

  let (results, trace) = if request.trace {
    let (results, report) = cordon.search_traced(&query, &params)?;

    (results, Some(report))
  } else {
    (cordon.search(&query, &params)?, None)
  };

  let report_url = trace.as_ref().map(|report| format!("{report_base_url}/reports/{}", report.session_id));

  tracing::info!(request_id = request_id.as_str(), results = results.len(), traced = trace.is_some(), "search handled");

  Ok(SearchResponse {
    total_results: results.len(),
    entities: results.into_iter().map(EntityHit::from_scored).collect(),
    request_id,
    trace,
    report_url,
  })
}

/// Shape a batch request, run it, and hand back the outcome.
#[instrument(skip_all, fields(items = request.items.len()))]
pub fn handle_batch(cordon: &Cordon, request: BatchRequest) -> Result<BatchOutcome, AppError> {
  request.validate().map_err(|err| AppError::BadRequest(err.to_string()))?;

  let options = BatchOptions {
    min_match: request.min_match,
    limit: request.limit,
    cancel: None,
  };

  let items: Vec<BatchItem> = request.items.into_iter().map(|item| item.into_item()).collect();
  let outcome = cordon.batch_search(&items, &options)?;

  tracing::info!(batch_id = outcome.batch_id.as_str(), items = outcome.statistics.total_items, matches = outcome.statistics.total_matches, "batch handled");

  Ok(outcome)
}
