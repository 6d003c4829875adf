use std::{
  sync::{Arc, atomic::Ordering},
  time::{Duration, Instant},
};

use bon::bon;
use metrics::histogram;
use rayon::prelude::*;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::{
  config::EngineConfig,
  error::CordonError,
  index::EntityIndex,
  merge::Merger,
  model::{Entity, SearchQuery},
  normalize::TextNormalizer,
  scoring::ScorePhase,
  search::{self, BatchItem, BatchItemResult, BatchMatch, BatchOptions, BatchOutcome, BatchStatistics, LIMIT_CEILING, ScanInterrupt, ScanLimits, ScoredEntity, SearchParams},
  trace::{NoopTrace, SessionTrace, TraceReport, TraceSink},
};

/// The screening engine: an in-memory watchlist index plus the scoring
/// pipeline.
///
/// Construction requires a complete [`EngineConfig`]; there are no built-in
/// defaults. The engine can be cloned cheaply and shared across threads.
///
/// # Examples
///
/// ```rust
/// # use libcordon::prelude::*;
/// # fn demo(config: EngineConfig, entities: Vec<Entity>) -> Result<(), CordonError> {
/// let cordon = Cordon::new(config).build()?;
///
/// cordon.ingest(entities);
///
/// let query = SearchQuery::builder("Nicolas Maduro").build();
///
/// for hit in cordon.search(&query, &SearchParams::default())? {
///   println!("{} scored {:.2}", hit.entity.name, hit.score);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Cordon {
  normalizer: Arc<TextNormalizer>,
  merger: Merger,
  index: Arc<EntityIndex>,
  defaults: EngineConfig,
}

#[bon]
impl Cordon {
  /// Create a new engine from externally loaded defaults.
  ///
  /// Fails when the configuration is invalid; a missing key has already failed
  /// at deserialization time by then.
  #[allow(clippy::new_ret_no_self)]
  #[builder(start_fn = new, finish_fn = build)]
  pub fn _new(#[builder(start_fn)] defaults: EngineConfig) -> Result<Cordon, CordonError> {
    defaults.validate()?;

    let normalizer = Arc::new(TextNormalizer::new());

    Ok(Cordon {
      merger: Merger::new(normalizer.clone()),
      normalizer,
      index: Arc::new(EntityIndex::new()),
      defaults,
    })
  }
}

impl Cordon {
  /// Whether the index has been loaded at least once.
  pub fn is_ready(&self) -> bool {
    self.index.is_loaded()
  }

  pub fn index(&self) -> &EntityIndex {
    &self.index
  }

  pub fn normalizer(&self) -> &TextNormalizer {
    &self.normalizer
  }

  /// Ingest parsed entities, merging them with whatever is already indexed.
  ///
  /// Parsers may hand over unnormalized records; normalization and
  /// deduplication happen here.
  #[instrument(skip_all, fields(entities = entities.len()))]
  pub fn ingest(&self, entities: Vec<Entity>) {
    let then = Instant::now();

    self.index.add_all_merging(entities, &self.merger, &self.defaults.similarity);

    histogram!("cordon_ingest_latency_seconds").record(then.elapsed().as_secs_f64());

    tracing::info!(size = self.index.size(), latency = ?then.elapsed(), "ingested entities");
  }

  /// Replace the whole index with a freshly merged set of entities.
  ///
  /// In-flight searches keep the snapshot they captured.
  #[instrument(skip_all, fields(entities = entities.len()))]
  pub fn replace_index(&self, entities: Vec<Entity>) {
    let merged = self.merger.merge(entities, &self.defaults.similarity);

    self.index.replace_all(merged);

    tracing::info!(size = self.index.size(), "replaced index");
  }

  /// Rank index entities against the query.
  #[instrument(name = "search", skip_all, fields(query = query.name))]
  pub fn search(&self, query: &SearchQuery, params: &SearchParams) -> Result<Vec<ScoredEntity>, CordonError> {
    self.search_with(query, params, &mut NoopTrace)
  }

  /// Rank index entities against the query, recording a phase timeline.
  #[instrument(name = "search_traced", skip_all, fields(query = query.name))]
  pub fn search_traced(&self, query: &SearchQuery, params: &SearchParams) -> Result<(Vec<ScoredEntity>, TraceReport), CordonError> {
    let mut trace = SessionTrace::open();

    trace.annotate("query", query.name.clone());

    let results = self.search_with(query, params, &mut trace)?;

    if let Some(top) = results.first()
      && let Some(breakdown) = &top.breakdown
    {
      trace.set_breakdown(breakdown);
    }

    trace.annotate("results", results.len().to_string());

    Ok((self.strip_breakdowns(results, params), trace.into_report()))
  }

  fn search_with<T: TraceSink>(&self, query: &SearchQuery, params: &SearchParams, trace: &mut T) -> Result<Vec<ScoredEntity>, CordonError> {
    query.validate().map_err(|err| CordonError::InvalidQuery(err.to_string()))?;

    if !self.index.is_loaded() {
      return Err(CordonError::IndexUnavailable);
    }

    let then = Instant::now();
    let config = self.defaults.resolve(params.overrides.as_ref());
    let min_match = params.min_match.unwrap_or(config.search.min_match).clamp(0.0, 1.0);
    let limit = params.limit.unwrap_or(config.search.limit).clamp(1, LIMIT_CEILING);

    let normalization = Instant::now();
    let query = self.normalizer.prepare_query(query.clone(), &config.similarity);

    trace.event(ScorePhase::Normalization, normalization.elapsed(), || {
      (
        format!("prepared query {}", query.name),
        vec![("normalized_name", query.prepared().name.clone()), ("tokens", query.prepared().name_tokens.join(" "))],
      )
    });

    let snapshot = self.index.snapshot();

    let results = match search::scan(&snapshot, &query, &config, min_match, limit, ScanLimits::default(), trace) {
      Ok(results) => results,
      // No deadline or cancellation applies to a single search.
      Err(_) => Vec::new(),
    };

    histogram!("cordon_search_latency_seconds").record(then.elapsed().as_secs_f64());

    tracing::debug!(candidates = snapshot.len(), results = results.len(), latency = ?then.elapsed(), "search completed");

    Ok(if trace.enabled() { results } else { self.strip_breakdowns(results, params) })
  }

  fn strip_breakdowns(&self, mut results: Vec<ScoredEntity>, params: &SearchParams) -> Vec<ScoredEntity> {
    if !params.debug {
      for result in &mut results {
        result.breakdown = None;
      }
    }

    results
  }

  /// Score up to `search.batch_max_items` queries against one index snapshot.
  ///
  /// Items fan out over the rayon worker pool; response order equals request
  /// order. Item-level failures, including the per-item deadline, are recorded
  /// on the item and never fail the batch.
  #[instrument(name = "batch_search", skip_all, fields(items = items.len()))]
  pub fn batch_search(&self, items: &[BatchItem], options: &BatchOptions) -> Result<BatchOutcome, CordonError> {
    let config = &self.defaults;

    if items.is_empty() {
      return Err(CordonError::InvalidQuery("batch must contain at least one item".to_string()));
    }

    if items.len() > config.search.batch_max_items {
      return Err(CordonError::InvalidQuery(format!("batch may not exceed {} items, got {}", config.search.batch_max_items, items.len())));
    }

    if !self.index.is_loaded() {
      return Err(CordonError::IndexUnavailable);
    }

    let then = Instant::now();
    let snapshot = self.index.snapshot();
    let min_match = options.min_match.unwrap_or(config.search.min_match).clamp(0.0, 1.0);
    let limit = options.limit.unwrap_or(config.search.limit).clamp(1, LIMIT_CEILING);
    let item_timeout = Duration::from_millis(config.search.batch_item_timeout_ms);

    let results: Vec<BatchItemResult> = items
      .par_iter()
      .map(|item| {
        let failed = |error: &str| BatchItemResult {
          request_id: item.request_id.clone(),
          name: item.name.clone(),
          matches: Vec::new(),
          error: Some(error.to_string()),
        };

        if options.cancel.as_ref().map(|cancel| cancel.load(Ordering::Relaxed)).unwrap_or(false) {
          return failed("cancelled");
        }

        if item.name.trim().is_empty() {
          return failed("name must not be blank");
        }

        let query = self
          .normalizer
          .prepare_query(SearchQuery::builder(&item.name).maybe_kind(item.kind).maybe_source(item.source).build(), &config.similarity);

        let limits = ScanLimits {
          deadline: Some(Instant::now() + item_timeout),
          cancel: options.cancel.as_deref(),
        };

        match search::scan(&snapshot, &query, config, min_match, limit, limits, &mut NoopTrace) {
          Ok(results) => BatchItemResult {
            request_id: item.request_id.clone(),
            name: item.name.clone(),
            matches: results
              .into_iter()
              .map(|hit| BatchMatch {
                entity_id: hit.entity.id.clone(),
                name: hit.entity.name.clone(),
                score: hit.score,
                source: hit.entity.source,
              })
              .collect(),
            error: None,
          },

          Err(ScanInterrupt::Timeout) => {
            tracing::warn!(request_id = item.request_id, "batch item timed out");

            failed("timeout")
          }

          Err(ScanInterrupt::Cancelled) => failed("cancelled"),
        }
      })
      .collect();

    let statistics = BatchStatistics {
      total_items: results.len(),
      items_with_matches: results.iter().filter(|r| !r.matches.is_empty()).count(),
      total_matches: results.iter().map(|r| r.matches.len()).sum(),
      processing_time_ms: then.elapsed().as_millis() as u64,
    };

    histogram!("cordon_batch_latency_seconds").record(then.elapsed().as_secs_f64());

    Ok(BatchOutcome {
      batch_id: Uuid::new_v4().to_string(),
      results,
      statistics,
    })
  }
}
