use std::{
  sync::{Arc, atomic::AtomicBool},
  time::Instant,
};

use bumpalo::Bump;
use metrics::histogram;
use serde::{Deserialize, Serialize};

use crate::{
  config::{ConfigOverride, EngineConfig},
  index::Snapshot,
  model::{Entity, EntityKind, SearchQuery, SourceList},
  scoring::{self, ScoreBreakdown, ScorePhase},
  trace::TraceSink,
};

/// Per-request search parameters.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct SearchParams {
  /// Minimum score to be returned. Clamped to [0, 1]; defaults to the
  /// configured `search.min_match`.
  pub min_match: Option<f64>,
  /// Maximum number of results. Clamped to 1..=100; defaults to the
  /// configured `search.limit`.
  pub limit: Option<usize>,
  /// Attach the per-phase breakdown to every result.
  #[serde(default)]
  pub debug: bool,
  pub overrides: Option<ConfigOverride>,
}

pub const LIMIT_CEILING: usize = 100;

/// One ranked search result.
#[derive(Clone, Debug, Serialize)]
pub struct ScoredEntity {
  pub entity: Arc<Entity>,
  pub score: f64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub breakdown: Option<ScoreBreakdown>,
}

/// One query of a batch request.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct BatchItem {
  pub request_id: String,
  pub name: String,
  pub kind: Option<EntityKind>,
  pub source: Option<SourceList>,
}

/// Batch-level options.
#[derive(Clone, Debug, Default)]
pub struct BatchOptions {
  pub min_match: Option<f64>,
  pub limit: Option<usize>,
  /// Cooperative cancellation: unstarted items abort promptly, in-flight items
  /// stop at the next candidate boundary.
  pub cancel: Option<Arc<AtomicBool>>,
}

#[derive(Clone, Debug, Serialize)]
pub struct BatchMatch {
  pub entity_id: String,
  pub name: String,
  pub score: f64,
  pub source: SourceList,
}

/// Per-item outcome. An error never fails the surrounding batch.
#[derive(Clone, Debug, Serialize)]
pub struct BatchItemResult {
  pub request_id: String,
  pub name: String,
  pub matches: Vec<BatchMatch>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct BatchStatistics {
  pub total_items: usize,
  pub items_with_matches: usize,
  pub total_matches: usize,
  pub processing_time_ms: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct BatchOutcome {
  pub batch_id: String,
  pub results: Vec<BatchItemResult>,
  pub statistics: BatchStatistics,
}

/// Why a scan stopped early.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum ScanInterrupt {
  Timeout,
  Cancelled,
}

/// Deadline and cancellation checked at candidate boundaries.
#[derive(Clone, Copy, Default)]
pub(crate) struct ScanLimits<'c> {
  pub deadline: Option<Instant>,
  pub cancel: Option<&'c AtomicBool>,
}

impl ScanLimits<'_> {
  fn interrupted(&self) -> Option<ScanInterrupt> {
    if let Some(cancel) = self.cancel
      && cancel.load(std::sync::atomic::Ordering::Relaxed)
    {
      return Some(ScanInterrupt::Cancelled);
    }

    if let Some(deadline) = self.deadline
      && Instant::now() >= deadline
    {
      return Some(ScanInterrupt::Timeout);
    }

    None
  }
}

/// Score every candidate in the snapshot against the query, drop those under
/// `min_match`, and return the top `limit` ordered by score descending with
/// ties broken by entity id ascending.
pub(crate) fn scan<T: TraceSink>(
  snapshot: &Snapshot,
  query: &SearchQuery,
  config: &EngineConfig,
  min_match: f64,
  limit: usize,
  limits: ScanLimits<'_>,
  trace: &mut T,
) -> Result<Vec<ScoredEntity>, ScanInterrupt> {
  let then = Instant::now();
  let mut bump = Bump::with_capacity(1024);
  let mut results = Vec::new();

  for candidate in snapshot.iter() {
    if let Some(interrupt) = limits.interrupted() {
      return Err(interrupt);
    }

    if let Some(source) = query.source
      && candidate.source != source
    {
      continue;
    }

    if let Some(kind) = query.kind
      && candidate.kind() != kind
    {
      continue;
    }

    let breakdown = scoring::score_candidate(&bump, query, candidate, config, trace);

    bump.reset();

    histogram!("cordon_scoring_scores").record(breakdown.total);

    let kept = breakdown.total >= min_match;

    trace.event(ScorePhase::Filtering, then.elapsed(), || {
      (
        format!("{} candidate {}", if kept { "kept" } else { "dropped" }, candidate.id),
        vec![
          ("entity_id", candidate.id.clone()),
          ("score", format!("{:.4}", breakdown.total)),
          ("min_match", format!("{min_match:.4}")),
          ("kept", kept.to_string()),
        ],
      )
    });

    if kept {
      results.push(ScoredEntity {
        entity: candidate.clone(),
        score: breakdown.total,
        breakdown: Some(breakdown),
      });
    }
  }

  results.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.entity.id.cmp(&b.entity.id)));
  results.truncate(limit);

  histogram!("cordon_scoring_latency_seconds").record(then.elapsed().as_secs_f64());

  Ok(results)
}
