use std::{
  collections::BTreeMap,
  time::{Duration, Instant},
};

use jiff::Timestamp;
use serde::Serialize;
use uuid::Uuid;

use crate::scoring::{ScoreBreakdown, ScorePhase};

/// Upper bound on entries kept in one event's data map.
const MAX_EVENT_DATA_ENTRIES: usize = 16;
/// Upper bound on events kept in one session.
const MAX_SESSION_EVENTS: usize = 2048;

/// Receiver for scoring phase events.
///
/// Scoring is generic over the sink so that the disabled variant compiles away:
/// [`NoopTrace`] is a zero-sized type whose methods are empty and whose detail
/// closures are never evaluated, so a trace-less search pays nothing.
pub trait TraceSink: Send {
  fn enabled(&self) -> bool {
    false
  }

  /// Record one phase event. `details` produces the description and data map
  /// and is only evaluated when the sink is enabled.
  fn event<F>(&mut self, phase: ScorePhase, duration: Duration, details: F)
  where
    F: FnOnce() -> (String, Vec<(&'static str, String)>),
    Self: Sized,
  {
    let _ = (phase, duration);
    let _ = details;
  }

  fn set_breakdown(&mut self, breakdown: &ScoreBreakdown) {
    let _ = breakdown;
  }
}

/// The disabled trace.
pub struct NoopTrace;

impl TraceSink for NoopTrace {}

/// One recorded phase event.
#[derive(Clone, Debug, Serialize)]
pub struct ScoringEvent {
  pub phase: ScorePhase,
  pub description: String,
  pub timestamp: Timestamp,
  pub duration_ms: f64,
  pub data: BTreeMap<&'static str, String>,
}

/// An enabled trace session collecting an ordered phase timeline.
pub struct SessionTrace {
  session_id: String,
  started: Instant,
  events: Vec<ScoringEvent>,
  dropped_events: usize,
  breakdown: Option<ScoreBreakdown>,
  metadata: BTreeMap<&'static str, String>,
}

impl SessionTrace {
  pub fn open() -> SessionTrace {
    SessionTrace {
      session_id: Uuid::new_v4().to_string(),
      started: Instant::now(),
      events: Vec::new(),
      dropped_events: 0,
      breakdown: None,
      metadata: BTreeMap::new(),
    }
  }

  pub fn session_id(&self) -> &str {
    &self.session_id
  }

  pub fn annotate(&mut self, key: &'static str, value: String) {
    if self.metadata.len() < MAX_EVENT_DATA_ENTRIES {
      self.metadata.insert(key, value);
    }
  }

  pub fn into_report(self) -> TraceReport {
    TraceReport {
      session_id: self.session_id,
      duration_ms: self.started.elapsed().as_secs_f64() * 1000.0,
      breakdown: self.breakdown,
      events: self.events,
      dropped_events: self.dropped_events,
      metadata: self.metadata,
    }
  }
}

impl TraceSink for SessionTrace {
  fn enabled(&self) -> bool {
    true
  }

  fn event<F>(&mut self, phase: ScorePhase, duration: Duration, details: F)
  where
    F: FnOnce() -> (String, Vec<(&'static str, String)>),
  {
    if self.events.len() >= MAX_SESSION_EVENTS {
      self.dropped_events += 1;

      return;
    }

    let (description, data) = details();

    self.events.push(ScoringEvent {
      phase,
      description,
      timestamp: Timestamp::now(),
      duration_ms: duration.as_secs_f64() * 1000.0,
      data: data.into_iter().take(MAX_EVENT_DATA_ENTRIES).collect(),
    });
  }

  fn set_breakdown(&mut self, breakdown: &ScoreBreakdown) {
    self.breakdown = Some(breakdown.clone());
  }
}

/// The finished trace handed back to the caller alongside the results.
#[derive(Clone, Debug, Serialize)]
pub struct TraceReport {
  pub session_id: String,
  pub duration_ms: f64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub breakdown: Option<ScoreBreakdown>,
  pub events: Vec<ScoringEvent>,
  #[serde(skip_serializing_if = "is_zero")]
  pub dropped_events: usize,
  pub metadata: BTreeMap<&'static str, String>,
}

fn is_zero(value: &usize) -> bool {
  *value == 0
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use crate::scoring::ScorePhase;

  use super::{MAX_SESSION_EVENTS, NoopTrace, SessionTrace, TraceSink};

  #[test]
  fn noop_trace_never_evaluates_details() {
    let mut trace = NoopTrace;

    trace.event(ScorePhase::NameComparison, Duration::ZERO, || unreachable!("details must not be evaluated"));

    assert!(!trace.enabled());
  }

  #[test]
  fn session_trace_collects_ordered_events() {
    let mut trace = SessionTrace::open();

    trace.event(ScorePhase::NameComparison, Duration::from_millis(2), || ("name".to_string(), vec![("score", "1.0".to_string())]));
    trace.event(ScorePhase::Aggregation, Duration::ZERO, || ("aggregate".to_string(), vec![]));

    assert!(trace.enabled());

    let report = trace.into_report();

    assert_eq!(report.events.len(), 2);
    assert_eq!(report.events[0].phase, ScorePhase::NameComparison);
    assert_eq!(report.events[1].phase, ScorePhase::Aggregation);
    assert_eq!(report.events[0].data.get("score").map(String::as_str), Some("1.0"));
    assert!(!report.session_id.is_empty());
  }

  #[test]
  fn session_trace_is_bounded() {
    let mut trace = SessionTrace::open();

    for _ in 0..(MAX_SESSION_EVENTS + 10) {
      trace.event(ScorePhase::NameComparison, Duration::ZERO, || ("event".to_string(), vec![]));
    }

    let report = trace.into_report();

    assert_eq!(report.events.len(), MAX_SESSION_EVENTS);
    assert_eq!(report.dropped_events, 10);
  }

  #[test]
  fn reports_serialize() {
    let mut trace = SessionTrace::open();
    trace.annotate("query", "nicolas maduro".to_string());
    trace.event(ScorePhase::NameComparison, Duration::ZERO, || ("name".to_string(), vec![]));

    let report = trace.into_report();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["events"][0]["phase"], "NAME_COMPARISON");
    assert_eq!(json["metadata"]["query"], "nicolas maduro");
  }
}
