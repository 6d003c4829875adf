pub(crate) mod affiliations;
pub(crate) mod comparers;

use std::{fmt, time::Instant};

use bumpalo::Bump;
use serde::{Deserialize, Serialize};

use crate::{
  config::{EngineConfig, WeightsConfig},
  model::{Entity, SearchQuery},
  scoring::comparers::{
    address::AddressComparer,
    contact::ContactComparer,
    dates::DateComparer,
    identifiers::{CryptoComparer, GovIdComparer},
    names::{AltNameComparer, NameComparer},
  },
  trace::TraceSink,
};

/// One step of the scoring pipeline.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScorePhase {
  Normalization,
  Tokenization,
  PhoneticFilter,
  NameComparison,
  AltNameComparison,
  GovIdComparison,
  CryptoComparison,
  ContactComparison,
  AddressComparison,
  DateComparison,
  Aggregation,
  Filtering,
}

impl ScorePhase {
  pub fn as_str(&self) -> &'static str {
    match self {
      ScorePhase::Normalization => "NORMALIZATION",
      ScorePhase::Tokenization => "TOKENIZATION",
      ScorePhase::PhoneticFilter => "PHONETIC_FILTER",
      ScorePhase::NameComparison => "NAME_COMPARISON",
      ScorePhase::AltNameComparison => "ALT_NAME_COMPARISON",
      ScorePhase::GovIdComparison => "GOV_ID_COMPARISON",
      ScorePhase::CryptoComparison => "CRYPTO_COMPARISON",
      ScorePhase::ContactComparison => "CONTACT_COMPARISON",
      ScorePhase::AddressComparison => "ADDRESS_COMPARISON",
      ScorePhase::DateComparison => "DATE_COMPARISON",
      ScorePhase::Aggregation => "AGGREGATION",
      ScorePhase::Filtering => "FILTERING",
    }
  }
}

impl fmt::Display for ScorePhase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Result of a single comparison phase.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Comparison {
  pub score: f64,
  /// Number of field pairs that had data on both sides. A phase with no
  /// bilateral data reports zero and stays out of the aggregate.
  pub fields_compared: usize,
}

impl Comparison {
  pub(crate) fn empty() -> Comparison {
    Comparison::default()
  }

  pub(crate) fn of(score: f64, fields_compared: usize) -> Comparison {
    Comparison {
      score: score.clamp(0.0, 1.0),
      fields_compared,
    }
  }
}

/// A comparison phase composed into the scoring pipeline.
///
/// Everything but `compare` is generated by the `#[comparer]` attribute, which
/// ties the phase tag and its configuration fields to the comparison logic.
pub(crate) trait Comparer: Send + Sync {
  fn name(&self) -> &'static str;
  fn phase(&self) -> ScorePhase;
  fn weight(&self, weights: &WeightsConfig) -> f64;
  fn enabled(&self, weights: &WeightsConfig) -> bool;
  fn compare(&self, bump: &Bump, query: &SearchQuery, candidate: &Entity, config: &EngineConfig) -> Comparison;
}

/// Per-phase decomposition of a candidate's score.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ScoreBreakdown {
  pub phases: Vec<PhaseScore>,
  pub total: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct PhaseScore {
  pub phase: ScorePhase,
  pub name: &'static str,
  pub score: f64,
  pub weight: f64,
  pub fields_compared: usize,
}

/// Run the scoring pipeline for one candidate.
///
/// The total is the weighted mean of the enabled phases that had data on both
/// sides, clamped to [0, 1]. Phases that cannot change the outcome once the
/// optimistic bound drops below `weights.minimum_score` are skipped.
pub(crate) fn score_candidate<T: TraceSink>(bump: &Bump, query: &SearchQuery, candidate: &Entity, config: &EngineConfig, trace: &mut T) -> ScoreBreakdown {
  let weights = &config.weights;

  let pipeline: [&dyn Comparer; 7] = [&NameComparer, &AltNameComparer, &GovIdComparer, &CryptoComparer, &ContactComparer, &AddressComparer, &DateComparer];

  let mut breakdown = ScoreBreakdown::default();
  let mut numerator = 0.0f64;
  let mut denominator = 0.0f64;
  let mut name_score: Option<f64> = None;

  for (position, comparer) in pipeline.iter().enumerate() {
    let weight = comparer.weight(weights);

    if !comparer.enabled(weights) || weight <= 0.0 {
      continue;
    }

    // Once even perfect scores on the remaining phases cannot lift the
    // aggregate over the floor, stop comparing.
    if position > 0 && name_score.map(|score| score < weights.exact_match_threshold).unwrap_or(true) {
      let remaining: f64 = pipeline[position..].iter().filter(|c| c.enabled(weights) && c.weight(weights) > 0.0).map(|c| c.weight(weights)).sum();

      if denominator > 0.0 && (numerator + remaining) / (denominator + remaining) < weights.minimum_score {
        tracing::debug!(entity_id = candidate.id, "aggregate cannot reach the score floor, skipping remaining phases");

        break;
      }
    }

    let phase = comparer.phase();
    let then = Instant::now();
    let comparison = comparer.compare(bump, query, candidate, config);

    trace.event(phase, then.elapsed(), || {
      (
        format!("{} against {}", comparer.name(), candidate.id),
        vec![
          ("entity_id", candidate.id.clone()),
          ("score", format!("{:.4}", comparison.score)),
          ("fields_compared", comparison.fields_compared.to_string()),
        ],
      )
    });

    tracing::debug!(phase = comparer.name(), score = comparison.score, fields = comparison.fields_compared, "computed phase score");

    breakdown.phases.push(PhaseScore {
      phase,
      name: comparer.name(),
      score: comparison.score,
      weight,
      fields_compared: comparison.fields_compared,
    });

    if comparison.fields_compared > 0 {
      numerator += comparison.score * weight;
      denominator += weight;

      if phase == ScorePhase::NameComparison {
        name_score = Some(comparison.score);
      }
    }
  }

  if weights.supporting_info_weight > 0.0
    && let Some(affiliation_score) = affiliations::best_affiliation_score(bump, query, candidate, &config.similarity)
  {
    breakdown.phases.push(PhaseScore {
      phase: ScorePhase::Aggregation,
      name: "affiliation_match",
      score: affiliation_score,
      weight: weights.supporting_info_weight,
      fields_compared: query.affiliations.len() * candidate.affiliations.len(),
    });

    numerator += affiliation_score * weights.supporting_info_weight;
    denominator += weights.supporting_info_weight;
  }

  let then = Instant::now();
  let aggregate = if denominator > 0.0 { (numerator / denominator).clamp(0.0, 1.0) } else { 0.0 };

  // A name match above the exact-match threshold decides the total on its own,
  // so sparse candidates are not dragged down by absent supporting fields.
  breakdown.total = match name_score {
    Some(name) if name >= weights.exact_match_threshold => name.max(aggregate).clamp(0.0, 1.0),
    _ => aggregate,
  };

  trace.event(ScorePhase::Aggregation, then.elapsed(), || {
    (
      format!("aggregated {} phases for {}", breakdown.phases.len(), candidate.id),
      vec![
        ("entity_id", candidate.id.clone()),
        ("total", format!("{:.4}", breakdown.total)),
        ("weight_total", format!("{denominator:.2}")),
      ],
    )
  });

  breakdown
}

#[cfg(test)]
mod tests {
  use bumpalo::Bump;
  use float_cmp::approx_eq;

  use crate::{
    config::tests::engine_defaults,
    model::{Entity, EntityDetails, GovernmentId, PersonDetails, SearchQuery},
    normalize::TextNormalizer,
    trace::NoopTrace,
  };

  fn scored(query: SearchQuery, candidate: Entity) -> super::ScoreBreakdown {
    let config = engine_defaults();
    let normalizer = TextNormalizer::new();
    let query = normalizer.prepare_query(query, &config.similarity);
    let candidate = normalizer.prepare(candidate, &config.similarity);

    super::score_candidate(&Bump::new(), &query, &candidate, &config, &mut NoopTrace)
  }

  #[test]
  fn exact_name_scores_one() {
    let breakdown = scored(
      SearchQuery::builder("Nicolas Maduro").build(),
      Entity::builder("Nicolas Maduro").id("7140").details(EntityDetails::Person(PersonDetails::default())).build(),
    );

    assert!(approx_eq!(f64, breakdown.total, 1.0));
  }

  #[test]
  fn dissimilar_name_scores_zero() {
    let breakdown = scored(
      SearchQuery::builder("XYZQWERTY").build(),
      Entity::builder("Nicolas Maduro").id("7140").details(EntityDetails::Person(PersonDetails::default())).build(),
    );

    assert!(approx_eq!(f64, breakdown.total, 0.0));
  }

  #[test]
  fn disabled_phase_does_not_contribute() {
    let config = {
      let mut config = engine_defaults();
      config.weights.government_id_enabled = false;
      config
    };

    let normalizer = TextNormalizer::new();

    let query = normalizer.prepare_query(
      SearchQuery::builder("Nicolas Maduro")
        .government_ids(vec![GovernmentId {
          country: "VE".to_string(),
          id_type: "cedula".to_string(),
          identifier: "5892464".to_string(),
        }])
        .build(),
      &config.similarity,
    );

    let candidate = normalizer.prepare(
      Entity::builder("Nicolas Maduro")
        .id("7140")
        .government_ids(vec![GovernmentId {
          country: "VE".to_string(),
          id_type: "cedula".to_string(),
          identifier: "5892464".to_string(),
        }])
        .details(EntityDetails::Person(PersonDetails::default()))
        .build(),
      &config.similarity,
    );

    let breakdown = super::score_candidate(&Bump::new(), &query, &candidate, &config, &mut crate::trace::NoopTrace);

    assert!(breakdown.phases.iter().all(|p| p.name != "gov_id_comparison"));
  }

  #[test]
  fn absent_data_stays_out_of_the_denominator() {
    // Name matches perfectly; no other field is populated on both sides, so
    // the aggregate must not be diluted.
    let breakdown = scored(
      SearchQuery::builder("Test Corp").build(),
      Entity::builder("Test Corp").id("2001").details(EntityDetails::Business(Default::default())).build(),
    );

    assert!(approx_eq!(f64, breakdown.total, 1.0));

    let contributing = breakdown.phases.iter().filter(|p| p.fields_compared > 0).count();

    assert_eq!(contributing, 1);
  }

  #[test]
  fn sub_scores_and_total_stay_in_unit_interval() {
    let query = SearchQuery::builder("Nicolas Maduro")
      .government_ids(vec![GovernmentId {
        country: "VE".to_string(),
        id_type: "cedula".to_string(),
        identifier: "5892464".to_string(),
      }])
      .birth_date("1962-11-23")
      .build();

    let candidate = Entity::builder("Nicolas Maduro Moros")
      .id("7140")
      .government_ids(vec![GovernmentId {
        country: "CU".to_string(),
        id_type: "cedula".to_string(),
        identifier: "5892464".to_string(),
      }])
      .details(EntityDetails::Person(PersonDetails {
        birth_date: Some("1961".to_string()),
        ..Default::default()
      }))
      .build();

    let breakdown = scored(query, candidate);

    assert!((0.0..=1.0).contains(&breakdown.total));

    for phase in &breakdown.phases {
      assert!((0.0..=1.0).contains(&phase.score), "{} out of range: {}", phase.name, phase.score);
    }
  }

  #[test]
  fn scoring_is_deterministic() {
    let build = || {
      (
        SearchQuery::builder("Nicolas Maduro").birth_date("1962-11-23").build(),
        Entity::builder("Nicolas Maduro Moros")
          .id("7140")
          .details(EntityDetails::Person(PersonDetails {
            birth_date: Some("1962-11-23".to_string()),
            ..Default::default()
          }))
          .build(),
      )
    };

    let (q1, c1) = build();
    let (q2, c2) = build();

    assert!(approx_eq!(f64, scored(q1, c1).total, scored(q2, c2).total));
  }
}
