use serde::{Deserialize, Serialize};

use crate::error::CordonError;

/// Effective engine configuration.
///
/// Every field is required: defaults are supplied by an external loader once at
/// startup, and a missing key is a fatal configuration error. The core never
/// falls back to hard-coded values.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
  pub similarity: SimilarityConfig,
  pub weights: WeightsConfig,
  pub search: SearchConfig,
}

/// Tunables of the similarity kernel.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SimilarityConfig {
  /// Jaro score above which the Winkler prefix boost applies.
  pub jaro_winkler_boost_threshold: f64,
  /// Maximum common prefix length considered by the Winkler boost.
  pub jaro_winkler_prefix_size: usize,
  /// Length ratio under which the length-difference penalty kicks in.
  pub length_difference_cutoff_factor: f64,
  pub length_difference_penalty_weight: f64,
  /// Multiplicative penalty for token pairs starting with different letters.
  pub different_letter_penalty_weight: f64,
  pub unmatched_index_token_weight: f64,
  /// Boost added to token pairs that match exactly.
  pub exact_match_favoritism: f64,
  pub phonetic_filtering_disabled: bool,
  pub keep_stopwords: bool,
  pub log_stopword_debugging: bool,
}

/// Phase weights, thresholds and enable flags for the scorer.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct WeightsConfig {
  pub name_weight: f64,
  pub address_weight: f64,
  pub critical_id_weight: f64,
  pub supporting_info_weight: f64,
  /// Aggregate score under which remaining phases may be skipped.
  pub minimum_score: f64,
  /// Name score at or above which the name comparison decides the total.
  pub exact_match_threshold: f64,
  pub name_enabled: bool,
  pub alt_names_enabled: bool,
  pub government_id_enabled: bool,
  pub crypto_enabled: bool,
  pub contact_enabled: bool,
  pub address_enabled: bool,
  pub date_enabled: bool,
}

/// Search-path parameters.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SearchConfig {
  pub min_match: f64,
  pub limit: usize,
  pub batch_max_items: usize,
  pub batch_item_timeout_ms: u64,
}

impl EngineConfig {
  /// Reject configurations that would make scoring meaningless.
  pub fn validate(&self) -> Result<(), CordonError> {
    for (name, value) in [
      ("similarity.jaro_winkler_boost_threshold", self.similarity.jaro_winkler_boost_threshold),
      ("similarity.length_difference_cutoff_factor", self.similarity.length_difference_cutoff_factor),
      ("weights.minimum_score", self.weights.minimum_score),
      ("weights.exact_match_threshold", self.weights.exact_match_threshold),
      ("search.min_match", self.search.min_match),
    ] {
      if !(0.0..=1.0).contains(&value) {
        return Err(CordonError::ConfigError(format!("{name} must be within [0, 1], got {value}")));
      }
    }

    for (name, value) in [
      ("weights.name_weight", self.weights.name_weight),
      ("weights.address_weight", self.weights.address_weight),
      ("weights.critical_id_weight", self.weights.critical_id_weight),
      ("weights.supporting_info_weight", self.weights.supporting_info_weight),
      ("similarity.length_difference_penalty_weight", self.similarity.length_difference_penalty_weight),
      ("similarity.different_letter_penalty_weight", self.similarity.different_letter_penalty_weight),
      ("similarity.unmatched_index_token_weight", self.similarity.unmatched_index_token_weight),
      ("similarity.exact_match_favoritism", self.similarity.exact_match_favoritism),
    ] {
      if value < 0.0 {
        return Err(CordonError::ConfigError(format!("{name} must not be negative, got {value}")));
      }
    }

    if self.weights.name_weight + self.weights.address_weight + self.weights.critical_id_weight + self.weights.supporting_info_weight <= 0.0 {
      return Err(CordonError::ConfigError("at least one phase weight must be positive".to_string()));
    }

    if self.search.limit == 0 {
      return Err(CordonError::ConfigError("search.limit must be at least 1".to_string()));
    }

    if self.search.batch_max_items == 0 {
      return Err(CordonError::ConfigError("search.batch_max_items must be at least 1".to_string()));
    }

    Ok(())
  }

  /// Layer per-request overrides on top of these defaults, field-wise.
  pub fn resolve(&self, overrides: Option<&ConfigOverride>) -> EngineConfig {
    let Some(overrides) = overrides else {
      return self.clone();
    };

    let mut resolved = self.clone();

    if let Some(similarity) = &overrides.similarity {
      let s = &mut resolved.similarity;

      resolve_field(&mut s.jaro_winkler_boost_threshold, similarity.jaro_winkler_boost_threshold);
      resolve_field(&mut s.jaro_winkler_prefix_size, similarity.jaro_winkler_prefix_size);
      resolve_field(&mut s.length_difference_cutoff_factor, similarity.length_difference_cutoff_factor);
      resolve_field(&mut s.length_difference_penalty_weight, similarity.length_difference_penalty_weight);
      resolve_field(&mut s.different_letter_penalty_weight, similarity.different_letter_penalty_weight);
      resolve_field(&mut s.unmatched_index_token_weight, similarity.unmatched_index_token_weight);
      resolve_field(&mut s.exact_match_favoritism, similarity.exact_match_favoritism);
      resolve_field(&mut s.phonetic_filtering_disabled, similarity.phonetic_filtering_disabled);
      resolve_field(&mut s.keep_stopwords, similarity.keep_stopwords);
      resolve_field(&mut s.log_stopword_debugging, similarity.log_stopword_debugging);
    }

    if let Some(weights) = &overrides.weights {
      let w = &mut resolved.weights;

      resolve_field(&mut w.name_weight, weights.name_weight);
      resolve_field(&mut w.address_weight, weights.address_weight);
      resolve_field(&mut w.critical_id_weight, weights.critical_id_weight);
      resolve_field(&mut w.supporting_info_weight, weights.supporting_info_weight);
      resolve_field(&mut w.minimum_score, weights.minimum_score);
      resolve_field(&mut w.exact_match_threshold, weights.exact_match_threshold);
      resolve_field(&mut w.name_enabled, weights.name_enabled);
      resolve_field(&mut w.alt_names_enabled, weights.alt_names_enabled);
      resolve_field(&mut w.government_id_enabled, weights.government_id_enabled);
      resolve_field(&mut w.crypto_enabled, weights.crypto_enabled);
      resolve_field(&mut w.contact_enabled, weights.contact_enabled);
      resolve_field(&mut w.address_enabled, weights.address_enabled);
      resolve_field(&mut w.date_enabled, weights.date_enabled);
    }

    if let Some(search) = &overrides.search {
      let s = &mut resolved.search;

      resolve_field(&mut s.min_match, search.min_match);
      resolve_field(&mut s.limit, search.limit);
    }

    resolved
  }
}

fn resolve_field<T>(target: &mut T, value: Option<T>) {
  if let Some(value) = value {
    *target = value;
  }
}

/// Per-request configuration overrides. Absent fields keep the default.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigOverride {
  pub similarity: Option<SimilarityOverride>,
  pub weights: Option<WeightsOverride>,
  pub search: Option<SearchOverride>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SimilarityOverride {
  pub jaro_winkler_boost_threshold: Option<f64>,
  pub jaro_winkler_prefix_size: Option<usize>,
  pub length_difference_cutoff_factor: Option<f64>,
  pub length_difference_penalty_weight: Option<f64>,
  pub different_letter_penalty_weight: Option<f64>,
  pub unmatched_index_token_weight: Option<f64>,
  pub exact_match_favoritism: Option<f64>,
  pub phonetic_filtering_disabled: Option<bool>,
  pub keep_stopwords: Option<bool>,
  pub log_stopword_debugging: Option<bool>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct WeightsOverride {
  pub name_weight: Option<f64>,
  pub address_weight: Option<f64>,
  pub critical_id_weight: Option<f64>,
  pub supporting_info_weight: Option<f64>,
  pub minimum_score: Option<f64>,
  pub exact_match_threshold: Option<f64>,
  pub name_enabled: Option<bool>,
  pub alt_names_enabled: Option<bool>,
  pub government_id_enabled: Option<bool>,
  pub crypto_enabled: Option<bool>,
  pub contact_enabled: Option<bool>,
  pub address_enabled: Option<bool>,
  pub date_enabled: Option<bool>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SearchOverride {
  pub min_match: Option<f64>,
  pub limit: Option<usize>,
}
