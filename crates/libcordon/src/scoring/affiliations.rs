use bumpalo::Bump;

use crate::{
  config::SimilarityConfig,
  model::{Affiliation, Entity, SearchQuery},
  similarity::best_pair_score,
};

/// Closed taxonomy of affiliation kinds.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum AffiliationGroup {
  Ownership,
  Control,
  Association,
  Leadership,
}

fn group(kind: &str) -> Option<AffiliationGroup> {
  match kind.trim().to_lowercase().as_str() {
    "ownership" | "owner" | "owned by" | "shareholder" | "parent" | "subsidiary" => Some(AffiliationGroup::Ownership),
    "control" | "controls" | "controlled by" | "operated by" => Some(AffiliationGroup::Control),
    "association" | "associate" | "associated with" | "linked to" | "affiliated with" => Some(AffiliationGroup::Association),
    "leadership" | "leader" | "director" | "officer" | "executive" | "president" => Some(AffiliationGroup::Leadership),
    _ => None,
  }
}

/// 1.0 for the same kind, 0.8 for kinds in the same group, 0.0 otherwise.
pub(crate) fn kind_compatibility(lhs: &str, rhs: &str) -> f64 {
  if lhs.trim().eq_ignore_ascii_case(rhs.trim()) {
    return 1.0;
  }

  match (group(lhs), group(rhs)) {
    (Some(lhs), Some(rhs)) if lhs == rhs => 0.8,
    _ => 0.0,
  }
}

fn affiliation_tokens(name: &str) -> Vec<String> {
  name
    .split_whitespace()
    .map(|token| token.chars().filter(|c| c.is_alphanumeric()).flat_map(char::to_lowercase).collect::<String>())
    .filter(|token| !token.is_empty())
    .collect()
}

/// Combine the affiliated-entity name similarity with the kind compatibility.
pub(crate) fn affiliation_score(bump: &Bump, lhs: &Affiliation, rhs: &Affiliation, similarity: &SimilarityConfig) -> f64 {
  let lhs_tokens = affiliation_tokens(&lhs.entity_name);
  let rhs_tokens = affiliation_tokens(&rhs.entity_name);

  let name_score = best_pair_score(bump, &lhs_tokens, &rhs_tokens, similarity);
  let compatibility = kind_compatibility(&lhs.kind, &rhs.kind);

  let adjustment = if compatibility >= 0.9 {
    0.15
  } else if compatibility > 0.7 {
    0.08
  } else {
    -0.15
  };

  (name_score + adjustment).clamp(0.0, 1.0)
}

/// Best affiliation pairing between a query and a candidate, when both carry
/// affiliations.
pub(crate) fn best_affiliation_score(bump: &Bump, query: &SearchQuery, candidate: &Entity, similarity: &SimilarityConfig) -> Option<f64> {
  if query.affiliations.is_empty() || candidate.affiliations.is_empty() {
    return None;
  }

  let mut best = 0.0f64;

  for lhs in &query.affiliations {
    for rhs in &candidate.affiliations {
      best = best.max(affiliation_score(bump, lhs, rhs, similarity));

      if best >= 1.0 {
        return Some(1.0);
      }
    }
  }

  Some(best)
}
