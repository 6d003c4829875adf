use bumpalo::Bump;
use libcordon_macros::comparer;

use crate::{
  config::EngineConfig,
  model::{Entity, SearchQuery},
  scoring::{Comparer, Comparison},
  similarity::best_pair_score,
};

#[comparer(name = "name_comparison", phase = NameComparison, weight = name_weight, toggle = name_enabled)]
fn compare(&self, bump: &Bump, query: &SearchQuery, candidate: &Entity, config: &EngineConfig) -> Comparison {
  let lhs = query.prepared();
  let rhs = candidate.prepared();

  if lhs.name_tokens.is_empty() || rhs.name_tokens.is_empty() {
    return Comparison::empty();
  }

  if lhs.name == rhs.name {
    return Comparison::of(1.0, 1);
  }

  Comparison::of(best_pair_score(bump, &lhs.name_tokens, &rhs.name_tokens, &config.similarity), 1)
}

#[comparer(name = "alt_name_comparison", phase = AltNameComparison, weight = name_weight, toggle = alt_names_enabled)]
fn compare(&self, bump: &Bump, query: &SearchQuery, candidate: &Entity, config: &EngineConfig) -> Comparison {
  let lhs = query.prepared();
  let rhs = candidate.prepared();

  if rhs.alt_name_tokens.is_empty() {
    return Comparison::empty();
  }

  let mut best = 0.0f64;
  let mut compared = 0usize;

  for lhs_tokens in std::iter::once(&lhs.name_tokens).chain(lhs.alt_name_tokens.iter()) {
    if lhs_tokens.is_empty() {
      continue;
    }

    for rhs_tokens in &rhs.alt_name_tokens {
      compared += 1;
      best = best.max(best_pair_score(bump, lhs_tokens, rhs_tokens, &config.similarity));

      if best >= 1.0 {
        return Comparison::of(1.0, compared);
      }
    }
  }

  if compared == 0 { Comparison::empty() } else { Comparison::of(best, compared) }
}
