use bumpalo::Bump;
use libcordon_macros::comparer;

use crate::{
  config::EngineConfig,
  model::{Entity, SearchQuery},
  scoring::{Comparer, Comparison},
};

#[comparer(name = "contact_comparison", phase = ContactComparison, weight = supporting_info_weight, toggle = contact_enabled)]
fn compare(&self, _bump: &Bump, query: &SearchQuery, candidate: &Entity, _config: &EngineConfig) -> Comparison {
  let lhs = query.prepared();
  let rhs = candidate.prepared();

  let mut compared = 0usize;
  let mut matched = 0usize;

  for (lhs_values, rhs_values) in [(&lhs.emails, &rhs.emails), (&lhs.phones, &rhs.phones), (&lhs.faxes, &rhs.faxes)] {
    if lhs_values.is_empty() || rhs_values.is_empty() {
      continue;
    }

    compared += 1;

    if lhs_values.iter().any(|value| rhs_values.contains(value)) {
      matched += 1;
    }
  }

  if compared == 0 {
    return Comparison::empty();
  }

  Comparison::of(matched as f64 / compared as f64, compared)
}
