use bumpalo::Bump;
use libcordon_macros::comparer;

use crate::{
  config::EngineConfig,
  model::{Entity, SearchQuery},
  scoring::{Comparer, Comparison},
  similarity::best_pair_score,
};

#[comparer(name = "address_comparison", phase = AddressComparison, weight = address_weight, toggle = address_enabled)]
fn compare(&self, bump: &Bump, query: &SearchQuery, candidate: &Entity, config: &EngineConfig) -> Comparison {
  let lhs = &query.prepared().addresses;
  let rhs = &candidate.prepared().addresses;

  if lhs.is_empty() || rhs.is_empty() {
    return Comparison::empty();
  }

  let mut best = 0.0f64;
  let mut compared = 0usize;

  for lhs_address in lhs {
    for rhs_address in rhs {
      if lhs_address.tokens.is_empty() || rhs_address.tokens.is_empty() {
        continue;
      }

      compared += 1;
      best = best.max(best_pair_score(bump, &lhs_address.tokens, &rhs_address.tokens, &config.similarity));

      if best >= 1.0 {
        return Comparison::of(1.0, compared);
      }
    }
  }

  if compared == 0 { Comparison::empty() } else { Comparison::of(best, compared) }
}

#[cfg(test)]
mod tests {
  use bumpalo::Bump;

  use crate::{
    config::tests::engine_defaults,
    model::{Address, Entity, SearchQuery},
    normalize::TextNormalizer,
    scoring::Comparer,
  };

  fn address(line1: &str, city: &str, country: &str) -> Address {
    Address {
      line1: line1.to_string(),
      city: city.to_string(),
      country: country.to_string(),
      ..Default::default()
    }
  }

  fn compare(lhs: Vec<Address>, rhs: Vec<Address>) -> crate::scoring::Comparison {
    let config = engine_defaults();
    let normalizer = TextNormalizer::new();

    let query = normalizer.prepare_query(SearchQuery::builder("Test Person").addresses(lhs).build(), &config.similarity);
    let candidate = normalizer.prepare(Entity::builder("Test Person").id("1").addresses(rhs).build(), &config.similarity);

    super::AddressComparer.compare(&Bump::new(), &query, &candidate, &config)
  }

  #[test]
  fn abbreviated_forms_compare_equal() {
    let comparison = compare(
      vec![address("123 Bolivar Avenue", "Caracas", "VE")],
      vec![address("123 Bolivar Ave", "Caracas", "Venezuela")],
    );

    assert_eq!(comparison.score, 1.0);
  }

  #[test]
  fn best_pair_wins_across_multiple_addresses() {
    let comparison = compare(
      vec![address("1 Main Street", "Springfield", "US")],
      vec![address("99 Elm Road", "Shelbyville", "US"), address("1 Main St", "Springfield", "United States")],
    );

    assert_eq!(comparison.score, 1.0);
    assert!(comparison.fields_compared >= 1);
  }

  #[test]
  fn missing_addresses_do_not_compare() {
    let comparison = compare(vec![], vec![address("1 Main Street", "Springfield", "US")]);

    assert_eq!(comparison.fields_compared, 0);
  }
}
