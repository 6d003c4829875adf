use bumpalo::Bump;
use libcordon_macros::comparer;

use crate::{
  config::EngineConfig,
  model::{Entity, PreparedGovernmentId, SearchQuery},
  scoring::{Comparer, Comparison},
};

/// Country-aware score for one government identifier pair.
///
/// Identifiers are compared in canonical form. A pair only scores when the
/// identifiers match; the country then qualifies the strength of the match.
pub(crate) fn government_id_pair_score(lhs: &PreparedGovernmentId, rhs: &PreparedGovernmentId) -> f64 {
  if lhs.identifier != rhs.identifier {
    return 0.0;
  }

  match (lhs.country.is_empty(), rhs.country.is_empty()) {
    (false, false) if lhs.country == rhs.country => 1.0,
    (false, false) => 0.7,
    _ => 0.9,
  }
}

#[comparer(name = "gov_id_comparison", phase = GovIdComparison, weight = critical_id_weight, toggle = government_id_enabled)]
fn compare(&self, _bump: &Bump, query: &SearchQuery, candidate: &Entity, _config: &EngineConfig) -> Comparison {
  let lhs = &query.prepared().government_ids;
  let rhs = &candidate.prepared().government_ids;

  if lhs.is_empty() || rhs.is_empty() {
    return Comparison::empty();
  }

  let mut best = 0.0f64;
  let mut compared = 0usize;

  for lhs_id in lhs {
    for rhs_id in rhs {
      compared += 1;

      let score = government_id_pair_score(lhs_id, rhs_id);

      if score >= 1.0 {
        return Comparison::of(1.0, compared);
      }

      best = best.max(score);
    }
  }

  Comparison::of(best, compared)
}

#[comparer(name = "crypto_comparison", phase = CryptoComparison, weight = critical_id_weight, toggle = crypto_enabled)]
fn compare(&self, _bump: &Bump, query: &SearchQuery, candidate: &Entity, _config: &EngineConfig) -> Comparison {
  let lhs = &query.prepared().crypto_addresses;
  let rhs = &candidate.prepared().crypto_addresses;

  if lhs.is_empty() || rhs.is_empty() {
    return Comparison::empty();
  }

  let mut compared = 0usize;

  for lhs_wallet in lhs {
    for rhs_wallet in rhs {
      compared += 1;

      // An empty currency on either side matches on the address alone.
      let currency_compatible = lhs_wallet.currency.is_empty() || rhs_wallet.currency.is_empty() || lhs_wallet.currency == rhs_wallet.currency;

      if currency_compatible && lhs_wallet.address == rhs_wallet.address {
        return Comparison::of(1.0, compared);
      }
    }
  }

  Comparison::of(0.0, compared)
}

#[cfg(test)]
mod tests {
  use bumpalo::Bump;

  use crate::{
    config::tests::engine_defaults,
    model::{CryptoAddress, Entity, GovernmentId, PreparedGovernmentId, SearchQuery},
    normalize::TextNormalizer,
    scoring::Comparer,
  };

  fn gov_id(country: &str, id_type: &str, identifier: &str) -> PreparedGovernmentId {
    PreparedGovernmentId {
      country: country.to_string(),
      id_type: id_type.to_string(),
      identifier: identifier.to_string(),
    }
  }

  #[test]
  fn pair_scores_cover_the_documented_domain() {
    let query = gov_id("united states", "passport", "123");

    assert_eq!(super::government_id_pair_score(&query, &gov_id("united states", "passport", "123")), 1.0);
    assert_eq!(super::government_id_pair_score(&query, &gov_id("", "passport", "123")), 0.9);
    assert_eq!(super::government_id_pair_score(&query, &gov_id("canada", "passport", "123")), 0.7);
    assert_eq!(super::government_id_pair_score(&query, &gov_id("united states", "passport", "999")), 0.0);
  }

  #[test]
  fn best_pair_wins_with_early_exit() {
    let config = engine_defaults();
    let normalizer = TextNormalizer::new();

    let query = normalizer.prepare_query(
      SearchQuery::builder("Test Person")
        .government_ids(vec![
          GovernmentId {
            country: "US".to_string(),
            id_type: "passport".to_string(),
            identifier: "A-123".to_string(),
          },
          GovernmentId {
            country: "US".to_string(),
            id_type: "passport".to_string(),
            identifier: "B-999".to_string(),
          },
        ])
        .build(),
      &config.similarity,
    );

    let candidate = normalizer.prepare(
      Entity::builder("Test Person")
        .id("1")
        .government_ids(vec![
          GovernmentId {
            country: "CA".to_string(),
            id_type: "passport".to_string(),
            identifier: "A123".to_string(),
          },
          GovernmentId {
            country: "US".to_string(),
            id_type: "passport".to_string(),
            identifier: "B999".to_string(),
          },
        ])
        .build(),
      &config.similarity,
    );

    let comparison = super::GovIdComparer.compare(&Bump::new(), &query, &candidate, &config);

    assert_eq!(comparison.score, 1.0);
  }

  #[test]
  fn missing_ids_on_either_side_do_not_compare() {
    let config = engine_defaults();
    let normalizer = TextNormalizer::new();

    let query = normalizer.prepare_query(SearchQuery::builder("Test Person").build(), &config.similarity);
    let candidate = normalizer.prepare(
      Entity::builder("Test Person")
        .id("1")
        .government_ids(vec![GovernmentId {
          country: "US".to_string(),
          id_type: "passport".to_string(),
          identifier: "A123".to_string(),
        }])
        .build(),
      &config.similarity,
    );

    let comparison = super::GovIdComparer.compare(&Bump::new(), &query, &candidate, &config);

    assert_eq!(comparison.fields_compared, 0);
  }

  #[test]
  fn vessel_registration_identifiers_match() {
    let config = engine_defaults();
    let normalizer = TextNormalizer::new();

    let query = normalizer.prepare_query(
      SearchQuery::builder("Ever Given")
        .government_ids(vec![GovernmentId {
          country: String::new(),
          id_type: "imo".to_string(),
          identifier: "IMO 9811000".to_string(),
        }])
        .build(),
      &config.similarity,
    );

    let candidate = normalizer.prepare(
      Entity::builder("Ever Given")
        .id("v1")
        .details(crate::model::EntityDetails::Vessel(crate::model::VesselDetails {
          imo_number: Some("IMO9811000".to_string()),
          ..Default::default()
        }))
        .build(),
      &config.similarity,
    );

    let comparison = super::GovIdComparer.compare(&Bump::new(), &query, &candidate, &config);

    // Neither side carries an issuing country.
    assert_eq!(comparison.score, 0.9);
  }

  #[test]
  fn crypto_matches_on_address_when_currency_is_missing() {
    let config = engine_defaults();
    let normalizer = TextNormalizer::new();

    let query = normalizer.prepare_query(
      SearchQuery::builder("Wallet Holder")
        .crypto_addresses(vec![CryptoAddress {
          currency: String::new(),
          address: "bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq".to_string(),
        }])
        .build(),
      &config.similarity,
    );

    let candidate = normalizer.prepare(
      Entity::builder("Wallet Holder")
        .id("1")
        .crypto_addresses(vec![CryptoAddress {
          currency: "XBT".to_string(),
          address: "BC1QAR0SRRR7XFKVY5L643LYDNW9RE59GTZZWF5MDQ".to_string(),
        }])
        .build(),
      &config.similarity,
    );

    let comparison = super::CryptoComparer.compare(&Bump::new(), &query, &candidate, &config);

    assert_eq!(comparison.score, 1.0);
  }

  #[test]
  fn crypto_currency_conflict_blocks_the_match() {
    let config = engine_defaults();
    let normalizer = TextNormalizer::new();

    let query = normalizer.prepare_query(
      SearchQuery::builder("Wallet Holder")
        .crypto_addresses(vec![CryptoAddress {
          currency: "ETH".to_string(),
          address: "0xdeadbeef".to_string(),
        }])
        .build(),
      &config.similarity,
    );

    let candidate = normalizer.prepare(
      Entity::builder("Wallet Holder")
        .id("1")
        .crypto_addresses(vec![CryptoAddress {
          currency: "XBT".to_string(),
          address: "0xdeadbeef".to_string(),
        }])
        .build(),
      &config.similarity,
    );

    let comparison = super::CryptoComparer.compare(&Bump::new(), &query, &candidate, &config);

    assert_eq!(comparison.score, 0.0);
    assert!(comparison.fields_compared > 0);
  }
}
