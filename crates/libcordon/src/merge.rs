use std::{collections::HashMap, sync::Arc};

use ahash::RandomState;

use crate::{
  config::SimilarityConfig,
  model::{Address, Affiliation, CryptoAddress, Entity, EntityDetails, GovernmentId, HistoricalEntry, SanctionsInfo},
  normalize::{TextNormalizer, values::canonicalize_identifier},
};

/// Folds records describing the same subject into one entity.
///
/// Records are grouped by `(lower(source), lower(source_id), lower(type))` and
/// folded left to right: scalars are first-non-empty, sequences are unioned
/// with domain-specific deduplication.
#[derive(Clone)]
pub struct Merger {
  normalizer: Arc<TextNormalizer>,
}

impl Merger {
  pub fn new(normalizer: Arc<TextNormalizer>) -> Merger {
    Merger { normalizer }
  }

  /// Group by merge key, fold each group, and normalize the results.
  pub fn merge(&self, entities: Vec<Entity>, similarity: &SimilarityConfig) -> Vec<Entity> {
    let mut order: Vec<Entity> = Vec::with_capacity(entities.len());
    let mut positions: HashMap<(String, String, String), usize, RandomState> = HashMap::default();

    for entity in entities {
      match positions.get(&entity.merge_key()) {
        Some(index) => {
          let folded = self.merge_two(std::mem::take(&mut order[*index]), entity);

          order[*index] = folded;
        }

        None => {
          positions.insert(entity.merge_key(), order.len());
          order.push(entity);
        }
      }
    }

    order.into_iter().map(|entity| self.normalizer.prepare(entity, similarity)).collect()
  }

  /// Fold `b` into `a`. `a` is the earlier record and wins all scalar fields
  /// it already populates.
  pub fn merge_two(&self, mut a: Entity, b: Entity) -> Entity {
    if a.name.trim().is_empty() {
      a.name = b.name.clone();
    }
    if a.id.trim().is_empty() {
      a.id = b.id;
    }
    if a.source_id.trim().is_empty() {
      a.source_id = b.source_id;
    }

    let mut b_alt_names = b.alt_names;

    if !b.name.trim().is_empty() && !b.name.trim().eq_ignore_ascii_case(a.name.trim()) {
      b_alt_names.push(b.name);
    }

    a.alt_names = merge_strings(&a.alt_names, &b_alt_names);
    a.addresses = self.merge_addresses(a.addresses, b.addresses);
    a.government_ids = merge_government_ids(a.government_ids, b.government_ids);
    a.crypto_addresses = merge_crypto_addresses(a.crypto_addresses, b.crypto_addresses);

    a.contact.emails = merge_strings(&a.contact.emails, &b.contact.emails);
    a.contact.phones = merge_strings(&a.contact.phones, &b.contact.phones);
    a.contact.faxes = merge_strings(&a.contact.faxes, &b.contact.faxes);
    a.contact.websites = merge_strings(&a.contact.websites, &b.contact.websites);

    a.sanctions_info = merge_sanctions(a.sanctions_info, b.sanctions_info);
    a.affiliations = merge_affiliations(a.affiliations, b.affiliations);
    a.historical_info = merge_historical(a.historical_info, b.historical_info);
    a.details = merge_details(a.details, b.details);

    a
  }

  fn merge_addresses(&self, a: Vec<Address>, b: Vec<Address>) -> Vec<Address> {
    let mut out: Vec<Address> = Vec::with_capacity(a.len() + b.len());
    let mut keys: Vec<(String, String)> = Vec::with_capacity(a.len() + b.len());

    for address in a.into_iter().chain(b) {
      if address.is_empty() {
        continue;
      }

      let key = (self.normalizer.normalize(&address.line1), self.normalizer.normalize(&address.line2));

      match keys.iter().position(|k| k == &key) {
        Some(index) => fill_missing_address(&mut out[index], address),
        None => {
          keys.push(key);
          out.push(address);
        }
      }
    }

    out
  }
}

/// Union two string lists.
///
/// The first list is deduplicated case-insensitively, keeping first-seen
/// casing; elements of the second are appended unless an identical (exact,
/// case-sensitive) value is already present. All values are trimmed and blanks
/// are dropped.
pub fn merge_strings(a: &[String], b: &[String]) -> Vec<String> {
  let mut out: Vec<String> = Vec::with_capacity(a.len() + b.len());
  let mut seen_folded: Vec<String> = Vec::with_capacity(a.len());

  for value in a {
    let trimmed = value.trim();

    if trimmed.is_empty() || seen_folded.iter().any(|seen| seen == &trimmed.to_lowercase()) {
      continue;
    }

    seen_folded.push(trimmed.to_lowercase());
    out.push(trimmed.to_string());
  }

  for value in b {
    let trimmed = value.trim();

    if trimmed.is_empty() || out.iter().any(|existing| existing == trimmed) {
      continue;
    }

    out.push(trimmed.to_string());
  }

  out
}

fn fill_missing_address(target: &mut Address, other: Address) {
  for (field, value) in [
    (&mut target.line1, other.line1),
    (&mut target.line2, other.line2),
    (&mut target.city, other.city),
    (&mut target.state, other.state),
    (&mut target.postal_code, other.postal_code),
    (&mut target.country, other.country),
  ] {
    if field.trim().is_empty() && !value.trim().is_empty() {
      *field = value;
    }
  }
}

fn merge_government_ids(a: Vec<GovernmentId>, b: Vec<GovernmentId>) -> Vec<GovernmentId> {
  let mut out: Vec<GovernmentId> = Vec::with_capacity(a.len() + b.len());
  let mut keys: Vec<(String, String, String)> = Vec::new();

  for id in a.into_iter().chain(b) {
    if id.identifier.trim().is_empty() {
      continue;
    }

    let key = (id.country.trim().to_lowercase(), id.id_type.trim().to_lowercase(), canonicalize_identifier(&id.identifier));

    if !keys.contains(&key) {
      keys.push(key);
      out.push(id);
    }
  }

  out
}

fn merge_crypto_addresses(a: Vec<CryptoAddress>, b: Vec<CryptoAddress>) -> Vec<CryptoAddress> {
  let mut out: Vec<CryptoAddress> = Vec::with_capacity(a.len() + b.len());

  for wallet in a.into_iter().chain(b) {
    if wallet.address.trim().is_empty() {
      continue;
    }

    let address = wallet.address.trim().to_lowercase();
    let currency = wallet.currency.trim().to_lowercase();

    let existing = out.iter_mut().find(|seen| {
      let same_address = seen.address.trim().to_lowercase() == address;
      let currency_compatible = currency.is_empty() || seen.currency.trim().is_empty() || seen.currency.trim().to_lowercase() == currency;

      same_address && currency_compatible
    });

    match existing {
      // A record with a currency is more specific than one without.
      Some(seen) => {
        if seen.currency.trim().is_empty() && !currency.is_empty() {
          seen.currency = wallet.currency;
        }
      }

      None => out.push(wallet),
    }
  }

  out
}

fn merge_sanctions(a: Option<SanctionsInfo>, b: Option<SanctionsInfo>) -> Option<SanctionsInfo> {
  match (a, b) {
    (Some(mut a), Some(b)) => {
      if a.description.trim().is_empty() {
        a.description = b.description;
      }

      a.secondary = a.secondary || b.secondary;
      a.programs = merge_strings(&a.programs, &b.programs);

      Some(a)
    }

    (a, b) => a.or(b),
  }
}

fn merge_affiliations(a: Vec<Affiliation>, b: Vec<Affiliation>) -> Vec<Affiliation> {
  let mut out: Vec<Affiliation> = Vec::with_capacity(a.len() + b.len());

  for affiliation in a.into_iter().chain(b) {
    if affiliation.entity_name.trim().is_empty() {
      continue;
    }

    let duplicate = out
      .iter()
      .any(|seen| seen.entity_name.trim().to_lowercase() == affiliation.entity_name.trim().to_lowercase() && seen.kind.trim().to_lowercase() == affiliation.kind.trim().to_lowercase());

    if !duplicate {
      out.push(affiliation);
    }
  }

  out
}

fn merge_historical(a: Vec<HistoricalEntry>, b: Vec<HistoricalEntry>) -> Vec<HistoricalEntry> {
  let mut out: Vec<HistoricalEntry> = Vec::with_capacity(a.len() + b.len());

  for entry in a.into_iter().chain(b) {
    if entry.value.trim().is_empty() {
      continue;
    }

    let duplicate = out
      .iter()
      .any(|seen| seen.kind.trim().to_lowercase() == entry.kind.trim().to_lowercase() && seen.value.trim().to_lowercase() == entry.value.trim().to_lowercase());

    if !duplicate {
      out.push(entry);
    }
  }

  out
}

fn first_non_empty(a: Option<String>, b: Option<String>) -> Option<String> {
  match a {
    Some(value) if !value.trim().is_empty() => Some(value),
    _ => b.filter(|value| !value.trim().is_empty()),
  }
}

fn merge_details(a: EntityDetails, b: EntityDetails) -> EntityDetails {
  match (a, b) {
    (EntityDetails::Unknown, b) => b,
    (a, EntityDetails::Unknown) => a,

    (EntityDetails::Person(mut a), EntityDetails::Person(b)) => {
      a.birth_date = first_non_empty(a.birth_date, b.birth_date);
      a.death_date = first_non_empty(a.death_date, b.death_date);
      a.gender = first_non_empty(a.gender, b.gender);
      a.titles = merge_strings(&a.titles, &b.titles);
      a.alt_names = merge_strings(&a.alt_names, &b.alt_names);
      a.government_ids = merge_government_ids(a.government_ids, b.government_ids);

      EntityDetails::Person(a)
    }

    (EntityDetails::Business(a), EntityDetails::Business(b)) => EntityDetails::Business(merge_organizations(a, b)),
    (EntityDetails::Organization(a), EntityDetails::Organization(b)) => EntityDetails::Organization(merge_organizations(a, b)),

    (EntityDetails::Vessel(mut a), EntityDetails::Vessel(b)) => {
      a.imo_number = first_non_empty(a.imo_number, b.imo_number);
      a.call_sign = first_non_empty(a.call_sign, b.call_sign);
      a.mmsi = first_non_empty(a.mmsi, b.mmsi);
      a.vessel_type = first_non_empty(a.vessel_type, b.vessel_type);
      a.built = first_non_empty(a.built, b.built);

      EntityDetails::Vessel(a)
    }

    (EntityDetails::Aircraft(mut a), EntityDetails::Aircraft(b)) => {
      a.serial_number = first_non_empty(a.serial_number, b.serial_number);
      a.icao_code = first_non_empty(a.icao_code, b.icao_code);
      a.model = first_non_empty(a.model, b.model);
      a.aircraft_type = first_non_empty(a.aircraft_type, b.aircraft_type);
      a.built = first_non_empty(a.built, b.built);

      EntityDetails::Aircraft(a)
    }

    // Groups never mix payload kinds: the merge key includes the type.
    (a, _) => a,
  }
}

fn merge_organizations(mut a: crate::model::OrganizationDetails, b: crate::model::OrganizationDetails) -> crate::model::OrganizationDetails {
  a.created = first_non_empty(a.created, b.created);
  a.dissolved = first_non_empty(a.dissolved, b.dissolved);
  a.alt_names = merge_strings(&a.alt_names, &b.alt_names);
  a.government_ids = merge_government_ids(a.government_ids, b.government_ids);

  a
}
