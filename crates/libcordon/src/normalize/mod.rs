pub(crate) mod language;
pub(crate) mod stopwords;
pub mod values;

pub use language::Lang;

use itertools::Itertools;
use rust_embed::Embed;
use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};
use whatlang::Detector;

use crate::{
  config::SimilarityConfig,
  model::{Address, Entity, EntityDetails, PreparedAddress, PreparedCryptoAddress, PreparedFields, PreparedGovernmentId, SearchQuery},
  normalize::values::{ADDRESS_FORMS, canonicalize_identifier, normalize_country, normalize_gender, normalize_phone, replace_forms},
};

#[derive(Embed)]
#[folder = "./assets"]
pub(crate) struct Dictionaries;

/// Text normalization pipeline shared by ingestion and query preparation.
///
/// Construct once and pass by reference; all methods are pure and the struct is
/// safe to share across threads.
pub struct TextNormalizer {
  detector: Detector,
}

impl Default for TextNormalizer {
  fn default() -> Self {
    TextNormalizer::new()
  }
}

impl TextNormalizer {
  pub fn new() -> TextNormalizer {
    TextNormalizer { detector: Detector::new() }
  }

  /// NFD, strip diacritics, transliterate a fixed set, lower-case, fold
  /// separator punctuation to spaces, drop the rest, collapse whitespace.
  pub fn normalize(&self, input: &str) -> String {
    let mut transliterated = String::with_capacity(input.len());

    for c in input.nfd() {
      if is_combining_mark(c) {
        continue;
      }

      match c {
        'ð' | 'Ð' => transliterated.push('d'),
        'þ' | 'Þ' => transliterated.push_str("th"),
        'æ' | 'Æ' => transliterated.push_str("ae"),
        'œ' | 'Œ' => transliterated.push_str("oe"),
        'ø' | 'Ø' => transliterated.push('o'),
        'ł' | 'Ł' => transliterated.push('l'),
        'ß' => transliterated.push_str("ss"),
        _ => transliterated.extend(c.to_lowercase()),
      }
    }

    let mut cleaned = String::with_capacity(transliterated.len());

    for c in transliterated.chars() {
      match c {
        '.' | ',' | '-' => cleaned.push(' '),
        c if c.is_alphanumeric() || c.is_whitespace() => cleaned.push(c),
        _ => {}
      }
    }

    cleaned.split_whitespace().join(" ")
  }

  pub fn tokenize(&self, normalized: &str) -> Vec<String> {
    normalized.split_whitespace().map(ToOwned::to_owned).collect()
  }

  pub fn detect_language(&self, text: &str, country_hint: Option<&str>) -> Lang {
    language::detect(&self.detector, text, country_hint)
  }

  /// Tokenize a normalized name, dropping stopwords for the detected language.
  ///
  /// Token order is preserved. A name made up entirely of stopwords keeps its
  /// tokens, since an empty token list would make the name unmatchable.
  pub fn name_tokens(&self, normalized: &str, lang: Lang, similarity: &SimilarityConfig) -> Vec<String> {
    let tokens = self.tokenize(normalized);

    if similarity.keep_stopwords {
      return tokens;
    }

    let kept = tokens.iter().filter(|t| !stopwords::is_stopword(lang, t)).cloned().collect::<Vec<_>>();

    if similarity.log_stopword_debugging {
      for token in tokens.iter().filter(|t| stopwords::is_stopword(lang, t)) {
        tracing::debug!(token = token.as_str(), lang = lang.code(), "dropped stopword");
      }
    }

    if kept.is_empty() { tokens } else { kept }
  }

  pub fn prepare_address(&self, address: &Address) -> PreparedAddress {
    let (aho, replacements) = &*ADDRESS_FORMS;

    let mut prepared = PreparedAddress {
      line1: replace_forms(aho, replacements, &self.normalize(&address.line1)),
      line2: replace_forms(aho, replacements, &self.normalize(&address.line2)),
      city: self.normalize(&address.city),
      state: self.normalize(&address.state),
      postal_code: self.normalize(&address.postal_code),
      country: normalize_country(&address.country).to_lowercase(),
      tokens: Vec::new(),
    };

    prepared.tokens = [&prepared.line1, &prepared.line2, &prepared.city, &prepared.state, &prepared.postal_code, &prepared.country]
      .into_iter()
      .filter(|f| !f.is_empty())
      .flat_map(|f| f.split_whitespace())
      .map(ToOwned::to_owned)
      .collect();

    prepared
  }

  /// Return a copy of `entity` with [`PreparedFields`] populated.
  ///
  /// Idempotent: preparing an already prepared entity rebuilds the same cache.
  pub fn prepare(&self, mut entity: Entity, similarity: &SimilarityConfig) -> Entity {
    entity.name = entity.name.trim().to_string();
    clean_strings(&mut entity.alt_names);
    clean_strings(&mut entity.contact.emails);
    clean_strings(&mut entity.contact.phones);
    clean_strings(&mut entity.contact.faxes);
    clean_strings(&mut entity.contact.websites);

    if let Some(sanctions) = &mut entity.sanctions_info {
      clean_strings(&mut sanctions.programs);
      sanctions.description = sanctions.description.trim().to_string();
    }

    match &mut entity.details {
      EntityDetails::Person(person) => {
        clean_strings(&mut person.alt_names);
        clean_strings(&mut person.titles);

        if let Some(gender) = &person.gender {
          person.gender = Some(normalize_gender(Some(gender)).as_str().to_string());
        }
      }

      EntityDetails::Business(org) | EntityDetails::Organization(org) => {
        clean_strings(&mut org.alt_names);
      }

      _ => {}
    }

    let country_hint = entity.addresses.iter().map(|a| a.country.as_str()).find(|c| !c.is_empty()).map(ToOwned::to_owned);
    let country_hint = country_hint.as_deref();

    let lang = self.detect_language(&entity.name, country_hint);
    let name = self.normalize(&entity.name);
    let name_tokens = self.name_tokens(&name, lang, similarity);

    // Former names from the historical record are matchable aliases too.
    let historical_names = entity.historical_info.iter().filter(|entry| entry.kind.to_lowercase().contains("name")).map(|entry| &entry.value);

    let alt_names = entity
      .all_alt_names()
      .chain(historical_names)
      .map(|alt| {
        let lang = self.detect_language(alt, country_hint);
        let normalized = self.normalize(alt);
        let tokens = self.name_tokens(&normalized, lang, similarity);

        (normalized, tokens)
      })
      .filter(|(normalized, _)| !normalized.is_empty())
      .unique_by(|(normalized, _)| normalized.clone())
      .collect::<Vec<_>>();

    let (alt_names, alt_name_tokens) = alt_names.into_iter().unzip();

    entity.prepared = PreparedFields {
      name,
      name_tokens,
      alt_names,
      alt_name_tokens,
      addresses: entity.addresses.iter().filter(|a| !a.is_empty()).map(|a| self.prepare_address(a)).collect(),
      phones: entity.contact.phones.iter().map(|p| normalize_phone(p)).filter(|p| !p.is_empty()).unique().collect(),
      faxes: entity.contact.faxes.iter().map(|f| normalize_phone(f)).filter(|f| !f.is_empty()).unique().collect(),
      emails: entity.contact.emails.iter().map(|e| e.to_lowercase()).unique().collect(),
      government_ids: prepare_government_ids(&entity),
      crypto_addresses: entity
        .crypto_addresses
        .iter()
        .filter(|c| !c.address.trim().is_empty())
        .map(|c| PreparedCryptoAddress {
          currency: c.currency.trim().to_lowercase(),
          address: c.address.trim().to_lowercase(),
        })
        .unique_by(|c| (c.currency.clone(), c.address.clone()))
        .collect(),
    };

    entity
  }

  /// Precompute the query-side normalization cache once per request.
  pub fn prepare_query(&self, mut query: SearchQuery, similarity: &SimilarityConfig) -> SearchQuery {
    query.name = query.name.trim().to_string();
    clean_strings(&mut query.alt_names);

    let country_hint = query.addresses.iter().map(|a| a.country.as_str()).find(|c| !c.is_empty()).map(ToOwned::to_owned);
    let country_hint = country_hint.as_deref();

    let lang = self.detect_language(&query.name, country_hint);
    let name = self.normalize(&query.name);
    let name_tokens = self.name_tokens(&name, lang, similarity);

    let alt_names = query
      .alt_names
      .iter()
      .map(|alt| {
        let lang = self.detect_language(alt, country_hint);
        let normalized = self.normalize(alt);
        let tokens = self.name_tokens(&normalized, lang, similarity);

        (normalized, tokens)
      })
      .filter(|(normalized, _)| !normalized.is_empty())
      .unique_by(|(normalized, _)| normalized.clone())
      .collect::<Vec<_>>();

    let (alt_names, alt_name_tokens) = alt_names.into_iter().unzip();

    query.prepared = PreparedFields {
      name,
      name_tokens,
      alt_names,
      alt_name_tokens,
      addresses: query.addresses.iter().filter(|a| !a.is_empty()).map(|a| self.prepare_address(a)).collect(),
      phones: query.contact.phones.iter().map(|p| normalize_phone(p)).filter(|p| !p.is_empty()).unique().collect(),
      faxes: query.contact.faxes.iter().map(|f| normalize_phone(f)).filter(|f| !f.is_empty()).unique().collect(),
      emails: query.contact.emails.iter().map(|e| e.trim().to_lowercase()).filter(|e| !e.is_empty()).unique().collect(),
      government_ids: query
        .government_ids
        .iter()
        .filter(|id| !id.identifier.trim().is_empty())
        .map(|id| PreparedGovernmentId {
          country: normalize_country(&id.country).to_lowercase(),
          id_type: id.id_type.trim().to_lowercase(),
          identifier: canonicalize_identifier(&id.identifier),
        })
        .collect(),
      crypto_addresses: query
        .crypto_addresses
        .iter()
        .filter(|c| !c.address.trim().is_empty())
        .map(|c| PreparedCryptoAddress {
          currency: c.currency.trim().to_lowercase(),
          address: c.address.trim().to_lowercase(),
        })
        .collect(),
    };

    query
  }
}

fn prepare_government_ids(entity: &Entity) -> Vec<PreparedGovernmentId> {
  let mut ids = entity
    .all_government_ids()
    .filter(|id| !id.identifier.trim().is_empty())
    .map(|id| PreparedGovernmentId {
      country: normalize_country(&id.country).to_lowercase(),
      id_type: id.id_type.trim().to_lowercase(),
      identifier: canonicalize_identifier(&id.identifier),
    })
    .collect::<Vec<_>>();

  // Registration identifiers carried by vessel and aircraft payloads take part
  // in identifier matching alongside government-issued ones.
  let registration: Vec<(&'static str, Option<&str>)> = match &entity.details {
    EntityDetails::Vessel(vessel) => vec![("imo", vessel.imo_number.as_deref()), ("mmsi", vessel.mmsi.as_deref()), ("call_sign", vessel.call_sign.as_deref())],
    EntityDetails::Aircraft(aircraft) => vec![("serial", aircraft.serial_number.as_deref()), ("icao", aircraft.icao_code.as_deref())],
    _ => Vec::new(),
  };

  for (id_type, value) in registration {
    if let Some(value) = value {
      let identifier = canonicalize_identifier(value);

      if !identifier.is_empty() {
        ids.push(PreparedGovernmentId {
          country: String::new(),
          id_type: id_type.to_string(),
          identifier,
        });
      }
    }
  }

  ids.into_iter().unique_by(|id| (id.country.clone(), id.id_type.clone(), id.identifier.clone())).collect()
}

fn clean_strings(values: &mut Vec<String>) {
  values.retain_mut(|value| {
    *value = value.trim().to_string();

    !value.is_empty()
  });
}

#[cfg(test)]
mod tests {
  use crate::{
    config::tests::similarity_defaults,
    model::{Address, ContactInfo, Entity, EntityDetails, GovernmentId, HistoricalEntry, PersonDetails, VesselDetails},
  };

  use super::TextNormalizer;

  #[test]
  fn normalize_pipeline() {
    let normalizer = TextNormalizer::new();

    assert_eq!(normalizer.normalize("  Nicolás   MADURO-Moros.  "), "nicolas maduro moros");
    assert_eq!(normalizer.normalize("Łukasz Þór Ærøskøbing"), "lukasz thor aeroskobing");
    assert_eq!(normalizer.normalize("O'Brien & Sons, Ltd."), "obrien sons ltd");
    assert_eq!(normalizer.normalize("ACME (HOLDINGS) — GROUP"), "acme holdings group");
    assert_eq!(normalizer.normalize("Großmann"), "grossmann");
    assert_eq!(normalizer.normalize(""), "");
  }

  #[test]
  fn normalize_is_idempotent() {
    let normalizer = TextNormalizer::new();

    for input in ["Nicolás MADURO-Moros", "Łukasz Þór", "株式会社日立製作所", "الكرملين"] {
      let once = normalizer.normalize(input);
      let twice = normalizer.normalize(&once);

      assert_eq!(once, twice);
    }
  }

  #[test]
  fn stopwords_preserve_token_order() {
    let normalizer = TextNormalizer::new();
    let similarity = similarity_defaults();

    let normalized = normalizer.normalize("Bank of the North");
    let tokens = normalizer.name_tokens(&normalized, crate::normalize::Lang::English, &similarity);

    assert_eq!(tokens, vec!["bank", "north"]);
  }

  #[test]
  fn all_stopword_name_keeps_tokens() {
    let normalizer = TextNormalizer::new();
    let similarity = similarity_defaults();

    let tokens = normalizer.name_tokens("the", crate::normalize::Lang::English, &similarity);

    assert_eq!(tokens, vec!["the"]);
  }

  #[test]
  fn keep_stopwords_bypasses_removal() {
    let normalizer = TextNormalizer::new();
    let mut similarity = similarity_defaults();
    similarity.keep_stopwords = true;

    let tokens = normalizer.name_tokens("bank of america", crate::normalize::Lang::English, &similarity);

    assert_eq!(tokens, vec!["bank", "of", "america"]);
  }

  #[test]
  fn prepare_populates_cache() {
    let normalizer = TextNormalizer::new();
    let similarity = similarity_defaults();

    let entity = Entity::builder("Nicolás Maduro")
      .id("7140")
      .alt_names(vec!["  ".to_string(), "MADURO MOROS, Nicolas".to_string()])
      .addresses(vec![Address {
        line1: "123 Bolivar Avenue".to_string(),
        city: "Caracas".to_string(),
        country: "VE".to_string(),
        ..Default::default()
      }])
      .government_ids(vec![GovernmentId {
        country: "VE".to_string(),
        id_type: "Cedula".to_string(),
        identifier: "V-5.892.464".to_string(),
      }])
      .contact(ContactInfo {
        emails: vec!["Maduro@Example.COM".to_string()],
        phones: vec!["+58 (212) 555-0101".to_string()],
        ..Default::default()
      })
      .details(EntityDetails::Person(PersonDetails {
        gender: Some("M".to_string()),
        ..Default::default()
      }))
      .build();

    let entity = normalizer.prepare(entity, &similarity);

    assert!(entity.is_prepared());
    assert_eq!(entity.prepared.name, "nicolas maduro");
    assert_eq!(entity.prepared.alt_names, vec!["maduro moros nicolas"]);
    assert_eq!(entity.prepared.addresses[0].line1, "123 bolivar ave");
    assert_eq!(entity.prepared.addresses[0].country, "venezuela");
    assert_eq!(entity.prepared.phones, vec!["582125550101"]);
    assert_eq!(entity.prepared.emails, vec!["maduro@example.com"]);
    assert_eq!(entity.prepared.government_ids[0].identifier, "v5892464");
    assert_eq!(entity.prepared.government_ids[0].country, "venezuela");

    match &entity.details {
      EntityDetails::Person(person) => assert_eq!(person.gender.as_deref(), Some("male")),
      _ => unreachable!(),
    }
  }

  #[test]
  fn vessel_registration_ids_are_prepared() {
    let normalizer = TextNormalizer::new();
    let similarity = similarity_defaults();

    let entity = normalizer.prepare(
      Entity::builder("Ever Given")
        .id("9811000")
        .details(EntityDetails::Vessel(VesselDetails {
          imo_number: Some("IMO 9811000".to_string()),
          mmsi: Some("353136000".to_string()),
          ..Default::default()
        }))
        .build(),
      &similarity,
    );

    let ids: Vec<_> = entity.prepared.government_ids.iter().map(|id| (id.id_type.as_str(), id.identifier.as_str())).collect();

    assert!(ids.contains(&("imo", "imo9811000")));
    assert!(ids.contains(&("mmsi", "353136000")));
  }

  #[test]
  fn former_names_become_alt_names() {
    let normalizer = TextNormalizer::new();
    let similarity = similarity_defaults();

    let entity = normalizer.prepare(
      Entity::builder("Knock Nevis")
        .id("1")
        .historical_info(vec![
          HistoricalEntry {
            kind: "former name".to_string(),
            value: "Seawise Giant".to_string(),
          },
          HistoricalEntry {
            kind: "flag".to_string(),
            value: "Panama".to_string(),
          },
        ])
        .build(),
      &similarity,
    );

    assert_eq!(entity.prepared.alt_names, vec!["seawise giant"]);
  }

  #[test]
  fn prepare_is_idempotent() {
    let normalizer = TextNormalizer::new();
    let similarity = similarity_defaults();

    let entity = Entity::builder("Nicolás Maduro")
      .id("7140")
      .alt_names(vec!["MADURO MOROS, Nicolas".to_string()])
      .details(EntityDetails::Person(PersonDetails::default()))
      .build();

    let once = normalizer.prepare(entity, &similarity);
    let twice = normalizer.prepare(once.clone(), &similarity);

    assert_eq!(once, twice);
  }
}
