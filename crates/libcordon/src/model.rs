use std::{fmt, str::FromStr, sync::LazyLock};

use bon::bon;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Watchlist a record originates from.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceList {
  #[default]
  UsOfac,
  UsCsl,
  EuCsl,
  UkCsl,
  UnCsl,
}

impl SourceList {
  pub fn as_str(&self) -> &'static str {
    match self {
      SourceList::UsOfac => "US_OFAC",
      SourceList::UsCsl => "US_CSL",
      SourceList::EuCsl => "EU_CSL",
      SourceList::UkCsl => "UK_CSL",
      SourceList::UnCsl => "UN_CSL",
    }
  }
}

impl fmt::Display for SourceList {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for SourceList {
  type Err = ();

  fn from_str(value: &str) -> Result<Self, Self::Err> {
    match value.to_uppercase().as_str() {
      "US_OFAC" => Ok(SourceList::UsOfac),
      "US_CSL" => Ok(SourceList::UsCsl),
      "EU_CSL" => Ok(SourceList::EuCsl),
      "UK_CSL" => Ok(SourceList::UkCsl),
      "UN_CSL" => Ok(SourceList::UnCsl),
      _ => Err(()),
    }
  }
}

/// Discriminant of the type-specific payload carried by an [`Entity`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityKind {
  Person,
  Business,
  Organization,
  Vessel,
  Aircraft,
  #[default]
  Unknown,
}

impl EntityKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      EntityKind::Person => "PERSON",
      EntityKind::Business => "BUSINESS",
      EntityKind::Organization => "ORGANIZATION",
      EntityKind::Vessel => "VESSEL",
      EntityKind::Aircraft => "AIRCRAFT",
      EntityKind::Unknown => "UNKNOWN",
    }
  }
}

impl fmt::Display for EntityKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for EntityKind {
  type Err = ();

  fn from_str(value: &str) -> Result<Self, Self::Err> {
    match value.to_uppercase().as_str() {
      "PERSON" => Ok(EntityKind::Person),
      "BUSINESS" => Ok(EntityKind::Business),
      "ORGANIZATION" => Ok(EntityKind::Organization),
      "VESSEL" => Ok(EntityKind::Vessel),
      "AIRCRAFT" => Ok(EntityKind::Aircraft),
      _ => Err(()),
    }
  }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct Address {
  #[serde(default)]
  pub line1: String,
  #[serde(default)]
  pub line2: String,
  #[serde(default)]
  pub city: String,
  #[serde(default)]
  pub state: String,
  #[serde(default)]
  pub postal_code: String,
  #[serde(default)]
  pub country: String,
}

impl Address {
  pub fn is_empty(&self) -> bool {
    self.line1.is_empty() && self.line2.is_empty() && self.city.is_empty() && self.state.is_empty() && self.postal_code.is_empty() && self.country.is_empty()
  }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct GovernmentId {
  #[serde(default)]
  pub country: String,
  #[serde(default, rename = "type")]
  pub id_type: String,
  pub identifier: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct CryptoAddress {
  #[serde(default)]
  pub currency: String,
  pub address: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct ContactInfo {
  #[serde(default)]
  pub emails: Vec<String>,
  #[serde(default)]
  pub phones: Vec<String>,
  #[serde(default)]
  pub faxes: Vec<String>,
  #[serde(default)]
  pub websites: Vec<String>,
}

impl ContactInfo {
  pub fn is_empty(&self) -> bool {
    self.emails.is_empty() && self.phones.is_empty() && self.faxes.is_empty() && self.websites.is_empty()
  }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct SanctionsInfo {
  #[serde(default)]
  pub programs: Vec<String>,
  #[serde(default)]
  pub secondary: bool,
  #[serde(default)]
  pub description: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct Affiliation {
  pub entity_name: String,
  #[serde(default, rename = "type")]
  pub kind: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct HistoricalEntry {
  #[serde(default, rename = "type")]
  pub kind: String,
  pub value: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct PersonDetails {
  #[serde(default)]
  pub birth_date: Option<String>,
  #[serde(default)]
  pub death_date: Option<String>,
  #[serde(default)]
  pub gender: Option<String>,
  #[serde(default)]
  pub titles: Vec<String>,
  #[serde(default)]
  pub alt_names: Vec<String>,
  #[serde(default)]
  pub government_ids: Vec<GovernmentId>,
}

/// Shared payload shape for businesses and organizations.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct OrganizationDetails {
  #[serde(default)]
  pub created: Option<String>,
  #[serde(default)]
  pub dissolved: Option<String>,
  #[serde(default)]
  pub alt_names: Vec<String>,
  #[serde(default)]
  pub government_ids: Vec<GovernmentId>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct VesselDetails {
  #[serde(default)]
  pub imo_number: Option<String>,
  #[serde(default)]
  pub call_sign: Option<String>,
  #[serde(default)]
  pub mmsi: Option<String>,
  #[serde(default)]
  pub vessel_type: Option<String>,
  #[serde(default)]
  pub built: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct AircraftDetails {
  #[serde(default)]
  pub serial_number: Option<String>,
  #[serde(default)]
  pub icao_code: Option<String>,
  #[serde(default)]
  pub model: Option<String>,
  #[serde(default)]
  pub aircraft_type: Option<String>,
  #[serde(default)]
  pub built: Option<String>,
}

/// Type-specific payload of an entity.
///
/// The tag doubles as the entity type on the wire, so a bare
/// `{"type": "PERSON"}` round-trips to `EntityDetails::Person` with an empty
/// payload.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityDetails {
  Person(PersonDetails),
  Business(OrganizationDetails),
  Organization(OrganizationDetails),
  Vessel(VesselDetails),
  Aircraft(AircraftDetails),
  #[default]
  Unknown,
}

impl EntityDetails {
  pub fn kind(&self) -> EntityKind {
    match self {
      EntityDetails::Person(_) => EntityKind::Person,
      EntityDetails::Business(_) => EntityKind::Business,
      EntityDetails::Organization(_) => EntityKind::Organization,
      EntityDetails::Vessel(_) => EntityKind::Vessel,
      EntityDetails::Aircraft(_) => EntityKind::Aircraft,
      EntityDetails::Unknown => EntityKind::Unknown,
    }
  }

  pub(crate) fn alt_names(&self) -> &[String] {
    match self {
      EntityDetails::Person(person) => &person.alt_names,
      EntityDetails::Business(org) | EntityDetails::Organization(org) => &org.alt_names,
      _ => &[],
    }
  }

  pub(crate) fn government_ids(&self) -> &[GovernmentId] {
    match self {
      EntityDetails::Person(person) => &person.government_ids,
      EntityDetails::Business(org) | EntityDetails::Organization(org) => &org.government_ids,
      _ => &[],
    }
  }
}

/// Normalized representations derived from an entity's raw fields.
///
/// Populated by [`crate::normalize::TextNormalizer::prepare`] before an entity
/// enters the index. This is the only structure the scorer reads for name, alt
/// name, address, phone and identifier comparisons.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PreparedFields {
  pub name: String,
  pub name_tokens: Vec<String>,
  pub alt_names: Vec<String>,
  pub alt_name_tokens: Vec<Vec<String>>,
  pub addresses: Vec<PreparedAddress>,
  pub phones: Vec<String>,
  pub faxes: Vec<String>,
  pub emails: Vec<String>,
  pub government_ids: Vec<PreparedGovernmentId>,
  pub crypto_addresses: Vec<PreparedCryptoAddress>,
}

impl PreparedFields {
  pub fn is_empty(&self) -> bool {
    self.name.is_empty() && self.alt_names.is_empty()
  }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PreparedAddress {
  pub line1: String,
  pub line2: String,
  pub city: String,
  pub state: String,
  pub postal_code: String,
  pub country: String,
  /// All populated fields flattened into one token bundle for scoring.
  pub tokens: Vec<String>,
}

impl PreparedAddress {
  /// Key used to deduplicate addresses during merge.
  pub(crate) fn dedupe_key(&self) -> (String, String) {
    (self.line1.clone(), self.line2.clone())
  }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PreparedGovernmentId {
  pub country: String,
  pub id_type: String,
  pub identifier: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PreparedCryptoAddress {
  pub currency: String,
  pub address: String,
}

/// A single watchlist record.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct Entity {
  pub id: String,
  pub name: String,
  #[serde(default)]
  pub source: SourceList,
  #[serde(default)]
  pub source_id: String,
  #[serde(default)]
  pub alt_names: Vec<String>,
  #[serde(default)]
  pub addresses: Vec<Address>,
  #[serde(default)]
  pub government_ids: Vec<GovernmentId>,
  #[serde(default)]
  pub crypto_addresses: Vec<CryptoAddress>,
  #[serde(default)]
  pub contact: ContactInfo,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub sanctions_info: Option<SanctionsInfo>,
  #[serde(default)]
  pub historical_info: Vec<HistoricalEntry>,
  #[serde(default)]
  pub affiliations: Vec<Affiliation>,
  #[serde(default)]
  pub details: EntityDetails,

  #[serde(skip)]
  pub prepared: PreparedFields,
}

static EMPTY_PREPARED: LazyLock<PreparedFields> = LazyLock::new(PreparedFields::default);

impl Entity {
  pub fn kind(&self) -> EntityKind {
    self.details.kind()
  }

  /// Whether the derived normalization cache has been populated.
  pub fn is_prepared(&self) -> bool {
    !self.prepared.is_empty()
  }

  pub(crate) fn prepared(&self) -> &PreparedFields {
    if self.is_prepared() { &self.prepared } else { &EMPTY_PREPARED }
  }

  /// Government identifiers from the top level and the type payload.
  pub fn all_government_ids(&self) -> impl Iterator<Item = &GovernmentId> {
    self.government_ids.iter().chain(self.details.government_ids().iter())
  }

  /// Alternate names from the top level and the type payload.
  pub fn all_alt_names(&self) -> impl Iterator<Item = &String> {
    self.alt_names.iter().chain(self.details.alt_names().iter())
  }

  /// Key under which records from the same source are folded together.
  pub fn merge_key(&self) -> (String, String, String) {
    (self.source.as_str().to_lowercase(), self.source_id.to_lowercase(), self.kind().as_str().to_lowercase())
  }
}

#[bon]
impl Entity {
  #[builder]
  pub fn builder(
    #[builder(start_fn)] name: &str,
    id: Option<&str>,
    #[builder(default)] source: SourceList,
    source_id: Option<&str>,
    #[builder(default)] details: EntityDetails,
    #[builder(default)] alt_names: Vec<String>,
    #[builder(default)] addresses: Vec<Address>,
    #[builder(default)] government_ids: Vec<GovernmentId>,
    #[builder(default)] crypto_addresses: Vec<CryptoAddress>,
    #[builder(default)] contact: ContactInfo,
    sanctions_info: Option<SanctionsInfo>,
    #[builder(default)] affiliations: Vec<Affiliation>,
    #[builder(default)] historical_info: Vec<HistoricalEntry>,
  ) -> Entity {
    let id = id.map(ToOwned::to_owned).unwrap_or_default();

    Entity {
      source_id: source_id.map(ToOwned::to_owned).unwrap_or_else(|| id.clone()),
      id,
      name: name.to_string(),
      source,
      alt_names,
      addresses,
      government_ids,
      crypto_addresses,
      contact,
      sanctions_info,
      historical_info,
      affiliations,
      details,
      prepared: PreparedFields::default(),
    }
  }
}

/// Search terms scored against every candidate in the index.
#[derive(Clone, Debug, Default, Deserialize, Validate)]
pub struct SearchQuery {
  #[validate(length(min = 1, message = "name must not be blank"))]
  pub name: String,
  pub kind: Option<EntityKind>,
  pub source: Option<SourceList>,
  #[serde(default)]
  pub alt_names: Vec<String>,
  #[serde(default)]
  pub addresses: Vec<Address>,
  #[serde(default)]
  pub government_ids: Vec<GovernmentId>,
  #[serde(default)]
  pub crypto_addresses: Vec<CryptoAddress>,
  #[serde(default)]
  pub contact: ContactInfo,
  #[serde(default)]
  pub affiliations: Vec<Affiliation>,
  pub birth_date: Option<String>,
  pub created: Option<String>,
  pub built: Option<String>,

  // Precomputed once per request to skip the work for every candidate.
  #[serde(skip)]
  pub(crate) prepared: PreparedFields,
}

#[bon]
impl SearchQuery {
  #[builder]
  pub fn builder(
    #[builder(start_fn)] name: &str,
    kind: Option<EntityKind>,
    source: Option<SourceList>,
    #[builder(default)] alt_names: Vec<String>,
    #[builder(default)] addresses: Vec<Address>,
    #[builder(default)] government_ids: Vec<GovernmentId>,
    #[builder(default)] crypto_addresses: Vec<CryptoAddress>,
    #[builder(default)] contact: ContactInfo,
    #[builder(default)] affiliations: Vec<Affiliation>,
    birth_date: Option<&str>,
    created: Option<&str>,
    built: Option<&str>,
  ) -> SearchQuery {
    SearchQuery {
      name: name.to_string(),
      kind,
      source,
      alt_names,
      addresses,
      government_ids,
      crypto_addresses,
      contact,
      affiliations,
      birth_date: birth_date.map(ToOwned::to_owned),
      created: created.map(ToOwned::to_owned),
      built: built.map(ToOwned::to_owned),
      prepared: PreparedFields::default(),
    }
  }
}

impl SearchQuery {
  pub fn is_prepared(&self) -> bool {
    !self.prepared.is_empty()
  }

  pub(crate) fn prepared(&self) -> &PreparedFields {
    if self.is_prepared() { &self.prepared } else { &EMPTY_PREPARED }
  }

  /// Date relevant when compared against a candidate of `kind`.
  pub(crate) fn date_for(&self, kind: EntityKind) -> Option<&str> {
    match kind {
      EntityKind::Person => self.birth_date.as_deref(),
      EntityKind::Business | EntityKind::Organization => self.created.as_deref(),
      EntityKind::Vessel | EntityKind::Aircraft => self.built.as_deref(),
      EntityKind::Unknown => None,
    }
  }
}
