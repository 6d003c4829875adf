use std::sync::LazyLock;

use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};
use celes::Country;
use serde::Deserialize;

use crate::normalize::Dictionaries;

/// Display names for jurisdictions whose ISO records do not match the names
/// used across the source lists.
fn jurisdiction_override(upper: &str) -> Option<&'static str> {
  match upper {
    "CZ" | "CZE" | "CZECHIA" | "CZECH REPUBLIC" => Some("Czech Republic"),
    "IR" | "IRN" | "IRAN" => Some("Iran"),
    "KP" | "PRK" | "NORTH KOREA" | "DPRK" => Some("North Korea"),
    "KR" | "KOR" | "SOUTH KOREA" | "REPUBLIC OF KOREA" => Some("South Korea"),
    "RU" | "RUS" | "RUSSIA" | "RUSSIAN FEDERATION" => Some("Russia"),
    "SY" | "SYR" | "SYRIA" | "SYRIAN ARAB REPUBLIC" => Some("Syria"),
    "VE" | "VEN" | "VENEZUELA" => Some("Venezuela"),
    "TW" | "TWN" | "TAIWAN" => Some("Taiwan"),
    "VG" | "VGB" | "VI" | "VIR" | "VIRGIN ISLANDS" | "BRITISH VIRGIN ISLANDS" | "U.S. VIRGIN ISLANDS" => Some("Virgin Islands"),
    "MF" | "MAF" | "SX" | "SXM" | "SAINT MARTIN" | "SINT MAARTEN" => Some("Saint Martin"),
    "US" | "USA" | "UNITED STATES" | "UNITED STATES OF AMERICA" => Some("United States"),
    "GB" | "GBR" | "UK" | "UNITED KINGDOM" | "GREAT BRITAIN" => Some("United Kingdom"),
    _ => None,
  }
}

/// Map ISO 3166 alpha-2/alpha-3 codes and known country names to a single
/// canonical display name. Unknown values pass through unchanged.
pub fn normalize_country(value: &str) -> String {
  let trimmed = value.trim();

  if trimmed.is_empty() {
    return String::new();
  }

  let upper = trimmed.to_uppercase();

  if let Some(display) = jurisdiction_override(&upper) {
    return display.to_string();
  }

  match trimmed.parse::<Country>() {
    Ok(country) => country.long_name.strip_prefix("The ").unwrap_or(country.long_name).to_string(),
    Err(_) => trimmed.to_string(),
  }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Gender {
  Male,
  Female,
  #[default]
  Unknown,
}

impl Gender {
  pub fn as_str(&self) -> &'static str {
    match self {
      Gender::Male => "male",
      Gender::Female => "female",
      Gender::Unknown => "unknown",
    }
  }
}

pub fn normalize_gender(value: Option<&str>) -> Gender {
  match value.map(|v| v.trim().to_lowercase()).as_deref() {
    Some("m" | "male" | "man" | "men" | "guy" | "boy" | "gentleman") => Gender::Male,
    Some("f" | "female" | "woman" | "women" | "gal" | "girl" | "lady") => Gender::Female,
    _ => Gender::Unknown,
  }
}

/// Keep only digits. `+1 (555) 010-1234` and `15550101234` compare equal.
pub fn normalize_phone(value: &str) -> String {
  value.chars().filter(char::is_ascii_digit).collect()
}

/// Strip all non-alphanumeric characters and lower-case.
pub fn canonicalize_identifier(value: &str) -> String {
  value.chars().filter(|c| c.is_alphanumeric()).flat_map(char::to_lowercase).collect()
}

pub(crate) static ADDRESS_FORMS: LazyLock<(AhoCorasick, Vec<String>)> = LazyLock::new(|| {
  let file = Dictionaries::get("dictionaries/address_forms.yml").expect("could not read address forms dictionary");
  let dictionary = serde_yaml::from_slice::<AddressFormDictionary>(&file.data).expect("could not unmarshal address forms dictionary");

  let mut patterns = Vec::new();
  let mut replacements = Vec::new();

  for (long, short) in dictionary.forms {
    patterns.push(long.to_lowercase());
    replacements.push(short);
  }

  (
    AhoCorasickBuilder::new().match_kind(MatchKind::LeftmostLongest).ascii_case_insensitive(true).build(patterns).unwrap(),
    replacements,
  )
});

#[derive(Deserialize)]
struct AddressFormDictionary {
  forms: std::collections::BTreeMap<String, String>,
}

/// Replace whole-word occurrences of dictionary patterns in `haystack`.
pub(crate) fn replace_forms(aho: &AhoCorasick, replacements: &[String], haystack: &str) -> String {
  let bytes = haystack.as_bytes();
  let mut out = String::with_capacity(haystack.len());
  let mut cursor = 0;

  for mat in aho.find_iter(haystack) {
    let start_is_boundary = mat.start() == 0 || bytes.get(mat.start().wrapping_sub(1)).map(|&b| !(b as char).is_alphanumeric()).unwrap_or(true);
    let end_is_boundary = mat.end() == haystack.len() || bytes.get(mat.end()).map(|&b| !(b as char).is_alphanumeric()).unwrap_or(true);

    if start_is_boundary && end_is_boundary {
      out.push_str(&haystack[cursor..mat.start()]);
      out.push_str(&replacements[mat.pattern().as_usize()]);

      cursor = mat.end();
    }
  }

  out.push_str(&haystack[cursor..]);
  out
}
