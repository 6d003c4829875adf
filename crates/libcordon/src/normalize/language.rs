use whatlang::Detector;

/// Languages with dedicated stopword sets.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum Lang {
  #[default]
  English,
  Spanish,
  French,
  German,
  Russian,
  Arabic,
  Chinese,
}

impl Lang {
  pub fn code(&self) -> &'static str {
    match self {
      Lang::English => "en",
      Lang::Spanish => "es",
      Lang::French => "fr",
      Lang::German => "de",
      Lang::Russian => "ru",
      Lang::Arabic => "ar",
      Lang::Chinese => "zh",
    }
  }
}

/// Deterministic script detection by Unicode block.
///
/// A single Cyrillic, Arabic or CJK character is a strong enough signal, even
/// on inputs too short for the statistical detector.
pub(crate) fn script_language(text: &str) -> Option<Lang> {
  for c in text.chars() {
    match c {
      '\u{0400}'..='\u{04FF}' | '\u{0500}'..='\u{052F}' => return Some(Lang::Russian),
      '\u{0600}'..='\u{06FF}' | '\u{0750}'..='\u{077F}' => return Some(Lang::Arabic),
      '\u{4E00}'..='\u{9FFF}' | '\u{3400}'..='\u{4DBF}' => return Some(Lang::Chinese),
      _ => {}
    }
  }

  None
}

/// Closed country-to-language mapping used as a hint for ambiguous Latin input.
pub(crate) fn country_language_hint(country: &str) -> Option<Lang> {
  match country.trim().to_uppercase().as_str() {
    "RU" | "RUS" | "RUSSIA" | "BY" | "BLR" | "BELARUS" => Some(Lang::Russian),
    "ES" | "ESP" | "SPAIN" | "MX" | "MEX" | "MEXICO" | "AR" | "ARG" | "ARGENTINA" | "CO" | "COL" | "COLOMBIA" | "CU" | "CUB" | "CUBA" | "VE" | "VEN" | "VENEZUELA" => Some(Lang::Spanish),
    "FR" | "FRA" | "FRANCE" => Some(Lang::French),
    "DE" | "DEU" | "GERMANY" | "AT" | "AUT" | "AUSTRIA" => Some(Lang::German),
    "CN" | "CHN" | "CHINA" | "TW" | "TWN" | "TAIWAN" => Some(Lang::Chinese),
    "SA" | "SAU" | "SAUDI ARABIA" | "SY" | "SYR" | "SYRIA" | "IQ" | "IRQ" | "IRAQ" | "EG" | "EGY" | "EGYPT" | "AE" | "ARE" | "YE" | "YEM" | "YEMEN" | "IR" | "IRN" | "IRAN" => Some(Lang::Arabic),
    "US" | "USA" | "UNITED STATES" | "GB" | "GBR" | "UK" | "UNITED KINGDOM" => Some(Lang::English),
    _ => None,
  }
}

pub(crate) fn from_whatlang(lang: whatlang::Lang) -> Option<Lang> {
  match lang {
    whatlang::Lang::Eng => Some(Lang::English),
    whatlang::Lang::Spa => Some(Lang::Spanish),
    whatlang::Lang::Fra => Some(Lang::French),
    whatlang::Lang::Deu => Some(Lang::German),
    whatlang::Lang::Rus => Some(Lang::Russian),
    whatlang::Lang::Ara => Some(Lang::Arabic),
    whatlang::Lang::Cmn => Some(Lang::Chinese),
    _ => None,
  }
}

const DETECTOR_CONFIDENCE_FLOOR: f64 = 0.5;

/// Detect the language of `text`, falling back to the country hint and finally
/// to English when the statistical detector is unsure.
pub(crate) fn detect(detector: &Detector, text: &str, country_hint: Option<&str>) -> Lang {
  if let Some(lang) = script_language(text) {
    return lang;
  }

  if text.chars().filter(|c| c.is_alphabetic()).count() >= 3
    && let Some(info) = detector.detect(text)
    && info.confidence() >= DETECTOR_CONFIDENCE_FLOOR
    && let Some(lang) = from_whatlang(info.lang())
  {
    return lang;
  }

  country_hint.and_then(country_language_hint).unwrap_or_default()
}

#[cfg(test)]
mod tests {
  use whatlang::Detector;

  use super::Lang;

  #[test]
  fn script_language() {
    assert_eq!(super::script_language("Владимир Путин"), Some(Lang::Russian));
    assert_eq!(super::script_language("محمد"), Some(Lang::Arabic));
    assert_eq!(super::script_language("习近平"), Some(Lang::Chinese));
    assert_eq!(super::script_language("Vladimir Putin"), None);
  }

  #[test]
  fn short_non_latin_input_is_confident() {
    let detector = Detector::new();

    assert_eq!(super::detect(&detector, "习", None), Lang::Chinese);
    assert_eq!(super::detect(&detector, "Ив", None), Lang::Russian);
  }

  #[test]
  fn latin_falls_back_to_country_hint() {
    let detector = Detector::new();

    // Too short for the statistical detector, so the hint decides.
    assert_eq!(super::detect(&detector, "Li", Some("CN")), Lang::Chinese);
    assert_eq!(super::detect(&detector, "Al", Some("SA")), Lang::Arabic);
  }

  #[test]
  fn unknown_hint_falls_back_to_english() {
    let detector = Detector::new();

    assert_eq!(super::detect(&detector, "Xq", Some("ZZ")), Lang::English);
    assert_eq!(super::detect(&detector, "Xq", None), Lang::English);
  }
}
