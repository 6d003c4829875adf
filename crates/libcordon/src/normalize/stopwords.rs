use std::{
  collections::{HashMap, HashSet},
  sync::LazyLock,
};

use ahash::RandomState;

use crate::normalize::{Dictionaries, language::Lang};

pub(crate) static STOPWORDS: LazyLock<HashMap<Lang, HashSet<String, RandomState>>> = LazyLock::new(|| {
  let file = Dictionaries::get("dictionaries/stopwords.yml").expect("could not read stopwords dictionary");
  let dictionary = serde_yaml::from_slice::<HashMap<String, Vec<String>>>(&file.data).expect("could not unmarshal stopwords dictionary");

  let mut sets = HashMap::new();

  for (code, words) in dictionary {
    let lang = match code.as_str() {
      "en" => Lang::English,
      "es" => Lang::Spanish,
      "fr" => Lang::French,
      "de" => Lang::German,
      "ru" => Lang::Russian,
      "ar" => Lang::Arabic,
      "zh" => Lang::Chinese,
      other => panic!("unknown language in stopwords dictionary: {other}"),
    };

    sets.insert(lang, words.into_iter().map(|w| w.to_lowercase()).collect());
  }

  sets
});

pub(crate) fn is_stopword(lang: Lang, token: &str) -> bool {
  STOPWORDS.get(&lang).map(|set| set.contains(token)).unwrap_or(false)
}

#[cfg(test)]
mod tests {
  use super::{Lang, STOPWORDS};

  #[test]
  fn dictionary_covers_all_languages() {
    for lang in [Lang::English, Lang::Spanish, Lang::French, Lang::German, Lang::Russian, Lang::Arabic, Lang::Chinese] {
      assert!(STOPWORDS.get(&lang).is_some_and(|set| !set.is_empty()), "missing stopwords for {lang:?}");
    }
  }

  #[test]
  fn is_stopword() {
    assert!(super::is_stopword(Lang::English, "the"));
    assert!(super::is_stopword(Lang::Russian, "на"));
    assert!(!super::is_stopword(Lang::English, "putin"));
    assert!(!super::is_stopword(Lang::Spanish, "the"));
  }
}
