pub(crate) mod phonetic;

use bumpalo::{Bump, collections::Vec as BumpVec};

use crate::config::SimilarityConfig;

const WINKLER_PREFIX_WEIGHT: f64 = 0.1;

/// Jaro similarity with the standard match window `max(|a|,|b|)/2 - 1`.
pub(crate) fn jaro(a: &[char], b: &[char]) -> f64 {
  if a.is_empty() && b.is_empty() {
    return 1.0;
  }
  if a.is_empty() || b.is_empty() {
    return 0.0;
  }
  if a == b {
    return 1.0;
  }

  let window = (a.len().max(b.len()) / 2).saturating_sub(1);

  let mut a_matched = vec![false; a.len()];
  let mut b_matched = vec![false; b.len()];
  let mut matches = 0usize;

  for (i, ca) in a.iter().enumerate() {
    let start = i.saturating_sub(window);
    let end = (i + window + 1).min(b.len());

    for j in start..end {
      if !b_matched[j] && b[j] == *ca {
        a_matched[i] = true;
        b_matched[j] = true;
        matches += 1;
        break;
      }
    }
  }

  if matches == 0 {
    return 0.0;
  }

  let mut transpositions = 0usize;
  let mut j = 0usize;

  for (i, matched) in a_matched.iter().enumerate() {
    if *matched {
      while !b_matched[j] {
        j += 1;
      }

      if a[i] != b[j] {
        transpositions += 1;
      }

      j += 1;
    }
  }

  let m = matches as f64;

  (m / a.len() as f64 + m / b.len() as f64 + (m - transpositions as f64 / 2.0) / m) / 3.0
}

/// Jaro–Winkler: the prefix boost only applies above the configured threshold,
/// over a common prefix capped at the configured size.
pub(crate) fn jaro_winkler(a: &[char], b: &[char], similarity: &SimilarityConfig) -> f64 {
  let score = jaro(a, b);

  if score <= similarity.jaro_winkler_boost_threshold {
    return score;
  }

  let prefix = a.iter().zip(b.iter()).take(similarity.jaro_winkler_prefix_size).take_while(|(ca, cb)| ca == cb).count();

  score + (prefix as f64 * WINKLER_PREFIX_WEIGHT * (1.0 - score))
}

/// Score one token pair: Jaro–Winkler, then exact-match favoritism, then the
/// different-first-letter penalty.
fn token_pair_score(a: &[char], b: &[char], similarity: &SimilarityConfig) -> f64 {
  if a == b {
    return 1.0 + similarity.exact_match_favoritism;
  }

  let mut score = jaro_winkler(a, b, similarity);

  if let (Some(ca), Some(cb)) = (a.first(), b.first())
    && ca != cb
  {
    score *= similarity.different_letter_penalty_weight;
  }

  score
}

/// Best-pair similarity over two token sequences.
///
/// Tokens from the shorter side are greedily paired with distinct tokens from
/// the longer side, each pairing scored by Jaro–Winkler; the aggregate is the
/// mean of the pair scores. Equal sequences short-circuit to 1.0, and the
/// phonetic pre-filter may short-circuit to 0.0. The length-difference and
/// unmatched-token penalties are applied, in that order, before clamping.
pub(crate) fn best_pair_score(bump: &Bump, query_tokens: &[String], index_tokens: &[String], similarity: &SimilarityConfig) -> f64 {
  if query_tokens.is_empty() || index_tokens.is_empty() {
    return 0.0;
  }

  if query_tokens == index_tokens {
    return 1.0;
  }

  if !similarity.phonetic_filtering_disabled && phonetic::unambiguously_dissimilar(query_tokens, index_tokens) {
    return 0.0;
  }

  let (shorter, longer) = if query_tokens.len() <= index_tokens.len() { (query_tokens, index_tokens) } else { (index_tokens, query_tokens) };

  let mut shorter_chars = BumpVec::with_capacity_in(shorter.len(), bump);
  shorter_chars.extend(shorter.iter().map(|t| t.chars().collect::<Vec<_>>()));

  let mut longer_chars = BumpVec::with_capacity_in(longer.len(), bump);
  longer_chars.extend(longer.iter().map(|t| t.chars().collect::<Vec<_>>()));

  let mut used = BumpVec::with_capacity_in(longer.len(), bump);
  used.extend(std::iter::repeat_n(false, longer.len()));

  let mut total = 0.0f64;

  for a in &shorter_chars {
    let mut best: Option<(usize, f64)> = None;

    for (j, b) in longer_chars.iter().enumerate() {
      if used[j] {
        continue;
      }

      let score = token_pair_score(a, b, similarity);

      if best.map(|(_, s)| score > s).unwrap_or(true) {
        best = Some((j, score));
      }
    }

    if let Some((j, score)) = best {
      used[j] = true;
      total += score;
    }
  }

  let mut score = total / shorter.len() as f64;

  let query_len: usize = query_tokens.iter().map(|t| t.chars().count()).sum();
  let index_len: usize = index_tokens.iter().map(|t| t.chars().count()).sum();
  let (min_len, max_len) = (query_len.min(index_len), query_len.max(index_len));

  if max_len > 0 {
    let ratio = min_len as f64 / max_len as f64;

    if ratio < similarity.length_difference_cutoff_factor {
      score -= (1.0 - ratio) * similarity.length_difference_penalty_weight;
    }
  }

  let (count1, count2) = (query_tokens.len(), index_tokens.len());
  score -= (count1.abs_diff(count2) as f64 / count1.max(count2) as f64) * similarity.unmatched_index_token_weight;

  score.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
  use bumpalo::Bump;
  use float_cmp::approx_eq;

  use crate::config::tests::similarity_defaults;

  fn chars(value: &str) -> Vec<char> {
    value.chars().collect()
  }

  fn tokens(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
  }

  #[test]
  fn jaro_matches_reference_implementation() {
    for (a, b) in [("martha", "marhta"), ("dixon", "dicksonx"), ("jellyfish", "smellyfish"), ("maduro", "maduros"), ("abc", "xyz")] {
      assert!(approx_eq!(f64, super::jaro(&chars(a), &chars(b)), strsim::jaro(a, b), epsilon = 1e-9), "jaro mismatch for {a}/{b}");
    }
  }

  #[test]
  fn jaro_winkler_matches_reference_at_default_settings() {
    let similarity = similarity_defaults();

    for (a, b) in [("martha", "marhta"), ("dwayne", "duane"), ("nicolas", "nicholas"), ("maduro", "maduro")] {
      assert!(
        approx_eq!(f64, super::jaro_winkler(&chars(a), &chars(b), &similarity), strsim::jaro_winkler(a, b), epsilon = 1e-9),
        "jaro-winkler mismatch for {a}/{b}"
      );
    }
  }

  #[test]
  fn winkler_boost_respects_threshold() {
    let mut similarity = similarity_defaults();
    similarity.jaro_winkler_boost_threshold = 1.0;

    // With the boost unreachable, the score falls back to plain Jaro.
    assert!(approx_eq!(f64, super::jaro_winkler(&chars("martha"), &chars("marhta"), &similarity), strsim::jaro("martha", "marhta"), epsilon = 1e-9));
  }

  #[test]
  fn jaro_edge_cases() {
    assert_eq!(super::jaro(&[], &[]), 1.0);
    assert_eq!(super::jaro(&chars("a"), &[]), 0.0);
    assert_eq!(super::jaro(&chars("maduro"), &chars("maduro")), 1.0);
  }

  #[test]
  fn best_pair_exact_match_short_circuits() {
    let similarity = similarity_defaults();

    assert_eq!(super::best_pair_score(&Bump::new(), &tokens(&["nicolas", "maduro"]), &tokens(&["nicolas", "maduro"]), &similarity), 1.0);
  }

  #[test]
  fn best_pair_empty_side_scores_zero() {
    let similarity = similarity_defaults();

    assert_eq!(super::best_pair_score(&Bump::new(), &[], &tokens(&["maduro"]), &similarity), 0.0);
  }

  #[test]
  fn best_pair_word_order_is_ignored() {
    let similarity = similarity_defaults();
    let score = super::best_pair_score(&Bump::new(), &tokens(&["maduro", "nicolas"]), &tokens(&["nicolas", "maduro"]), &similarity);

    assert!(score > 0.9, "got {score}");
  }

  #[test]
  fn best_pair_penalizes_unmatched_tokens() {
    let similarity = similarity_defaults();

    let exact = super::best_pair_score(&Bump::new(), &tokens(&["nicolas", "maduro"]), &tokens(&["nicolas", "maduro", "moros", "garcia", "perez"]), &similarity);
    let tight = super::best_pair_score(&Bump::new(), &tokens(&["nicolas", "maduro"]), &tokens(&["nicolas", "maduro", "moros"]), &similarity);

    assert!(exact < tight, "longer unmatched tail should score lower: {exact} vs {tight}");
  }

  #[test]
  fn phonetic_filter_short_circuits() {
    let similarity = similarity_defaults();

    assert_eq!(super::best_pair_score(&Bump::new(), &tokens(&["xylophone"]), &tokens(&["maduro"]), &similarity), 0.0);

    let mut unfiltered = similarity_defaults();
    unfiltered.phonetic_filtering_disabled = true;

    assert!(super::best_pair_score(&Bump::new(), &tokens(&["xylophone"]), &tokens(&["maduro"]), &unfiltered) > 0.0);
  }

  #[test]
  fn scores_stay_in_unit_interval() {
    let mut similarity = similarity_defaults();
    similarity.exact_match_favoritism = 0.5;

    for (lhs, rhs) in [
      (tokens(&["nicolas", "maduro"]), tokens(&["nicolas", "maduro", "moros"])),
      (tokens(&["a"]), tokens(&["completely", "different", "name", "entirely"])),
      (tokens(&["maduro"]), tokens(&["maduro"])),
    ] {
      let score = super::best_pair_score(&Bump::new(), &lhs, &rhs, &similarity);

      assert!((0.0..=1.0).contains(&score), "score out of range: {score}");
    }
  }
}
