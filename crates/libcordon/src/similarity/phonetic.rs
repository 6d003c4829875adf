use rphonetic::{Encoder, Soundex};

/// Soundex pre-filter for the best-pair matcher.
///
/// Returns true only when every token on both sides produced a usable code and
/// the two code sets share nothing. Inputs the encoder cannot handle (non-Latin
/// scripts, bare digits) disable the filter rather than rejecting the pair.
pub(crate) fn unambiguously_dissimilar(lhs: &[String], rhs: &[String]) -> bool {
  let soundex = Soundex::default();

  let Some(lhs_codes) = encode_all(&soundex, lhs) else {
    return false;
  };
  let Some(rhs_codes) = encode_all(&soundex, rhs) else {
    return false;
  };

  lhs_codes.iter().all(|code| !rhs_codes.contains(code))
}

fn encode_all(soundex: &Soundex, tokens: &[String]) -> Option<Vec<String>> {
  let mut codes = Vec::with_capacity(tokens.len());

  for token in tokens {
    let code = soundex.encode(token);

    if code.is_empty() {
      return None;
    }

    codes.push(code);
  }

  if codes.is_empty() { None } else { Some(codes) }
}
