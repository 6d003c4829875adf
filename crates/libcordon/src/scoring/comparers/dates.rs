use std::sync::LazyLock;

use bumpalo::Bump;
use jiff::civil::Date;
use libcordon_macros::comparer;
use regex::Regex;

use crate::{
  config::EngineConfig,
  model::{Entity, EntityDetails, SearchQuery},
  scoring::{Comparer, Comparison},
};

static YEAR_ONLY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{4}$").unwrap());

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct ParsedDate {
  pub year: i16,
  pub month: Option<i8>,
  pub day: Option<i8>,
}

impl ParsedDate {
  fn is_full(&self) -> bool {
    self.month.is_some() && self.day.is_some()
  }
}

/// Parse a year-only string or an ISO date. Anything else is ignored.
pub(crate) fn parse_date(value: &str) -> Option<ParsedDate> {
  let trimmed = value.trim();

  if YEAR_ONLY.is_match(trimmed) {
    return trimmed.parse::<i16>().ok().map(|year| ParsedDate { year, month: None, day: None });
  }

  Date::strptime("%Y-%m-%d", trimmed).ok().map(|date| ParsedDate {
    year: date.year(),
    month: Some(date.month()),
    day: Some(date.day()),
  })
}

/// Score two dates: full equality is 1.0, equal years are strong, and a gap of
/// up to two years degrades linearly to nothing.
pub(crate) fn date_pair_score(lhs: ParsedDate, rhs: ParsedDate) -> f64 {
  if lhs.is_full() && rhs.is_full() && lhs == rhs {
    return 1.0;
  }

  match (lhs.year - rhs.year).unsigned_abs() {
    0 => 0.9,
    1 => 0.7,
    2 => 0.5,
    _ => 0.0,
  }
}

/// Date of the candidate that is comparable across its type payload.
fn candidate_date(candidate: &Entity) -> Option<&str> {
  match &candidate.details {
    EntityDetails::Person(person) => person.birth_date.as_deref(),
    EntityDetails::Business(org) | EntityDetails::Organization(org) => org.created.as_deref(),
    EntityDetails::Vessel(vessel) => vessel.built.as_deref(),
    EntityDetails::Aircraft(aircraft) => aircraft.built.as_deref(),
    EntityDetails::Unknown => None,
  }
}

#[comparer(name = "date_comparison", phase = DateComparison, weight = supporting_info_weight, toggle = date_enabled)]
fn compare(&self, _bump: &Bump, query: &SearchQuery, candidate: &Entity, _config: &EngineConfig) -> Comparison {
  let Some(lhs) = query.date_for(candidate.kind()).and_then(parse_date) else {
    return Comparison::empty();
  };

  let Some(rhs) = candidate_date(candidate).and_then(parse_date) else {
    return Comparison::empty();
  };

  Comparison::of(date_pair_score(lhs, rhs), 1)
}
