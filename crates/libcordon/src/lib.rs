mod config;
mod cordon;
mod error;
mod index;
mod merge;
mod model;
mod normalize;
mod scoring;
mod search;
mod similarity;
mod trace;

pub mod prelude {
  pub use crate::cordon::Cordon;

  pub use crate::config::{ConfigOverride, EngineConfig, SearchConfig, SearchOverride, SimilarityConfig, SimilarityOverride, WeightsConfig, WeightsOverride};
  pub use crate::error::CordonError;
  pub use crate::index::{EntityIndex, Snapshot};
  pub use crate::merge::{Merger, merge_strings};
  pub use crate::model::{
    Address, Affiliation, AircraftDetails, ContactInfo, CryptoAddress, Entity, EntityDetails, EntityKind, GovernmentId, HistoricalEntry, OrganizationDetails, PersonDetails, PreparedAddress,
    PreparedCryptoAddress, PreparedFields, PreparedGovernmentId, SanctionsInfo, SearchQuery, SourceList, VesselDetails,
  };
  pub use crate::normalize::{
    Lang, TextNormalizer,
    values::{Gender, canonicalize_identifier, normalize_country, normalize_gender, normalize_phone},
  };
  pub use crate::scoring::{Comparison, PhaseScore, ScoreBreakdown, ScorePhase};
  pub use crate::search::{BatchItem, BatchItemResult, BatchMatch, BatchOptions, BatchOutcome, BatchStatistics, ScoredEntity, SearchParams};
  pub use crate::trace::{NoopTrace, ScoringEvent, SessionTrace, TraceReport, TraceSink};
}

pub use crate::prelude::*;
