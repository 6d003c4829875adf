use std::{
  collections::HashMap,
  sync::{
    Arc, Mutex, RwLock,
    atomic::{AtomicBool, Ordering},
  },
};

use ahash::RandomState;

use crate::{
  config::SimilarityConfig,
  merge::Merger,
  model::{Entity, EntityKind, SourceList},
};

/// An immutable view of the index.
///
/// Snapshots are published atomically: a reader holds the view it acquired for
/// the duration of its operation, even while writers publish replacements.
#[derive(Default)]
pub struct Snapshot {
  entities: Vec<Arc<Entity>>,
  by_id: HashMap<String, usize, RandomState>,
}

impl Snapshot {
  fn build(entities: Vec<Entity>) -> Snapshot {
    let mut snapshot = Snapshot {
      entities: Vec::with_capacity(entities.len()),
      by_id: HashMap::with_capacity_and_hasher(entities.len(), RandomState::default()),
    };

    for entity in entities {
      if snapshot.by_id.contains_key(&entity.id) {
        tracing::warn!(entity_id = entity.id, "dropping entity with duplicate id");

        continue;
      }

      snapshot.by_id.insert(entity.id.clone(), snapshot.entities.len());
      snapshot.entities.push(Arc::new(entity));
    }

    snapshot
  }

  pub fn len(&self) -> usize {
    self.entities.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entities.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &Arc<Entity>> {
    self.entities.iter()
  }

  pub fn get(&self, id: &str) -> Option<&Arc<Entity>> {
    self.by_id.get(id).and_then(|index| self.entities.get(*index))
  }
}

/// Thread-safe entity store with atomic snapshot replacement.
///
/// A single writer boundary guards mutation; readers are never blocked. New
/// snapshots are computed out of band and published with a pointer swap.
pub struct EntityIndex {
  snapshot: RwLock<Arc<Snapshot>>,
  writer: Mutex<()>,
  loaded: AtomicBool,
}

impl Default for EntityIndex {
  fn default() -> Self {
    EntityIndex::new()
  }
}

impl EntityIndex {
  pub fn new() -> EntityIndex {
    EntityIndex {
      snapshot: RwLock::new(Arc::new(Snapshot::default())),
      writer: Mutex::new(()),
      loaded: AtomicBool::new(false),
    }
  }

  /// Whether an ingestion has completed at least once.
  pub fn is_loaded(&self) -> bool {
    self.loaded.load(Ordering::Acquire)
  }

  pub fn size(&self) -> usize {
    self.snapshot().len()
  }

  pub fn snapshot(&self) -> Arc<Snapshot> {
    self.snapshot.read().unwrap_or_else(|poisoned| poisoned.into_inner()).clone()
  }

  fn publish(&self, snapshot: Snapshot) {
    *self.snapshot.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = Arc::new(snapshot);

    self.loaded.store(true, Ordering::Release);
  }

  /// Atomically replace the whole index with a new set of entities.
  pub fn replace_all(&self, entities: Vec<Entity>) {
    let _writer = self.writer.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

    self.publish(Snapshot::build(entities));
  }

  /// Append entities without merging. Duplicate ids are dropped.
  pub fn add_all(&self, entities: Vec<Entity>) {
    let _writer = self.writer.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

    let current = self.snapshot();
    let mut combined: Vec<Entity> = Vec::with_capacity(current.len() + entities.len());

    combined.extend(current.iter().map(|entity| (**entity).clone()));
    combined.extend(entities);

    self.publish(Snapshot::build(combined));
  }

  /// Union the new entities with the current snapshot, merge duplicates, and
  /// publish, all under the writer boundary.
  pub fn add_all_merging(&self, entities: Vec<Entity>, merger: &Merger, similarity: &SimilarityConfig) {
    let _writer = self.writer.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

    let current = self.snapshot();
    let mut combined: Vec<Entity> = Vec::with_capacity(current.len() + entities.len());

    combined.extend(current.iter().map(|entity| (**entity).clone()));
    combined.extend(entities);

    self.publish(Snapshot::build(merger.merge(combined, similarity)));
  }

  pub fn find_by_id(&self, id: &str) -> Option<Arc<Entity>> {
    self.snapshot().get(id).cloned()
  }

  pub fn remove_by_id(&self, id: &str) -> bool {
    let _writer = self.writer.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

    let current = self.snapshot();

    if current.get(id).is_none() {
      return false;
    }

    let remaining = current.iter().filter(|entity| entity.id != id).map(|entity| (**entity).clone()).collect();

    self.publish(Snapshot::build(remaining));

    true
  }

  pub fn filter_by_source(&self, source: SourceList) -> Vec<Arc<Entity>> {
    self.snapshot().iter().filter(|entity| entity.source == source).cloned().collect()
  }

  pub fn filter_by_kind(&self, kind: EntityKind) -> Vec<Arc<Entity>> {
    self.snapshot().iter().filter(|entity| entity.kind() == kind).cloned().collect()
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use crate::{
    config::tests::similarity_defaults,
    merge::Merger,
    model::{Entity, EntityDetails, EntityKind, PersonDetails, SourceList},
    normalize::TextNormalizer,
  };

  use super::EntityIndex;

  fn person(id: &str, name: &str, source: SourceList) -> Entity {
    Entity::builder(name).id(id).source(source).details(EntityDetails::Person(PersonDetails::default())).build()
  }

  #[test]
  fn replace_all_swaps_the_snapshot() {
    let index = EntityIndex::new();

    assert!(!index.is_loaded());

    index.replace_all(vec![person("1", "Alice", SourceList::UsOfac)]);

    assert!(index.is_loaded());
    assert_eq!(index.size(), 1);

    index.replace_all(vec![person("2", "Bob", SourceList::UsCsl), person("3", "Carol", SourceList::UsCsl)]);

    assert_eq!(index.size(), 2);
    assert!(index.find_by_id("1").is_none());
  }

  #[test]
  fn readers_keep_their_snapshot() {
    let index = EntityIndex::new();
    index.replace_all(vec![person("1", "Alice", SourceList::UsOfac)]);

    let snapshot = index.snapshot();

    index.replace_all(vec![person("2", "Bob", SourceList::UsOfac)]);

    // The old view is still fully intact.
    assert_eq!(snapshot.len(), 1);
    assert!(snapshot.get("1").is_some());
    assert_eq!(index.snapshot().len(), 1);
    assert!(index.find_by_id("2").is_some());
  }

  #[test]
  fn duplicate_ids_are_dropped() {
    let index = EntityIndex::new();

    index.replace_all(vec![person("1", "Alice", SourceList::UsOfac), person("1", "Alice Again", SourceList::UsOfac)]);

    assert_eq!(index.size(), 1);
    assert_eq!(index.find_by_id("1").unwrap().name, "Alice");
  }

  #[test]
  fn add_all_merging_folds_duplicates() {
    let normalizer = Arc::new(TextNormalizer::new());
    let merger = Merger::new(normalizer);
    let similarity = similarity_defaults();
    let index = EntityIndex::new();

    index.add_all_merging(vec![person("1", "Nicolas Maduro", SourceList::UsOfac)], &merger, &similarity);
    index.add_all_merging(
      vec![{
        let mut entity = person("1-dup", "MADURO MOROS, Nicolas", SourceList::UsOfac);
        entity.source_id = "1".to_string();
        entity
      }],
      &merger,
      &similarity,
    );

    assert_eq!(index.size(), 1);

    let merged = index.find_by_id("1").unwrap();

    assert_eq!(merged.alt_names, vec!["MADURO MOROS, Nicolas"]);
    assert!(merged.is_prepared());
  }

  #[test]
  fn remove_and_filter() {
    let index = EntityIndex::new();

    index.replace_all(vec![person("1", "Alice", SourceList::UsOfac), person("2", "Bob", SourceList::UsCsl)]);

    assert_eq!(index.filter_by_source(SourceList::UsCsl).len(), 1);
    assert_eq!(index.filter_by_kind(EntityKind::Person).len(), 2);
    assert!(index.remove_by_id("1"));
    assert!(!index.remove_by_id("1"));
    assert_eq!(index.size(), 1);
  }
}
