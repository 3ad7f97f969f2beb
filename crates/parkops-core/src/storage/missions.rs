use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use super::KeyValueStore;
use crate::error::StoreError;
use crate::session::PartitionKey;
use parkops_proto::{Mission, MissionId};

/// An operator's mission collection, stored as one JSON array per
/// partition. Every write replaces the whole array in a single `set`.
///
/// Writes through one store are serialized: a read-modify-write never
/// interleaves with another write, so concurrent updates are not lost.
pub struct LocalMissionStore<S> {
    backend: S,
    writes: Mutex<()>,
}

impl<S: KeyValueStore> LocalMissionStore<S> {
    pub fn new(backend: S) -> Self {
        Self {
            backend,
            writes: Mutex::new(()),
        }
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>, StoreError> {
        self.writes
            .lock()
            .map_err(|_| StoreError::Backend("mission store lock poisoned".to_string()))
    }

    pub fn read_all(&self, key: &PartitionKey) -> Result<Vec<Mission>, StoreError> {
        match self.backend.get(key.as_str())? {
            Some(raw) => serde_json::from_str(&raw).map_err(|source| StoreError::Corrupt {
                key: key.to_string(),
                source,
            }),
            None => Ok(Vec::new()),
        }
    }

    pub fn write_all(&self, key: &PartitionKey, missions: &[Mission]) -> Result<(), StoreError> {
        let _writing = self.lock()?;
        self.save(key, missions)
    }

    fn save(&self, key: &PartitionKey, missions: &[Mission]) -> Result<(), StoreError> {
        let raw = serde_json::to_string(missions).map_err(|source| StoreError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.backend.set(key.as_str(), &raw)
    }

    /// Run `apply` on the current collection while holding the write lock.
    /// The collection is saved only when `apply` reports a change.
    fn modify<T, F>(&self, key: &PartitionKey, apply: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Vec<Mission>) -> (T, bool),
    {
        let _writing = self.lock()?;
        let mut missions = self.read_all(key)?;
        let (result, changed) = apply(&mut missions);
        if changed {
            self.save(key, &missions)?;
        }
        Ok(result)
    }

    pub fn read_one(
        &self,
        key: &PartitionKey,
        id: &MissionId,
    ) -> Result<Option<Mission>, StoreError> {
        Ok(self
            .read_all(key)?
            .into_iter()
            .find(|m| &m.mission_id == id))
    }

    /// Replace the stored entry with the same id. Returns `false` (and writes
    /// nothing) when no such entry exists.
    pub fn merge_one(&self, key: &PartitionKey, mission: &Mission) -> Result<bool, StoreError> {
        self.modify(key, |missions| {
            match missions
                .iter_mut()
                .find(|m| m.mission_id == mission.mission_id)
            {
                Some(slot) => {
                    *slot = mission.clone();
                    (true, true)
                }
                None => (false, false),
            }
        })
    }

    /// Update a single entry in place. `apply` returns whether it changed
    /// anything; unchanged entries are not written back. Returns the entry
    /// as stored afterwards, or `None` when the id is not stored.
    pub fn update_one<F>(
        &self,
        key: &PartitionKey,
        id: &MissionId,
        apply: F,
    ) -> Result<Option<Mission>, StoreError>
    where
        F: FnOnce(&mut Mission) -> bool,
    {
        self.modify(key, |missions| {
            match missions.iter_mut().find(|m| &m.mission_id == id) {
                Some(slot) => {
                    let changed = apply(slot);
                    (Some(slot.clone()), changed)
                }
                None => (None, false),
            }
        })
    }

    /// Append `mission` unless its id is already stored. Returns whether it
    /// was inserted; an existing entry is never overwritten.
    pub fn insert_if_absent(&self, key: &PartitionKey, mission: &Mission) -> Result<bool, StoreError> {
        self.modify(key, |missions| {
            if missions.iter().any(|m| m.mission_id == mission.mission_id) {
                return (false, false);
            }
            missions.push(mission.clone());
            (true, true)
        })
    }

    /// Append every mission whose id is not stored yet, keeping their order.
    /// Returns how many were appended.
    pub fn append_missing(&self, key: &PartitionKey, incoming: &[Mission]) -> Result<usize, StoreError> {
        self.modify(key, |missions| {
            let mut known: HashSet<MissionId> =
                missions.iter().map(|m| m.mission_id.clone()).collect();
            let before = missions.len();
            for mission in incoming {
                if known.insert(mission.mission_id.clone()) {
                    missions.push(mission.clone());
                }
            }
            let appended = missions.len() - before;
            (appended, appended > 0)
        })
    }

    /// Drop the whole partition.
    pub fn clear(&self, key: &PartitionKey) -> Result<(), StoreError> {
        let _writing = self.lock()?;
        self.backend.delete(key.as_str())
    }
}
