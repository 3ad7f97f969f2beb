pub mod feed;
pub mod notification;

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;

use crate::error::{GatewayError, StoreError, SyncError};
use crate::gateway::MissionGateway;
use crate::models::{reconcile, sort_missions, MissionLifecycle, TaskChecklist};
use crate::session::{PartitionKey, Session};
use crate::storage::{KeyValueStore, LocalMissionStore};
use parkops_proto::{Mission, MissionId, MissionStatus};

pub use feed::{FeedOrigin, MissionFeed};
pub use notification::{IntakeOutcome, MissionView, NotificationEvent, ViewOrigin};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    /// Missions requested per page.
    pub page_size: u32,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self { page_size: 10 }
    }
}

/// Result of an append load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// The next page arrived and `count` entries were appended.
    Appended { count: usize },
    /// The backend reported no further page.
    Exhausted,
    /// Another append load was already running; nothing was done.
    InFlight,
}

/// A mission that was opened locally, plus the backend's answer to the open
/// call. The local transition stands whatever `remote` says.
#[derive(Debug)]
pub struct OpenOutcome {
    pub mission: Mission,
    /// Whether the opened status reached the local store. The backend is
    /// told either way.
    pub saved: Result<(), StoreError>,
    pub remote: Result<(), GatewayError>,
}

/// A mission the backend accepted as completed.
#[derive(Debug)]
pub struct Submitted {
    pub mission_id: MissionId,
    pub completed_at: DateTime<Utc>,
    pub mission: Mission,
    /// Whether the completed record reached the local store. When it did
    /// not, the store and the published feed still show `in_progress`.
    pub saved: Result<(), StoreError>,
}

/// Clears the append flag when the load finishes, however it finishes.
struct AppendGuard<'a>(&'a AtomicBool);

impl<'a> AppendGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| AppendGuard(flag))
    }
}

impl Drop for AppendGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Keeps one operator's local mission store in step with the backend and
/// publishes the collection to be displayed.
pub struct Synchronizer<G, S> {
    gateway: G,
    store: LocalMissionStore<S>,
    partition: PartitionKey,
    settings: SyncSettings,
    feed: watch::Sender<MissionFeed>,
    appending: AtomicBool,
}

impl<G: MissionGateway, S: KeyValueStore> Synchronizer<G, S> {
    /// The session fixes the storage partition for the synchronizer's whole
    /// lifetime; build a new one after switching operators.
    pub fn new(session: &Session, gateway: G, backend: S, settings: SyncSettings) -> Self {
        let (feed, _) = watch::channel(MissionFeed::default());
        Self {
            gateway,
            store: LocalMissionStore::new(backend),
            partition: session.partition_key(),
            settings,
            feed,
            appending: AtomicBool::new(false),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<MissionFeed> {
        self.feed.subscribe()
    }

    /// Snapshot of the published collection.
    pub fn feed(&self) -> MissionFeed {
        self.feed.borrow().clone()
    }

    pub fn partition(&self) -> &PartitionKey {
        &self.partition
    }

    pub fn store(&self) -> &LocalMissionStore<S> {
        &self.store
    }

    pub fn is_loading_more(&self) -> bool {
        self.appending.load(Ordering::Acquire)
    }

    /// Load page 1. The cached collection is published first (sorted for
    /// display); a successful fetch then replaces both the store and the
    /// published collection.
    ///
    /// An unreadable or unwritable cache does not stop the fetched page from
    /// being published, but the storage error is still returned.
    pub async fn refresh(&self) -> Result<MissionFeed, SyncError> {
        let mut cache_error = None;
        let cached = self.store.read_all(&self.partition).unwrap_or_else(|err| {
            tracing::warn!(partition = %self.partition, error = %err, "could not read mission cache");
            cache_error = Some(err);
            Vec::new()
        });
        let has_cache = !cached.is_empty();
        if has_cache {
            let mut sorted = cached.clone();
            sort_missions(&mut sorted);
            self.feed.send_replace(MissionFeed::from_cache(sorted));
        }

        match self.gateway.fetch_page(1, self.settings.page_size).await {
            Ok(page) => {
                let missions: Vec<Mission> = page
                    .missions
                    .into_iter()
                    .map(|remote| {
                        let local = cached.iter().find(|m| m.mission_id == remote.mission_id);
                        reconcile(local, remote)
                    })
                    .collect();
                if let Err(err) = self.store.write_all(&self.partition, &missions) {
                    tracing::warn!(partition = %self.partition, error = %err, "could not cache missions");
                    cache_error = Some(err);
                }
                tracing::debug!(
                    count = missions.len(),
                    total_pages = page.pagination.total_pages,
                    "refreshed missions"
                );
                let feed = MissionFeed::from_remote(missions, page.pagination);
                self.feed.send_replace(feed.clone());
                match cache_error {
                    Some(err) => Err(err.into()),
                    None => Ok(feed),
                }
            }
            Err(err) if has_cache => {
                tracing::warn!(error = %err, "mission refresh failed, showing cached missions");
                Ok(self.feed())
            }
            Err(err) => {
                self.feed.send_replace(MissionFeed::default());
                Err(err.into())
            }
        }
    }

    /// Fetch the page after the current one and append it to the published
    /// collection. Only one append load runs at a time.
    pub async fn load_more(&self) -> Result<AppendOutcome, SyncError> {
        let Some(_guard) = AppendGuard::acquire(&self.appending) else {
            tracing::debug!("append load already in flight");
            return Ok(AppendOutcome::InFlight);
        };

        let current = self.feed.borrow().pagination;
        if !current.has_next_page {
            return Ok(AppendOutcome::Exhausted);
        }

        let page = self
            .gateway
            .fetch_page(current.page + 1, self.settings.page_size)
            .await?;
        let count = page.missions.len();

        if let Err(err) = self.store.append_missing(&self.partition, &page.missions) {
            tracing::warn!(partition = %self.partition, error = %err, "could not cache appended missions");
        }
        self.feed.send_modify(|feed| {
            feed.missions.extend(page.missions);
            feed.pagination = page.pagination;
            feed.origin = FeedOrigin::Remote;
        });
        tracing::debug!(page = page.pagination.page, count, "appended missions");
        Ok(AppendOutcome::Appended { count })
    }

    /// Move a stored `unopened` mission to `in_progress` and tell the
    /// backend. The backend is told even when the local save fails.
    pub async fn open_mission(&self, id: &MissionId) -> Result<OpenOutcome, SyncError> {
        let mut mission = self
            .store
            .read_one(&self.partition, id)?
            .ok_or_else(|| SyncError::NotFound(id.clone()))?;
        mission.mark_opened(Utc::now())?;
        let saved = self.save_opened(&mut mission);
        let remote = self.notify_opened(id).await;
        Ok(OpenOutcome {
            mission,
            saved,
            remote,
        })
    }

    /// Look a mission up for display, opening it first if it is still
    /// `unopened` locally. The backend copy wins when reachable; otherwise
    /// the local copy is shown.
    pub async fn view_mission(&self, id: &MissionId) -> Result<MissionView, SyncError> {
        let mut local = self.store.read_one(&self.partition, id).unwrap_or_else(|err| {
            tracing::warn!(mission = %id, error = %err, "could not read cached mission");
            None
        });

        let mut open_ack = None;
        if let Some(mission) = local
            .as_mut()
            .filter(|m| m.status == MissionStatus::Unopened)
        {
            mission.mark_opened(Utc::now())?;
            if let Err(err) = self.save_opened(mission) {
                tracing::warn!(mission = %id, error = %err, "could not persist opened mission");
            }
            open_ack = Some(self.notify_opened(id).await);
        }

        match self.gateway.fetch_one(id).await {
            Ok(remote) => {
                let mission = reconcile(local.as_ref(), remote);
                if let Err(err) = self.store.merge_one(&self.partition, &mission) {
                    tracing::warn!(mission = %id, error = %err, "could not cache fetched mission");
                }
                self.publish_entry(&mission);
                Ok(MissionView::Found {
                    mission,
                    origin: ViewOrigin::Remote,
                    open_ack,
                })
            }
            Err(err) => match local {
                Some(mission) => {
                    tracing::warn!(mission = %id, error = %err, "showing cached mission");
                    Ok(MissionView::Found {
                        mission,
                        origin: ViewOrigin::Cache,
                        open_ack,
                    })
                }
                None if err.is_not_found() => Ok(MissionView::Missing),
                None => Err(err.into()),
            },
        }
    }

    /// Send the completion record. Only a backend success marks the mission
    /// `completed`; on failure it stays `in_progress`. A completion the
    /// backend accepted is still reported as submitted when the local save
    /// fails; `Submitted::saved` carries that failure.
    pub async fn submit(
        &self,
        id: &MissionId,
        checklist: &TaskChecklist,
    ) -> Result<Submitted, SyncError> {
        let mut mission = self
            .store
            .read_one(&self.partition, id)?
            .ok_or_else(|| SyncError::NotFound(id.clone()))?;
        if mission.status.is_terminal() {
            return Err(SyncError::InvalidTransition {
                mission_id: id.clone(),
                from: mission.status,
                to: MissionStatus::Completed,
            });
        }
        if mission.status == MissionStatus::Unopened {
            mission.mark_opened(Utc::now())?;
            if let Err(err) = self.save_opened(&mut mission) {
                tracing::warn!(mission = %id, error = %err, "could not persist opened mission");
            }
            let _ = self.notify_opened(id).await;
        }

        if let Err(err) = self.gateway.submit_update(id, &checklist.to_update()).await {
            tracing::warn!(mission = %id, error = %err, "mission submission failed");
            return Err(err.into());
        }

        let completed_at = Utc::now();
        mission.mark_completed(completed_at)?;
        checklist.apply_to(&mut mission.payload);
        tracing::info!(mission = %id, "mission completed");

        let saved = self.save_completed(&mut mission, checklist);
        if let Err(err) = &saved {
            tracing::warn!(mission = %id, error = %err, "completed mission not saved locally");
        }
        Ok(Submitted {
            mission_id: id.clone(),
            completed_at,
            mission,
            saved,
        })
    }

    /// Apply a push notification. New missions are stored once; taps are
    /// handed back to the caller as a view request.
    pub async fn handle_notification(
        &self,
        event: NotificationEvent,
    ) -> Result<IntakeOutcome, SyncError> {
        let (id, payload) = match event {
            NotificationEvent::Tapped { id } => return Ok(IntakeOutcome::ViewRequested(id)),
            NotificationEvent::NewMission { id, payload } => (id, payload),
        };

        let payload = match notification::parse_payload(payload) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!(mission = %id, error = %err, "dropping notification with unreadable payload");
                return Ok(IntakeOutcome::Dropped {
                    reason: err.to_string(),
                });
            }
        };

        let mission = Mission::announced(id, payload, Utc::now());
        if self.store.insert_if_absent(&self.partition, &mission)? {
            tracing::info!(mission = %mission.mission_id, "stored mission from notification");
            Ok(IntakeOutcome::Stored(mission))
        } else {
            tracing::debug!(mission = %mission.mission_id, "duplicate mission notification");
            Ok(IntakeOutcome::Duplicate)
        }
    }

    /// Drop the operator's cached missions and reset the published feed.
    pub fn clear(&self) -> Result<(), SyncError> {
        self.store.clear(&self.partition)?;
        self.feed.send_replace(MissionFeed::default());
        Ok(())
    }

    /// Write an opened mission's status onto the stored entry and publish
    /// it once saved. A stored entry that is already further along is kept,
    /// and `mission` takes its place.
    fn save_opened(&self, mission: &mut Mission) -> Result<(), StoreError> {
        let (status, opened_at) = (mission.status, mission.opened_at);
        let stored = self
            .store
            .update_one(&self.partition, &mission.mission_id, |entry| {
                if !entry.status.can_advance_to(status) {
                    return false;
                }
                entry.status = status;
                entry.opened_at = opened_at;
                true
            })?;
        match stored {
            Some(entry) => {
                *mission = entry;
                self.publish_entry(mission);
            }
            None => tracing::debug!(mission = %mission.mission_id, "opened mission no longer stored"),
        }
        Ok(())
    }

    /// Apply a completion to the stored entry and publish it once saved.
    fn save_completed(
        &self,
        mission: &mut Mission,
        checklist: &TaskChecklist,
    ) -> Result<(), StoreError> {
        let (opened_at, completed_at) = (mission.opened_at, mission.completed_at);
        let stored = self
            .store
            .update_one(&self.partition, &mission.mission_id, |entry| {
                if entry.status.is_terminal() {
                    return false;
                }
                entry.status = MissionStatus::Completed;
                entry.opened_at = entry.opened_at.or(opened_at);
                entry.completed_at = completed_at;
                checklist.apply_to(&mut entry.payload);
                true
            })?;
        match stored {
            Some(entry) => {
                *mission = entry;
                self.publish_entry(mission);
            }
            None => tracing::debug!(mission = %mission.mission_id, "completed mission no longer stored"),
        }
        Ok(())
    }

    async fn notify_opened(&self, id: &MissionId) -> Result<(), GatewayError> {
        let result = self.gateway.mark_opened(id).await;
        if let Err(err) = &result {
            tracing::warn!(mission = %id, error = %err, "backend did not acknowledge open; keeping local status");
        }
        result
    }

    fn publish_entry(&self, mission: &Mission) {
        self.feed.send_if_modified(|feed| feed.replace_entry(mission));
    }
}
