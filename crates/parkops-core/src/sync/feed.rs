use parkops_proto::{Mission, MissionId, Pagination};

/// Where the currently published collection came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedOrigin {
    /// Nothing has been loaded yet, or the last load failed with no cache.
    #[default]
    Empty,
    /// Local store contents, sorted for display while the backend is queried.
    Cache,
    /// Backend pages, in backend order.
    Remote,
}

/// The mission collection shown to the operator, with paging state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MissionFeed {
    pub missions: Vec<Mission>,
    pub pagination: Pagination,
    pub origin: FeedOrigin,
}

impl MissionFeed {
    pub fn from_cache(missions: Vec<Mission>) -> Self {
        Self {
            missions,
            pagination: Pagination::default(),
            origin: FeedOrigin::Cache,
        }
    }

    pub fn from_remote(missions: Vec<Mission>, pagination: Pagination) -> Self {
        Self {
            missions,
            pagination,
            origin: FeedOrigin::Remote,
        }
    }

    pub fn has_more_pages(&self) -> bool {
        self.pagination.has_next_page
    }

    pub fn current_page(&self) -> u32 {
        self.pagination.page
    }

    pub fn total_pages(&self) -> u32 {
        self.pagination.total_pages
    }

    pub fn len(&self) -> usize {
        self.missions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.missions.is_empty()
    }

    pub fn get(&self, id: &MissionId) -> Option<&Mission> {
        self.missions.iter().find(|m| &m.mission_id == id)
    }

    /// Swap in a newer copy of every entry with the same id. Returns whether
    /// anything changed.
    pub fn replace_entry(&mut self, mission: &Mission) -> bool {
        let mut changed = false;
        for slot in self
            .missions
            .iter_mut()
            .filter(|m| m.mission_id == mission.mission_id)
        {
            if slot != mission {
                *slot = mission.clone();
                changed = true;
            }
        }
        changed
    }
}
