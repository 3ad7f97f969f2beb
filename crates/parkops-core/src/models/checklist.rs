use serde::{Deserialize, Serialize};

use parkops_proto::{
    CollectUpdate, MaintenanceTask, MaintenanceUpdate, MissionPayload, MissionStatus,
    MissionUpdate, RefillUpdate,
};

/// One checkable line of a mission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecklistTask {
    CollectNotes,
    CollectCoins,
    RefillNotes,
    RefillCoins,
    /// Position in the payload's maintenance list.
    Maintenance(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceCheck {
    pub task: String,
    pub completed: bool,
}

/// Completion flags the operator ticks off while working a mission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskChecklist {
    pub collect_notes: bool,
    pub collect_coins: bool,
    pub refill_notes: bool,
    pub refill_coins: bool,
    pub maintenance: Vec<MaintenanceCheck>,
}

impl TaskChecklist {
    /// Seed the checklist from the flags already recorded in the payload.
    pub fn from_payload(payload: &MissionPayload) -> Self {
        let collect = payload.collect.as_ref();
        let refill = payload.refill.as_ref();
        Self {
            collect_notes: collect
                .and_then(|c| c.notes.as_ref())
                .is_some_and(|t| t.completed),
            collect_coins: collect
                .and_then(|c| c.coins.as_ref())
                .is_some_and(|t| t.completed),
            refill_notes: refill
                .and_then(|r| r.notes.as_ref())
                .is_some_and(|t| t.completed),
            refill_coins: refill
                .and_then(|r| r.coins.as_ref())
                .is_some_and(|t| t.completed),
            maintenance: payload
                .maintenance
                .iter()
                .map(|task| MaintenanceCheck {
                    task: task.description().to_string(),
                    completed: task.is_completed(),
                })
                .collect(),
        }
    }

    /// Set one flag. Returns `false` if the maintenance index does not exist.
    pub fn set(&mut self, task: ChecklistTask, completed: bool) -> bool {
        match task {
            ChecklistTask::CollectNotes => self.collect_notes = completed,
            ChecklistTask::CollectCoins => self.collect_coins = completed,
            ChecklistTask::RefillNotes => self.refill_notes = completed,
            ChecklistTask::RefillCoins => self.refill_coins = completed,
            ChecklistTask::Maintenance(index) => match self.maintenance.get_mut(index) {
                Some(check) => check.completed = completed,
                None => return false,
            },
        }
        true
    }

    /// The completion record sent to the backend.
    pub fn to_update(&self) -> MissionUpdate {
        MissionUpdate {
            status: MissionStatus::Completed,
            collect: CollectUpdate {
                notes: self.collect_notes.into(),
                coins: self.collect_coins.into(),
            },
            refill: RefillUpdate {
                coins: self.refill_coins.into(),
                notes: self.refill_notes.into(),
            },
            maintenance: self
                .maintenance
                .iter()
                .enumerate()
                .map(|(index, check)| MaintenanceUpdate {
                    index,
                    completed: check.completed,
                })
                .collect(),
        }
    }

    /// Write the flags back into a payload. Sub-tasks the payload does not
    /// have are not created.
    pub fn apply_to(&self, payload: &mut MissionPayload) {
        if let Some(collect) = payload.collect.as_mut() {
            if let Some(notes) = collect.notes.as_mut() {
                notes.completed = self.collect_notes;
            }
            if let Some(coins) = collect.coins.as_mut() {
                coins.completed = self.collect_coins;
            }
        }
        if let Some(refill) = payload.refill.as_mut() {
            if let Some(notes) = refill.notes.as_mut() {
                notes.completed = self.refill_notes;
            }
            if let Some(coins) = refill.coins.as_mut() {
                coins.completed = self.refill_coins;
            }
        }
        for (task, check) in payload.maintenance.iter_mut().zip(&self.maintenance) {
            *task = MaintenanceTask::Tracked {
                task: task.description().to_string(),
                completed: check.completed,
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parkops_proto::{CashTask, CollectTasks, RefillTask, RefillTasks};

    fn payload() -> MissionPayload {
        MissionPayload {
            collect: Some(CollectTasks {
                notes: Some(CashTask {
                    amount: 200.0,
                    completed: true,
                }),
                coins: None,
            }),
            refill: Some(RefillTasks {
                notes: None,
                coins: Some(RefillTask {
                    amount: 50.0,
                    ..Default::default()
                }),
            }),
            maintenance: vec![
                MaintenanceTask::Bare("Clean slot".into()),
                MaintenanceTask::Tracked {
                    task: "Check display".into(),
                    completed: true,
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn seeds_from_payload() {
        let checklist = TaskChecklist::from_payload(&payload());
        assert!(checklist.collect_notes);
        assert!(!checklist.collect_coins);
        assert!(!checklist.refill_coins);
        assert_eq!(checklist.maintenance.len(), 2);
        assert_eq!(checklist.maintenance[0].task, "Clean slot");
        assert!(!checklist.maintenance[0].completed);
        assert!(checklist.maintenance[1].completed);
    }

    #[test]
    fn update_lists_maintenance_by_index() {
        let mut checklist = TaskChecklist::from_payload(&payload());
        assert!(checklist.set(ChecklistTask::Maintenance(0), true));
        assert!(checklist.maintenance[0].completed);
        assert!(checklist.set(ChecklistTask::RefillCoins, true));
        assert!(!checklist.set(ChecklistTask::Maintenance(5), true));

        let update = checklist.to_update();
        assert_eq!(update.status, MissionStatus::Completed);
        assert!(update.collect.notes.completed);
        assert!(update.refill.coins.completed);
        assert_eq!(
            update.maintenance,
            vec![
                MaintenanceUpdate {
                    index: 0,
                    completed: true
                },
                MaintenanceUpdate {
                    index: 1,
                    completed: true
                },
            ]
        );
    }

    #[test]
    fn apply_to_only_touches_existing_tasks() {
        let mut target = payload();
        let mut checklist = TaskChecklist::from_payload(&target);
        checklist.set(ChecklistTask::CollectCoins, true);
        checklist.set(ChecklistTask::RefillCoins, true);
        checklist.set(ChecklistTask::Maintenance(0), true);
        checklist.apply_to(&mut target);

        let collect = target.collect.as_ref().unwrap();
        assert!(collect.coins.is_none());
        assert!(target.refill.as_ref().unwrap().coins.as_ref().unwrap().completed);
        assert_eq!(
            target.maintenance[0],
            MaintenanceTask::Tracked {
                task: "Clean slot".into(),
                completed: true
            }
        );
    }
}
