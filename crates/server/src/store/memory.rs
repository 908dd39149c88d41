//! In-process store. Every mutation runs under a single write lock, which is
//! what makes `record_turn_complete` an atomic compare-and-set here.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use household_core::{
    ContainerTurn, House, HouseId, LedgerEntry, LedgerKind, LedgerTotal, Membership,
    TaskDefinition, TaskId, User, UserId, DEFAULT_HOUSE_IMAGE, OWNER_ROLE,
};
use indexmap::IndexMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    interval_column, HousePatch, HouseholdStore, NewHouse, NewLedgerEntry, NewTask, StoreError,
    StoreResult, TaskPatch, UserPatch,
};

#[derive(Default)]
struct Tables {
    users: IndexMap<UserId, User>,
    houses: IndexMap<HouseId, House>,
    /// Insertion order doubles as the join-order tie-breaker.
    memberships: Vec<Membership>,
    tasks: IndexMap<TaskId, TaskDefinition>,
    ledger: Vec<LedgerEntry>,
    turns: Vec<ContainerTurn>,
}

impl Tables {
    fn is_active_member(&self, house: HouseId, user: UserId) -> bool {
        self.memberships
            .iter()
            .any(|m| m.house_id == house && m.user_id == user && !m.deleted)
    }

    fn task_mut(&mut self, id: TaskId) -> StoreResult<&mut TaskDefinition> {
        self.tasks
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("Task", id))
    }

    fn last_turn(&self, house: HouseId) -> Option<&ContainerTurn> {
        self.turns
            .iter()
            .enumerate()
            .filter(|(_, t)| t.house_id == house)
            .max_by_key(|(seq, t)| (t.date, *seq))
            .map(|(_, t)| t)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HouseholdStore for MemoryStore {
    // ── Users ────────────────────────────────────────────────────

    async fn create_user(&self, name: &str, email: &str) -> StoreResult<User> {
        let email = email.trim().to_lowercase();
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == email) {
            return Err(StoreError::Conflict(format!("email already registered: {}", email)));
        }
        let user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email,
            phone: None,
            iban: None,
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> StoreResult<User> {
        let tables = self.tables.read().await;
        tables
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("User", id))
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let email = email.trim().to_lowercase();
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn users_by_ids(&self, ids: &[UserId]) -> StoreResult<Vec<User>> {
        let tables = self.tables.read().await;
        Ok(ids.iter().filter_map(|id| tables.users.get(id).cloned()).collect())
    }

    async fn update_user(&self, id: UserId, mut patch: UserPatch) -> StoreResult<User> {
        patch.email = patch.email.map(|e| e.trim().to_lowercase());
        let mut tables = self.tables.write().await;
        if let Some(ref email) = patch.email {
            if tables.users.values().any(|u| u.id != id && &u.email == email) {
                return Err(StoreError::Conflict(format!("email already registered: {}", email)));
            }
        }
        let user = tables
            .users
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("User", id))?;
        patch.apply(user);
        Ok(user.clone())
    }

    // ── Houses ───────────────────────────────────────────────────

    async fn create_house(&self, input: NewHouse, creator: UserId) -> StoreResult<House> {
        let now = Utc::now();
        let house = House {
            id: Uuid::new_v4(),
            name: input.name,
            description: input.description,
            image: DEFAULT_HOUSE_IMAGE.to_string(),
            created_by: creator,
            updated_by: creator,
            created_at: now,
            updated_at: now,
        };
        let mut tables = self.tables.write().await;
        tables.houses.insert(house.id, house.clone());
        tables.memberships.push(Membership {
            house_id: house.id,
            user_id: creator,
            role: OWNER_ROLE,
            deleted: false,
            joined_at: now,
        });
        Ok(house)
    }

    async fn get_house(&self, id: HouseId) -> StoreResult<House> {
        let tables = self.tables.read().await;
        tables
            .houses
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("House", id))
    }

    async fn list_houses(&self) -> StoreResult<Vec<House>> {
        let tables = self.tables.read().await;
        Ok(tables.houses.values().cloned().collect())
    }

    async fn houses_for_user(&self, user: UserId) -> StoreResult<Vec<House>> {
        let tables = self.tables.read().await;
        Ok(tables
            .houses
            .values()
            .filter(|h| tables.is_active_member(h.id, user))
            .cloned()
            .collect())
    }

    async fn update_house(
        &self,
        id: HouseId,
        patch: HousePatch,
        updated_by: UserId,
    ) -> StoreResult<House> {
        let mut tables = self.tables.write().await;
        let house = tables
            .houses
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("House", id))?;
        if let Some(name) = patch.name {
            house.name = name;
        }
        if let Some(description) = patch.description {
            house.description = description;
        }
        house.updated_by = updated_by;
        house.updated_at = Utc::now();
        Ok(house.clone())
    }

    // ── Membership ───────────────────────────────────────────────

    async fn add_member(&self, house: HouseId, user: UserId, role: u32) -> StoreResult<Membership> {
        let mut tables = self.tables.write().await;
        if !tables.houses.contains_key(&house) {
            return Err(StoreError::not_found("House", house));
        }
        if tables.is_active_member(house, user) {
            return Err(StoreError::Conflict("user already belongs to this house".into()));
        }
        // A returning member rejoins at the back of the rotation.
        tables
            .memberships
            .retain(|m| !(m.house_id == house && m.user_id == user));
        let membership = Membership {
            house_id: house,
            user_id: user,
            role,
            deleted: false,
            joined_at: Utc::now(),
        };
        tables.memberships.push(membership.clone());
        Ok(membership)
    }

    async fn remove_member(&self, house: HouseId, user: UserId) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let membership = tables
            .memberships
            .iter_mut()
            .find(|m| m.house_id == house && m.user_id == user && !m.deleted)
            .ok_or_else(|| StoreError::not_found("Membership", user))?;
        membership.deleted = true;
        for task in tables.tasks.values_mut().filter(|t| t.house_id == house) {
            task.assignees.retain(|a| *a != user);
        }
        Ok(())
    }

    async fn is_member(&self, house: HouseId, user: UserId) -> StoreResult<bool> {
        Ok(self.tables.read().await.is_active_member(house, user))
    }

    async fn house_members(&self, house: HouseId) -> StoreResult<Vec<Membership>> {
        let tables = self.tables.read().await;
        let mut members: Vec<Membership> = tables
            .memberships
            .iter()
            .filter(|m| m.house_id == house && !m.deleted)
            .cloned()
            .collect();
        members.sort_by_key(|m| m.joined_at);
        Ok(members)
    }

    // ── Tasks ────────────────────────────────────────────────────

    async fn create_task(&self, input: NewTask) -> StoreResult<TaskDefinition> {
        interval_column(input.interval_days)?;
        let mut tables = self.tables.write().await;
        if !tables.houses.contains_key(&input.house_id) {
            return Err(StoreError::not_found("House", input.house_id));
        }
        let task = TaskDefinition {
            id: Uuid::new_v4(),
            house_id: input.house_id,
            name: input.name,
            description: input.description,
            start_date: input.start_date,
            interval_days: input.interval_days,
            assignees: Vec::new(),
            reminder: input.reminder,
            mark_complete: input.mark_complete,
        };
        tables.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn get_task(&self, id: TaskId) -> StoreResult<TaskDefinition> {
        let tables = self.tables.read().await;
        tables
            .tasks
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("Task", id))
    }

    async fn update_task(&self, id: TaskId, patch: TaskPatch) -> StoreResult<TaskDefinition> {
        if let Some(days) = patch.interval_days {
            interval_column(days)?;
        }
        let mut tables = self.tables.write().await;
        let task = tables.task_mut(id)?;
        patch.apply(task);
        Ok(task.clone())
    }

    async fn delete_task(&self, id: TaskId) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables
            .tasks
            .shift_remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found("Task", id))
    }

    async fn tasks_for_house(&self, house: HouseId) -> StoreResult<Vec<TaskDefinition>> {
        let tables = self.tables.read().await;
        Ok(tables
            .tasks
            .values()
            .filter(|t| t.house_id == house)
            .cloned()
            .collect())
    }

    async fn tasks_for_user(&self, user: UserId) -> StoreResult<Vec<TaskDefinition>> {
        let tables = self.tables.read().await;
        Ok(tables
            .tasks
            .values()
            .filter(|t| t.is_assigned_to(&user))
            .cloned()
            .collect())
    }

    async fn assign_task_user(&self, task: TaskId, user: UserId) -> StoreResult<TaskDefinition> {
        let mut tables = self.tables.write().await;
        let task = tables.task_mut(task)?;
        if task.is_assigned_to(&user) {
            return Err(StoreError::Conflict("user is already assigned to this task".into()));
        }
        task.assignees.push(user);
        Ok(task.clone())
    }

    async fn unassign_task_user(&self, task: TaskId, user: UserId) -> StoreResult<TaskDefinition> {
        let mut tables = self.tables.write().await;
        let task = tables.task_mut(task)?;
        if !task.is_assigned_to(&user) {
            return Err(StoreError::not_found("Assignee", user));
        }
        task.assignees.retain(|a| *a != user);
        Ok(task.clone())
    }

    // ── Ledger ───────────────────────────────────────────────────

    async fn append_ledger(&self, entries: Vec<NewLedgerEntry>) -> StoreResult<Vec<LedgerEntry>> {
        let now = Utc::now();
        let mut tables = self.tables.write().await;
        let stored: Vec<LedgerEntry> = entries
            .into_iter()
            .map(|e| LedgerEntry {
                id: Uuid::new_v4(),
                house_id: e.house_id,
                user_id: e.user_id,
                kind: e.kind,
                value: e.value,
                performed_by: e.performed_by,
                created_at: now,
            })
            .collect();
        tables.ledger.extend(stored.iter().cloned());
        Ok(stored)
    }

    async fn ledger_totals(&self, house: HouseId) -> StoreResult<Vec<LedgerTotal>> {
        let tables = self.tables.read().await;
        let mut totals: IndexMap<(Option<UserId>, LedgerKind), i64> = IndexMap::new();
        for entry in tables.ledger.iter().filter(|e| e.house_id == house) {
            *totals.entry((entry.user_id, entry.kind)).or_insert(0) += entry.value;
        }
        Ok(totals
            .into_iter()
            .map(|((user_id, kind), total)| LedgerTotal { user_id, kind, total })
            .collect())
    }

    // ── Container turns ──────────────────────────────────────────

    async fn container_turns(&self, house: HouseId) -> StoreResult<Vec<ContainerTurn>> {
        let tables = self.tables.read().await;
        let mut turns: Vec<ContainerTurn> = tables
            .turns
            .iter()
            .filter(|t| t.house_id == house)
            .cloned()
            .collect();
        turns.sort_by_key(|t| t.date);
        Ok(turns)
    }

    async fn last_served_user(&self, house: HouseId) -> StoreResult<Option<UserId>> {
        let tables = self.tables.read().await;
        Ok(tables.last_turn(house).map(|t| t.user_id))
    }

    async fn record_turn_complete(
        &self,
        house: HouseId,
        expected_last: Option<UserId>,
        user: UserId,
        date: NaiveDate,
    ) -> StoreResult<ContainerTurn> {
        let mut tables = self.tables.write().await;
        if !tables.houses.contains_key(&house) {
            return Err(StoreError::not_found("House", house));
        }
        let current = tables.last_turn(house).map(|t| t.user_id);
        if current != expected_last {
            return Err(StoreError::Conflict(
                "container turn was recorded concurrently".into(),
            ));
        }
        let turn = ContainerTurn {
            id: Uuid::new_v4(),
            house_id: house,
            user_id: user,
            date,
            took_over_user_id: None,
            created_at: Utc::now(),
        };
        tables.turns.push(turn.clone());
        Ok(turn)
    }
}
