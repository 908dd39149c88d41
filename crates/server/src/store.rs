//! Persistence boundary for households, tasks, ledgers, and container turns.
//!
//! Handlers only talk to [`HouseholdStore`]. [`MemoryStore`] backs tests and
//! database-less runs; [`PgStore`] is the PostgreSQL implementation.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::NaiveDate;
use household_core::{
    ContainerTurn, House, HouseId, HouseholdError, LedgerEntry, LedgerKind, LedgerTotal,
    Membership, TaskDefinition, TaskId, User, UserId, MAX_INTERVAL_DAYS,
};

/// Errors surfaced by store implementations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{resource} not found: {id}")]
    NotFound { resource: &'static str, id: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Input the store cannot represent.
    #[error(transparent)]
    Invalid(#[from] HouseholdError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub(crate) fn not_found(resource: &'static str, id: impl ToString) -> Self {
        StoreError::NotFound {
            resource,
            id: id.to_string(),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Task intervals as stored in the `INTEGER` column.
pub(crate) fn interval_column(days: u32) -> StoreResult<i32> {
    if !(1..=MAX_INTERVAL_DAYS).contains(&days) {
        return Err(HouseholdError::InvalidInterval(days).into());
    }
    i32::try_from(days).map_err(|_| HouseholdError::InvalidInterval(days).into())
}

// ── Inputs ───────────────────────────────────────────────────────

/// Self-service profile changes. For `phone` and `iban`, `Some(None)` clears
/// the stored value.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<Option<String>>,
    pub iban: Option<Option<String>>,
}

impl UserPatch {
    pub(crate) fn apply(&self, user: &mut User) {
        if let Some(ref name) = self.name {
            user.name = name.clone();
        }
        if let Some(ref email) = self.email {
            user.email = email.clone();
        }
        if let Some(ref phone) = self.phone {
            user.phone = phone.clone();
        }
        if let Some(ref iban) = self.iban {
            user.iban = iban.clone();
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewHouse {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Default)]
pub struct HousePatch {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewTask {
    pub house_id: HouseId,
    pub name: String,
    pub description: String,
    pub start_date: NaiveDate,
    pub interval_days: u32,
    pub reminder: bool,
    pub mark_complete: bool,
}

#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub interval_days: Option<u32>,
    pub reminder: Option<bool>,
    pub mark_complete: Option<bool>,
}

impl TaskPatch {
    pub(crate) fn apply(&self, task: &mut TaskDefinition) {
        if let Some(ref name) = self.name {
            task.name = name.clone();
        }
        if let Some(ref description) = self.description {
            task.description = description.clone();
        }
        if let Some(start_date) = self.start_date {
            task.start_date = start_date;
        }
        if let Some(interval_days) = self.interval_days {
            task.interval_days = interval_days;
        }
        if let Some(reminder) = self.reminder {
            task.reminder = reminder;
        }
        if let Some(mark_complete) = self.mark_complete {
            task.mark_complete = mark_complete;
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
    pub house_id: HouseId,
    pub user_id: Option<UserId>,
    pub kind: LedgerKind,
    pub value: i64,
    pub performed_by: UserId,
}

// ── Store trait ──────────────────────────────────────────────────

#[async_trait]
pub trait HouseholdStore: Send + Sync {
    // Users
    async fn create_user(&self, name: &str, email: &str) -> StoreResult<User>;
    async fn get_user(&self, id: UserId) -> StoreResult<User>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn users_by_ids(&self, ids: &[UserId]) -> StoreResult<Vec<User>>;
    /// Fails with `Conflict` when the new email belongs to another user.
    async fn update_user(&self, id: UserId, patch: UserPatch) -> StoreResult<User>;

    // Houses
    /// Create a house; `creator` joins it with the owner role.
    async fn create_house(&self, input: NewHouse, creator: UserId) -> StoreResult<House>;
    async fn get_house(&self, id: HouseId) -> StoreResult<House>;
    async fn list_houses(&self) -> StoreResult<Vec<House>>;
    async fn houses_for_user(&self, user: UserId) -> StoreResult<Vec<House>>;
    async fn update_house(
        &self,
        id: HouseId,
        patch: HousePatch,
        updated_by: UserId,
    ) -> StoreResult<House>;

    // Membership
    /// Fails with `Conflict` when the user is already an active member.
    async fn add_member(&self, house: HouseId, user: UserId, role: u32) -> StoreResult<Membership>;
    /// Soft-delete a membership and drop the user from the house's task rotations.
    async fn remove_member(&self, house: HouseId, user: UserId) -> StoreResult<()>;
    async fn is_member(&self, house: HouseId, user: UserId) -> StoreResult<bool>;
    /// Active members in rotation order (join time, then join sequence).
    async fn house_members(&self, house: HouseId) -> StoreResult<Vec<Membership>>;

    // Tasks
    async fn create_task(&self, input: NewTask) -> StoreResult<TaskDefinition>;
    async fn get_task(&self, id: TaskId) -> StoreResult<TaskDefinition>;
    async fn update_task(&self, id: TaskId, patch: TaskPatch) -> StoreResult<TaskDefinition>;
    async fn delete_task(&self, id: TaskId) -> StoreResult<()>;
    async fn tasks_for_house(&self, house: HouseId) -> StoreResult<Vec<TaskDefinition>>;
    /// Tasks (in any house) that list `user` among their assignees.
    async fn tasks_for_user(&self, user: UserId) -> StoreResult<Vec<TaskDefinition>>;
    /// Append `user` to the end of the task's rotation.
    async fn assign_task_user(&self, task: TaskId, user: UserId) -> StoreResult<TaskDefinition>;
    async fn unassign_task_user(&self, task: TaskId, user: UserId) -> StoreResult<TaskDefinition>;

    // Beer & crate ledger
    /// Append all entries or none.
    async fn append_ledger(&self, entries: Vec<NewLedgerEntry>) -> StoreResult<Vec<LedgerEntry>>;
    /// Sum of ledger values per (user, kind) for a house.
    async fn ledger_totals(&self, house: HouseId) -> StoreResult<Vec<LedgerTotal>>;

    // Container turns
    /// Recorded turns, ascending by date.
    async fn container_turns(&self, house: HouseId) -> StoreResult<Vec<ContainerTurn>>;
    async fn last_served_user(&self, house: HouseId) -> StoreResult<Option<UserId>>;
    /// Compare-and-set: records the turn only if the latest recorded turn still
    /// belongs to `expected_last`, otherwise fails with `Conflict`.
    async fn record_turn_complete(
        &self,
        house: HouseId,
        expected_last: Option<UserId>,
        user: UserId,
        date: NaiveDate,
    ) -> StoreResult<ContainerTurn>;
}
