use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::HouseholdError;

pub type UserId = Uuid;
pub type HouseId = Uuid;
pub type TaskId = Uuid;

pub const DEFAULT_HOUSE_IMAGE: &str = "/img/placeholders/house_placeholder.jpg";

/// Role given to the member who creates a house.
pub const OWNER_ROLE: u32 = 1;

/// Longest accepted task interval; intervals are stored as 32-bit integers.
pub const MAX_INTERVAL_DAYS: u32 = i32::MAX as u32;

// ── Users & houses ────────────────────────────────────────────

/// A directory entry for someone who can join houses. Credentials live elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    /// Normalized: uppercase, no spaces.
    #[serde(default)]
    pub iban: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct House {
    pub id: HouseId,
    pub name: String,
    pub description: String,
    pub image: String,
    pub created_by: UserId,
    pub updated_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    pub house_id: HouseId,
    pub user_id: UserId,
    pub role: u32,
    pub deleted: bool,
    pub joined_at: DateTime<Utc>,
}

/// Check a membership role against the accepted 1..=9 range.
pub fn validate_role(role: u32) -> Result<u32, HouseholdError> {
    if (1..=9).contains(&role) {
        Ok(role)
    } else {
        Err(HouseholdError::InvalidRole(role))
    }
}

// ── Tasks ─────────────────────────────────────────────────────

/// A recurring chore. `assignees` is the rotation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDefinition {
    pub id: TaskId,
    pub house_id: HouseId,
    pub name: String,
    pub description: String,
    /// Date of occurrence zero.
    pub start_date: NaiveDate,
    pub interval_days: u32,
    pub assignees: Vec<UserId>,
    pub reminder: bool,
    pub mark_complete: bool,
}

impl TaskDefinition {
    /// Reject definitions the scheduler cannot expand.
    pub fn validate(&self) -> Result<(), HouseholdError> {
        if !(1..=MAX_INTERVAL_DAYS).contains(&self.interval_days) {
            return Err(HouseholdError::InvalidInterval(self.interval_days));
        }
        if self.name.trim().is_empty() {
            return Err(HouseholdError::Validation("task name must not be empty".into()));
        }
        Ok(())
    }

    pub fn is_assigned_to(&self, user: &UserId) -> bool {
        self.assignees.contains(user)
    }
}

// ── Beer & crate ledger ───────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerKind {
    Beer,
    Crate,
}

impl LedgerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerKind::Beer => "beer",
            LedgerKind::Crate => "crate",
        }
    }
}

impl std::fmt::Display for LedgerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LedgerKind {
    type Err = HouseholdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "beer" => Ok(LedgerKind::Beer),
            "crate" => Ok(LedgerKind::Crate),
            other => Err(HouseholdError::UnknownLedgerKind(other.to_string())),
        }
    }
}

/// One signed movement in a house's beer/crate ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub house_id: HouseId,
    /// `None` for house-level movements such as returned crates.
    pub user_id: Option<UserId>,
    pub kind: LedgerKind,
    pub value: i64,
    pub performed_by: UserId,
    pub created_at: DateTime<Utc>,
}

/// Summed ledger value for one (user, kind) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTotal {
    pub user_id: Option<UserId>,
    pub kind: LedgerKind,
    pub total: i64,
}

// ── Waste container turns ─────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerTurn {
    pub id: Uuid,
    pub house_id: HouseId,
    pub user_id: UserId,
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub took_over_user_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
}
