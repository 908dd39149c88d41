use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use household_core::{
    ContainerTurn, House, HouseId, LedgerEntry, LedgerKind, LedgerTotal, Membership,
    TaskDefinition, TaskId, User, UserId, DEFAULT_HOUSE_IMAGE, OWNER_ROLE,
};
use sqlx::PgPool;
use uuid::Uuid;

use super::{
    interval_column, HousePatch, HouseholdStore, NewHouse, NewLedgerEntry, NewTask, StoreError,
    StoreResult, TaskPatch, UserPatch,
};

// ── Rows ─────────────────────────────────────────────────────────

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    phone: Option<String>,
    iban: Option<String>,
}

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        User {
            id: r.id,
            name: r.name,
            email: r.email,
            phone: r.phone,
            iban: r.iban,
        }
    }
}

#[derive(sqlx::FromRow)]
struct HouseRow {
    id: Uuid,
    name: String,
    description: String,
    image: String,
    created_by: Uuid,
    updated_by: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<HouseRow> for House {
    fn from(r: HouseRow) -> Self {
        House {
            id: r.id,
            name: r.name,
            description: r.description,
            image: r.image,
            created_by: r.created_by,
            updated_by: r.updated_by,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct MembershipRow {
    house_id: Uuid,
    user_id: Uuid,
    role: i32,
    deleted: bool,
    joined_at: DateTime<Utc>,
}

impl From<MembershipRow> for Membership {
    fn from(r: MembershipRow) -> Self {
        Membership {
            house_id: r.house_id,
            user_id: r.user_id,
            // CHECK (role BETWEEN 1 AND 9)
            role: r.role as u32,
            deleted: r.deleted,
            joined_at: r.joined_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct TaskRow {
    id: Uuid,
    house_id: Uuid,
    name: String,
    description: String,
    start_date: NaiveDate,
    interval_days: i32,
    reminder: bool,
    mark_complete: bool,
}

impl TaskRow {
    fn into_task(self, assignees: Vec<UserId>) -> TaskDefinition {
        TaskDefinition {
            id: self.id,
            house_id: self.house_id,
            name: self.name,
            description: self.description,
            start_date: self.start_date,
            // CHECK (interval_days > 0)
            interval_days: self.interval_days as u32,
            assignees,
            reminder: self.reminder,
            mark_complete: self.mark_complete,
        }
    }
}

#[derive(sqlx::FromRow)]
struct LedgerRow {
    id: Uuid,
    house_id: Uuid,
    user_id: Option<Uuid>,
    kind: String,
    value: i64,
    performed_by: Uuid,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct TurnRow {
    id: Uuid,
    house_id: Uuid,
    user_id: Uuid,
    date: NaiveDate,
    took_over_user_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl From<TurnRow> for ContainerTurn {
    fn from(r: TurnRow) -> Self {
        ContainerTurn {
            id: r.id,
            house_id: r.house_id,
            user_id: r.user_id,
            date: r.date,
            took_over_user_id: r.took_over_user_id,
            created_at: r.created_at,
        }
    }
}

fn parse_kind(kind: &str) -> StoreResult<LedgerKind> {
    kind.parse::<LedgerKind>()
        .map_err(|e| StoreError::Database(sqlx::Error::Decode(Box::new(e))))
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn email_conflict(e: sqlx::Error, email: &str) -> StoreError {
    if is_unique_violation(&e) {
        StoreError::Conflict(format!("email already registered: {}", email))
    } else {
        StoreError::Database(e)
    }
}

const USER_COLUMNS: &str = "id, name, email, phone, iban";
const HOUSE_COLUMNS: &str =
    "id, name, description, image, created_by, updated_by, created_at, updated_at";
const TASK_COLUMNS: &str =
    "t.id, t.house_id, t.name, t.description, t.start_date, t.interval_days, t.reminder, t.mark_complete";
const TURN_COLUMNS: &str = "id, house_id, user_id, date, took_over_user_id, created_at";

// ── Store ────────────────────────────────────────────────────────

/// PostgreSQL-backed [`HouseholdStore`]. Schema lives in `migrations/`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Attach assignees (in rotation order) to a batch of task rows.
    async fn with_assignees(&self, rows: Vec<TaskRow>) -> StoreResult<Vec<TaskDefinition>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let pairs = sqlx::query_as::<_, (Uuid, Uuid)>(
            "SELECT task_id, user_id FROM task_assignees
             WHERE task_id = ANY($1) ORDER BY seq",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_task: HashMap<Uuid, Vec<UserId>> = HashMap::new();
        for (task_id, user_id) in pairs {
            by_task.entry(task_id).or_default().push(user_id);
        }
        Ok(rows
            .into_iter()
            .map(|r| {
                let assignees = by_task.remove(&r.id).unwrap_or_default();
                r.into_task(assignees)
            })
            .collect())
    }

    async fn house_exists(&self, id: HouseId) -> StoreResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM houses WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }
}

#[async_trait]
impl HouseholdStore for PgStore {
    // ── Users ────────────────────────────────────────────────────

    async fn create_user(&self, name: &str, email: &str) -> StoreResult<User> {
        let email = email.trim().to_lowercase();
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users (id, name, email) VALUES ($1, $2, $3)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(&email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| email_conflict(e, &email))?;
        Ok(row.into())
    }

    async fn get_user(&self, id: UserId) -> StoreResult<User> {
        sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(User::from)
            .ok_or_else(|| StoreError::not_found("User", id))
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
            .bind(email.trim().to_lowercase())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    async fn users_by_ids(&self, ids: &[UserId]) -> StoreResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        let mut by_id: HashMap<Uuid, User> =
            rows.into_iter().map(|r| (r.id, User::from(r))).collect();
        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    async fn update_user(&self, id: UserId, patch: UserPatch) -> StoreResult<User> {
        let email = patch.email.map(|e| e.trim().to_lowercase());
        // $4/$6 say whether phone/iban are being set; NULL in $5/$7 then clears.
        sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET
                name = COALESCE($2, name),
                email = COALESCE($3, email),
                phone = CASE WHEN $4 THEN $5 ELSE phone END,
                iban = CASE WHEN $6 THEN $7 ELSE iban END
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(patch.name)
        .bind(email.as_deref())
        .bind(patch.phone.is_some())
        .bind(patch.phone.flatten())
        .bind(patch.iban.is_some())
        .bind(patch.iban.flatten())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| email_conflict(e, email.as_deref().unwrap_or_default()))?
        .map(User::from)
        .ok_or_else(|| StoreError::not_found("User", id))
    }

    // ── Houses ───────────────────────────────────────────────────

    async fn create_house(&self, input: NewHouse, creator: UserId) -> StoreResult<House> {
        let mut tx = self.pool.begin().await?;

        let house = sqlx::query_as::<_, HouseRow>(&format!(
            "INSERT INTO houses (id, name, description, image, created_by, updated_by)
             VALUES ($1, $2, $3, $4, $5, $5)
             RETURNING {HOUSE_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&input.name)
        .bind(&input.description)
        .bind(DEFAULT_HOUSE_IMAGE)
        .bind(creator)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO memberships (house_id, user_id, role) VALUES ($1, $2, $3)")
            .bind(house.id)
            .bind(creator)
            .bind(OWNER_ROLE as i32)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(house.into())
    }

    async fn get_house(&self, id: HouseId) -> StoreResult<House> {
        sqlx::query_as::<_, HouseRow>(&format!("SELECT {HOUSE_COLUMNS} FROM houses WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(House::from)
            .ok_or_else(|| StoreError::not_found("House", id))
    }

    async fn list_houses(&self) -> StoreResult<Vec<House>> {
        let rows = sqlx::query_as::<_, HouseRow>(&format!(
            "SELECT {HOUSE_COLUMNS} FROM houses ORDER BY created_at"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(House::from).collect())
    }

    async fn houses_for_user(&self, user: UserId) -> StoreResult<Vec<House>> {
        let rows = sqlx::query_as::<_, HouseRow>(
            "SELECT h.id, h.name, h.description, h.image, h.created_by, h.updated_by, h.created_at, h.updated_at
             FROM houses h JOIN memberships m ON m.house_id = h.id
             WHERE m.user_id = $1 AND NOT m.deleted
             ORDER BY h.created_at",
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(House::from).collect())
    }

    async fn update_house(
        &self,
        id: HouseId,
        patch: HousePatch,
        updated_by: UserId,
    ) -> StoreResult<House> {
        sqlx::query_as::<_, HouseRow>(&format!(
            "UPDATE houses SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                updated_by = $4,
                updated_at = now()
             WHERE id = $1
             RETURNING {HOUSE_COLUMNS}"
        ))
        .bind(id)
        .bind(patch.name)
        .bind(patch.description)
        .bind(updated_by)
        .fetch_optional(&self.pool)
        .await?
        .map(House::from)
        .ok_or_else(|| StoreError::not_found("House", id))
    }

    // ── Membership ───────────────────────────────────────────────

    async fn add_member(&self, house: HouseId, user: UserId, role: u32) -> StoreResult<Membership> {
        if !self.house_exists(house).await? {
            return Err(StoreError::not_found("House", house));
        }
        // Rejoining revives the soft-deleted row with a fresh join time.
        let row = sqlx::query_as::<_, MembershipRow>(
            "INSERT INTO memberships (house_id, user_id, role) VALUES ($1, $2, $3)
             ON CONFLICT (house_id, user_id) DO UPDATE
                SET deleted = false, role = EXCLUDED.role, joined_at = now(), seq = DEFAULT
                WHERE memberships.deleted
             RETURNING house_id, user_id, role, deleted, joined_at",
        )
        .bind(house)
        .bind(user)
        .bind(role as i32)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Membership::from)
            .ok_or_else(|| StoreError::Conflict("user already belongs to this house".into()))
    }

    async fn remove_member(&self, house: HouseId, user: UserId) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE memberships SET deleted = true
             WHERE house_id = $1 AND user_id = $2 AND NOT deleted",
        )
        .bind(house)
        .bind(user)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(StoreError::not_found("Membership", user));
        }

        sqlx::query(
            "DELETE FROM task_assignees
             WHERE user_id = $2 AND task_id IN (SELECT id FROM tasks WHERE house_id = $1)",
        )
        .bind(house)
        .bind(user)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn is_member(&self, house: HouseId, user: UserId) -> StoreResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM memberships
                           WHERE house_id = $1 AND user_id = $2 AND NOT deleted)",
        )
        .bind(house)
        .bind(user)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn house_members(&self, house: HouseId) -> StoreResult<Vec<Membership>> {
        let rows = sqlx::query_as::<_, MembershipRow>(
            "SELECT house_id, user_id, role, deleted, joined_at FROM memberships
             WHERE house_id = $1 AND NOT deleted
             ORDER BY joined_at, seq",
        )
        .bind(house)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Membership::from).collect())
    }

    // ── Tasks ────────────────────────────────────────────────────

    async fn create_task(&self, input: NewTask) -> StoreResult<TaskDefinition> {
        if !self.house_exists(input.house_id).await? {
            return Err(StoreError::not_found("House", input.house_id));
        }
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            "INSERT INTO tasks AS t
                (id, house_id, name, description, start_date, interval_days, reminder, mark_complete)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {TASK_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(input.house_id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.start_date)
        .bind(interval_column(input.interval_days)?)
        .bind(input.reminder)
        .bind(input.mark_complete)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into_task(Vec::new()))
    }

    async fn get_task(&self, id: TaskId) -> StoreResult<TaskDefinition> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks t WHERE t.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found("Task", id))?;
        let mut tasks = self.with_assignees(vec![row]).await?;
        tasks.pop().ok_or_else(|| StoreError::not_found("Task", id))
    }

    async fn update_task(&self, id: TaskId, patch: TaskPatch) -> StoreResult<TaskDefinition> {
        let interval = patch.interval_days.map(interval_column).transpose()?;
        // Fields missing from the patch keep their current column value.
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            "UPDATE tasks AS t SET
                name = COALESCE($2, t.name),
                description = COALESCE($3, t.description),
                start_date = COALESCE($4, t.start_date),
                interval_days = COALESCE($5, t.interval_days),
                reminder = COALESCE($6, t.reminder),
                mark_complete = COALESCE($7, t.mark_complete)
             WHERE t.id = $1
             RETURNING {TASK_COLUMNS}"
        ))
        .bind(id)
        .bind(patch.name)
        .bind(patch.description)
        .bind(patch.start_date)
        .bind(interval)
        .bind(patch.reminder)
        .bind(patch.mark_complete)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found("Task", id))?;
        let mut tasks = self.with_assignees(vec![row]).await?;
        tasks.pop().ok_or_else(|| StoreError::not_found("Task", id))
    }

    async fn delete_task(&self, id: TaskId) -> StoreResult<()> {
        let deleted = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(StoreError::not_found("Task", id));
        }
        Ok(())
    }

    async fn tasks_for_house(&self, house: HouseId) -> StoreResult<Vec<TaskDefinition>> {
        let rows = sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks t WHERE t.house_id = $1 ORDER BY t.created_at, t.id"
        ))
        .bind(house)
        .fetch_all(&self.pool)
        .await?;
        self.with_assignees(rows).await
    }

    async fn tasks_for_user(&self, user: UserId) -> StoreResult<Vec<TaskDefinition>> {
        let rows = sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks t
             JOIN task_assignees a ON a.task_id = t.id
             WHERE a.user_id = $1
             ORDER BY t.created_at, t.id"
        ))
        .bind(user)
        .fetch_all(&self.pool)
        .await?;
        self.with_assignees(rows).await
    }

    async fn assign_task_user(&self, task: TaskId, user: UserId) -> StoreResult<TaskDefinition> {
        // Surfaces NotFound before the insert trips the foreign key.
        self.get_task(task).await?;
        let inserted = sqlx::query(
            "INSERT INTO task_assignees (task_id, user_id) VALUES ($1, $2)
             ON CONFLICT (task_id, user_id) DO NOTHING",
        )
        .bind(task)
        .bind(user)
        .execute(&self.pool)
        .await?;
        if inserted.rows_affected() == 0 {
            return Err(StoreError::Conflict("user is already assigned to this task".into()));
        }
        self.get_task(task).await
    }

    async fn unassign_task_user(&self, task: TaskId, user: UserId) -> StoreResult<TaskDefinition> {
        self.get_task(task).await?;
        let deleted = sqlx::query("DELETE FROM task_assignees WHERE task_id = $1 AND user_id = $2")
            .bind(task)
            .bind(user)
            .execute(&self.pool)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(StoreError::not_found("Assignee", user));
        }
        self.get_task(task).await
    }

    // ── Ledger ───────────────────────────────────────────────────

    async fn append_ledger(&self, entries: Vec<NewLedgerEntry>) -> StoreResult<Vec<LedgerEntry>> {
        let mut tx = self.pool.begin().await?;
        let mut stored = Vec::with_capacity(entries.len());
        for e in entries {
            let row = sqlx::query_as::<_, LedgerRow>(
                "INSERT INTO ledger_entries (id, house_id, user_id, kind, value, performed_by)
                 VALUES ($1, $2, $3, $4, $5, $6)
                 RETURNING id, house_id, user_id, kind, value, performed_by, created_at",
            )
            .bind(Uuid::new_v4())
            .bind(e.house_id)
            .bind(e.user_id)
            .bind(e.kind.as_str())
            .bind(e.value)
            .bind(e.performed_by)
            .fetch_one(&mut *tx)
            .await?;
            stored.push(LedgerEntry {
                id: row.id,
                house_id: row.house_id,
                user_id: row.user_id,
                kind: parse_kind(&row.kind)?,
                value: row.value,
                performed_by: row.performed_by,
                created_at: row.created_at,
            });
        }
        tx.commit().await?;
        Ok(stored)
    }

    async fn ledger_totals(&self, house: HouseId) -> StoreResult<Vec<LedgerTotal>> {
        let rows = sqlx::query_as::<_, (Option<Uuid>, String, i64)>(
            "SELECT user_id, kind, SUM(value)::BIGINT FROM ledger_entries
             WHERE house_id = $1 GROUP BY user_id, kind",
        )
        .bind(house)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|(user_id, kind, total)| {
                Ok(LedgerTotal {
                    user_id,
                    kind: parse_kind(&kind)?,
                    total,
                })
            })
            .collect()
    }

    // ── Container turns ──────────────────────────────────────────

    async fn container_turns(&self, house: HouseId) -> StoreResult<Vec<ContainerTurn>> {
        let rows = sqlx::query_as::<_, TurnRow>(&format!(
            "SELECT {TURN_COLUMNS} FROM container_turns WHERE house_id = $1 ORDER BY date, seq"
        ))
        .bind(house)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(ContainerTurn::from).collect())
    }

    async fn last_served_user(&self, house: HouseId) -> StoreResult<Option<UserId>> {
        let user = sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM container_turns WHERE house_id = $1
             ORDER BY date DESC, seq DESC LIMIT 1",
        )
        .bind(house)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn record_turn_complete(
        &self,
        house: HouseId,
        expected_last: Option<UserId>,
        user: UserId,
        date: NaiveDate,
    ) -> StoreResult<ContainerTurn> {
        let mut tx = self.pool.begin().await?;

        // The house row lock serialises concurrent writers for this house.
        sqlx::query_scalar::<_, Uuid>("SELECT id FROM houses WHERE id = $1 FOR UPDATE")
            .bind(house)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::not_found("House", house))?;

        let current = sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM container_turns WHERE house_id = $1
             ORDER BY date DESC, seq DESC LIMIT 1",
        )
        .bind(house)
        .fetch_optional(&mut *tx)
        .await?;
        if current != expected_last {
            return Err(StoreError::Conflict(
                "container turn was recorded concurrently".into(),
            ));
        }

        let row = sqlx::query_as::<_, TurnRow>(&format!(
            "INSERT INTO container_turns (id, house_id, user_id, date)
             VALUES ($1, $2, $3, $4)
             RETURNING {TURN_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(house)
        .bind(user)
        .bind(date)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row.into())
    }
}
