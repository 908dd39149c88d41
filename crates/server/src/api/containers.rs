//! Waste-container turns: who takes the bins out next.
//!
//! Each recorded turn names the member responsible and the date it is due.
//! Advancing appends a turn for the member after whoever was recorded last.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use household_core::{ContainerTurn, HouseId, UserId};
use household_scheduler::{add_days, Rotation, ScheduleError};
use serde::Serialize;
use tracing::{info, warn};

use crate::state::AppState;
use crate::store::StoreError;

use super::{
    conflict, require_member, schedule_error, store_error, ActingUser, ApiPath, ApiResult,
};

/// Attempts before a contended advance gives up with 409.
const ADVANCE_ATTEMPTS: u32 = 3;

#[derive(Debug, Serialize)]
pub struct TurnView {
    pub user_id: UserId,
    pub name: String,
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub took_over_user_id: Option<UserId>,
}

#[derive(Debug, Serialize)]
pub struct NextUserView {
    pub user_id: UserId,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct ContainersResponse {
    /// Recorded turns, oldest first.
    pub turns: Vec<TurnView>,
    /// Latest turn date of the acting user, if any.
    pub my_next_turn: Option<NaiveDate>,
    /// Who the next advance will schedule.
    pub next_user: Option<NextUserView>,
}

/// The member after `last_served`. A last-served user who has since left the
/// house restarts the rotation at the first member.
fn upcoming_member(
    house: HouseId,
    members: Vec<UserId>,
    last_served: Option<UserId>,
) -> Result<UserId, ScheduleError> {
    let rotation = match Rotation::resume(members.clone(), last_served.as_ref()) {
        Err(ScheduleError::NotInRotation) => {
            warn!(
                house_id = %house,
                last_served = ?last_served,
                "last container user left the house, restarting rotation"
            );
            Rotation::resume(members, None)?
        }
        other => other?,
    };
    Ok(*rotation.upcoming())
}

async fn member_ids(state: &AppState, house: HouseId) -> ApiResult<Vec<UserId>> {
    Ok(state
        .store
        .house_members(house)
        .await
        .map_err(store_error)?
        .into_iter()
        .map(|m| m.user_id)
        .collect())
}

async fn names_for(state: &AppState, ids: &[UserId]) -> ApiResult<HashMap<UserId, String>> {
    Ok(state
        .store
        .users_by_ids(ids)
        .await
        .map_err(store_error)?
        .into_iter()
        .map(|u| (u.id, u.name))
        .collect())
}

fn turn_view(turn: ContainerTurn, names: &HashMap<UserId, String>) -> TurnView {
    TurnView {
        user_id: turn.user_id,
        name: names
            .get(&turn.user_id)
            .cloned()
            .unwrap_or_else(|| turn.user_id.to_string()),
        date: turn.date,
        took_over_user_id: turn.took_over_user_id,
    }
}

pub async fn list_containers(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    ApiPath(id): ApiPath<HouseId>,
) -> ApiResult<Json<ContainersResponse>> {
    require_member(&state, id, actor).await?;

    let turns = state.store.container_turns(id).await.map_err(store_error)?;
    let members = member_ids(&state, id).await?;
    let last_served = turns.last().map(|t| t.user_id);

    let next = match upcoming_member(id, members, last_served) {
        Ok(user) => Some(user),
        Err(ScheduleError::EmptyRotation) => None,
        Err(e) => return Err(schedule_error(e)),
    };

    let mut ids: Vec<UserId> = turns.iter().map(|t| t.user_id).chain(next).collect();
    ids.sort_unstable();
    ids.dedup();
    let names = names_for(&state, &ids).await?;

    let my_next_turn = turns
        .iter()
        .filter(|t| t.user_id == actor)
        .map(|t| t.date)
        .max();
    let next_user = next.map(|user_id| NextUserView {
        user_id,
        name: names
            .get(&user_id)
            .cloned()
            .unwrap_or_else(|| user_id.to_string()),
    });

    Ok(Json(ContainersResponse {
        turns: turns.into_iter().map(|t| turn_view(t, &names)).collect(),
        my_next_turn,
        next_user,
    }))
}

/// Schedule the next member's turn `container_interval_weeks` from today.
///
/// The store records the turn only if nobody else advanced in between;
/// a lost race re-reads the rotation and tries again.
pub async fn advance_container(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    ApiPath(id): ApiPath<HouseId>,
) -> ApiResult<(StatusCode, Json<TurnView>)> {
    require_member(&state, id, actor).await?;

    let offset = i64::from(state.schedule.container_interval_weeks) * 7;
    let due = add_days(state.clock.today(), offset)
        .ok_or_else(|| schedule_error(ScheduleError::DateOutOfRange))?;

    for attempt in 1..=ADVANCE_ATTEMPTS {
        let members = member_ids(&state, id).await?;
        let last_served = state.store.last_served_user(id).await.map_err(store_error)?;
        let next = upcoming_member(id, members, last_served).map_err(schedule_error)?;

        match state
            .store
            .record_turn_complete(id, last_served, next, due)
            .await
        {
            Ok(turn) => {
                info!(house_id = %id, user_id = %next, date = %due, "container turn scheduled");
                let names = names_for(&state, &[next]).await?;
                return Ok((StatusCode::CREATED, Json(turn_view(turn, &names))));
            }
            Err(StoreError::Conflict(_)) => {
                warn!(house_id = %id, attempt, "container advance raced, retrying");
            }
            Err(e) => return Err(store_error(e)),
        }
    }

    Err(conflict("container turns changed concurrently, try again"))
}
