//! House and membership endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use household_core::{validate_role, House, HouseId, TaskDefinition, UserId};
use serde::{Deserialize, Serialize};

use crate::state::AppState;
use crate::store::{HousePatch, NewHouse, StoreError};

use super::{
    bad_request, not_found, require_member, store_error, ActingUser, ApiJson, ApiPath, ApiResult,
};

const NAME_CHARS: std::ops::RangeInclusive<usize> = 4..=56;
const DESCRIPTION_MAX_CHARS: usize = 280;

fn check_name(name: &str) -> ApiResult<()> {
    let len = name.chars().count();
    if !NAME_CHARS.contains(&len) {
        return Err(bad_request(format!(
            "house name must be {} to {} characters",
            NAME_CHARS.start(),
            NAME_CHARS.end()
        )));
    }
    Ok(())
}

fn check_description(description: &str) -> ApiResult<()> {
    if description.chars().count() > DESCRIPTION_MAX_CHARS {
        return Err(bad_request(format!(
            "house description must be at most {} characters",
            DESCRIPTION_MAX_CHARS
        )));
    }
    Ok(())
}

// ── Houses ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateHouseRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateHouseRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

pub async fn list_houses(
    State(state): State<Arc<AppState>>,
    _actor: ActingUser,
) -> ApiResult<Json<Vec<House>>> {
    let houses = state.store.list_houses().await.map_err(store_error)?;
    Ok(Json(houses))
}

/// Create a house; the creator joins it as owner.
pub async fn create_house(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    ApiJson(req): ApiJson<CreateHouseRequest>,
) -> ApiResult<(StatusCode, Json<House>)> {
    let name = req.name.trim().to_string();
    check_name(&name)?;
    check_description(&req.description)?;

    let house = state
        .store
        .create_house(
            NewHouse {
                name,
                description: req.description,
            },
            actor,
        )
        .await
        .map_err(store_error)?;
    tracing::info!(house_id = %house.id, created_by = %actor, "house created");
    Ok((StatusCode::CREATED, Json(house)))
}

pub async fn my_houses(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
) -> ApiResult<Json<Vec<House>>> {
    let houses = state.store.houses_for_user(actor).await.map_err(store_error)?;
    Ok(Json(houses))
}

pub async fn get_house(
    State(state): State<Arc<AppState>>,
    _actor: ActingUser,
    ApiPath(id): ApiPath<HouseId>,
) -> ApiResult<Json<House>> {
    let house = state.store.get_house(id).await.map_err(store_error)?;
    Ok(Json(house))
}

pub async fn update_house(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    ApiPath(id): ApiPath<HouseId>,
    ApiJson(req): ApiJson<UpdateHouseRequest>,
) -> ApiResult<Json<House>> {
    require_member(&state, id, actor).await?;

    let name = req.name.map(|n| n.trim().to_string());
    if let Some(ref name) = name {
        check_name(name)?;
    }
    if let Some(ref description) = req.description {
        check_description(description)?;
    }

    let house = state
        .store
        .update_house(
            id,
            HousePatch {
                name,
                description: req.description,
            },
            actor,
        )
        .await
        .map_err(store_error)?;
    Ok(Json(house))
}

pub async fn house_tasks(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    ApiPath(id): ApiPath<HouseId>,
) -> ApiResult<Json<Vec<TaskDefinition>>> {
    require_member(&state, id, actor).await?;
    let tasks = state.store.tasks_for_house(id).await.map_err(store_error)?;
    Ok(Json(tasks))
}

// ── Members ──────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct MemberView {
    pub user_id: UserId,
    pub name: String,
    pub email: String,
    pub role: u32,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub user_email: String,
    pub role: u32,
}

/// Active members in rotation order.
pub async fn list_members(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    ApiPath(id): ApiPath<HouseId>,
) -> ApiResult<Json<Vec<MemberView>>> {
    require_member(&state, id, actor).await?;

    let members = state.store.house_members(id).await.map_err(store_error)?;
    let ids: Vec<UserId> = members.iter().map(|m| m.user_id).collect();
    let users = state.store.users_by_ids(&ids).await.map_err(store_error)?;

    let views = members
        .into_iter()
        .filter_map(|m| {
            let user = users.iter().find(|u| u.id == m.user_id)?;
            Some(MemberView {
                user_id: m.user_id,
                name: user.name.clone(),
                email: user.email.clone(),
                role: m.role,
                joined_at: m.joined_at,
            })
        })
        .collect();
    Ok(Json(views))
}

pub async fn add_member(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    ApiPath(id): ApiPath<HouseId>,
    ApiJson(req): ApiJson<AddMemberRequest>,
) -> ApiResult<(StatusCode, Json<MemberView>)> {
    require_member(&state, id, actor).await?;
    let role = validate_role(req.role).map_err(|e| bad_request(e.to_string()))?;

    let user = state
        .store
        .find_user_by_email(&req.user_email)
        .await
        .map_err(store_error)?
        .ok_or_else(|| not_found("User", req.user_email.trim()))?;

    let membership = match state.store.add_member(id, user.id, role).await {
        Ok(m) => m,
        Err(StoreError::Conflict(msg)) => return Err(bad_request(msg)),
        Err(e) => return Err(store_error(e)),
    };
    tracing::info!(house_id = %id, user_id = %user.id, added_by = %actor, "member added");

    Ok((
        StatusCode::CREATED,
        Json(MemberView {
            user_id: user.id,
            name: user.name,
            email: user.email,
            role: membership.role,
            joined_at: membership.joined_at,
        }),
    ))
}

/// Soft-remove a member; they also leave every task rotation of the house.
pub async fn remove_member(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    ApiPath((id, user_id)): ApiPath<(HouseId, UserId)>,
) -> ApiResult<StatusCode> {
    require_member(&state, id, actor).await?;
    state
        .store
        .remove_member(id, user_id)
        .await
        .map_err(store_error)?;
    tracing::info!(house_id = %id, user_id = %user_id, removed_by = %actor, "member removed");
    Ok(StatusCode::NO_CONTENT)
}
