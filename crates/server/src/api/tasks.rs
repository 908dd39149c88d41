//! Task definition and assignee endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use household_core::{HouseId, TaskDefinition, TaskId, UserId};
use serde::Deserialize;
use uuid::Uuid;

use crate::state::AppState;
use crate::store::{NewTask, StoreError, TaskPatch};

use super::{
    bad_request, forbidden, not_found, require_member, store_error, ActingUser, ApiJson, ApiPath,
    ApiResult,
};

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub house_id: HouseId,
    pub name: String,
    pub description: String,
    pub start_date: NaiveDate,
    pub interval_days: u32,
    #[serde(default)]
    pub reminder: bool,
    #[serde(default)]
    pub mark_complete: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateTaskRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub interval_days: Option<u32>,
    pub reminder: Option<bool>,
    pub mark_complete: Option<bool>,
}

impl From<UpdateTaskRequest> for TaskPatch {
    fn from(req: UpdateTaskRequest) -> Self {
        TaskPatch {
            name: req.name.map(|n| n.trim().to_string()),
            description: req.description,
            start_date: req.start_date,
            interval_days: req.interval_days,
            reminder: req.reminder,
            mark_complete: req.mark_complete,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub user_email: String,
}

/// A definition the scheduler can expand, with a description to show.
fn check_definition(task: &TaskDefinition) -> ApiResult<()> {
    task.validate().map_err(|e| bad_request(e.to_string()))?;
    if task.description.trim().is_empty() {
        return Err(bad_request("task description must not be empty"));
    }
    Ok(())
}

/// Load a task the actor may see.
async fn member_task(state: &AppState, id: TaskId, actor: UserId) -> ApiResult<TaskDefinition> {
    let task = state.store.get_task(id).await.map_err(store_error)?;
    require_member(state, task.house_id, actor).await?;
    Ok(task)
}

pub async fn create_task(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    ApiJson(req): ApiJson<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<TaskDefinition>)> {
    require_member(&state, req.house_id, actor).await?;

    let input = NewTask {
        house_id: req.house_id,
        name: req.name.trim().to_string(),
        description: req.description,
        start_date: req.start_date,
        interval_days: req.interval_days,
        reminder: req.reminder,
        mark_complete: req.mark_complete,
    };
    check_definition(&TaskDefinition {
        id: Uuid::nil(),
        house_id: input.house_id,
        name: input.name.clone(),
        description: input.description.clone(),
        start_date: input.start_date,
        interval_days: input.interval_days,
        assignees: Vec::new(),
        reminder: input.reminder,
        mark_complete: input.mark_complete,
    })?;

    let task = state.store.create_task(input).await.map_err(store_error)?;
    tracing::info!(task_id = %task.id, house_id = %task.house_id, "task created");
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn get_task(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    ApiPath(id): ApiPath<TaskId>,
) -> ApiResult<Json<TaskDefinition>> {
    Ok(Json(member_task(&state, id, actor).await?))
}

pub async fn update_task(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    ApiPath(id): ApiPath<TaskId>,
    ApiJson(req): ApiJson<UpdateTaskRequest>,
) -> ApiResult<Json<TaskDefinition>> {
    let mut draft = member_task(&state, id, actor).await?;
    let patch = TaskPatch::from(req);
    patch.apply(&mut draft);
    check_definition(&draft)?;

    let task = state.store.update_task(id, patch).await.map_err(store_error)?;
    Ok(Json(task))
}

pub async fn delete_task(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    ApiPath(id): ApiPath<TaskId>,
) -> ApiResult<StatusCode> {
    member_task(&state, id, actor).await?;
    state.store.delete_task(id).await.map_err(store_error)?;
    tracing::info!(task_id = %id, deleted_by = %actor, "task deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Append a house member to the end of the task's rotation.
pub async fn assign_task(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    ApiPath(id): ApiPath<TaskId>,
    ApiJson(req): ApiJson<AssignRequest>,
) -> ApiResult<Json<TaskDefinition>> {
    let task = member_task(&state, id, actor).await?;

    let user = state
        .store
        .find_user_by_email(&req.user_email)
        .await
        .map_err(store_error)?
        .ok_or_else(|| not_found("User", req.user_email.trim()))?;
    if !state
        .store
        .is_member(task.house_id, user.id)
        .await
        .map_err(store_error)?
    {
        return Err(bad_request("user is not a member of this house"));
    }

    match state.store.assign_task_user(id, user.id).await {
        Ok(task) => Ok(Json(task)),
        Err(StoreError::Conflict(msg)) => Err(bad_request(msg)),
        Err(e) => Err(store_error(e)),
    }
}

pub async fn unassign_task(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    ApiPath((id, user_id)): ApiPath<(TaskId, UserId)>,
) -> ApiResult<Json<TaskDefinition>> {
    member_task(&state, id, actor).await?;
    let task = state
        .store
        .unassign_task_user(id, user_id)
        .await
        .map_err(store_error)?;
    Ok(Json(task))
}

/// Task definitions that list `id` among their assignees. Users only see their own.
pub async fn user_tasks(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    ApiPath(id): ApiPath<UserId>,
) -> ApiResult<Json<Vec<TaskDefinition>>> {
    if id != actor {
        return Err(forbidden("can only list your own tasks"));
    }
    let tasks = state.store.tasks_for_user(id).await.map_err(store_error)?;
    Ok(Json(tasks))
}
