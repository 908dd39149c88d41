//! Week-grouped schedule views for a task, a house, or a user.
//!
//! All three start at the clock's "today" (inclusive) and run for `weeks`
//! ISO weeks' worth of days.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::NaiveDate;
use household_core::config::ScheduleConfig;
use household_core::{HouseId, TaskDefinition, TaskId, UserId};
use household_scheduler::{house_overview, task_schedule as expand_task, user_overview, WeekGroup};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

use super::{
    bad_request, forbidden, require_member, schedule_error, store_error, ActingUser, ApiPath,
    ApiQuery, ApiResult,
};

#[derive(Debug, Default, Deserialize)]
pub struct WeeksQuery {
    pub weeks: Option<u32>,
}

impl WeeksQuery {
    /// Requested horizon, defaulted and bounded by config.
    pub fn resolve(&self, config: &ScheduleConfig) -> ApiResult<u32> {
        let weeks = self.weeks.unwrap_or(config.default_weeks);
        if weeks == 0 || weeks > config.max_weeks {
            return Err(bad_request(format!(
                "weeks must be between 1 and {}",
                config.max_weeks
            )));
        }
        Ok(weeks)
    }
}

#[derive(Debug, Serialize)]
pub struct OccurrenceView {
    pub task_id: TaskId,
    pub name: String,
    pub date: NaiveDate,
    /// Display name of the assignee; null for an unassigned task.
    pub assignee: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WeekView {
    pub week: String,
    pub tasks: Vec<OccurrenceView>,
}

/// Resolve task and assignee names for the wire shape.
async fn render(
    state: &AppState,
    tasks: &[TaskDefinition],
    groups: Vec<WeekGroup>,
) -> ApiResult<Vec<WeekView>> {
    let task_names: HashMap<TaskId, &str> =
        tasks.iter().map(|t| (t.id, t.name.as_str())).collect();

    let mut assignee_ids: Vec<UserId> = groups
        .iter()
        .flat_map(|g| g.occurrences.iter().filter_map(|o| o.assignee))
        .collect();
    assignee_ids.sort_unstable();
    assignee_ids.dedup();
    let user_names: HashMap<UserId, String> = state
        .store
        .users_by_ids(&assignee_ids)
        .await
        .map_err(store_error)?
        .into_iter()
        .map(|u| (u.id, u.name))
        .collect();

    Ok(groups
        .into_iter()
        .map(|g| WeekView {
            week: g.week.to_string(),
            tasks: g
                .occurrences
                .into_iter()
                .map(|o| OccurrenceView {
                    task_id: o.task_id,
                    name: task_names.get(&o.task_id).copied().unwrap_or_default().to_string(),
                    date: o.date,
                    assignee: o.assignee.map(|id| {
                        user_names.get(&id).cloned().unwrap_or_else(|| id.to_string())
                    }),
                })
                .collect(),
        })
        .collect())
}

pub async fn task_schedule(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    ApiPath(id): ApiPath<TaskId>,
    ApiQuery(query): ApiQuery<WeeksQuery>,
) -> ApiResult<Json<Vec<WeekView>>> {
    let weeks = query.resolve(&state.schedule)?;
    let task = state.store.get_task(id).await.map_err(store_error)?;
    require_member(&state, task.house_id, actor).await?;

    let groups = expand_task(&task, state.clock.today(), weeks).map_err(schedule_error)?;
    let view = render(&state, std::slice::from_ref(&task), groups).await?;
    Ok(Json(view))
}

pub async fn house_schedule(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    ApiPath(id): ApiPath<HouseId>,
    ApiQuery(query): ApiQuery<WeeksQuery>,
) -> ApiResult<Json<Vec<WeekView>>> {
    let weeks = query.resolve(&state.schedule)?;
    require_member(&state, id, actor).await?;

    let tasks = state.store.tasks_for_house(id).await.map_err(store_error)?;
    let groups = house_overview(&tasks, state.clock.today(), weeks).map_err(schedule_error)?;
    tracing::debug!(house_id = %id, weeks, tasks = tasks.len(), "house schedule");
    Ok(Json(render(&state, &tasks, groups).await?))
}

pub async fn user_schedule(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    ApiPath(id): ApiPath<UserId>,
    ApiQuery(query): ApiQuery<WeeksQuery>,
) -> ApiResult<Json<Vec<WeekView>>> {
    if id != actor {
        return Err(forbidden("can only view your own schedule"));
    }
    let weeks = query.resolve(&state.schedule)?;

    let tasks = state.store.tasks_for_user(id).await.map_err(store_error)?;
    let groups = user_overview(&tasks, id, state.clock.today(), weeks).map_err(schedule_error)?;
    Ok(Json(render(&state, &tasks, groups).await?))
}
