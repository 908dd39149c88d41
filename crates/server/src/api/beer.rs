//! Shared beer and crate ledger.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use household_core::{HouseId, LedgerEntry, LedgerKind, LedgerTotal, UserId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::state::AppState;
use crate::store::NewLedgerEntry;

use super::{
    bad_request, forbidden, require_member, store_error, ActingUser, ApiJson, ApiPath, ApiResult,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerAction {
    SubtractBeer,
    AddCrate,
    ReturnCrate,
}

#[derive(Debug, Deserialize)]
pub struct LedgerActionRequest {
    pub user_id: UserId,
    pub action: LedgerAction,
    pub amount: i64,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct MemberBalance {
    pub user_id: UserId,
    pub name: String,
    pub beer: i64,
    #[serde(rename = "crate")]
    pub crates: i64,
}

#[derive(Debug, Serialize)]
pub struct BalancesResponse {
    pub members: Vec<MemberBalance>,
    /// Crates handed back to the shop, not attributed to anyone.
    pub returned_crates: i64,
}

/// Ledger rows for one action, applied together.
fn entries_for(
    house: HouseId,
    actor: UserId,
    req: &LedgerActionRequest,
    beers_per_crate: u32,
) -> Result<Vec<NewLedgerEntry>, String> {
    if req.amount < 1 {
        return Err("amount must be at least 1".into());
    }
    let entry = |user_id, kind, value| NewLedgerEntry {
        house_id: house,
        user_id,
        kind,
        value,
        performed_by: actor,
    };
    Ok(match req.action {
        LedgerAction::SubtractBeer => {
            vec![entry(Some(req.user_id), LedgerKind::Beer, -req.amount)]
        }
        LedgerAction::AddCrate => {
            let beers = req
                .amount
                .checked_mul(i64::from(beers_per_crate))
                .ok_or("amount is too large")?;
            vec![
                entry(Some(req.user_id), LedgerKind::Crate, req.amount),
                entry(Some(req.user_id), LedgerKind::Beer, beers),
            ]
        }
        LedgerAction::ReturnCrate => vec![entry(None, LedgerKind::Crate, -req.amount)],
    })
}

/// Fold per-(user, kind) totals into one row per member, in member order.
fn balances(
    members: &[(UserId, String)],
    totals: &[LedgerTotal],
) -> (Vec<MemberBalance>, i64) {
    let mut rows: IndexMap<UserId, MemberBalance> = members
        .iter()
        .map(|(id, name)| {
            (
                *id,
                MemberBalance {
                    user_id: *id,
                    name: name.clone(),
                    beer: 0,
                    crates: 0,
                },
            )
        })
        .collect();
    let mut returned = 0;

    for total in totals {
        match (total.user_id, total.kind) {
            (None, LedgerKind::Crate) => returned -= total.total,
            (None, LedgerKind::Beer) => {}
            (Some(user), kind) => {
                // Former members keep their history but are not listed.
                if let Some(row) = rows.get_mut(&user) {
                    match kind {
                        LedgerKind::Beer => row.beer += total.total,
                        LedgerKind::Crate => row.crates += total.total,
                    }
                }
            }
        }
    }
    (rows.into_values().collect(), returned)
}

async fn load_balances(state: &AppState, house: HouseId) -> ApiResult<BalancesResponse> {
    let members = state.store.house_members(house).await.map_err(store_error)?;
    let ids: Vec<UserId> = members.iter().map(|m| m.user_id).collect();
    let users = state.store.users_by_ids(&ids).await.map_err(store_error)?;
    let named: Vec<(UserId, String)> = ids
        .iter()
        .map(|id| {
            let name = users
                .iter()
                .find(|u| u.id == *id)
                .map(|u| u.name.clone())
                .unwrap_or_else(|| id.to_string());
            (*id, name)
        })
        .collect();

    let totals = state.store.ledger_totals(house).await.map_err(store_error)?;
    let (members, returned_crates) = balances(&named, &totals);
    Ok(BalancesResponse {
        members,
        returned_crates,
    })
}

pub async fn beer_balances(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    ApiPath(id): ApiPath<HouseId>,
) -> ApiResult<Json<BalancesResponse>> {
    require_member(&state, id, actor).await?;
    Ok(Json(load_balances(&state, id).await?))
}

pub async fn beer_action(
    State(state): State<Arc<AppState>>,
    ActingUser(actor): ActingUser,
    ApiPath(id): ApiPath<HouseId>,
    ApiJson(req): ApiJson<LedgerActionRequest>,
) -> ApiResult<(StatusCode, Json<Vec<LedgerEntry>>)> {
    require_member(&state, id, actor).await?;

    if req.action == LedgerAction::ReturnCrate && req.user_id != actor {
        return Err(forbidden("crates can only be returned on your own behalf"));
    }
    if !state
        .store
        .is_member(id, req.user_id)
        .await
        .map_err(store_error)?
    {
        return Err(bad_request("user is not a member of this house"));
    }

    let entries = entries_for(id, actor, &req, state.schedule.beers_per_crate).map_err(bad_request)?;
    let stored = state.store.append_ledger(entries).await.map_err(store_error)?;
    tracing::info!(
        house_id = %id,
        user_id = %req.user_id,
        action = ?req.action,
        amount = req.amount,
        "ledger updated"
    );
    Ok((StatusCode::CREATED, Json(stored)))
}
