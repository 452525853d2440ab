//! # Scoring
//!
//! Per-user points totals.
//!
//! ## Increments
//!
//! A plain read-then-write loses updates when two requests for the same user
//! overlap. Increments here read the current value and write the new total
//! with a conditional update that only matches the value that was read. If
//! another writer got in between, the write matches nothing and the increment
//! starts over from a fresh read.
//!
//! - Absent `points` reads as 0 everywhere
//! - No floor or ceiling, negative deltas are allowed
//! - A total that would overflow `i64` is rejected
//! - After [`MAX_SWAP_ATTEMPTS`] lost races the increment gives up
//!
//! ## Logging actions
//!
//! Inserting the action and incrementing points are two separate store
//! calls. When the insert lands but the increment fails, the caller gets
//! [`AppError::PartiallyApplied`] with the id of the logged action.
use ledger::{EcoAction, NewEcoAction, Profile};
use tracing::{debug, info};

use crate::{
    database::{ActionStore, ProfileStore, StoreError},
    error::AppError,
    utils::{require_user_id, validate_action},
};

/// Enough for this many concurrent increments on one user to all land.
pub const MAX_SWAP_ATTEMPTS: u32 = 8;

pub const USER_NOT_FOUND: &str = "User not found";

#[derive(Clone, Debug, PartialEq)]
pub struct ScoreChange {
    pub old_points: i64,
    pub new_points: i64,
    pub rows: Vec<Profile>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoggedAction {
    pub action: EcoAction,
    pub new_total: i64,
}

pub async fn initialize_score(
    profiles: &dyn ProfileStore,
    user_id: &str,
    points: i64,
) -> Result<Vec<Profile>, AppError> {
    let user_id = require_user_id(user_id)?;

    let rows = profiles.set_points(user_id, points).await?;
    if rows.is_empty() {
        return Err(AppError::NotFound(USER_NOT_FOUND));
    }

    info!(user_id, points, "Initialized points");
    Ok(rows)
}

pub async fn get_score(profiles: &dyn ProfileStore, user_id: &str) -> Result<i64, AppError> {
    let user_id = require_user_id(user_id)?;

    profiles
        .fetch_profile(user_id)
        .await?
        .map(|profile| profile.points_or_zero())
        .ok_or(AppError::NotFound(USER_NOT_FOUND))
}

pub async fn add_score(
    profiles: &dyn ProfileStore,
    user_id: &str,
    points: i64,
) -> Result<ScoreChange, AppError> {
    let user_id = require_user_id(user_id)?;

    let change = increment(profiles, user_id, points).await?;
    info!(
        user_id,
        old_points = change.old_points,
        new_points = change.new_points,
        "Added points"
    );

    Ok(change)
}

pub async fn log_action(
    profiles: &dyn ProfileStore,
    actions: &dyn ActionStore,
    mut action: NewEcoAction,
) -> Result<LoggedAction, AppError> {
    validate_action(&action)?;
    action.user_id = action.user_id.trim().to_string();

    let profile = profiles
        .fetch_profile(&action.user_id)
        .await?
        .ok_or(AppError::NotFound(USER_NOT_FOUND))?;
    checked_total(profile.points_or_zero(), action.points)?;

    let stored = actions
        .insert_action(&action)
        .await?
        .into_iter()
        .next()
        .ok_or(StoreError::Empty("eco action insert"))?;

    let change = increment(profiles, &action.user_id, action.points)
        .await
        .map_err(|source| AppError::PartiallyApplied {
            action_id: stored
                .id
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| "<unknown>".to_string()),
            source: Box::new(source),
        })?;

    info!(
        user_id = %action.user_id,
        name = %action.name,
        points = action.points,
        new_total = change.new_points,
        "Logged eco action"
    );

    Ok(LoggedAction {
        action: stored,
        new_total: change.new_points,
    })
}

fn checked_total(points: i64, delta: i64) -> Result<i64, AppError> {
    points
        .checked_add(delta)
        .ok_or_else(|| AppError::Validation(format!("{points} + {delta} overflows")))
}

async fn increment(
    profiles: &dyn ProfileStore,
    user_id: &str,
    delta: i64,
) -> Result<ScoreChange, AppError> {
    for attempt in 1..=MAX_SWAP_ATTEMPTS {
        let profile = profiles
            .fetch_profile(user_id)
            .await?
            .ok_or(AppError::NotFound(USER_NOT_FOUND))?;

        let old_points = profile.points_or_zero();
        let new_points = checked_total(old_points, delta)?;

        let rows = profiles
            .swap_points(user_id, profile.points, new_points)
            .await?;

        if !rows.is_empty() {
            return Ok(ScoreChange {
                old_points,
                new_points,
                rows,
            });
        }

        debug!(user_id, attempt, "Points changed since read, retrying");
    }

    Err(StoreError::Contended {
        user_id: user_id.to_string(),
        attempts: MAX_SWAP_ATTEMPTS,
    }
    .into())
}
