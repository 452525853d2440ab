use std::sync::Arc;

use axum::{
    Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
};
use ledger::{
    NewEcoAction,
    payloads::{
        AddScoreResponse, BasicChatInput, BasicChatResponse, ChatInput, ChatResponse,
        InitializeResponse, LogActionResponse, PingResponse, ScoreInput, ScoreQuery, ScoreResponse,
    },
};

use crate::{
    error::AppError,
    impact::{basic_reply, converse, summarize},
    scoring::{add_score, get_score, initialize_score, log_action},
    state::AppState,
    utils::require_user_id,
};

pub async fn initialize_score_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ScoreInput>, JsonRejection>,
) -> Result<Json<InitializeResponse>, AppError> {
    let Json(input) = payload?;

    let data = initialize_score(state.profiles.as_ref(), &input.user_id, input.points).await?;

    Ok(Json(InitializeResponse {
        message: format!("Points initialized to {}", input.points),
        data,
    }))
}

pub async fn add_score_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ScoreInput>, JsonRejection>,
) -> Result<Json<AddScoreResponse>, AppError> {
    let Json(input) = payload?;

    let change = add_score(state.profiles.as_ref(), &input.user_id, input.points).await?;

    Ok(Json(AddScoreResponse {
        message: format!("Added {} points", input.points),
        old_points: change.old_points,
        new_points: change.new_points,
        data: change.rows,
    }))
}

pub async fn get_score_handler(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ScoreQuery>, QueryRejection>,
) -> Result<Json<ScoreResponse>, AppError> {
    let Query(query) = query?;
    let user_id = require_user_id(&query.user_id)?;

    let points = get_score(state.profiles.as_ref(), user_id).await?;

    Ok(Json(ScoreResponse {
        user_id: user_id.to_string(),
        points,
    }))
}

pub async fn log_action_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewEcoAction>, JsonRejection>,
) -> Result<Json<LogActionResponse>, AppError> {
    let Json(action) = payload?;

    let logged = log_action(state.profiles.as_ref(), state.actions.as_ref(), action).await?;

    Ok(Json(LogActionResponse {
        message: format!(
            "Logged {} for {} points",
            logged.action.action.name, logged.action.action.points
        ),
        action: logged.action,
        new_total_points: logged.new_total,
    }))
}

pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatInput>, JsonRejection>,
) -> Result<Json<ChatResponse>, AppError> {
    let Json(input) = payload?;

    let user_id = input
        .user_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty());

    let response = match user_id {
        Some(user_id) => {
            let summary = summarize(
                state.actions.as_ref(),
                state.completion(),
                user_id,
                &input.message,
            )
            .await?;

            ChatResponse {
                reply: summary.reply,
                totals: Some(summary.totals),
            }
        }
        None => ChatResponse {
            reply: converse(state.completion(), &input.message).await?,
            totals: None,
        },
    };

    Ok(Json(response))
}

pub async fn basic_chat_handler(
    payload: Result<Json<BasicChatInput>, JsonRejection>,
) -> Result<Json<BasicChatResponse>, AppError> {
    let Json(input) = payload?;

    Ok(Json(BasicChatResponse {
        reply: basic_reply(&input.message).to_string(),
    }))
}

pub async fn ping_handler() -> Json<PingResponse> {
    Json(PingResponse {
        status: "alive".to_string(),
    })
}
