//! Request and response bodies of the HTTP surface.

use serde::{Deserialize, Serialize};

use crate::models::{EcoAction, ImpactTotals, Profile};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScoreInput {
    pub user_id: String,
    pub points: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScoreQuery {
    pub user_id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InitializeResponse {
    pub message: String,
    pub data: Vec<Profile>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AddScoreResponse {
    pub message: String,
    pub old_points: i64,
    pub new_points: i64,
    pub data: Vec<Profile>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScoreResponse {
    pub user_id: String,
    pub points: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LogActionResponse {
    pub message: String,
    pub action: EcoAction,
    pub new_total_points: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatInput {
    pub message: String,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub totals: Option<ImpactTotals>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BasicChatInput {
    pub message: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BasicChatResponse {
    pub reply: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PingResponse {
    pub status: String,
}

/// Body of every non-2xx response.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
    /// Set when an action was logged but its points were not applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_id: Option<String>,
}
